//! CLI binary for html2image.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `RenderOptions` / `ConverterConfig` and writes the image out.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Parser;
use html2image::{
    CancellationToken, ConversionRequest, ConverterConfig, HtmlConverter, HtmlSource, ImageFormat,
    RenderOptions,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Inline markup to JPEG
  html2image --html '<div><strong>Hello</strong> World!</div>' -o hello.jpg

  # A web page to PNG, 800 px wide
  html2image http://google.com --width 800 --format png --quality 90 -o google.png

  # A local file, piped from stdin, printed as base64
  cat page.html | html2image - --base64

  # Machine-readable summary
  html2image page.html -o page.png -f png --json

  # Give up on slow pages
  html2image https://example.com --timeout 30 -o example.jpg

ENVIRONMENT VARIABLES:
  WKHTMLTOIMAGE_PATH    Use this wkhtmltoimage instead of discovering one
  HTML2IMAGE_WORK_DIR   Directory for scratch files (default: OS temp dir)
  RUST_LOG              Log filter, e.g. html2image=debug

SETUP:
  Linux/BSD/macOS: install the wkhtmltopdf package so that `wkhtmltoimage`
  is on PATH. Windows: place wkhtmltoimage.exe next to this executable, or
  build with `--features bundled` to embed it.
  Downloads: https://wkhtmltopdf.org/downloads.html
"#;

/// Render HTML markup or a URL to an image with wkhtmltoimage.
#[derive(Parser, Debug)]
#[command(
    name = "html2image",
    version,
    about = "Render HTML markup or a URL to an image with wkhtmltoimage",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// HTTP/HTTPS URL, local HTML file, or `-` to read HTML from stdin.
    #[arg(required_unless_present = "html")]
    input: Option<String>,

    /// Inline HTML markup to render instead of INPUT.
    #[arg(long, conflicts_with = "input")]
    html: Option<String>,

    /// Write the image to this file instead of stdout.
    #[arg(short, long, env = "HTML2IMAGE_OUTPUT")]
    output: Option<PathBuf>,

    /// Output width in pixels.
    #[arg(long, env = "HTML2IMAGE_WIDTH", default_value_t = html2image::DEFAULT_WIDTH,
          value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Output format.
    #[arg(short, long, env = "HTML2IMAGE_FORMAT", value_enum, default_value = "jpg")]
    format: FormatArg,

    /// Output quality (1–100).
    #[arg(long, env = "HTML2IMAGE_QUALITY", default_value_t = html2image::DEFAULT_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Kill wkhtmltoimage after this many seconds.
    #[arg(long, env = "HTML2IMAGE_TIMEOUT", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Directory for scratch files.
    #[arg(long, env = "HTML2IMAGE_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Path to wkhtmltoimage; skips discovery.
    #[arg(long, env = "WKHTMLTOIMAGE_PATH")]
    tool: Option<PathBuf>,

    /// Print the image as base64 on stdout.
    #[arg(long, conflicts_with = "output")]
    base64: bool,

    /// Print a JSON summary of the written image on stdout.
    #[arg(long, requires = "output")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "HTML2IMAGE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "HTML2IMAGE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "HTML2IMAGE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum FormatArg {
    Jpg,
    Png,
    Bmp,
    Svg,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Jpg => ImageFormat::Jpg,
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Bmp => ImageFormat::Bmp,
            FormatArg::Svg => ImageFormat::Svg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.verbose && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build request ────────────────────────────────────────────────────
    if cli.output.is_none() && !cli.base64 && io::stdout().is_terminal() {
        bail!("Refusing to write binary image data to a terminal; use --output or --base64");
    }

    let source = read_source(&cli)?;
    let mut options = RenderOptions::builder()
        .width(cli.width)
        .format(cli.format.clone().into())
        .quality(cli.quality);
    if let Some(secs) = cli.timeout {
        options = options.timeout_secs(secs);
    }
    let request = ConversionRequest {
        source,
        options: options.build().context("Invalid options")?,
    };

    let converter = HtmlConverter::with_config(build_config(&cli)?);

    // ── Ctrl-C kills the tool and cleans up scratch files ────────────────
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let spinner = show_progress.then(new_spinner);
    let started = Instant::now();

    if let Some(ref output_path) = cli.output {
        let written = converter
            .render_to_file(&request, output_path, &cancel)
            .await;
        if let Some(ref bar) = spinner {
            bar.finish_and_clear();
        }
        let written = written.context("Conversion failed")?;

        if cli.json {
            let summary = Summary {
                output: output_path,
                bytes: written,
                format: request.options.format,
                mime_type: request.options.format.mime_type(),
                width: request.options.width,
                quality: request.options.quality,
                elapsed_ms: started.elapsed().as_millis() as u64,
            };
            let json =
                serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
            println!("{json}");
        } else if !cli.quiet {
            eprintln!(
                "{}  {}  {}  →  {}",
                green("✔"),
                dim(&format!("{written} bytes")),
                dim(&format!("{}ms", started.elapsed().as_millis())),
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let bytes = converter.convert(&request, &cancel).await;
        if let Some(ref bar) = spinner {
            bar.finish_and_clear();
        }
        let bytes = bytes.context("Conversion failed")?;

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        if cli.base64 {
            writeln!(handle, "{}", STANDARD.encode(&bytes)).context("Failed to write to stdout")?;
        } else {
            handle
                .write_all(&bytes)
                .context("Failed to write to stdout")?;
        }
        handle.flush().context("Failed to write to stdout")?;

        if !cli.quiet {
            eprintln!(
                "{}  {}  {}",
                green("✔"),
                dim(&format!("{} bytes", bytes.len())),
                dim(&format!("{}ms", started.elapsed().as_millis())),
            );
        }
    }

    Ok(())
}

/// `--json` output.
#[derive(Serialize)]
struct Summary<'a> {
    output: &'a Path,
    bytes: usize,
    format: ImageFormat,
    mime_type: &'static str,
    width: u32,
    quality: u8,
    elapsed_ms: u64,
}

fn new_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Rendering");
    bar.set_message("waiting for wkhtmltoimage…");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Map `--html` / INPUT to an `HtmlSource`.
fn read_source(cli: &Cli) -> Result<HtmlSource> {
    if let Some(ref html) = cli.html {
        return Ok(HtmlSource::Html(html.clone()));
    }

    let input = match cli.input.as_deref() {
        Some(i) => i,
        None => bail!("Provide an INPUT or --html"),
    };

    if input == "-" {
        let mut html = String::new();
        io::stdin()
            .read_to_string(&mut html)
            .context("Failed to read HTML from stdin")?;
        return Ok(HtmlSource::Html(html));
    }

    if html2image::pipeline::input::is_url(input) {
        return Ok(HtmlSource::Url(input.to_string()));
    }

    local_file_source(Path::new(input))
}

/// Local files are passed to the tool by absolute path.
fn local_file_source(path: &Path) -> Result<HtmlSource> {
    if !path.is_file() {
        bail!("Input file not found: '{}'", path.display());
    }
    let absolute = std::path::absolute(path)
        .with_context(|| format!("Failed to resolve '{}'", path.display()))?;
    Ok(HtmlSource::Url(absolute.to_string_lossy().into_owned()))
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder();
    if let Some(ref dir) = cli.work_dir {
        builder = builder.work_dir(dir);
    }
    if let Some(ref tool) = cli.tool {
        builder = builder.tool_path(tool);
    }
    builder.build().context("Invalid configuration")
}
