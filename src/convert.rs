//! The [`HtmlConverter`] facade: one request in, image bytes out.
//!
//! Each conversion runs the same cycle:
//!
//! 1. validate the request (empty source, width, quality)
//! 2. resolve the tool (memoized per process, or the configured override)
//! 3. inline HTML only: write it to a scratch `.html` file
//! 4. classify the source, reserve a scratch output name, build argv
//! 5. run the tool, then read the output file
//!
//! Every scratch file is a drop guard, so both files are gone when the call
//! returns, whichever way it returns.
//!
//! The async methods are the primary API. [`HtmlConverter::from_html_string`]
//! and [`HtmlConverter::from_url`] are blocking wrappers that drive them on a
//! private current-thread runtime. Called from a multi-thread Tokio runtime
//! they block in place; from a current-thread runtime they return
//! [`Html2ImageError::Internal`].

use crate::config::{ConversionRequest, ConverterConfig, HtmlSource, RenderOptions};
use crate::error::Html2ImageError;
use crate::pipeline::input::{self, SourceKind};
use crate::pipeline::{command, process, scratch};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempPath;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wkhtml_locate::ToolLocation;

/// Converts HTML markup and URLs to image bytes through `wkhtmltoimage`.
///
/// Cheap to clone; holds only configuration. Concurrent conversions on the
/// same converter never share scratch files.
#[derive(Debug, Clone, Default)]
pub struct HtmlConverter {
    config: ConverterConfig,
}

impl HtmlConverter {
    /// A converter with default settings: scratch files in the OS temp
    /// directory, tool discovered per process.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    // ── Async API ────────────────────────────────────────────────────────

    /// Render inline HTML.
    pub async fn render_html(
        &self,
        html: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, Html2ImageError> {
        let request = ConversionRequest::html(html, options.clone());
        self.convert(&request, &CancellationToken::new()).await
    }

    /// Render an HTTP(S) URL, a `file://` URI or an absolute local path.
    pub async fn render_url(
        &self,
        url: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, Html2ImageError> {
        let request = ConversionRequest::url(url, options.clone());
        self.convert(&request, &CancellationToken::new()).await
    }

    /// Run one conversion.
    ///
    /// Cancelling `cancel` kills the tool and returns
    /// [`Html2ImageError::Cancelled`]. Nothing is retried.
    pub async fn convert(
        &self,
        request: &ConversionRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, Html2ImageError> {
        request.validate()?;
        let tool = self.tool()?;
        let work_dir = self.work_dir()?;
        let options = &request.options;

        match &request.source {
            HtmlSource::Html(html) => {
                info!(bytes = html.len(), format = %options.format, width = options.width, "Converting inline HTML");
                let input = scratch::write_html(&work_dir, html)?;
                let source = SourceKind::Local(input.to_path_buf());
                let result = self.run(&tool, &work_dir, source, options, cancel).await;
                discard(input);
                result
            }
            HtmlSource::Url(url) => {
                info!(url = %url, format = %options.format, width = options.width, "Converting URL");
                let source = input::classify(url)?;
                self.run(&tool, &work_dir, source, options, cancel).await
            }
        }
    }

    /// Convert and write the image to `output_path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    /// Returns the number of bytes written.
    pub async fn render_to_file(
        &self,
        request: &ConversionRequest,
        output_path: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<usize, Html2ImageError> {
        let bytes = self.convert(request, cancel).await?;
        let path = output_path.as_ref();
        let write_err = |source| Html2ImageError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        tokio::fs::write(&tmp_path, &bytes).await.map_err(write_err)?;
        tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

        Ok(bytes.len())
    }

    // ── Blocking API ─────────────────────────────────────────────────────

    /// Blocking: render inline HTML.
    ///
    /// ```rust,no_run
    /// use html2image::{HtmlConverter, RenderOptions};
    ///
    /// let jpg = HtmlConverter::new()
    ///     .from_html_string("<div><strong>Hello</strong> World!</div>", &RenderOptions::default())
    ///     .unwrap();
    /// assert!(!jpg.is_empty());
    /// ```
    pub fn from_html_string(
        &self,
        html: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, Html2ImageError> {
        block_on(self.render_html(html, options))?
    }

    /// Blocking: render a URL or local file.
    pub fn from_url(&self, url: &str, options: &RenderOptions) -> Result<Vec<u8>, Html2ImageError> {
        block_on(self.render_url(url, options))?
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn tool(&self) -> Result<ToolLocation, Html2ImageError> {
        match &self.config.tool {
            Some(tool) => Ok(tool.clone()),
            None => Ok(wkhtml_locate::resolve()?.clone()),
        }
    }

    /// The tool runs with this as its working directory, so scratch paths
    /// must not be relative to ours.
    fn work_dir(&self) -> Result<PathBuf, Html2ImageError> {
        std::path::absolute(&self.config.work_dir).map_err(|source| Html2ImageError::ScratchFile {
            dir: self.config.work_dir.clone(),
            source,
        })
    }

    async fn run(
        &self,
        tool: &ToolLocation,
        work_dir: &Path,
        source: SourceKind,
        options: &RenderOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, Html2ImageError> {
        let started = Instant::now();
        let output = scratch::reserve_output(work_dir, options.format)?;
        let cmd = command::build_args(&source, &output, options, self.config.quiet);
        debug!(command = %cmd.display(&tool.to_string()), "Running wkhtmltoimage");

        process::run(tool.program(), cmd.args(), work_dir, options.timeout, cancel).await?;

        let bytes = read_output(&output).await?;
        discard(output);

        info!(
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Conversion complete"
        );
        Ok(bytes)
    }
}

async fn read_output(output: &Path) -> Result<Vec<u8>, Html2ImageError> {
    match tokio::fs::metadata(output).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Html2ImageError::OutputMissing {
                path: output.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(Html2ImageError::OutputRead {
                path: output.to_path_buf(),
                source,
            })
        }
    }

    tokio::fs::read(output)
        .await
        .map_err(|source| Html2ImageError::OutputRead {
            path: output.to_path_buf(),
            source,
        })
}

/// Delete a scratch file now, logging instead of failing on error.
fn discard(path: TempPath) {
    let shown = path.display().to_string();
    match path.close() {
        Ok(()) => debug!(path = %shown, "Removed scratch file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %shown, error = %e, "Failed to remove scratch file"),
    }
}

/// Drive `fut` to completion from synchronous code.
///
/// Outside a runtime a private current-thread runtime is built. Inside a
/// multi-thread runtime the worker is handed off with `block_in_place`. A
/// current-thread runtime cannot be blocked on, so that case is an error.
fn block_on<F: Future>(fut: F) -> Result<F::Output, Html2ImageError> {
    if let Ok(handle) = Handle::try_current() {
        return match handle.runtime_flavor() {
            RuntimeFlavor::MultiThread => {
                Ok(tokio::task::block_in_place(|| handle.block_on(fut)))
            }
            flavor => Err(Html2ImageError::Internal(format!(
                "blocking conversion called inside a {flavor:?} Tokio runtime; use the async API"
            ))),
        };
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Html2ImageError::Internal(format!("Failed to create tokio runtime: {e}")))?;
    Ok(runtime.block_on(fut))
}
