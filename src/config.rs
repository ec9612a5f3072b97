//! Configuration types for HTML-to-image conversion.
//!
//! Per-call parameters live in [`RenderOptions`] (width, format, quality,
//! timeout), built through [`RenderOptionsBuilder`]. Per-converter settings
//! (working directory, tool override) live in [`ConverterConfig`].
//!
//! Width and quality are checked before any subprocess is launched: an
//! out-of-range value is an [`Html2ImageError::InvalidConfig`], never an
//! argument handed to the tool.

use crate::error::Html2ImageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use wkhtml_locate::ToolLocation;

/// Default output width in pixels.
pub const DEFAULT_WIDTH: u32 = 1024;

/// Default output quality (1–100).
pub const DEFAULT_QUALITY: u8 = 100;

/// Output image format understood by `wkhtmltoimage --format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpg,
    Png,
    Bmp,
    Svg,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [
        ImageFormat::Jpg,
        ImageFormat::Png,
        ImageFormat::Bmp,
        ImageFormat::Svg,
    ];

    /// Lowercase name passed to `--format`; also the output file extension.
    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Svg => "svg",
        }
    }

    pub fn extension(self) -> &'static str {
        self.name()
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    /// Whether `bytes` starts like a file of this format.
    pub fn magic_matches(self, bytes: &[u8]) -> bool {
        match self {
            ImageFormat::Jpg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            ImageFormat::Png => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
            ImageFormat::Bmp => bytes.starts_with(b"BM"),
            ImageFormat::Svg => {
                let head = &bytes[..bytes.len().min(512)];
                let head = String::from_utf8_lossy(head);
                let head = head.trim_start();
                head.starts_with("<?xml") || head.starts_with("<svg")
            }
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageFormat {
    type Err = Html2ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(ImageFormat::Jpg),
            "png" => Ok(ImageFormat::Png),
            "bmp" => Ok(ImageFormat::Bmp),
            "svg" => Ok(ImageFormat::Svg),
            other => Err(Html2ImageError::InvalidConfig(format!(
                "unknown image format '{other}' (expected jpg, png, bmp or svg)"
            ))),
        }
    }
}

/// Per-conversion parameters.
///
/// # Example
/// ```rust
/// use html2image::{ImageFormat, RenderOptions};
///
/// let opts = RenderOptions::builder()
///     .width(800)
///     .format(ImageFormat::Png)
///     .quality(90)
///     .build()
///     .unwrap();
/// assert_eq!(opts.width, 800);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Output width in pixels. Must be > 0. Default: 1024.
    pub width: u32,

    /// Output format. Default: [`ImageFormat::Jpg`].
    pub format: ImageFormat,

    /// Output quality, 1–100. Default: 100.
    pub quality: u8,

    /// Kill the tool if it has not exited after this long. Default: none.
    pub timeout: Option<Duration>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            format: ImageFormat::default(),
            quality: DEFAULT_QUALITY,
            timeout: None,
        }
    }
}

impl RenderOptions {
    pub fn builder() -> RenderOptionsBuilder {
        RenderOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Check width and quality bounds.
    pub fn validate(&self) -> Result<(), Html2ImageError> {
        if self.width == 0 {
            return Err(Html2ImageError::InvalidConfig(
                "width must be ≥ 1 pixel".into(),
            ));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(Html2ImageError::InvalidConfig(format!(
                "quality must be 1–100, got {}",
                self.quality
            )));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(Html2ImageError::InvalidConfig(
                "timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`RenderOptions`].
#[derive(Debug)]
pub struct RenderOptionsBuilder {
    options: RenderOptions,
}

impl RenderOptionsBuilder {
    pub fn width(mut self, width: u32) -> Self {
        self.options.width = width;
        self
    }

    pub fn format(mut self, format: ImageFormat) -> Self {
        self.options.format = format;
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.options.quality = quality;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn timeout_secs(self, secs: u64) -> Self {
        self.timeout(Duration::from_secs(secs))
    }

    /// Build the options, validating constraints.
    pub fn build(self) -> Result<RenderOptions, Html2ImageError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

/// What to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlSource {
    /// Inline markup, written to a scratch `.html` file before rendering.
    Html(String),
    /// An HTTP(S) URL, a `file://` URI or an absolute local path.
    Url(String),
}

impl HtmlSource {
    pub fn is_empty(&self) -> bool {
        match self {
            HtmlSource::Html(s) | HtmlSource::Url(s) => s.trim().is_empty(),
        }
    }
}

/// A single conversion: source plus options.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub source: HtmlSource,
    pub options: RenderOptions,
}

impl ConversionRequest {
    pub fn html(html: impl Into<String>, options: RenderOptions) -> Self {
        Self {
            source: HtmlSource::Html(html.into()),
            options,
        }
    }

    pub fn url(url: impl Into<String>, options: RenderOptions) -> Self {
        Self {
            source: HtmlSource::Url(url.into()),
            options,
        }
    }

    /// Reject empty sources and out-of-range options.
    pub fn validate(&self) -> Result<(), Html2ImageError> {
        if self.source.is_empty() {
            let input = match &self.source {
                HtmlSource::Html(s) | HtmlSource::Url(s) => s.clone(),
            };
            return Err(Html2ImageError::InvalidSource {
                input,
                reason: "source is empty".into(),
            });
        }
        self.options.validate()
    }
}

/// Settings shared by every conversion a converter performs.
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Directory for scratch input/output files and the tool's working
    /// directory. Default: the OS temp directory.
    pub work_dir: PathBuf,

    /// Use this tool instead of the process-wide discovered one.
    pub tool: Option<ToolLocation>,

    /// Pass `--quiet` so the tool's progress meter stays off stderr.
    /// Default: true.
    pub quiet: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            tool: None,
            quiet: true,
        }
    }
}

impl ConverterConfig {
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn tool(mut self, tool: ToolLocation) -> Self {
        self.config.tool = Some(tool);
        self
    }

    pub fn tool_path(self, path: impl Into<PathBuf>) -> Self {
        self.tool(ToolLocation::Path(path.into()))
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.config.quiet = quiet;
        self
    }

    /// Build the configuration; the working directory must exist.
    pub fn build(self) -> Result<ConverterConfig, Html2ImageError> {
        if !self.config.work_dir.is_dir() {
            return Err(Html2ImageError::InvalidConfig(format!(
                "working directory '{}' does not exist",
                self.config.work_dir.display()
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let o = RenderOptions::default();
        assert_eq!(o.width, 1024);
        assert_eq!(o.format, ImageFormat::Jpg);
        assert_eq!(o.quality, 100);
        assert!(o.timeout.is_none());
        assert!(o.validate().is_ok());
    }

    #[test]
    fn quality_bounds_rejected() {
        for q in [0u8, 101, 255] {
            let err = RenderOptions::builder().quality(q).build().unwrap_err();
            assert!(matches!(err, Html2ImageError::InvalidConfig(_)), "q={q}");
        }
        assert!(RenderOptions::builder().quality(1).build().is_ok());
        assert!(RenderOptions::builder().quality(100).build().is_ok());
    }

    #[test]
    fn zero_width_rejected() {
        assert!(RenderOptions::builder().width(0).build().is_err());
        assert!(RenderOptions::builder().width(1).build().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(RenderOptions::builder()
            .timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn format_names_are_lowercase() {
        for f in ImageFormat::ALL {
            assert_eq!(f.name(), f.name().to_lowercase());
            assert_eq!(f.extension(), f.name());
            assert_eq!(f.name().parse::<ImageFormat>().unwrap(), f);
        }
        assert_eq!("JPEG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpg);
        assert!("gif".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn format_serde_is_lowercase() {
        let json = serde_json::to_string(&ImageFormat::Png).unwrap();
        assert_eq!(json, "\"png\"");
        let back: ImageFormat = serde_json::from_str("\"bmp\"").unwrap();
        assert_eq!(back, ImageFormat::Bmp);
    }

    #[test]
    fn magic_detection() {
        assert!(ImageFormat::Jpg.magic_matches(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!ImageFormat::Jpg.magic_matches(b"\x89PNG\r\n\x1a\n"));
        assert!(ImageFormat::Png.magic_matches(b"\x89PNG\r\n\x1a\n...."));
        assert!(ImageFormat::Bmp.magic_matches(b"BM\0\0"));
        assert!(ImageFormat::Svg.magic_matches(b"  <?xml version=\"1.0\"?><svg/>"));
        assert!(!ImageFormat::Svg.magic_matches(b""));
    }

    #[test]
    fn empty_source_rejected() {
        let req = ConversionRequest::url("   ", RenderOptions::default());
        assert!(matches!(
            req.validate(),
            Err(Html2ImageError::InvalidSource { .. })
        ));
        let req = ConversionRequest::html("", RenderOptions::default());
        assert!(req.validate().is_err());
    }

    #[test]
    fn converter_config_requires_existing_dir() {
        let err = ConverterConfig::builder()
            .work_dir("/definitely/not/a/real/dir")
            .build()
            .unwrap_err();
        assert!(matches!(err, Html2ImageError::InvalidConfig(_)));

        let dir = tempfile::tempdir().unwrap();
        let config = ConverterConfig::builder()
            .work_dir(dir.path())
            .tool_path("/opt/wkhtmltoimage")
            .quiet(false)
            .build()
            .unwrap();
        assert_eq!(config.work_dir, dir.path());
        assert!(!config.quiet);
        assert_eq!(
            config.tool,
            Some(ToolLocation::Path(PathBuf::from("/opt/wkhtmltoimage")))
        );
    }
}
