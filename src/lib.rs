//! # html2image
//!
//! Convert HTML markup or a URL into a raster image with the external
//! [`wkhtmltoimage`](https://wkhtmltopdf.org) tool.
//!
//! Nothing is rendered in-process. The crate finds the tool, writes inline
//! markup to a scratch file, builds the command line, runs the tool and hands
//! back the bytes of the image it produced, cleaning up every scratch file on
//! the way out.
//!
//! ## Pipeline Overview
//!
//! ```text
//! HTML / URL
//!  │
//!  ├─ 1. Locate   find wkhtmltoimage once per process (wkhtml-locate)
//!  ├─ 2. Scratch  inline HTML → uniquely named .html file
//!  ├─ 3. Classify local file vs. remote URL
//!  ├─ 4. Command  --quality --width --format <source> <output>
//!  ├─ 5. Run      spawn, buffer stderr, wait (timeout / cancellation)
//!  └─ 6. Output   read image bytes, delete scratch files
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use html2image::{HtmlConverter, ImageFormat, RenderOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = HtmlConverter::new();
//!
//!     // Defaults: 1024 px wide, JPEG, quality 100.
//!     let jpg = converter.from_html_string(
//!         "<div><strong>Hello</strong> World!</div>",
//!         &RenderOptions::default(),
//!     )?;
//!
//!     let png = converter.from_url(
//!         "http://google.com",
//!         &RenderOptions::builder().width(800).format(ImageFormat::Png).quality(90).build()?,
//!     )?;
//!     std::fs::write("image.png", png)?;
//!     eprintln!("jpeg: {} bytes", jpg.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `html2image` binary (clap + anyhow + tracing-subscriber) |
//! | `bundled` | off     | Embeds `wkhtmltoimage.exe` for first-run provisioning on Windows |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionRequest, ConverterConfig, ConverterConfigBuilder, HtmlSource, ImageFormat,
    RenderOptions, RenderOptionsBuilder, DEFAULT_QUALITY, DEFAULT_WIDTH,
};
pub use convert::HtmlConverter;
pub use error::{Html2ImageError, Result};
pub use pipeline::input::{classify, SourceKind};
pub use tokio_util::sync::CancellationToken;
pub use wkhtml_locate::{LocateError, ToolLocation};
