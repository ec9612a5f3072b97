//! Error types for the html2image library.
//!
//! Every failure is terminal for the call that hit it; nothing here is
//! retried internally. The variants are grouped by the stage that failed so
//! callers can tell discovery, input, execution and output problems apart:
//!
//! * **Discovery**: [`Html2ImageError::ToolNotFound`],
//!   [`Html2ImageError::UnsupportedPlatform`]. Memoized for the process.
//! * **Input**: [`Html2ImageError::InvalidSource`],
//!   [`Html2ImageError::InvalidConfig`].
//! * **Execution**: [`Html2ImageError::ConversionExecution`],
//!   [`Html2ImageError::Spawn`], [`Html2ImageError::Timeout`],
//!   [`Html2ImageError::Cancelled`].
//! * **Output**: [`Html2ImageError::OutputMissing`],
//!   [`Html2ImageError::OutputRead`], [`Html2ImageError::OutputWriteFailed`].

use std::path::PathBuf;
use thiserror::Error;
use wkhtml_locate::LocateError;

/// All errors returned by the html2image library.
#[derive(Debug, Error)]
pub enum Html2ImageError {
    // ── Discovery errors ──────────────────────────────────────────────────
    /// wkhtmltoimage could not be located or provisioned.
    #[error("wkhtmltoimage not available: {detail}")]
    ToolNotFound { detail: String },

    /// The host OS family is not supported.
    #[error("Unsupported platform '{os}': no conversion is possible")]
    UnsupportedPlatform { os: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// The source is neither an HTTP(S) URL nor a local file path/URI.
    #[error("Invalid source '{input}': {reason}")]
    InvalidSource { input: String, reason: String },

    /// Option validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Execution errors ──────────────────────────────────────────────────
    /// The tool wrote diagnostics to stderr.
    #[error("wkhtmltoimage reported an error: {stderr}")]
    ConversionExecution { stderr: String },

    /// The tool process could not be started.
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool did not exit within the configured timeout and was killed.
    #[error("wkhtmltoimage did not finish within {secs:.1}s and was terminated")]
    Timeout { secs: f64 },

    /// The conversion was cancelled and the tool was killed.
    #[error("Conversion cancelled")]
    Cancelled,

    // ── Output errors ─────────────────────────────────────────────────────
    /// The tool exited but did not produce the output file.
    #[error("Something went wrong: no image was produced at '{path}'. Please check input parameters")]
    OutputMissing { path: PathBuf },

    /// The output file exists but could not be read.
    #[error("Failed to read output image '{path}': {source}")]
    OutputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A scratch file could not be created in the working directory.
    #[error("Failed to create scratch file in '{dir}': {source}")]
    ScratchFile {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write a caller-requested output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<LocateError> for Html2ImageError {
    fn from(e: LocateError) -> Self {
        match e {
            LocateError::UnsupportedPlatform { os, .. } => Html2ImageError::UnsupportedPlatform { os },
            other => Html2ImageError::ToolNotFound {
                detail: other.to_string(),
            },
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Html2ImageError> = std::result::Result<T, E>;
