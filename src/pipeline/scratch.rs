//! Scratch files: uniquely named, scoped to one conversion.
//!
//! Both kinds of scratch file are [`tempfile::TempPath`] guards, so the file
//! is removed when the guard drops: on success, on any error, on timeout,
//! and when the conversion future itself is dropped.
//!
//! - The **input** file is created with the caller's markup in it.
//! - The **output** file is only *named*. The tool creates it, and its
//!   existence after exit is the success signal, so it must not exist
//!   beforehand.
//!
//! Names carry 16 random characters, which keeps concurrent conversions
//! sharing one working directory from colliding.

use crate::config::ImageFormat;
use crate::error::Html2ImageError;
use std::io::Write;
use std::path::Path;
use tempfile::{Builder, TempPath};
use tracing::debug;

const PREFIX: &str = "html2image-";
const RAND_BYTES: usize = 16;

/// Write `html` to a fresh `.html` file in `dir`.
pub fn write_html(dir: &Path, html: &str) -> Result<TempPath, Html2ImageError> {
    let scratch_err = |source| Html2ImageError::ScratchFile {
        dir: dir.to_path_buf(),
        source,
    };

    let mut file = Builder::new()
        .prefix(PREFIX)
        .suffix(".html")
        .rand_bytes(RAND_BYTES)
        .tempfile_in(dir)
        .map_err(scratch_err)?;
    file.write_all(html.as_bytes()).map_err(scratch_err)?;
    file.flush().map_err(scratch_err)?;

    // Close the handle; only the path guard is needed from here on.
    let path = file.into_temp_path();
    debug!(path = %path.display(), bytes = html.len(), "Wrote scratch HTML");
    Ok(path)
}

/// Reserve a unique, not-yet-existing output path in `dir`.
pub fn reserve_output(dir: &Path, format: ImageFormat) -> Result<TempPath, Html2ImageError> {
    let suffix = format!(".{}", format.extension());
    let reserved = Builder::new()
        .prefix(PREFIX)
        .suffix(&suffix)
        .rand_bytes(RAND_BYTES)
        .make_in(dir, |_| Ok(()))
        .map_err(|source| Html2ImageError::ScratchFile {
            dir: dir.to_path_buf(),
            source,
        })?;

    let path = reserved.into_temp_path();
    debug!(path = %path.display(), "Reserved scratch output");
    Ok(path)
}
