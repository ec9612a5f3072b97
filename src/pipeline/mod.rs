//! Pipeline stages for HTML-to-image conversion.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own without the external tool installed.
//!
//! ## Data Flow
//!
//! ```text
//! scratch ──▶ input ──▶ command ──▶ process ──▶ scratch
//! (write html) (classify) (argv)    (run tool)  (read + delete output)
//! ```
//!
//! 1. [`scratch`] — uniquely named scratch files, deleted when dropped
//! 2. [`input`]   — classify the source as a local file or a remote URL
//! 3. [`command`] — build the `wkhtmltoimage` argument list
//! 4. [`process`] — spawn, buffer stderr, wait (with timeout/cancellation)

pub mod command;
pub mod input;
pub mod process;
pub mod scratch;
