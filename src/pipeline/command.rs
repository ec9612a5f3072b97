//! Argument construction for `wkhtmltoimage`.
//!
//! ```text
//! wkhtmltoimage --quality <1-100> --width <px> --format <fmt> [--quiet] <source> <output>
//! ```
//!
//! Arguments are handed to the OS as separate argv entries, so paths with
//! spaces need no escaping to reach the tool intact. [`CommandLine::display`]
//! renders the shell-style form used in logs: local sources and the output
//! path in double quotes, remote URLs bare.

use crate::config::RenderOptions;
use crate::pipeline::input::SourceKind;
use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::Path;

/// A fully built argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    args: Vec<OsString>,
    source_is_local: bool,
}

impl CommandLine {
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Shell-style rendering for logs and error messages.
    pub fn display(&self, program: &str) -> String {
        let mut out = String::from(program);
        let last = self.args.len().saturating_sub(1);
        for (i, arg) in self.args.iter().enumerate() {
            let arg = arg.to_string_lossy();
            let is_output = i == last;
            let is_source = i + 1 == last;
            if is_output || (is_source && self.source_is_local) {
                let _ = write!(out, " \"{arg}\"");
            } else {
                let _ = write!(out, " {arg}");
            }
        }
        out
    }
}

/// Build the argument list for one conversion.
///
/// Pure: identical inputs always produce identical output.
pub fn build_args(
    source: &SourceKind,
    output: &Path,
    options: &RenderOptions,
    quiet: bool,
) -> CommandLine {
    let mut args: Vec<OsString> = vec![
        "--quality".into(),
        options.quality.to_string().into(),
        "--width".into(),
        options.width.to_string().into(),
        "--format".into(),
        options.format.name().into(),
    ];
    if quiet {
        args.push("--quiet".into());
    }

    args.push(source.argument().to_owned());
    args.push(output.as_os_str().to_owned());

    CommandLine {
        args,
        source_is_local: source.is_local(),
    }
}
