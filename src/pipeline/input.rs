//! Source classification: is the string a remote URL or a local file?
//!
//! The answer decides how the source argument is rendered on the command
//! line. Classification is a pure function of the string: no filesystem
//! access, no network. Anything that is neither an HTTP(S) URL nor an
//! absolute path / `file://` URI is rejected instead of being guessed at.

use crate::error::Html2ImageError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use url::Url;

/// Where the tool will read the page from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// A file on the local filesystem.
    Local(PathBuf),
    /// An HTTP(S) URL fetched by the tool itself. `original` is the
    /// caller's (trimmed) string, which is what the tool receives; `url`
    /// is the parsed form.
    Remote { url: Url, original: String },
}

impl SourceKind {
    pub fn is_local(&self) -> bool {
        matches!(self, SourceKind::Local(_))
    }

    /// The source as handed to the tool.
    pub fn argument(&self) -> &OsStr {
        match self {
            SourceKind::Local(path) => path.as_os_str(),
            SourceKind::Remote { original, .. } => OsStr::new(original),
        }
    }
}

/// Check if the input string looks like an HTTP(S) URL.
pub fn is_url(input: &str) -> bool {
    let lower = input.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Classify a source string.
///
/// - `http://…` / `https://…` → [`SourceKind::Remote`] (must parse as a URL)
/// - an absolute filesystem path → [`SourceKind::Local`]
/// - a `file://` URI → [`SourceKind::Local`] with the decoded path
/// - anything else (empty, relative, other schemes) → error
pub fn classify(source: &str) -> Result<SourceKind, Html2ImageError> {
    let invalid = |reason: &str| Html2ImageError::InvalidSource {
        input: source.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = source.trim();
    if trimmed.is_empty() {
        return Err(invalid("source is empty"));
    }

    if trimmed.to_ascii_lowercase().starts_with("http") {
        let url = Url::parse(trimmed).map_err(|e| invalid(&format!("malformed URL: {e}")))?;
        return match url.scheme() {
            "http" | "https" if url.host().is_some() => Ok(SourceKind::Remote {
                url,
                original: trimmed.to_string(),
            }),
            "http" | "https" => Err(invalid("URL has no host")),
            _ => Err(invalid("expected an http:// or https:// URL")),
        };
    }

    // Checked before URL parsing: `C:\page.html` would otherwise parse as a
    // URL with scheme `c`.
    let path = Path::new(trimmed);
    if path.is_absolute() {
        return Ok(SourceKind::Local(path.to_path_buf()));
    }

    match Url::parse(trimmed) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map(SourceKind::Local)
            .map_err(|()| invalid("file URI does not map to a local path")),
        Ok(url) => Err(invalid(&format!("unsupported scheme '{}'", url.scheme()))),
        Err(_) => Err(invalid(
            "not an http(s) URL, an absolute path or a file:// URI",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/page"));
        assert!(is_url("http://example.com/page"));
        assert!(is_url("HTTP://EXAMPLE.COM"));
        assert!(!is_url("/tmp/page.html"));
        assert!(!is_url("page.html"));
        assert!(!is_url(""));
    }

    #[test]
    fn http_urls_are_remote() {
        let kind = classify("http://example.com/page").unwrap();
        assert!(matches!(kind, SourceKind::Remote { ref url, .. } if url.host_str() == Some("example.com")));
        assert!(!kind.is_local());

        assert!(matches!(
            classify("https://example.com/a?b=c").unwrap(),
            SourceKind::Remote { .. }
        ));
    }

    #[test]
    fn remote_argument_is_the_caller_string() {
        // The parsed form would be "http://google.com/" and "...a%20b".
        for raw in ["http://google.com", "https://example.com/a b?q=1"] {
            let kind = classify(&format!("  {raw}\n")).unwrap();
            assert_eq!(kind.argument(), OsStr::new(raw));
        }
    }

    #[cfg(unix)]
    #[test]
    fn absolute_paths_are_local() {
        assert_eq!(
            classify("/tmp/scratch123.html").unwrap(),
            SourceKind::Local(PathBuf::from("/tmp/scratch123.html"))
        );
        assert_eq!(
            classify("/tmp/with space/page.html").unwrap(),
            SourceKind::Local(PathBuf::from("/tmp/with space/page.html"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn local_argument_is_the_path() {
        let kind = classify("/tmp/with space/page.html").unwrap();
        assert!(kind.is_local());
        assert_eq!(kind.argument(), OsStr::new("/tmp/with space/page.html"));
    }

    #[cfg(unix)]
    #[test]
    fn file_uris_are_local() {
        assert_eq!(
            classify("file:///tmp/my%20page.html").unwrap(),
            SourceKind::Local(PathBuf::from("/tmp/my page.html"))
        );
    }

    #[test]
    fn empty_and_blank_are_errors() {
        for s in ["", "   ", "\n"] {
            assert!(
                matches!(classify(s), Err(Html2ImageError::InvalidSource { .. })),
                "{s:?}"
            );
        }
    }

    #[test]
    fn malformed_inputs_are_errors() {
        for s in [
            "http://",
            "httpfoo",
            "page.html",
            "relative/dir/page.html",
            "ftp://example.com/page",
            "data:text/html,<p>hi</p>",
        ] {
            assert!(classify(s).is_err(), "{s:?} should not classify");
        }
    }
}
