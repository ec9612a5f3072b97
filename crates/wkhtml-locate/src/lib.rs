//! # wkhtml-locate
//!
//! Find the `wkhtmltoimage` executable exactly once per process.
//!
//! ## How it works
//!
//! On the first call to [`resolve`]:
//!
//! 1. [`detect_platform`] picks a [`Platform`] strategy from the host OS family.
//! 2. The strategy locates the tool:
//!    - **Windows**: `<exe dir>/wkhtmltoimage.exe`. When it is missing and the
//!      crate was built with the `bundled` feature, the embedded copy is
//!      written there first.
//!    - **Unix-like**: a `PATH` lookup; the bare command name is returned.
//!    - **Anything else**: [`LocateError::UnsupportedPlatform`].
//! 3. The outcome, success or failure, is stored for the rest of the process.
//!
//! Subsequent calls never touch the filesystem again. A failed discovery is
//! final: every later call gets a clone of the same error.
//!
//! ## Usage
//!
//! ```rust,no_run
//! let tool = wkhtml_locate::resolve().expect("wkhtmltoimage unavailable");
//! println!("using {}", tool);
//! ```

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;
use tracing::{debug, info};

#[cfg(feature = "bundled")]
mod bundled {
    include!(concat!(env!("OUT_DIR"), "/bundled.rs"));
}

// ── Public constants ─────────────────────────────────────────────────────────

/// Command name of the external renderer.
pub const TOOL_NAME: &str = "wkhtmltoimage";

/// Where operators can obtain the renderer.
pub const DOWNLOAD_URL: &str = "https://wkhtmltopdf.org/downloads.html";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by tool discovery.
///
/// `Clone` because a failed discovery is memoized and handed to every caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    /// The host OS family has no discovery strategy.
    #[error("Unsupported platform: {os} (family: {family:?}); wkhtmltoimage cannot be located")]
    UnsupportedPlatform { os: String, family: String },

    /// The tool is not installed where the strategy looks for it.
    #[error("{tool} does not appear to be installed: {detail}\nInstall the wkhtmltopdf package; see {url}", url = DOWNLOAD_URL)]
    NotInstalled { tool: String, detail: String },

    /// The embedded executable could not be written to disk.
    #[error("Failed to provision {path:?}: {reason}")]
    Extract { path: PathBuf, reason: String },
}

// ── Tool location ────────────────────────────────────────────────────────────

/// Where the external renderer lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolLocation {
    /// An explicit path to the executable.
    Path(PathBuf),
    /// A bare command name resolved through `PATH` at spawn time.
    Command(String),
}

impl ToolLocation {
    /// The program argument for `Command::new`.
    pub fn program(&self) -> &OsStr {
        match self {
            ToolLocation::Path(p) => p.as_os_str(),
            ToolLocation::Command(name) => OsStr::new(name),
        }
    }
}

impl fmt::Display for ToolLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolLocation::Path(p) => write!(f, "{}", p.display()),
            ToolLocation::Command(name) => f.write_str(name),
        }
    }
}

// ── Platform strategies ──────────────────────────────────────────────────────

/// A discovery strategy for one OS family.
pub trait Platform: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Locate (or provision) the renderer.
    fn locate(&self) -> Result<ToolLocation, LocateError>;
}

/// Windows: the executable sits next to the running program.
#[derive(Debug, Clone)]
pub struct WindowsPlatform {
    base_dir: PathBuf,
}

impl WindowsPlatform {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// `<base dir>/wkhtmltoimage.exe`
    pub fn tool_path(&self) -> PathBuf {
        self.base_dir.join(format!("{TOOL_NAME}.exe"))
    }
}

impl Platform for WindowsPlatform {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn locate(&self) -> Result<ToolLocation, LocateError> {
        let path = self.tool_path();
        if path.is_file() {
            return Ok(ToolLocation::Path(path));
        }
        provision(&path)?;
        Ok(ToolLocation::Path(path))
    }
}

/// Unix-like systems: look the tool up on the executable search path.
#[derive(Debug, Clone, Default)]
pub struct UnixPlatform {
    search_path: Option<OsString>,
}

impl UnixPlatform {
    /// Search the process `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Search an explicit `PATH`-style list instead of the environment.
    ///
    /// A hit is returned as a full path, since the bare name would not
    /// resolve against the process `PATH` at spawn time.
    pub fn with_search_path(paths: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(paths.into()),
        }
    }
}

impl Platform for UnixPlatform {
    fn name(&self) -> &'static str {
        "unix"
    }

    fn locate(&self) -> Result<ToolLocation, LocateError> {
        let not_installed = |e: which::Error| LocateError::NotInstalled {
            tool: TOOL_NAME.to_string(),
            detail: format!("not found on the executable search path ({e})"),
        };

        match &self.search_path {
            None => {
                let found = which::which(TOOL_NAME).map_err(not_installed)?;
                debug!(path = %found.display(), "{} found on PATH", TOOL_NAME);
                Ok(ToolLocation::Command(TOOL_NAME.to_string()))
            }
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
                let found =
                    which::which_in(TOOL_NAME, Some(paths), cwd).map_err(not_installed)?;
                Ok(ToolLocation::Path(found))
            }
        }
    }
}

/// Any OS family without a strategy. Always fails.
#[derive(Debug, Clone)]
pub struct UnsupportedPlatform {
    os: String,
    family: String,
}

impl UnsupportedPlatform {
    pub fn new(os: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            family: family.into(),
        }
    }
}

impl Platform for UnsupportedPlatform {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn locate(&self) -> Result<ToolLocation, LocateError> {
        Err(LocateError::UnsupportedPlatform {
            os: self.os.clone(),
            family: self.family.clone(),
        })
    }
}

/// Select the strategy for the host.
pub fn detect_platform() -> Box<dyn Platform> {
    match std::env::consts::FAMILY {
        "windows" => Box::new(WindowsPlatform::new(base_dir())),
        "unix" => Box::new(UnixPlatform::new()),
        family => Box::new(UnsupportedPlatform::new(std::env::consts::OS, family)),
    }
}

/// Directory of the running executable, falling back to the working directory.
pub fn base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

// ── Memoized resolution ──────────────────────────────────────────────────────

/// Runs a [`Platform`] strategy at most once and remembers the outcome.
///
/// Concurrent first callers block on the same initialisation; none of them
/// runs the strategy a second time.
pub struct ToolLocator {
    platform: Box<dyn Platform>,
    resolved: OnceLock<Result<ToolLocation, LocateError>>,
}

impl ToolLocator {
    pub fn new(platform: Box<dyn Platform>) -> Self {
        Self {
            platform,
            resolved: OnceLock::new(),
        }
    }

    /// Resolve the tool, running discovery on the first call only.
    pub fn resolve(&self) -> Result<&ToolLocation, LocateError> {
        self.resolved
            .get_or_init(|| {
                let outcome = self.platform.locate();
                match &outcome {
                    Ok(location) => {
                        info!(platform = self.platform.name(), tool = %location, "wkhtmltoimage located")
                    }
                    Err(e) => {
                        info!(platform = self.platform.name(), error = %e, "wkhtmltoimage discovery failed")
                    }
                }
                outcome
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// `true` once discovery has run (successfully or not).
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }
}

impl fmt::Debug for ToolLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolLocator")
            .field("platform", &self.platform.name())
            .field("resolved", &self.resolved.get())
            .finish()
    }
}

static LOCATOR: OnceLock<ToolLocator> = OnceLock::new();

/// The process-wide locator for the host platform.
pub fn locator() -> &'static ToolLocator {
    LOCATOR.get_or_init(|| ToolLocator::new(detect_platform()))
}

/// Resolve the tool for this process. Discovery runs once; later calls are
/// a memory read.
pub fn resolve() -> Result<&'static ToolLocation, LocateError> {
    locator().resolve()
}

// ── Provisioning ─────────────────────────────────────────────────────────────

#[cfg(feature = "bundled")]
fn provision(dest: &Path) -> Result<(), LocateError> {
    let extract_err = |e: std::io::Error| LocateError::Extract {
        path: dest.to_path_buf(),
        reason: e.to_string(),
    };

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(extract_err)?;
    }

    // Write beside the target and rename so a crash never leaves a truncated
    // executable at the final path.
    let partial = dest.with_extension("exe.partial");
    std::fs::write(&partial, bundled::TOOL_BYTES).map_err(extract_err)?;
    std::fs::rename(&partial, dest).map_err(extract_err)?;

    info!(
        path = %dest.display(),
        bytes = bundled::TOOL_BYTES.len(),
        "Extracted bundled wkhtmltoimage"
    );
    Ok(())
}

#[cfg(not(feature = "bundled"))]
fn provision(dest: &Path) -> Result<(), LocateError> {
    Err(LocateError::NotInstalled {
        tool: TOOL_NAME.to_string(),
        detail: format!(
            "{} is missing and this build carries no embedded copy",
            dest.display()
        ),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        calls: Arc<AtomicUsize>,
        outcome: Result<ToolLocation, LocateError>,
    }

    impl Platform for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn locate(&self) -> Result<ToolLocation, LocateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Widen the window for racing first callers.
            std::thread::sleep(std::time::Duration::from_millis(20));
            self.outcome.clone()
        }
    }

    #[test]
    fn discovery_runs_once_under_concurrency() {
        let calls = Arc::new(AtomicUsize::new(0));
        let locator = Arc::new(ToolLocator::new(Box::new(Counting {
            calls: Arc::clone(&calls),
            outcome: Ok(ToolLocation::Command(TOOL_NAME.into())),
        })));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locator = Arc::clone(&locator);
                std::thread::spawn(move || locator.resolve().cloned())
            })
            .collect();

        for h in handles {
            assert_eq!(
                h.join().unwrap(),
                Ok(ToolLocation::Command(TOOL_NAME.into()))
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_is_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let err = LocateError::NotInstalled {
            tool: TOOL_NAME.into(),
            detail: "nope".into(),
        };
        let locator = ToolLocator::new(Box::new(Counting {
            calls: Arc::clone(&calls),
            outcome: Err(err.clone()),
        }));

        assert!(!locator.is_resolved());
        assert_eq!(locator.resolve(), Err(err.clone()));
        assert_eq!(locator.resolve(), Err(err));
        assert!(locator.is_resolved());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsupported_platform_fails() {
        let locator = ToolLocator::new(Box::new(UnsupportedPlatform::new("plan9", "")));
        let err = locator.resolve().unwrap_err();
        assert!(matches!(err, LocateError::UnsupportedPlatform { ref os, .. } if os == "plan9"));
        assert!(err.to_string().contains("plan9"));
    }

    #[test]
    fn windows_strategy_uses_existing_exe() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("wkhtmltoimage.exe");
        std::fs::write(&exe, b"MZ").unwrap();

        let platform = WindowsPlatform::new(dir.path());
        assert_eq!(platform.locate(), Ok(ToolLocation::Path(exe)));
    }

    #[cfg(not(feature = "bundled"))]
    #[test]
    fn windows_strategy_without_bundle_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = WindowsPlatform::new(dir.path()).locate().unwrap_err();
        assert!(matches!(err, LocateError::NotInstalled { .. }));
        assert!(err.to_string().contains(DOWNLOAD_URL));
    }

    #[cfg(unix)]
    #[test]
    fn unix_strategy_searches_given_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join(TOOL_NAME);
        std::fs::write(&tool, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let platform = UnixPlatform::with_search_path(dir.path().as_os_str());
        assert_eq!(platform.locate(), Ok(ToolLocation::Path(tool)));
    }

    #[test]
    fn unix_strategy_names_package_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = UnixPlatform::with_search_path(dir.path().as_os_str())
            .locate()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(TOOL_NAME), "got: {msg}");
        assert!(msg.contains("wkhtmltopdf"), "got: {msg}");
    }

    #[test]
    fn tool_location_display_and_program() {
        let cmd = ToolLocation::Command(TOOL_NAME.into());
        assert_eq!(cmd.to_string(), TOOL_NAME);
        assert_eq!(cmd.program(), OsStr::new(TOOL_NAME));

        let path = ToolLocation::Path(PathBuf::from("/opt/wk/wkhtmltoimage"));
        assert_eq!(path.program(), OsStr::new("/opt/wk/wkhtmltoimage"));
    }

    #[test]
    fn base_dir_is_a_directory() {
        assert!(base_dir().is_dir());
    }
}
