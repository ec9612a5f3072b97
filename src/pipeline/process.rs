//! Subprocess execution: launch the tool, wait, judge the outcome.
//!
//! stderr is piped and drained by a separate task for the whole lifetime of
//! the child so a chatty tool can never block on a full pipe. Success or
//! failure is decided only after the child has exited and stderr has been
//! read to the end:
//!
//! 1. stderr with anything but whitespace → [`Html2ImageError::ConversionExecution`]
//! 2. otherwise `Ok`, whatever the exit code. The caller checks for the
//!    output file, which is the real success signal.
//!
//! The timeout and cancellation cover the stderr drain as well as the exit,
//! so a descendant holding the pipe open cannot stall the call. Either one
//! kills the child's process group (Unix) and reaps the child before
//! returning, so nothing is still writing when the caller's scratch guards
//! delete their files. Dropping the returned future kills the direct child
//! (`kill_on_drop`).

use crate::error::Html2ImageError;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

enum Outcome {
    Finished {
        status: std::io::Result<ExitStatus>,
        stderr: Result<std::io::Result<Vec<u8>>, JoinError>,
    },
    TimedOut,
    Cancelled,
}

/// Run `program` with `args` in `work_dir` and wait for it to exit.
///
/// The call is finished only when the child has exited *and* its stderr has
/// reached end-of-file, and both must happen before the deadline. Any byte
/// on stderr other than whitespace is fatal; whitespace-only output (a
/// stray newline) is ignored.
///
/// On Unix the child leads its own process group, and a timeout or
/// cancellation kills the whole group, so helpers it forked do not outlive
/// the call.
pub async fn run(
    program: &OsStr,
    args: &[OsString],
    work_dir: &Path,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<(), Html2ImageError> {
    let program_name = program.to_string_lossy().into_owned();
    let started = Instant::now();

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|source| Html2ImageError::Spawn {
        program: program_name.clone(),
        source,
    })?;
    let pid = child.id();

    let mut stderr_task = match child.stderr.take() {
        Some(mut stderr) => tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await?;
            Ok::<_, std::io::Error>(buf)
        }),
        None => {
            return Err(Html2ImageError::Internal(
                "stderr pipe was not captured".into(),
            ))
        }
    };

    let outcome = tokio::select! {
        (status, stderr) = async {
            let status = child.wait().await;
            let stderr = (&mut stderr_task).await;
            (status, stderr)
        } => Outcome::Finished { status, stderr },
        _ = deadline(timeout) => Outcome::TimedOut,
        _ = cancel.cancelled() => Outcome::Cancelled,
    };

    let (status, stderr) = match outcome {
        Outcome::Finished { status, stderr } => (status, stderr),
        Outcome::TimedOut => {
            terminate(&mut child, pid, &program_name).await;
            stderr_task.abort();
            return Err(Html2ImageError::Timeout {
                secs: timeout.unwrap_or_default().as_secs_f64(),
            });
        }
        Outcome::Cancelled => {
            terminate(&mut child, pid, &program_name).await;
            stderr_task.abort();
            return Err(Html2ImageError::Cancelled);
        }
    };

    let status = status.map_err(|e| {
        Html2ImageError::Internal(format!("waiting for {program_name} failed: {e}"))
    })?;
    let stderr = stderr
        .map_err(|e| Html2ImageError::Internal(format!("stderr reader panicked: {e}")))?
        .map_err(|e| Html2ImageError::Internal(format!("reading stderr failed: {e}")))?;

    debug!(
        program = %program_name,
        status = %status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        stderr_bytes = stderr.len(),
        "Tool exited"
    );

    let diagnostics = String::from_utf8_lossy(&stderr);
    let diagnostics = diagnostics.trim();
    if !diagnostics.is_empty() {
        return Err(Html2ImageError::ConversionExecution {
            stderr: diagnostics.to_string(),
        });
    }

    Ok(())
}

/// Resolves after `timeout`, or never when there is none.
async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(t) => tokio::time::sleep(t).await,
        None => std::future::pending().await,
    }
}

/// Kill the child (and on Unix its process group) and reap it.
async fn terminate(child: &mut Child, pid: Option<u32>, program: &str) {
    #[cfg(unix)]
    if let Some(pgid) = pid.and_then(|p| i32::try_from(p).ok()) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) => {
                if let Err(e) = child.wait().await {
                    warn!(program = %program, error = %e, "Failed to reap tool process");
                }
                return;
            }
            Err(e) => debug!(program = %program, error = %e, "Process group kill failed"),
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.kill().await {
        warn!(program = %program, error = %e, "Failed to kill tool process");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<OsString> {
        vec!["-c".into(), script.into()]
    }

    #[tokio::test]
    async fn clean_exit_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        run(OsStr::new("sh"), &sh("exit 0"), dir.path(), None, &token)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn exit_code_alone_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        run(OsStr::new("sh"), &sh("exit 3"), dir.path(), None, &token)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stderr_output_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let err = run(
            OsStr::new("sh"),
            &sh("echo 'Failed loading page' >&2"),
            dir.path(),
            None,
            &token,
        )
        .await
        .unwrap_err();
        match err {
            Html2ImageError::ConversionExecution { stderr } => {
                assert_eq!(stderr, "Failed loading page")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn whitespace_only_stderr_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        run(OsStr::new("sh"), &sh("printf '\\n  \\n' >&2"), dir.path(), None, &token)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn runs_in_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        run(OsStr::new("sh"), &sh("echo hi > marker"), dir.path(), None, &token)
            .await
            .unwrap();
        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let started = Instant::now();
        let err = run(
            OsStr::new("sh"),
            &sh("sleep 30"),
            dir.path(),
            Some(Duration::from_millis(200)),
            &token,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Html2ImageError::Timeout { .. }), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn stderr_held_open_by_a_descendant_still_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let started = Instant::now();
        let err = run(
            OsStr::new("sh"),
            &sh("sleep 5 & exit 0"),
            dir.path(),
            Some(Duration::from_millis(300)),
            &token,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Html2ImageError::Timeout { .. }), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn timeout_kills_forked_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let err = run(
            OsStr::new("sh"),
            &sh("(sleep 1; echo late > late.txt) 2>/dev/null & sleep 30"),
            dir.path(),
            Some(Duration::from_millis(300)),
            &token,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Html2ImageError::Timeout { .. }));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!dir.path().join("late.txt").exists());
    }

    #[tokio::test]
    async fn cancellation_kills_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = run(OsStr::new("sh"), &sh("sleep 30"), dir.path(), None, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, Html2ImageError::Cancelled));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let err = run(
            OsStr::new("definitely-not-a-real-program-h2i"),
            &[],
            dir.path(),
            None,
            &token,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Html2ImageError::Spawn { .. }));
    }
}
