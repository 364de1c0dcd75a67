//! External rotation command execution and success classification.
//!
//! The rotation tool is an opaque executable. Whether a run succeeded is
//! decided by its output text, not its exit code: the tool prints a known
//! marker on success and historically has exited 0 on some failures. The
//! engine talks to a [`CommandRunner`] so tests can script outcomes without
//! spawning processes.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Substrings that mark a successful rotation, matched case-insensitively
/// anywhere in the merged output.
pub const SUCCESS_MARKERS: &[&str] = &["success", "shuffled the salt keys"];

/// Default wall-clock bound on one command run.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Whether `output` contains any success marker.
///
/// Known quirk, kept on purpose: unrelated output that happens to contain
/// the word "success" classifies as a successful rotation.
pub fn output_indicates_success(output: &str) -> bool {
    let lowered = output.to_lowercase();
    SUCCESS_MARKERS.iter().any(|marker| lowered.contains(marker))
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Why a command run counts as failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunFailure {
    /// The executable path does not exist or carries no execute bit.
    #[error("executable missing or not executable: {0}")]
    ExecutableMissing(String),

    /// The process could not be spawned at all.
    #[error("executor unavailable: {0}")]
    ExecutorUnavailable(String),

    /// The command ran but its output carried no success marker.
    #[error("command output contained no success marker")]
    CommandFailure,

    /// The command produced no output at all.
    #[error("execution failed")]
    CommandCrashed,

    /// The command exceeded its wall-clock bound and was killed.
    #[error("timed out")]
    TimedOut,
}

/// Result of one command run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Merged stdout and stderr, possibly empty.
    pub output: String,
    /// `None` when a success marker was found.
    pub failure: Option<RunFailure>,
}

impl RunOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            failure: None,
        }
    }

    pub fn failure(output: impl Into<String>, failure: RunFailure) -> Self {
        Self {
            output: output.into(),
            failure: Some(failure),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Error text for the audit record; empty on success.
    pub fn error_detail(&self) -> String {
        match &self.failure {
            Some(failure) => failure.to_string(),
            None => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Runner trait + production implementation
// ---------------------------------------------------------------------------

/// Runs the external rotation command.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &Path, args: &[String]) -> RunOutcome;
}

/// Spawns the real process under a bounded timeout.
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &Path, args: &[String]) -> RunOutcome {
        // Verify the executable exists and is actually executable before
        // spawning, so a bad path classifies distinctly from a bad run.
        let metadata = match tokio::fs::metadata(program).await {
            Ok(metadata) => metadata,
            Err(_) => {
                return RunOutcome::failure(
                    String::new(),
                    RunFailure::ExecutableMissing(program.display().to_string()),
                );
            }
        };
        if metadata.permissions().mode() & 0o111 == 0 {
            return RunOutcome::failure(
                String::new(),
                RunFailure::ExecutableMissing(program.display().to_string()),
            );
        }

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // If the timeout fires, dropping the output future kills the child
        // because of `kill_on_drop(true)`.
        let result = tokio::time::timeout(self.timeout, cmd.output()).await;

        match result {
            Ok(Ok(output)) => {
                let mut merged = String::from_utf8_lossy(&output.stdout).into_owned();
                merged.push_str(&String::from_utf8_lossy(&output.stderr));
                classify(merged)
            }
            Ok(Err(e)) => {
                RunOutcome::failure(String::new(), RunFailure::ExecutorUnavailable(e.to_string()))
            }
            Err(_elapsed) => RunOutcome::failure(String::new(), RunFailure::TimedOut),
        }
    }
}

/// Classify merged output: no output at all means the execution mechanism
/// broke; otherwise the marker decides.
fn classify(merged: String) -> RunOutcome {
    if merged.trim().is_empty() {
        return RunOutcome::failure(merged, RunFailure::CommandCrashed);
    }
    if output_indicates_success(&merged) {
        RunOutcome::success(merged)
    } else {
        RunOutcome::failure(merged, RunFailure::CommandFailure)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn sh_args(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    async fn run_sh(script: &str) -> RunOutcome {
        ProcessRunner::default()
            .run(Path::new("/bin/sh"), &sh_args(script))
            .await
    }

    // -- output_indicates_success -------------------------------------------

    #[test]
    fn marker_matches_any_case() {
        assert!(output_indicates_success("Success: Shuffled the salt keys."));
        assert!(output_indicates_success("sUcCeSs"));
        assert!(output_indicates_success("SHUFFLED THE SALT KEYS"));
    }

    #[test]
    fn marker_matches_amid_unrelated_text() {
        assert!(output_indicates_success(
            "lots of noise\nthen a Successful step\nmore noise"
        ));
    }

    #[test]
    fn no_marker_means_failure() {
        assert!(!output_indicates_success("rotation completed"));
        assert!(!output_indicates_success(""));
    }

    // -- classification -----------------------------------------------------

    #[test]
    fn empty_output_classifies_as_crashed() {
        let outcome = classify("  \n".to_string());
        assert_matches!(outcome.failure, Some(RunFailure::CommandCrashed));
        assert_eq!(outcome.error_detail(), "execution failed");
    }

    #[test]
    fn error_detail_is_empty_on_success() {
        let outcome = classify("Success".to_string());
        assert!(outcome.succeeded());
        assert_eq!(outcome.error_detail(), "");
    }

    // -- ProcessRunner ------------------------------------------------------

    #[tokio::test]
    async fn success_marker_on_stdout() {
        let outcome = run_sh("echo 'Success: Shuffled the salt keys.'").await;
        assert!(outcome.succeeded());
        assert!(outcome.output.contains("Shuffled"));
    }

    #[tokio::test]
    async fn success_marker_on_stderr_counts() {
        let outcome = run_sh("echo Success >&2").await;
        assert!(outcome.succeeded());
    }

    #[tokio::test]
    async fn zero_exit_without_marker_is_failure() {
        let outcome = run_sh("echo 'all done'; exit 0").await;
        assert_matches!(outcome.failure, Some(RunFailure::CommandFailure));
        assert!(outcome.output.contains("all done"));
    }

    #[tokio::test]
    async fn nonzero_exit_with_marker_is_success() {
        let outcome = run_sh("echo Success; exit 3").await;
        assert!(outcome.succeeded(), "output is authoritative over exit code");
    }

    #[tokio::test]
    async fn silent_command_is_crashed() {
        let outcome = run_sh("true").await;
        assert_matches!(outcome.failure, Some(RunFailure::CommandCrashed));
        assert_eq!(outcome.error_detail(), "execution failed");
    }

    #[tokio::test]
    async fn missing_executable_never_spawns() {
        let outcome = ProcessRunner::default()
            .run(Path::new("/nonexistent/rotate-keys"), &[])
            .await;
        assert_matches!(outcome.failure, Some(RunFailure::ExecutableMissing(_)));
        assert!(outcome.output.is_empty());
    }

    #[tokio::test]
    async fn non_executable_file_is_missing() {
        let f = tempfile::NamedTempFile::new().expect("create temp file");
        let outcome = ProcessRunner::default().run(f.path(), &[]).await;
        assert_matches!(outcome.failure, Some(RunFailure::ExecutableMissing(_)));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let outcome = ProcessRunner::new(Duration::from_millis(200))
            .run(Path::new("/bin/sh"), &sh_args("sleep 60"))
            .await;
        assert_matches!(outcome.failure, Some(RunFailure::TimedOut));
        assert_eq!(outcome.error_detail(), "timed out");
    }
}
