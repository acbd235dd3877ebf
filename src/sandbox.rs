//! Runs a generated script in a child process with a hard wall-clock limit.
//!
//! The script is patched, written to a temporary file inside the output
//! directory and executed there. Every outcome, including launch faults and
//! timeouts, is folded into an [`ExecutionResult`]; nothing escapes as an
//! error.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant, SystemTime};

use serde::{Deserialize, Serialize};
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::ExecutionResult;
use crate::patch;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const ARTIFACT_EXTENSION: &str = "png";
pub const NOT_CREATED: &str = "Diagram file was not created";

const SCRIPT_PREFIX: &str = ".archgen-";
const SCRIPT_SUFFIX: &str = ".py";

/// Bytes kept from each of stdout and stderr.
const MAX_CAPTURED_BYTES: u64 = 64 * 1024;
const TRUNCATED_MARKER: &str = "\n[output truncated]";
/// How long to wait for output after the script has exited.
const OUTPUT_GRACE: Duration = Duration::from_secs(1);

/// Restrictions applied to the child process. The generated code is untrusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxPolicy {
    /// When set, the child sees only these environment variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_allowlist: Option<Vec<String>>,
    /// CPU-time ceiling in seconds (Unix only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_limit_secs: Option<u64>,
    /// Largest file the child may write, in MiB (Unix only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_size_mb: Option<u64>,
}

impl SandboxPolicy {
    fn apply(&self, command: &mut Command) {
        if let Some(allowlist) = &self.env_allowlist {
            command.env_clear();
            for key in allowlist {
                if let Some(value) = std::env::var_os(key) {
                    command.env(key, value);
                }
            }
        }

        #[cfg(unix)]
        {
            // Own process group, so a timeout can take down grandchildren too.
            command.process_group(0);

            let cpu_secs = self.cpu_limit_secs;
            let file_bytes = self.max_file_size_mb.map(|mb| mb.saturating_mul(1024 * 1024));
            if cpu_secs.is_some() || file_bytes.is_some() {
                // SAFETY: the closure only calls setrlimit, which is async-signal-safe.
                unsafe {
                    command.pre_exec(move || rlimits::apply(cpu_secs, file_bytes));
                }
            }
        }
    }
}

#[cfg(unix)]
mod rlimits {
    use std::io;

    pub fn apply(cpu_secs: Option<u64>, file_bytes: Option<u64>) -> io::Result<()> {
        if let Some(secs) = cpu_secs {
            let limit = libc::rlimit {
                rlim_cur: secs as libc::rlim_t,
                rlim_max: secs as libc::rlim_t,
            };
            if unsafe { libc::setrlimit(libc::RLIMIT_CPU, &limit) } != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        if let Some(bytes) = file_bytes {
            let limit = libc::rlimit {
                rlim_cur: bytes as libc::rlim_t,
                rlim_max: bytes as libc::rlim_t,
            };
            if unsafe { libc::setrlimit(libc::RLIMIT_FSIZE, &limit) } != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }
}

/// Executes generated diagram scripts with the configured interpreter.
#[derive(Debug, Clone)]
pub struct Executor {
    interpreter: String,
    policy: SandboxPolicy,
}

impl Executor {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            policy: SandboxPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SandboxPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Patches `code`, runs it inside `output_dir` and reports whether
    /// `{output_dir}/{output_filename}.png` was produced by a clean exit.
    pub async fn execute(
        &self,
        code: &str,
        output_dir: &Path,
        output_filename: &str,
        limit: Duration,
    ) -> ExecutionResult {
        let started = Instant::now();
        let patched = patch::patch(code, output_filename);

        let script = match write_script(output_dir, &patched) {
            Ok(script) => script,
            Err(e) => {
                return ExecutionResult::failure(format!(
                    "Failed to write temporary script in {}: {e}",
                    output_dir.display()
                ));
            }
        };

        let result = self
            .run_script(&script, output_dir, output_filename, limit)
            .await;

        let script_path = script.to_path_buf();
        if let Err(e) = script.close() {
            warn!(path = %script_path.display(), error = %e, "failed to remove temporary script");
        }

        info!(
            output = output_filename,
            success = result.is_success(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "diagram script finished"
        );
        result
    }

    async fn run_script(
        &self,
        script: &Path,
        output_dir: &Path,
        output_filename: &str,
        limit: Duration,
    ) -> ExecutionResult {
        let interpreter = match which::which(&self.interpreter) {
            Ok(path) => path,
            Err(e) => {
                return ExecutionResult::failure(format!(
                    "Interpreter not found: {} ({e})",
                    self.interpreter
                ));
            }
        };

        // The child runs inside output_dir, so hand it the bare file name.
        let script_name = script.file_name().unwrap_or(script.as_os_str());

        let mut command = Command::new(&interpreter);
        command
            .arg(script_name)
            .current_dir(output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        self.policy.apply(&mut command);

        let artifact = artifact_path(output_dir, output_filename);
        let before = artifact_stamp(&artifact);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult::failure(format!(
                    "Failed to launch {}: {e}",
                    interpreter.display()
                ));
            }
        };
        // `Child::id` is gone once the child is reaped; the group id outlives it.
        let pid = child.id();
        debug!(pid, interpreter = %interpreter.display(), "spawned diagram script");

        let stdout = tokio::spawn(read_pipe(child.stdout.take()));
        let stderr = tokio::spawn(read_pipe(child.stderr.take()));

        let waited = tokio::time::timeout(limit, child.wait()).await;
        // Anything the script left running in the background goes with it.
        kill_group(pid);

        let status = match waited {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return ExecutionResult::failure(format!("Failed to wait for script: {e}")),
            Err(_) => {
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "kill after timeout reported an error");
                }
                stdout.abort();
                stderr.abort();
                warn!(output = output_filename, limit_secs = limit.as_secs_f64(), "diagram script timed out");
                return ExecutionResult::failure(format!(
                    "Diagram generation timed out ({} limit)",
                    format_limit(limit)
                ));
            }
        };
        debug!(exit_code = status.code(), "diagram script exited");

        if status.success() {
            stdout.abort();
            stderr.abort();
            return match artifact_stamp(&artifact) {
                Some(after) if before != Some(after) => ExecutionResult::success(artifact),
                Some(_) => {
                    warn!(path = %artifact.display(), "artifact was not rewritten by this run");
                    ExecutionResult::failure(NOT_CREATED)
                }
                None => ExecutionResult::failure(NOT_CREATED),
            };
        }

        let stdout = collect_output(stdout).await;
        let stderr = collect_output(stderr).await;
        let output = if stderr.trim().is_empty() { stdout } else { stderr };
        let output = output.trim_end();
        if output.is_empty() {
            ExecutionResult::failure(format!("Script exited with {status}"))
        } else {
            ExecutionResult::failure(output)
        }
    }
}

/// Where the artifact for `output_filename` is expected to appear.
pub fn artifact_path(output_dir: &Path, output_filename: &str) -> PathBuf {
    output_dir.join(format!("{output_filename}.{ARTIFACT_EXTENSION}"))
}

fn write_script(dir: &Path, code: &str) -> io::Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(SCRIPT_PREFIX)
        .suffix(SCRIPT_SUFFIX)
        .tempfile_in(dir)?;
    file.write_all(code.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}

/// Modification time of the artifact, if it exists as a regular file. A run
/// only succeeds when it leaves a different stamp than the one found before.
fn artifact_stamp(path: &Path) -> Option<SystemTime> {
    fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .and_then(|m| m.modified().ok())
}

/// Captures at most [`MAX_CAPTURED_BYTES`] of a pipe and drains the rest, so
/// the child never blocks on a full pipe.
async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let Some(mut pipe) = pipe else {
        return String::new();
    };

    let mut buf = Vec::new();
    if let Err(e) = (&mut pipe).take(MAX_CAPTURED_BYTES).read_to_end(&mut buf).await {
        debug!(error = %e, "failed to read child output");
    }

    let mut output = String::from_utf8_lossy(&buf).into_owned();
    match tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await {
        Ok(0) => {}
        Ok(skipped) => {
            debug!(skipped, "discarded child output beyond the capture limit");
            output.push_str(TRUNCATED_MARKER);
        }
        Err(e) => debug!(error = %e, "failed to drain child output"),
    }
    output
}

/// Output of a pipe reader, or nothing if the pipe is still held open by a
/// process outside our reach.
async fn collect_output(reader: JoinHandle<String>) -> String {
    match tokio::time::timeout(OUTPUT_GRACE, reader).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            debug!(error = %e, "child output reader failed");
            String::new()
        }
        Err(_) => {
            debug!("child output still open after exit");
            String::new()
        }
    }
}

/// SIGKILL to the process group led by the script (Unix). A no-op elsewhere.
fn kill_group(pid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) {
            // SAFETY: plain signal delivery to the group the child leads.
            unsafe {
                libc::killpg(pid, libc::SIGKILL);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pid;
}

fn format_limit(limit: Duration) -> String {
    if limit.subsec_nanos() == 0 {
        format!("{}s", limit.as_secs())
    } else {
        format!("{}s", limit.as_secs_f64())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh() -> Executor {
        Executor::new("sh")
    }

    fn leftover_scripts(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "py"))
            .collect()
    }

    #[tokio::test]
    async fn test_success_when_exit_zero_and_artifact_exists() {
        let dir = TempDir::new().unwrap();
        let result = sh()
            .execute("echo ignored\n: > diag.png\n", dir.path(), "diag", DEFAULT_TIMEOUT)
            .await;

        assert_eq!(result, ExecutionResult::success(dir.path().join("diag.png")));
        assert!(leftover_scripts(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_missing_artifact_is_failure() {
        let dir = TempDir::new().unwrap();
        let result = sh()
            .execute("exit 0\n", dir.path(), "diag", DEFAULT_TIMEOUT)
            .await;

        assert_eq!(result, ExecutionResult::failure(NOT_CREATED));
        assert!(leftover_scripts(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr_even_if_file_exists() {
        let dir = TempDir::new().unwrap();
        let result = sh()
            .execute(
                ": > diag.png\necho partial\necho boom >&2\nexit 1\n",
                dir.path(),
                "diag",
                DEFAULT_TIMEOUT,
            )
            .await;

        assert_eq!(result, ExecutionResult::failure("boom"));
        assert!(dir.path().join("diag.png").exists());
        assert!(leftover_scripts(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_nonzero_exit_falls_back_to_stdout() {
        let dir = TempDir::new().unwrap();
        let result = sh()
            .execute("echo only-stdout\nexit 3\n", dir.path(), "diag", DEFAULT_TIMEOUT)
            .await;

        assert_eq!(result, ExecutionResult::failure("only-stdout"));
    }

    #[tokio::test]
    async fn test_silent_nonzero_exit_reports_status() {
        let dir = TempDir::new().unwrap();
        let result = sh()
            .execute("exit 4\n", dir.path(), "diag", DEFAULT_TIMEOUT)
            .await;

        assert!(result.message().unwrap().contains('4'));
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let dir = TempDir::new().unwrap();
        let result = sh()
            .execute(
                "echo $$ > pid.txt\nexec sleep 30\n",
                dir.path(),
                "diag",
                Duration::from_secs(1),
            )
            .await;

        assert_eq!(
            result,
            ExecutionResult::failure("Diagram generation timed out (1s limit)")
        );
        assert!(leftover_scripts(dir.path()).is_empty());

        let pid: libc::pid_t = std::fs::read_to_string(dir.path().join("pid.txt"))
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let alive = unsafe { libc::kill(pid, 0) } == 0;
        assert!(!alive, "child process {pid} still running after timeout");
    }

    #[tokio::test]
    async fn test_fractional_timeout_message() {
        let dir = TempDir::new().unwrap();
        let result = sh()
            .execute("exec sleep 30\n", dir.path(), "diag", Duration::from_millis(300))
            .await;

        assert_eq!(
            result,
            ExecutionResult::failure("Diagram generation timed out (0.3s limit)")
        );
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_failure() {
        let dir = TempDir::new().unwrap();
        let result = Executor::new("archgen-no-such-interpreter")
            .execute(": > diag.png\n", dir.path(), "diag", DEFAULT_TIMEOUT)
            .await;

        let message = result.message().unwrap();
        assert!(message.contains("Interpreter not found"));
        assert!(message.contains("archgen-no-such-interpreter"));
        assert!(leftover_scripts(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_missing_output_dir_is_failure() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let result = sh()
            .execute(": > diag.png\n", &missing, "diag", DEFAULT_TIMEOUT)
            .await;

        assert!(result
            .message()
            .unwrap()
            .starts_with("Failed to write temporary script"));
    }

    #[tokio::test]
    async fn test_leftover_artifact_is_not_success() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("web.png"), b"old").unwrap();

        let result = sh()
            .execute("exit 0\n", dir.path(), "web", DEFAULT_TIMEOUT)
            .await;

        assert_eq!(result, ExecutionResult::failure(NOT_CREATED));
        assert_eq!(std::fs::read(dir.path().join("web.png")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_rewritten_artifact_is_success() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("web.png");
        std::fs::write(&path, b"old").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(std::time::UNIX_EPOCH + Duration::from_secs(1_000_000))
            .unwrap();

        let result = sh()
            .execute("echo new > web.png\n", dir.path(), "web", DEFAULT_TIMEOUT)
            .await;

        assert_eq!(result, ExecutionResult::success(&path));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[tokio::test]
    async fn test_background_process_does_not_hold_up_result() {
        let dir = TempDir::new().unwrap();
        let started = Instant::now();
        let result = sh()
            .execute(
                ": > diag.png\n(sleep 5) &\nexit 0\n",
                dir.path(),
                "diag",
                Duration::from_secs(2),
            )
            .await;

        assert_eq!(result, ExecutionResult::success(dir.path().join("diag.png")));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_background_process_does_not_hide_failure_output() {
        let dir = TempDir::new().unwrap();
        let result = sh()
            .execute(
                "(sleep 5) &\necho broken >&2\nexit 1\n",
                dir.path(),
                "diag",
                Duration::from_secs(10),
            )
            .await;

        assert_eq!(result, ExecutionResult::failure("broken"));
    }

    #[tokio::test]
    async fn test_captured_output_is_capped() {
        let dir = TempDir::new().unwrap();
        let result = sh()
            .execute(
                "yes | head -c 1000000 >&2\nexit 1\n",
                dir.path(),
                "diag",
                DEFAULT_TIMEOUT,
            )
            .await;

        let message = result.message().unwrap();
        assert!(message.ends_with("[output truncated]"));
        assert!(message.len() <= MAX_CAPTURED_BYTES as usize + TRUNCATED_MARKER.len());
    }

    #[tokio::test]
    async fn test_script_is_patched_before_running() {
        let dir = TempDir::new().unwrap();
        let code = "cat \"$0\" > seen.txt\ncat > /dev/null <<EOF\nDiagram(x)\nEOF\n: > diag.png\n";
        let result = sh()
            .execute(code, dir.path(), "diag", DEFAULT_TIMEOUT)
            .await;

        assert!(result.is_success());
        let seen = std::fs::read_to_string(dir.path().join("seen.txt")).unwrap();
        assert!(seen.contains("Diagram(x, filename=\"diag\")"));
    }

    #[tokio::test]
    async fn test_env_allowlist_clears_environment() {
        let dir = TempDir::new().unwrap();
        let executor = sh().with_policy(SandboxPolicy {
            env_allowlist: Some(Vec::new()),
            ..SandboxPolicy::default()
        });
        let result = executor
            .execute(
                "if [ -z \"$HOME\" ]; then : > diag.png; fi\n",
                dir.path(),
                "diag",
                DEFAULT_TIMEOUT,
            )
            .await;

        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_resource_limits_do_not_block_launch() {
        let dir = TempDir::new().unwrap();
        let executor = sh().with_policy(SandboxPolicy {
            cpu_limit_secs: Some(10),
            max_file_size_mb: Some(1),
            ..SandboxPolicy::default()
        });
        let result = executor
            .execute(": > diag.png\n", dir.path(), "diag", DEFAULT_TIMEOUT)
            .await;

        assert!(result.is_success());
    }

    #[test]
    fn test_format_limit() {
        assert_eq!(format_limit(Duration::from_secs(30)), "30s");
        assert_eq!(format_limit(Duration::from_millis(1500)), "1.5s");
    }
}
