// kubeintent-core/src/tools/shell.rs

//! Core implementation for executing one command with a hard timeout.

use crate::models::execution::{format_duration, ExecutionMode, ExecutionOutcome};
use crate::safety::base_command;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Characters that force a command through the shell.
const SHELL_METACHARACTERS: &[char] = &['|', '&', '>', '<', ';'];

/// Filtering utilities that are expected mid-pipeline and always get a shell.
const FILTER_UTILITIES: &[&str] = &["grep", "awk", "sed", "head", "tail", "sort", "uniq", "wc"];

/// How long to wait for pipe readers once the process group has been killed.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Bytes kept per stream. Anything past this is read and discarded.
pub const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

/// Appended to the combined output when either stream hit the cap.
pub const TRUNCATION_MARKER: &str = "[output truncated]";

/// Decides whether `command` needs a shell.
///
/// Any shell metacharacter (including doubled forms like `&&` or `>>`) or a
/// filtering utility as the first token means [`ExecutionMode::Shell`];
/// everything else is executed directly, with no shell involved.
pub fn execution_mode(command: &str) -> ExecutionMode {
    if command.contains(SHELL_METACHARACTERS) {
        return ExecutionMode::Shell;
    }
    match base_command(command) {
        Some(base) if FILTER_UTILITIES.contains(&base) => ExecutionMode::Shell,
        _ => ExecutionMode::Direct,
    }
}

/// Well-known binary locations where cluster CLIs tend to be installed.
pub fn default_extra_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("/usr/local/bin"),
        PathBuf::from("/opt/homebrew/bin"),
        PathBuf::from("/usr/local/sbin"),
    ];
    if let Some(home) = env::var_os("HOME") {
        let home = PathBuf::from(home);
        paths.push(home.join(".local/bin"));
        paths.push(home.join("bin"));
    }
    paths
}

/// Extends `current` with each of `extra` that it does not already include.
///
/// Existing entries keep their order and content; missing ones are appended.
pub fn augmented_path(current: Option<&OsStr>, extra: &[PathBuf]) -> OsString {
    let mut paths: Vec<PathBuf> = current
        .map(|value| env::split_paths(value).collect())
        .unwrap_or_default();
    for candidate in extra {
        if !paths.contains(candidate) {
            paths.push(candidate.clone());
        }
    }
    match env::join_paths(&paths) {
        Ok(joined) => joined,
        Err(e) => {
            warn!(error = %e, "Could not extend PATH, keeping the inherited value");
            current.map(OsString::from).unwrap_or_default()
        }
    }
}

/// Runs single commands with PATH augmentation and a hard timeout.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    extra_paths: Vec<PathBuf>,
    working_dir: Option<PathBuf>,
    capture_limit: usize,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(default_extra_paths())
    }
}

impl ProcessRunner {
    pub fn new(extra_paths: Vec<PathBuf>) -> Self {
        Self {
            extra_paths,
            working_dir: None,
            capture_limit: MAX_CAPTURE_BYTES,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Per-stream capture limit in bytes.
    pub fn with_capture_limit(mut self, bytes: usize) -> Self {
        self.capture_limit = bytes;
        self
    }

    /// Executes `command`, racing the child against a `timeout` timer.
    ///
    /// Exactly one of normal completion or a timeout-triggered kill happens.
    /// On timeout the whole process group is killed and reaped before this
    /// returns, so no child outlives the call. Never fails: spawn errors,
    /// non-zero exits and timeouts are all reported in the outcome.
    pub async fn run(&self, command: &str, timeout: Duration) -> ExecutionOutcome {
        let command = command.trim();
        let mode = execution_mode(command);
        debug!(
            command = %command,
            mode = ?mode,
            timeout = %format_duration(timeout),
            "Executing command"
        );

        let started = Instant::now();
        let mut child = match self.build_command(command, mode).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %command, error = %e, "Failed to spawn command process");
                return ExecutionOutcome::spawn_failed(
                    command,
                    format!("failed to start command: {}", e),
                    started.elapsed(),
                );
            }
        };
        // `id()` is gone once the child has been reaped, keep it for group kills.
        let pid = child.id();

        let captured = CapturedOutput::new(self.capture_limit);
        let mut readers = JoinSet::new();
        spawn_reader(&mut readers, child.stdout.take(), Arc::clone(&captured.stdout));
        spawn_reader(&mut readers, child.stderr.take(), Arc::clone(&captured.stderr));

        let wait_result = tokio::select! {
            status = child.wait() => Some(status),
            _ = tokio::time::sleep(timeout) => None,
        };

        match wait_result {
            None => {
                terminate(&mut child, pid).await;
                settle(&mut readers, DRAIN_GRACE).await;
                warn!(
                    command = %command,
                    timeout = %format_duration(timeout),
                    "Command timed out and was killed"
                );
                ExecutionOutcome::timed_out(command, captured.combined(), timeout)
            }
            Some(Err(e)) => {
                terminate(&mut child, pid).await;
                warn!(command = %command, error = %e, "Failed to wait for command process");
                ExecutionOutcome::spawn_failed(
                    command,
                    format!("failed to wait for command: {}", e),
                    started.elapsed(),
                )
            }
            Some(Ok(status)) => {
                // Background grandchildren may still hold the pipes open.
                let remaining = timeout.saturating_sub(started.elapsed());
                if !settle(&mut readers, remaining).await {
                    debug!(
                        command = %command,
                        "Pipes still open after exit, killing process group"
                    );
                    kill_process_group(pid);
                    settle(&mut readers, DRAIN_GRACE).await;
                }
                let output = captured.combined();
                let duration = started.elapsed();
                let exit_code = exit_code_of(status);
                let error = if exit_code == 0 {
                    String::new()
                } else {
                    format!("exit status {}", exit_code)
                };

                info!(
                    command = %command,
                    exit_code = exit_code,
                    duration_ms = duration.as_millis() as u64,
                    "Command finished"
                );
                debug!(
                    "Output preview (first 3 lines):\n{}",
                    output.lines().take(3).collect::<Vec<_>>().join("\n")
                );

                ExecutionOutcome::new(command, output, error, exit_code, duration)
            }
        }
    }

    fn build_command(&self, command: &str, mode: ExecutionMode) -> Command {
        let mut cmd = match mode {
            ExecutionMode::Shell => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(command);
                cmd
            }
            ExecutionMode::Direct => {
                let mut parts = command.split_whitespace();
                let program = parts.next().unwrap_or_default();
                let mut cmd = Command::new(program);
                cmd.args(parts);
                cmd
            }
        };

        cmd.env(
            "PATH",
            augmented_path(env::var_os("PATH").as_deref(), &self.extra_paths),
        );
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

/// Runs `command` with the default search-path augmentation.
pub async fn run_command(command: &str, timeout: Duration) -> ExecutionOutcome {
    ProcessRunner::default().run(command, timeout).await
}

/// One captured stream, bounded by `limit`.
struct Sink {
    bytes: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl Sink {
    fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
            truncated: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
}

/// Stdout and stderr bytes, filled progressively by the reader tasks.
struct CapturedOutput {
    stdout: Arc<Mutex<Sink>>,
    stderr: Arc<Mutex<Sink>>,
}

impl CapturedOutput {
    fn new(limit: usize) -> Self {
        Self {
            stdout: Arc::new(Mutex::new(Sink::new(limit))),
            stderr: Arc::new(Mutex::new(Sink::new(limit))),
        }
    }

    /// Stdout followed by stderr, lossily decoded and trimmed, with
    /// [`TRUNCATION_MARKER`] on its own line when a stream was cut.
    fn combined(&self) -> String {
        let mut combined = String::new();
        let mut truncated = false;
        for sink in [&self.stdout, &self.stderr] {
            if let Ok(sink) = sink.lock() {
                combined.push_str(&String::from_utf8_lossy(&sink.bytes));
                truncated |= sink.truncated;
            }
        }
        let mut combined = combined.trim().to_string();
        if truncated {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(TRUNCATION_MARKER);
        }
        combined
    }
}

fn spawn_reader<R>(readers: &mut JoinSet<()>, pipe: Option<R>, sink: Arc<Mutex<Sink>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(mut pipe) = pipe else {
        return;
    };
    readers.spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => match sink.lock() {
                    Ok(mut sink) => sink.push(&chunk[..n]),
                    Err(_) => break,
                },
                Err(e) => {
                    debug!(error = %e, "Error reading command output pipe");
                    break;
                }
            }
        }
    });
}

/// Waits up to `limit` for every reader to hit EOF. Remaining readers are
/// aborted when the set is dropped.
async fn settle(readers: &mut JoinSet<()>, limit: Duration) -> bool {
    tokio::time::timeout(limit, async {
        while readers.join_next().await.is_some() {}
    })
    .await
    .is_ok()
}

async fn terminate(child: &mut Child, pid: Option<u32>) {
    kill_process_group(pid);
    if let Err(e) = child.kill().await {
        debug!(error = %e, "Child already exited before kill");
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = pid {
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!(pid = pid, error = %e, "Process group already gone");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    if status.success() {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::execution::TIMEOUT_EXIT_CODE;

    #[test]
    fn test_execution_mode_direct_without_metacharacters() {
        assert_eq!(execution_mode("kubectl get pods -A"), ExecutionMode::Direct);
        assert_eq!(execution_mode("helm list -A"), ExecutionMode::Direct);
        assert_eq!(
            execution_mode("kubectl get pod web -o jsonpath={.spec.nodeName}"),
            ExecutionMode::Direct
        );
    }

    #[test]
    fn test_execution_mode_shell_for_metacharacters() {
        for command in [
            "kubectl get pods | grep Running",
            "kubectl create ns a && kubectl create ns b",
            "kubectl get pods > pods.txt",
            "kubectl get pods >> pods.txt",
            "kubectl apply -f - < manifest.yaml",
            "kubectl get ns; kubectl get nodes",
            "kubectl get pods || true",
        ] {
            assert_eq!(execution_mode(command), ExecutionMode::Shell, "{}", command);
        }
    }

    #[test]
    fn test_execution_mode_shell_for_filter_utilities() {
        for command in [
            "grep -i error app.log",
            "tail -n 20 app.log",
            "wc -l pods.txt",
            "sort names.txt",
        ] {
            assert_eq!(execution_mode(command), ExecutionMode::Shell, "{}", command);
        }
        // Only the first token counts.
        assert_eq!(execution_mode("cat grep"), ExecutionMode::Direct);
    }

    #[test]
    fn test_augmented_path_appends_missing_only() {
        let current = OsString::from("/usr/bin:/usr/local/bin");
        let extra = vec![PathBuf::from("/usr/local/bin"), PathBuf::from("/opt/homebrew/bin")];
        let result = augmented_path(Some(current.as_os_str()), &extra);
        assert_eq!(result, OsString::from("/usr/bin:/usr/local/bin:/opt/homebrew/bin"));
    }

    #[test]
    fn test_augmented_path_without_existing_path() {
        let extra = vec![PathBuf::from("/usr/local/bin")];
        assert_eq!(augmented_path(None, &extra), OsString::from("/usr/local/bin"));
    }

    #[test]
    fn test_augmented_path_keeps_existing_when_nothing_missing() {
        let current = OsString::from("/bin:/usr/local/bin");
        let extra = vec![PathBuf::from("/usr/local/bin")];
        assert_eq!(augmented_path(Some(current.as_os_str()), &extra), current);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_direct_echo() {
        let outcome = run_command("echo Hello Core Shell", Duration::from_secs(5)).await;
        assert_eq!(outcome.exit_code, 0, "outcome: {:?}", outcome);
        assert_eq!(outcome.output, "Hello Core Shell");
        assert!(outcome.error.is_empty());
        assert!(outcome.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_shell_pipeline_and_exit_code() {
        let outcome =
            run_command("printf 'a\\nb\\nc\\n' | wc -l; exit 3", Duration::from_secs(5)).await;
        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.output, "3");
        assert_eq!(outcome.error, "exit status 3");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_combines_stdout_and_stderr_trimmed() {
        let outcome = run_command("echo out; echo err 1>&2", Duration::from_secs(5)).await;
        assert!(outcome.success());
        assert!(outcome.output.contains("out"));
        assert!(outcome.output.contains("err"));
        assert!(!outcome.output.ends_with('\n'));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_missing_binary_reports_exit_code_one() {
        let outcome = run_command(
            "this_command_does_not_exist_qwertyuiop --flag",
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.error.starts_with("failed to start command"), "{}", outcome.error);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_timeout_kills_and_reports_124() {
        let timeout = Duration::from_millis(300);
        let started = Instant::now();
        let outcome = run_command("sleep 5", timeout).await;
        let elapsed = started.elapsed();

        assert_eq!(outcome.exit_code, TIMEOUT_EXIT_CODE);
        assert_eq!(outcome.duration, timeout);
        assert_eq!(outcome.error, "command timed out after 300ms");
        assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_timeout_kills_shell_children() {
        let timeout = Duration::from_millis(300);
        let started = Instant::now();
        let outcome = run_command("sleep 5 | cat", timeout).await;
        assert_eq!(outcome.exit_code, TIMEOUT_EXIT_CODE);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_background_grandchild_does_not_block_past_budget() {
        let started = Instant::now();
        let outcome = run_command("sleep 5 & echo started", Duration::from_millis(500)).await;
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.output, "started");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_sink_stops_at_limit() {
        let mut sink = Sink::new(4);
        sink.push(b"ab");
        assert!(!sink.truncated);
        sink.push(b"cdef");
        sink.push(b"gh");
        assert_eq!(sink.bytes, b"abcd");
        assert!(sink.truncated);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_chatty_command_output_is_capped() {
        let runner = ProcessRunner::default().with_capture_limit(64);
        let outcome = runner
            .run("yes kubeintent | head -n 1000", Duration::from_secs(5))
            .await;
        assert!(outcome.success(), "outcome: {:?}", outcome);
        assert!(outcome.output.ends_with(TRUNCATION_MARKER), "{}", outcome.output);
        assert!(outcome.output.len() <= 64 + 1 + TRUNCATION_MARKER.len());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runner_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "present").unwrap();
        let runner = ProcessRunner::default().with_working_dir(dir.path());
        let outcome = runner.run("cat marker.txt", Duration::from_secs(5)).await;
        assert_eq!(outcome.output, "present");
    }
}
