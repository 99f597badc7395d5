//! Engine subprocess execution.

use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use om_workspace::Workspace;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::environment::EngineEnvironment;
use crate::{EngineError, EngineResult};

/// How long the readers get to observe end-of-file after the engine's
/// process group has been killed. Whatever was captured by then is kept.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 8 * 1024;

/// Bytes captured from one output pipe so far.
type CaptureBuffer = Arc<Mutex<Vec<u8>>>;

/// Exit status and captured streams of one engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutcome {
    /// `None` when the process was terminated by a signal (including a
    /// deadline kill).
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
    pub timed_out: bool,
}

impl ProcessOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }

    /// `stdout` and `stderr` joined by a newline; what the classifier reads.
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Seam between the orchestrator and the engine process.
#[async_trait]
pub trait SolverRunner: Send + Sync {
    async fn run(
        &self,
        workspace: &Workspace,
        env: &EngineEnvironment,
    ) -> EngineResult<ProcessOutcome>;
}

/// Runs `<binary> <script>` inside the workspace under a deadline.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl SolverRunner for ProcessRunner {
    async fn run(
        &self,
        workspace: &Workspace,
        env: &EngineEnvironment,
    ) -> EngineResult<ProcessOutcome> {
        let binary = match (&env.binary, env.available) {
            (Some(binary), true) => binary.clone(),
            _ => {
                return Err(EngineError::Unavailable {
                    message: env.status_message.clone(),
                });
            }
        };

        let mut cmd = Command::new(&binary);
        cmd.arg(&workspace.script_file)
            .current_dir(&workspace.dir)
            .envs(env.child_env().iter().map(|(k, v)| (k.as_str(), v.as_os_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The engine's own children (the compiled simulation) join its group
        // so a deadline kill reaches all of them.
        #[cfg(unix)]
        cmd.process_group(0);

        info!(run = %workspace.id, binary = %binary.display(), "launching engine");
        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| EngineError::Spawn {
            binary: binary.clone(),
            source,
        })?;
        let group = child.id();

        let stdout = child.stdout.take().ok_or_else(|| EngineError::Capture {
            message: "stdout pipe missing".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| EngineError::Capture {
            message: "stderr pipe missing".to_string(),
        })?;
        let stdout_buf = CaptureBuffer::default();
        let stderr_buf = CaptureBuffer::default();
        let mut stdout_task = spawn_reader(stdout, Arc::clone(&stdout_buf));
        let mut stderr_task = spawn_reader(stderr, Arc::clone(&stderr_buf));

        // One deadline covers both the exit and the pipes closing: a
        // background child holding stdout keeps the run open.
        let finished = tokio::time::timeout(self.timeout, async {
            let status = child.wait().await?;
            finish_reader(&mut stdout_task).await?;
            finish_reader(&mut stderr_task).await?;
            Ok::<_, EngineError>(status)
        })
        .await;

        let (exit_code, timed_out) = match finished {
            Ok(Ok(status)) => (status.code(), false),
            Ok(Err(e)) => {
                terminate(&mut child, group, workspace).await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(e);
            }
            Err(_) => {
                warn!(
                    run = %workspace.id,
                    timeout_s = self.timeout.as_secs_f64(),
                    "engine exceeded deadline; killing process group"
                );
                terminate(&mut child, group, workspace).await;
                drain_with_grace(&mut stdout_task).await;
                drain_with_grace(&mut stderr_task).await;
                let code = child.try_wait().ok().flatten().and_then(|s| s.code());
                (code, true)
            }
        };

        let outcome = ProcessOutcome {
            exit_code,
            stdout: captured_text(&stdout_buf),
            stderr: captured_text(&stderr_buf),
            elapsed: started.elapsed(),
            timed_out,
        };
        debug!(
            run = %workspace.id,
            exit_code = ?outcome.exit_code,
            elapsed_s = outcome.elapsed.as_secs_f64(),
            stdout_bytes = outcome.stdout.len(),
            stderr_bytes = outcome.stderr.len(),
            "engine finished"
        );
        Ok(outcome)
    }
}

fn spawn_reader<R>(mut pipe: R, sink: CaptureBuffer) -> JoinHandle<std::io::Result<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            let n = pipe.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(&chunk[..n]);
        }
    })
}

async fn finish_reader(task: &mut JoinHandle<std::io::Result<()>>) -> EngineResult<()> {
    task.await.map_err(|e| EngineError::Capture {
        message: e.to_string(),
    })??;
    Ok(())
}

/// Give a reader a short window to reach end-of-file, then stop it. The
/// bytes it already appended stay in its buffer.
async fn drain_with_grace(task: &mut JoinHandle<std::io::Result<()>>) {
    if tokio::time::timeout(PIPE_DRAIN_GRACE, &mut *task).await.is_err() {
        task.abort();
    }
}

fn captured_text(buf: &CaptureBuffer) -> String {
    let bytes = buf.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Kill the engine's whole process group, then the engine itself.
async fn terminate(child: &mut Child, group: Option<u32>, workspace: &Workspace) {
    if let Some(pgid) = group
        && let Err(e) = kill_group(pgid)
    {
        warn!(run = %workspace.id, pgid, error = %e, "failed to signal engine process group");
    }
    // Already reaped when the engine exited before its children.
    if let Err(e) = child.kill().await {
        debug!(run = %workspace.id, error = %e, "engine kill skipped");
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) -> std::io::Result<()> {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let raw = i32::try_from(pgid).map_err(std::io::Error::other)?;
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(errno) => Err(std::io::Error::from(errno)),
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) -> std::io::Result<()> {
    Ok(())
}
