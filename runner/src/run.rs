//! Subprocess execution — spawns the user program and captures its output.
//!
//! Commands run through the platform shell, with stdin fed from the host and
//! both output streams captured to completion. A server-mode run additionally
//! sets the protocol environment variable and passes the captured stderr
//! through the [`deviz_protocol`] pipeline. Every spawn returns the waitable
//! handle and the cancel half as a pair; cancellation kills the child and the
//! run resolves to [`RunError::Canceled`] without ever reaching the pipeline.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;

use deviz_protocol::{Pane, SERVER_ENV_VAR, pipeline};

use crate::config::CommandSpec;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("run was canceled")]
    Canceled,
}

/// Raw output of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramOutput {
    /// Exit code, or -1 when the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Output of a server-mode run after the stderr pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOutput {
    pub exit_code: i32,
    pub stdout: String,
    /// Stderr with all protocol regions removed.
    pub stripped_stderr: String,
    /// Decode and merge-conflict messages from the pipeline.
    pub validation_errors: Vec<String>,
    /// Final pane set, ordered by first appearance.
    pub panes: Vec<Pane>,
}

impl From<ProgramOutput> for ServerOutput {
    fn from(output: ProgramOutput) -> Self {
        let report = pipeline::parse_stderr(&output.stderr);
        Self {
            exit_code: output.exit_code,
            stdout: output.stdout,
            stripped_stderr: report.stripped_stderr,
            validation_errors: report.validation_errors,
            panes: report.panes,
        }
    }
}

/// Cancel half of an in-flight run. Dropping it leaves the run alone;
/// [`RunCanceler::cancel`] kills the child.
#[derive(Debug)]
pub struct RunCanceler {
    cancel_tx: oneshot::Sender<()>,
}

impl RunCanceler {
    /// Kill the child. The paired handle resolves to
    /// `Err(RunError::Canceled)`.
    pub fn cancel(self) {
        let _ = self.cancel_tx.send(());
    }
}

/// Waitable half of an in-flight run.
#[derive(Debug)]
pub struct RunHandle {
    command: String,
    task: tokio::task::JoinHandle<Result<ProgramOutput, RunError>>,
}

impl RunHandle {
    /// Wait for the run to finish and collect its output.
    pub async fn wait(self) -> Result<ProgramOutput, RunError> {
        match self.task.await {
            Ok(result) => result,
            Err(join_error) if join_error.is_cancelled() => Err(RunError::Canceled),
            Err(join_error) => Err(RunError::Io {
                command: self.command,
                source: std::io::Error::other(join_error),
            }),
        }
    }
}

/// Waitable half of a server-mode run; resolves to a [`ServerOutput`].
#[derive(Debug)]
pub struct ServerRunHandle {
    inner: RunHandle,
}

impl ServerRunHandle {
    pub async fn wait(self) -> Result<ServerOutput, RunError> {
        // A canceled run returns Err here, so its stderr never reaches the
        // pipeline or any pane state.
        Ok(ServerOutput::from(self.inner.wait().await?))
    }
}

/// Spawn `spec` in `working_dir`, feeding `stdin_text` to the child.
///
/// Must be called within a tokio runtime; the run itself is driven by a
/// spawned task so the caller can hold the handle and canceler separately.
pub fn spawn_command(
    working_dir: &Path,
    spec: &CommandSpec,
    stdin_text: &str,
) -> Result<(RunHandle, RunCanceler), RunError> {
    spawn_inner(working_dir, spec, stdin_text, false)
}

/// Spawn a server-mode run: `DEVIZ_SERVER=1` is set and the captured stderr
/// is interpreted by the protocol pipeline.
pub fn spawn_server_command(
    working_dir: &Path,
    spec: &CommandSpec,
    stdin_text: &str,
) -> Result<(ServerRunHandle, RunCanceler), RunError> {
    let (inner, canceler) = spawn_inner(working_dir, spec, stdin_text, true)?;
    Ok((ServerRunHandle { inner }, canceler))
}

/// Run `spec` to completion without cancellation support.
pub async fn run_command(
    working_dir: &Path,
    spec: &CommandSpec,
    stdin_text: &str,
) -> Result<ProgramOutput, RunError> {
    let (handle, _canceler) = spawn_command(working_dir, spec, stdin_text)?;
    handle.wait().await
}

/// Run a compile step: no stdin, no protocol parsing.
pub async fn run_compile_command(
    working_dir: &Path,
    spec: &CommandSpec,
) -> Result<ProgramOutput, RunError> {
    run_command(working_dir, spec, "").await
}

/// Run a server-mode command to completion.
pub async fn run_server_command(
    working_dir: &Path,
    spec: &CommandSpec,
    stdin_text: &str,
) -> Result<ServerOutput, RunError> {
    let (handle, _canceler) = spawn_server_command(working_dir, spec, stdin_text)?;
    handle.wait().await
}

fn spawn_inner(
    working_dir: &Path,
    spec: &CommandSpec,
    stdin_text: &str,
    server_mode: bool,
) -> Result<(RunHandle, RunCanceler), RunError> {
    let mut cmd = shell_command(&spec.command);
    cmd.current_dir(working_dir)
        .envs(&spec.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if server_mode {
        cmd.env(SERVER_ENV_VAR, "1");
    } else {
        // A plain run must not inherit the variable from the host's own
        // environment.
        cmd.env_remove(SERVER_ENV_VAR);
    }

    tracing::debug!(command = %spec.command, server_mode, "spawning user program");
    let child = cmd.spawn().map_err(|source| RunError::Spawn {
        command: spec.command.clone(),
        source,
    })?;

    let (cancel_tx, cancel_rx) = oneshot::channel();
    let task = tokio::spawn(drive(
        child,
        spec.command.clone(),
        stdin_text.to_string(),
        cancel_rx,
    ));

    Ok((
        RunHandle {
            command: spec.command.clone(),
            task,
        },
        RunCanceler { cancel_tx },
    ))
}

/// The platform shell, so pipes and quoting behave as in a terminal.
fn shell_command(command_line: &str) -> Command {
    #[cfg(unix)]
    {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(command_line);
        cmd
    }
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command_line]);
        cmd
    }
}

async fn drive(
    mut child: Child,
    command: String,
    stdin_text: String,
    cancel_rx: oneshot::Receiver<()>,
) -> Result<ProgramOutput, RunError> {
    fn io_error(command: &str, source: std::io::Error) -> RunError {
        RunError::Io {
            command: command.to_string(),
            source,
        }
    }

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(source) = stdin.write_all(stdin_text.as_bytes()).await {
            // A child that exits without reading stdin is not an error.
            if source.kind() != ErrorKind::BrokenPipe {
                return Err(io_error(&command, source));
            }
        }
        // Dropping the pipe closes it so the child sees EOF.
    }

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| io_error(&command, std::io::Error::other("stdout pipe not captured")))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| io_error(&command, std::io::Error::other("stderr pipe not captured")))?;

    // Both streams are drained concurrently: reading them one after the other
    // can deadlock once the child fills the unread pipe.
    let read = async {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let (out, err) = tokio::join!(
            stdout_pipe.read_to_end(&mut stdout),
            stderr_pipe.read_to_end(&mut stderr)
        );
        out?;
        err?;
        Ok::<(Vec<u8>, Vec<u8>), std::io::Error>((stdout, stderr))
    };

    // A dropped canceler must leave the run alone, so the closed-channel
    // error parks instead of canceling.
    let canceled = async move {
        match cancel_rx.await {
            Ok(()) => (),
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        () = canceled => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            Err(RunError::Canceled)
        }
        result = read => {
            let (stdout, stderr) = result.map_err(|source| io_error(&command, source))?;
            let status = child
                .wait()
                .await
                .map_err(|source| io_error(&command, source))?;
            Ok(ProgramOutput {
                exit_code: status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            })
        }
    }
}
