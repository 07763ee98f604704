//! # Shell Executor
//!
//! Runs a command through `sh -c` in the project directory and streams its output.
//! Absolute path tokens in the command are re-rooted under the working directory first.
//!
//! stdout and stderr are drained by two reader tasks into one bounded channel. The child is
//! spawned with `kill_on_drop`, so dropping the stream (caller gone) kills it.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use super::ExecStream;
use crate::application::sandbox;
use crate::domain::errors::SandboxError;
use crate::domain::types::{ActionStatus, ExecChunk, ShellAction};
use crate::strings::messages;

/// How long to keep draining pipes after the child exited. Background jobs that inherited
/// the pipes would otherwise keep the stream open forever.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// A command ready to spawn: paths rewritten, cwd resolved.
#[derive(Debug, PartialEq, Eq)]
struct Prepared {
    command: String,
    cwd: PathBuf,
}

fn prepare(action: &ShellAction, working_dir: &Path) -> Result<Prepared, SandboxError> {
    let command = sandbox::remap_command_paths(&action.command, working_dir)?;
    let cwd = match &action.cwd {
        Some(cwd) => sandbox::resolve(&sandbox::strip_working_dir(cwd, working_dir), working_dir)?,
        None => sandbox::resolve(".", working_dir)?,
    };
    Ok(Prepared { command, cwd })
}

fn build_command(prepared: &Prepared) -> Command {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", &prepared.command]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", &prepared.command]);
        c
    };
    cmd.current_dir(&prepared.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Forwards one pipe, line by line, until EOF or until the receiver is gone.
fn pump<R>(reader: R, tx: mpsc::Sender<ExecChunk>, to_chunk: fn(String) -> ExecChunk)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if tx.send(to_chunk(line)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to read command output: {}", e);
                    break;
                }
            }
        }
    });
}

fn exit_chunk(status: ExitStatus) -> ExecChunk {
    match status.code() {
        Some(0) => ExecChunk::stdout(messages::command_finished(0)).finish(ActionStatus::Success, 0),
        Some(code) => {
            ExecChunk::stdout(messages::command_finished(code)).finish(ActionStatus::Failed, code)
        }
        None => ExecChunk::stderr(messages::COMMAND_KILLED).finish(ActionStatus::Failed, -1),
    }
}

pub fn run(action: ShellAction, working_dir: PathBuf, buffer: usize) -> ExecStream {
    Box::pin(async_stream::stream! {
        if action.command.trim().is_empty() {
            yield Ok(ExecChunk::failed(messages::command_spawn_failed("empty command")));
            return;
        }

        let prepared = match prepare(&action, &working_dir) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Shell command rejected: {}", e);
                yield Ok(ExecChunk::failed(e.to_string()));
                return;
            }
        };
        tracing::info!("Executing command: {} (cwd={})", prepared.command, prepared.cwd.display());

        let mut child = match build_command(&prepared).spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!("Failed to spawn '{}': {}", prepared.command, e);
                yield Ok(ExecChunk::failed(messages::command_spawn_failed(&e.to_string())));
                return;
            }
        };

        let (tx, mut rx) = mpsc::channel(buffer);
        if let Some(stdout) = child.stdout.take() {
            pump(stdout, tx.clone(), |line| ExecChunk::stdout(line));
        }
        if let Some(stderr) = child.stderr.take() {
            pump(stderr, tx.clone(), |line| ExecChunk::stderr(line));
        }
        drop(tx);

        let mut status = None;
        loop {
            let chunk = if status.is_none() {
                tokio::select! {
                    chunk = rx.recv() => chunk,
                    exited = child.wait() => {
                        status = Some(exited);
                        continue;
                    }
                }
            } else {
                match tokio::time::timeout(DRAIN_GRACE, rx.recv()).await {
                    Ok(chunk) => chunk,
                    Err(_) => {
                        tracing::warn!("Output pipes still open after exit: {}", prepared.command);
                        break;
                    }
                }
            };
            match chunk {
                Some(chunk) => yield Ok(chunk),
                None => break,
            }
        }

        let status = match status {
            Some(status) => status,
            None => child.wait().await,
        };
        match status.context("Failed to wait for command") {
            Ok(status) => yield Ok(exit_chunk(status)),
            Err(e) => yield Err(e),
        }
    })
}
