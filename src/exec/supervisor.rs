// src/exec/supervisor.rs

//! Ownership of exactly one external process.
//!
//! The supervisor never blocks its caller. A small reader task forwards raw
//! stdout chunks over a channel and pokes a shared [`Notify`] so the job loop
//! can wait on "any output from any task" with a single primitive; every
//! other operation here is a synchronous, non-blocking check.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

use super::line_buffer::LineBuffer;
use super::shell::shell_command;

/// Exit status reported by shells when the command or interpreter is missing.
pub const COMMAND_NOT_FOUND: i32 = 127;

/// How long to keep waiting for EOF after the process exited.
///
/// A detached grandchild can hold the pipe open indefinitely; past this
/// window the remaining output is abandoned.
pub const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(250);

const READ_CHUNK: usize = 8192;

/// How a task process is started.
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    pub cwd: Option<PathBuf>,
    /// Merge stderr into the captured stream; otherwise stderr is inherited.
    pub capture_stderr: bool,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            capture_stderr: true,
        }
    }
}

#[derive(Debug)]
pub struct ProcessSupervisor {
    child: Child,
    pid: Option<u32>,
    output: mpsc::UnboundedReceiver<Vec<u8>>,
    eof: bool,
    lines: LineBuffer,
    exit_code: Option<i32>,
    exited_at: Option<Instant>,
    terminated: bool,
}

impl ProcessSupervisor {
    /// Spawn `cmdline` through the platform shell.
    ///
    /// On unix the child leads a new process group and ignores SIGINT, so an
    /// interrupt aimed at the whole foreground job reaches only this process,
    /// which then tears the children down itself.
    pub fn start(
        cmdline: &str,
        options: &SpawnOptions,
        wake: Arc<Notify>,
    ) -> std::io::Result<Self> {
        let mut cmd = shell_command(cmdline, options.capture_stderr);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }

        isolate_from_terminal_signals(&mut cmd);

        let mut child = cmd.spawn()?;
        let pid = child.id();

        let (tx, rx) = mpsc::unbounded_channel();
        match child.stdout.take() {
            Some(stdout) => spawn_reader(stdout, tx, wake),
            None => drop(tx),
        }

        debug!(pid, "process started");

        Ok(Self {
            child,
            pid,
            output: rx,
            eof: false,
            lines: LineBuffer::new(),
            exit_code: None,
            exited_at: None,
            terminated: false,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Drain every chunk currently available and return the complete lines.
    pub fn read_available(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.terminated {
            return lines;
        }

        loop {
            match self.output.try_recv() {
                Ok(chunk) => lines.extend(self.lines.push(&chunk)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.eof = true;
                    break;
                }
            }
        }

        lines
    }

    /// Exit code, if the process has exited. Never blocks.
    pub fn exit_code(&mut self) -> Option<i32> {
        if self.exit_code.is_some() {
            return self.exit_code;
        }

        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.exit_code = Some(exit_code_of(status));
                self.exited_at = Some(Instant::now());
            }
            Ok(None) => {}
            Err(e) => {
                warn!(pid = self.pid, error = %e, "failed to query process status");
                self.exit_code = Some(-1);
                self.exited_at = Some(Instant::now());
            }
        }

        self.exit_code
    }

    /// Exit code once the process has exited *and* its output is drained.
    ///
    /// Call after [`read_available`](Self::read_available) in the same tick.
    /// An unterminated trailing fragment is dropped at this point.
    pub fn poll_exit(&mut self) -> Option<i32> {
        let code = self.exit_code()?;

        if !self.eof {
            let grace_over = self
                .exited_at
                .is_some_and(|t| t.elapsed() >= EXIT_DRAIN_GRACE);
            if !grace_over {
                return None;
            }
            debug!(pid = self.pid, "output pipe still open after exit; abandoning it");
        }

        let dropped = self.lines.discard_partial();
        if dropped > 0 {
            debug!(pid = self.pid, bytes = dropped, "dropping unterminated output fragment");
        }

        Some(code)
    }

    /// Exactly one of exit and EOF has been observed.
    ///
    /// Nothing wakes the job when the second one arrives (a reaped exit
    /// status sends no output), so it should re-poll on a short tick.
    pub fn is_settling(&self) -> bool {
        self.eof != self.exit_code.is_some()
    }

    /// Forcefully stop the process (and its group on unix).
    ///
    /// Safe to call repeatedly; a process that already exited is not an
    /// error.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        #[cfg(unix)]
        if let Some(pid) = self.pid {
            signal_process_group(pid);
        }

        if let Err(e) = self.child.start_kill() {
            debug!(pid = self.pid, error = %e, "process already gone at termination");
        }
    }
}

fn spawn_reader(mut stdout: ChildStdout, tx: mpsc::UnboundedSender<Vec<u8>>, wake: Arc<Notify>) {
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            match stdout.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                    wake.notify_one();
                }
                Err(e) => {
                    debug!(error = %e, "reading process output failed");
                    break;
                }
            }
        }
        drop(tx);
        wake.notify_one();
    });
}

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

    -1
}

#[cfg(unix)]
fn isolate_from_terminal_signals(cmd: &mut Command) {
    cmd.process_group(0);

    // SAFETY: only the async-signal-safe `signal(2)` runs between fork and
    // exec, and it touches no memory shared with the parent.
    unsafe {
        cmd.pre_exec(|| {
            libc::signal(libc::SIGINT, libc::SIG_IGN);
            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn isolate_from_terminal_signals(_cmd: &mut Command) {}

#[cfg(unix)]
fn signal_process_group(pid: u32) {
    // SAFETY: killpg takes plain integers and dereferences nothing.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGTERM) };
    if rc != 0 {
        // ESRCH (group gone) and EPERM are expected once the leader exited.
        let err = std::io::Error::last_os_error();
        debug!(pid, error = %err, "process group not signalled");
    }
}
