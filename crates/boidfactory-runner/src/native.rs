use crate::error::RunnerError;
use std::io::{self, Read, Write};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{CommandSpec, ProcessOutput, ProcessRunner};

const READ_CHUNK: usize = 8 * 1024;
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Native process runner using `std::process::Command`.
///
/// Helper threads feed stdin, drain stderr and forward stdout chunks over a
/// channel; the calling thread writes those chunks to the sink and enforces
/// the deadline with `recv_timeout`.
///
/// ```rust,no_run
/// use boidfactory_runner::{CommandSpec, NativeRunner, ProcessRunner};
/// use std::time::Duration;
///
/// let runner = NativeRunner::new();
/// let cmd = CommandSpec::new("cat").stdin("hello");
/// let mut console = std::io::stdout();
/// let output = runner
///     .run_streaming(&cmd, Duration::from_secs(30), &mut console)
///     .unwrap();
/// assert!(output.success());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl NativeRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn spawn(cmd: &CommandSpec) -> Result<Child, RunnerError> {
        let mut command = cmd.to_command();
        command
            .stdin(if cmd.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so a timeout also reaches anything the
        // generator forks (and anything holding our stdout pipe open).
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        command.spawn().map_err(|e| RunnerError::SpawnFailed {
            program: cmd.program.to_string_lossy().into_owned(),
            reason: e.to_string(),
        })
    }

    /// Kill the child's whole process group and reap the child. Errors mean
    /// it already exited.
    fn terminate(child: &mut Child) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            if let Ok(pgid) = i32::try_from(child.id())
                && let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL)
            {
                tracing::debug!(pgid, error = %e, "killpg failed");
            }
        }
        let _ = child.kill();
        let _ = child.wait();
    }

    /// Poll for exit until `deadline`. `None` means still running.
    fn wait_until(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>, RunnerError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(Some(status)),
                Ok(None) if Instant::now() >= deadline => return Ok(None),
                Ok(None) => thread::sleep(EXIT_POLL_INTERVAL),
                Err(e) => {
                    return Err(RunnerError::Io {
                        reason: format!("Failed to wait for process: {e}"),
                    });
                }
            }
        }
    }
}

fn join_bytes(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

impl ProcessRunner for NativeRunner {
    fn run_streaming(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
        sink: &mut dyn Write,
    ) -> Result<ProcessOutput, RunnerError> {
        let deadline = Instant::now() + timeout;
        let mut child = Self::spawn(cmd)?;
        tracing::trace!(command = %cmd.display(), pid = child.id(), "spawned");

        // Dropping the pipe after the write closes the child's stdin.
        let stdin_writer = match (child.stdin.take(), cmd.stdin.clone()) {
            (Some(mut pipe), Some(bytes)) => Some(thread::spawn(move || {
                let _ = pipe.write_all(&bytes);
            })),
            _ => None,
        };

        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take())
        else {
            Self::terminate(&mut child);
            return Err(RunnerError::Io {
                reason: "child stdio pipes were not captured".to_string(),
            });
        };

        let stderr_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf);
            buf
        });

        let (tx, rx) = mpsc::channel::<io::Result<Vec<u8>>>();
        let stdout_reader = thread::spawn(move || {
            let mut buf = [0u8; READ_CHUNK];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(Ok(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        });

        let mut captured = Vec::new();
        let failure = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(Ok(chunk)) => {
                    if let Err(e) = sink.write_all(&chunk).and_then(|()| sink.flush()) {
                        break Some(RunnerError::SinkFailed {
                            reason: e.to_string(),
                        });
                    }
                    captured.extend_from_slice(&chunk);
                }
                Ok(Err(e)) => {
                    break Some(RunnerError::Io {
                        reason: format!("Failed to read process stdout: {e}"),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => break None,
                Err(RecvTimeoutError::Timeout) => {
                    break Some(RunnerError::Timeout {
                        timeout_seconds: timeout.as_secs(),
                    });
                }
            }
        };

        let exit_code = match failure {
            Some(err) => {
                Self::terminate(&mut child);
                drop(rx);
                let _ = stdout_reader.join();
                let _ = join_bytes(stderr_reader);
                if let Some(handle) = stdin_writer {
                    let _ = handle.join();
                }
                return Err(err);
            }
            None => match Self::wait_until(&mut child, deadline) {
                Ok(Some(status)) => status.code(),
                Ok(None) => {
                    Self::terminate(&mut child);
                    let _ = join_bytes(stderr_reader);
                    return Err(RunnerError::Timeout {
                        timeout_seconds: timeout.as_secs(),
                    });
                }
                Err(err) => {
                    Self::terminate(&mut child);
                    return Err(err);
                }
            },
        };

        let _ = stdout_reader.join();
        let stderr = join_bytes(stderr_reader);
        if let Some(handle) = stdin_writer {
            let _ = handle.join();
        }

        Ok(ProcessOutput::new(captured, stderr, exit_code))
    }
}
