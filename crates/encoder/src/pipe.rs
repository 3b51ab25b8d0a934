//! Encoder processes and the write-only pipes feeding them.

use std::io::{BufWriter, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use demorec_common::error::{DemorecError, DemorecResult};

use crate::command::EncoderCommand;

/// Buffer between frame writes and the encoder's stdin.
const PIPE_BUFFER_BYTES: usize = 1 << 20;

/// Lines of encoder stderr kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// A write-only byte stream into one encoder.
///
/// Writes block when the encoder falls behind; that backpressure is the
/// only flow control between the render loop and the encoder.
pub trait FramePipe: Write {
    /// Flush, close the stream, and wait for the encoder to finish.
    fn finish(self: Box<Self>) -> DemorecResult<()>;
}

/// Spawns encoder processes.
pub trait PipeLauncher {
    /// Start `command` and return the pipe to its stdin.
    fn open(&mut self, command: &EncoderCommand) -> DemorecResult<Box<dyn FramePipe>>;
}

/// Launches the system ffmpeg (or whatever `EncoderCommand::program` is).
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegLauncher;

impl FfmpegLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl PipeLauncher for FfmpegLauncher {
    fn open(&mut self, command: &EncoderCommand) -> DemorecResult<Box<dyn FramePipe>> {
        Ok(Box::new(FfmpegPipe::spawn(command)?))
    }
}

/// A running encoder process with its stdin as the frame pipe.
pub struct FfmpegPipe {
    label: String,
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    stderr_drain: Option<JoinHandle<String>>,
}

impl FfmpegPipe {
    pub fn spawn(command: &EncoderCommand) -> DemorecResult<Self> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DemorecError::EncoderNotFound {
                    path: command.program.clone(),
                }
            } else {
                DemorecError::pipe(format!("Failed to start encoder: {e}"))
            }
        })?;

        tracing::info!(
            pid = child.id(),
            pass = command.pass_index,
            output = %command.output.display(),
            "Encoder process started"
        );

        let stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(DemorecError::pipe("Failed to capture encoder stdin"));
            }
        };

        // Drain stderr concurrently so the encoder never blocks on a full stderr pipe.
        let stderr_drain = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || -> String {
                let mut output = String::new();
                match stderr.read_to_string(&mut output) {
                    Ok(_) => output,
                    Err(err) => format!("<failed to read encoder stderr: {err}>"),
                }
            })
        });

        Ok(Self {
            label: format!("pass {}", command.pass_index),
            child: Some(child),
            stdin: Some(BufWriter::with_capacity(PIPE_BUFFER_BYTES, stdin)),
            stderr_drain,
        })
    }

    fn close(&mut self) -> DemorecResult<()> {
        let flushed = match self.stdin.take() {
            Some(mut stdin) => stdin.flush(),
            None => Ok(()),
        };

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| DemorecError::encoder(format!("Failed to wait on encoder: {e}")))?;

        let stderr_output = self
            .stderr_drain
            .take()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default();

        if !status.success() {
            return Err(DemorecError::encoder(format!(
                "Encoder for {} exited with status {}: {}",
                self.label,
                status,
                stderr_tail(&stderr_output)
            )));
        }

        flushed.map_err(|e| {
            DemorecError::pipe(format!("Failed to flush frames for {}: {e}", self.label))
        })?;
        tracing::debug!(pipe = %self.label, "Encoder finished");
        Ok(())
    }
}

impl Write for FfmpegPipe {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.stdin.as_mut() {
            Some(stdin) => stdin.write(buf),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "encoder pipe already closed",
            )),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.stdin.as_mut() {
            Some(stdin) => stdin.flush(),
            None => Ok(()),
        }
    }
}

impl FramePipe for FfmpegPipe {
    fn finish(mut self: Box<Self>) -> DemorecResult<()> {
        self.close()
    }
}

impl Drop for FfmpegPipe {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.close() {
                tracing::warn!(pipe = %self.label, error = %e, "Encoder closed with error");
            }
        }
    }
}

fn stderr_tail(output: &str) -> String {
    let lines: Vec<&str> = output.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let output = (0..30).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let tail = stderr_tail(&output);
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
        assert_eq!(stderr_tail("  \n"), "");
    }
}
