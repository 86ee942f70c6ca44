//! External process invocation with combined output capture.
//!
//! Every external tool (git, Maven) is run synchronously. Output streams are
//! drained by background reader threads so the child never blocks on a full
//! pipe; the drainers are joined before the exit status is inspected.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Result of a finished child process.
#[derive(Debug)]
pub struct ProcessOutput {
    /// Exit code, or -1 when the process was killed by a signal.
    pub status: i32,
    /// Interleaved stdout and stderr.
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs the command to completion, capturing stdout and stderr into one
/// buffer.
pub fn run_captured(command: &mut Command) -> std::io::Result<ProcessOutput> {
    debug!(command = ?command, "spawning external process");
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let buffer = Arc::new(Mutex::new(Vec::new()));
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let drainers: Vec<JoinHandle<()>> = [
        stdout.map(|s| spawn_drainer(s, Arc::clone(&buffer))),
        stderr.map(|s| spawn_drainer(s, Arc::clone(&buffer))),
    ]
    .into_iter()
    .flatten()
    .collect();

    let status = child.wait()?;
    for drainer in drainers {
        // A panicked drainer means the capture buffer is gone anyway.
        drainer.join().map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::Other, "output drainer thread panicked")
        })?;
    }

    let bytes = buffer.lock().map_or_else(
        |poisoned| poisoned.into_inner().clone(),
        |guard| guard.clone(),
    );
    Ok(ProcessOutput {
        status: status.code().unwrap_or(-1),
        output: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

fn spawn_drainer<R: Read + Send + 'static>(
    mut stream: R,
    buffer: Arc<Mutex<Vec<u8>>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut guard) = buffer.lock() {
                        guard.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        }
    })
}
