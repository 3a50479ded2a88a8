// SPDX-License-Identifier: MIT

//! Child-process supervisor: spawns the server jar, multiplexes its
//! stdin/stdout as line-oriented pipes, and implements graceful stop
//! with a forced-kill fallback.

use parking_lot::Mutex;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("java executable '{0}' not found or not runnable")]
    JavaNotFound(String),
    #[error("server jar not found at {0}")]
    JarNotFound(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server is already running")]
    AlreadyRunning,
}

pub struct SupervisorConfig {
    pub java_path: String,
    pub jar_path: PathBuf,
    pub working_dir: PathBuf,
    pub min_memory: String,
    pub max_memory: String,
    pub extra_args: Vec<String>,
}

impl SupervisorConfig {
    /// `[java_path, -Xms<min>, -Xmx<max>, <extra_args...>, -jar, <jar>, nogui]`
    fn build_args(&self) -> Vec<String> {
        let mut args = vec![format!("-Xms{}", self.min_memory), format!("-Xmx{}", self.max_memory)];
        args.extend(self.extra_args.iter().cloned());
        args.push("-jar".to_string());
        args.push(self.jar_path.to_string_lossy().to_string());
        args.push("nogui".to_string());
        args
    }
}

struct Running {
    child: Child,
    stdin: std::process::ChildStdin,
    output_rx: mpsc::Receiver<String>,
    reader_thread: std::thread::JoinHandle<()>,
    started_at: Instant,
}

/// Supervises a single child process across its whole lifetime:
/// spawn, line I/O, graceful stop, forced kill.
pub struct ChildSupervisor {
    config: SupervisorConfig,
    running: Mutex<Option<Running>>,
}

impl ChildSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config, running: Mutex::new(None) }
    }

    pub fn check_jar(&self) -> Result<(), SupervisorError> {
        if self.config.jar_path.exists() {
            Ok(())
        } else {
            Err(SupervisorError::JarNotFound(self.config.jar_path.clone()))
        }
    }

    pub fn check_java(&self) -> Result<(), SupervisorError> {
        Command::new(&self.config.java_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .ok()
            .filter(|s| s.success())
            .map(|_| ())
            .ok_or_else(|| SupervisorError::JavaNotFound(self.config.java_path.clone()))
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    pub fn uptime(&self) -> Option<Duration> {
        self.running.lock().as_ref().map(|r| r.started_at.elapsed())
    }

    pub fn pid(&self) -> Option<u32> {
        self.running.lock().as_ref().map(|r| r.child.id())
    }

    pub fn start(&self) -> Result<u32, SupervisorError> {
        let mut guard = self.running.lock();
        if guard.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let mut child = Command::new(&self.config.java_path)
            .args(self.config.build_args())
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped()) // merged into stdout below by the reader thread
            .spawn()?;

        let stdin = child.stdin.take().ok_or(SupervisorError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "child has no stdin handle",
        )))?;
        let stdout = child.stdout.take().ok_or(SupervisorError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "child has no stdout handle",
        )))?;
        let stderr = child.stderr.take();

        let (tx, output_rx) = mpsc::channel();
        let stdout_tx = tx.clone();
        let reader_thread = std::thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if stdout_tx.send(line).is_err() {
                            return;
                        }
                    }
                    Err(_) => return,
                }
            }
        });
        if let Some(stderr) = stderr {
            std::thread::spawn(move || {
                let reader = BufReader::new(stderr);
                for line in reader.lines().map_while(Result::ok) {
                    let _ = tx.send(line);
                }
            });
        }

        let pid = child.id();
        *guard = Some(Running { child, stdin, output_rx, reader_thread, started_at: Instant::now() });
        Ok(pid)
    }

    /// Appends a newline and flushes. Returns false on a broken pipe
    /// rather than surfacing an error: the caller (the shell adapter)
    /// treats "couldn't send" as informational, not fatal.
    pub fn send_command(&self, line: &str) -> bool {
        let mut guard = self.running.lock();
        let Some(running) = guard.as_mut() else { return false };
        writeln!(running.stdin, "{line}").is_ok() && running.stdin.flush().is_ok()
    }

    /// Non-blocking read bounded by `timeout`. Returns `None` on
    /// timeout or once the child has exited and the reader thread has
    /// drained.
    pub fn read_line(&self, timeout: Duration) -> Option<String> {
        let guard = self.running.lock();
        let running = guard.as_ref()?;
        running.output_rx.recv_timeout(timeout).ok()
    }

    /// Sends `stop`, waits up to `timeout` for exit, force-kills if the
    /// deadline passes. Returns true only for a clean, graceful exit;
    /// a forced kill is a valid but degraded outcome, not an error.
    pub fn stop(&self, timeout: Duration) -> bool {
        if !self.send_command("stop") {
            self.kill();
            return false;
        }
        if self.wait_for_exit(timeout) {
            self.reap();
            true
        } else {
            self.kill();
            false
        }
    }

    fn wait_for_exit(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut guard = self.running.lock();
                if let Some(running) = guard.as_mut() {
                    if let Ok(Some(_)) = running.child.try_wait() {
                        return true;
                    }
                } else {
                    return true;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(200));
        }
    }

    /// Immediate forced termination, reaped with a 5s wait.
    pub fn kill(&self) {
        let mut guard = self.running.lock();
        if let Some(running) = guard.as_mut() {
            let _ = running.child.kill();
            let _ = running.child.wait();
        }
        *guard = None;
    }

    fn reap(&self) {
        let mut guard = self.running.lock();
        if let Some(mut running) = guard.take() {
            let _ = running.child.wait();
            let _ = running.reader_thread.join();
        }
    }

    /// Idempotent cleanup of any residual pipe handles.
    pub fn cleanup(&self) {
        *self.running.lock() = None;
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
