// SPDX-License-Identifier: MIT

//! Interactive shell adapter: a line-oriented REPL over the child's
//! pipes with a handful of built-in verbs. Everything that isn't a
//! built-in is passed through to the child verbatim.

use crate::env;
use crate::supervisor::ChildSupervisor;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const PROMPT: &str = "[holdfast] > ";

const HELP_TEXT: &str = "built-ins: quit, exit, backup, status, help\n\
all other input is sent to the server directly.\n\
'stop' is intercepted: it bypasses the shutdown sequence, so 'quit' is safer.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Empty,
    Quit,
    Backup,
    Status,
    Help,
    Stop,
    Passthrough(String),
}

pub fn parse_command(line: &str) -> ShellCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ShellCommand::Empty;
    }
    let verb = trimmed.split_whitespace().next().unwrap_or("").to_ascii_lowercase();
    match verb.as_str() {
        "quit" | "exit" => ShellCommand::Quit,
        "backup" => ShellCommand::Backup,
        "status" => ShellCommand::Status,
        "help" => ShellCommand::Help,
        "stop" => ShellCommand::Stop,
        _ => ShellCommand::Passthrough(trimmed.to_string()),
    }
}

/// Everything the shell needs from the orchestrator, kept as a trait
/// so the dispatch logic below can be tested without a real
/// lock/snapshot/sync stack behind it.
pub trait ShellHost: Send + Sync {
    fn create_backup(&self) -> Result<String, String>;
    fn status_summary(&self) -> String;
    /// Called once when `quit`/`exit` is entered; runs the full
    /// shutdown sequence. The shell loop exits immediately after.
    fn request_shutdown(&self);
}

pub struct Shell<H: ShellHost> {
    supervisor: Arc<ChildSupervisor>,
    host: Arc<H>,
}

impl<H: ShellHost + 'static> Shell<H> {
    pub fn new(supervisor: Arc<ChildSupervisor>, host: Arc<H>) -> Self {
        Self { supervisor, host }
    }

    /// Handles one already-parsed command. Returns true if the shell
    /// should stop reading further input. `confirm` is only invoked for
    /// the protected `stop` verb, to avoid requiring a real terminal in
    /// tests that never exercise that branch.
    pub fn dispatch(&self, cmd: ShellCommand, out: &mut impl Write, mut confirm: impl FnMut() -> String) -> bool {
        match cmd {
            ShellCommand::Empty => false,
            ShellCommand::Quit => {
                self.host.request_shutdown();
                true
            }
            ShellCommand::Backup => {
                match self.host.create_backup() {
                    Ok(msg) => { let _ = writeln!(out, "{msg}"); }
                    Err(e) => { let _ = writeln!(out, "backup failed: {e}"); }
                }
                false
            }
            ShellCommand::Status => {
                let _ = writeln!(out, "{}", self.host.status_summary());
                false
            }
            ShellCommand::Help => {
                let _ = writeln!(out, "{HELP_TEXT}");
                false
            }
            ShellCommand::Stop => {
                let _ = writeln!(
                    out,
                    "warning: 'stop' skips the shutdown sequence (heartbeat stop, snapshot, lock release, sync resume)."
                );
                let _ = writeln!(out, "use 'quit' instead unless you mean it. Send raw stop anyway? [y/N]");
                let answer = confirm();
                if answer.trim().eq_ignore_ascii_case("y") {
                    self.supervisor.send_command("stop");
                }
                false
            }
            ShellCommand::Passthrough(line) => {
                self.supervisor.send_command(&line);
                false
            }
        }
    }

    /// Runs the foreground input loop. A background thread drains the
    /// child's stdout concurrently so server chatter interleaves with
    /// the prompt instead of blocking behind it.
    pub fn run(&self, mut input: impl BufRead, output: impl Write + Send + 'static) {
        let output = Arc::new(parking_lot::Mutex::new(output));

        let drain_stop = Arc::new(AtomicBool::new(false));
        let drain_supervisor = Arc::clone(&self.supervisor);
        let drain_flag = Arc::clone(&drain_stop);
        let drain_out = Arc::clone(&output);
        let poll_interval = env::read_line_poll_interval();
        let drainer = std::thread::spawn(move || {
            while !drain_flag.load(Ordering::Relaxed) {
                if let Some(line) = drain_supervisor.read_line(poll_interval) {
                    let _ = writeln!(drain_out.lock(), "{line}");
                }
            }
        });

        loop {
            {
                let mut out = output.lock();
                let _ = write!(out, "{PROMPT}");
                let _ = out.flush();
            }
            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) => break, // EOF
                Ok(_) => {}
                Err(_) => continue,
            }
            let cmd = parse_command(&line);
            let should_exit = self.dispatch(cmd, &mut *output.lock(), || {
                let mut answer = String::new();
                let _ = input.read_line(&mut answer);
                answer
            });
            if should_exit {
                break;
            }
        }

        drain_stop.store(true, Ordering::Relaxed);
        join_with_timeout(drainer, env::shell_drain_timeout());
    }
}

/// Waits for the drainer thread with a bounded deadline rather than an
/// unconditional join, mirroring the lock manager's heartbeat-stop
/// shape: a thread that won't join in time is logged, not fatal.
fn join_with_timeout(handle: std::thread::JoinHandle<()>, timeout: std::time::Duration) {
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = handle.join();
        let _ = done_tx.send(());
    });
    if done_rx.recv_timeout(timeout).is_err() {
        tracing::warn!("shell output drainer did not stop within the expected window");
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
