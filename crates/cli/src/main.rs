// SPDX-License-Identifier: MIT

//! `holdfast`: the CLI entry point. Parses the mutually exclusive
//! run modes, wires the component stack together, and renders
//! top-level errors with the color facade before mapping them to an
//! exit code.

mod color;
mod prompt;
mod status;

use clap::Parser;
use holdfast_core::{host_id, Clock, Config, SystemClock};
use holdfast_daemon::{run_shutdown, run_startup, LifecycleError, OperatorPrompt, Orchestrator, Shell, ShellHost};
use holdfast_daemon::lock::LockManager;
use holdfast_daemon::supervisor::{ChildSupervisor, SupervisorConfig};
use holdfast_storage::SnapshotEngine;
use holdfast_sync::SyncClient;
use prompt::StdinPrompt;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "holdfast", version, styles = color::styles())]
#[command(about = "Single-writer coordinator for a replicated game server")]
struct Cli {
    /// Print lock, sync, and snapshot state, then exit. No side effects.
    #[arg(long, conflicts_with_all = ["backup", "restore"])]
    status: bool,

    /// Create a snapshot of the working directory and exit. No child spawn.
    #[arg(long, conflicts_with_all = ["status", "restore"])]
    backup: bool,

    /// Interactively select and restore a snapshot, then exit. No child spawn.
    #[arg(long, conflicts_with_all = ["status", "backup"])]
    restore: bool,

    /// Raise the file log level to debug, regardless of the config file.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let hostname = host_id();

    let (config, api_key) = match holdfast_core::load_config(&hostname) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("{} {e}", color::header("error:"));
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match holdfast_daemon::logging::init(&config, cli.debug) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{} could not initialize logging: {e}", color::header("warning:"));
            None
        }
    };

    for warning in config.validate() {
        eprintln!("{} {warning}", color::header("warning:"));
    }

    let outcome = if cli.status {
        status::print_status(&config, &hostname, &api_key)
    } else if cli.backup {
        run_backup_only(&config)
    } else if cli.restore {
        run_restore(&config)
    } else {
        run_interactive(config, hostname, api_key, cli.debug)
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {e}", color::header("error:"));
            ExitCode::FAILURE
        }
    }
}

fn build_orchestrator(config: Config, hostname: String, api_key: String) -> Orchestrator<SystemClock> {
    let clock = SystemClock;
    let lock = LockManager::new(config.lock_file(), hostname, clock.clone());
    let supervisor = ChildSupervisor::new(SupervisorConfig {
        java_path: config.server.java_path.clone(),
        jar_path: config.server_jar(),
        working_dir: config.server.folder.clone(),
        min_memory: config.server.min_memory.clone(),
        max_memory: config.server.max_memory.clone(),
        extra_args: config.server.extra_args.clone(),
    });
    let sync = SyncClient::new(config.sync.url.clone(), api_key, config.sync.folder_id.clone());
    let snapshots = SnapshotEngine::new(config.world_folder(), config.backup.folder.clone());
    Orchestrator::new(config, clock, lock, supervisor, sync, snapshots)
}

fn run_backup_only(config: &Config) -> anyhow::Result<bool> {
    let snapshots = SnapshotEngine::new(config.world_folder(), config.backup.folder.clone());
    let clock = SystemClock;
    match snapshots.create(clock.utc_now(), |n| eprintln!("{} {n} files archived so far", color::muted("..."))) {
        Ok(snapshot) => {
            println!(
                "{} snapshot created at {} ({} bytes)",
                color::header("ok:"),
                snapshot.path.display(),
                snapshot.size_bytes
            );
            Ok(true)
        }
        Err(e) => {
            eprintln!("{} snapshot failed: {e}", color::header("error:"));
            Ok(false)
        }
    }
}

fn run_restore(config: &Config) -> anyhow::Result<bool> {
    let snapshots = SnapshotEngine::new(config.world_folder(), config.backup.folder.clone());
    let available = snapshots.list()?;
    if available.is_empty() {
        eprintln!("{} no snapshots found in {}", color::header("error:"), config.backup.folder.display());
        return Ok(false);
    }

    println!("{}", color::header("available snapshots (newest first):"));
    for (idx, snap) in available.iter().enumerate() {
        println!(
            "  {} {} ({} bytes)",
            color::literal(&format!("[{idx}]")),
            snap.timestamp,
            snap.size_bytes
        );
    }

    let prompt = StdinPrompt;
    let Some(choice) = prompt.ask_index("select a snapshot to restore", available.len()) else {
        eprintln!("{} no selection made", color::header("error:"));
        return Ok(false);
    };
    let chosen = &available[choice];

    if !prompt.confirm(&format!(
        "restore {} over {}? this will rename the current world to a .old rollback directory",
        chosen.path.display(),
        config.world_folder().display()
    )) {
        println!("{}", color::muted("restore cancelled"));
        return Ok(true);
    }

    match snapshots.restore(chosen, &config.world_folder()) {
        Ok(()) => {
            println!("{} restored {}", color::header("ok:"), chosen.path.display());
            Ok(true)
        }
        Err(e) => {
            eprintln!("{} restore failed: {e}", color::header("error:"));
            Ok(false)
        }
    }
}

struct InteractiveHost<C: Clock + 'static> {
    orch: Arc<Orchestrator<C>>,
}

impl<C: Clock + 'static> ShellHost for InteractiveHost<C> {
    fn create_backup(&self) -> Result<String, String> {
        self.orch
            .snapshots
            .create(self.orch.clock.utc_now(), |_| {})
            .map(|s| format!("snapshot created: {}", s.path.display()))
            .map_err(|e| e.to_string())
    }

    fn status_summary(&self) -> String {
        let uptime = self.orch.supervisor.uptime().map(|d| format!("{}s", d.as_secs())).unwrap_or_else(|| "n/a".to_string());
        let latest = self.orch.snapshots.latest().ok().flatten().map(|s| s.timestamp.to_string()).unwrap_or_else(|| "none".to_string());
        let sync_state = if self.orch.sync.enabled() {
            self.orch.sync.get_folder_status().map(|s| s.state).unwrap_or_else(|_| "unknown".to_string())
        } else {
            "disabled".to_string()
        };
        format!("server: running (uptime {uptime}), latest snapshot: {latest}, sync: {sync_state}")
    }

    fn request_shutdown(&self) {
        if self.orch.begin_shutdown() {
            let report = run_shutdown(&*self.orch);
            if !report.errors.is_empty() {
                for e in &report.errors {
                    eprintln!("{} {e}", color::header("warning:"));
                }
            }
        }
    }
}

fn run_interactive(config: Config, hostname: String, api_key: String, _debug: bool) -> anyhow::Result<bool> {
    let orch = Arc::new(build_orchestrator(config, hostname, api_key));
    let prompt = StdinPrompt;

    match run_startup(&orch, &prompt) {
        Ok(()) => {}
        Err(LifecycleError::LockContentionActive(holder)) => {
            eprintln!("{} another host ('{holder}') is actively running the server; refusing to start", color::header("error:"));
            return Ok(false);
        }
        Err(e) => {
            eprintln!("{} startup failed: {e}", color::header("error:"));
            return Ok(false);
        }
    }

    install_signal_handler(Arc::clone(&orch));

    let host = Arc::new(InteractiveHost { orch: Arc::clone(&orch) });
    let shell = Shell::new(Arc::clone(&orch.supervisor), host);
    let stdin = std::io::stdin();
    shell.run(stdin.lock(), std::io::stdout());

    // The shell loop exits either because `quit` ran the full shutdown
    // sequence, or because stdin hit EOF without ever calling it (e.g.
    // a non-interactive invocation piping input in). Either way the
    // shutdown sequence must run exactly once before we return.
    let mut forced = false;
    if orch.begin_shutdown() {
        let report = run_shutdown(&orch);
        forced = report.child_forced;
        for e in &report.errors {
            eprintln!("{} {e}", color::header("warning:"));
        }
    }

    Ok(!forced)
}

fn install_signal_handler<C: Clock + 'static>(orch: Arc<Orchestrator<C>>) {
    let triggered = Arc::new(AtomicBool::new(false));
    for sig in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM, signal_hook::consts::SIGHUP] {
        let _ = signal_hook::flag::register(sig, Arc::clone(&triggered));
    }

    std::thread::spawn(move || loop {
        if triggered.load(Ordering::Relaxed) && orch.begin_shutdown() {
            let report = run_shutdown(&orch);
            for e in &report.errors {
                eprintln!("{} {e}", color::header("warning:"));
            }
            std::process::exit(if report.child_forced || !report.errors.is_empty() { 1 } else { 0 });
        }
        std::thread::sleep(Duration::from_millis(100));
    });
}
