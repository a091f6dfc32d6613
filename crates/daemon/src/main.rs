// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kandevd`: loads the config directory, makes sure no other daemon
//! instance is already running out of it, wires up the store, orchestrator,
//! and WebSocket server, runs startup recovery, then serves until a
//! shutdown signal arrives.

use std::path::Path;
use std::sync::Arc;

use kandev_core::SystemClock;
use kandev_daemon::config::Config;
use kandev_daemon::launcher::ProcessAgentLauncher;
use kandev_daemon::server::{self, AppState};
use kandev_daemon::{DaemonError, Hub, OrchestratorService};
use kandev_store::Store;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // tracing may not be installed yet if Config::load itself failed.
        eprintln!("kandevd: {err}");
        error!(error = %err, "daemon exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), DaemonError> {
    let config = Config::load()?;
    config.ensure_master_key()?;

    let _log_guard = init_logging(&config.log_path);
    info!(config_dir = %config.config_dir.display(), "starting kandevd");

    let _lock = acquire_lock(&config.lock_path)?;

    let store = Store::open(&config.db_path).map_err(DaemonError::Store)?;
    let hub = Hub::spawn();
    let launcher = Arc::new(ProcessAgentLauncher);
    let orchestrator = OrchestratorService::new(store, hub.clone(), SystemClock, launcher);

    if let Err(err) = kandev_daemon::recovery::recover(&orchestrator).await {
        error!(error = %err, "startup recovery failed, continuing with whatever state is left");
    }

    let state = Arc::new(AppState { orchestrator, hub });
    let router = server::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    info!("kandevd shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        // Registering a signal handler only fails if the runtime's signal
        // driver itself is broken, which would doom the process anyway.
        #[allow(clippy::expect_used)]
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received sigterm, shutting down"),
    }
}

fn init_logging(log_path: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(
        log_path.parent().unwrap_or_else(|| Path::new(".")),
        log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("kandevd.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = tracing_subscriber::fmt::layer().with_target(false).with_filter(filter());
    let file_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false).with_filter(filter());

    tracing_subscriber::registry().with(console_layer).with(file_layer).init();
    guard
}

/// A PID-based single-instance guard. The in-process adapter model means
/// nothing outlives this process to flock against, so this just refuses to
/// start if the recorded pid is still alive, and overwrites a stale file
/// otherwise.
struct LockGuard {
    path: std::path::PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn acquire_lock(lock_path: &Path) -> Result<LockGuard, DaemonError> {
    if let Ok(existing) = std::fs::read_to_string(lock_path) {
        if let Ok(pid) = existing.trim().parse::<i32>() {
            if pid_is_alive(pid) {
                return Err(DaemonError::LockFailed(std::io::Error::new(
                    std::io::ErrorKind::AddrInUse,
                    format!("kandevd already running as pid {pid}"),
                )));
            }
        }
    }

    std::fs::write(lock_path, std::process::id().to_string())?;
    Ok(LockGuard { path: lock_path.to_path_buf() })
}

#[cfg(unix)]
fn pid_is_alive(pid: i32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}

#[cfg(not(unix))]
fn pid_is_alive(_pid: i32) -> bool {
    false
}
