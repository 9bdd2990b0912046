// # tentacoold - tentacool daemon
//
// A thin integration layer: all reconciliation logic lives in
// tentacool-core, all system mutation in tentacool-linux.
//
// The daemon is responsible for:
// 1. Parsing flags (or `TENTACOOL_*` environment variables)
// 2. Opening the configuration database
// 3. Either applying `--setip` and exiting, or replaying stored
//    declarations onto the live system and serving the API
// 4. Flushing and closing the database on SIGTERM/SIGINT
//
// ## Example
//
// ```bash
// tentacoold --bind /var/run/tentacool --owner root --group netadmin
// tentacoold --bind 127.0.0.1:8080 --db /tmp/tentacool.db --log-level debug
// tentacoold --setip lan:eth0:192.168.1.10/24
// ```

mod cli;
mod socket;

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use cli::Cli;
use tentacool_api::{AppState, Listener};
use tentacool_core::records::AddressRecord;
use tentacool_core::{
    Adapters, ApplyStatus, ConfigStore, Reconcilers, StartupReplayer, open_store,
};
use tentacool_linux::LinuxConfig;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum TentacoolExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<TentacoolExitCode> for ExitCode {
    fn from(code: TentacoolExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = cli.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return TentacoolExitCode::ConfigError.into();
    }

    let log_level = match cli.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return TentacoolExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return TentacoolExitCode::ConfigError.into();
    }

    info!("Starting tentacoold");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return TentacoolExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(cli)).into()
}

/// Run the daemon to completion
async fn run_daemon(cli: Cli) -> TentacoolExitCode {
    let config = cli.core_config();
    let linux = cli.linux_config();

    let store = match open_store(&config.store).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open database {}: {}", cli.db.display(), e);
            return TentacoolExitCode::ConfigError;
        }
    };

    let adapters = tentacool_linux::adapters(&linux);
    let reconcilers = Reconcilers::new(store.clone(), adapters.clone(), config.reconciler.clone());

    let result = match &cli.setip {
        Some(setip) => set_ip(&reconcilers, setip).await,
        None => {
            replay(store.clone(), adapters, &cli).await;
            serve(&cli, reconcilers, &linux).await
        }
    };

    if let Err(e) = store.close().await {
        error!("Failed to close database: {}", e);
        return TentacoolExitCode::RuntimeError;
    }

    match result {
        Ok(()) => {
            info!("tentacoold stopped");
            TentacoolExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Daemon error: {:#}", e);
            TentacoolExitCode::RuntimeError
        }
    }
}

/// Reassert stored declarations
///
/// Never aborts startup; failures are logged per record.
async fn replay(store: Arc<dyn ConfigStore>, adapters: Adapters, cli: &Cli) {
    match StartupReplayer::new(store, adapters, cli.adapter_timeout())
        .replay()
        .await
    {
        Ok(report) if report.is_clean() => {
            info!("Replayed {} stored declaration(s)", report.attempted());
        }
        Ok(report) => {
            warn!(
                "Replayed {} stored declaration(s), {} failed",
                report.attempted(),
                report.failed()
            );
        }
        Err(e) => warn!("Replay could not read the database: {}", e),
    }
}

/// Reconcile one address given as ID:LINK:CIDR
async fn set_ip(reconcilers: &Reconcilers, setip: &str) -> Result<()> {
    let record = AddressRecord::parse_triplet(setip)?;
    info!("Setting address {} from the command line", record.id);

    let reconciled = reconcilers.address.reconcile(record).await?;
    if let ApplyStatus::ApplyFailed(reason) = &reconciled.status {
        anyhow::bail!(
            "address {} stored but not applied: {}",
            reconciled.record.id,
            reason
        );
    }

    info!(
        "Address {} set to {} on {}",
        reconciled.record.id, reconciled.record.ip, reconciled.record.link
    );
    Ok(())
}

/// Serve the API until a shutdown signal arrives
async fn serve(cli: &Cli, reconcilers: Reconcilers, linux: &LinuxConfig) -> Result<()> {
    let bind = cli.bind_addr()?;
    let listener = Listener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;

    if let Some(path) = listener.unix_path() {
        socket::secure(
            path,
            cli.owner.as_deref(),
            cli.group.as_deref(),
            cli.socket_mode()?,
        )?;
    }

    let state = AppState::new(reconcilers, tentacool_linux::inspector(linux));
    let app = tentacool_api::app(state);

    let mut signals = ShutdownSignals::new()?;
    let shutdown = async move {
        let name = signals.recv().await;
        info!("Received shutdown signal: {}", name);
    };

    tentacool_api::serve(listener, app, shutdown)
        .await
        .context("server error")
}

/// SIGTERM and SIGINT, installed before serving starts
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())
                .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?,
            sigint: signal(SignalKind::interrupt())
                .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Fallback for non-Unix platforms (CTRL-C only)
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
        }
        "SIGINT"
    }
}
