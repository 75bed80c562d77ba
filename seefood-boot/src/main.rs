//! seefood-boot — bootstrap sequencer for the seefood backend.
//!
//! `run` waits for the database, applies the setup steps in order, then
//! execs the API server in place. `setup` stops before the exec; `check`
//! stops after the probe. The runtime is built by hand rather than with
//! `#[tokio::main]` so it can be torn down before the process image is
//! replaced — no worker thread may survive into the server.

mod cli;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use seefood_boot_core::{
    config::load_config,
    database::init_database,
    launch::{self, LaunchSpec},
    logging::init_logging,
    probe::{wait_for_endpoint, ProbeTarget},
    setup::{
        CollectStaticStep, MigrateStep, PreflightStep, SeedAdminStep, SeedUsersStep,
        SetupContext, SetupRunner,
    },
    Config,
};

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Load and validate configuration
    let config = load_config(cli.config.as_deref())?;

    // 2. Initialize logging
    init_logging(&config.logging)?;

    let command = cli.command.unwrap_or(Command::Run);
    let wants_launch = matches!(command, Command::Run);

    let runtime = tokio::runtime::Runtime::new().context("failed to create runtime")?;
    let cancel = CancellationToken::new();

    let launch_spec: Option<LaunchSpec> = runtime.block_on(async {
        spawn_signal_listener(cancel.clone());

        match command {
            Command::Check => {
                wait_for_database(&config, &cancel).await?;
                Ok::<_, anyhow::Error>(None)
            }
            Command::Setup | Command::Run => {
                run_sequence(&config, &cancel).await?;
                if wants_launch {
                    Ok(Some(LaunchSpec::from_config(&config)?))
                } else {
                    Ok(None)
                }
            }
        }
    })?;

    // No runtime threads may outlive this point; exec replaces the image.
    drop(runtime);

    if let Some(spec) = launch_spec {
        info!(
            program = %spec.program,
            address = %config.server_address(),
            "handing over to the server"
        );
        let err = launch::exec(&spec);
        return Err(anyhow::Error::new(err).context(format!("failed to exec '{}'", spec.program)));
    }

    Ok(())
}

/// Block until the database endpoint accepts TCP connections.
async fn wait_for_database(config: &Config, cancel: &CancellationToken) -> anyhow::Result<()> {
    let target = ProbeTarget::from_database_url(config.database_url())?;
    info!(endpoint = %target, "waiting for database");

    let elapsed = wait_for_endpoint(&target, &config.probe.policy(), cancel).await?;
    info!(
        endpoint = %target,
        "database reachable after {}",
        humantime::format_duration(truncate_to_millis(elapsed))
    );
    Ok(())
}

/// Probe, connect, then run every setup step in its fixed order.
async fn run_sequence(config: &Config, cancel: &CancellationToken) -> anyhow::Result<()> {
    wait_for_database(config, cancel).await?;

    let pool = init_database(&config.database).await?;
    let ctx = SetupContext::new(config.clone(), pool.clone());

    let runner = SetupRunner::with_steps(vec![
        Box::new(PreflightStep),
        Box::new(MigrateStep),
        Box::new(CollectStaticStep),
        Box::new(SeedAdminStep),
        Box::new(SeedUsersStep),
    ]);

    let reports = runner.run(&ctx, cancel).await?;
    for report in &reports {
        info!(
            step = report.name,
            outcome = %report.outcome,
            "step finished in {}",
            humantime::format_duration(truncate_to_millis(report.elapsed))
        );
    }
    info!("setup complete, ready to serve");

    // The server builds its own pool; ours must not linger through exec.
    pool.close().await;
    Ok(())
}

/// Cancel the sequence on SIGINT/SIGTERM so the container stops promptly
/// even while the probe is still waiting.
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(signal) => signal,
                    Err(e) => {
                        error!("failed to install SIGTERM handler: {e}");
                        return;
                    }
                };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("received Ctrl-C, shutting down");
        }
        cancel.cancel();
    });
}

fn truncate_to_millis(duration: Duration) -> Duration {
    Duration::from_millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}
