mod args;
mod output;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modforge_core::{
    load_config, load_config_or_default, metrics, Config, Launcher, LauncherConfig, LocalHost,
    Orchestrator, ProcessLauncher, RunError,
};

use args::{Args, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the summary.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(e) = run(args).await {
        if let Some(RunError::Preflight(preflight)) = e.downcast_ref::<RunError>() {
            eprintln!("{}", preflight.remediation());
        }
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = load(&args)?;
    args.apply(&mut config);

    let host = Arc::new(LocalHost::new(config.preflight.entropy_path.clone()));
    let launcher: Arc<dyn Launcher> =
        Arc::new(ProcessLauncher::new(LauncherConfig::from_tool(&config.tool)));
    let textfile = config.metrics.textfile.clone();

    let cancel = CancellationToken::new();
    let orchestrator =
        Orchestrator::new(config, host, launcher).with_cancellation(cancel.clone());

    if args.plan {
        let jobs = orchestrator.plan().context("Cannot plan run")?;
        output::write_plan(&mut io::stdout().lock(), &jobs)?;
        return Ok(());
    }

    tokio::spawn(cancel_on_signal(cancel));

    let result = orchestrator.run().await;
    if let Some(path) = &textfile {
        export_metrics(path);
    }
    let summary = result?;

    let mut stdout = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &summary)?;
        writeln!(stdout)?;
    } else {
        output::write_summary(&mut stdout, &summary)?;
    }
    Ok(())
}

fn load(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => load_config_or_default(Path::new(DEFAULT_CONFIG_PATH))
            .context("Failed to load configuration"),
    }
}

fn export_metrics(path: &Path) {
    match metrics::write_textfile(path) {
        Ok(()) => info!("Wrote metrics to {:?}", path),
        Err(e) => warn!("Failed to write metrics to {:?}: {}", path, e),
    }
}

/// Cancels the run on Ctrl+C or SIGTERM. Running jobs are allowed to finish.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown requested, waiting for running jobs to finish");
    cancel.cancel();
}
