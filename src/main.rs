// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use site_checker::{
    checker::Checker,
    config::{self, Config},
    controller::Controller,
    health::summarize,
    metrics::MetricsRegistry,
    notify::{ConsoleNotifier, LogObserver, ObserverSet},
    probe::{HttpProber, DEFAULT_USER_AGENT},
    server::{ServerBuilder, StatusHandler},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "site-checker", about = "Periodic HTTP(S) availability checker")]
struct Cli {
    /// Configuration file (YAML or JSON). Defaults to config.yml next to the executable.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Run a single sweep, print the report and exit.
    #[arg(long)]
    once: bool,

    /// Log every probe.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("site_checker={}", level).parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    info!("Loading configuration from: {}", config_path.display());
    let config = config::load_config(&config_path).await?;
    info!("Loaded {} sites", config.sites.len());

    let prober = HttpProber::new(DEFAULT_USER_AGENT, config.general.follow_redirects)
        .context("Failed to create HTTP client")?;
    let checker = Checker::new(
        Arc::new(prober),
        config.targets(),
        config.general.concurrent_checks,
    )?;

    if cli.once {
        return Ok(run_once(&checker).await);
    }

    run_daemon(config, checker).await?;
    Ok(ExitCode::SUCCESS)
}

fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("config.yml")))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from("config.yml"))
}

async fn run_once(checker: &Checker) -> ExitCode {
    let sweep = checker.check_all().await;
    let summary = summarize(&sweep);

    print!("{}", summary.formatted_report);
    if summary.all_healthy {
        println!("All sites are up");
        ExitCode::SUCCESS
    } else {
        println!("Problems detected:\n{}", summary.failure_digest());
        ExitCode::FAILURE
    }
}

async fn run_daemon(config: Config, checker: Checker) -> Result<()> {
    let metrics_registry = Arc::new(MetricsRegistry::new()?);

    let mut observers = ObserverSet::new().with(Arc::new(LogObserver));
    if config.notifications.console_output {
        observers = observers.with(Arc::new(ConsoleNotifier::new(config.notifications.policy)));
    }

    let controller = Arc::new(
        Controller::new(checker, config.general.interval(), Arc::new(observers))?
            .with_metrics(metrics_registry.collector()),
    );

    let controller_task = tokio::spawn(controller.clone().start());

    let (server_shutdown_tx, server_shutdown_rx) = watch::channel(false);
    let server_task = if config.status_server.enabled {
        let addr: SocketAddr = ([127, 0, 0, 1], config.status_server.port).into();
        let handler = StatusHandler::new(controller.clone(), Some(metrics_registry.clone()));
        Some(tokio::spawn(
            ServerBuilder::new(addr)
                .with_handler(handler)
                .with_shutdown(server_shutdown_rx)
                .serve(),
        ))
    } else {
        None
    };

    shutdown_signal().await;

    controller.shutdown();
    let _ = server_shutdown_tx.send(true);

    match controller_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Controller error: {}", e),
        Err(e) => error!("Controller task join error: {}", e),
    }
    if let Some(task) = server_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Status server error: {:#}", e),
            Err(e) => error!("Status server task join error: {}", e),
        }
    }

    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
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

    info!("Shutdown signal received");
}
