use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tokio_util::sync::CancellationToken;

use domain_recon::browser::BrowserPool;
use domain_recon::config::Config;
use domain_recon::initialization::{init_logger_with, init_precheck_client, init_semaphore};
use domain_recon::orchestrate::ServiceContext;
use domain_recon::storage::{init_db_pool_with_path, init_schema};
use domain_recon::{server, LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "domain_recon", about = "Domain reconnaissance service", version)]
struct Opt {
    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    let config = Config::from_env().context("Failed to parse environment configuration")?;
    info!(
        "Starting domain_recon on port {} (concurrency {}, cache ttl {}s)",
        config.port, config.concurrency, config.cache_ttl_seconds
    );

    let db = init_db_pool_with_path(&config.sqlite_path)
        .await
        .context("Failed to initialize cache database")?;
    init_schema(&db)
        .await
        .context("Failed to initialize cache schema")?;

    let precheck_client =
        init_precheck_client(&config).context("Failed to initialize pre-check client")?;
    let browser = BrowserPool::new(&config);
    let scan_semaphore = init_semaphore(config.concurrency);

    let ctx = Arc::new(ServiceContext {
        config: config.clone(),
        db,
        browser: Arc::clone(&browser),
        precheck_client,
        scan_semaphore,
    });

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    server::start_server(config.port, ctx, shutdown).await?;

    // Best-effort: do not leave a headless Chromium behind.
    browser.shutdown().await;
    info!("Bye");
    Ok(())
}

fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("SIGTERM handler unavailable: {e}");
                    let _ = tokio::signal::ctrl_c().await;
                    shutdown.cancel();
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        info!("Shutdown signal received");
        shutdown.cancel();
    });
}
