use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use robridge_core::{ProxyConfig, ProxyService, ReqwestHttpClient};
use robridge_web::{cli::Cli, observability, router, AppState};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::init_tracing(&cli.log_level, cli.log_json);

    let config = ProxyConfig::from_env().context("invalid configuration")?;
    let state = AppState::new(ProxyService::new(
        &config,
        Arc::new(ReqwestHttpClient::new()),
    ));

    if cli.sweep_secs > 0 {
        spawn_cache_sweep(state.clone(), Duration::from_secs(cli.sweep_secs));
    }

    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    info!(
        bind = %cli.bind,
        cache_capacity = config.cache_capacity,
        max_attempts = config.retry.max_attempts,
        credential = config.api_key.is_some(),
        "robridge listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("robridge stopped");
    Ok(())
}

fn spawn_cache_sweep(state: AppState, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let dropped = state.service.cache().clear_expired().await;
            if dropped > 0 {
                debug!(dropped, "swept expired cache entries");
            }
        }
    });
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
