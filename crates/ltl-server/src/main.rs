mod api;
mod middleware;
mod runner;
mod store;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, default_rate_limit_state, AppState};
use crate::middleware::AuthState;
use crate::store::DatasetStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ltl_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let dataset = match &config.dashboard_dataset {
        Some(path) => DatasetStore::load(path)
            .with_context(|| format!("failed to load dashboard dataset {}", path.display()))?,
        None => {
            tracing::warn!(
                "LTL_DASHBOARD_DATASET not set; serving an empty dataset until a query runs"
            );
            DatasetStore::default()
        }
    };

    let auth = AuthState::from_config(&config)?;
    let bind_addr = config.bind_addr;
    tracing::info!(
        env = %config.env,
        %bind_addr,
        auth = auth.enabled,
        "starting dashboard server"
    );
    let app = build_app(
        AppState::new(config, dataset),
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
