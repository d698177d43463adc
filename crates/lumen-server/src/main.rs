mod api;
mod middleware;

use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::RateLimitState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = lumen_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let catalog = lumen_core::load_catalog(&config.catalog_path)?;
    tracing::info!(
        path = %config.catalog_path.display(),
        products = catalog.products.len(),
        "catalog loaded"
    );

    // Lazy so the storefront still serves the catalog while the database is down.
    let pool_config = lumen_db::PoolConfig::from_app_config(&config);
    let pool = lumen_db::connect_pool_lazy(&config.database_url, pool_config)?;
    match lumen_db::run_migrations(&pool).await {
        Ok(applied) => tracing::info!(applied, "migrations complete"),
        Err(e) => tracing::warn!(error = %e, "migrations skipped; database unavailable"),
    }

    let app = build_app(
        AppState {
            pool,
            catalog: Arc::new(catalog),
        },
        RateLimitState::from_app_config(&config),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = ?config.env, "lumen-server listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
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
