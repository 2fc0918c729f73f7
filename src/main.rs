use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};

use marketplace_checkout as api;
use marketplace_checkout::repositories::{
    CheckoutRepository, InMemoryRepository, SeaOrmCheckoutRepository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);
    api::handlers::health::init_start_time();

    // Storage: database (optionally migrated) or process-local maps
    let (repository, db): (Arc<dyn CheckoutRepository>, Option<Arc<api::db::DbPool>>) =
        if cfg.uses_in_memory_storage() {
            info!("Using in-memory storage; records are lost on restart");
            (Arc::new(InMemoryRepository::new()), None)
        } else {
            let db_pool = api::db::establish_connection_from_app_config(&cfg)
                .await
                .context("failed to connect to database")?;
            if cfg.auto_migrate {
                api::db::run_migrations(&db_pool).await.map_err(|e| {
                    error!("Failed running migrations: {}", e);
                    e
                })?;
            }
            let db_arc = Arc::new(db_pool);
            (
                Arc::new(SeaOrmCheckoutRepository::new(db_arc.clone())),
                Some(db_arc),
            )
        };

    let gateway =
        api::gateway::build_gateway(&cfg.gateway).context("failed to build payment gateway")?;
    if cfg.uses_in_memory_gateway() {
        info!("Using in-memory payment gateway; no real sessions are created");
    }
    if cfg.gateway.webhook_secret.is_none() {
        info!("Webhook secret not configured; every webhook delivery will be rejected");
    }

    let services = api::handlers::AppServices::new(repository, gateway, &cfg)
        .context("invalid origin pattern")?;

    let app_state = api::AppState {
        config: Arc::new(cfg.clone()),
        services,
        db,
    };
    let app = api::app_router(app_state);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    info!("marketplace-checkout listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install signal handler: {}", e);
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
