// Multi-tenant API Server
// Routes every request to its tenant's database

mod config;
mod handlers;
mod middleware;
mod routes;

use anyhow::Context;
use config::{Config, LogFormat};
use dotenvy::dotenv;
use mt_database::{ConnectionRouter, DataSourceRegistry, MultitenancyConfig, PgDataSource};
use mt_tenant::ContextTenantResolver;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

pub struct AppState {
    pub router: ConnectionRouter<PgDataSource>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let config = Config::from_env();
    init_tracing(config.log_format);

    tracing::info!("Starting multi-tenant API server");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let multitenancy = MultitenancyConfig::load(config.multitenancy_config.as_deref())
        .context("Failed to load multitenancy config")?;
    let default_tenant = multitenancy.default_tenant_id()?;
    tracing::info!(
        "Configured {} tenant data sources (default tenant: {})",
        multitenancy.data_sources.len(),
        default_tenant
    );

    // The router exists before its registry so the lifecycle is explicit
    let router = ConnectionRouter::new(ContextTenantResolver::new(default_tenant.clone()));

    let registry: DataSourceRegistry<PgDataSource> =
        DataSourceRegistry::build_all(&multitenancy.data_sources, &multitenancy.pool)
            .await
            .context("Failed to open tenant data sources")?;
    if !registry.contains(&default_tenant) {
        registry.close_all().await;
        anyhow::bail!("Default tenant {} has no configured data source", default_tenant);
    }
    router.install(registry).await?;

    let state = Arc::new(AppState {
        router: router.clone(),
    });

    let app = routes::create_router(state).layer(TraceLayer::new_for_http());

    tracing::info!("Routes configured:");
    tracing::info!("   GET  /health");
    tracing::info!("   GET  /api/tenant/current");

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server ready at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down, closing tenant data sources");
    router.shutdown().await;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,mt_api=debug,mt_database=debug,tower_http=debug".into());

    match format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
