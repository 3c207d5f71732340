use anyhow::Context;
use db::DBService;
use server::{config::Config, deployment::LocalDeployment, routes};
use services::services::database_validator::DatabaseValidator;
use tracing::{info, warn};
use utils::logging::{init_sentry, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // Kept alive until exit so buffered events are flushed.
    let sentry_guard = config.sentry_dsn.as_deref().map(|dsn| {
        let environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        };
        init_sentry(dsn, environment)
    });
    init_tracing(config.log_format, sentry_guard.is_some());

    let db = DBService::new(
        &config.database_url,
        config.max_connections,
        config.run_migrations,
    )
    .await
    .context("failed to open the database")?;

    let validation = DatabaseValidator::new(db.pool.clone()).validate().await?;
    if validation.is_ok() {
        info!("{}", validation.summary());
    } else {
        warn!("{}", validation.summary());
        for warning in &validation.warnings {
            warn!(warning = %warning, "Database check");
        }
    }

    let addr = config.bind_addr()?;
    let app = routes::router(LocalDeployment::new(db, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
