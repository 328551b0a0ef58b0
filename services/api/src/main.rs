use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod extract;
mod middleware;
mod models;
mod repositories;
mod routes;
mod state;
mod validation;

#[cfg(test)]
mod test_support;

use common::{
    config::AppSettings,
    database::{DatabaseConfig, health_check, init_pool},
    migrations,
    session::SessionService,
};
use tokio::net::TcpListener;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    let settings = AppSettings::load()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    migrations::run(&pool).await?;

    let sessions = SessionService::new(&settings.jwt_secret, &settings.app_id);
    let app_state = AppState::new(pool, sessions);

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&settings.api_bind_addr).await?;
    info!("API service listening on {}", settings.api_bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
