use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod oauth;
mod pending;
mod routes;

use common::{
    config::AppSettings,
    database::{DatabaseConfig, health_check, init_pool},
    migrations,
    session::SessionService,
    users::UserRepository,
};
use sqlx::SqlitePool;
use tokio::net::TcpListener;

use crate::{
    oauth::{PortalClient, PortalConfig},
    pending::PendingLogins,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub settings: AppSettings,
    pub sessions: SessionService,
    pub portal: PortalClient,
    pub pending: PendingLogins,
    pub user_repository: UserRepository,
}

impl AppState {
    pub fn new(pool: SqlitePool, settings: AppSettings) -> Result<Self> {
        let portal = PortalClient::new(PortalConfig::from_settings(&settings))?;

        Ok(Self {
            sessions: SessionService::new(&settings.jwt_secret, &settings.app_id),
            user_repository: UserRepository::new(pool.clone()),
            pending: PendingLogins::default(),
            portal,
            settings,
            db_pool: pool,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting sign-in service");

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

    let bind_addr = settings.auth_bind_addr.clone();
    let app_state = AppState::new(pool, settings)?;

    info!("Sign-in service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Sign-in service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
