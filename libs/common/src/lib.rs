//! Common library for the showcase services
//!
//! This crate provides shared functionality used by the sign-in and API
//! services: store connectivity and schema migrations, application
//! settings, session tokens and the user accounts repository.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, init_pool, health_check};
//! use common::migrations;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     migrations::run(&pool).await?;
//!     let is_healthy = health_check(&pool).await?;
//!     println!("Database health check: {}", is_healthy);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod migrations;
pub mod session;
pub mod users;
