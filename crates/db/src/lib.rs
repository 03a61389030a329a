//! Database layer for agora.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use agora_common::{AppError, Config, config::DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::log::LevelFilter;

/// Pool options for the `[database]` section.
///
/// Connecting never waits longer than acquiring a pooled connection does.
#[must_use]
pub fn connect_options(settings: &DatabaseConfig) -> ConnectOptions {
    let acquire = Duration::from_secs(settings.acquire_timeout_secs);
    let mut opt = ConnectOptions::new(&settings.url);

    opt.max_connections(settings.max_connections)
        .min_connections(settings.min_connections.min(settings.max_connections))
        .connect_timeout(acquire)
        .acquire_timeout(acquire)
        .idle_timeout(Duration::from_secs(settings.idle_timeout_secs))
        .sqlx_logging(settings.log_statements)
        .sqlx_logging_level(LevelFilter::Debug);
    opt
}

/// Open the connection pool.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    Database::connect(connect_options(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Apply every pending migration.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    let pending = migrations::Migrator::get_pending_migrations(db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    if pending.is_empty() {
        tracing::debug!("Schema is up to date");
        return Ok(());
    }

    tracing::info!(pending = pending.len(), "Applying migrations");
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> DatabaseConfig {
        DatabaseConfig {
            url: "postgres://localhost/agora".to_string(),
            max_connections: 8,
            min_connections: 2,
            acquire_timeout_secs: 3,
            idle_timeout_secs: 120,
            log_statements: false,
        }
    }

    #[test]
    fn test_connect_options_follow_settings() {
        let opt = connect_options(&settings());

        assert_eq!(opt.get_max_connections(), Some(8));
        assert_eq!(opt.get_min_connections(), Some(2));
        assert_eq!(opt.get_acquire_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(opt.get_connect_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(opt.get_idle_timeout(), Some(Duration::from_secs(120)));
        assert!(!opt.get_sqlx_logging());
    }

    #[test]
    fn test_min_connections_never_exceed_max() {
        let opt = connect_options(&DatabaseConfig {
            min_connections: 50,
            ..settings()
        });

        assert_eq!(opt.get_min_connections(), Some(8));
    }
}
