use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Database as DatabaseConfig;
use crate::migration::{Migrator, MigratorTrait};

#[derive(Clone)]
pub struct DatabaseService {
    pub connection: DatabaseConnection,
}

impl DatabaseService {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let mut opt = ConnectOptions::new(&config.url);
        opt.max_connections(config.max_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(3600))
            .sqlx_logging(true);

        info!("Connecting to database: {}", config.url);
        let connection = Database::connect(opt).await?;

        // Readers must not block the single writer while an upload commits
        if !config.url.contains(":memory:") {
            connection
                .execute_unprepared("PRAGMA journal_mode=WAL;")
                .await?;
            debug!("SQLite journal mode set to WAL");
        }

        info!("Running database migrations...");
        Migrator::up(&connection, None).await?;

        info!("Database connection established and migrations completed");

        Ok(Self { connection })
    }

    /// Private in-memory database, a single connection keeps it alive
    pub async fn in_memory() -> Result<Self> {
        Self::new(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            connect_timeout: 8,
        })
        .await
    }

    pub fn get_connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}
