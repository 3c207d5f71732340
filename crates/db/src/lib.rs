use std::time::Duration;

use sqlx::{
    MySqlPool,
    migrate::{MigrateError, Migrator},
    mysql::MySqlPoolOptions,
};
use thiserror::Error;
use tracing::info;

pub mod models;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Error)]
pub enum DBServiceError {
    #[error("database connection failed: {0}")]
    Connect(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] MigrateError),
}

#[derive(Clone)]
pub struct DBService {
    pub pool: MySqlPool,
}

impl DBService {
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        run_migrations: bool,
    ) -> Result<DBService, DBServiceError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        if run_migrations {
            MIGRATOR.run(&pool).await?;
            info!("Database migrations applied");
        }

        Ok(DBService { pool })
    }

    /// Wraps an existing pool, typically a lazily connected one.
    pub fn from_pool(pool: MySqlPool) -> DBService {
        DBService { pool }
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
