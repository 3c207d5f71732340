//! Startup checks on the MySQL schema.

use sqlx::MySqlPool;
use thiserror::Error;
use tracing::{info, warn};

/// Tables the services read and write.
pub const REQUIRED_TABLES: &[&str] = &[
    "batiment",
    "article",
    "paramaitre",
    "miseplace",
    "paramsouche",
    "ebe",
    "lbe",
    "emvt",
    "lmvt",
    "journee",
];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct DatabaseValidator {
    pool: MySqlPool,
}

impl DatabaseValidator {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DatabaseValidationError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM information_schema.tables
               WHERE table_schema = DATABASE() AND table_name = ?"#,
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Checks the migrations table and every required table.
    pub async fn validate(&self) -> Result<ValidationResult, DatabaseValidationError> {
        let missing_tables = self.validate_tables(REQUIRED_TABLES).await?;

        if !self.table_exists("_sqlx_migrations").await? {
            warn!("_sqlx_migrations table does not exist");
            let mut warnings = vec!["Schema is not managed by migrations".to_string()];
            if !missing_tables.is_empty() {
                warnings.push(format!("missing tables: {}", missing_tables.join(", ")));
            }
            return Ok(ValidationResult {
                is_initialized: missing_tables.is_empty(),
                migrations_applied: 0,
                latest_migration: None,
                missing_tables,
                warnings,
            });
        }

        let migrations_applied = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(&self.pool)
        .await?;
        let latest_migration = self.get_latest_migration().await?;

        let mut warnings = Vec::new();
        if !missing_tables.is_empty() {
            warn!(tables = %missing_tables.join(", "), "Required tables are missing");
            warnings.push(format!("missing tables: {}", missing_tables.join(", ")));
        }

        info!(migrations_applied, "Database validation complete");

        Ok(ValidationResult {
            is_initialized: missing_tables.is_empty(),
            migrations_applied: migrations_applied as usize,
            latest_migration,
            missing_tables,
            warnings,
        })
    }

    pub async fn validate_tables(
        &self,
        required_tables: &[&str],
    ) -> Result<Vec<String>, DatabaseValidationError> {
        let mut missing_tables = Vec::new();
        for table in required_tables {
            if !self.table_exists(table).await? {
                missing_tables.push(table.to_string());
            }
        }
        Ok(missing_tables)
    }

    pub async fn get_latest_migration(&self) -> Result<Option<String>, DatabaseValidationError> {
        let migration = sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success = 1 ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(migration)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub is_initialized: bool,
    pub migrations_applied: usize,
    pub latest_migration: Option<String>,
    pub missing_tables: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.is_initialized && self.warnings.is_empty()
    }

    pub fn summary(&self) -> String {
        if !self.missing_tables.is_empty() {
            format!(
                "Database schema incomplete - missing tables: {}",
                self.missing_tables.join(", ")
            )
        } else if !self.warnings.is_empty() {
            format!("Database validation warnings: {}", self.warnings.join(", "))
        } else {
            format!(
                "Database OK - {} migrations applied",
                self.migrations_applied
            )
        }
    }
}
