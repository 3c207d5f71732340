use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, MySql, MySqlPool};
use ts_rs::TS;

/// A poultry house.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Batiment {
    pub code: String,
    pub designation: String,
    pub capacite: i32,
    pub actif: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateBatiment {
    pub code: String,
    pub designation: String,
    pub capacite: i32,
    pub actif: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateBatiment {
    pub designation: Option<String>,
    pub capacite: Option<i32>,
    pub actif: Option<bool>,
}

const SELECT_BATIMENT: &str = r#"SELECT code, designation, capacite, actif, created_at, updated_at
    FROM batiment"#;

impl Batiment {
    pub async fn find_all(pool: &MySqlPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Batiment>(&format!("{SELECT_BATIMENT} ORDER BY code ASC"))
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_code<'e, E>(executor: E, code: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, Batiment>(&format!("{SELECT_BATIMENT} WHERE code = ?"))
            .bind(code)
            .fetch_optional(executor)
            .await
    }

    pub async fn create(pool: &MySqlPool, data: &CreateBatiment) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO batiment (code, designation, capacite, actif)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(&data.code)
        .bind(&data.designation)
        .bind(data.capacite)
        .bind(data.actif.unwrap_or(true))
        .execute(pool)
        .await?;

        Self::find_by_code(pool, &data.code)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(
        pool: &MySqlPool,
        code: &str,
        data: &UpdateBatiment,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query(
            r#"UPDATE batiment
               SET designation = COALESCE(?, designation),
                   capacite = COALESCE(?, capacite),
                   actif = COALESCE(?, actif)
               WHERE code = ?"#,
        )
        .bind(&data.designation)
        .bind(data.capacite)
        .bind(data.actif)
        .bind(code)
        .execute(pool)
        .await?;

        Self::find_by_code(pool, code).await
    }

    pub async fn delete(pool: &MySqlPool, code: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM batiment WHERE code = ?")
            .bind(code)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Whether any lot (open or closed) references this building.
    pub async fn has_lots(pool: &MySqlPool, code: &str) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM miseplace WHERE code_batiment = ?",
        )
        .bind(code)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn has_open_lot(pool: &MySqlPool, code: &str) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM miseplace WHERE code_batiment = ? AND cloture = 0",
        )
        .bind(code)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }
}
