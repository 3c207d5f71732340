use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, MySql, MySqlPool};
use ts_rs::TS;

/// A closed production day.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Journee {
    pub jour: NaiveDate,
    pub valide: bool,
    pub date_validation: DateTime<Utc>,
    pub utilisateur: Option<String>,
}

const SELECT_JOURNEE: &str = "SELECT jour, valide, date_validation, utilisateur FROM journee";

impl Journee {
    pub async fn find<'e, E>(executor: E, jour: NaiveDate) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, Journee>(&format!("{SELECT_JOURNEE} WHERE jour = ?"))
            .bind(jour)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_all(pool: &MySqlPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Journee>(&format!("{SELECT_JOURNEE} ORDER BY jour DESC LIMIT ?"))
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn latest_validated<'e, E>(executor: E) -> Result<Option<NaiveDate>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_scalar::<_, Option<NaiveDate>>(
            "SELECT MAX(jour) FROM journee WHERE valide = 1",
        )
        .fetch_one(executor)
        .await
    }

    /// Records `jour` as validated. Holds a lock on the new row until commit.
    pub async fn mark_validated<'e, E>(
        executor: E,
        jour: NaiveDate,
        utilisateur: Option<&str>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query("INSERT INTO journee (jour, valide, utilisateur) VALUES (?, 1, ?)")
            .bind(jour)
            .bind(utilisateur)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, jour: NaiveDate) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        let result = sqlx::query("DELETE FROM journee WHERE jour = ?")
            .bind(jour)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
