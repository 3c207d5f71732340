use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, MySql, MySqlPool};
use ts_rs::TS;

/// A stock item: feed, eggs, day-old chicks...
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Article {
    pub code: String,
    pub designation: String,
    pub unite: String,
    /// Articles outside stock management are never moved by documents.
    pub gere_stock: bool,
    #[ts(type = "string")]
    pub stock: Decimal,
    /// Weighted average unit cost.
    #[ts(type = "string")]
    pub pmp: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateArticle {
    pub code: String,
    pub designation: String,
    pub unite: Option<String>,
    pub gere_stock: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateArticle {
    pub designation: Option<String>,
    pub unite: Option<String>,
    pub gere_stock: Option<bool>,
}

const SELECT_ARTICLE: &str = r#"SELECT code, designation, unite, gere_stock, stock, pmp, created_at, updated_at
    FROM article"#;

impl Article {
    pub fn value(&self) -> Decimal {
        self.stock * self.pmp
    }

    pub async fn find_all(pool: &MySqlPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Article>(&format!("{SELECT_ARTICLE} ORDER BY code ASC"))
            .fetch_all(pool)
            .await
    }

    pub async fn find_stocked<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, Article>(&format!(
            "{SELECT_ARTICLE} WHERE gere_stock = 1 ORDER BY code ASC"
        ))
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_code<'e, E>(executor: E, code: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, Article>(&format!("{SELECT_ARTICLE} WHERE code = ?"))
            .bind(code)
            .fetch_optional(executor)
            .await
    }

    /// Reads the article and locks its row until the surrounding transaction ends.
    pub async fn find_for_update<'e, E>(
        executor: E,
        code: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, Article>(&format!("{SELECT_ARTICLE} WHERE code = ? FOR UPDATE"))
            .bind(code)
            .fetch_optional(executor)
            .await
    }

    pub async fn create(pool: &MySqlPool, data: &CreateArticle) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO article (code, designation, unite, gere_stock)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(&data.code)
        .bind(&data.designation)
        .bind(data.unite.as_deref().unwrap_or("U"))
        .bind(data.gere_stock.unwrap_or(true))
        .execute(pool)
        .await?;

        Self::find_by_code(pool, &data.code)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(
        pool: &MySqlPool,
        code: &str,
        data: &UpdateArticle,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query(
            r#"UPDATE article
               SET designation = COALESCE(?, designation),
                   unite = COALESCE(?, unite),
                   gere_stock = COALESCE(?, gere_stock)
               WHERE code = ?"#,
        )
        .bind(&data.designation)
        .bind(&data.unite)
        .bind(data.gere_stock)
        .bind(code)
        .execute(pool)
        .await?;

        Self::find_by_code(pool, code).await
    }

    pub async fn set_stock<'e, E>(
        executor: E,
        code: &str,
        stock: Decimal,
        pmp: Decimal,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query("UPDATE article SET stock = ?, pmp = ? WHERE code = ?")
            .bind(stock)
            .bind(pmp)
            .bind(code)
            .execute(executor)
            .await?;
        Ok(())
    }
}
