use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, MySql, MySqlPool};
use ts_rs::TS;

/// Company-wide settings. The table holds a single row with `id = 1`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Paramaitre {
    pub id: i32,
    pub raison_sociale: String,
    /// VAT rate in percent, applied to stock entries.
    #[ts(type = "string")]
    pub taux_tva: Decimal,
    /// When off, validating a day computes figures but writes no movement.
    pub gestion_stock: bool,
    /// Allows exits that drive a stocked article below zero.
    pub stock_negatif: bool,
    pub code_depot: String,
    pub article_oeuf_commercial: Option<String>,
    pub article_oeuf_declasse: Option<String>,
    #[ts(type = "string")]
    pub prix_oeuf_commercial: Decimal,
    #[ts(type = "string")]
    pub prix_oeuf_declasse: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateParamaitre {
    pub raison_sociale: String,
    #[ts(type = "string")]
    pub taux_tva: Decimal,
    pub gestion_stock: bool,
    pub stock_negatif: bool,
    pub code_depot: String,
    pub article_oeuf_commercial: Option<String>,
    pub article_oeuf_declasse: Option<String>,
    #[ts(type = "string")]
    pub prix_oeuf_commercial: Decimal,
    #[ts(type = "string")]
    pub prix_oeuf_declasse: Decimal,
}

const PARAMAITRE_ID: i32 = 1;

impl Default for Paramaitre {
    fn default() -> Self {
        Self {
            id: PARAMAITRE_ID,
            raison_sociale: String::new(),
            taux_tva: Decimal::ZERO,
            gestion_stock: true,
            stock_negatif: false,
            code_depot: "DEP01".to_string(),
            article_oeuf_commercial: None,
            article_oeuf_declasse: None,
            prix_oeuf_commercial: Decimal::ZERO,
            prix_oeuf_declasse: Decimal::ZERO,
            updated_at: Utc::now(),
        }
    }
}

const SELECT_PARAMAITRE: &str = r#"SELECT id, raison_sociale, taux_tva, gestion_stock, stock_negatif, code_depot,
           article_oeuf_commercial, article_oeuf_declasse,
           prix_oeuf_commercial, prix_oeuf_declasse, updated_at
    FROM paramaitre"#;

fn settings_query(lock: bool) -> String {
    let suffix = if lock { " FOR UPDATE" } else { "" };
    format!("{SELECT_PARAMAITRE} WHERE id = ?{suffix}")
}

impl Paramaitre {
    /// Loads the settings row, falling back to defaults on an empty table.
    pub async fn get<'e, E>(executor: E) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        let row = sqlx::query_as::<_, Paramaitre>(&settings_query(false))
            .bind(PARAMAITRE_ID)
            .fetch_optional(executor)
            .await?;

        Ok(row.unwrap_or_default())
    }

    /// Same as [`Paramaitre::get`], holding a lock on the settings row until the
    /// transaction ends. Day validation and reopening take it first, so they
    /// run one at a time. The row is seeded by the initial migration.
    pub async fn get_for_update<'e, E>(executor: E) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        let row = sqlx::query_as::<_, Paramaitre>(&settings_query(true))
            .bind(PARAMAITRE_ID)
            .fetch_optional(executor)
            .await?;

        Ok(row.unwrap_or_default())
    }

    pub async fn upsert(pool: &MySqlPool, data: &UpdateParamaitre) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO paramaitre (id, raison_sociale, taux_tva, gestion_stock, stock_negatif,
                                      code_depot, article_oeuf_commercial, article_oeuf_declasse,
                                      prix_oeuf_commercial, prix_oeuf_declasse)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON DUPLICATE KEY UPDATE
                   raison_sociale = VALUES(raison_sociale),
                   taux_tva = VALUES(taux_tva),
                   gestion_stock = VALUES(gestion_stock),
                   stock_negatif = VALUES(stock_negatif),
                   code_depot = VALUES(code_depot),
                   article_oeuf_commercial = VALUES(article_oeuf_commercial),
                   article_oeuf_declasse = VALUES(article_oeuf_declasse),
                   prix_oeuf_commercial = VALUES(prix_oeuf_commercial),
                   prix_oeuf_declasse = VALUES(prix_oeuf_declasse)"#,
        )
        .bind(PARAMAITRE_ID)
        .bind(&data.raison_sociale)
        .bind(data.taux_tva)
        .bind(data.gestion_stock)
        .bind(data.stock_negatif)
        .bind(&data.code_depot)
        .bind(&data.article_oeuf_commercial)
        .bind(&data.article_oeuf_declasse)
        .bind(data.prix_oeuf_commercial)
        .bind(data.prix_oeuf_declasse)
        .execute(pool)
        .await?;

        Self::get(pool).await
    }
}
