use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, MySql, MySqlPool};
use ts_rs::TS;

use super::DateRange;

/// Stock entry document header (bon d'entrée).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Ebe {
    #[ts(type = "number")]
    pub id: i64,
    pub date_bon: NaiveDate,
    pub fournisseur: Option<String>,
    pub code_depot: String,
    pub observation: Option<String>,
    #[ts(type = "string")]
    pub montant_ht: Decimal,
    #[ts(type = "string")]
    pub montant_tva: Decimal,
    #[ts(type = "string")]
    pub montant_ttc: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Stock entry line.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Lbe {
    #[ts(type = "number")]
    pub ebe_id: i64,
    pub num_ligne: i32,
    pub code_article: String,
    #[ts(type = "string")]
    pub quantite: Decimal,
    #[ts(type = "string")]
    pub prix_unitaire: Decimal,
    #[ts(type = "string")]
    pub montant_ht: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct EbeWithLines {
    #[serde(flatten)]
    #[ts(flatten)]
    pub header: Ebe,
    pub lignes: Vec<Lbe>,
}

impl std::ops::Deref for EbeWithLines {
    type Target = Ebe;
    fn deref(&self) -> &Self::Target {
        &self.header
    }
}

/// Header values of a document about to be inserted.
#[derive(Debug, Clone)]
pub struct NewEbe {
    pub date_bon: NaiveDate,
    pub fournisseur: Option<String>,
    pub code_depot: String,
    pub observation: Option<String>,
    pub montant_ht: Decimal,
    pub montant_tva: Decimal,
    pub montant_ttc: Decimal,
}

const SELECT_EBE: &str = r#"SELECT id, date_bon, fournisseur, code_depot, observation,
           montant_ht, montant_tva, montant_ttc, created_at
    FROM ebe"#;

impl Ebe {
    /// Inserts the header and returns its generated id.
    pub async fn create_header<'e, E>(executor: E, data: &NewEbe) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        let result = sqlx::query(
            r#"INSERT INTO ebe (date_bon, fournisseur, code_depot, observation,
                               montant_ht, montant_tva, montant_ttc)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(data.date_bon)
        .bind(&data.fournisseur)
        .bind(&data.code_depot)
        .bind(&data.observation)
        .bind(data.montant_ht)
        .bind(data.montant_tva)
        .bind(data.montant_ttc)
        .execute(executor)
        .await?;
        Ok(result.last_insert_id() as i64)
    }

    pub async fn find_all(pool: &MySqlPool, range: &DateRange) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Ebe>(&format!(
            r#"{SELECT_EBE}
               WHERE (? IS NULL OR date_bon >= ?)
                 AND (? IS NULL OR date_bon <= ?)
               ORDER BY date_bon DESC, id DESC"#
        ))
        .bind(range.du)
        .bind(range.du)
        .bind(range.au)
        .bind(range.au)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, Ebe>(&format!("{SELECT_EBE} WHERE id = ?"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        let result = sqlx::query("DELETE FROM ebe WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

impl Lbe {
    pub async fn create<'e, E>(executor: E, line: &Lbe) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query(
            r#"INSERT INTO lbe (ebe_id, num_ligne, code_article, quantite, prix_unitaire, montant_ht)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(line.ebe_id)
        .bind(line.num_ligne)
        .bind(&line.code_article)
        .bind(line.quantite)
        .bind(line.prix_unitaire)
        .bind(line.montant_ht)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find_by_ebe<'e, E>(executor: E, ebe_id: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, Lbe>(
            r#"SELECT ebe_id, num_ligne, code_article, quantite, prix_unitaire, montant_ht
               FROM lbe
               WHERE ebe_id = ?
               ORDER BY num_ligne ASC"#,
        )
        .bind(ebe_id)
        .fetch_all(executor)
        .await
    }
}
