use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, MySql, MySqlPool};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use super::varchar_enum;

/// Where a movement document comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Origine {
    /// Generated by a day validation; removed only by reopening that day.
    Journee,
    Manuel,
}

varchar_enum!(Origine);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sens {
    Entree,
    Sortie,
}

varchar_enum!(Sens);

/// What a movement line accounts for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NatureLigne {
    Aliment,
    Mortalite,
    SortieSujets,
    OeufCommercial,
    OeufDeclasse,
    Ajustement,
}

varchar_enum!(NatureLigne);

/// Movement document header.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Emvt {
    #[ts(type = "number")]
    pub id: i64,
    pub date_mvt: NaiveDate,
    #[sqlx(try_from = "String")]
    pub origine: Origine,
    /// Lot the document belongs to, for journal documents.
    pub num_mvt: Option<String>,
    pub code_depot: String,
    pub observation: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Movement line.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Lmvt {
    #[ts(type = "number")]
    pub emvt_id: i64,
    pub num_ligne: i32,
    pub code_article: String,
    #[sqlx(try_from = "String")]
    pub nature: NatureLigne,
    #[sqlx(try_from = "String")]
    pub sens: Sens,
    #[ts(type = "string")]
    pub quantite: Decimal,
    #[ts(type = "string")]
    pub prix_unitaire: Decimal,
    #[ts(type = "string")]
    pub montant: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct EmvtWithLines {
    #[serde(flatten)]
    #[ts(flatten)]
    pub header: Emvt,
    pub lignes: Vec<Lmvt>,
}

impl std::ops::Deref for EmvtWithLines {
    type Target = Emvt;
    fn deref(&self) -> &Self::Target {
        &self.header
    }
}

#[derive(Debug, Clone)]
pub struct NewEmvt {
    pub date_mvt: NaiveDate,
    pub origine: Origine,
    pub num_mvt: Option<String>,
    pub code_depot: String,
    pub observation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct MovementFilter {
    pub du: Option<NaiveDate>,
    pub au: Option<NaiveDate>,
    pub num_mvt: Option<String>,
    pub origine: Option<Origine>,
}

const SELECT_EMVT: &str = r#"SELECT id, date_mvt, origine, num_mvt, code_depot, observation, created_at
    FROM emvt"#;

const SELECT_LMVT: &str = r#"SELECT emvt_id, num_ligne, code_article, nature, sens,
           quantite, prix_unitaire, montant
    FROM lmvt"#;

impl Emvt {
    pub async fn create_header<'e, E>(executor: E, data: &NewEmvt) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        let result = sqlx::query(
            r#"INSERT INTO emvt (date_mvt, origine, num_mvt, code_depot, observation)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(data.date_mvt)
        .bind(data.origine.to_string())
        .bind(&data.num_mvt)
        .bind(&data.code_depot)
        .bind(&data.observation)
        .execute(executor)
        .await?;
        Ok(result.last_insert_id() as i64)
    }

    pub async fn find_all(
        pool: &MySqlPool,
        filter: &MovementFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let origine = filter.origine.map(|o| o.to_string());
        sqlx::query_as::<_, Emvt>(&format!(
            r#"{SELECT_EMVT}
               WHERE (? IS NULL OR date_mvt >= ?)
                 AND (? IS NULL OR date_mvt <= ?)
                 AND (? IS NULL OR num_mvt = ?)
                 AND (? IS NULL OR origine = ?)
               ORDER BY date_mvt DESC, id DESC"#
        ))
        .bind(filter.du)
        .bind(filter.du)
        .bind(filter.au)
        .bind(filter.au)
        .bind(&filter.num_mvt)
        .bind(&filter.num_mvt)
        .bind(&origine)
        .bind(&origine)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, Emvt>(&format!("{SELECT_EMVT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_origin_and_day<'e, E>(
        executor: E,
        origine: Origine,
        jour: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, Emvt>(&format!(
            "{SELECT_EMVT} WHERE origine = ? AND date_mvt = ? ORDER BY id ASC"
        ))
        .bind(origine.to_string())
        .bind(jour)
        .fetch_all(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        let result = sqlx::query("DELETE FROM emvt WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

impl Lmvt {
    pub async fn create<'e, E>(executor: E, line: &Lmvt) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query(
            r#"INSERT INTO lmvt (emvt_id, num_ligne, code_article, nature, sens,
                                quantite, prix_unitaire, montant)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(line.emvt_id)
        .bind(line.num_ligne)
        .bind(&line.code_article)
        .bind(line.nature.to_string())
        .bind(line.sens.to_string())
        .bind(line.quantite)
        .bind(line.prix_unitaire)
        .bind(line.montant)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find_by_emvt<'e, E>(executor: E, emvt_id: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, Lmvt>(&format!(
            "{SELECT_LMVT} WHERE emvt_id = ? ORDER BY num_ligne ASC"
        ))
        .bind(emvt_id)
        .fetch_all(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_nature_uses_snake_case_codes() {
        assert_eq!(NatureLigne::SortieSujets.to_string(), "sortie_sujets");
        assert_eq!(
            NatureLigne::try_from("oeuf_declasse".to_string()).unwrap(),
            NatureLigne::OeufDeclasse
        );
        let json = serde_json::to_string(&NatureLigne::OeufCommercial).unwrap();
        assert_eq!(json, "\"oeuf_commercial\"");
    }

    #[test]
    fn unknown_origin_is_rejected() {
        assert!(Origine::try_from("import".to_string()).is_err());
        assert_eq!(Origine::try_from("journee".to_string()).unwrap(), Origine::Journee);
    }
}
