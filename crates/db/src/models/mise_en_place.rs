use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, MySql, MySqlPool};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use super::varchar_enum;

/// Production type of a flock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Espece {
    /// Laying hens: daily egg counts are expected.
    Ponte,
    /// Broilers: no eggs.
    Chair,
}

varchar_enum!(Espece);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
pub enum LotStatusFilter {
    #[default]
    Ouvert,
    Cloture,
    Tous,
}

/// A placed flock (lot), identified by its movement number.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MiseEnPlace {
    pub num_mvt: String,
    pub code_batiment: String,
    #[sqlx(try_from = "String")]
    pub espece: Espece,
    pub date_mise_place: NaiveDate,
    /// Age of the birds in days on the placement date.
    pub age_entree: i32,
    pub effectif_initial: i32,
    /// Purchase cost of one bird.
    #[ts(type = "string")]
    pub prix_unitaire: Decimal,
    pub article_sujet: Option<String>,
    pub article_aliment: Option<String>,
    pub cloture: bool,
    pub date_cloture: Option<NaiveDate>,
    pub observation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateMiseEnPlace {
    pub num_mvt: String,
    pub code_batiment: String,
    pub espece: Espece,
    pub date_mise_place: NaiveDate,
    pub age_entree: Option<i32>,
    pub effectif_initial: i32,
    #[ts(type = "string")]
    pub prix_unitaire: Decimal,
    pub article_sujet: Option<String>,
    pub article_aliment: Option<String>,
    pub observation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateMiseEnPlace {
    pub code_batiment: Option<String>,
    pub date_mise_place: Option<NaiveDate>,
    pub age_entree: Option<i32>,
    pub effectif_initial: Option<i32>,
    #[ts(type = "string | null")]
    pub prix_unitaire: Option<Decimal>,
    pub article_sujet: Option<String>,
    pub article_aliment: Option<String>,
    pub observation: Option<String>,
}

const SELECT_MISE_EN_PLACE: &str = r#"SELECT num_mvt, code_batiment, espece, date_mise_place, age_entree,
           effectif_initial, prix_unitaire, article_sujet, article_aliment,
           cloture, date_cloture, observation, created_at, updated_at
    FROM miseplace"#;

impl MiseEnPlace {
    /// Age in days on `jour`, counting the age at placement.
    pub fn age_on(&self, jour: NaiveDate) -> i64 {
        (jour - self.date_mise_place).num_days() + i64::from(self.age_entree)
    }

    pub async fn find_all(
        pool: &MySqlPool,
        filter: LotStatusFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let clause = match filter {
            LotStatusFilter::Ouvert => "WHERE cloture = 0",
            LotStatusFilter::Cloture => "WHERE cloture = 1",
            LotStatusFilter::Tous => "",
        };
        sqlx::query_as::<_, MiseEnPlace>(&format!(
            "{SELECT_MISE_EN_PLACE} {clause} ORDER BY date_mise_place DESC, num_mvt ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_num<'e, E>(executor: E, num_mvt: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, MiseEnPlace>(&format!("{SELECT_MISE_EN_PLACE} WHERE num_mvt = ?"))
            .bind(num_mvt)
            .fetch_optional(executor)
            .await
    }

    /// Open lots already placed on `jour`: the lots a day validation covers.
    pub async fn find_open_on<'e, E>(executor: E, jour: NaiveDate) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, MiseEnPlace>(&format!(
            "{SELECT_MISE_EN_PLACE} WHERE cloture = 0 AND date_mise_place <= ? ORDER BY num_mvt ASC"
        ))
        .bind(jour)
        .fetch_all(executor)
        .await
    }

    pub async fn find_open_in_batiment(
        pool: &MySqlPool,
        code_batiment: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MiseEnPlace>(&format!(
            "{SELECT_MISE_EN_PLACE} WHERE code_batiment = ? AND cloture = 0 LIMIT 1"
        ))
        .bind(code_batiment)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(pool: &MySqlPool, data: &CreateMiseEnPlace) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO miseplace (num_mvt, code_batiment, espece, date_mise_place, age_entree,
                                     effectif_initial, prix_unitaire, article_sujet,
                                     article_aliment, observation)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&data.num_mvt)
        .bind(&data.code_batiment)
        .bind(data.espece.to_string())
        .bind(data.date_mise_place)
        .bind(data.age_entree.unwrap_or(0))
        .bind(data.effectif_initial)
        .bind(data.prix_unitaire)
        .bind(&data.article_sujet)
        .bind(&data.article_aliment)
        .bind(&data.observation)
        .execute(pool)
        .await?;

        Self::find_by_num(pool, &data.num_mvt)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update(
        pool: &MySqlPool,
        num_mvt: &str,
        data: &UpdateMiseEnPlace,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query(
            r#"UPDATE miseplace
               SET code_batiment = COALESCE(?, code_batiment),
                   date_mise_place = COALESCE(?, date_mise_place),
                   age_entree = COALESCE(?, age_entree),
                   effectif_initial = COALESCE(?, effectif_initial),
                   prix_unitaire = COALESCE(?, prix_unitaire),
                   article_sujet = COALESCE(?, article_sujet),
                   article_aliment = COALESCE(?, article_aliment),
                   observation = COALESCE(?, observation)
               WHERE num_mvt = ?"#,
        )
        .bind(&data.code_batiment)
        .bind(data.date_mise_place)
        .bind(data.age_entree)
        .bind(data.effectif_initial)
        .bind(data.prix_unitaire)
        .bind(&data.article_sujet)
        .bind(&data.article_aliment)
        .bind(&data.observation)
        .bind(num_mvt)
        .execute(pool)
        .await?;

        Self::find_by_num(pool, num_mvt).await
    }

    pub async fn close(
        pool: &MySqlPool,
        num_mvt: &str,
        date_cloture: NaiveDate,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE miseplace SET cloture = 1, date_cloture = ? WHERE num_mvt = ?")
            .bind(date_cloture)
            .bind(num_mvt)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn reopen(pool: &MySqlPool, num_mvt: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE miseplace SET cloture = 0, date_cloture = NULL WHERE num_mvt = ?")
            .bind(num_mvt)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &MySqlPool, num_mvt: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM miseplace WHERE num_mvt = ?")
            .bind(num_mvt)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn espece_round_trips_through_varchar() {
        assert_eq!(Espece::Ponte.to_string(), "ponte");
        assert_eq!(Espece::try_from("chair".to_string()).unwrap(), Espece::Chair);
        assert!(Espece::try_from("dinde".to_string()).is_err());
    }

    #[test]
    fn status_filter_defaults_to_open_lots() {
        assert_eq!(LotStatusFilter::default(), LotStatusFilter::Ouvert);
        let parsed: LotStatusFilter = serde_json::from_str("\"tous\"").unwrap();
        assert_eq!(parsed, LotStatusFilter::Tous);
    }
}
