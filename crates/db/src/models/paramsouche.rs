use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, MySql};
use ts_rs::TS;

/// Daily production parameters of one lot.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Paramsouche {
    pub num_mvt: String,
    pub jour: NaiveDate,
    pub mortalite: i32,
    /// Birds removed alive (culled, sold).
    pub sujets_sortis: i32,
    #[ts(type = "string")]
    pub aliment_kg: Decimal,
    #[ts(type = "string | null")]
    pub eau_litres: Option<Decimal>,
    #[ts(type = "string | null")]
    pub poids_moyen_g: Option<Decimal>,
    pub oeufs_normaux: i32,
    pub oeufs_double_jaune: i32,
    pub oeufs_casses: i32,
    pub oeufs_sales: i32,
    /// Set once the day has been validated; the row is then read-only.
    pub valide: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct SaveParamsouche {
    pub mortalite: i32,
    pub sujets_sortis: i32,
    #[ts(type = "string")]
    pub aliment_kg: Decimal,
    #[ts(type = "string | null")]
    pub eau_litres: Option<Decimal>,
    #[ts(type = "string | null")]
    pub poids_moyen_g: Option<Decimal>,
    pub oeufs_normaux: i32,
    pub oeufs_double_jaune: i32,
    pub oeufs_casses: i32,
    pub oeufs_sales: i32,
}

/// Losses recorded for a lot before a given day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize, TS)]
pub struct CumulativeLosses {
    #[ts(type = "number")]
    pub mortalite: i64,
    #[ts(type = "number")]
    pub sujets_sortis: i64,
}

/// Sums over every recorded day of a lot.
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize, TS)]
pub struct LotTotals {
    #[ts(type = "number")]
    pub jours: i64,
    #[ts(type = "number")]
    pub mortalite: i64,
    #[ts(type = "number")]
    pub sujets_sortis: i64,
    #[ts(type = "string")]
    pub aliment_kg: Decimal,
    #[ts(type = "number")]
    pub oeufs: i64,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
}

const SELECT_PARAMSOUCHE: &str = r#"SELECT num_mvt, jour, mortalite, sujets_sortis, aliment_kg, eau_litres,
           poids_moyen_g, oeufs_normaux, oeufs_double_jaune, oeufs_casses, oeufs_sales, valide
    FROM paramsouche"#;

impl Paramsouche {
    /// Normal and double-yolk eggs.
    pub fn oeufs_commercialisables(&self) -> i64 {
        i64::from(self.oeufs_normaux) + i64::from(self.oeufs_double_jaune)
    }

    /// Cracked and dirty eggs.
    pub fn oeufs_declasses(&self) -> i64 {
        i64::from(self.oeufs_casses) + i64::from(self.oeufs_sales)
    }

    pub fn total_oeufs(&self) -> i64 {
        self.oeufs_commercialisables() + self.oeufs_declasses()
    }

    pub async fn find_by_lot<'e, E>(executor: E, num_mvt: &str) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, Paramsouche>(&format!(
            "{SELECT_PARAMSOUCHE} WHERE num_mvt = ? ORDER BY jour ASC"
        ))
        .bind(num_mvt)
        .fetch_all(executor)
        .await
    }

    pub async fn find<'e, E>(
        executor: E,
        num_mvt: &str,
        jour: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, Paramsouche>(&format!(
            "{SELECT_PARAMSOUCHE} WHERE num_mvt = ? AND jour = ?"
        ))
        .bind(num_mvt)
        .bind(jour)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_day<'e, E>(executor: E, jour: NaiveDate) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, Paramsouche>(&format!(
            "{SELECT_PARAMSOUCHE} WHERE jour = ? ORDER BY num_mvt ASC"
        ))
        .bind(jour)
        .fetch_all(executor)
        .await
    }

    /// Inserts or replaces the parameters of `(num_mvt, jour)`. The row stays unvalidated.
    pub async fn upsert<'e, E>(
        executor: E,
        num_mvt: &str,
        jour: NaiveDate,
        data: &SaveParamsouche,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query(
            r#"INSERT INTO paramsouche (num_mvt, jour, mortalite, sujets_sortis, aliment_kg,
                                       eau_litres, poids_moyen_g, oeufs_normaux,
                                       oeufs_double_jaune, oeufs_casses, oeufs_sales, valide)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
               ON DUPLICATE KEY UPDATE
                   mortalite = VALUES(mortalite),
                   sujets_sortis = VALUES(sujets_sortis),
                   aliment_kg = VALUES(aliment_kg),
                   eau_litres = VALUES(eau_litres),
                   poids_moyen_g = VALUES(poids_moyen_g),
                   oeufs_normaux = VALUES(oeufs_normaux),
                   oeufs_double_jaune = VALUES(oeufs_double_jaune),
                   oeufs_casses = VALUES(oeufs_casses),
                   oeufs_sales = VALUES(oeufs_sales)"#,
        )
        .bind(num_mvt)
        .bind(jour)
        .bind(data.mortalite)
        .bind(data.sujets_sortis)
        .bind(data.aliment_kg)
        .bind(data.eau_litres)
        .bind(data.poids_moyen_g)
        .bind(data.oeufs_normaux)
        .bind(data.oeufs_double_jaune)
        .bind(data.oeufs_casses)
        .bind(data.oeufs_sales)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, num_mvt: &str, jour: NaiveDate) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        let result = sqlx::query("DELETE FROM paramsouche WHERE num_mvt = ? AND jour = ?")
            .bind(num_mvt)
            .bind(jour)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Flags every row of `jour`.
    pub async fn mark_validated<'e, E>(
        executor: E,
        jour: NaiveDate,
        valide: bool,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        let result = sqlx::query("UPDATE paramsouche SET valide = ? WHERE jour = ?")
            .bind(valide)
            .bind(jour)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn cumulative_before<'e, E>(
        executor: E,
        num_mvt: &str,
        jour: NaiveDate,
    ) -> Result<CumulativeLosses, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, CumulativeLosses>(
            r#"SELECT CAST(COALESCE(SUM(mortalite), 0) AS SIGNED) AS mortalite,
                      CAST(COALESCE(SUM(sujets_sortis), 0) AS SIGNED) AS sujets_sortis
               FROM paramsouche
               WHERE num_mvt = ? AND jour < ?"#,
        )
        .bind(num_mvt)
        .bind(jour)
        .fetch_one(executor)
        .await
    }

    pub async fn lot_totals<'e, E>(executor: E, num_mvt: &str) -> Result<LotTotals, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_as::<_, LotTotals>(
            r#"SELECT COUNT(*) AS jours,
                      CAST(COALESCE(SUM(mortalite), 0) AS SIGNED) AS mortalite,
                      CAST(COALESCE(SUM(sujets_sortis), 0) AS SIGNED) AS sujets_sortis,
                      CAST(COALESCE(SUM(aliment_kg), 0) AS DECIMAL(18, 3)) AS aliment_kg,
                      CAST(COALESCE(SUM(oeufs_normaux + oeufs_double_jaune + oeufs_casses + oeufs_sales), 0)
                           AS SIGNED) AS oeufs,
                      MIN(jour) AS first_day,
                      MAX(jour) AS last_day
               FROM paramsouche
               WHERE num_mvt = ?"#,
        )
        .bind(num_mvt)
        .fetch_one(executor)
        .await
    }

    /// Number of validated days recorded for a lot.
    pub async fn count_validated_for_lot<'e, E>(executor: E, num_mvt: &str) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM paramsouche WHERE num_mvt = ? AND valide = 1",
        )
        .bind(num_mvt)
        .fetch_one(executor)
        .await
    }

    pub async fn count_for_lot<'e, E>(executor: E, num_mvt: &str) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = MySql>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM paramsouche WHERE num_mvt = ?")
            .bind(num_mvt)
            .fetch_one(executor)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_payload_defaults_missing_counts_to_zero() {
        let data: SaveParamsouche =
            serde_json::from_str(r#"{"mortalite": 3, "aliment_kg": "120.5"}"#).unwrap();
        assert_eq!(data.mortalite, 3);
        assert_eq!(data.oeufs_normaux, 0);
        assert_eq!(data.aliment_kg, Decimal::new(1205, 1));
        assert!(data.eau_litres.is_none());
    }

    #[test]
    fn egg_totals_widen_before_summing() {
        let params = Paramsouche {
            num_mvt: "L001".to_string(),
            jour: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            mortalite: 0,
            sujets_sortis: 0,
            aliment_kg: Decimal::ZERO,
            eau_litres: None,
            poids_moyen_g: None,
            oeufs_normaux: i32::MAX,
            oeufs_double_jaune: i32::MAX,
            oeufs_casses: 1,
            oeufs_sales: i32::MAX,
            valide: false,
        };
        assert_eq!(params.oeufs_commercialisables(), 2 * i64::from(i32::MAX));
        assert_eq!(params.oeufs_declasses(), i64::from(i32::MAX) + 1);
        assert_eq!(params.total_oeufs(), 3 * i64::from(i32::MAX) + 1);
    }
}
