//! Lot lifecycle: placement, daily parameters, closing.

use chrono::NaiveDate;
use db::models::{
    article::Article,
    batiment::Batiment,
    journee::Journee,
    mise_en_place::{CreateMiseEnPlace, LotStatusFilter, MiseEnPlace, UpdateMiseEnPlace},
    paramsouche::{Paramsouche, SaveParamsouche},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::decimal::MAX_QUANTITY;

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CloseLot {
    pub date_cloture: NaiveDate,
}

pub fn validate_new_lot(data: &CreateMiseEnPlace, batiment: &Batiment) -> Result<(), PlacementError> {
    if data.num_mvt.trim().is_empty() {
        return Err(PlacementError::Validation("num_mvt is required".to_string()));
    }
    if !batiment.actif {
        return Err(PlacementError::Validation(format!(
            "batiment {} is inactive",
            batiment.code
        )));
    }
    check_head_count(data.effectif_initial, batiment)?;
    if data.age_entree.unwrap_or(0) < 0 {
        return Err(PlacementError::Validation(
            "age_entree cannot be negative".to_string(),
        ));
    }
    if data.prix_unitaire < Decimal::ZERO {
        return Err(PlacementError::Validation(
            "prix_unitaire cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn check_head_count(effectif: i32, batiment: &Batiment) -> Result<(), PlacementError> {
    if effectif <= 0 {
        return Err(PlacementError::Validation(
            "effectif_initial must be positive".to_string(),
        ));
    }
    if effectif > batiment.capacite {
        return Err(PlacementError::Validation(format!(
            "effectif_initial {effectif} exceeds the capacity of batiment {} ({})",
            batiment.code, batiment.capacite
        )));
    }
    Ok(())
}

/// Largest value of the `DECIMAL(10, 2)` average weight column.
const MAX_POIDS_MOYEN_G: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Checks a day of parameters against its lot. `existing` is the row already stored for that day.
pub fn validate_daily_params(
    lot: &MiseEnPlace,
    jour: NaiveDate,
    data: &SaveParamsouche,
    existing: Option<&Paramsouche>,
) -> Result<(), PlacementError> {
    if lot.cloture {
        return Err(PlacementError::Conflict(format!(
            "lot {} is closed",
            lot.num_mvt
        )));
    }
    if existing.is_some_and(|p| p.valide) {
        return Err(PlacementError::Conflict(format!(
            "parameters of lot {} for {jour} are validated",
            lot.num_mvt
        )));
    }
    if jour < lot.date_mise_place {
        return Err(PlacementError::Validation(format!(
            "{jour} is before the placement date {}",
            lot.date_mise_place
        )));
    }
    let counts = [
        data.mortalite,
        data.sujets_sortis,
        data.oeufs_normaux,
        data.oeufs_double_jaune,
        data.oeufs_casses,
        data.oeufs_sales,
    ];
    let decimals = [
        Some(data.aliment_kg),
        data.eau_litres,
        data.poids_moyen_g,
    ];
    if counts.iter().any(|c| *c < 0) || decimals.iter().flatten().any(|d| *d < Decimal::ZERO) {
        return Err(PlacementError::Validation(
            "daily parameters cannot be negative".to_string(),
        ));
    }
    if [Some(data.aliment_kg), data.eau_litres].iter().flatten().any(|d| *d > MAX_QUANTITY) {
        return Err(PlacementError::Validation(format!(
            "aliment_kg and eau_litres cannot exceed {MAX_QUANTITY}"
        )));
    }
    if data.poids_moyen_g.is_some_and(|p| p > MAX_POIDS_MOYEN_G) {
        return Err(PlacementError::Validation(format!(
            "poids_moyen_g cannot exceed {MAX_POIDS_MOYEN_G}"
        )));
    }
    Ok(())
}

/// Parameters of a validated day are frozen until the day is reopened.
pub fn check_day_open(jour: NaiveDate, journee: Option<&Journee>) -> Result<(), PlacementError> {
    if journee.is_some_and(|j| j.valide) {
        return Err(PlacementError::Conflict(format!(
            "{jour} is validated; reopen the day first"
        )));
    }
    Ok(())
}

/// A lot cannot start on or before the last validated day.
pub fn check_placement_date(
    date: NaiveDate,
    latest_validated: Option<NaiveDate>,
) -> Result<(), PlacementError> {
    if let Some(latest) = latest_validated {
        if date <= latest {
            return Err(PlacementError::Conflict(format!(
                "placement date {date} is not after the last validated day {latest}"
            )));
        }
    }
    Ok(())
}

async fn check_articles(
    pool: &MySqlPool,
    codes: [&Option<String>; 2],
) -> Result<(), PlacementError> {
    for code in codes.into_iter().flatten() {
        if Article::find_by_code(pool, code).await?.is_none() {
            return Err(PlacementError::Validation(format!("unknown article {code}")));
        }
    }
    Ok(())
}

/// Closing date must not precede the placement nor the last recorded day.
pub fn validate_close(
    lot: &MiseEnPlace,
    date_cloture: NaiveDate,
    last_day: Option<NaiveDate>,
) -> Result<(), PlacementError> {
    if lot.cloture {
        return Err(PlacementError::Conflict(format!(
            "lot {} is already closed",
            lot.num_mvt
        )));
    }
    if date_cloture < lot.date_mise_place {
        return Err(PlacementError::Validation(format!(
            "closing date {date_cloture} is before the placement date {}",
            lot.date_mise_place
        )));
    }
    if let Some(last) = last_day {
        if date_cloture < last {
            return Err(PlacementError::Validation(format!(
                "closing date {date_cloture} is before the last recorded day {last}"
            )));
        }
    }
    Ok(())
}

/// Only a closed lot comes back, and only into a building with no open lot.
pub fn validate_reopen(lot: &MiseEnPlace, batiment_occupied: bool) -> Result<(), PlacementError> {
    if !lot.cloture {
        return Err(PlacementError::Conflict(format!(
            "lot {} is not closed",
            lot.num_mvt
        )));
    }
    if batiment_occupied {
        return Err(PlacementError::Conflict(format!(
            "batiment {} already hosts an open lot",
            lot.code_batiment
        )));
    }
    Ok(())
}

pub struct PlacementService;

impl PlacementService {
    pub async fn list(
        pool: &MySqlPool,
        filter: LotStatusFilter,
    ) -> Result<Vec<MiseEnPlace>, PlacementError> {
        Ok(MiseEnPlace::find_all(pool, filter).await?)
    }

    pub async fn find(pool: &MySqlPool, num_mvt: &str) -> Result<MiseEnPlace, PlacementError> {
        MiseEnPlace::find_by_num(pool, num_mvt)
            .await?
            .ok_or_else(|| PlacementError::NotFound(format!("lot {num_mvt}")))
    }

    pub async fn create(
        pool: &MySqlPool,
        data: &CreateMiseEnPlace,
    ) -> Result<MiseEnPlace, PlacementError> {
        let batiment = Batiment::find_by_code(pool, &data.code_batiment)
            .await?
            .ok_or_else(|| {
                PlacementError::Validation(format!("unknown batiment {}", data.code_batiment))
            })?;
        validate_new_lot(data, &batiment)?;
        check_articles(pool, [&data.article_sujet, &data.article_aliment]).await?;
        check_placement_date(data.date_mise_place, Journee::latest_validated(pool).await?)?;

        if MiseEnPlace::find_by_num(pool, &data.num_mvt).await?.is_some() {
            return Err(PlacementError::Conflict(format!(
                "lot {} already exists",
                data.num_mvt
            )));
        }
        if let Some(open) = MiseEnPlace::find_open_in_batiment(pool, &batiment.code).await? {
            return Err(PlacementError::Conflict(format!(
                "batiment {} already hosts open lot {}",
                batiment.code, open.num_mvt
            )));
        }

        let lot = MiseEnPlace::create(pool, data).await?;
        info!(
            lot = %lot.num_mvt,
            batiment = %lot.code_batiment,
            effectif = lot.effectif_initial,
            "Lot placed"
        );
        Ok(lot)
    }

    pub async fn update(
        pool: &MySqlPool,
        num_mvt: &str,
        data: &UpdateMiseEnPlace,
    ) -> Result<MiseEnPlace, PlacementError> {
        let lot = Self::find(pool, num_mvt).await?;
        let touches_history = data.code_batiment.is_some()
            || data.date_mise_place.is_some()
            || data.effectif_initial.is_some()
            || data.age_entree.is_some();
        if touches_history && Paramsouche::count_validated_for_lot(pool, num_mvt).await? > 0 {
            return Err(PlacementError::Conflict(format!(
                "lot {num_mvt} has validated days; its placement can no longer change"
            )));
        }

        let code_batiment = data.code_batiment.as_deref().unwrap_or(&lot.code_batiment);
        let batiment = Batiment::find_by_code(pool, code_batiment)
            .await?
            .ok_or_else(|| PlacementError::Validation(format!("unknown batiment {code_batiment}")))?;
        if code_batiment != lot.code_batiment && !lot.cloture {
            if let Some(open) = MiseEnPlace::find_open_in_batiment(pool, code_batiment).await? {
                return Err(PlacementError::Conflict(format!(
                    "batiment {code_batiment} already hosts open lot {}",
                    open.num_mvt
                )));
            }
        }
        check_head_count(data.effectif_initial.unwrap_or(lot.effectif_initial), &batiment)?;
        check_articles(pool, [&data.article_sujet, &data.article_aliment]).await?;
        if let Some(date) = data.date_mise_place {
            check_placement_date(date, Journee::latest_validated(pool).await?)?;
            if let Some(first) = Paramsouche::lot_totals(pool, num_mvt).await?.first_day {
                if date > first {
                    return Err(PlacementError::Validation(format!(
                        "placement date {date} is after the first recorded day {first}"
                    )));
                }
            }
        }

        MiseEnPlace::update(pool, num_mvt, data)
            .await?
            .ok_or_else(|| PlacementError::NotFound(format!("lot {num_mvt}")))
    }

    pub async fn close(
        pool: &MySqlPool,
        num_mvt: &str,
        data: &CloseLot,
    ) -> Result<MiseEnPlace, PlacementError> {
        let lot = Self::find(pool, num_mvt).await?;
        let totals = Paramsouche::lot_totals(pool, num_mvt).await?;
        validate_close(&lot, data.date_cloture, totals.last_day)?;

        MiseEnPlace::close(pool, num_mvt, data.date_cloture).await?;
        info!(lot = %num_mvt, date_cloture = %data.date_cloture, "Lot closed");
        Self::find(pool, num_mvt).await
    }

    pub async fn reopen(pool: &MySqlPool, num_mvt: &str) -> Result<MiseEnPlace, PlacementError> {
        let lot = Self::find(pool, num_mvt).await?;
        let occupied = lot.cloture && Batiment::has_open_lot(pool, &lot.code_batiment).await?;
        validate_reopen(&lot, occupied)?;

        MiseEnPlace::reopen(pool, num_mvt).await?;
        info!(lot = %num_mvt, "Lot reopened");
        Self::find(pool, num_mvt).await
    }

    pub async fn delete(pool: &MySqlPool, num_mvt: &str) -> Result<(), PlacementError> {
        Self::find(pool, num_mvt).await?;
        if Paramsouche::count_for_lot(pool, num_mvt).await? > 0 {
            return Err(PlacementError::Conflict(format!(
                "lot {num_mvt} has daily parameters"
            )));
        }
        MiseEnPlace::delete(pool, num_mvt).await?;
        info!(lot = %num_mvt, "Lot deleted");
        Ok(())
    }

    pub async fn daily_params(
        pool: &MySqlPool,
        num_mvt: &str,
    ) -> Result<Vec<Paramsouche>, PlacementError> {
        Self::find(pool, num_mvt).await?;
        Ok(Paramsouche::find_by_lot(pool, num_mvt).await?)
    }

    pub async fn save_daily_params(
        pool: &MySqlPool,
        num_mvt: &str,
        jour: NaiveDate,
        data: &SaveParamsouche,
    ) -> Result<Paramsouche, PlacementError> {
        let mut tx = pool.begin().await?;
        let lot = MiseEnPlace::find_by_num(&mut *tx, num_mvt)
            .await?
            .ok_or_else(|| PlacementError::NotFound(format!("lot {num_mvt}")))?;
        let existing = Paramsouche::find(&mut *tx, num_mvt, jour).await?;
        validate_daily_params(&lot, jour, data, existing.as_ref())?;
        check_day_open(jour, Journee::find(&mut *tx, jour).await?.as_ref())?;

        Paramsouche::upsert(&mut *tx, num_mvt, jour, data).await?;
        let saved = Paramsouche::find(&mut *tx, num_mvt, jour)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        tx.commit().await?;
        Ok(saved)
    }

    pub async fn delete_daily_params(
        pool: &MySqlPool,
        num_mvt: &str,
        jour: NaiveDate,
    ) -> Result<(), PlacementError> {
        let existing = Paramsouche::find(pool, num_mvt, jour)
            .await?
            .ok_or_else(|| PlacementError::NotFound(format!("parameters of lot {num_mvt} for {jour}")))?;
        if existing.valide {
            return Err(PlacementError::Conflict(format!(
                "parameters of lot {num_mvt} for {jour} are validated"
            )));
        }
        check_day_open(jour, Journee::find(pool, jour).await?.as_ref())?;
        Paramsouche::delete(pool, num_mvt, jour).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::models::mise_en_place::Espece;
    use rust_decimal_macros::dec;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn batiment(capacite: i32, actif: bool) -> Batiment {
        Batiment {
            code: "B1".to_string(),
            designation: "Poulailler 1".to_string(),
            capacite,
            actif,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn new_lot(effectif: i32) -> CreateMiseEnPlace {
        CreateMiseEnPlace {
            num_mvt: "L001".to_string(),
            code_batiment: "B1".to_string(),
            espece: Espece::Ponte,
            date_mise_place: day(1),
            age_entree: Some(120),
            effectif_initial: effectif,
            prix_unitaire: dec!(4.20),
            article_sujet: None,
            article_aliment: None,
            observation: None,
        }
    }

    fn lot() -> MiseEnPlace {
        MiseEnPlace {
            num_mvt: "L001".to_string(),
            code_batiment: "B1".to_string(),
            espece: Espece::Ponte,
            date_mise_place: day(5),
            age_entree: 120,
            effectif_initial: 1000,
            prix_unitaire: dec!(4.20),
            article_sujet: None,
            article_aliment: None,
            cloture: false,
            date_cloture: None,
            observation: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn head_count_must_fit_the_building() {
        assert!(validate_new_lot(&new_lot(5000), &batiment(5000, true)).is_ok());
        assert!(validate_new_lot(&new_lot(5001), &batiment(5000, true)).is_err());
        assert!(validate_new_lot(&new_lot(0), &batiment(5000, true)).is_err());
    }

    #[test]
    fn inactive_building_cannot_receive_a_lot() {
        let err = validate_new_lot(&new_lot(10), &batiment(5000, false)).unwrap_err();
        assert!(matches!(err, PlacementError::Validation(msg) if msg.contains("inactive")));
    }

    #[test]
    fn params_refused_before_placement_or_when_validated() {
        let lot = lot();
        let data = SaveParamsouche::default();
        assert!(matches!(
            validate_daily_params(&lot, day(4), &data, None),
            Err(PlacementError::Validation(_))
        ));
        assert!(validate_daily_params(&lot, day(5), &data, None).is_ok());

        let validated = Paramsouche {
            num_mvt: "L001".to_string(),
            jour: day(6),
            mortalite: 0,
            sujets_sortis: 0,
            aliment_kg: Decimal::ZERO,
            eau_litres: None,
            poids_moyen_g: None,
            oeufs_normaux: 0,
            oeufs_double_jaune: 0,
            oeufs_casses: 0,
            oeufs_sales: 0,
            valide: true,
        };
        assert!(matches!(
            validate_daily_params(&lot, day(6), &data, Some(&validated)),
            Err(PlacementError::Conflict(_))
        ));
    }

    #[test]
    fn params_refused_on_closed_lot_and_negative_values() {
        let mut closed = lot();
        closed.cloture = true;
        assert!(matches!(
            validate_daily_params(&closed, day(6), &SaveParamsouche::default(), None),
            Err(PlacementError::Conflict(_))
        ));

        let data = SaveParamsouche {
            eau_litres: Some(dec!(-1)),
            ..Default::default()
        };
        assert!(validate_daily_params(&lot(), day(6), &data, None).is_err());
    }

    #[test]
    fn closing_date_bounds() {
        let lot = lot();
        assert!(validate_close(&lot, day(4), None).is_err());
        assert!(validate_close(&lot, day(9), Some(day(10))).is_err());
        assert!(validate_close(&lot, day(10), Some(day(10))).is_ok());
    }

    #[test]
    fn validated_day_is_frozen() {
        let journee = Journee {
            jour: day(6),
            valide: true,
            date_validation: Utc::now(),
            utilisateur: None,
        };
        assert!(check_day_open(day(7), None).is_ok());
        assert!(matches!(
            check_day_open(day(6), Some(&journee)),
            Err(PlacementError::Conflict(msg)) if msg.contains("reopen")
        ));

        let pending = Journee {
            valide: false,
            ..journee
        };
        assert!(check_day_open(day(6), Some(&pending)).is_ok());
    }

    #[test]
    fn placement_must_follow_the_last_validated_day() {
        assert!(check_placement_date(day(1), None).is_ok());
        assert!(check_placement_date(day(11), Some(day(10))).is_ok());
        assert!(matches!(
            check_placement_date(day(10), Some(day(10))),
            Err(PlacementError::Conflict(_))
        ));
        assert!(check_placement_date(day(3), Some(day(10))).is_err());
    }

    #[test]
    fn params_are_bounded_by_their_columns() {
        let huge = Decimal::from_i128_with_scale(10_i128.pow(20), 0);
        let feed = SaveParamsouche {
            aliment_kg: huge,
            ..Default::default()
        };
        assert!(validate_daily_params(&lot(), day(6), &feed, None).is_err());

        let weight = SaveParamsouche {
            poids_moyen_g: Some(dec!(100000000)),
            ..Default::default()
        };
        assert!(validate_daily_params(&lot(), day(6), &weight, None).is_err());

        let fits = SaveParamsouche {
            aliment_kg: MAX_QUANTITY,
            poids_moyen_g: Some(dec!(99999999.99)),
            ..Default::default()
        };
        assert!(validate_daily_params(&lot(), day(6), &fits, None).is_ok());
    }

    #[test]
    fn reopen_needs_a_closed_lot_and_a_free_building() {
        let mut closed = lot();
        closed.cloture = true;
        closed.date_cloture = Some(day(20));
        assert!(validate_reopen(&closed, false).is_ok());
        assert!(matches!(
            validate_reopen(&closed, true),
            Err(PlacementError::Conflict(msg)) if msg.contains("B1")
        ));
        assert!(matches!(
            validate_reopen(&lot(), false),
            Err(PlacementError::Conflict(msg)) if msg.contains("not closed")
        ));
    }
}
