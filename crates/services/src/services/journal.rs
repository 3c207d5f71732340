//! Daily journal closing.
//!
//! Validating a day freezes the parameters of every lot for that day, and
//! when stock management is on, turns them into one movement document per
//! lot: feed and bird exits, egg entries. Everything happens in a single
//! transaction; a failure leaves the day open and the stock untouched.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use db::models::{
    article::Article,
    journee::Journee,
    mise_en_place::MiseEnPlace,
    movement::{Emvt, NatureLigne, NewEmvt, Origine, Sens},
    paramaitre::Paramaitre,
    paramsouche::Paramsouche,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool};
use thiserror::Error;
use tracing::{debug, info, warn};
use ts_rs::TS;

use super::{
    figures::{DayTotals, FiguresError, LotFigures, Valuation, aggregate, compute_lot_figures},
    movement::{PlannedLine, reverse_document, write_document},
    stock::StockError,
};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Stock(#[from] StockError),
    #[error(transparent)]
    Figures(#[from] FiguresError),
    #[error("{0} is in the future")]
    FutureDay(NaiveDate),
    #[error("{0} is already validated")]
    AlreadyValidated(NaiveDate),
    #[error("{jour} cannot be validated: {latest} is already validated")]
    LaterDayValidated { jour: NaiveDate, latest: NaiveDate },
    #[error("{jour}: daily parameters missing for lots {}", .lots.join(", "))]
    MissingParameters { jour: NaiveDate, lots: Vec<String> },
    #[error("{0} is not validated")]
    NotValidated(NaiveDate),
    #[error("only the latest validated day ({latest}) can be reopened, not {jour}")]
    NotLatest { jour: NaiveDate, latest: NaiveDate },
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ValidateDay {
    pub jour: NaiveDate,
    /// Free-text name of whoever closes the day.
    pub utilisateur: Option<String>,
}

/// Figures of a day, validated or not.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DaySummary {
    pub jour: NaiveDate,
    pub valide: bool,
    pub figures: Vec<LotFigures>,
    pub totaux: DayTotals,
    /// Open lots with no parameters recorded for the day.
    pub lots_manquants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DayValidationReport {
    pub jour: NaiveDate,
    pub utilisateur: Option<String>,
    pub figures: Vec<LotFigures>,
    pub totaux: DayTotals,
    /// Ids of the movement documents written.
    #[ts(type = "Array<number>")]
    pub mouvements: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DayReopenReport {
    pub jour: NaiveDate,
    #[ts(type = "Array<number>")]
    pub mouvements_annules: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DayStatus {
    pub jour: NaiveDate,
    pub valide: bool,
    pub date_validation: Option<DateTime<Utc>>,
    pub utilisateur: Option<String>,
    pub lots_attendus: u32,
    pub lots_saisis: u32,
    pub lots_manquants: Vec<String>,
}

/// A lot, its parameters for the day and the resulting figures.
#[derive(Debug, Clone)]
pub(crate) struct LotDay {
    pub lot: MiseEnPlace,
    pub figures: LotFigures,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DaySnapshot {
    pub lots: Vec<LotDay>,
    pub missing: Vec<String>,
}

impl DaySnapshot {
    fn figures(&self) -> Vec<LotFigures> {
        self.lots.iter().map(|l| l.figures.clone()).collect()
    }
}

pub fn check_validation_allowed(
    jour: NaiveDate,
    today: NaiveDate,
    already_validated: bool,
    latest: Option<NaiveDate>,
) -> Result<(), JournalError> {
    if jour > today {
        return Err(JournalError::FutureDay(jour));
    }
    if already_validated {
        return Err(JournalError::AlreadyValidated(jour));
    }
    if let Some(latest) = latest {
        if latest > jour {
            return Err(JournalError::LaterDayValidated { jour, latest });
        }
    }
    Ok(())
}

pub fn check_reopen_allowed(
    jour: NaiveDate,
    validated: bool,
    latest: Option<NaiveDate>,
) -> Result<(), JournalError> {
    if !validated {
        return Err(JournalError::NotValidated(jour));
    }
    if let Some(latest) = latest {
        if latest > jour {
            return Err(JournalError::NotLatest { jour, latest });
        }
    }
    Ok(())
}

/// Open lots with no parameters among `params`.
pub fn missing_parameters(open_lots: &[MiseEnPlace], params: &[Paramsouche]) -> Vec<String> {
    open_lots
        .iter()
        .filter(|lot| !params.iter().any(|p| p.num_mvt == lot.num_mvt))
        .map(|lot| lot.num_mvt.clone())
        .collect()
}

/// Stock lines implied by a lot's day. Zero quantities and unset articles yield no line.
pub fn plan_lot_movements(
    lot: &MiseEnPlace,
    figures: &LotFigures,
    settings: &Paramaitre,
) -> Vec<PlannedLine> {
    let mut lines = Vec::new();
    let mut push = |article: &Option<String>,
                    nature: NatureLigne,
                    sens: Sens,
                    quantite: Decimal,
                    prix_unitaire: Option<Decimal>| {
        if let Some(code) = article {
            if quantite > Decimal::ZERO {
                lines.push(PlannedLine {
                    code_article: code.clone(),
                    nature,
                    sens,
                    quantite,
                    prix_unitaire,
                });
            }
        }
    };

    push(
        &lot.article_aliment,
        NatureLigne::Aliment,
        Sens::Sortie,
        figures.aliment_kg,
        None,
    );
    push(
        &lot.article_sujet,
        NatureLigne::Mortalite,
        Sens::Sortie,
        Decimal::from(figures.mortalite),
        Some(lot.prix_unitaire),
    );
    push(
        &lot.article_sujet,
        NatureLigne::SortieSujets,
        Sens::Sortie,
        Decimal::from(figures.sujets_sortis),
        Some(lot.prix_unitaire),
    );
    push(
        &settings.article_oeuf_commercial,
        NatureLigne::OeufCommercial,
        Sens::Entree,
        Decimal::from(figures.oeufs.commercialisables),
        Some(settings.prix_oeuf_commercial),
    );
    push(
        &settings.article_oeuf_declasse,
        NatureLigne::OeufDeclasse,
        Sens::Entree,
        Decimal::from(figures.oeufs.declasses),
        Some(settings.prix_oeuf_declasse),
    );
    lines
}

/// Splits `lines` into those whose article is in `known` and the codes of the others.
pub fn retain_known_articles(
    lines: Vec<PlannedLine>,
    known: &HashSet<String>,
) -> (Vec<PlannedLine>, Vec<String>) {
    let mut skipped = Vec::new();
    let kept = lines
        .into_iter()
        .filter(|line| {
            let found = known.contains(&line.code_article);
            if !found {
                skipped.push(line.code_article.clone());
            }
            found
        })
        .collect();
    (kept, skipped)
}

/// Loads every lot of `jour` with its figures. With `lock`, feed articles are
/// read `FOR UPDATE` so their PMP cannot move before the day is posted.
pub(crate) async fn load_day(
    conn: &mut MySqlConnection,
    jour: NaiveDate,
    settings: &Paramaitre,
    lock: bool,
) -> Result<DaySnapshot, JournalError> {
    let params = Paramsouche::find_by_day(&mut *conn, jour).await?;
    let open_lots = MiseEnPlace::find_open_on(&mut *conn, jour).await?;
    let missing = missing_parameters(&open_lots, &params);

    let mut lots = Vec::with_capacity(params.len());
    for p in params {
        let lot = match open_lots.iter().find(|l| l.num_mvt == p.num_mvt) {
            Some(lot) => lot.clone(),
            None => MiseEnPlace::find_by_num(&mut *conn, &p.num_mvt)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?,
        };
        let cumul = Paramsouche::cumulative_before(&mut *conn, &lot.num_mvt, jour).await?;
        let pmp_aliment = match &lot.article_aliment {
            Some(code) => {
                let article = if lock {
                    Article::find_for_update(&mut *conn, code).await?
                } else {
                    Article::find_by_code(&mut *conn, code).await?
                };
                article.map(|a| a.pmp).unwrap_or_default()
            }
            None => Decimal::ZERO,
        };
        let figures = compute_lot_figures(
            &lot,
            &p,
            cumul,
            Valuation {
                pmp_aliment,
                prix_oeuf_commercial: settings.prix_oeuf_commercial,
                prix_oeuf_declasse: settings.prix_oeuf_declasse,
            },
        )?;
        lots.push(LotDay { lot, figures });
    }

    Ok(DaySnapshot { lots, missing })
}

pub struct JournalService;

impl JournalService {
    pub async fn list_days(pool: &MySqlPool, limit: i64) -> Result<Vec<Journee>, JournalError> {
        Ok(Journee::find_all(pool, limit).await?)
    }

    pub async fn status(pool: &MySqlPool, jour: NaiveDate) -> Result<DayStatus, JournalError> {
        let journee = Journee::find(pool, jour).await?;
        let params = Paramsouche::find_by_day(pool, jour).await?;
        let open_lots = MiseEnPlace::find_open_on(pool, jour).await?;
        let lots_manquants = missing_parameters(&open_lots, &params);

        Ok(DayStatus {
            jour,
            valide: journee.as_ref().is_some_and(|j| j.valide),
            date_validation: journee.as_ref().map(|j| j.date_validation),
            utilisateur: journee.and_then(|j| j.utilisateur),
            lots_attendus: open_lots.len() as u32,
            lots_saisis: params.len() as u32,
            lots_manquants,
        })
    }

    /// Figures of `jour` as they stand, without writing anything.
    pub async fn preview(pool: &MySqlPool, jour: NaiveDate) -> Result<DaySummary, JournalError> {
        let mut conn = pool.acquire().await?;
        let settings = Paramaitre::get(&mut *conn).await?;
        let valide = Journee::find(&mut *conn, jour)
            .await?
            .is_some_and(|j| j.valide);
        let snapshot = load_day(&mut conn, jour, &settings, false).await?;
        let figures = snapshot.figures();

        Ok(DaySummary {
            jour,
            valide,
            totaux: aggregate(&figures),
            figures,
            lots_manquants: snapshot.missing,
        })
    }

    pub async fn validate_day(
        pool: &MySqlPool,
        request: ValidateDay,
        today: NaiveDate,
    ) -> Result<DayValidationReport, JournalError> {
        let jour = request.jour;
        if jour > today {
            return Err(JournalError::FutureDay(jour));
        }
        let mut tx = pool.begin().await?;
        let settings = Paramaitre::get_for_update(&mut *tx).await?;

        let already = Journee::find(&mut *tx, jour).await?.is_some_and(|j| j.valide);
        let latest = Journee::latest_validated(&mut *tx).await?;
        check_validation_allowed(jour, today, already, latest)?;

        let snapshot = load_day(&mut tx, jour, &settings, true).await?;
        if !snapshot.missing.is_empty() {
            return Err(JournalError::MissingParameters {
                jour,
                lots: snapshot.missing,
            });
        }

        let mut mouvements = Vec::new();
        if settings.gestion_stock {
            let planned: Vec<Vec<PlannedLine>> = snapshot
                .lots
                .iter()
                .map(|l| plan_lot_movements(&l.lot, &l.figures, &settings))
                .collect();
            let mut known = HashSet::new();
            for line in planned.iter().flatten() {
                if !known.contains(&line.code_article)
                    && Article::find_by_code(&mut *tx, &line.code_article)
                        .await?
                        .is_some()
                {
                    known.insert(line.code_article.clone());
                }
            }

            for (lot_day, lines) in snapshot.lots.iter().zip(planned) {
                let (lines, skipped) = retain_known_articles(lines, &known);
                for code in &skipped {
                    warn!(
                        jour = %jour,
                        lot = %lot_day.lot.num_mvt,
                        article = %code,
                        "Unknown article, stock line skipped"
                    );
                }
                if lines.is_empty() {
                    debug!(jour = %jour, lot = %lot_day.lot.num_mvt, "No stock movement for lot");
                    continue;
                }
                let header = NewEmvt {
                    date_mvt: jour,
                    origine: Origine::Journee,
                    num_mvt: Some(lot_day.lot.num_mvt.clone()),
                    code_depot: settings.code_depot.clone(),
                    observation: Some(format!("Journee du {jour}")),
                };
                let document =
                    write_document(&mut tx, &header, &lines, settings.stock_negatif).await?;
                mouvements.push(document.id);
            }
        }

        Paramsouche::mark_validated(&mut *tx, jour, true).await?;
        Journee::mark_validated(&mut *tx, jour, request.utilisateur.as_deref())
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db) = &e {
                    if db.is_unique_violation() {
                        return JournalError::AlreadyValidated(jour);
                    }
                }
                JournalError::Database(e)
            })?;
        tx.commit().await?;

        let mut figures = snapshot.figures();
        for f in &mut figures {
            f.valide = true;
        }
        info!(
            jour = %jour,
            lots = figures.len(),
            mouvements = mouvements.len(),
            utilisateur = request.utilisateur.as_deref().unwrap_or("-"),
            "Day validated"
        );

        Ok(DayValidationReport {
            jour,
            utilisateur: request.utilisateur,
            totaux: aggregate(&figures),
            figures,
            mouvements,
        })
    }

    /// Undoes the validation of the latest validated day.
    pub async fn reopen_day(
        pool: &MySqlPool,
        jour: NaiveDate,
    ) -> Result<DayReopenReport, JournalError> {
        let mut tx = pool.begin().await?;
        let settings = Paramaitre::get_for_update(&mut *tx).await?;

        let validated = Journee::find(&mut *tx, jour).await?.is_some_and(|j| j.valide);
        let latest = Journee::latest_validated(&mut *tx).await?;
        check_reopen_allowed(jour, validated, latest)?;

        let mut mouvements_annules = Vec::new();
        for emvt in Emvt::find_by_origin_and_day(&mut *tx, Origine::Journee, jour).await? {
            reverse_document(&mut tx, emvt.id, settings.stock_negatif).await?;
            mouvements_annules.push(emvt.id);
        }

        Paramsouche::mark_validated(&mut *tx, jour, false).await?;
        Journee::delete(&mut *tx, jour).await?;
        tx.commit().await?;

        info!(jour = %jour, mouvements = mouvements_annules.len(), "Day reopened");
        Ok(DayReopenReport {
            jour,
            mouvements_annules,
        })
    }
}

#[cfg(test)]
mod tests {
    use db::models::{mise_en_place::Espece, paramsouche::CumulativeLosses};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::services::figures::tests::{lot, params};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn settings() -> Paramaitre {
        Paramaitre {
            article_oeuf_commercial: Some("OEUF".to_string()),
            article_oeuf_declasse: Some("OEUFD".to_string()),
            prix_oeuf_commercial: dec!(0.12),
            prix_oeuf_declasse: dec!(0.05),
            ..Default::default()
        }
    }

    #[test]
    fn future_days_cannot_be_validated() {
        let err = check_validation_allowed(day(11), day(10), false, None).unwrap_err();
        assert!(matches!(err, JournalError::FutureDay(d) if d == day(11)));
        assert!(check_validation_allowed(day(10), day(10), false, None).is_ok());
    }

    #[test]
    fn days_are_validated_once_and_in_order() {
        assert!(matches!(
            check_validation_allowed(day(5), day(10), true, Some(day(5))),
            Err(JournalError::AlreadyValidated(_))
        ));
        assert!(matches!(
            check_validation_allowed(day(4), day(10), false, Some(day(5))),
            Err(JournalError::LaterDayValidated { .. })
        ));
        // gaps are allowed
        assert!(check_validation_allowed(day(8), day(10), false, Some(day(5))).is_ok());
    }

    #[test]
    fn only_latest_day_can_be_reopened() {
        assert!(matches!(
            check_reopen_allowed(day(5), false, Some(day(4))),
            Err(JournalError::NotValidated(_))
        ));
        assert!(matches!(
            check_reopen_allowed(day(4), true, Some(day(5))),
            Err(JournalError::NotLatest { .. })
        ));
        assert!(check_reopen_allowed(day(5), true, Some(day(5))).is_ok());
    }

    #[test]
    fn missing_lots_are_listed() {
        let a = lot(Espece::Ponte, 100);
        let mut b = lot(Espece::Chair, 100);
        b.num_mvt = "L002".to_string();
        let recorded = vec![params(day(3))];

        assert_eq!(missing_parameters(&[a, b], &recorded), vec!["L002".to_string()]);
    }

    #[test]
    fn laying_day_plans_feed_losses_and_eggs() {
        let lot = lot(Espece::Ponte, 1000);
        let mut p = params(day(3));
        p.aliment_kg = dec!(110.5);
        p.mortalite = 2;
        p.oeufs_normaux = 800;
        p.oeufs_casses = 12;
        let figures =
            compute_lot_figures(&lot, &p, CumulativeLosses::default(), Valuation::default())
                .unwrap();

        let lines = plan_lot_movements(&lot, &figures, &settings());
        let natures: Vec<NatureLigne> = lines.iter().map(|l| l.nature).collect();
        assert_eq!(
            natures,
            vec![
                NatureLigne::Aliment,
                NatureLigne::Mortalite,
                NatureLigne::OeufCommercial,
                NatureLigne::OeufDeclasse
            ]
        );

        assert_eq!(lines[0].code_article, "ALIM");
        assert_eq!(lines[0].sens, Sens::Sortie);
        assert_eq!(lines[0].quantite, dec!(110.5));
        assert_eq!(lines[0].prix_unitaire, None);

        assert_eq!(lines[1].code_article, "POUS");
        assert_eq!(lines[1].prix_unitaire, Some(dec!(1.50)));

        assert_eq!(lines[2].sens, Sens::Entree);
        assert_eq!(lines[2].quantite, dec!(800));
        assert_eq!(lines[2].prix_unitaire, Some(dec!(0.12)));
        assert_eq!(lines[3].quantite, dec!(12));
    }

    #[test]
    fn unset_articles_produce_no_lines() {
        let mut lot = lot(Espece::Chair, 100);
        lot.article_aliment = None;
        let mut p = params(day(3));
        p.aliment_kg = dec!(10);
        p.sujets_sortis = 5;
        let figures =
            compute_lot_figures(&lot, &p, CumulativeLosses::default(), Valuation::default())
                .unwrap();

        let lines = plan_lot_movements(&lot, &figures, &Paramaitre::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].nature, NatureLigne::SortieSujets);
        assert_eq!(lines[0].quantite, dec!(5));
    }

    #[test]
    fn lines_of_unknown_articles_are_dropped() {
        let lot = lot(Espece::Ponte, 1000);
        let mut p = params(day(3));
        p.aliment_kg = dec!(50);
        p.oeufs_normaux = 700;
        p.oeufs_sales = 3;
        let figures =
            compute_lot_figures(&lot, &p, CumulativeLosses::default(), Valuation::default())
                .unwrap();
        let lines = plan_lot_movements(&lot, &figures, &settings());
        assert_eq!(lines.len(), 3);

        let known: HashSet<String> = ["ALIM", "OEUF"].into_iter().map(String::from).collect();
        let (kept, skipped) = retain_known_articles(lines, &known);
        let codes: Vec<&str> = kept.iter().map(|l| l.code_article.as_str()).collect();
        assert_eq!(codes, vec!["ALIM", "OEUF"]);
        assert_eq!(skipped, vec!["OEUFD".to_string()]);

        let (kept, skipped) = retain_known_articles(kept, &HashSet::new());
        assert!(kept.is_empty());
        assert_eq!(skipped.len(), 2);
    }

    #[test]
    fn missing_parameters_error_names_the_lots() {
        let err = JournalError::MissingParameters {
            jour: day(3),
            lots: vec!["L001".to_string(), "L002".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "2026-03-03: daily parameters missing for lots L001, L002"
        );
    }
}
