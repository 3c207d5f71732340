//! Production and valuation figures of a lot for one day.
//!
//! Everything here is pure: callers load the lot, its parameters and the
//! cumulative losses, then feed them in.

use chrono::NaiveDate;
use db::models::{
    mise_en_place::{Espece, MiseEnPlace},
    paramsouche::{CumulativeLosses, Paramsouche},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utils::decimal::{checked_amount, percent, round_money, round_qty};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FiguresError {
    #[error("lot {num_mvt}: {jour} is before the placement date {date_mise_place}")]
    BeforePlacement {
        num_mvt: String,
        jour: NaiveDate,
        date_mise_place: NaiveDate,
    },
    #[error("lot {num_mvt}: losses exceed head count ({pertes} lost, {effectif} alive)")]
    LossesExceedHeadCount {
        num_mvt: String,
        pertes: i64,
        effectif: i64,
    },
    #[error("lot {num_mvt} is a broiler flock and cannot record eggs")]
    EggsOnBroilers { num_mvt: String },
    #[error("lot {num_mvt}: {field} cannot be negative")]
    NegativeValue { num_mvt: String, field: &'static str },
    #[error("lot {num_mvt}: {field} is out of range")]
    OutOfRange { num_mvt: String, field: &'static str },
}

/// Unit prices used to value a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Valuation {
    /// Current PMP of the lot's feed article.
    pub pmp_aliment: Decimal,
    pub prix_oeuf_commercial: Decimal,
    pub prix_oeuf_declasse: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct EggSplit {
    #[ts(type = "number")]
    pub total: i64,
    /// Normal and double-yolk eggs.
    #[ts(type = "number")]
    pub commercialisables: i64,
    /// Cracked and dirty eggs.
    #[ts(type = "number")]
    pub declasses: i64,
    #[ts(type = "string")]
    pub taux_ponte: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct LotFigures {
    pub num_mvt: String,
    pub code_batiment: String,
    pub espece: Espece,
    pub jour: NaiveDate,
    #[ts(type = "number")]
    pub age_jours: i64,
    #[ts(type = "number")]
    pub effectif_debut: i64,
    pub mortalite: i32,
    pub sujets_sortis: i32,
    #[ts(type = "number")]
    pub effectif_fin: i64,
    #[ts(type = "string")]
    pub taux_mortalite: Decimal,
    #[ts(type = "string")]
    pub taux_mortalite_cumule: Decimal,
    #[ts(type = "string")]
    pub aliment_kg: Decimal,
    /// Feed per live bird, in grams.
    #[ts(type = "string")]
    pub consommation_g_sujet: Decimal,
    #[ts(type = "string | null")]
    pub poids_moyen_g: Option<Decimal>,
    #[ts(type = "string | null")]
    pub eau_litres: Option<Decimal>,
    pub oeufs: EggSplit,
    #[ts(type = "string")]
    pub valeur_mortalite: Decimal,
    #[ts(type = "string")]
    pub cout_aliment: Decimal,
    #[ts(type = "string")]
    pub valeur_oeufs: Decimal,
    pub valide: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct DayTotals {
    pub lots: u32,
    #[ts(type = "number")]
    pub effectif_debut: i64,
    #[ts(type = "number")]
    pub mortalite: i64,
    #[ts(type = "number")]
    pub sujets_sortis: i64,
    #[ts(type = "number")]
    pub effectif_fin: i64,
    #[ts(type = "string")]
    pub taux_mortalite: Decimal,
    #[ts(type = "string")]
    pub aliment_kg: Decimal,
    #[ts(type = "number")]
    pub oeufs_total: i64,
    #[ts(type = "number")]
    pub oeufs_commercialisables: i64,
    #[ts(type = "number")]
    pub oeufs_declasses: i64,
    /// Laying rate over laying lots only.
    #[ts(type = "string")]
    pub taux_ponte: Decimal,
    #[ts(type = "string")]
    pub valeur_mortalite: Decimal,
    #[ts(type = "string")]
    pub cout_aliment: Decimal,
    #[ts(type = "string")]
    pub valeur_oeufs: Decimal,
}

fn ensure_non_negative(num_mvt: &str, params: &Paramsouche) -> Result<(), FiguresError> {
    let counts = [
        ("mortalite", params.mortalite),
        ("sujets_sortis", params.sujets_sortis),
        ("oeufs_normaux", params.oeufs_normaux),
        ("oeufs_double_jaune", params.oeufs_double_jaune),
        ("oeufs_casses", params.oeufs_casses),
        ("oeufs_sales", params.oeufs_sales),
    ];
    if let Some(&(field, _)) = counts.iter().find(|(_, v)| *v < 0) {
        return Err(FiguresError::NegativeValue {
            num_mvt: num_mvt.to_string(),
            field,
        });
    }
    if params.aliment_kg.is_sign_negative() && !params.aliment_kg.is_zero() {
        return Err(FiguresError::NegativeValue {
            num_mvt: num_mvt.to_string(),
            field: "aliment_kg",
        });
    }
    Ok(())
}

fn valued(
    num_mvt: &str,
    field: &'static str,
    quantity: Decimal,
    price: Decimal,
) -> Result<Decimal, FiguresError> {
    checked_amount(quantity, price).ok_or_else(|| FiguresError::OutOfRange {
        num_mvt: num_mvt.to_string(),
        field,
    })
}

/// Computes the figures of `lot` for the day described by `params`.
///
/// `cumul` holds the losses recorded strictly before `params.jour`.
pub fn compute_lot_figures(
    lot: &MiseEnPlace,
    params: &Paramsouche,
    cumul: CumulativeLosses,
    valuation: Valuation,
) -> Result<LotFigures, FiguresError> {
    let num_mvt = lot.num_mvt.as_str();
    let jour = params.jour;

    if jour < lot.date_mise_place {
        return Err(FiguresError::BeforePlacement {
            num_mvt: num_mvt.to_string(),
            jour,
            date_mise_place: lot.date_mise_place,
        });
    }
    ensure_non_negative(num_mvt, params)?;

    let effectif_debut =
        i64::from(lot.effectif_initial) - cumul.mortalite - cumul.sujets_sortis;
    let pertes = i64::from(params.mortalite) + i64::from(params.sujets_sortis);
    let effectif_fin = effectif_debut - pertes;
    if effectif_debut < 0 || effectif_fin < 0 {
        return Err(FiguresError::LossesExceedHeadCount {
            num_mvt: num_mvt.to_string(),
            pertes: cumul.mortalite + cumul.sujets_sortis + pertes,
            effectif: i64::from(lot.effectif_initial),
        });
    }

    let total_oeufs = params.total_oeufs();
    if lot.espece == Espece::Chair && total_oeufs > 0 {
        return Err(FiguresError::EggsOnBroilers {
            num_mvt: num_mvt.to_string(),
        });
    }

    let debut = Decimal::from(effectif_debut);
    let commercialisables = params.oeufs_commercialisables();
    let declasses = params.oeufs_declasses();
    let valeur_oeufs = valued(
        num_mvt,
        "oeufs_commercialisables",
        Decimal::from(commercialisables),
        valuation.prix_oeuf_commercial,
    )? + valued(
        num_mvt,
        "oeufs_declasses",
        Decimal::from(declasses),
        valuation.prix_oeuf_declasse,
    )?;
    let valeur_mortalite = valued(
        num_mvt,
        "mortalite",
        Decimal::from(params.mortalite),
        lot.prix_unitaire,
    )?;
    let cout_aliment = valued(num_mvt, "aliment_kg", params.aliment_kg, valuation.pmp_aliment)?;

    let consommation_g_sujet = if effectif_debut == 0 {
        Decimal::ZERO
    } else {
        round_money(params.aliment_kg * Decimal::ONE_THOUSAND / debut)
    };

    Ok(LotFigures {
        num_mvt: num_mvt.to_string(),
        code_batiment: lot.code_batiment.clone(),
        espece: lot.espece,
        jour,
        age_jours: lot.age_on(jour),
        effectif_debut,
        mortalite: params.mortalite,
        sujets_sortis: params.sujets_sortis,
        effectif_fin,
        taux_mortalite: percent(Decimal::from(params.mortalite), debut),
        taux_mortalite_cumule: percent(
            Decimal::from(cumul.mortalite + i64::from(params.mortalite)),
            Decimal::from(lot.effectif_initial),
        ),
        aliment_kg: round_qty(params.aliment_kg),
        consommation_g_sujet,
        poids_moyen_g: params.poids_moyen_g,
        eau_litres: params.eau_litres,
        oeufs: EggSplit {
            total: total_oeufs,
            commercialisables,
            declasses,
            taux_ponte: percent(Decimal::from(total_oeufs), debut),
        },
        valeur_mortalite,
        cout_aliment,
        valeur_oeufs,
        valide: params.valide,
    })
}

/// Sums the figures of every lot of a day.
pub fn aggregate(figures: &[LotFigures]) -> DayTotals {
    let mut totals = DayTotals::default();
    let mut effectif_ponte = 0i64;

    for f in figures {
        totals.lots += 1;
        totals.effectif_debut += f.effectif_debut;
        totals.mortalite += i64::from(f.mortalite);
        totals.sujets_sortis += i64::from(f.sujets_sortis);
        totals.effectif_fin += f.effectif_fin;
        totals.aliment_kg += f.aliment_kg;
        totals.oeufs_total += f.oeufs.total;
        totals.oeufs_commercialisables += f.oeufs.commercialisables;
        totals.oeufs_declasses += f.oeufs.declasses;
        totals.valeur_mortalite += f.valeur_mortalite;
        totals.cout_aliment += f.cout_aliment;
        totals.valeur_oeufs += f.valeur_oeufs;
        if f.espece == Espece::Ponte {
            effectif_ponte += f.effectif_debut;
        }
    }

    totals.taux_mortalite = percent(
        Decimal::from(totals.mortalite),
        Decimal::from(totals.effectif_debut),
    );
    totals.taux_ponte = percent(
        Decimal::from(totals.oeufs_total),
        Decimal::from(effectif_ponte),
    );
    totals
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use super::*;

    pub(crate) fn lot(espece: Espece, effectif: i32) -> MiseEnPlace {
        MiseEnPlace {
            num_mvt: "L001".to_string(),
            code_batiment: "B1".to_string(),
            espece,
            date_mise_place: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            age_entree: 1,
            effectif_initial: effectif,
            prix_unitaire: dec!(1.50),
            article_sujet: Some("POUS".to_string()),
            article_aliment: Some("ALIM".to_string()),
            cloture: false,
            date_cloture: None,
            observation: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn params(jour: NaiveDate) -> Paramsouche {
        Paramsouche {
            num_mvt: "L001".to_string(),
            jour,
            mortalite: 0,
            sujets_sortis: 0,
            aliment_kg: Decimal::ZERO,
            eau_litres: None,
            poids_moyen_g: None,
            oeufs_normaux: 0,
            oeufs_double_jaune: 0,
            oeufs_casses: 0,
            oeufs_sales: 0,
            valide: false,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn head_count_and_mortality_rates() {
        let lot = lot(Espece::Chair, 1000);
        let mut p = params(day(11));
        p.mortalite = 9;
        p.sujets_sortis = 1;
        p.aliment_kg = dec!(99);
        let cumul = CumulativeLosses {
            mortalite: 10,
            sujets_sortis: 0,
        };

        let f = compute_lot_figures(&lot, &p, cumul, Valuation::default()).unwrap();
        assert_eq!(f.age_jours, 11);
        assert_eq!(f.effectif_debut, 990);
        assert_eq!(f.effectif_fin, 980);
        assert_eq!(f.taux_mortalite, dec!(0.91));
        assert_eq!(f.taux_mortalite_cumule, dec!(1.90));
        assert_eq!(f.consommation_g_sujet, dec!(100));
        assert_eq!(f.valeur_mortalite, dec!(13.50));
    }

    #[test]
    fn egg_split_and_valuation() {
        let lot = lot(Espece::Ponte, 200);
        let mut p = params(day(2));
        p.oeufs_normaux = 150;
        p.oeufs_double_jaune = 10;
        p.oeufs_casses = 5;
        p.oeufs_sales = 5;
        p.aliment_kg = dec!(22.5);
        let valuation = Valuation {
            pmp_aliment: dec!(0.3125),
            prix_oeuf_commercial: dec!(0.12),
            prix_oeuf_declasse: dec!(0.05),
        };

        let f = compute_lot_figures(&lot, &p, CumulativeLosses::default(), valuation).unwrap();
        assert_eq!(f.oeufs.total, 170);
        assert_eq!(f.oeufs.commercialisables, 160);
        assert_eq!(f.oeufs.declasses, 10);
        assert_eq!(f.oeufs.taux_ponte, dec!(85.00));
        assert_eq!(f.valeur_oeufs, dec!(19.70));
        assert_eq!(f.cout_aliment, dec!(7.03));
    }

    #[test]
    fn egg_counts_are_summed_without_overflow() {
        let lot = lot(Espece::Ponte, 100);
        let mut p = params(day(2));
        p.oeufs_normaux = i32::MAX;
        p.oeufs_casses = 1;
        let f = compute_lot_figures(&lot, &p, CumulativeLosses::default(), Valuation::default())
            .unwrap();
        assert_eq!(f.oeufs.total, i64::from(i32::MAX) + 1);
        assert_eq!(f.oeufs.commercialisables, i64::from(i32::MAX));
        assert_eq!(f.oeufs.declasses, 1);
    }

    #[test]
    fn valuation_out_of_range_is_an_error() {
        let lot = lot(Espece::Chair, 100);
        let mut p = params(day(2));
        p.aliment_kg = Decimal::from_i128_with_scale(10_i128.pow(20), 0);
        let valuation = Valuation {
            pmp_aliment: Decimal::from_i128_with_scale(10_i128.pow(20), 0),
            ..Valuation::default()
        };
        let err = compute_lot_figures(&lot, &p, CumulativeLosses::default(), valuation)
            .unwrap_err();
        assert_eq!(
            err,
            FiguresError::OutOfRange {
                num_mvt: "L001".to_string(),
                field: "aliment_kg"
            }
        );
    }

    #[test]
    fn broilers_cannot_lay() {
        let lot = lot(Espece::Chair, 100);
        let mut p = params(day(2));
        p.oeufs_normaux = 1;
        let err = compute_lot_figures(&lot, &p, CumulativeLosses::default(), Valuation::default())
            .unwrap_err();
        assert!(matches!(err, FiguresError::EggsOnBroilers { .. }));
    }

    #[test]
    fn losses_cannot_exceed_head_count() {
        let lot = lot(Espece::Chair, 100);
        let mut p = params(day(5));
        p.mortalite = 6;
        let cumul = CumulativeLosses {
            mortalite: 90,
            sujets_sortis: 5,
        };
        let err = compute_lot_figures(&lot, &p, cumul, Valuation::default()).unwrap_err();
        assert_eq!(
            err,
            FiguresError::LossesExceedHeadCount {
                num_mvt: "L001".to_string(),
                pertes: 101,
                effectif: 100,
            }
        );
    }

    #[test]
    fn day_before_placement_is_rejected() {
        let lot = lot(Espece::Ponte, 100);
        let err = compute_lot_figures(
            &lot,
            &params(day(1).pred_opt().unwrap()),
            CumulativeLosses::default(),
            Valuation::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FiguresError::BeforePlacement { .. }));
    }

    #[test]
    fn empty_lot_has_zero_rates() {
        let lot = lot(Espece::Chair, 10);
        let mut p = params(day(3));
        p.aliment_kg = dec!(1);
        let cumul = CumulativeLosses {
            mortalite: 10,
            sujets_sortis: 0,
        };
        let f = compute_lot_figures(&lot, &p, cumul, Valuation::default()).unwrap();
        assert_eq!(f.effectif_debut, 0);
        assert_eq!(f.consommation_g_sujet, Decimal::ZERO);
        assert_eq!(f.taux_mortalite, Decimal::ZERO);
    }

    #[test]
    fn negative_counts_are_rejected() {
        let lot = lot(Espece::Ponte, 10);
        let mut p = params(day(3));
        p.oeufs_sales = -1;
        let err = compute_lot_figures(&lot, &p, CumulativeLosses::default(), Valuation::default())
            .unwrap_err();
        assert_eq!(
            err,
            FiguresError::NegativeValue {
                num_mvt: "L001".to_string(),
                field: "oeufs_sales"
            }
        );
    }

    #[test]
    fn totals_compute_laying_rate_over_layers_only() {
        let ponte = lot(Espece::Ponte, 100);
        let mut chair = lot(Espece::Chair, 300);
        chair.num_mvt = "L002".to_string();

        let mut p1 = params(day(2));
        p1.oeufs_normaux = 80;
        p1.mortalite = 1;
        let mut p2 = params(day(2));
        p2.mortalite = 2;

        let f1 =
            compute_lot_figures(&ponte, &p1, CumulativeLosses::default(), Valuation::default())
                .unwrap();
        let f2 =
            compute_lot_figures(&chair, &p2, CumulativeLosses::default(), Valuation::default())
                .unwrap();

        let totals = aggregate(&[f1, f2]);
        assert_eq!(totals.lots, 2);
        assert_eq!(totals.effectif_debut, 400);
        assert_eq!(totals.mortalite, 3);
        assert_eq!(totals.effectif_fin, 397);
        assert_eq!(totals.oeufs_total, 80);
        assert_eq!(totals.taux_ponte, dec!(80.00));
        assert_eq!(totals.taux_mortalite, dec!(0.75));
    }
}
