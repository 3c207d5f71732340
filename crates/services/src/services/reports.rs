//! Read-only reports: daily production, lot history, stock valuation.

use chrono::{DateTime, NaiveDate, Utc};
use db::models::{
    article::Article,
    batiment::Batiment,
    journee::Journee,
    mise_en_place::{Espece, MiseEnPlace},
    movement::{Emvt, EmvtWithLines, Lmvt, Origine},
    paramaitre::Paramaitre,
    paramsouche::{CumulativeLosses, Paramsouche},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use thiserror::Error;
use ts_rs::TS;
use utils::decimal::{percent, round_money, round_qty};

use super::{
    figures::{FiguresError, LotFigures, Valuation, compute_lot_figures},
    journal::{DaySummary, JournalError, JournalService},
};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Figures(#[from] FiguresError),
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error("{0} not found")]
    NotFound(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DailyReport {
    #[serde(flatten)]
    #[ts(flatten)]
    pub resume: DaySummary,
    pub date_validation: Option<DateTime<Utc>>,
    pub utilisateur: Option<String>,
    /// Movement documents written when the day was validated.
    pub mouvements: Vec<EmvtWithLines>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct LotReportTotals {
    pub jours: u32,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    #[ts(type = "number")]
    pub mortalite: i64,
    #[ts(type = "number")]
    pub sujets_sortis: i64,
    #[ts(type = "number")]
    pub effectif_actuel: i64,
    #[ts(type = "string")]
    pub taux_mortalite_cumule: Decimal,
    #[ts(type = "string")]
    pub aliment_kg: Decimal,
    /// Feed consumed per placed bird, in kg.
    #[ts(type = "string")]
    pub consommation_kg_sujet: Decimal,
    #[ts(type = "number")]
    pub oeufs_total: i64,
    /// Eggs over bird-days, laying lots only.
    #[ts(type = "string")]
    pub taux_ponte_moyen: Decimal,
    #[ts(type = "string")]
    pub valeur_mortalite: Decimal,
    #[ts(type = "string")]
    pub cout_aliment: Decimal,
    #[ts(type = "string")]
    pub valeur_oeufs: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LotReport {
    pub lot: MiseEnPlace,
    pub batiment: Option<Batiment>,
    pub serie: Vec<LotFigures>,
    pub totaux: LotReportTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct StockReportLine {
    pub code: String,
    pub designation: String,
    pub unite: String,
    #[ts(type = "string")]
    pub stock: Decimal,
    #[ts(type = "string")]
    pub pmp: Decimal,
    #[ts(type = "string")]
    pub valeur: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct StockReport {
    pub articles: Vec<StockReportLine>,
    #[ts(type = "string")]
    pub valeur_totale: Decimal,
}

/// Day-by-day figures of a lot, carrying losses forward.
pub fn lot_series(
    lot: &MiseEnPlace,
    params: &[Paramsouche],
    valuation: Valuation,
) -> Result<Vec<LotFigures>, FiguresError> {
    let mut cumul = CumulativeLosses::default();
    let mut serie = Vec::with_capacity(params.len());
    for p in params {
        serie.push(compute_lot_figures(lot, p, cumul, valuation)?);
        cumul.mortalite += i64::from(p.mortalite);
        cumul.sujets_sortis += i64::from(p.sujets_sortis);
    }
    Ok(serie)
}

pub fn lot_totals(lot: &MiseEnPlace, serie: &[LotFigures]) -> LotReportTotals {
    let mut totals = LotReportTotals {
        jours: serie.len() as u32,
        first_day: serie.first().map(|f| f.jour),
        last_day: serie.last().map(|f| f.jour),
        effectif_actuel: i64::from(lot.effectif_initial),
        ..Default::default()
    };
    let mut sujets_jours = 0i64;

    for f in serie {
        totals.mortalite += i64::from(f.mortalite);
        totals.sujets_sortis += i64::from(f.sujets_sortis);
        totals.aliment_kg += f.aliment_kg;
        totals.oeufs_total += f.oeufs.total;
        totals.valeur_mortalite += f.valeur_mortalite;
        totals.cout_aliment += f.cout_aliment;
        totals.valeur_oeufs += f.valeur_oeufs;
        sujets_jours += f.effectif_debut;
    }
    if let Some(last) = serie.last() {
        totals.effectif_actuel = last.effectif_fin;
    }

    let placed = Decimal::from(lot.effectif_initial);
    totals.taux_mortalite_cumule = percent(Decimal::from(totals.mortalite), placed);
    totals.consommation_kg_sujet = if placed.is_zero() {
        Decimal::ZERO
    } else {
        round_qty(totals.aliment_kg / placed)
    };
    if lot.espece == Espece::Ponte {
        totals.taux_ponte_moyen =
            percent(Decimal::from(totals.oeufs_total), Decimal::from(sujets_jours));
    }
    totals
}

pub fn build_stock_report(articles: &[Article]) -> StockReport {
    let articles: Vec<StockReportLine> = articles
        .iter()
        .filter(|a| a.gere_stock)
        .map(|a| StockReportLine {
            code: a.code.clone(),
            designation: a.designation.clone(),
            unite: a.unite.clone(),
            stock: a.stock,
            pmp: a.pmp,
            valeur: round_money(a.value()),
        })
        .collect();
    let valeur_totale = articles.iter().map(|l| l.valeur).sum();
    StockReport {
        articles,
        valeur_totale,
    }
}

pub struct ReportService;

impl ReportService {
    pub async fn daily_report(
        pool: &MySqlPool,
        jour: NaiveDate,
    ) -> Result<DailyReport, ReportError> {
        let resume = JournalService::preview(pool, jour).await?;
        let journee = Journee::find(pool, jour).await?;

        let mut mouvements = Vec::new();
        for header in Emvt::find_by_origin_and_day(pool, Origine::Journee, jour).await? {
            let lignes = Lmvt::find_by_emvt(pool, header.id).await?;
            mouvements.push(EmvtWithLines { header, lignes });
        }

        Ok(DailyReport {
            resume,
            date_validation: journee.as_ref().map(|j| j.date_validation),
            utilisateur: journee.and_then(|j| j.utilisateur),
            mouvements,
        })
    }

    pub async fn lot_report(pool: &MySqlPool, num_mvt: &str) -> Result<LotReport, ReportError> {
        let lot = MiseEnPlace::find_by_num(pool, num_mvt)
            .await?
            .ok_or_else(|| ReportError::NotFound(format!("lot {num_mvt}")))?;
        let batiment = Batiment::find_by_code(pool, &lot.code_batiment).await?;
        let settings = Paramaitre::get(pool).await?;
        let pmp_aliment = match &lot.article_aliment {
            Some(code) => Article::find_by_code(pool, code)
                .await?
                .map(|a| a.pmp)
                .unwrap_or_default(),
            None => Decimal::ZERO,
        };

        let params = Paramsouche::find_by_lot(pool, num_mvt).await?;
        let serie = lot_series(
            &lot,
            &params,
            Valuation {
                pmp_aliment,
                prix_oeuf_commercial: settings.prix_oeuf_commercial,
                prix_oeuf_declasse: settings.prix_oeuf_declasse,
            },
        )?;
        let totaux = lot_totals(&lot, &serie);

        Ok(LotReport {
            lot,
            batiment,
            serie,
            totaux,
        })
    }

    pub async fn stock_report(pool: &MySqlPool) -> Result<StockReport, ReportError> {
        let articles = Article::find_stocked(pool).await?;
        Ok(build_stock_report(&articles))
    }
}
