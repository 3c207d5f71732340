//! Stock movement documents. Manual adjustments are created here; the journal
//! reuses [`write_document`] and [`reverse_document`] for its own documents.

use chrono::NaiveDate;
use db::models::{
    article::Article,
    movement::{Emvt, EmvtWithLines, Lmvt, MovementFilter, NatureLigne, NewEmvt, Origine, Sens},
    paramaitre::Paramaitre,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool};
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::decimal::{MAX_PRICE, MAX_QUANTITY, checked_amount};

use super::stock::{StockError, StockLine, StockService};

#[derive(Debug, Error)]
pub enum MovementError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Stock(#[from] StockError),
    #[error("{0}")]
    Validation(String),
    #[error("movement {0} not found")]
    NotFound(i64),
    #[error("movement {0} was generated by a day validation; reopen the day instead")]
    GeneratedByJournal(i64),
}

/// A line to be written on a movement document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub code_article: String,
    pub nature: NatureLigne,
    pub sens: Sens,
    pub quantite: Decimal,
    /// Entry price; `None` values the line at the article's PMP.
    pub prix_unitaire: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateMovementLine {
    pub code_article: String,
    pub sens: Sens,
    #[ts(type = "string")]
    pub quantite: Decimal,
    /// Only used for entries.
    #[ts(type = "string | null")]
    pub prix_unitaire: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateMovement {
    pub date_mvt: NaiveDate,
    pub code_depot: Option<String>,
    pub observation: Option<String>,
    pub lignes: Vec<CreateMovementLine>,
}

/// Inserts a document and posts each line to stock on `conn`.
pub async fn write_document(
    conn: &mut MySqlConnection,
    header: &NewEmvt,
    lines: &[PlannedLine],
    allow_negative: bool,
) -> Result<EmvtWithLines, StockError> {
    let id = Emvt::create_header(&mut *conn, header).await?;

    for (i, planned) in lines.iter().enumerate() {
        let posting = StockService::post_line(
            conn,
            &StockLine {
                code_article: planned.code_article.clone(),
                sens: planned.sens,
                quantite: planned.quantite,
                prix_unitaire: planned.prix_unitaire,
            },
            allow_negative,
        )
        .await?;
        let montant = checked_amount(planned.quantite, posting.prix_unitaire)
            .ok_or_else(|| StockError::AmountOutOfRange(planned.code_article.clone()))?;
        Lmvt::create(
            &mut *conn,
            &Lmvt {
                emvt_id: id,
                num_ligne: i as i32 + 1,
                code_article: planned.code_article.clone(),
                nature: planned.nature,
                sens: planned.sens,
                quantite: planned.quantite,
                prix_unitaire: posting.prix_unitaire,
                montant,
            },
        )
        .await?;
    }

    let header = Emvt::find_by_id(&mut *conn, id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    let lignes = Lmvt::find_by_emvt(&mut *conn, id).await?;
    Ok(EmvtWithLines { header, lignes })
}

/// Puts every line of the document back into stock, then deletes it.
pub async fn reverse_document(
    conn: &mut MySqlConnection,
    id: i64,
    allow_negative: bool,
) -> Result<(), StockError> {
    for line in Lmvt::find_by_emvt(&mut *conn, id).await? {
        StockService::reverse_line(conn, &line.code_article, line.sens, line.quantite, allow_negative)
            .await?;
    }
    Emvt::delete(&mut *conn, id).await?;
    Ok(())
}

pub fn validate(data: &CreateMovement) -> Result<(), MovementError> {
    if data.lignes.is_empty() {
        return Err(MovementError::Validation(
            "a movement needs at least one line".to_string(),
        ));
    }
    for (i, line) in data.lignes.iter().enumerate() {
        let n = i + 1;
        if line.code_article.trim().is_empty() {
            return Err(MovementError::Validation(format!(
                "line {n}: article is required"
            )));
        }
        if line.quantite <= Decimal::ZERO {
            return Err(MovementError::Validation(format!(
                "line {n}: quantity must be positive"
            )));
        }
        if line.quantite > MAX_QUANTITY {
            return Err(MovementError::Validation(format!(
                "line {n}: quantity cannot exceed {MAX_QUANTITY}"
            )));
        }
        match (line.sens, line.prix_unitaire) {
            (Sens::Entree, None) => {
                return Err(MovementError::Validation(format!(
                    "line {n}: an entry needs a unit price"
                )));
            }
            (Sens::Entree, Some(prix)) if prix < Decimal::ZERO => {
                return Err(MovementError::Validation(format!(
                    "line {n}: unit price cannot be negative"
                )));
            }
            (Sens::Entree, Some(prix)) if prix > MAX_PRICE => {
                return Err(MovementError::Validation(format!(
                    "line {n}: unit price cannot exceed {MAX_PRICE}"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

pub struct MovementService;

impl MovementService {
    pub async fn list(
        pool: &MySqlPool,
        filter: &MovementFilter,
    ) -> Result<Vec<Emvt>, MovementError> {
        Ok(Emvt::find_all(pool, filter).await?)
    }

    pub async fn find(pool: &MySqlPool, id: i64) -> Result<EmvtWithLines, MovementError> {
        let header = Emvt::find_by_id(pool, id)
            .await?
            .ok_or(MovementError::NotFound(id))?;
        let lignes = Lmvt::find_by_emvt(pool, id).await?;
        Ok(EmvtWithLines { header, lignes })
    }

    pub async fn create_manual(
        pool: &MySqlPool,
        data: &CreateMovement,
    ) -> Result<EmvtWithLines, MovementError> {
        validate(data)?;

        let mut tx = pool.begin().await?;
        let settings = Paramaitre::get(&mut *tx).await?;
        for line in &data.lignes {
            if Article::find_by_code(&mut *tx, &line.code_article)
                .await?
                .is_none()
            {
                return Err(MovementError::Validation(format!(
                    "unknown article {}",
                    line.code_article
                )));
            }
        }

        let planned: Vec<PlannedLine> = data
            .lignes
            .iter()
            .map(|l| PlannedLine {
                code_article: l.code_article.clone(),
                nature: NatureLigne::Ajustement,
                sens: l.sens,
                quantite: l.quantite,
                prix_unitaire: match l.sens {
                    Sens::Entree => l.prix_unitaire,
                    Sens::Sortie => None,
                },
            })
            .collect();
        let header = NewEmvt {
            date_mvt: data.date_mvt,
            origine: Origine::Manuel,
            num_mvt: None,
            code_depot: data
                .code_depot
                .clone()
                .unwrap_or_else(|| settings.code_depot.clone()),
            observation: data.observation.clone(),
        };
        let document = write_document(&mut tx, &header, &planned, settings.stock_negatif).await?;
        tx.commit().await?;

        info!(emvt = document.id, lignes = document.lignes.len(), "Manual movement created");
        Ok(document)
    }

    pub async fn delete_manual(pool: &MySqlPool, id: i64) -> Result<(), MovementError> {
        let mut tx = pool.begin().await?;
        let emvt = Emvt::find_by_id(&mut *tx, id)
            .await?
            .ok_or(MovementError::NotFound(id))?;
        if emvt.origine == Origine::Journee {
            return Err(MovementError::GeneratedByJournal(id));
        }
        let settings = Paramaitre::get(&mut *tx).await?;
        reverse_document(&mut tx, id, settings.stock_negatif).await?;
        tx.commit().await?;

        info!(emvt = id, "Manual movement deleted");
        Ok(())
    }
}
