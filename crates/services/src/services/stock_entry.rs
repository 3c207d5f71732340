//! Goods received notes: header, lines and the stock they bring in.

use chrono::NaiveDate;
use db::models::{
    DateRange,
    article::Article,
    movement::Sens,
    paramaitre::Paramaitre,
    stock_entry::{Ebe, EbeWithLines, Lbe, NewEbe},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::decimal::{MAX_AMOUNT, MAX_PRICE, MAX_QUANTITY, checked_amount, round_money};

use super::stock::{StockError, StockLine, StockService};

#[derive(Debug, Error)]
pub enum StockEntryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Stock(#[from] StockError),
    #[error("{0}")]
    Validation(String),
    #[error("stock entry {0} not found")]
    NotFound(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateStockEntryLine {
    pub code_article: String,
    #[ts(type = "string")]
    pub quantite: Decimal,
    #[ts(type = "string")]
    pub prix_unitaire: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateStockEntry {
    pub date_bon: NaiveDate,
    pub fournisseur: Option<String>,
    /// Defaults to the company depot.
    pub code_depot: Option<String>,
    pub observation: Option<String>,
    pub lignes: Vec<CreateStockEntryLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTotals {
    pub lignes: Vec<Decimal>,
    pub montant_ht: Decimal,
    pub montant_tva: Decimal,
    pub montant_ttc: Decimal,
}

pub fn compute_totals(
    lines: &[CreateStockEntryLine],
    taux_tva: Decimal,
) -> Result<EntryTotals, StockEntryError> {
    let out_of_range = || StockEntryError::Validation("document total is out of range".to_string());

    let mut lignes = Vec::with_capacity(lines.len());
    let mut montant_ht = Decimal::ZERO;
    for (i, line) in lines.iter().enumerate() {
        let montant = checked_amount(line.quantite, line.prix_unitaire).ok_or_else(|| {
            StockEntryError::Validation(format!("line {}: amount is out of range", i + 1))
        })?;
        montant_ht = montant_ht.checked_add(montant).ok_or_else(out_of_range)?;
        lignes.push(montant);
    }
    let montant_tva = montant_ht
        .checked_mul(taux_tva)
        .map(|v| round_money(v / Decimal::ONE_HUNDRED))
        .ok_or_else(out_of_range)?;
    let montant_ttc = montant_ht.checked_add(montant_tva).ok_or_else(out_of_range)?;
    if montant_ttc.abs() > MAX_AMOUNT {
        return Err(out_of_range());
    }
    Ok(EntryTotals {
        lignes,
        montant_ht,
        montant_tva,
        montant_ttc,
    })
}

/// Shape checks that need no database.
pub fn validate(data: &CreateStockEntry) -> Result<(), StockEntryError> {
    if data.lignes.is_empty() {
        return Err(StockEntryError::Validation(
            "a stock entry needs at least one line".to_string(),
        ));
    }
    for (i, line) in data.lignes.iter().enumerate() {
        let n = i + 1;
        if line.code_article.trim().is_empty() {
            return Err(StockEntryError::Validation(format!(
                "line {n}: article is required"
            )));
        }
        if line.quantite <= Decimal::ZERO {
            return Err(StockEntryError::Validation(format!(
                "line {n}: quantity must be positive"
            )));
        }
        if line.prix_unitaire < Decimal::ZERO {
            return Err(StockEntryError::Validation(format!(
                "line {n}: unit price cannot be negative"
            )));
        }
        if line.quantite > MAX_QUANTITY {
            return Err(StockEntryError::Validation(format!(
                "line {n}: quantity cannot exceed {MAX_QUANTITY}"
            )));
        }
        if line.prix_unitaire > MAX_PRICE {
            return Err(StockEntryError::Validation(format!(
                "line {n}: unit price cannot exceed {MAX_PRICE}"
            )));
        }
    }
    Ok(())
}

pub struct StockEntryService;

impl StockEntryService {
    pub async fn list(pool: &MySqlPool, range: &DateRange) -> Result<Vec<Ebe>, StockEntryError> {
        Ok(Ebe::find_all(pool, range).await?)
    }

    pub async fn find(pool: &MySqlPool, id: i64) -> Result<EbeWithLines, StockEntryError> {
        let header = Ebe::find_by_id(pool, id)
            .await?
            .ok_or(StockEntryError::NotFound(id))?;
        let lignes = Lbe::find_by_ebe(pool, id).await?;
        Ok(EbeWithLines { header, lignes })
    }

    /// Writes the document and receives its lines into stock, all or nothing.
    pub async fn create(
        pool: &MySqlPool,
        data: &CreateStockEntry,
    ) -> Result<EbeWithLines, StockEntryError> {
        validate(data)?;

        let mut tx = pool.begin().await?;
        let settings = Paramaitre::get(&mut *tx).await?;
        for line in &data.lignes {
            if Article::find_by_code(&mut *tx, &line.code_article)
                .await?
                .is_none()
            {
                return Err(StockEntryError::Validation(format!(
                    "unknown article {}",
                    line.code_article
                )));
            }
        }

        let totals = compute_totals(&data.lignes, settings.taux_tva)?;
        let id = Ebe::create_header(
            &mut *tx,
            &NewEbe {
                date_bon: data.date_bon,
                fournisseur: data.fournisseur.clone(),
                code_depot: data
                    .code_depot
                    .clone()
                    .unwrap_or_else(|| settings.code_depot.clone()),
                observation: data.observation.clone(),
                montant_ht: totals.montant_ht,
                montant_tva: totals.montant_tva,
                montant_ttc: totals.montant_ttc,
            },
        )
        .await?;

        for (i, (line, montant_ht)) in data.lignes.iter().zip(&totals.lignes).enumerate() {
            Lbe::create(
                &mut *tx,
                &Lbe {
                    ebe_id: id,
                    num_ligne: i as i32 + 1,
                    code_article: line.code_article.clone(),
                    quantite: line.quantite,
                    prix_unitaire: line.prix_unitaire,
                    montant_ht: *montant_ht,
                },
            )
            .await?;
            StockService::post_line(
                &mut tx,
                &StockLine {
                    code_article: line.code_article.clone(),
                    sens: Sens::Entree,
                    quantite: line.quantite,
                    prix_unitaire: Some(line.prix_unitaire),
                },
                settings.stock_negatif,
            )
            .await?;
        }

        let header = Ebe::find_by_id(&mut *tx, id)
            .await?
            .ok_or(StockEntryError::NotFound(id))?;
        let lignes = Lbe::find_by_ebe(&mut *tx, id).await?;
        tx.commit().await?;

        info!(
            ebe = id,
            lignes = lignes.len(),
            montant_ttc = %header.montant_ttc,
            "Stock entry created"
        );
        Ok(EbeWithLines { header, lignes })
    }

    /// Takes the received quantities back out of stock and removes the document.
    pub async fn delete(pool: &MySqlPool, id: i64) -> Result<(), StockEntryError> {
        let mut tx = pool.begin().await?;
        if Ebe::find_by_id(&mut *tx, id).await?.is_none() {
            return Err(StockEntryError::NotFound(id));
        }
        let settings = Paramaitre::get(&mut *tx).await?;
        for line in Lbe::find_by_ebe(&mut *tx, id).await? {
            StockService::reverse_line(
                &mut tx,
                &line.code_article,
                Sens::Entree,
                line.quantite,
                settings.stock_negatif,
            )
            .await?;
        }
        Ebe::delete(&mut *tx, id).await?;
        tx.commit().await?;

        info!(ebe = id, "Stock entry deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn line(code: &str, quantite: Decimal, prix: Decimal) -> CreateStockEntryLine {
        CreateStockEntryLine {
            code_article: code.to_string(),
            quantite,
            prix_unitaire: prix,
        }
    }

    fn entry(lignes: Vec<CreateStockEntryLine>) -> CreateStockEntry {
        CreateStockEntry {
            date_bon: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            fournisseur: Some("Moulin du Sud".to_string()),
            code_depot: None,
            observation: None,
            lignes,
        }
    }

    #[test]
    fn totals_apply_vat_on_rounded_lines() {
        let lines = vec![
            line("ALIM", dec!(1000), dec!(0.3125)),
            line("VITA", dec!(3), dec!(12.333)),
        ];
        let totals = compute_totals(&lines, dec!(19)).unwrap();
        assert_eq!(totals.lignes, vec![dec!(312.50), dec!(37.00)]);
        assert_eq!(totals.montant_ht, dec!(349.50));
        assert_eq!(totals.montant_tva, dec!(66.41));
        assert_eq!(totals.montant_ttc, dec!(415.91));
    }

    #[test]
    fn entry_needs_lines() {
        let err = validate(&entry(vec![])).unwrap_err();
        assert!(matches!(err, StockEntryError::Validation(_)));
    }

    #[test]
    fn quantities_must_be_positive_and_prices_non_negative() {
        assert!(validate(&entry(vec![line("ALIM", dec!(0), dec!(1))])).is_err());
        assert!(validate(&entry(vec![line("ALIM", dec!(1), dec!(-1))])).is_err());
        assert!(validate(&entry(vec![line("ALIM", dec!(1), dec!(0))])).is_ok());
    }

    #[test]
    fn quantities_and_prices_are_bounded_by_their_columns() {
        let huge = Decimal::from_i128_with_scale(10_i128.pow(20), 0);
        assert!(validate(&entry(vec![line("ALIM", huge, dec!(1))])).is_err());
        assert!(validate(&entry(vec![line("ALIM", dec!(1), huge)])).is_err());
        assert!(validate(&entry(vec![line("ALIM", MAX_QUANTITY, MAX_PRICE)])).is_ok());
    }

    #[test]
    fn oversized_amounts_are_refused_instead_of_overflowing() {
        let huge = Decimal::from_i128_with_scale(10_i128.pow(20), 0);
        let err = compute_totals(&[line("ALIM", huge, huge)], dec!(19)).unwrap_err();
        assert_eq!(err.to_string(), "line 1: amount is out of range");

        let err = compute_totals(&[line("ALIM", MAX_QUANTITY, MAX_PRICE)], dec!(19)).unwrap_err();
        assert!(matches!(err, StockEntryError::Validation(_)));
    }
}
