//! Stock quantities and weighted average cost (PMP).

use db::models::{article::Article, movement::Sens};
use rust_decimal::Decimal;
use sqlx::MySqlConnection;
use thiserror::Error;
use tracing::debug;
use utils::decimal::{round_cost, round_qty};

#[derive(Debug, Error)]
pub enum StockError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("article {0} not found")]
    ArticleNotFound(String),
    #[error("quantity for article {0} must be positive")]
    NonPositiveQuantity(String),
    #[error("insufficient stock for article {code}: {available} available, {requested} requested")]
    Insufficient {
        code: String,
        available: Decimal,
        requested: Decimal,
    },
    #[error("amount for article {0} is out of range")]
    AmountOutOfRange(String),
}

/// Quantity on hand and its unit cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub stock: Decimal,
    pub pmp: Decimal,
}

impl From<&Article> for StockLevel {
    fn from(article: &Article) -> Self {
        Self {
            stock: article.stock,
            pmp: article.pmp,
        }
    }
}

/// PMP after receiving `qty` at `price`. An empty or negative stock restarts from `price`.
pub fn weighted_average_cost(stock: Decimal, pmp: Decimal, qty: Decimal, price: Decimal) -> Decimal {
    if stock <= Decimal::ZERO {
        return round_cost(price);
    }
    let total = stock + qty;
    if total.is_zero() {
        return round_cost(price);
    }
    // pmp + (price - pmp) * qty / total keeps every product within range
    round_cost(pmp + (price - pmp) * (qty / total))
}

pub fn apply_entry(level: StockLevel, qty: Decimal, price: Decimal) -> StockLevel {
    StockLevel {
        stock: round_qty(level.stock + qty),
        pmp: weighted_average_cost(level.stock, level.pmp, qty, price),
    }
}

/// Removes `qty` from `level`. The PMP never moves on an exit.
pub fn apply_exit(
    code: &str,
    level: StockLevel,
    qty: Decimal,
    allow_negative: bool,
) -> Result<StockLevel, StockError> {
    let stock = round_qty(level.stock - qty);
    if stock < Decimal::ZERO && !allow_negative {
        return Err(StockError::Insufficient {
            code: code.to_string(),
            available: level.stock,
            requested: qty,
        });
    }
    Ok(StockLevel {
        stock,
        pmp: level.pmp,
    })
}

/// Undoes a posted line of direction `sens`: an entry is taken back out,
/// an exit is put back. The PMP is left as is.
pub fn apply_reversal(
    code: &str,
    level: StockLevel,
    sens: Sens,
    qty: Decimal,
    allow_negative: bool,
) -> Result<StockLevel, StockError> {
    match sens {
        Sens::Entree => apply_exit(code, level, qty, allow_negative),
        Sens::Sortie => Ok(StockLevel {
            stock: round_qty(level.stock + qty),
            pmp: level.pmp,
        }),
    }
}

/// A line to post against an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
    pub code_article: String,
    pub sens: Sens,
    pub quantite: Decimal,
    /// Valuation price; `None` values the line at the current PMP.
    pub prix_unitaire: Option<Decimal>,
}

/// Outcome of posting a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub prix_unitaire: Decimal,
    pub level: StockLevel,
}

pub struct StockService;

impl StockService {
    /// Applies `line` to its article under a row lock and returns the unit price it was valued at.
    pub async fn post_line(
        conn: &mut MySqlConnection,
        line: &StockLine,
        allow_negative: bool,
    ) -> Result<Posting, StockError> {
        if line.quantite <= Decimal::ZERO {
            return Err(StockError::NonPositiveQuantity(line.code_article.clone()));
        }
        let article = Article::find_for_update(&mut *conn, &line.code_article)
            .await?
            .ok_or_else(|| StockError::ArticleNotFound(line.code_article.clone()))?;
        let current = StockLevel::from(&article);

        let prix_unitaire = line.prix_unitaire.unwrap_or(article.pmp);
        if !article.gere_stock {
            return Ok(Posting {
                prix_unitaire,
                level: current,
            });
        }

        let level = match line.sens {
            Sens::Entree => apply_entry(current, line.quantite, prix_unitaire),
            Sens::Sortie => apply_exit(&article.code, current, line.quantite, allow_negative)?,
        };
        Article::set_stock(&mut *conn, &article.code, level.stock, level.pmp).await?;
        debug!(
            article = %article.code,
            sens = %line.sens,
            quantite = %line.quantite,
            stock = %level.stock,
            pmp = %level.pmp,
            "Stock posted"
        );

        Ok(Posting {
            prix_unitaire,
            level,
        })
    }

    /// Undoes a previously posted line. The PMP is left as is.
    pub async fn reverse_line(
        conn: &mut MySqlConnection,
        code_article: &str,
        sens: Sens,
        quantite: Decimal,
        allow_negative: bool,
    ) -> Result<StockLevel, StockError> {
        let article = Article::find_for_update(&mut *conn, code_article)
            .await?
            .ok_or_else(|| StockError::ArticleNotFound(code_article.to_string()))?;
        let current = StockLevel::from(&article);
        if !article.gere_stock {
            return Ok(current);
        }

        let level = apply_reversal(&article.code, current, sens, quantite, allow_negative)?;
        Article::set_stock(&mut *conn, &article.code, level.stock, level.pmp).await?;
        debug!(article = %article.code, sens = %sens, quantite = %quantite, "Stock reversed");
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn pmp_restarts_from_price_on_empty_stock() {
        assert_eq!(weighted_average_cost(dec!(0), dec!(9), dec!(10), dec!(2.5)), dec!(2.5));
        assert_eq!(weighted_average_cost(dec!(-3), dec!(9), dec!(10), dec!(2.5)), dec!(2.5));
    }

    #[test]
    fn pmp_is_weighted_by_quantities() {
        // (100 * 0.30 + 50 * 0.36) / 150 = 0.32
        assert_eq!(
            weighted_average_cost(dec!(100), dec!(0.30), dec!(50), dec!(0.36)),
            dec!(0.32)
        );
        // 4 dp
        assert_eq!(
            weighted_average_cost(dec!(3), dec!(1), dec!(3), dec!(0.3333)),
            dec!(0.6667)
        );
    }

    #[test]
    fn entry_updates_stock_and_cost() {
        let level = StockLevel {
            stock: dec!(100),
            pmp: dec!(0.30),
        };
        let next = apply_entry(level, dec!(50), dec!(0.36));
        assert_eq!(next.stock, dec!(150));
        assert_eq!(next.pmp, dec!(0.32));
    }

    #[test]
    fn exit_keeps_cost() {
        let level = StockLevel {
            stock: dec!(10),
            pmp: dec!(1.25),
        };
        let next = apply_exit("ALIM", level, dec!(4), false).unwrap();
        assert_eq!(next.stock, dec!(6));
        assert_eq!(next.pmp, dec!(1.25));
    }

    #[test]
    fn exit_below_zero_needs_permission() {
        let level = StockLevel {
            stock: dec!(2),
            pmp: dec!(1),
        };
        let err = apply_exit("ALIM", level, dec!(3), false).unwrap_err();
        assert!(matches!(err, StockError::Insufficient { ref code, .. } if code == "ALIM"));

        let next = apply_exit("ALIM", level, dec!(3), true).unwrap();
        assert_eq!(next.stock, dec!(-1));
    }

    #[test]
    fn pmp_of_large_stocks_does_not_overflow() {
        let max_qty = dec!(999999999999999.999);
        let max_price = dec!(99999999999999.9999);
        assert_eq!(
            weighted_average_cost(max_qty, max_price, max_qty, max_price),
            max_price
        );
    }

    #[test]
    fn reversing_an_entry_takes_it_back_out() {
        let level = StockLevel {
            stock: dec!(150),
            pmp: dec!(0.32),
        };
        let next = apply_reversal("ALIM", level, Sens::Entree, dec!(50), false).unwrap();
        assert_eq!(next.stock, dec!(100));
        assert_eq!(next.pmp, dec!(0.32));
    }

    #[test]
    fn reversing_an_exit_puts_it_back() {
        let level = StockLevel {
            stock: dec!(6),
            pmp: dec!(1.25),
        };
        let next = apply_reversal("ALIM", level, Sens::Sortie, dec!(4.0005), false).unwrap();
        assert_eq!(next.stock, dec!(10.001));
        assert_eq!(next.pmp, dec!(1.25));
    }

    #[test]
    fn reversal_leaves_pmp_untouched() {
        let level = StockLevel {
            stock: dec!(20),
            pmp: dec!(0.4567),
        };
        for sens in [Sens::Entree, Sens::Sortie] {
            let next = apply_reversal("ALIM", level, sens, dec!(5), false).unwrap();
            assert_eq!(next.pmp, dec!(0.4567));
        }
    }

    #[test]
    fn reversing_a_consumed_entry_needs_negative_stock() {
        let level = StockLevel {
            stock: dec!(10),
            pmp: dec!(1),
        };
        let err = apply_reversal("ALIM", level, Sens::Entree, dec!(30), false).unwrap_err();
        assert!(matches!(
            err,
            StockError::Insufficient { ref code, .. } if code == "ALIM"
        ));

        let next = apply_reversal("ALIM", level, Sens::Entree, dec!(30), true).unwrap();
        assert_eq!(next.stock, dec!(-20));
    }
}
