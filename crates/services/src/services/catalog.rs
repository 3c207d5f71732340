//! Rules around master data: buildings, articles and company settings.

use db::models::{
    article::{Article, CreateArticle, UpdateArticle},
    batiment::{Batiment, CreateBatiment, UpdateBatiment},
    mise_en_place::MiseEnPlace,
    paramaitre::{Paramaitre, UpdateParamaitre},
};
use rust_decimal::Decimal;
use sqlx::MySqlPool;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
}

fn require(value: &str, field: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::Validation(format!("{field} is required")));
    }
    Ok(())
}

pub fn validate_new_batiment(data: &CreateBatiment) -> Result<(), CatalogError> {
    require(&data.code, "code")?;
    require(&data.designation, "designation")?;
    if data.capacite < 0 {
        return Err(CatalogError::Validation(
            "capacite cannot be negative".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_new_article(data: &CreateArticle) -> Result<(), CatalogError> {
    require(&data.code, "code")?;
    require(&data.designation, "designation")?;
    if let Some(unite) = &data.unite {
        require(unite, "unite")?;
    }
    Ok(())
}

pub fn validate_settings(data: &UpdateParamaitre) -> Result<(), CatalogError> {
    require(&data.code_depot, "code_depot")?;
    if data.taux_tva < Decimal::ZERO || data.taux_tva > Decimal::ONE_HUNDRED {
        return Err(CatalogError::Validation(
            "taux_tva must be between 0 and 100".to_string(),
        ));
    }
    if data.prix_oeuf_commercial < Decimal::ZERO || data.prix_oeuf_declasse < Decimal::ZERO {
        return Err(CatalogError::Validation(
            "egg prices cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// A new capacity must still hold the open lot's placed head count
/// (`effectif_initial`), whatever its losses since.
pub fn check_capacity(capacite: i32, open_lot: Option<&MiseEnPlace>) -> Result<(), CatalogError> {
    if capacite < 0 {
        return Err(CatalogError::Validation(
            "capacite cannot be negative".to_string(),
        ));
    }
    if let Some(lot) = open_lot {
        if capacite < lot.effectif_initial {
            return Err(CatalogError::Conflict(format!(
                "capacite {capacite} is below the head count of open lot {}",
                lot.num_mvt
            )));
        }
    }
    Ok(())
}

pub struct CatalogService;

impl CatalogService {
    pub async fn create_batiment(
        pool: &MySqlPool,
        data: &CreateBatiment,
    ) -> Result<Batiment, CatalogError> {
        validate_new_batiment(data)?;
        if Batiment::find_by_code(pool, &data.code).await?.is_some() {
            return Err(CatalogError::Conflict(format!(
                "batiment {} already exists",
                data.code
            )));
        }
        let batiment = Batiment::create(pool, data).await?;
        info!(batiment = %batiment.code, "Batiment created");
        Ok(batiment)
    }

    /// Capacity is checked by [`check_capacity`].
    pub async fn update_batiment(
        pool: &MySqlPool,
        code: &str,
        data: &UpdateBatiment,
    ) -> Result<Batiment, CatalogError> {
        if let Some(designation) = &data.designation {
            require(designation, "designation")?;
        }
        if let Some(capacite) = data.capacite {
            let open_lot = MiseEnPlace::find_open_in_batiment(pool, code).await?;
            check_capacity(capacite, open_lot.as_ref())?;
        }
        Batiment::update(pool, code, data)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("batiment {code}")))
    }

    pub async fn delete_batiment(pool: &MySqlPool, code: &str) -> Result<(), CatalogError> {
        if Batiment::has_lots(pool, code).await? {
            return Err(CatalogError::Conflict(format!(
                "batiment {code} is referenced by lots"
            )));
        }
        if Batiment::delete(pool, code).await? == 0 {
            return Err(CatalogError::NotFound(format!("batiment {code}")));
        }
        info!(batiment = %code, "Batiment deleted");
        Ok(())
    }

    pub async fn create_article(
        pool: &MySqlPool,
        data: &CreateArticle,
    ) -> Result<Article, CatalogError> {
        validate_new_article(data)?;
        if Article::find_by_code(pool, &data.code).await?.is_some() {
            return Err(CatalogError::Conflict(format!(
                "article {} already exists",
                data.code
            )));
        }
        Ok(Article::create(pool, data).await?)
    }

    pub async fn update_article(
        pool: &MySqlPool,
        code: &str,
        data: &UpdateArticle,
    ) -> Result<Article, CatalogError> {
        if let Some(designation) = &data.designation {
            require(designation, "designation")?;
        }
        let article = Article::find_by_code(pool, code)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("article {code}")))?;
        if data.gere_stock == Some(false) && article.gere_stock && !article.stock.is_zero() {
            return Err(CatalogError::Conflict(format!(
                "article {code} still holds {} in stock",
                article.stock
            )));
        }
        Article::update(pool, code, data)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("article {code}")))
    }

    pub async fn update_settings(
        pool: &MySqlPool,
        data: &UpdateParamaitre,
    ) -> Result<Paramaitre, CatalogError> {
        validate_settings(data)?;
        for code in [&data.article_oeuf_commercial, &data.article_oeuf_declasse]
            .into_iter()
            .flatten()
        {
            if Article::find_by_code(pool, code).await?.is_none() {
                return Err(CatalogError::Validation(format!("unknown article {code}")));
            }
        }
        let settings = Paramaitre::upsert(pool, data).await?;
        info!(gestion_stock = settings.gestion_stock, "Settings updated");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use db::models::mise_en_place::Espece;
    use rust_decimal_macros::dec;

    use super::*;

    fn settings() -> UpdateParamaitre {
        UpdateParamaitre {
            raison_sociale: "Ferme".to_string(),
            taux_tva: dec!(19),
            gestion_stock: true,
            stock_negatif: false,
            code_depot: "DEP01".to_string(),
            article_oeuf_commercial: None,
            article_oeuf_declasse: None,
            prix_oeuf_commercial: dec!(0.12),
            prix_oeuf_declasse: dec!(0.05),
        }
    }

    #[test]
    fn batiment_needs_code_and_positive_capacity() {
        let mut data = CreateBatiment {
            code: " ".to_string(),
            designation: "Poulailler 1".to_string(),
            capacite: 5000,
            actif: None,
        };
        assert!(matches!(
            validate_new_batiment(&data),
            Err(CatalogError::Validation(msg)) if msg == "code is required"
        ));
        data.code = "B1".to_string();
        data.capacite = -1;
        assert!(validate_new_batiment(&data).is_err());
        data.capacite = 0;
        assert!(validate_new_batiment(&data).is_ok());
    }

    #[test]
    fn article_unit_cannot_be_blank() {
        let data = CreateArticle {
            code: "ALIM".to_string(),
            designation: "Aliment ponte".to_string(),
            unite: Some(String::new()),
            gere_stock: None,
        };
        assert!(validate_new_article(&data).is_err());
    }

    #[test]
    fn settings_bounds() {
        assert!(validate_settings(&settings()).is_ok());

        let mut bad = settings();
        bad.taux_tva = dec!(100.01);
        assert!(validate_settings(&bad).is_err());

        let mut bad = settings();
        bad.prix_oeuf_declasse = dec!(-0.01);
        assert!(validate_settings(&bad).is_err());

        let mut bad = settings();
        bad.code_depot = String::new();
        assert!(validate_settings(&bad).is_err());
    }

    #[test]
    fn capacity_is_checked_against_the_placed_head_count() {
        let lot = MiseEnPlace {
            num_mvt: "L001".to_string(),
            code_batiment: "B1".to_string(),
            espece: Espece::Ponte,
            date_mise_place: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
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
        };
        assert!(check_capacity(1000, Some(&lot)).is_ok());
        // losses do not count: 999 places still refuse a lot placed at 1000
        assert!(matches!(
            check_capacity(999, Some(&lot)),
            Err(CatalogError::Conflict(msg)) if msg.contains("L001")
        ));
        assert!(check_capacity(10, None).is_ok());
        assert!(matches!(
            check_capacity(-1, None),
            Err(CatalogError::Validation(_))
        ));
    }
}
