use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Optional inclusive date bounds used by document listings (`?du=&au=`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct DateRange {
    pub du: Option<NaiveDate>,
    pub au: Option<NaiveDate>,
}

/// Text-backed enums are stored as VARCHAR columns; rows decode them through
/// `#[sqlx(try_from = "String")]`.
macro_rules! varchar_enum {
    ($ty:ty) => {
        impl TryFrom<String> for $ty {
            type Error = strum::ParseError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

pub(crate) use varchar_enum;

pub mod article;
pub mod batiment;
pub mod journee;
pub mod mise_en_place;
pub mod movement;
pub mod paramaitre;
pub mod paramsouche;
pub mod stock_entry;
