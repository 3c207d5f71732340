pub mod catalog;
pub mod database_validator;
pub mod figures;
pub mod journal;
pub mod movement;
pub mod placement;
pub mod reports;
pub mod stock;
pub mod stock_entry;
