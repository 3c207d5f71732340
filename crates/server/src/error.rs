use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    catalog::CatalogError, figures::FiguresError, journal::JournalError, movement::MovementError,
    placement::PlacementError, reports::ReportError, stock::StockError,
    stock_entry::StockEntryError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            ApiError::Database(sqlx::Error::Database(e)) if is_constraint_violation(e.as_ref()) => {
                StatusCode::CONFLICT
            }
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn is_constraint_violation(e: &dyn sqlx::error::DatabaseError) -> bool {
    e.is_unique_violation() || e.is_foreign_key_violation()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Database(sqlx::Error::RowNotFound) => "Record not found".to_string(),
            ApiError::Database(sqlx::Error::Database(e)) if is_constraint_violation(e.as_ref()) => {
                "Operation conflicts with existing records".to_string()
            }
            ApiError::Database(_) | ApiError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Database(e) => ApiError::Database(e),
            StockError::ArticleNotFound(_)
            | StockError::NonPositiveQuantity(_)
            | StockError::AmountOutOfRange(_) => ApiError::BadRequest(err.to_string()),
            StockError::Insufficient { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<FiguresError> for ApiError {
    fn from(err: FiguresError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Database(e) => ApiError::Database(e),
            CatalogError::Validation(msg) => ApiError::BadRequest(msg),
            CatalogError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CatalogError::Conflict(msg) => ApiError::Conflict(msg),
        }
    }
}

impl From<PlacementError> for ApiError {
    fn from(err: PlacementError) -> Self {
        match err {
            PlacementError::Database(e) => ApiError::Database(e),
            PlacementError::Validation(msg) => ApiError::BadRequest(msg),
            PlacementError::NotFound(_) => ApiError::NotFound(err.to_string()),
            PlacementError::Conflict(msg) => ApiError::Conflict(msg),
        }
    }
}

impl From<StockEntryError> for ApiError {
    fn from(err: StockEntryError) -> Self {
        match err {
            StockEntryError::Database(e) => ApiError::Database(e),
            StockEntryError::Stock(e) => e.into(),
            StockEntryError::Validation(msg) => ApiError::BadRequest(msg),
            StockEntryError::NotFound(_) => ApiError::NotFound(err.to_string()),
        }
    }
}

impl From<MovementError> for ApiError {
    fn from(err: MovementError) -> Self {
        match err {
            MovementError::Database(e) => ApiError::Database(e),
            MovementError::Stock(e) => e.into(),
            MovementError::Validation(msg) => ApiError::BadRequest(msg),
            MovementError::NotFound(_) => ApiError::NotFound(err.to_string()),
            MovementError::GeneratedByJournal(_) => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<JournalError> for ApiError {
    fn from(err: JournalError) -> Self {
        match err {
            JournalError::Database(e) => ApiError::Database(e),
            JournalError::Stock(e) => e.into(),
            JournalError::Figures(e) => e.into(),
            JournalError::FutureDay(_) | JournalError::MissingParameters { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            JournalError::NotValidated(_) => ApiError::NotFound(err.to_string()),
            JournalError::AlreadyValidated(_)
            | JournalError::LaterDayValidated { .. }
            | JournalError::NotLatest { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Database(e) => ApiError::Database(e),
            ReportError::Figures(e) => e.into(),
            ReportError::Journal(e) => e.into(),
            ReportError::NotFound(_) => ApiError::NotFound(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
