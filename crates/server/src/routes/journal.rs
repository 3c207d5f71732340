use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use chrono::NaiveDate;
use db::models::journee::Journee;
use serde::Deserialize;
use services::services::journal::{
    DayReopenReport, DayStatus, DaySummary, DayValidationReport, JournalService, ValidateDay,
};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    deployment::Deployment,
    error::ApiError,
    extract::{AppJson, AppPath, AppQuery},
};

const DEFAULT_DAY_LIMIT: i64 = 60;
const MAX_DAY_LIMIT: i64 = 366;

#[derive(Debug, Default, Deserialize)]
pub struct DayListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize, TS)]
pub struct ValidateDayRequest {
    #[serde(default)]
    pub utilisateur: Option<String>,
}

/// GET /api/journees?limit=
pub async fn list_days(
    State(deployment): State<DeploymentImpl>,
    AppQuery(query): AppQuery<DayListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Journee>>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_DAY_LIMIT).clamp(1, MAX_DAY_LIMIT);
    let days = JournalService::list_days(&deployment.db().pool, limit).await?;
    Ok(ResponseJson(ApiResponse::success(days)))
}

pub async fn get_day(
    State(deployment): State<DeploymentImpl>,
    AppPath(jour): AppPath<NaiveDate>,
) -> Result<ResponseJson<ApiResponse<DayStatus>>, ApiError> {
    let status = JournalService::status(&deployment.db().pool, jour).await?;
    Ok(ResponseJson(ApiResponse::success(status)))
}

/// GET /api/journees/{jour}/apercu
pub async fn preview_day(
    State(deployment): State<DeploymentImpl>,
    AppPath(jour): AppPath<NaiveDate>,
) -> Result<ResponseJson<ApiResponse<DaySummary>>, ApiError> {
    let summary = JournalService::preview(&deployment.db().pool, jour).await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

/// POST /api/journees/{jour}/validation
pub async fn validate_day(
    State(deployment): State<DeploymentImpl>,
    AppPath(jour): AppPath<NaiveDate>,
    AppJson(payload): AppJson<ValidateDayRequest>,
) -> Result<ResponseJson<ApiResponse<DayValidationReport>>, ApiError> {
    let today = chrono::Local::now().date_naive();
    let report = JournalService::validate_day(
        &deployment.db().pool,
        ValidateDay {
            jour,
            utilisateur: payload.utilisateur,
        },
        today,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// DELETE /api/journees/{jour}/validation
pub async fn reopen_day(
    State(deployment): State<DeploymentImpl>,
    AppPath(jour): AppPath<NaiveDate>,
) -> Result<ResponseJson<ApiResponse<DayReopenReport>>, ApiError> {
    let report = JournalService::reopen_day(&deployment.db().pool, jour).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/journees",
        Router::new()
            .route("/", get(list_days))
            .route("/{jour}", get(get_day))
            .route("/{jour}/apercu", get(preview_day))
            .route("/{jour}/validation", post(validate_day).delete(reopen_day)),
    )
}
