use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use chrono::NaiveDate;
use services::services::reports::{DailyReport, LotReport, ReportService, StockReport};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, deployment::Deployment, error::ApiError, extract::AppPath};

/// GET /api/rapports/journalier/{jour}
pub async fn daily_report(
    State(deployment): State<DeploymentImpl>,
    AppPath(jour): AppPath<NaiveDate>,
) -> Result<ResponseJson<ApiResponse<DailyReport>>, ApiError> {
    let report = ReportService::daily_report(&deployment.db().pool, jour).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// GET /api/rapports/lots/{num_mvt}
pub async fn lot_report(
    State(deployment): State<DeploymentImpl>,
    AppPath(num_mvt): AppPath<String>,
) -> Result<ResponseJson<ApiResponse<LotReport>>, ApiError> {
    let report = ReportService::lot_report(&deployment.db().pool, &num_mvt).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub async fn stock_report(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<StockReport>>, ApiError> {
    let report = ReportService::stock_report(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/rapports",
        Router::new()
            .route("/journalier/{jour}", get(daily_report))
            .route("/lots/{num_mvt}", get(lot_report))
            .route("/stock", get(stock_report)),
    )
}
