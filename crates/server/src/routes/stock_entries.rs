use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::{
    DateRange,
    stock_entry::{Ebe, EbeWithLines},
};
use services::services::stock_entry::{CreateStockEntry, StockEntryService};
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    deployment::Deployment,
    error::ApiError,
    extract::{AppJson, AppPath, AppQuery},
};

/// GET /api/entrees-stock?du=&au=
pub async fn list_stock_entries(
    State(deployment): State<DeploymentImpl>,
    AppQuery(range): AppQuery<DateRange>,
) -> Result<ResponseJson<ApiResponse<Vec<Ebe>>>, ApiError> {
    let entries = StockEntryService::list(&deployment.db().pool, &range).await?;
    Ok(ResponseJson(ApiResponse::success(entries)))
}

pub async fn create_stock_entry(
    State(deployment): State<DeploymentImpl>,
    AppJson(payload): AppJson<CreateStockEntry>,
) -> Result<ResponseJson<ApiResponse<EbeWithLines>>, ApiError> {
    let entry = StockEntryService::create(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(entry)))
}

pub async fn get_stock_entry(
    State(deployment): State<DeploymentImpl>,
    AppPath(id): AppPath<i64>,
) -> Result<ResponseJson<ApiResponse<EbeWithLines>>, ApiError> {
    let entry = StockEntryService::find(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(entry)))
}

/// DELETE /api/entrees-stock/{id}
///
/// Takes the received quantities back out of stock before removing the document.
pub async fn delete_stock_entry(
    State(deployment): State<DeploymentImpl>,
    AppPath(id): AppPath<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    StockEntryService::delete(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/entrees-stock",
        Router::new()
            .route("/", get(list_stock_entries).post(create_stock_entry))
            .route("/{id}", get(get_stock_entry).delete(delete_stock_entry)),
    )
}
