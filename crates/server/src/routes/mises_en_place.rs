use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::mise_en_place::{
    CreateMiseEnPlace, LotStatusFilter, MiseEnPlace, UpdateMiseEnPlace,
};
use serde::Deserialize;
use services::services::placement::{CloseLot, PlacementService};
use utils::response::ApiResponse;

use super::paramsouches;
use crate::{
    DeploymentImpl,
    deployment::Deployment,
    error::ApiError,
    extract::{AppJson, AppPath, AppQuery},
};

#[derive(Debug, Default, Deserialize)]
pub struct LotListQuery {
    #[serde(default)]
    pub statut: LotStatusFilter,
}

/// GET /api/mises-en-place?statut=ouvert|cloture|tous
pub async fn list_lots(
    State(deployment): State<DeploymentImpl>,
    AppQuery(query): AppQuery<LotListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<MiseEnPlace>>>, ApiError> {
    let lots = PlacementService::list(&deployment.db().pool, query.statut).await?;
    Ok(ResponseJson(ApiResponse::success(lots)))
}

pub async fn create_lot(
    State(deployment): State<DeploymentImpl>,
    AppJson(payload): AppJson<CreateMiseEnPlace>,
) -> Result<ResponseJson<ApiResponse<MiseEnPlace>>, ApiError> {
    let lot = PlacementService::create(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(lot)))
}

pub async fn get_lot(
    State(deployment): State<DeploymentImpl>,
    AppPath(num_mvt): AppPath<String>,
) -> Result<ResponseJson<ApiResponse<MiseEnPlace>>, ApiError> {
    let lot = PlacementService::find(&deployment.db().pool, &num_mvt).await?;
    Ok(ResponseJson(ApiResponse::success(lot)))
}

pub async fn update_lot(
    State(deployment): State<DeploymentImpl>,
    AppPath(num_mvt): AppPath<String>,
    AppJson(payload): AppJson<UpdateMiseEnPlace>,
) -> Result<ResponseJson<ApiResponse<MiseEnPlace>>, ApiError> {
    let lot = PlacementService::update(&deployment.db().pool, &num_mvt, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(lot)))
}

pub async fn delete_lot(
    State(deployment): State<DeploymentImpl>,
    AppPath(num_mvt): AppPath<String>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    PlacementService::delete(&deployment.db().pool, &num_mvt).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/mises-en-place/{num_mvt}/cloture
pub async fn close_lot(
    State(deployment): State<DeploymentImpl>,
    AppPath(num_mvt): AppPath<String>,
    AppJson(payload): AppJson<CloseLot>,
) -> Result<ResponseJson<ApiResponse<MiseEnPlace>>, ApiError> {
    let lot = PlacementService::close(&deployment.db().pool, &num_mvt, &payload).await?;
    tracing::info!(num_mvt = %num_mvt, date_cloture = %payload.date_cloture, "Lot closed");
    Ok(ResponseJson(ApiResponse::success(lot)))
}

/// POST /api/mises-en-place/{num_mvt}/reouverture
pub async fn reopen_lot(
    State(deployment): State<DeploymentImpl>,
    AppPath(num_mvt): AppPath<String>,
) -> Result<ResponseJson<ApiResponse<MiseEnPlace>>, ApiError> {
    let lot = PlacementService::reopen(&deployment.db().pool, &num_mvt).await?;
    tracing::info!(num_mvt = %num_mvt, "Lot reopened");
    Ok(ResponseJson(ApiResponse::success(lot)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/mises-en-place",
        Router::new()
            .route("/", get(list_lots).post(create_lot))
            .route("/{num_mvt}", get(get_lot).put(update_lot).delete(delete_lot))
            .route("/{num_mvt}/cloture", post(close_lot))
            .route("/{num_mvt}/reouverture", post(reopen_lot))
            .merge(paramsouches::router(deployment)),
    )
}
