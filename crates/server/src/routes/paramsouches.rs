//! Daily parameters of a lot, mounted under `/mises-en-place`.

use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, put},
};
use chrono::NaiveDate;
use db::models::paramsouche::{Paramsouche, SaveParamsouche};
use services::services::placement::PlacementService;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    deployment::Deployment,
    error::ApiError,
    extract::{AppJson, AppPath},
};

pub async fn list_daily_params(
    State(deployment): State<DeploymentImpl>,
    AppPath(num_mvt): AppPath<String>,
) -> Result<ResponseJson<ApiResponse<Vec<Paramsouche>>>, ApiError> {
    let params = PlacementService::daily_params(&deployment.db().pool, &num_mvt).await?;
    Ok(ResponseJson(ApiResponse::success(params)))
}

/// PUT /api/mises-en-place/{num_mvt}/parametres/{jour}
pub async fn save_daily_params(
    State(deployment): State<DeploymentImpl>,
    AppPath((num_mvt, jour)): AppPath<(String, NaiveDate)>,
    AppJson(payload): AppJson<SaveParamsouche>,
) -> Result<ResponseJson<ApiResponse<Paramsouche>>, ApiError> {
    let params =
        PlacementService::save_daily_params(&deployment.db().pool, &num_mvt, jour, &payload)
            .await?;
    Ok(ResponseJson(ApiResponse::success(params)))
}

pub async fn delete_daily_params(
    State(deployment): State<DeploymentImpl>,
    AppPath((num_mvt, jour)): AppPath<(String, NaiveDate)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    PlacementService::delete_daily_params(&deployment.db().pool, &num_mvt, jour).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/{num_mvt}/parametres", get(list_daily_params))
        .route(
            "/{num_mvt}/parametres/{jour}",
            put(save_daily_params).delete(delete_daily_params),
        )
}
