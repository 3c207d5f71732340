use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::movement::{Emvt, EmvtWithLines, MovementFilter};
use services::services::movement::{CreateMovement, MovementService};
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    deployment::Deployment,
    error::ApiError,
    extract::{AppJson, AppPath, AppQuery},
};

/// GET /api/mouvements?du=&au=&num_mvt=&origine=
pub async fn list_movements(
    State(deployment): State<DeploymentImpl>,
    AppQuery(filter): AppQuery<MovementFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<Emvt>>>, ApiError> {
    let movements = MovementService::list(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(movements)))
}

pub async fn create_movement(
    State(deployment): State<DeploymentImpl>,
    AppJson(payload): AppJson<CreateMovement>,
) -> Result<ResponseJson<ApiResponse<EmvtWithLines>>, ApiError> {
    let movement = MovementService::create_manual(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(movement)))
}

pub async fn get_movement(
    State(deployment): State<DeploymentImpl>,
    AppPath(id): AppPath<i64>,
) -> Result<ResponseJson<ApiResponse<EmvtWithLines>>, ApiError> {
    let movement = MovementService::find(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(movement)))
}

pub async fn delete_movement(
    State(deployment): State<DeploymentImpl>,
    AppPath(id): AppPath<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    MovementService::delete_manual(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/mouvements",
        Router::new()
            .route("/", get(list_movements).post(create_movement))
            .route("/{id}", get(get_movement).delete(delete_movement)),
    )
}
