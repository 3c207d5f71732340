use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::paramaitre::{Paramaitre, UpdateParamaitre};
use services::services::catalog::CatalogService;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, deployment::Deployment, error::ApiError, extract::AppJson};

pub async fn get_settings(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Paramaitre>>, ApiError> {
    let settings = Paramaitre::get(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(settings)))
}

pub async fn update_settings(
    State(deployment): State<DeploymentImpl>,
    AppJson(payload): AppJson<UpdateParamaitre>,
) -> Result<ResponseJson<ApiResponse<Paramaitre>>, ApiError> {
    let settings = CatalogService::update_settings(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(settings)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/paramaitre", get(get_settings).put(update_settings))
}
