use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::batiment::{Batiment, CreateBatiment, UpdateBatiment};
use services::services::catalog::CatalogService;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    deployment::Deployment,
    error::ApiError,
    extract::{AppJson, AppPath},
};

pub async fn list_batiments(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Batiment>>>, ApiError> {
    let batiments = Batiment::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(batiments)))
}

pub async fn create_batiment(
    State(deployment): State<DeploymentImpl>,
    AppJson(payload): AppJson<CreateBatiment>,
) -> Result<ResponseJson<ApiResponse<Batiment>>, ApiError> {
    let batiment = CatalogService::create_batiment(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(batiment)))
}

pub async fn get_batiment(
    State(deployment): State<DeploymentImpl>,
    AppPath(code): AppPath<String>,
) -> Result<ResponseJson<ApiResponse<Batiment>>, ApiError> {
    let batiment = Batiment::find_by_code(&deployment.db().pool, &code)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("batiment {code} not found")))?;
    Ok(ResponseJson(ApiResponse::success(batiment)))
}

pub async fn update_batiment(
    State(deployment): State<DeploymentImpl>,
    AppPath(code): AppPath<String>,
    AppJson(payload): AppJson<UpdateBatiment>,
) -> Result<ResponseJson<ApiResponse<Batiment>>, ApiError> {
    let batiment = CatalogService::update_batiment(&deployment.db().pool, &code, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(batiment)))
}

pub async fn delete_batiment(
    State(deployment): State<DeploymentImpl>,
    AppPath(code): AppPath<String>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    CatalogService::delete_batiment(&deployment.db().pool, &code).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/batiments",
        Router::new()
            .route("/", get(list_batiments).post(create_batiment))
            .route(
                "/{code}",
                get(get_batiment).put(update_batiment).delete(delete_batiment),
            ),
    )
}
