use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::article::{Article, CreateArticle, UpdateArticle};
use services::services::catalog::CatalogService;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    deployment::Deployment,
    error::ApiError,
    extract::{AppJson, AppPath},
};

pub async fn list_articles(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Article>>>, ApiError> {
    let articles = Article::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(articles)))
}

pub async fn create_article(
    State(deployment): State<DeploymentImpl>,
    AppJson(payload): AppJson<CreateArticle>,
) -> Result<ResponseJson<ApiResponse<Article>>, ApiError> {
    let article = CatalogService::create_article(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(article)))
}

pub async fn get_article(
    State(deployment): State<DeploymentImpl>,
    AppPath(code): AppPath<String>,
) -> Result<ResponseJson<ApiResponse<Article>>, ApiError> {
    let article = Article::find_by_code(&deployment.db().pool, &code)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("article {code} not found")))?;
    Ok(ResponseJson(ApiResponse::success(article)))
}

pub async fn update_article(
    State(deployment): State<DeploymentImpl>,
    AppPath(code): AppPath<String>,
    AppJson(payload): AppJson<UpdateArticle>,
) -> Result<ResponseJson<ApiResponse<Article>>, ApiError> {
    let article = CatalogService::update_article(&deployment.db().pool, &code, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(article)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/articles",
        Router::new()
            .route("/", get(list_articles).post(create_article))
            .route("/{code}", get(get_article).put(update_article)),
    )
}
