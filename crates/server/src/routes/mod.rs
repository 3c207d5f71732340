use axum::{Router, http::HeaderValue};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{DeploymentImpl, deployment::Deployment};

pub mod articles;
pub mod batiments;
pub mod health;
pub mod journal;
pub mod mises_en_place;
pub mod movements;
pub mod paramaitre;
pub mod paramsouches;
pub mod reports;
pub mod stock_entries;

/// Builds the `/api` router with tracing and CORS layers applied.
pub fn router(deployment: DeploymentImpl) -> Router {
    let api = Router::new()
        .merge(health::router(&deployment))
        .merge(batiments::router(&deployment))
        .merge(articles::router(&deployment))
        .merge(paramaitre::router(&deployment))
        .merge(mises_en_place::router(&deployment))
        .merge(stock_entries::router(&deployment))
        .merge(movements::router(&deployment))
        .merge(journal::router(&deployment))
        .merge(reports::router(&deployment));

    let cors = cors_layer(&deployment.config().cors_allowed_origins);

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use db::DBService;
    use sqlx::mysql::MySqlPoolOptions;
    use tower::ServiceExt;
    use utils::logging::LogFormat;

    use super::*;
    use crate::{config::Config, deployment::LocalDeployment};

    // Nothing listens on port 1; any handler that reaches the pool fails.
    fn app() -> Router {
        let pool = MySqlPoolOptions::new()
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy("mysql://root@127.0.0.1:1/ferme")
            .unwrap();
        let config = Config {
            database_url: "mysql://root@127.0.0.1:1/ferme".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            max_connections: 1,
            run_migrations: false,
            cors_allowed_origins: Vec::new(),
            log_format: LogFormat::Text,
            sentry_dsn: None,
        };
        router(LocalDeployment::new(DBService::from_pool(pool), config))
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = app()
            .oneshot(Request::get("/api/poulaillers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_building_code_is_rejected() {
        let response = app()
            .oneshot(json_request(
                "POST",
                "/api/batiments",
                serde_json::json!({ "code": " ", "designation": "Poulailler 1", "capacite": 5000 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn malformed_day_in_path_is_rejected() {
        let response = app()
            .oneshot(
                Request::get("/api/journees/2026-13-45/apercu")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn stock_entry_without_lines_is_rejected() {
        let response = app()
            .oneshot(json_request(
                "POST",
                "/api/entrees-stock",
                serde_json::json!({ "date_bon": "2026-03-02", "fournisseur": "Provenderie", "lignes": [] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn manual_entry_needs_a_price() {
        let response = app()
            .oneshot(json_request(
                "POST",
                "/api/mouvements",
                serde_json::json!({
                    "date_mvt": "2026-03-02",
                    "lignes": [{ "code_article": "ALIM", "sens": "entree", "quantite": "100" }]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn future_day_cannot_be_validated() {
        let tomorrow = chrono::Local::now().date_naive() + chrono::Duration::days(1);
        let response = app()
            .oneshot(json_request(
                "POST",
                &format!("/api/journees/{tomorrow}/validation"),
                serde_json::json!({ "utilisateur": "gerant" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn vat_rate_above_hundred_is_rejected() {
        let response = app()
            .oneshot(json_request(
                "PUT",
                "/api/paramaitre",
                serde_json::json!({
                    "raison_sociale": "Ferme avicole",
                    "taux_tva": "150",
                    "gestion_stock": true,
                    "stock_negatif": false,
                    "code_depot": "DEP01",
                    "prix_oeuf_commercial": "0.12",
                    "prix_oeuf_declasse": "0.08"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_comes_back_in_the_envelope() {
        let request = Request::post("/api/articles")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"code\": "))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["data"], serde_json::Value::Null);
    }

    #[test]
    fn invalid_cors_origins_are_skipped() {
        // Building the layer must not panic on a bad header value.
        let _ = cors_layer(&["http://localhost:5173".to_string(), "bad\norigin".to_string()]);
    }
}
