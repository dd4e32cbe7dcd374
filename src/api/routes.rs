//! API Routes
//!
//! Route definitions for the card ledger HTTP surface.

use super::handlers::*;
use crate::config::ServerConfig;
use crate::core::CardEngine;
use axum::{
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the API router with all routes
pub fn create_router(engine: CardEngine, config: &ServerConfig) -> Router {
    Router::new()
        // Health
        .route("/health", get(health_check))
        // Card endpoints
        .route("/cards/{card_id}", get(get_card))
        .route("/cards/{card_id}/balance", put(adjust_balance))
        .route("/cards/{card_id}/used", post(mark_card_used))
        // Student endpoints
        .route("/students", post(create_student))
        .route(
            "/students/{student_id}",
            get(get_student).patch(update_student).delete(delete_student),
        )
        .route("/students/{student_id}/card", get(student_card))
        // Reclamation endpoints
        .route(
            "/reclamations",
            get(list_reclamations).post(create_reclamation),
        )
        .route("/reclamations/counts", get(reclamation_counts))
        .route("/reclamations/{id}", get(get_reclamation))
        .route("/reclamations/{id}/process", put(process_reclamation))
        // Audit endpoints
        .route(
            "/activity/{entity_type}/{entity_id}",
            get(entity_activity),
        )
        .with_state(engine)
        .layer(timeout_layer(config))
        .layer(TraceLayer::new_for_http())
}

/// Requests exceeding the configured timeout are answered with 408
fn timeout_layer(config: &ServerConfig) -> TimeoutLayer {
    TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.request_timeout_secs),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_router(CardEngine::default(), &ServerConfig::default());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = create_router(CardEngine::default(), &ServerConfig::default());

        let response = app
            .oneshot(Request::builder().uri("/accounts").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let config = ServerConfig {
            request_timeout_secs: 1,
            ..ServerConfig::default()
        };
        let app = Router::new()
            .route(
                "/slow",
                get(|| async { tokio::time::sleep(Duration::from_secs(30)).await }),
            )
            .layer(timeout_layer(&config));

        let response = app
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
