use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use sunday_registration::workflows::registration::{
    registration_router, DashboardPublisher, Notifier, RegistrationService, RegistrationStore,
};

pub(crate) fn with_registration_routes<S, N, P>(
    service: Arc<RegistrationService<S, N, P>>,
) -> axum::Router
where
    S: RegistrationStore + 'static,
    N: Notifier + 'static,
    P: DashboardPublisher + 'static,
{
    registration_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryDashboardBoard, InMemoryRegistrationStore, TracingNotifier};
    use axum::body::Body;
    use axum::http::Request;
    use sunday_registration::workflows::registration::RegistrationSettings;
    use tower::ServiceExt;

    fn router() -> axum::Router {
        let service = RegistrationService::new(
            Arc::new(InMemoryRegistrationStore::default()),
            Arc::new(TracingNotifier::default()),
            Arc::new(InMemoryDashboardBoard::default()),
            RegistrationSettings::default(),
        );
        with_registration_routes(Arc::new(service))
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn registration_routes_are_mounted_alongside_health() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/dashboards/sundays")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
