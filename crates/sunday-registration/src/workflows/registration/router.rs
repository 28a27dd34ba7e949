use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::RegistrationForm;
use super::repository::{DashboardPublisher, Notifier, RegistrationStore};
use super::service::{RegistrationService, RegistrationServiceError};

type SharedService<S, N, P> = Arc<RegistrationService<S, N, P>>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DashboardQuery {
    #[serde(default)]
    community: Option<String>,
    #[serde(default)]
    year: Option<i32>,
}

/// Router builder exposing the form helper, intake, and dashboard endpoints.
pub fn registration_router<S, N, P>(service: SharedService<S, N, P>) -> Router
where
    S: RegistrationStore + 'static,
    N: Notifier + 'static,
    P: DashboardPublisher + 'static,
{
    Router::new()
        .route("/api/v1/registration/sunday", get(sunday_handler::<S, N, P>))
        .route("/api/v1/registrations", post(submit_handler::<S, N, P>))
        .route("/api/v1/dashboards/monthly", get(monthly_handler::<S, N, P>))
        .route("/api/v1/dashboards/yearly", get(yearly_handler::<S, N, P>))
        .route("/api/v1/dashboards/sundays", get(sundays_handler::<S, N, P>))
        .with_state(service)
}

pub(crate) async fn sunday_handler<S, N, P>(
    State(service): State<SharedService<S, N, P>>,
) -> Response
where
    S: RegistrationStore + 'static,
    N: Notifier + 'static,
    P: DashboardPublisher + 'static,
{
    (StatusCode::OK, Json(service.upcoming_sunday(Utc::now()))).into_response()
}

pub(crate) async fn submit_handler<S, N, P>(
    State(service): State<SharedService<S, N, P>>,
    payload: Result<Json<RegistrationForm>, JsonRejection>,
) -> Response
where
    S: RegistrationStore + 'static,
    N: Notifier + 'static,
    P: DashboardPublisher + 'static,
{
    let form = match payload {
        Ok(Json(form)) => form,
        Err(rejection) => return rejection_response(FORM_REJECTED, rejection.body_text()),
    };

    match service.submit(form, Utc::now()) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => failure_response(&err),
    }
}

pub(crate) async fn monthly_handler<S, N, P>(
    State(service): State<SharedService<S, N, P>>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> Response
where
    S: RegistrationStore + 'static,
    N: Notifier + 'static,
    P: DashboardPublisher + 'static,
{
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return rejection_response(QUERY_REJECTED, rejection.body_text()),
    };

    match service.monthly_aggregate(query.community.as_deref(), Utc::now()) {
        Ok(row) => (StatusCode::OK, Json(row)).into_response(),
        Err(err) => failure_response(&err),
    }
}

pub(crate) async fn yearly_handler<S, N, P>(
    State(service): State<SharedService<S, N, P>>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> Response
where
    S: RegistrationStore + 'static,
    N: Notifier + 'static,
    P: DashboardPublisher + 'static,
{
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return rejection_response(QUERY_REJECTED, rejection.body_text()),
    };

    match service.yearly_aggregate(query.community.as_deref(), query.year, Utc::now()) {
        Ok(yearly) => (StatusCode::OK, Json(yearly)).into_response(),
        Err(err) => failure_response(&err),
    }
}

pub(crate) async fn sundays_handler<S, N, P>(
    State(service): State<SharedService<S, N, P>>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> Response
where
    S: RegistrationStore + 'static,
    N: Notifier + 'static,
    P: DashboardPublisher + 'static,
{
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return rejection_response(QUERY_REJECTED, rejection.body_text()),
    };

    match service.sunday_aggregate(query.community.as_deref()) {
        Ok(aggregate) => (StatusCode::OK, Json(aggregate)).into_response(),
        Err(err) => failure_response(&err),
    }
}

const FORM_REJECTED: &str = "Please check the registration details and try again.";
const QUERY_REJECTED: &str = "Please check the dashboard filters and try again.";

fn rejection_response(message: &str, detail: String) -> Response {
    let payload = json!({
        "success": false,
        "message": message,
        "detail": detail,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
}

fn failure_response(err: &RegistrationServiceError) -> Response {
    let status = match err {
        RegistrationServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RegistrationServiceError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let payload = json!({
        "success": false,
        "message": err.user_message(),
        "detail": err.to_string(),
    });
    (status, Json(payload)).into_response()
}
