//! HTTP API handlers for Wardwatch.
//!
//! - **POST /resources**: parse, validate and store a resource record
//! - **POST /resources/preview**: same checks, returns derived values without storing
//! - **GET /resources/latest**: latest snapshot with derived metrics and alerts
//! - **GET /resources/trend**: utilization trend over recent days
//! - **GET /dashboard**: local snapshot combined with the prediction service
//! - **GET /health**: health check

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::aggregation::{compute_trend, latest_snapshot};
use crate::dashboard::{Dashboard, DashboardResponse};
use crate::error::ValidationError;
use crate::metrics::{ValidRecord, parse_form, snapshot, validate};
use crate::model::{ErrorResponse, ResourceForm, ResourceSnapshot, TrendQuery, TrendResponse};
use crate::storage::Storage;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub dashboard: Option<Dashboard>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/resources", post(post_resources))
        .route("/resources/preview", post(preview_resources))
        .route("/resources/latest", get(get_latest))
        .route("/resources/trend", get(get_trend))
        .route("/dashboard", get(get_dashboard))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Rejection for a submission that failed parsing or validation.
fn unprocessable(error: &ValidationError) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            error: error.to_string(),
            field: error.field().to_string(),
        }),
    )
        .into_response()
}

fn accept(form: &ResourceForm) -> Result<ValidRecord, ValidationError> {
    parse_form(form).and_then(validate)
}

/// POST /resources - Submit a resource record.
///
/// # Request Body
///
/// ```json
/// {
///     "date": "2024-01-07",
///     "total_beds": 150,
///     "available_beds": "32",
///     ...
/// }
/// ```
///
/// Counts may be JSON numbers or numeric strings.
///
/// # Response
///
/// `201 Created` with the derived snapshot, or `422 Unprocessable Entity` with
/// `{"error": ..., "field": ...}` naming the first offending field or pair.
#[instrument(skip(state, form))]
pub async fn post_resources(
    State(state): State<AppState>,
    Json(form): Json<ResourceForm>,
) -> Response {
    let valid = match accept(&form) {
        Ok(valid) => valid,
        Err(e) => {
            info!(field = e.field(), error = %e, "Resource record rejected");
            return unprocessable(&e);
        }
    };

    if let Err(e) = state.storage.insert_record(valid.record()).await {
        warn!(date = %valid.record().date, error = %e, "Failed to store resource record");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let snapshot = snapshot(valid);
    info!(
        date = %snapshot.record.date,
        alert_count = snapshot.alerts.len(),
        "Resource record stored"
    );

    (StatusCode::CREATED, Json(snapshot)).into_response()
}

/// POST /resources/preview - Derive values for a form without storing it.
#[instrument(skip(form))]
pub async fn preview_resources(Json(form): Json<ResourceForm>) -> Response {
    match accept(&form) {
        Ok(valid) => Json(snapshot(valid)).into_response(),
        Err(e) => unprocessable(&e),
    }
}

/// GET /resources/latest - Latest snapshot.
///
/// Returns `404 Not Found` if no record has been reported.
#[instrument(skip(state))]
pub async fn get_latest(
    State(state): State<AppState>,
) -> Result<Json<ResourceSnapshot>, StatusCode> {
    match latest_snapshot(&state.storage).await {
        Ok(Some(snapshot)) => {
            info!(
                date = %snapshot.record.date,
                alert_count = snapshot.alerts.len(),
                "Latest resources queried"
            );
            Ok(Json(snapshot))
        }
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            warn!(error = %e, "Failed to load latest resources");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /resources/trend - Utilization trend.
///
/// # Query Parameters
///
/// - `days` (optional): Lookback window in days (default: 30)
#[instrument(skip(state))]
pub async fn get_trend(
    State(state): State<AppState>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendResponse>, StatusCode> {
    let today = Utc::now().date_naive();

    match compute_trend(&state.storage, query.days, today).await {
        Ok(response) => {
            info!(
                days = query.days,
                points = response.points.len(),
                days_with_alerts = response.days_with_alerts,
                "Trend queried"
            );
            Ok(Json(response))
        }
        Err(e) => {
            warn!(days = query.days, error = %e, "Failed to compute trend");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /dashboard - Local snapshot combined with remote predictions.
///
/// Returns `503 Service Unavailable` if no prediction service is configured.
#[instrument(skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, StatusCode> {
    let dashboard = state.dashboard.as_ref().ok_or_else(|| {
        warn!("Dashboard not configured");
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    let response = dashboard.get_dashboard(&state.storage).await;
    info!(
        alert_count = response.summary.alert_count,
        overload_expected = response.summary.overload_expected,
        error_count = response.errors.len(),
        "Dashboard queried"
    );

    Ok(Json(response))
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
