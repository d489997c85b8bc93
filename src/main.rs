//! Wardwatch - hospital resource utilization and overload alerting.
//!
//! # API Endpoints
//!
//! - `POST /resources` - Submit a resource record
//! - `POST /resources/preview` - Derive metrics for a record without storing it
//! - `GET /resources/latest` - Latest snapshot with metrics and alerts
//! - `GET /resources/trend` - Utilization trend
//! - `GET /dashboard` - Snapshot combined with the prediction service
//! - `GET /health` - Health check
//!
//! # Configuration
//!
//! - `WARDWATCH_PORT` - Listen port (default 3000)
//! - `WARDWATCH_DATABASE_URL` - SQLite URL (default `sqlite:wardwatch.db?mode=rwc`)
//! - `WARDWATCH_PREDICTION_URL` - Prediction service base URL; `/dashboard` is disabled without it
//! - `WARDWATCH_PREDICTION_TOKEN` - Bearer token for the prediction service
//! - `WARDWATCH_FORECAST_WEEKS` - Forecast horizon in weeks (default 4)

use std::env;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use wardwatch::api::{AppState, router};
use wardwatch::dashboard::{Dashboard, DashboardConfig};
use wardwatch::storage::Storage;

/// Default port if not specified via environment variable.
const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
const DEFAULT_DB_PATH: &str = "sqlite:wardwatch.db?mode=rwc";

/// Default forecast horizon in weeks.
const DEFAULT_FORECAST_WEEKS: u32 = 4;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("wardwatch=info".parse()?))
        .init();

    // Load configuration from environment
    let port: u16 = env::var("WARDWATCH_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let db_url = env::var("WARDWATCH_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

    info!(port, db_url = %db_url, "Starting Wardwatch server");

    let storage = Storage::new(&db_url).await?;
    info!("Database initialized");

    let dashboard = match env::var("WARDWATCH_PREDICTION_URL") {
        Ok(base_url) => {
            let config = DashboardConfig {
                prediction_base_url: base_url,
                prediction_token: env::var("WARDWATCH_PREDICTION_TOKEN").ok(),
                forecast_weeks: env::var("WARDWATCH_FORECAST_WEEKS")
                    .ok()
                    .and_then(|w| w.parse().ok())
                    .unwrap_or(DEFAULT_FORECAST_WEEKS),
            };
            info!(
                prediction_url = %config.prediction_base_url,
                forecast_weeks = config.forecast_weeks,
                "Dashboard enabled"
            );
            Some(Dashboard::new(config))
        }
        Err(_) => {
            info!("WARDWATCH_PREDICTION_URL not set, dashboard disabled");
            None
        }
    };

    let state = AppState { storage, dashboard };

    // The dashboard frontend is served from its own origin.
    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Wardwatch is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
