//! Integration tests for the dashboard against a stub prediction service.

use axum::{Json, Router, http::StatusCode, routing::get, routing::post};
use axum_test::TestServer;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use wardwatch::api::{AppState, router};
use wardwatch::dashboard::{Dashboard, DashboardConfig};
use wardwatch::storage::Storage;

/// Serve a stub prediction service on a random local port.
async fn spawn_prediction_stub(overload_fails: bool) -> String {
    let overload = if overload_fails {
        get(|| async { StatusCode::NOT_FOUND })
    } else {
        get(|| async {
            Json(json!({
                "risk": "High",
                "days_to_overload": 7,
                "critical_resources": ["icu_beds", "ventilators", "nurses"]
            }))
        })
    };

    let app = Router::new()
        .route(
            "/dengue/predict",
            get(|| async {
                Json(json!([
                    {
                        "prediction_date": "2024-01-14",
                        "cases_predicted": 120.0,
                        "lower_ci": 102.0,
                        "upper_ci": 138.0,
                        "forecast_date": "2024-01-08"
                    }
                ]))
            }),
        )
        .route("/overload/overload_risk", overload)
        .route(
            "/llm/recommendation",
            post(|| async {
                Json(json!({
                    "recommendations": ["1. Open surge ward"],
                    "explanation": "ICU demand exceeds supply."
                }))
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn create_test_server(prediction_url: String) -> TestServer {
    let storage = Storage::new("sqlite::memory:").await.unwrap();
    let dashboard = Dashboard::new(DashboardConfig {
        prediction_base_url: prediction_url,
        ..DashboardConfig::default()
    });

    TestServer::new(router(AppState {
        storage,
        dashboard: Some(dashboard),
    }))
    .unwrap()
}

fn strained_body() -> Value {
    json!({
        "date": "2024-01-07",
        "total_beds": 150,
        "available_beds": 10,
        "icu_beds": 25,
        "available_icu_beds": 12,
        "total_ventilators": 15,
        "available_ventilators": 8,
        "total_oxygen_cylinders": 50,
        "available_oxygen_cylinders": 36,
        "total_doctors": 12,
        "available_doctors": 11,
        "total_nurses": 35,
        "available_nurses": 32,
        "total_icu_nurses": 8,
        "available_icu_nurses": 7
    })
}

#[tokio::test]
async fn test_dashboard_combines_sources() {
    let url = spawn_prediction_stub(false).await;
    let server = create_test_server(url).await;

    server
        .post("/resources")
        .json(&strained_body())
        .await
        .assert_status(StatusCode::CREATED);

    let response = server.get("/dashboard").await;

    response.assert_status_ok();
    let body: Value = response.json();

    assert!(body["errors"].as_array().unwrap().is_empty());
    assert_eq!(body["resources"]["alerts"].as_array().unwrap().len(), 1);
    assert_eq!(body["forecast"]["forecast"][0]["predicted"], 120.0);
    assert_eq!(body["forecast"]["forecast"][0]["lower"], 102.0);
    assert_eq!(body["forecast"]["forecast"][0]["upper"], 138.0);
    assert_eq!(body["overload_risk"]["risk"], "high");
    assert_eq!(body["recommendations"]["recommendations"][0], "1. Open surge ward");

    // Remote risk is reported on its own, not as a threshold alert.
    assert_eq!(body["summary"]["alert_count"], 1);
    assert_eq!(body["summary"]["critical_count"], 1);
    assert_eq!(body["summary"]["overload_expected"], true);
}

#[tokio::test]
async fn test_dashboard_reports_failed_source() {
    let url = spawn_prediction_stub(true).await;
    let server = create_test_server(url).await;

    let response = server.get("/dashboard").await;

    response.assert_status_ok();
    let body: Value = response.json();

    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["source"], "overload_risk");
    assert!(body["overload_risk"].is_null());
    assert!(body["resources"].is_null());
    assert_eq!(body["summary"]["overload_expected"], false);
    assert!(body["forecast"].is_object());
}
