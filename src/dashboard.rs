//! Dashboard combining local resource metrics with the prediction service.
//!
//! A dashboard response has four independent sections:
//! - the latest resource snapshot (local, with threshold alerts)
//! - the case forecast
//! - the overload-risk assessment
//! - recommendations
//!
//! The remote sections are fetched concurrently. A failing source leaves its
//! section empty and is reported in `errors`; it never fails the whole view.
//!
//! # Usage
//!
//! ```ignore
//! let dashboard = Dashboard::new(config);
//! let response = dashboard.get_dashboard(&storage).await?;
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregation::latest_snapshot;
use crate::data_sources::PredictionClient;
use crate::data_sources::prediction::{ForecastResponse, OverloadRisk, Recommendations};
use crate::model::{AlertKind, ResourceSnapshot};
use crate::storage::Storage;

/// Dashboard configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Base URL of the prediction service.
    pub prediction_base_url: String,

    /// Bearer token for the prediction service (optional).
    pub prediction_token: Option<String>,

    /// Weeks of case forecast to request.
    pub forecast_weeks: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            prediction_base_url: "http://localhost:8002/api".to_string(),
            prediction_token: None,
            forecast_weeks: 4,
        }
    }
}

/// The source of a dashboard section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardSource {
    /// Local resource store.
    Resources,
    /// Remote case forecast.
    Forecast,
    /// Remote overload-risk assessment.
    OverloadRisk,
    /// Remote recommendations.
    Recommendations,
}

impl DashboardSource {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            DashboardSource::Resources => "Hospital resources",
            DashboardSource::Forecast => "Case forecast",
            DashboardSource::OverloadRisk => "Overload risk",
            DashboardSource::Recommendations => "Recommendations",
        }
    }
}

/// Dashboard for combining the local snapshot with remote predictions.
#[derive(Clone)]
pub struct Dashboard {
    config: Arc<DashboardConfig>,
    prediction: PredictionClient,
}

impl Dashboard {
    /// Create a new dashboard with the given configuration.
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            prediction: PredictionClient::new(
                &config.prediction_base_url,
                config.prediction_token.clone(),
            ),
            config: Arc::new(config),
        }
    }

    /// Build the full dashboard view.
    pub async fn get_dashboard(&self, storage: &Storage) -> DashboardResponse {
        let (resources_result, forecast_result, risk_result, recommendations_result) = tokio::join!(
            latest_snapshot(storage),
            self.prediction.get_forecast(self.config.forecast_weeks),
            self.prediction.get_overload_risk(),
            self.prediction.get_recommendations(),
        );

        let mut errors = Vec::new();

        let resources = collect(DashboardSource::Resources, resources_result, &mut errors).flatten();
        let forecast = collect(DashboardSource::Forecast, forecast_result, &mut errors);
        let overload_risk = collect(DashboardSource::OverloadRisk, risk_result, &mut errors);
        let recommendations = collect(
            DashboardSource::Recommendations,
            recommendations_result,
            &mut errors,
        );

        let summary = DashboardSummary::new(resources.as_ref(), overload_risk.as_ref());

        DashboardResponse {
            timestamp: Utc::now(),
            summary,
            resources,
            forecast,
            overload_risk,
            recommendations,
            errors,
        }
    }
}

fn collect<T>(
    source: DashboardSource,
    result: anyhow::Result<T>,
    errors: &mut Vec<SourceError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(source = source.label(), error = %e, "Dashboard source failed");
            errors.push(SourceError {
                source,
                message: e.to_string(),
            });
            None
        }
    }
}

/// Dashboard API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    /// When this response was generated.
    pub timestamp: DateTime<Utc>,

    /// Summary statistics.
    pub summary: DashboardSummary,

    /// Latest resource snapshot with threshold alerts, if any record exists.
    pub resources: Option<ResourceSnapshot>,

    /// Case forecast from the prediction service.
    pub forecast: Option<ForecastResponse>,

    /// Overload-risk assessment from the prediction service. Kept apart from
    /// `resources.alerts`: the two are independent signals.
    pub overload_risk: Option<OverloadRisk>,

    /// Recommendations from the prediction service.
    pub recommendations: Option<Recommendations>,

    /// Errors encountered while fetching from sources.
    #[serde(default)]
    pub errors: Vec<SourceError>,
}

/// Summary statistics for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Number of threshold alerts on the latest snapshot.
    pub alert_count: usize,

    /// Number of critical threshold alerts.
    pub critical_count: usize,

    /// Number of warning threshold alerts.
    pub warning_count: usize,

    /// Whether the prediction service expects an overload.
    pub overload_expected: bool,
}

impl DashboardSummary {
    pub fn new(resources: Option<&ResourceSnapshot>, overload_risk: Option<&OverloadRisk>) -> Self {
        let alerts = resources.map(|s| s.alerts.as_slice()).unwrap_or_default();

        let critical_count = alerts
            .iter()
            .filter(|a| a.kind == AlertKind::Critical)
            .count();

        Self {
            alert_count: alerts.len(),
            critical_count,
            warning_count: alerts.len() - critical_count,
            overload_expected: overload_risk.is_some_and(OverloadRisk::is_overload_expected),
        }
    }
}

/// Error from a data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceError {
    pub source: DashboardSource,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sources::prediction::RiskLevel;
    use crate::metrics::{snapshot, validate};
    use crate::model::ResourceRecord;
    use chrono::NaiveDate;

    fn strained_snapshot() -> ResourceSnapshot {
        let record = ResourceRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            total_beds: 150,
            available_beds: 10,
            icu_beds: 25,
            available_icu_beds: 2,
            total_ventilators: 15,
            available_ventilators: 8,
            total_oxygen_cylinders: 50,
            available_oxygen_cylinders: 36,
            total_doctors: 12,
            available_doctors: 11,
            total_nurses: 35,
            available_nurses: 32,
            total_icu_nurses: 8,
            available_icu_nurses: 7,
        };
        snapshot(validate(record).unwrap())
    }

    #[test]
    fn test_summary_counts_alert_kinds() {
        let snapshot = strained_snapshot();
        let summary = DashboardSummary::new(Some(&snapshot), None);

        assert_eq!(summary.alert_count, 2);
        assert_eq!(summary.critical_count, 1);
        assert_eq!(summary.warning_count, 1);
        assert!(!summary.overload_expected);
    }

    #[test]
    fn test_summary_keeps_overload_risk_separate() {
        let risk = OverloadRisk {
            risk: RiskLevel::Moderate,
            days_to_overload: Some(7),
            critical_resources: vec!["icu_beds".to_string()],
        };

        let summary = DashboardSummary::new(None, Some(&risk));

        assert_eq!(summary.alert_count, 0);
        assert!(summary.overload_expected);
    }

    #[test]
    fn test_collect_records_errors() {
        let mut errors = Vec::new();

        let ok: Option<u32> = collect(DashboardSource::Forecast, Ok(3), &mut errors);
        let failed: Option<u32> = collect(
            DashboardSource::OverloadRisk,
            Err(anyhow::anyhow!("connection refused")),
            &mut errors,
        );

        assert_eq!(ok, Some(3));
        assert!(failed.is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].source, DashboardSource::OverloadRisk);
        assert!(errors[0].message.contains("connection refused"));
    }

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.forecast_weeks, 4);
        assert!(config.prediction_token.is_none());
    }
}
