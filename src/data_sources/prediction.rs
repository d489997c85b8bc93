//! Client for the external analytics / prediction service.
//!
//! The service owns case forecasting, overload-risk scoring and
//! recommendation generation. Wardwatch only fetches the results for display;
//! none of them feed the threshold alert rules.
//!
//! # Endpoints
//!
//! - `GET /dengue/predict?weeks=N` - forecasted case counts with confidence bounds
//! - `GET /overload/overload_risk` - risk label, days to overload, critical resources
//! - `POST /llm/recommendation` - free-text recommendations

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Client for querying the prediction service.
#[derive(Clone)]
pub struct PredictionClient {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl PredictionClient {
    /// Create a new prediction client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Service root, e.g. "http://localhost:8002/api"
    /// * `api_token` - Optional bearer token
    pub fn new(base_url: &str, api_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        }
    }

    /// Attach the bearer token, if any.
    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.api_token {
            req.header("Authorization", format!("Bearer {}", token))
        } else {
            req
        }
    }

    /// Fetch the case forecast for the next `weeks` weeks.
    pub async fn get_forecast(&self, weeks: u32) -> anyhow::Result<ForecastResponse> {
        let url = format!("{}/dengue/predict?weeks={}", self.base_url, weeks);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await?
            .error_for_status()?;
        let forecast = response.json::<Vec<ForecastPoint>>().await?;
        Ok(ForecastResponse { forecast })
    }

    /// Fetch the current overload-risk assessment.
    pub async fn get_overload_risk(&self) -> anyhow::Result<OverloadRisk> {
        let url = format!("{}/overload/overload_risk", self.base_url);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await?
            .error_for_status()?;
        let data = response.json::<OverloadRisk>().await?;
        Ok(data)
    }

    /// Request recommendations for the current overload situation.
    pub async fn get_recommendations(&self) -> anyhow::Result<Recommendations> {
        let url = format!("{}/llm/recommendation", self.base_url);

        let response = self
            .authorize(self.client.post(&url))
            .send()
            .await?
            .error_for_status()?;
        let data = response.json::<Recommendations>().await?;
        Ok(data)
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Forecast horizon. The service returns the points as a bare JSON array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub forecast: Vec<ForecastPoint>,
}

impl ForecastResponse {
    /// Sum of predicted cases across the forecast horizon.
    pub fn total_predicted(&self) -> f64 {
        self.forecast.iter().map(|p| p.predicted).sum()
    }
}

/// A single forecasted week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Week-ending date the prediction applies to.
    #[serde(alias = "prediction_date")]
    pub date: NaiveDate,

    /// Predicted case count.
    #[serde(alias = "cases_predicted")]
    pub predicted: f64,

    /// Lower confidence bound.
    #[serde(default, alias = "lower_ci")]
    pub lower: Option<f64>,

    /// Upper confidence bound.
    #[serde(default, alias = "upper_ci")]
    pub upper: Option<f64>,
}

/// Qualitative overload risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[serde(alias = "Low")]
    Low,
    #[serde(alias = "Moderate")]
    Moderate,
    #[serde(alias = "High")]
    High,
}

/// Response from the overload-risk endpoint.
///
/// Informational only. This is a separate signal from the threshold alerts
/// raised by [`crate::metrics::evaluate_alerts`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverloadRisk {
    pub risk: RiskLevel,

    /// Estimated days until capacity runs out, if overload is expected.
    #[serde(default)]
    pub days_to_overload: Option<u32>,

    /// Resources whose forecast demand exceeds availability.
    #[serde(default)]
    pub critical_resources: Vec<String>,
}

impl OverloadRisk {
    pub fn is_overload_expected(&self) -> bool {
        self.risk > RiskLevel::Low || !self.critical_resources.is_empty()
    }
}

/// Response from the recommendation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendations {
    #[serde(default)]
    pub recommendations: Vec<String>,

    #[serde(default)]
    pub explanation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overload_risk_accepts_capitalized_labels() {
        let risk: OverloadRisk = serde_json::from_str(
            r#"{"risk": "High", "critical_resources": ["icu_beds", "ventilators", "nurses"], "days_to_overload": 7}"#,
        )
        .unwrap();

        assert_eq!(risk.risk, RiskLevel::High);
        assert_eq!(risk.days_to_overload, Some(7));
        assert_eq!(risk.critical_resources.len(), 3);
        assert!(risk.is_overload_expected());
    }

    #[test]
    fn test_low_risk() {
        let risk: OverloadRisk = serde_json::from_str(
            r#"{"risk": "low", "critical_resources": [], "days_to_overload": null}"#,
        )
        .unwrap();

        assert_eq!(risk.risk, RiskLevel::Low);
        assert!(risk.days_to_overload.is_none());
        assert!(!risk.is_overload_expected());
    }

    #[test]
    fn test_forecast_field_aliases() {
        let points: Vec<ForecastPoint> = serde_json::from_str(
            r#"[
                {"prediction_date": "2024-07-14", "cases_predicted": 120.5, "lower_ci": 102.4, "upper_ci": 138.6, "forecast_date": "2024-07-10"},
                {"date": "2024-07-21", "predicted": 80.0}
            ]"#,
        )
        .unwrap();
        let forecast = ForecastResponse { forecast: points };

        assert_eq!(forecast.forecast.len(), 2);
        assert_eq!(forecast.forecast[0].lower, Some(102.4));
        assert_eq!(forecast.forecast[0].upper, Some(138.6));
        assert_eq!(forecast.forecast[1].lower, None);
        assert!((forecast.total_predicted() - 200.5).abs() < 0.001);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = PredictionClient::new("http://localhost:8002/api/", None);
        assert_eq!(client.base_url, "http://localhost:8002/api");
    }
}
