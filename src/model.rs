//! Data models for Wardwatch.
//!
//! A [`ResourceRecord`] is one hospital's reported resource snapshot for a
//! reporting day. Everything else in this module is either the raw form that
//! produces a record ([`ResourceForm`]) or a value derived from one
//! ([`DerivedMetrics`], [`ResourceUsage`], [`Alert`], [`ResourceSnapshot`]).
//! Derived values are recomputed on demand and never persisted.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One of the seven (available, total) resource pairs of a record.
///
/// The declaration order is the fixed order in which pairs are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourcePair {
    Beds,
    IcuBeds,
    Ventilators,
    Oxygen,
    Doctors,
    Nurses,
    IcuNurses,
}

impl ResourcePair {
    /// All pairs in validation order.
    pub const ALL: [ResourcePair; 7] = [
        ResourcePair::Beds,
        ResourcePair::IcuBeds,
        ResourcePair::Ventilators,
        ResourcePair::Oxygen,
        ResourcePair::Doctors,
        ResourcePair::Nurses,
        ResourcePair::IcuNurses,
    ];

    /// Machine-readable identifier, as reported in validation errors.
    pub fn name(&self) -> &'static str {
        match self {
            ResourcePair::Beds => "beds",
            ResourcePair::IcuBeds => "icu_beds",
            ResourcePair::Ventilators => "ventilators",
            ResourcePair::Oxygen => "oxygen",
            ResourcePair::Doctors => "doctors",
            ResourcePair::Nurses => "nurses",
            ResourcePair::IcuNurses => "icu_nurses",
        }
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ResourcePair::Beds => "beds",
            ResourcePair::IcuBeds => "ICU beds",
            ResourcePair::Ventilators => "ventilators",
            ResourcePair::Oxygen => "oxygen cylinders",
            ResourcePair::Doctors => "doctors",
            ResourcePair::Nurses => "nurses",
            ResourcePair::IcuNurses => "ICU nurses",
        }
    }

    /// Names of the (total, available) fields backing this pair.
    pub fn field_names(&self) -> (&'static str, &'static str) {
        match self {
            ResourcePair::Beds => ("total_beds", "available_beds"),
            ResourcePair::IcuBeds => ("icu_beds", "available_icu_beds"),
            ResourcePair::Ventilators => ("total_ventilators", "available_ventilators"),
            ResourcePair::Oxygen => ("total_oxygen_cylinders", "available_oxygen_cylinders"),
            ResourcePair::Doctors => ("total_doctors", "available_doctors"),
            ResourcePair::Nurses => ("total_nurses", "available_nurses"),
            ResourcePair::IcuNurses => ("total_icu_nurses", "available_icu_nurses"),
        }
    }
}

/// A hospital's reported resource counts for one reporting day.
///
/// For every pair, `available <= total` must hold before the record is handed
/// to [`derive`](crate::metrics::derive); [`validate`](crate::metrics::validate)
/// enforces it. Counts are unsigned, so non-negativity holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Reporting day.
    pub date: NaiveDate,

    pub total_beds: u32,
    pub available_beds: u32,

    /// Total ICU beds. Named without the `total_` prefix in the reporting format.
    pub icu_beds: u32,
    pub available_icu_beds: u32,

    pub total_ventilators: u32,
    pub available_ventilators: u32,

    pub total_oxygen_cylinders: u32,
    pub available_oxygen_cylinders: u32,

    pub total_doctors: u32,
    pub available_doctors: u32,

    pub total_nurses: u32,
    pub available_nurses: u32,

    pub total_icu_nurses: u32,
    pub available_icu_nurses: u32,
}

impl ResourceRecord {
    /// The `(available, total)` counts for a pair.
    pub fn counts(&self, pair: ResourcePair) -> (u32, u32) {
        match pair {
            ResourcePair::Beds => (self.available_beds, self.total_beds),
            ResourcePair::IcuBeds => (self.available_icu_beds, self.icu_beds),
            ResourcePair::Ventilators => (self.available_ventilators, self.total_ventilators),
            ResourcePair::Oxygen => (
                self.available_oxygen_cylinders,
                self.total_oxygen_cylinders,
            ),
            ResourcePair::Doctors => (self.available_doctors, self.total_doctors),
            ResourcePair::Nurses => (self.available_nurses, self.total_nurses),
            ResourcePair::IcuNurses => (self.available_icu_nurses, self.total_icu_nurses),
        }
    }
}

/// A single raw form value: HTML forms submit strings, API clients numbers.
///
/// Anything else (booleans, arrays, objects) lands in `Other` so the field
/// can be reported by name instead of failing the whole body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Number(serde_json::Number),
    Text(String),
    Other(serde_json::Value),
}

impl From<u32> for FormValue {
    fn from(value: u32) -> Self {
        FormValue::Number(value.into())
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Text(value.to_string())
    }
}

/// Request body for `POST /resources` and `POST /resources/preview`.
///
/// Field names match [`ResourceRecord`]. Every field is optional at the type
/// level; [`parse_form`](crate::metrics::parse_form) reports what is missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceForm {
    pub date: Option<String>,
    pub total_beds: Option<FormValue>,
    pub available_beds: Option<FormValue>,
    pub icu_beds: Option<FormValue>,
    pub available_icu_beds: Option<FormValue>,
    pub total_ventilators: Option<FormValue>,
    pub available_ventilators: Option<FormValue>,
    pub total_oxygen_cylinders: Option<FormValue>,
    pub available_oxygen_cylinders: Option<FormValue>,
    pub total_doctors: Option<FormValue>,
    pub available_doctors: Option<FormValue>,
    pub total_nurses: Option<FormValue>,
    pub available_nurses: Option<FormValue>,
    pub total_icu_nurses: Option<FormValue>,
    pub available_icu_nurses: Option<FormValue>,
}

impl ResourceForm {
    /// The raw `(total, available)` values for a pair.
    pub fn values(&self, pair: ResourcePair) -> (Option<&FormValue>, Option<&FormValue>) {
        let (total, available) = match pair {
            ResourcePair::Beds => (&self.total_beds, &self.available_beds),
            ResourcePair::IcuBeds => (&self.icu_beds, &self.available_icu_beds),
            ResourcePair::Ventilators => (&self.total_ventilators, &self.available_ventilators),
            ResourcePair::Oxygen => (
                &self.total_oxygen_cylinders,
                &self.available_oxygen_cylinders,
            ),
            ResourcePair::Doctors => (&self.total_doctors, &self.available_doctors),
            ResourcePair::Nurses => (&self.total_nurses, &self.available_nurses),
            ResourcePair::IcuNurses => (&self.total_icu_nurses, &self.available_icu_nurses),
        };
        (total.as_ref(), available.as_ref())
    }
}

impl From<&ResourceRecord> for ResourceForm {
    fn from(record: &ResourceRecord) -> Self {
        Self {
            date: Some(record.date.format("%Y-%m-%d").to_string()),
            total_beds: Some(record.total_beds.into()),
            available_beds: Some(record.available_beds.into()),
            icu_beds: Some(record.icu_beds.into()),
            available_icu_beds: Some(record.available_icu_beds.into()),
            total_ventilators: Some(record.total_ventilators.into()),
            available_ventilators: Some(record.available_ventilators.into()),
            total_oxygen_cylinders: Some(record.total_oxygen_cylinders.into()),
            available_oxygen_cylinders: Some(record.available_oxygen_cylinders.into()),
            total_doctors: Some(record.total_doctors.into()),
            available_doctors: Some(record.available_doctors.into()),
            total_nurses: Some(record.total_nurses.into()),
            available_nurses: Some(record.available_nurses.into()),
            total_icu_nurses: Some(record.total_icu_nurses.into()),
            available_icu_nurses: Some(record.available_icu_nurses.into()),
        }
    }
}

/// A utilization percentage, or the "not applicable" sentinel when the pool
/// it is measured against is empty.
///
/// Serializes as a JSON number or `null`. Callers must keep
/// [`Utilization::NotApplicable`] distinct from `0%`: an empty pool is not a
/// fully available one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Utilization {
    Percent(f64),
    NotApplicable,
}

impl Utilization {
    /// Compute `used / total * 100`, or the sentinel when `total` is zero.
    ///
    /// Multiplies before dividing so whole-number percentages come out exact.
    pub fn of(used: u32, total: u32) -> Self {
        if total == 0 {
            Utilization::NotApplicable
        } else {
            Utilization::Percent(f64::from(used) * 100.0 / f64::from(total))
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Utilization::Percent(pct) => Some(*pct),
            Utilization::NotApplicable => None,
        }
    }

    /// Strictly above `threshold`. The sentinel is never above anything.
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.percent().is_some_and(|pct| pct > threshold)
    }
}

/// One decimal place with a `%` suffix, or `-` for the sentinel.
impl fmt::Display for Utilization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Utilization::Percent(pct) => write!(f, "{:.1}%", pct),
            Utilization::NotApplicable => f.write_str("-"),
        }
    }
}

/// Coarse utilization band used to colour capacity bars.
///
/// Display-only; alerts are driven by [`AlertRule`] thresholds, not bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilizationBand {
    /// No pool to measure against.
    Unknown,
    /// Below 40%.
    Normal,
    /// 40% to below 60%.
    Moderate,
    /// 60% to below 80%.
    Elevated,
    /// 80% and above.
    High,
}

impl UtilizationBand {
    pub fn from_utilization(utilization: Utilization) -> Self {
        match utilization.percent() {
            None => UtilizationBand::Unknown,
            Some(pct) if pct >= 80.0 => UtilizationBand::High,
            Some(pct) if pct >= 60.0 => UtilizationBand::Elevated,
            Some(pct) if pct >= 40.0 => UtilizationBand::Moderate,
            Some(_) => UtilizationBand::Normal,
        }
    }
}

/// Values derived from a validated [`ResourceRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub occupied_beds: u32,
    pub occupied_icu_beds: u32,
    pub used_ventilators: u32,
    pub used_oxygen_cylinders: u32,

    /// Fraction of clinical staff currently available, in `[0, 1]`.
    ///
    /// Defined as `0` when the hospital reports no staff at all.
    pub staff_reduction_factor: f64,

    pub bed_utilization_pct: Utilization,
    pub icu_utilization_pct: Utilization,
    pub ventilator_utilization_pct: Utilization,
    pub oxygen_utilization_pct: Utilization,
}

/// Usage of a single resource pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub resource: ResourcePair,
    pub available: u32,
    pub total: u32,
    pub in_use: u32,
    pub utilization: Utilization,
    pub band: UtilizationBand,
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Critical,
}

/// The fixed threshold rules, in evaluation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertRule {
    /// Bed utilization above 85%.
    BedCapacity,
    /// ICU utilization above 80%.
    IcuCapacity,
    /// Ventilator utilization above 70%.
    VentilatorUsage,
    /// Staff reduction factor below 0.9.
    StaffShortage,
}

impl AlertRule {
    pub const ALL: [AlertRule; 4] = [
        AlertRule::BedCapacity,
        AlertRule::IcuCapacity,
        AlertRule::VentilatorUsage,
        AlertRule::StaffShortage,
    ];

    pub fn kind(&self) -> AlertKind {
        match self {
            AlertRule::BedCapacity => AlertKind::Critical,
            _ => AlertKind::Warning,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AlertRule::BedCapacity => "Bed capacity critical",
            AlertRule::IcuCapacity => "ICU capacity high",
            AlertRule::VentilatorUsage => "Ventilator usage high",
            AlertRule::StaffShortage => "Staff shortage detected",
        }
    }
}

/// A threshold alert raised for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub rule: AlertRule,
    pub message: String,

    /// The value that crossed the threshold: a utilization percentage, or the
    /// staff reduction percentage for [`AlertRule::StaffShortage`].
    pub metric_value: f64,

    /// `metric_value` formatted for display, e.g. `"93.3%"` or `"9.1% reduced"`.
    pub value_label: String,

    /// Reporting day of the record that raised the alert.
    pub date: NaiveDate,
}

/// A record together with everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub record: ResourceRecord,
    pub metrics: DerivedMetrics,
    pub usage: Vec<ResourceUsage>,
    pub alerts: Vec<Alert>,
}

/// One day of the utilization trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub bed_utilization_pct: Utilization,
    pub icu_utilization_pct: Utilization,
    pub ventilator_utilization_pct: Utilization,
    pub oxygen_utilization_pct: Utilization,
    /// Total clinical staff on the roster.
    pub total_staff: u32,
    /// `(1 - staff_reduction_factor) * 100`.
    pub staff_reduction_pct: f64,
    pub alert_count: usize,
}

/// Response for `GET /resources/trend`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendResponse {
    /// Lookback window in days that was used.
    pub days: u32,
    pub points: Vec<TrendPoint>,
    /// Highest bed utilization in the window, if any day had beds.
    pub peak_bed_utilization_pct: Option<f64>,
    /// Number of days that raised at least one alert.
    pub days_with_alerts: usize,
}

/// Query parameters for `GET /resources/trend`.
#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    /// Lookback window in days (default: 30).
    #[serde(default = "default_trend_days")]
    pub days: u32,
}

fn default_trend_days() -> u32 {
    30
}

/// Error body returned when a submission is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Field or resource pair that failed.
    pub field: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utilization_zero_total_is_sentinel() {
        assert_eq!(Utilization::of(0, 0), Utilization::NotApplicable);
        assert_ne!(Utilization::of(0, 0), Utilization::Percent(0.0));
        assert!(!Utilization::NotApplicable.exceeds(0.0));
    }

    #[test]
    fn test_utilization_exact_whole_percent() {
        assert_eq!(Utilization::of(17, 20), Utilization::Percent(85.0));
        assert_eq!(Utilization::of(13, 25), Utilization::Percent(52.0));
    }

    #[test]
    fn test_utilization_display() {
        assert_eq!(Utilization::of(118, 150).to_string(), "78.7%");
        assert_eq!(Utilization::NotApplicable.to_string(), "-");
    }

    #[test]
    fn test_utilization_serializes_sentinel_as_null() {
        let json = serde_json::to_value(Utilization::NotApplicable).unwrap();
        assert!(json.is_null());

        let json = serde_json::to_value(Utilization::Percent(52.0)).unwrap();
        assert_eq!(json, serde_json::json!(52.0));
    }

    #[test]
    fn test_utilization_band() {
        assert_eq!(
            UtilizationBand::from_utilization(Utilization::Percent(80.0)),
            UtilizationBand::High
        );
        assert_eq!(
            UtilizationBand::from_utilization(Utilization::Percent(79.9)),
            UtilizationBand::Elevated
        );
        assert_eq!(
            UtilizationBand::from_utilization(Utilization::Percent(40.0)),
            UtilizationBand::Moderate
        );
        assert_eq!(
            UtilizationBand::from_utilization(Utilization::Percent(12.0)),
            UtilizationBand::Normal
        );
        assert_eq!(
            UtilizationBand::from_utilization(Utilization::NotApplicable),
            UtilizationBand::Unknown
        );
    }

    #[test]
    fn test_alert_rule_kinds() {
        assert_eq!(AlertRule::BedCapacity.kind(), AlertKind::Critical);
        assert_eq!(AlertRule::IcuCapacity.kind(), AlertKind::Warning);
        assert_eq!(AlertRule::VentilatorUsage.kind(), AlertKind::Warning);
        assert_eq!(AlertRule::StaffShortage.kind(), AlertKind::Warning);
    }

    #[test]
    fn test_form_deserializes_strings_and_numbers() {
        let form: ResourceForm = serde_json::from_value(serde_json::json!({
            "date": "2024-01-07",
            "total_beds": "150",
            "available_beds": 32
        }))
        .unwrap();

        assert_eq!(form.total_beds, Some(FormValue::Text("150".to_string())));
        assert_eq!(form.available_beds, Some(FormValue::from(32)));
        assert!(form.icu_beds.is_none());
    }

    #[test]
    fn test_pair_field_names_follow_record_order() {
        let names: Vec<_> = ResourcePair::ALL.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec![
                "beds",
                "icu_beds",
                "ventilators",
                "oxygen",
                "doctors",
                "nurses",
                "icu_nurses"
            ]
        );
        assert_eq!(
            ResourcePair::Oxygen.field_names(),
            ("total_oxygen_cylinders", "available_oxygen_cylinders")
        );
    }
}
