//! Resource metrics engine.
//!
//! Turns raw hospital resource counts into occupancy, utilization and
//! staffing metrics, and evaluates the threshold alert rules over them.
//!
//! The pipeline is:
//!
//! 1. [`parse_form`]: raw form input to a [`ResourceRecord`]
//! 2. [`validate`]: check every `available <= total` pair, yielding a [`ValidRecord`]
//! 3. [`derive`]: compute [`DerivedMetrics`]
//! 4. [`evaluate_alerts`]: lazily evaluate the [`AlertRule`]s in priority order
//!
//! Every function here is pure. Identical input always yields identical
//! output, and independent records may be processed in any order.

use chrono::{Datelike, NaiveDate};

use crate::error::ValidationError;
use crate::model::{
    Alert, AlertRule, DerivedMetrics, FormValue, ResourceForm, ResourcePair, ResourceRecord,
    ResourceSnapshot, ResourceUsage, Utilization, UtilizationBand,
};

/// Bed utilization above this percentage raises a critical alert.
pub const BED_CRITICAL_PCT: f64 = 85.0;

/// ICU utilization above this percentage raises a warning.
pub const ICU_WARNING_PCT: f64 = 80.0;

/// Ventilator utilization above this percentage raises a warning.
pub const VENTILATOR_WARNING_PCT: f64 = 70.0;

/// A staff reduction factor below this raises a warning.
pub const STAFF_WARNING_FACTOR: f64 = 0.9;

/// A [`ResourceRecord`] whose pairs all satisfy `available <= total`.
///
/// Only [`validate`] constructs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRecord(ResourceRecord);

impl ValidRecord {
    pub fn record(&self) -> &ResourceRecord {
        &self.0
    }

    pub fn into_inner(self) -> ResourceRecord {
        self.0
    }
}

impl AsRef<ResourceRecord> for ValidRecord {
    fn as_ref(&self) -> &ResourceRecord {
        &self.0
    }
}

/// Parse raw form input into a [`ResourceRecord`].
///
/// Fields are checked in record order (date first, then each pair's total
/// before its available count) and the first failure is returned. Counts must
/// be whole numbers in `0..=u32::MAX`; text is trimmed before parsing.
pub fn parse_form(form: &ResourceForm) -> Result<ResourceRecord, ValidationError> {
    let date = parse_date(form.date.as_deref())?;

    let mut counts = [(0u32, 0u32); 7];
    for (slot, pair) in counts.iter_mut().zip(ResourcePair::ALL) {
        let (total_name, available_name) = pair.field_names();
        let (total, available) = form.values(pair);
        *slot = (
            parse_count(total_name, total)?,
            parse_count(available_name, available)?,
        );
    }

    let [beds, icu_beds, ventilators, oxygen, doctors, nurses, icu_nurses] = counts;

    Ok(ResourceRecord {
        date,
        total_beds: beds.0,
        available_beds: beds.1,
        icu_beds: icu_beds.0,
        available_icu_beds: icu_beds.1,
        total_ventilators: ventilators.0,
        available_ventilators: ventilators.1,
        total_oxygen_cylinders: oxygen.0,
        available_oxygen_cylinders: oxygen.1,
        total_doctors: doctors.0,
        available_doctors: doctors.1,
        total_nurses: nurses.0,
        available_nurses: nurses.1,
        total_icu_nurses: icu_nurses.0,
        available_icu_nurses: icu_nurses.1,
    })
}

fn parse_date(raw: Option<&str>) -> Result<NaiveDate, ValidationError> {
    let raw = raw.ok_or(ValidationError::MissingField("date"))?;
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate)?;

    // Stored dates must stay four-digit so they sort as text.
    if !(0..=9999).contains(&date.year()) {
        return Err(ValidationError::InvalidDate);
    }

    Ok(date)
}

fn parse_count(field: &'static str, value: Option<&FormValue>) -> Result<u32, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField(field))?;

    let parsed = match value {
        FormValue::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        FormValue::Text(text) => text.trim().parse::<u32>().ok(),
        FormValue::Other(_) => None,
    };

    parsed.ok_or(ValidationError::NotANumber(field))
}

/// Check every `available <= total` pair in validation order.
///
/// Fails fast with the first violating pair; later pairs are not examined.
pub fn validate(record: ResourceRecord) -> Result<ValidRecord, ValidationError> {
    for pair in ResourcePair::ALL {
        let (available, total) = record.counts(pair);
        if available > total {
            return Err(ValidationError::AvailableExceedsTotal(pair));
        }
    }

    Ok(ValidRecord(record))
}

/// Compute occupancy, utilization and staffing metrics.
///
/// Never fails. A pool with a zero total reports
/// [`Utilization::NotApplicable`]; a hospital with no staff at all reports a
/// reduction factor of `0`.
pub fn derive(valid: &ValidRecord) -> DerivedMetrics {
    let r = valid.record();

    let occupied_beds = r.total_beds - r.available_beds;
    let occupied_icu_beds = r.icu_beds - r.available_icu_beds;
    let used_ventilators = r.total_ventilators - r.available_ventilators;
    let used_oxygen_cylinders = r.total_oxygen_cylinders - r.available_oxygen_cylinders;

    DerivedMetrics {
        occupied_beds,
        occupied_icu_beds,
        used_ventilators,
        used_oxygen_cylinders,
        staff_reduction_factor: staff_reduction_factor(r),
        bed_utilization_pct: Utilization::of(occupied_beds, r.total_beds),
        icu_utilization_pct: Utilization::of(occupied_icu_beds, r.icu_beds),
        ventilator_utilization_pct: Utilization::of(used_ventilators, r.total_ventilators),
        oxygen_utilization_pct: Utilization::of(used_oxygen_cylinders, r.total_oxygen_cylinders),
    }
}

/// Available clinical staff over total clinical staff, `0` with no staff.
fn staff_reduction_factor(r: &ResourceRecord) -> f64 {
    // Summed in u64 so three u32 counts cannot overflow.
    let available = u64::from(r.available_doctors)
        + u64::from(r.available_nurses)
        + u64::from(r.available_icu_nurses);
    let total =
        u64::from(r.total_doctors) + u64::from(r.total_nurses) + u64::from(r.total_icu_nurses);

    if total == 0 {
        return 0.0;
    }

    available as f64 / total as f64
}

/// Evaluate the threshold rules for a record.
///
/// The returned iterator is lazy and finite, visits [`AlertRule::ALL`] in
/// priority order and can be restarted by cloning it. Each rule is independent,
/// so several alerts may fire together. Thresholds are strict: a value exactly
/// at a threshold does not alert, and a [`Utilization::NotApplicable`] value
/// never does.
pub fn evaluate_alerts<'a>(derived: &'a DerivedMetrics, valid: &'a ValidRecord) -> Alerts<'a> {
    Alerts {
        derived,
        date: valid.record().date,
        next_rule: 0,
    }
}

/// Lazy iterator over the alerts raised by one record.
#[derive(Debug, Clone)]
pub struct Alerts<'a> {
    derived: &'a DerivedMetrics,
    date: NaiveDate,
    next_rule: usize,
}

impl Iterator for Alerts<'_> {
    type Item = Alert;

    fn next(&mut self) -> Option<Alert> {
        while let Some(rule) = AlertRule::ALL.get(self.next_rule).copied() {
            self.next_rule += 1;
            if let Some(alert) = check_rule(rule, self.derived, self.date) {
                return Some(alert);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(AlertRule::ALL.len().saturating_sub(self.next_rule)))
    }
}

fn check_rule(rule: AlertRule, derived: &DerivedMetrics, date: NaiveDate) -> Option<Alert> {
    let (metric_value, value_label) = match rule {
        AlertRule::BedCapacity => utilization_above(derived.bed_utilization_pct, BED_CRITICAL_PCT)?,
        AlertRule::IcuCapacity => utilization_above(derived.icu_utilization_pct, ICU_WARNING_PCT)?,
        AlertRule::VentilatorUsage => {
            utilization_above(derived.ventilator_utilization_pct, VENTILATOR_WARNING_PCT)?
        }
        AlertRule::StaffShortage => {
            if derived.staff_reduction_factor >= STAFF_WARNING_FACTOR {
                return None;
            }
            let reduced_pct = (1.0 - derived.staff_reduction_factor) * 100.0;
            (reduced_pct, format!("{:.1}% reduced", reduced_pct))
        }
    };

    Some(Alert {
        kind: rule.kind(),
        rule,
        message: rule.message().to_string(),
        metric_value,
        value_label,
        date,
    })
}

fn utilization_above(utilization: Utilization, threshold: f64) -> Option<(f64, String)> {
    if !utilization.exceeds(threshold) {
        return None;
    }
    let pct = utilization.percent()?;
    Some((pct, utilization.to_string()))
}

/// Per-pool usage for all seven resource pairs, in validation order.
pub fn resource_usage(valid: &ValidRecord) -> Vec<ResourceUsage> {
    ResourcePair::ALL
        .iter()
        .map(|&pair| {
            let (available, total) = valid.record().counts(pair);
            let in_use = total - available;
            let utilization = Utilization::of(in_use, total);
            ResourceUsage {
                resource: pair,
                available,
                total,
                in_use,
                utilization,
                band: UtilizationBand::from_utilization(utilization),
            }
        })
        .collect()
}

/// Derive everything for a record: metrics, usage breakdown and alerts.
pub fn snapshot(valid: ValidRecord) -> ResourceSnapshot {
    let metrics = derive(&valid);
    let usage = resource_usage(&valid);
    let alerts = evaluate_alerts(&metrics, &valid).collect();

    ResourceSnapshot {
        record: valid.into_inner(),
        metrics,
        usage,
        alerts,
    }
}
