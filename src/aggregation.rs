//! Aggregation over stored resource records.
//!
//! Loads raw records from [`Storage`] and runs the metrics engine over them to
//! produce the latest snapshot and the utilization trend. Each record is
//! derived independently of the others.

use chrono::{Days, NaiveDate};
use tracing::warn;

use crate::metrics::{ValidRecord, derive, evaluate_alerts, snapshot, validate};
use crate::model::{ResourceRecord, ResourceSnapshot, TrendPoint, TrendResponse};
use crate::storage::Storage;

/// Compute the snapshot for the most recently reported valid record.
///
/// Inconsistent records are skipped with a warning, so a bad latest row
/// falls back to the newest record that still validates.
///
/// # Returns
///
/// `None` if nothing has been reported, or if no stored record validates.
pub async fn latest_snapshot(storage: &Storage) -> anyhow::Result<Option<ResourceSnapshot>> {
    let Some(record) = storage.latest_record().await? else {
        return Ok(None);
    };

    let date = record.date;
    match validate(record) {
        Ok(valid) => return Ok(Some(snapshot(valid))),
        Err(e) => warn!(%date, error = %e, "Skipping inconsistent latest resource record"),
    }

    // Slow path: the newest row is bad, walk back through history.
    for record in storage.records_newest_first().await?.into_iter().skip(1) {
        let date = record.date;
        match validate(record) {
            Ok(valid) => return Ok(Some(snapshot(valid))),
            Err(e) => warn!(%date, error = %e, "Skipping inconsistent resource record"),
        }
    }

    Ok(None)
}

/// Compute the utilization trend over the last `days` days.
///
/// # Arguments
///
/// * `storage` - Database connection
/// * `days` - Lookback window in days, counting back from `today`
/// * `today` - Reference date (typically the current date)
pub async fn compute_trend(
    storage: &Storage,
    days: u32,
    today: NaiveDate,
) -> anyhow::Result<TrendResponse> {
    let since = today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);

    let records = storage.records_since(since).await?;

    Ok(build_trend(days, records))
}

/// Derive trend points from records. Inconsistent records are skipped.
pub fn build_trend(days: u32, records: Vec<ResourceRecord>) -> TrendResponse {
    let points: Vec<TrendPoint> = records
        .into_iter()
        .filter_map(|record| {
            let date = record.date;
            match validate(record) {
                Ok(valid) => Some(trend_point(&valid)),
                Err(e) => {
                    warn!(%date, error = %e, "Skipping inconsistent resource record");
                    None
                }
            }
        })
        .collect();

    let peak_bed_utilization_pct = points
        .iter()
        .filter_map(|p| p.bed_utilization_pct.percent())
        .reduce(f64::max);

    let days_with_alerts = points.iter().filter(|p| p.alert_count > 0).count();

    TrendResponse {
        days,
        points,
        peak_bed_utilization_pct,
        days_with_alerts,
    }
}

fn trend_point(valid: &ValidRecord) -> TrendPoint {
    let metrics = derive(valid);
    let record = valid.record();

    TrendPoint {
        date: record.date,
        bed_utilization_pct: metrics.bed_utilization_pct,
        icu_utilization_pct: metrics.icu_utilization_pct,
        ventilator_utilization_pct: metrics.ventilator_utilization_pct,
        oxygen_utilization_pct: metrics.oxygen_utilization_pct,
        total_staff: record
            .total_doctors
            .saturating_add(record.total_nurses)
            .saturating_add(record.total_icu_nurses),
        staff_reduction_pct: (1.0 - metrics.staff_reduction_factor) * 100.0,
        alert_count: evaluate_alerts(&metrics, valid).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Utilization;

    fn record_on(day: u32, available_beds: u32) -> ResourceRecord {
        ResourceRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            total_beds: 150,
            available_beds,
            icu_beds: 25,
            available_icu_beds: 15,
            total_ventilators: 15,
            available_ventilators: 9,
            total_oxygen_cylinders: 50,
            available_oxygen_cylinders: 39,
            total_doctors: 12,
            available_doctors: 11,
            total_nurses: 35,
            available_nurses: 32,
            total_icu_nurses: 8,
            available_icu_nurses: 7,
        }
    }

    async fn setup_test_storage() -> Storage {
        Storage::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_latest_snapshot_empty() {
        let storage = setup_test_storage().await;

        assert!(latest_snapshot(&storage).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_snapshot_derives_alerts() {
        let storage = setup_test_storage().await;
        storage.insert_record(&record_on(6, 57)).await.unwrap();
        storage.insert_record(&record_on(7, 10)).await.unwrap();

        let snapshot = latest_snapshot(&storage).await.unwrap().unwrap();

        assert_eq!(snapshot.record.available_beds, 10);
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(snapshot.alerts[0].message, "Bed capacity critical");
    }

    #[tokio::test]
    async fn test_latest_snapshot_skips_inconsistent_record() {
        let storage = setup_test_storage().await;
        storage.insert_record(&record_on(7, 151)).await.unwrap();

        assert!(latest_snapshot(&storage).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_snapshot_falls_back_to_newest_valid_record() {
        let storage = setup_test_storage().await;
        storage.insert_record(&record_on(5, 61)).await.unwrap();
        storage.insert_record(&record_on(6, 10)).await.unwrap();
        storage.insert_record(&record_on(7, 151)).await.unwrap();
        storage.insert_record(&record_on(7, 160)).await.unwrap();

        let snapshot = latest_snapshot(&storage).await.unwrap().unwrap();

        assert_eq!(snapshot.record.date, NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
        assert_eq!(snapshot.record.available_beds, 10);
        assert_eq!(snapshot.alerts.len(), 1);
    }

    #[tokio::test]
    async fn test_compute_trend_window() {
        let storage = setup_test_storage().await;
        for (day, available) in [(1, 64), (2, 78), (3, 68), (4, 53), (5, 10)] {
            storage.insert_record(&record_on(day, available)).await.unwrap();
        }

        let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let trend = compute_trend(&storage, 2, today).await.unwrap();

        assert_eq!(trend.days, 2);
        assert_eq!(trend.points.len(), 3);
        assert_eq!(trend.points[0].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(trend.days_with_alerts, 1);
        assert!((trend.peak_bed_utilization_pct.unwrap() - 93.33).abs() < 0.01);
    }

    #[test]
    fn test_build_trend_skips_invalid_and_handles_sentinels() {
        let empty_ward = ResourceRecord {
            total_beds: 0,
            available_beds: 0,
            ..record_on(2, 0)
        };
        let records = vec![record_on(1, 200), empty_ward];

        let trend = build_trend(30, records);

        assert_eq!(trend.points.len(), 1);
        assert_eq!(trend.points[0].bed_utilization_pct, Utilization::NotApplicable);
        assert_eq!(trend.points[0].total_staff, 55);
        assert!(trend.peak_bed_utilization_pct.is_none());
    }

    #[test]
    fn test_trend_staff_reduction() {
        let trend = build_trend(30, vec![record_on(1, 64)]);

        // 50 of 55 staff available.
        assert!((trend.points[0].staff_reduction_pct - 9.09).abs() < 0.01);
        assert_eq!(trend.points[0].alert_count, 0);
    }
}
