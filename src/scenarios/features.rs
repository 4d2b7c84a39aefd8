//! Feature derivation from boundary records.
//!
//! History features are computed over the chronologically sorted, unshuffled
//! record list, using only records strictly before the target day:
//!
//! - trailing 7-day and 30-day mean totals
//! - total 7 days earlier (same weekday last week) and 28 days earlier
//!   (same day last month); both fall back to the trailing 7-day mean when
//!   the day is missing
//! - trend over the trailing 14 days: `(mean(second half) - mean(first half))
//!   / mean(first half)`, clamped to [-1, 1], 0 when undefined
//!
//! With no prior history every history feature is 0.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

use crate::error::EngineError;
use crate::nn::{FeatureSchema, FeatureVector};
use crate::types::weather::nominal;
use crate::types::{HistoricalRecord, WeatherReading};

pub const TRAILING_SHORT_DAYS: i64 = 7;
pub const TRAILING_LONG_DAYS: i64 = 30;
pub const SAME_WEEKDAY_LAG_DAYS: i64 = 7;
pub const SAME_DAY_LAST_MONTH_LAG_DAYS: i64 = 28;
pub const TREND_WINDOW_DAYS: i64 = 14;

/// Nominal day of year used when a disease feature vector is turned back
/// into a reading (mid-June).
pub const NOMINAL_DAY_OF_YEAR: u32 = 166;

/// Year used to place reconstructed readings on the calendar.
const RECONSTRUCTED_YEAR: i32 = 2023;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistoryFeatures {
    pub trailing_7d_avg: f64,
    pub trailing_30d_avg: f64,
    pub same_weekday_last_week: f64,
    pub same_day_last_month: f64,
    pub trend: f64,
}

/// Sort by date, rejecting duplicate days.
pub fn sort_chronological(records: &[HistoricalRecord]) -> Result<Vec<HistoricalRecord>, EngineError> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.date);
    if let Some(pair) = sorted.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(EngineError::invalid_feature(
            "date",
            format!("duplicate history record for {}", pair[0].date),
        ));
    }
    Ok(sorted)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Records of `prior` dated in `[target - days, target)`.
fn window(prior: &[HistoricalRecord], target: NaiveDate, days: i64) -> &[HistoricalRecord] {
    let from = target - Duration::days(days);
    let start = prior.partition_point(|r| r.date < from);
    let end = prior.partition_point(|r| r.date < target);
    &prior[start..end.max(start)]
}

fn trailing_mean(prior: &[HistoricalRecord], target: NaiveDate, days: i64) -> f64 {
    let in_window = window(prior, target, days);
    let source = if in_window.is_empty() {
        // Gap in the calendar: fall back to the most recent records.
        let end = prior.partition_point(|r| r.date < target);
        &prior[end.saturating_sub(days as usize)..end]
    } else {
        in_window
    };
    mean(source.iter().map(|r| f64::from(r.total_count))).unwrap_or(0.0)
}

fn total_on(prior: &[HistoricalRecord], date: NaiveDate) -> Option<f64> {
    prior
        .binary_search_by_key(&date, |r| r.date)
        .ok()
        .map(|i| f64::from(prior[i].total_count))
}

fn trend(prior: &[HistoricalRecord], target: NaiveDate) -> f64 {
    let recent = window(prior, target, TREND_WINDOW_DAYS);
    if recent.len() < 2 {
        return 0.0;
    }
    let half = recent.len() / 2;
    let first = mean(recent[..half].iter().map(|r| f64::from(r.total_count))).unwrap_or(0.0);
    let second = mean(recent[half..].iter().map(|r| f64::from(r.total_count))).unwrap_or(0.0);
    if first == 0.0 {
        return 0.0;
    }
    ((second - first) / first).clamp(-1.0, 1.0)
}

/// History features for `target`, given records sorted by date. Only records
/// strictly before `target` are used.
pub fn history_features(sorted: &[HistoricalRecord], target: NaiveDate) -> HistoryFeatures {
    let end = sorted.partition_point(|r| r.date < target);
    let prior = &sorted[..end];

    let trailing_7d_avg = trailing_mean(prior, target, TRAILING_SHORT_DAYS);
    HistoryFeatures {
        trailing_7d_avg,
        trailing_30d_avg: trailing_mean(prior, target, TRAILING_LONG_DAYS),
        same_weekday_last_week: total_on(prior, target - Duration::days(SAME_WEEKDAY_LAG_DAYS))
            .unwrap_or(trailing_7d_avg),
        same_day_last_month: total_on(prior, target - Duration::days(SAME_DAY_LAST_MONTH_LAG_DAYS))
            .unwrap_or(trailing_7d_avg),
        trend: trend(prior, target),
    }
}

/// Calendar facts about the day being forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayContext {
    pub date: NaiveDate,
    pub is_holiday: bool,
    pub temperature: Option<f64>,
}

impl DayContext {
    pub fn new(date: NaiveDate, is_holiday: bool, temperature: Option<f64>) -> Self {
        Self { date, is_holiday, temperature }
    }
}

impl From<&HistoricalRecord> for DayContext {
    fn from(r: &HistoricalRecord) -> Self {
        Self::new(r.date, r.is_holiday, r.temperature)
    }
}

/// Admission feature vector for `day` from sorted history.
pub fn admission_features(
    schema: &FeatureSchema,
    sorted: &[HistoricalRecord],
    day: DayContext,
) -> Result<FeatureVector, EngineError> {
    let h = history_features(sorted, day.date);
    let weekday = day.date.weekday();
    let flag = |b: bool| if b { 1.0 } else { 0.0 };

    schema.vector(vec![
        f64::from(weekday.num_days_from_monday()),
        flag(matches!(weekday, Weekday::Sat | Weekday::Sun)),
        flag(day.is_holiday),
        f64::from(day.date.month()),
        h.trailing_7d_avg,
        h.trailing_30d_avg,
        h.same_weekday_last_week,
        h.same_day_last_month,
        h.trend,
        day.temperature.unwrap_or(nominal::TEMPERATURE_C),
    ])
}

/// Disease feature vector for a validated reading.
pub fn disease_features(schema: &FeatureSchema, w: &WeatherReading) -> Result<FeatureVector, EngineError> {
    w.validate()?;
    schema.vector(vec![
        w.temperature,
        w.humidity,
        w.rainfall,
        w.wind_speed,
        w.uv_index,
        w.pressure,
        w.dew_point,
        f64::from(w.weather_code),
        f64::from(w.month()),
        f64::from(w.recorded_at.ordinal()),
    ])
}

/// Reading reconstructed from a disease feature vector, so rule-based
/// formulas can score the same input the network sees.
pub fn reading_from_disease_features(
    schema: &FeatureSchema,
    features: &FeatureVector,
) -> Result<WeatherReading, EngineError> {
    schema.check(features)?;
    let v = features.values();

    if v[7] < 0.0 || v[7] > f64::from(u16::MAX) {
        return Err(EngineError::invalid_feature("weather_code", format!("{} out of range", v[7])));
    }
    let ordinal = v[9].clamp(1.0, 365.0) as u32;
    let recorded_at = NaiveDate::from_yo_opt(RECONSTRUCTED_YEAR, ordinal)
        .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
        .ok_or_else(|| EngineError::invalid_feature("day_of_year", format!("{} out of range", v[9])))?;

    let reading = WeatherReading {
        city: String::new(),
        temperature: v[0],
        humidity: v[1],
        rainfall: v[2],
        wind_speed: v[3],
        uv_index: v[4],
        pressure: v[5],
        dew_point: v[6],
        weather_code: v[7] as u16,
        recorded_at,
    };
    reading.validate()?;
    Ok(reading)
}

/// Disease feature vector from a partial description: named overrides on
/// top of nominal values.
pub fn nominal_disease_features(
    schema: &FeatureSchema,
    overrides: &[(&str, f64)],
) -> Result<FeatureVector, EngineError> {
    let base = WeatherReading::default();
    let mut values = vec![
        base.temperature,
        base.humidity,
        base.rainfall,
        base.wind_speed,
        base.uv_index,
        base.pressure,
        base.dew_point,
        f64::from(base.weather_code),
        f64::from(nominal::MONTH),
        f64::from(NOMINAL_DAY_OF_YEAR),
    ];
    for (name, value) in overrides {
        let idx = schema
            .index_of(name)
            .ok_or_else(|| EngineError::invalid_feature(*name, "not a disease schema field"))?;
        values[idx] = *value;
    }
    schema.vector(values)
}

/// Government feature vector: weather plus population in thousands.
pub fn government_features(
    schema: &FeatureSchema,
    w: &WeatherReading,
    population: u64,
) -> Result<FeatureVector, EngineError> {
    w.validate()?;
    schema.vector(vec![
        w.temperature,
        w.humidity,
        w.rainfall,
        w.wind_speed,
        w.uv_index,
        w.pressure,
        w.dew_point,
        population as f64 / 1000.0,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AdmissionCounts;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i64::from(d))
    }

    fn record(d: u32, total: u32) -> HistoricalRecord {
        HistoricalRecord::new(day(d), AdmissionCounts { emergency: total, ..Default::default() }, false)
    }

    #[test]
    fn test_no_prior_history_is_zero() {
        let h = history_features(&[], day(0));
        assert_eq!(h, HistoryFeatures::default());
    }

    #[test]
    fn test_only_strictly_prior_records_used() {
        let records: Vec<_> = (0..10).map(|d| record(d, 10 * (d + 1))).collect();
        let h = history_features(&records, day(5));
        // days 0..5 prior: 10,20,30,40,50; last 7 days window covers all 5
        assert!((h.trailing_7d_avg - 30.0).abs() < 1e-9);
        assert!((h.trailing_30d_avg - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_lag_lookups_and_fallback() {
        let records: Vec<_> = (0..40).map(|d| record(d, d + 1)).collect();
        let h = history_features(&records, day(35));
        assert_eq!(h.same_weekday_last_week, 29.0);
        assert_eq!(h.same_day_last_month, 8.0);

        let short: Vec<_> = (0..5).map(|d| record(d, 10)).collect();
        let h = history_features(&short, day(5));
        assert_eq!(h.same_weekday_last_week, h.trailing_7d_avg);
        assert_eq!(h.same_day_last_month, h.trailing_7d_avg);
    }

    #[test]
    fn test_trend_sign_and_clamp() {
        let rising: Vec<_> = (0..14).map(|d| record(d, if d < 7 { 10 } else { 15 })).collect();
        let h = history_features(&rising, day(14));
        assert!((h.trend - 0.5).abs() < 1e-9);

        let spike: Vec<_> = (0..14).map(|d| record(d, if d < 7 { 1 } else { 100 })).collect();
        assert_eq!(history_features(&spike, day(14)).trend, 1.0);

        let zero_first: Vec<_> = (0..14).map(|d| record(d, if d < 7 { 0 } else { 5 })).collect();
        assert_eq!(history_features(&zero_first, day(14)).trend, 0.0);

        assert_eq!(history_features(&[record(0, 5)], day(1)).trend, 0.0);
    }

    #[test]
    fn test_sort_rejects_duplicates() {
        let recs = vec![record(2, 1), record(1, 1), record(2, 3)];
        assert!(sort_chronological(&recs).is_err());
        let ok = sort_chronological(&[record(2, 1), record(1, 1)]).unwrap();
        assert!(ok[0].date < ok[1].date);
    }

    #[test]
    fn test_admission_vector_layout() {
        let schema = FeatureSchema::admission();
        // 2024-01-06 is a Saturday
        let v = admission_features(&schema, &[], DayContext::new(day(5), true, Some(30.0))).unwrap();
        let vals = v.values();
        assert_eq!(vals[0], 5.0);
        assert_eq!(vals[1], 1.0);
        assert_eq!(vals[2], 1.0);
        assert_eq!(vals[3], 1.0);
        assert_eq!(vals[9], 30.0);
    }

    #[test]
    fn test_disease_features_round_trip_through_reading() {
        let schema = FeatureSchema::disease();
        let v = nominal_disease_features(&schema, &[("temperature", 27.0), ("humidity", 82.0), ("rainfall", 12.0)])
            .unwrap();
        let w = reading_from_disease_features(&schema, &v).unwrap();
        assert_eq!(w.temperature, 27.0);
        assert_eq!(w.humidity, 82.0);
        assert_eq!(w.rainfall, 12.0);
        assert_eq!(w.month(), 6);
    }

    #[test]
    fn test_invalid_reading_rejected_before_features() {
        let w = WeatherReading { humidity: 120.0, ..Default::default() };
        assert!(disease_features(&FeatureSchema::disease(), &w).is_err());
        assert!(government_features(&FeatureSchema::government(), &w, 1000).is_err());
    }

    #[test]
    fn test_unknown_override_rejected() {
        assert!(nominal_disease_features(&FeatureSchema::disease(), &[("snowfall", 1.0)]).is_err());
    }
}
