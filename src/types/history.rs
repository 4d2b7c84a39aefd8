//! Boundary records read from the persistence collaborator.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::WeatherReading;

/// Admission categories predicted by the admission scenario, in output order.
pub const ADMISSION_CATEGORIES: [&str; 4] = ["emergency", "inpatient", "outpatient", "icu"];

/// Per-category admission counts for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionCounts {
    pub emergency: u32,
    pub inpatient: u32,
    pub outpatient: u32,
    pub icu: u32,
}

impl AdmissionCounts {
    /// Sum of all categories, saturating at `u32::MAX`.
    pub fn total(&self) -> u32 {
        self.emergency
            .saturating_add(self.inpatient)
            .saturating_add(self.outpatient)
            .saturating_add(self.icu)
    }

    /// Counts in [`ADMISSION_CATEGORIES`] order.
    pub fn as_array(&self) -> [u32; 4] {
        [self.emergency, self.inpatient, self.outpatient, self.icu]
    }

    pub fn from_array(counts: [u32; 4]) -> Self {
        Self {
            emergency: counts[0],
            inpatient: counts[1],
            outpatient: counts[2],
            icu: counts[3],
        }
    }
}

/// One day of hospital history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalRecord {
    pub date: NaiveDate,
    pub total_count: u32,
    pub subcategory_counts: AdmissionCounts,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u8,
    pub is_weekend: bool,
    pub is_holiday: bool,
    /// Mean temperature for the day, when the weather collaborator had one
    #[serde(default)]
    pub temperature: Option<f64>,
}

impl HistoricalRecord {
    /// Build a record, deriving the calendar fields from `date`.
    pub fn new(date: NaiveDate, counts: AdmissionCounts, is_holiday: bool) -> Self {
        let weekday = date.weekday();
        Self {
            date,
            total_count: counts.total(),
            subcategory_counts: counts,
            day_of_week: weekday.num_days_from_monday() as u8,
            is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
            is_holiday,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Ground-truth reference record for the government-data validation scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRecord {
    pub location: String,
    pub weather_snapshot: WeatherReading,
    /// Actual case counts keyed by disease name
    pub actual_disease_case_counts: BTreeMap<String, u32>,
    pub population: u64,
}

impl ReferenceRecord {
    pub fn total_cases(&self) -> u64 {
        self.actual_disease_case_counts
            .values()
            .map(|&c| u64::from(c))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_calendar_fields() {
        // 2024-03-09 is a Saturday
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let counts = AdmissionCounts { emergency: 10, inpatient: 5, outpatient: 20, icu: 1 };
        let record = HistoricalRecord::new(date, counts, false);
        assert_eq!(record.total_count, 36);
        assert_eq!(record.day_of_week, 5);
        assert!(record.is_weekend);
    }

    #[test]
    fn test_counts_array_order() {
        let counts = AdmissionCounts::from_array([1, 2, 3, 4]);
        assert_eq!(counts.emergency, 1);
        assert_eq!(counts.icu, 4);
        assert_eq!(counts.as_array(), [1, 2, 3, 4]);
    }

    #[test]
    fn test_total_saturates() {
        let counts = AdmissionCounts::from_array([u32::MAX, 5, u32::MAX, 1]);
        assert_eq!(counts.total(), u32::MAX);
        let record = HistoricalRecord::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), counts, false);
        assert_eq!(record.total_count, u32::MAX);
    }

    #[test]
    fn test_reference_total_cases() {
        let mut cases = BTreeMap::new();
        cases.insert("Dengue Fever".to_string(), 120);
        cases.insert("Influenza".to_string(), 30);
        let record = ReferenceRecord {
            location: "Metro".to_string(),
            weather_snapshot: WeatherReading::default(),
            actual_disease_case_counts: cases,
            population: 250_000,
        };
        assert_eq!(record.total_cases(), 150);
    }
}
