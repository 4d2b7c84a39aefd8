//! Synthetic training data.
//!
//! Used only when real records are too few to train a network. Weather is
//! sampled uniformly from plausible ranges with dew point derived from
//! temperature and humidity, labels come from a caller-supplied labelling
//! function plus Gaussian noise, and admission history follows weekday,
//! holiday and seasonal patterns. Every stream is seeded, so the same seed
//! always yields the same data.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::EngineError;
use crate::types::{dew_point_celsius, AdmissionCounts, HistoricalRecord, ReferenceRecord, WeatherReading};

/// Standard deviation of label noise, as a fraction of the label range.
pub const DEFAULT_LABEL_NOISE: f64 = 0.05;

/// Year used to place synthetic readings on the calendar.
const SYNTHETIC_YEAR: i32 = 2024;

/// Inclusive sampling ranges for synthetic weather.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRanges {
    pub temperature: (f64, f64),
    pub humidity: (f64, f64),
    pub rainfall: (f64, f64),
    pub wind_speed: (f64, f64),
    pub uv_index: (f64, f64),
    pub pressure: (f64, f64),
}

impl Default for WeatherRanges {
    fn default() -> Self {
        Self {
            temperature: (5.0, 42.0),
            humidity: (15.0, 100.0),
            rainfall: (0.0, 60.0),
            wind_speed: (0.0, 45.0),
            uv_index: (0.0, 12.0),
            pressure: (985.0, 1035.0),
        }
    }
}

/// Baseline daily admissions per category for synthetic history.
const BASE_ADMISSIONS: [f64; 4] = [42.0, 24.0, 115.0, 6.0];

pub struct SyntheticLabelGenerator {
    rng: StdRng,
    ranges: WeatherRanges,
    /// Label noise std, as a fraction of the label range
    label_noise: f64,
    /// Multiplicative noise std on synthetic counts
    count_noise: f64,
}

impl SyntheticLabelGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ranges: WeatherRanges::default(),
            label_noise: DEFAULT_LABEL_NOISE,
            count_noise: 0.08,
        }
    }

    /// Generator with a custom label-noise standard deviation.
    pub fn with_label_noise(seed: u64, std_dev: f64) -> Result<Self, EngineError> {
        if !(std_dev.is_finite() && std_dev >= 0.0) {
            return Err(EngineError::invalid_feature(
                "label_noise",
                format!("{std_dev} is not a valid standard deviation"),
            ));
        }
        Ok(Self { label_noise: std_dev, ..Self::new(seed) })
    }

    /// Zero-mean Gaussian draw with the given standard deviation.
    fn gaussian(&mut self, std_dev: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        z * std_dev
    }

    pub fn with_ranges(mut self, ranges: WeatherRanges) -> Self {
        self.ranges = ranges;
        self
    }

    fn uniform(&mut self, (lo, hi): (f64, f64)) -> f64 {
        if hi > lo {
            self.rng.gen_range(lo..=hi)
        } else {
            lo
        }
    }

    /// One physically consistent reading on a random day of the year.
    pub fn weather(&mut self) -> WeatherReading {
        let r = self.ranges.clone();
        let temperature = self.uniform(r.temperature);
        let humidity = self.uniform(r.humidity);
        // Skew towards dry days: most days see little rain.
        let rain_draw: f64 = self.rng.gen();
        let rainfall = r.rainfall.0 + (r.rainfall.1 - r.rainfall.0) * rain_draw.powi(3);
        let wind_speed = self.uniform(r.wind_speed);
        let uv_index = self.uniform(r.uv_index);
        let pressure = self.uniform(r.pressure);
        let ordinal = self.rng.gen_range(1..=365u32);

        let recorded_at = NaiveDate::from_yo_opt(SYNTHETIC_YEAR, ordinal)
            .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
            .unwrap_or_default();

        WeatherReading {
            city: "synthetic".to_string(),
            temperature,
            humidity,
            rainfall,
            wind_speed,
            uv_index,
            pressure,
            dew_point: dew_point_celsius(temperature, humidity),
            weather_code: weather_code_for(temperature, rainfall),
            recorded_at,
        }
    }

    /// `n` readings labelled by `labeler`, each label perturbed by Gaussian
    /// noise scaled to `bounds` and clamped into it.
    pub fn labeled<F>(&mut self, n: usize, bounds: (f64, f64), mut labeler: F) -> Vec<(WeatherReading, Vec<f64>)>
    where
        F: FnMut(&WeatherReading) -> Vec<f64>,
    {
        let (lo, hi) = bounds;
        let span = (hi - lo).abs().max(f64::EPSILON);
        (0..n)
            .map(|_| {
                let reading = self.weather();
                let labels = labeler(&reading)
                    .into_iter()
                    .map(|v| (v + self.gaussian(self.label_noise) * span).clamp(lo, hi))
                    .collect();
                (reading, labels)
            })
            .collect()
    }

    /// `days` consecutive days of admission history starting at `start`.
    pub fn admission_history(&mut self, start: NaiveDate, days: usize) -> Vec<HistoricalRecord> {
        (0..days)
            .filter_map(|offset| start.checked_add_signed(Duration::days(offset as i64)))
            .map(|date| {
                let holiday = is_fixed_holiday(date);
                let seasonal = seasonal_temperature(date.ordinal());
                let temperature = seasonal + self.gaussian(self.count_noise) * 20.0;
                let weekend = date.weekday().num_days_from_monday() >= 5;

                let mut counts = [0u32; 4];
                for (i, base) in BASE_ADMISSIONS.iter().enumerate() {
                    let mut factor = 1.0;
                    match i {
                        // emergency: busier on weekends and in heat
                        0 => {
                            if weekend {
                                factor *= 1.12;
                            }
                            if temperature > 34.0 {
                                factor *= 1.2;
                            }
                        }
                        // outpatient clinics run reduced hours
                        2 => {
                            if weekend {
                                factor *= 0.55;
                            }
                            if holiday {
                                factor *= 0.6;
                            }
                        }
                        _ => {
                            if holiday {
                                factor *= 0.9;
                            }
                        }
                    }
                    factor *= season_factor(date.month());
                    let noise = 1.0 + self.gaussian(self.count_noise);
                    counts[i] = (base * factor * noise).round().max(0.0) as u32;
                }

                HistoricalRecord::new(date, AdmissionCounts::from_array(counts), holiday)
                    .with_temperature(temperature)
            })
            .collect()
    }

    /// `n` ground-truth reference records. `case_rates` maps a reading to a
    /// per-disease expected case rate per 100k residents, in `diseases` order.
    pub fn reference_records<F>(&mut self, n: usize, diseases: &[&str], mut case_rates: F) -> Vec<ReferenceRecord>
    where
        F: FnMut(&WeatherReading) -> Vec<f64>,
    {
        (0..n)
            .map(|i| {
                let reading = self.weather();
                let population: u64 = self.rng.gen_range(20_000..=2_000_000);
                let rates = case_rates(&reading);

                let mut cases = BTreeMap::new();
                for (name, rate) in diseases.iter().zip(rates) {
                    let expected = rate.max(0.0) * population as f64 / 100_000.0;
                    let noise = 1.0 + self.gaussian(self.count_noise) * 2.0;
                    cases.insert((*name).to_string(), (expected * noise).round().max(0.0) as u32);
                }

                ReferenceRecord {
                    location: format!("district-{:03}", i + 1),
                    weather_snapshot: reading,
                    actual_disease_case_counts: cases,
                    population,
                }
            })
            .collect()
    }
}

/// WMO code consistent with the sampled conditions.
fn weather_code_for(temperature: f64, rainfall: f64) -> u16 {
    match rainfall {
        r if r >= 30.0 && temperature >= 24.0 => 95,
        r if r >= 20.0 => 65,
        r if r >= 5.0 => 61,
        r if r >= 0.5 => 51,
        _ => 1,
    }
}

fn seasonal_temperature(day_of_year: u32) -> f64 {
    26.0 + 8.0 * (2.0 * PI * (f64::from(day_of_year) - 105.0) / 365.0).sin()
}

fn season_factor(month: u32) -> f64 {
    match month {
        12 | 1 | 2 => 1.15,
        7..=9 => 1.1,
        _ => 1.0,
    }
}

/// Fixed-date public holidays used by synthetic history.
pub fn is_fixed_holiday(date: NaiveDate) -> bool {
    matches!((date.month(), date.day()), (1, 1) | (5, 1) | (8, 15) | (10, 2) | (12, 25))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_within_ranges_and_valid() {
        let mut gen = SyntheticLabelGenerator::new(42);
        let ranges = WeatherRanges::default();
        for _ in 0..200 {
            let w = gen.weather();
            assert!(w.validate().is_ok(), "{w:?}");
            assert!(w.temperature >= ranges.temperature.0 && w.temperature <= ranges.temperature.1);
            assert!(w.dew_point <= w.temperature + 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_data() {
        let a: Vec<_> = (0..5).map(|_| SyntheticLabelGenerator::new(7).weather()).collect();
        let mut g1 = SyntheticLabelGenerator::new(7);
        let mut g2 = SyntheticLabelGenerator::new(7);
        assert_eq!(g1.weather(), g2.weather());
        assert_eq!(a[0], a[1]);
    }

    #[test]
    fn test_labels_clamped_to_bounds() {
        let mut gen = SyntheticLabelGenerator::with_label_noise(1, 0.5).unwrap();
        let data = gen.labeled(100, (0.0, 1.0), |_| vec![0.95, 0.05]);
        assert_eq!(data.len(), 100);
        for (_, labels) in &data {
            assert!(labels.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_negative_noise_rejected() {
        assert!(SyntheticLabelGenerator::with_label_noise(1, -1.0).is_err());
    }

    #[test]
    fn test_admission_history_is_consecutive() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let history = SyntheticLabelGenerator::new(3).admission_history(start, 60);
        assert_eq!(history.len(), 60);
        assert!(history[0].is_holiday);
        for pair in history.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }
        assert!(history.iter().all(|r| r.temperature.is_some()));
    }

    #[test]
    fn test_weekend_outpatients_lower_on_average() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let history = SyntheticLabelGenerator::new(11).admission_history(start, 140);
        let avg = |weekend: bool| {
            let v: Vec<f64> = history
                .iter()
                .filter(|r| r.is_weekend == weekend && !r.is_holiday)
                .map(|r| f64::from(r.subcategory_counts.outpatient))
                .collect();
            v.iter().sum::<f64>() / v.len() as f64
        };
        assert!(avg(true) < avg(false));
    }

    #[test]
    fn test_reference_records_scale_with_rate() {
        let mut gen = SyntheticLabelGenerator::new(5);
        let records = gen.reference_records(20, &["A", "B"], |_| vec![100.0, 0.0]);
        assert_eq!(records.len(), 20);
        for r in &records {
            assert_eq!(r.actual_disease_case_counts["B"], 0);
            assert!(r.population >= 20_000);
        }
    }

    #[test]
    fn test_weather_code_bands() {
        assert_eq!(weather_code_for(30.0, 40.0), 95);
        assert_eq!(weather_code_for(15.0, 40.0), 65);
        assert_eq!(weather_code_for(20.0, 0.0), 1);
    }
}
