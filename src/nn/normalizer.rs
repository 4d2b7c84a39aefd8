//! Batch z-score normalization with learned per-column statistics.
//!
//! `fit` computes mean and population standard deviation per column over a
//! training set; `transform` applies `(x - mean) / (std + epsilon)`. The
//! epsilon keeps constant columns finite (they map to 0). `denormalize` is
//! the exact inverse and is used to report scaled targets in original units.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use super::schema::{FeatureSchema, FeatureVector};
use crate::error::EngineError;

/// Default epsilon added to the standard deviation.
pub const DEFAULT_EPSILON: f64 = 1e-7;

/// Per-column mean / population std pair, tagged with the column set it was
/// fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStatistics {
    /// Schema name for feature statistics, or a target label for target statistics.
    columns: String,
    mean: Vec<f64>,
    std: Vec<f64>,
    epsilon: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureNormalizer {
    epsilon: f64,
}

impl Default for FeatureNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl FeatureNormalizer {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Fit statistics over feature vectors of one schema.
    pub fn fit(
        &self,
        schema: &FeatureSchema,
        vectors: &[FeatureVector],
    ) -> Result<NormalizationStatistics, EngineError> {
        for v in vectors {
            schema.check(v)?;
        }
        let rows: Vec<&[f64]> = vectors.iter().map(|v| v.values()).collect();
        self.fit_rows(schema.name(), schema.width(), &rows)
    }

    /// Fit statistics over raw equal-width rows (used for regression targets).
    pub fn fit_rows(
        &self,
        columns: &str,
        width: usize,
        rows: &[&[f64]],
    ) -> Result<NormalizationStatistics, EngineError> {
        if rows.is_empty() {
            return Err(EngineError::InsufficientData {
                scenario: columns.to_string(),
                available: 0,
                required: 1,
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(EngineError::invalid_feature(
                columns,
                format!("row width {} does not match {}", bad.len(), width),
            ));
        }

        let mut mean = Vec::with_capacity(width);
        let mut std = Vec::with_capacity(width);
        for col in 0..width {
            let column: Vec<f64> = rows.iter().map(|r| r[col]).collect();
            mean.push(column.iter().mean());
            std.push(column.iter().population_std_dev());
        }

        if mean.iter().chain(&std).any(|v| !v.is_finite()) {
            return Err(EngineError::invalid_feature(columns, "statistics are not finite"));
        }

        Ok(NormalizationStatistics {
            columns: columns.to_string(),
            mean,
            std,
            epsilon: self.epsilon,
        })
    }
}

impl NormalizationStatistics {
    pub fn columns(&self) -> &str {
        &self.columns
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Normalize a feature vector; rejects vectors from another schema.
    pub fn transform(&self, vector: &FeatureVector) -> Result<Vec<f64>, EngineError> {
        if vector.schema() != self.columns {
            return Err(EngineError::invalid_feature(
                "schema",
                format!(
                    "statistics fitted on '{}', vector built for '{}'",
                    self.columns,
                    vector.schema()
                ),
            ));
        }
        self.transform_values(vector.values())
    }

    /// Normalize raw values of the fitted width.
    pub fn transform_values(&self, values: &[f64]) -> Result<Vec<f64>, EngineError> {
        self.check_width(values.len())?;
        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(x, (m, s))| (x - m) / (s + self.epsilon))
            .collect())
    }

    /// Inverse of `transform_values`.
    pub fn denormalize(&self, values: &[f64]) -> Result<Vec<f64>, EngineError> {
        self.check_width(values.len())?;
        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(z, (m, s))| z * (s + self.epsilon) + m)
            .collect())
    }

    fn check_width(&self, len: usize) -> Result<(), EngineError> {
        if len != self.mean.len() {
            return Err(EngineError::invalid_feature(
                self.columns.clone(),
                format!("expected {} values, got {}", self.mean.len(), len),
            ));
        }
        Ok(())
    }
}
