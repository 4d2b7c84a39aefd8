//! Named, ordered feature schemas.
//!
//! Field order is a contract between the normalizer, the trained network and
//! every caller. A [`FeatureVector`] can only be built through its schema and
//! remembers which schema produced it, so a vector from one schema is
//! rejected by statistics or models fitted on another.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Value domain of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Any finite real.
    Continuous,
    /// Finite whole number (codes, counts, calendar fields).
    Integer,
    /// 0 or 1.
    Flag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureField {
    pub name: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    name: String,
    fields: Vec<FeatureField>,
}

// ============================================================================
// Scenario schemas
// ============================================================================

pub const DISEASE_SCHEMA: &str = "disease_weather_v1";
pub const ADMISSION_SCHEMA: &str = "admission_history_v1";
pub const GOVERNMENT_SCHEMA: &str = "government_weather_population_v1";

use FieldKind::{Continuous, Flag, Integer};

const DISEASE_FIELDS: [(&str, FieldKind); 10] = [
    ("temperature", Continuous),
    ("humidity", Continuous),
    ("rainfall", Continuous),
    ("wind_speed", Continuous),
    ("uv_index", Continuous),
    ("pressure", Continuous),
    ("dew_point", Continuous),
    ("weather_code", Integer),
    ("month", Integer),
    ("day_of_year", Integer),
];

const ADMISSION_FIELDS: [(&str, FieldKind); 10] = [
    ("day_of_week", Integer),
    ("is_weekend", Flag),
    ("is_holiday", Flag),
    ("month", Integer),
    ("trailing_7d_avg", Continuous),
    ("trailing_30d_avg", Continuous),
    ("same_weekday_last_week", Continuous),
    ("same_day_last_month", Continuous),
    ("trend", Continuous),
    ("temperature", Continuous),
];

const GOVERNMENT_FIELDS: [(&str, FieldKind); 8] = [
    ("temperature", Continuous),
    ("humidity", Continuous),
    ("rainfall", Continuous),
    ("wind_speed", Continuous),
    ("uv_index", Continuous),
    ("pressure", Continuous),
    ("dew_point", Continuous),
    ("population_thousands", Continuous),
];

impl FeatureSchema {
    pub fn new(name: impl Into<String>, fields: &[(&str, FieldKind)]) -> Self {
        Self {
            name: name.into(),
            fields: fields
                .iter()
                .map(|(n, k)| FeatureField { name: (*n).to_string(), kind: *k })
                .collect(),
        }
    }

    /// 10 weather fields consumed by the disease-risk model.
    pub fn disease() -> Self {
        Self::new(DISEASE_SCHEMA, &DISEASE_FIELDS)
    }

    /// 10 calendar, history and weather fields for admission forecasting.
    pub fn admission() -> Self {
        Self::new(ADMISSION_SCHEMA, &ADMISSION_FIELDS)
    }

    /// 7 weather fields plus population (thousands) for doctor estimates.
    pub fn government() -> Self {
        Self::new(GOVERNMENT_SCHEMA, &GOVERNMENT_FIELDS)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FeatureField] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn width(&self) -> usize {
        self.fields.len()
    }

    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == field)
    }

    /// Build a vector for this schema, checking width and each field's kind.
    pub fn vector(&self, values: Vec<f64>) -> Result<FeatureVector, EngineError> {
        if values.len() != self.fields.len() {
            return Err(EngineError::invalid_feature(
                self.name.clone(),
                format!("expected {} values, got {}", self.fields.len(), values.len()),
            ));
        }

        for (field, &v) in self.fields.iter().zip(&values) {
            if !v.is_finite() {
                return Err(EngineError::invalid_feature(field.name.clone(), "must be finite"));
            }
            match field.kind {
                Continuous => {}
                Integer if v.fract() != 0.0 => {
                    return Err(EngineError::invalid_feature(
                        field.name.clone(),
                        format!("{v} is not a whole number"),
                    ));
                }
                Flag if v != 0.0 && v != 1.0 => {
                    return Err(EngineError::invalid_feature(
                        field.name.clone(),
                        format!("{v} is not a 0/1 flag"),
                    ));
                }
                _ => {}
            }
        }

        Ok(FeatureVector { schema: self.name.clone(), values })
    }

    /// Reject vectors built by a different schema.
    pub fn check(&self, vector: &FeatureVector) -> Result<(), EngineError> {
        if vector.schema != self.name {
            return Err(EngineError::invalid_feature(
                "schema",
                format!("vector built for '{}', expected '{}'", vector.schema, self.name),
            ));
        }
        if vector.values.len() != self.fields.len() {
            return Err(EngineError::invalid_feature(
                self.name.clone(),
                format!("expected {} values, got {}", self.fields.len(), vector.values.len()),
            ));
        }
        Ok(())
    }
}

/// Ordered values tagged with the schema that validated them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    schema: String,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_schema_widths() {
        assert_eq!(FeatureSchema::disease().width(), 10);
        assert_eq!(FeatureSchema::admission().width(), 10);
        assert_eq!(FeatureSchema::government().width(), 8);
    }

    #[test]
    fn test_field_order_is_stable() {
        let schema = FeatureSchema::admission();
        let names = schema.field_names();
        assert_eq!(names[0], "day_of_week");
        assert_eq!(names[4], "trailing_7d_avg");
        assert_eq!(names[8], "trend");
        assert_eq!(FeatureSchema::disease().index_of("rainfall"), Some(2));
    }

    #[test]
    fn test_wrong_width_rejected() {
        let err = FeatureSchema::disease().vector(vec![1.0; 9]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidFeature);
    }

    #[test]
    fn test_flag_and_integer_kinds_enforced() {
        let schema = FeatureSchema::admission();
        let mut values = vec![0.0; 10];
        values[1] = 0.5;
        assert!(schema.vector(values.clone()).is_err());

        values[1] = 1.0;
        values[0] = 2.5;
        assert!(schema.vector(values.clone()).is_err());

        values[0] = 2.0;
        assert!(schema.vector(values).is_ok());
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut values = vec![1.0; 8];
        values[3] = f64::NAN;
        assert!(FeatureSchema::government().vector(values).is_err());
    }

    #[test]
    fn test_cross_schema_vector_rejected() {
        let v = FeatureSchema::disease().vector(vec![1.0; 10]).unwrap();
        assert!(FeatureSchema::disease().check(&v).is_ok());
        assert!(FeatureSchema::admission().check(&v).is_err());
    }
}
