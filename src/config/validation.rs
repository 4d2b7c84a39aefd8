//! Config validation: unknown-key detection with Levenshtein suggestions
//! and policy range checks.
//!
//! Raw TOML is first walked as a `toml::Value` tree and every dotted key is
//! compared against the known field paths. Unknown keys only warn, with a
//! "did you mean?" hint when a close match exists.

use std::collections::HashSet;

use super::{EngineConfig, ScenarioConfig};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

const SCENARIO_NAMES: [&str; 3] = ["admission", "disease", "government"];

/// Every valid dotted key path for `EngineConfig`.
///
/// Kept in step with the struct hierarchy in engine_config.rs.
pub fn known_config_keys() -> HashSet<String> {
    let fixed: &[&str] = &[
        "risk",
        "risk.inclusion_threshold",
        "validation",
        "validation.tie_tolerance_pct",
        "validation.cases_per_doctor",
        "validation.population_per_doctor",
        "validation.rule_population_unit",
        "training",
        "training.epochs",
        "training.batch_size",
        "training.validation_split",
        "training.learning_rate",
        "training.seed",
        "training.normalization_epsilon",
        "training.max_grad_norm",
        "scenarios",
        "storage",
        "storage.model_db_path",
    ];

    let mut keys: HashSet<String> = fixed.iter().map(|k| (*k).to_string()).collect();
    for name in SCENARIO_NAMES {
        keys.insert(format!("scenarios.{name}"));
        for field in ["min_samples", "hidden", "synthetic_samples"] {
            keys.insert(format!("scenarios.{name}.{field}"));
        }
    }
    keys
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively collect all dotted key paths of a `toml::Value` tree.
///
/// `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Closest known key within edit distance 3, ties broken alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<String>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.clone())
}

// ============================================================================
// Unknown Key Validation
// ============================================================================

/// Warnings for every unknown key in a raw TOML document.
///
/// Parse errors are left to serde and yield no warnings here.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate policy ranges on a parsed config.
///
/// Returns (errors, warnings). Errors are impossible values that must
/// prevent startup; warnings are suspicious but usable.
pub fn validate_ranges(config: &EngineConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let th = config.risk.inclusion_threshold;
    if !(0.0..=1.0).contains(&th) {
        errors.push(format!("risk.inclusion_threshold = {th} must be in [0, 1]"));
    }

    let v = &config.validation;
    if !(v.tie_tolerance_pct >= 0.0 && v.tie_tolerance_pct < 100.0) {
        errors.push(format!(
            "validation.tie_tolerance_pct = {} must be in [0, 100)",
            v.tie_tolerance_pct
        ));
    } else if v.tie_tolerance_pct > 20.0 {
        warnings.push(ValidationWarning {
            field: "validation.tie_tolerance_pct".to_string(),
            message: format!(
                "tie_tolerance_pct = {:.1} makes most comparisons ties",
                v.tie_tolerance_pct
            ),
            suggestion: None,
        });
    }
    if v.cases_per_doctor == 0 {
        errors.push("validation.cases_per_doctor must be > 0 (used as divisor)".to_string());
    }
    if v.population_per_doctor == 0 {
        errors.push("validation.population_per_doctor must be > 0 (used as divisor)".to_string());
    }
    if v.rule_population_unit == 0 {
        errors.push("validation.rule_population_unit must be > 0 (used as divisor)".to_string());
    }

    let t = &config.training;
    if t.epochs == 0 {
        errors.push("training.epochs must be > 0".to_string());
    }
    if t.batch_size == 0 {
        errors.push("training.batch_size must be > 0".to_string());
    }
    if !(t.validation_split >= 0.0 && t.validation_split < 0.5) {
        errors.push(format!(
            "training.validation_split = {} must be in [0, 0.5)",
            t.validation_split
        ));
    }
    if !(t.learning_rate.is_finite() && t.learning_rate > 0.0) {
        errors.push(format!("training.learning_rate = {} must be > 0", t.learning_rate));
    } else if t.learning_rate > 0.1 {
        warnings.push(ValidationWarning {
            field: "training.learning_rate".to_string(),
            message: format!("learning_rate = {} is unusually high for Adam", t.learning_rate),
            suggestion: None,
        });
    }
    if !(t.normalization_epsilon.is_finite() && t.normalization_epsilon > 0.0) {
        errors.push(format!(
            "training.normalization_epsilon = {} must be > 0",
            t.normalization_epsilon
        ));
    }
    if !(t.max_grad_norm.is_finite() && t.max_grad_norm > 0.0) {
        errors.push(format!("training.max_grad_norm = {} must be > 0", t.max_grad_norm));
    }

    let s = &config.scenarios;
    for (name, sc) in [
        ("admission", &s.admission),
        ("disease", &s.disease),
        ("government", &s.government),
    ] {
        check_scenario(name, sc, &mut errors);
    }

    (errors, warnings)
}

fn check_scenario(name: &str, sc: &ScenarioConfig, errors: &mut Vec<String>) {
    if sc.min_samples == 0 {
        errors.push(format!("scenarios.{name}.min_samples must be > 0"));
    }
    if sc.hidden.is_empty() {
        errors.push(format!("scenarios.{name}.hidden must name at least one layer"));
    }
    if sc.hidden.iter().any(|&w| w == 0) {
        errors.push(format!("scenarios.{name}.hidden contains a zero-width layer"));
    }
}

// ============================================================================
// Tests
// ============================================================================
