//! Engine-wide default constants.
//!
//! Policy values that config structs fall back to when a key is absent.
//! Grouped by subsystem.

// ============================================================================
// Validation
// ============================================================================

/// Accuracy-point margin below which an ML-vs-rule comparison is a tie.
pub const TIE_TOLERANCE_PCT: f64 = 2.0;

/// Disease cases one doctor can cover (ground-truth staffing ratio).
pub const CASES_PER_DOCTOR: u32 = 50;

/// Population floor: at least one doctor per this many residents.
pub const POPULATION_PER_DOCTOR: u64 = 1_000;

/// Population unit the rule-based doctor estimate is scaled by.
pub const RULE_POPULATION_UNIT: u64 = 100_000;

// ============================================================================
// Training
// ============================================================================

pub const EPOCHS: usize = 100;

pub const BATCH_SIZE: usize = 16;

/// Fraction of examples held out for validation MAE.
pub const VALIDATION_SPLIT: f64 = 0.2;

/// Adam base learning rate.
pub const LEARNING_RATE: f64 = 0.005;

pub const SEED: u64 = 42;

/// Added to the feature standard deviation before dividing.
pub const NORMALIZATION_EPSILON: f64 = 1e-7;

/// Global L2 gradient-norm clip.
pub const MAX_GRAD_NORM: f64 = 5.0;

// ============================================================================
// Scenarios
// ============================================================================

pub const ADMISSION_MIN_SAMPLES: usize = 30;

pub const DISEASE_MIN_SAMPLES: usize = 50;

/// Synthetic weather examples generated for the disease model.
pub const DISEASE_SYNTHETIC_SAMPLES: usize = 500;

pub const GOVERNMENT_MIN_SAMPLES: usize = 20;

/// Synthetic reference records generated for the government model.
pub const GOVERNMENT_SYNTHETIC_SAMPLES: usize = 200;

// ============================================================================
// Storage
// ============================================================================

pub const MODEL_DB_PATH: &str = "./data/models";
