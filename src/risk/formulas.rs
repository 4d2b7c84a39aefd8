//! Per-disease risk formulas.
//!
//! Each formula sums weighted contributions gated by threshold conditions,
//! adds a synergy bonus when several qualifying conditions co-occur, then
//! clamps the total to [0, 1]. Contributions are additive and never averaged.
//!
//! All thresholds below are heuristic policy constants carried over for
//! compatibility with existing rankings. They are not physical constants and
//! are subject to domain-expert review.

use crate::types::WeatherReading;

/// Clamp an additive risk total to [0, 1].
#[inline]
fn clamp_risk(total: f64) -> f64 {
    if total.is_nan() {
        0.0
    } else {
        total.clamp(0.0, 1.0)
    }
}

#[inline]
fn within(x: f64, lo: f64, hi: f64) -> bool {
    x >= lo && x <= hi
}

/// WMO codes 95-99: thunderstorm, with or without hail.
fn is_thunderstorm(code: u16) -> bool {
    (95..=99).contains(&code)
}

// ============================================================================
// Vector-borne
// ============================================================================

pub mod dengue {
    pub const OPTIMAL_TEMP: (f64, f64) = (25.0, 30.0);
    pub const VIABLE_TEMP: (f64, f64) = (20.0, 34.0);
    pub const HIGH_HUMIDITY: f64 = 80.0;
    pub const MODERATE_HUMIDITY: f64 = 70.0;
    pub const LOW_HUMIDITY: f64 = 60.0;
    /// Standing-water rainfall band (mm); heavier rain flushes breeding sites
    pub const BREEDING_RAIN: (f64, f64) = (5.0, 25.0);
    pub const LIGHT_RAIN: (f64, f64) = (1.0, 5.0);
    pub const CALM_WIND: f64 = 15.0;
    pub const SYNERGY_TEMP: (f64, f64) = (26.0, 30.0);
    pub const SYNERGY_HUMIDITY: f64 = 75.0;
    pub const SYNERGY_RAIN: (f64, f64) = (5.0, 30.0);
    pub const SYNERGY_BONUS: f64 = 0.15;
}

pub fn dengue_risk(w: &WeatherReading) -> f64 {
    use dengue::*;
    let mut risk = 0.0;

    if within(w.temperature, OPTIMAL_TEMP.0, OPTIMAL_TEMP.1) {
        risk += 0.30;
    } else if within(w.temperature, VIABLE_TEMP.0, VIABLE_TEMP.1) {
        risk += 0.15;
    }

    if w.humidity >= HIGH_HUMIDITY {
        risk += 0.25;
    } else if w.humidity >= MODERATE_HUMIDITY {
        risk += 0.15;
    } else if w.humidity >= LOW_HUMIDITY {
        risk += 0.05;
    }

    if within(w.rainfall, BREEDING_RAIN.0, BREEDING_RAIN.1) {
        risk += 0.20;
    } else if w.rainfall > BREEDING_RAIN.1 || within(w.rainfall, LIGHT_RAIN.0, LIGHT_RAIN.1) {
        risk += 0.10;
    }

    if w.wind_speed < CALM_WIND {
        risk += 0.05;
    }

    if within(w.temperature, SYNERGY_TEMP.0, SYNERGY_TEMP.1)
        && w.humidity >= SYNERGY_HUMIDITY
        && within(w.rainfall, SYNERGY_RAIN.0, SYNERGY_RAIN.1)
    {
        risk += SYNERGY_BONUS;
    }

    clamp_risk(risk)
}

pub mod malaria {
    pub const OPTIMAL_TEMP: (f64, f64) = (20.0, 30.0);
    pub const MARGINAL_TEMP: (f64, f64) = (18.0, 33.0);
    pub const HUMIDITY: f64 = 60.0;
    pub const HEAVY_RAIN: (f64, f64) = (10.0, 50.0);
    pub const LIGHT_RAIN: (f64, f64) = (2.0, 10.0);
    pub const WARM_DEW_POINT: f64 = 18.0;
    pub const SYNERGY_TEMP: (f64, f64) = (22.0, 30.0);
    pub const SYNERGY_HUMIDITY: f64 = 70.0;
    pub const SYNERGY_RAIN: f64 = 10.0;
    pub const SYNERGY_BONUS: f64 = 0.15;
}

pub fn malaria_risk(w: &WeatherReading) -> f64 {
    use malaria::*;
    let mut risk = 0.0;

    if within(w.temperature, OPTIMAL_TEMP.0, OPTIMAL_TEMP.1) {
        risk += 0.25;
    } else if within(w.temperature, MARGINAL_TEMP.0, MARGINAL_TEMP.1) {
        risk += 0.10;
    }

    if w.humidity >= HUMIDITY {
        risk += 0.20;
    }

    if within(w.rainfall, HEAVY_RAIN.0, HEAVY_RAIN.1) {
        risk += 0.25;
    } else if within(w.rainfall, LIGHT_RAIN.0, LIGHT_RAIN.1) {
        risk += 0.10;
    }

    if w.dew_point >= WARM_DEW_POINT {
        risk += 0.05;
    }

    if within(w.temperature, SYNERGY_TEMP.0, SYNERGY_TEMP.1)
        && w.humidity >= SYNERGY_HUMIDITY
        && w.rainfall >= SYNERGY_RAIN
    {
        risk += SYNERGY_BONUS;
    }

    clamp_risk(risk)
}

// ============================================================================
// Respiratory
// ============================================================================

pub mod influenza {
    pub const COLD_TEMP: f64 = 10.0;
    pub const COOL_TEMP: f64 = 15.0;
    pub const MILD_TEMP: f64 = 18.0;
    pub const DRY_HUMIDITY: f64 = 40.0;
    pub const MODERATE_HUMIDITY: f64 = 55.0;
    pub const LOW_UV: f64 = 3.0;
    pub const HIGH_PRESSURE: f64 = 1020.0;
    pub const STRONG_WIND: f64 = 20.0;
    pub const SYNERGY_TEMP: f64 = 10.0;
    pub const SYNERGY_HUMIDITY: f64 = 45.0;
    pub const SYNERGY_UV: f64 = 3.0;
    pub const SYNERGY_BONUS: f64 = 0.15;
}

pub fn influenza_risk(w: &WeatherReading) -> f64 {
    use influenza::*;
    let mut risk = 0.0;

    if w.temperature < COLD_TEMP {
        risk += 0.35;
    } else if w.temperature < COOL_TEMP {
        risk += 0.20;
    } else if w.temperature < MILD_TEMP {
        risk += 0.10;
    }

    if w.humidity < DRY_HUMIDITY {
        risk += 0.25;
    } else if w.humidity < MODERATE_HUMIDITY {
        risk += 0.10;
    }

    if w.uv_index < LOW_UV {
        risk += 0.15;
    }
    if w.pressure > HIGH_PRESSURE {
        risk += 0.05;
    }
    if w.wind_speed > STRONG_WIND {
        risk += 0.05;
    }

    if w.temperature < SYNERGY_TEMP && w.humidity < SYNERGY_HUMIDITY && w.uv_index < SYNERGY_UV {
        risk += SYNERGY_BONUS;
    }

    clamp_risk(risk)
}

pub mod common_cold {
    pub const BASELINE: f64 = 0.05;
    pub const COOL_TEMP: f64 = 15.0;
    pub const DAMP_HUMIDITY: f64 = 85.0;
    pub const DRY_HUMIDITY: f64 = 35.0;
    pub const INDOOR_RAIN: f64 = 5.0;
    pub const GUSTY_WIND: f64 = 25.0;
    pub const SYNERGY_TEMP: f64 = 12.0;
    pub const SYNERGY_RAIN: f64 = 2.0;
    pub const SYNERGY_WIND: f64 = 15.0;
    pub const SYNERGY_BONUS: f64 = 0.15;
}

pub fn common_cold_risk(w: &WeatherReading) -> f64 {
    use common_cold::*;
    let mut risk = BASELINE;

    if w.temperature < COOL_TEMP {
        risk += 0.25;
    }
    if w.humidity > DAMP_HUMIDITY || w.humidity < DRY_HUMIDITY {
        risk += 0.15;
    }
    // Rain keeps people indoors and in closer contact
    if w.rainfall > INDOOR_RAIN {
        risk += 0.10;
    }
    if w.wind_speed > GUSTY_WIND {
        risk += 0.10;
    }

    if w.temperature < SYNERGY_TEMP && w.rainfall > SYNERGY_RAIN && w.wind_speed > SYNERGY_WIND {
        risk += SYNERGY_BONUS;
    }

    clamp_risk(risk)
}

pub mod asthma {
    pub const COLD_AIR: f64 = 5.0;
    pub const HOT_AIR: f64 = 33.0;
    pub const MOLD_HUMIDITY: f64 = 80.0;
    pub const DRY_HUMIDITY: f64 = 30.0;
    pub const POLLEN_WIND: f64 = 25.0;
    pub const LOW_PRESSURE: f64 = 1000.0;
    pub const SYNERGY_WIND: f64 = 25.0;
    pub const SYNERGY_HUMIDITY: f64 = 70.0;
    pub const SYNERGY_BONUS: f64 = 0.15;
}

pub fn asthma_risk(w: &WeatherReading) -> f64 {
    use asthma::*;
    let mut risk = 0.0;

    if w.temperature < COLD_AIR {
        risk += 0.20;
    } else if w.temperature > HOT_AIR {
        risk += 0.15;
    }

    if w.humidity > MOLD_HUMIDITY {
        risk += 0.15;
    } else if w.humidity < DRY_HUMIDITY {
        risk += 0.10;
    }

    if w.wind_speed > POLLEN_WIND {
        risk += 0.15;
    }
    if w.pressure < LOW_PRESSURE {
        risk += 0.15;
    }
    if is_thunderstorm(w.weather_code) {
        risk += 0.20;
    }

    // Thunderstorm asthma: outflow winds fragment pollen in humid air
    if is_thunderstorm(w.weather_code)
        && w.wind_speed > SYNERGY_WIND
        && w.humidity > SYNERGY_HUMIDITY
    {
        risk += SYNERGY_BONUS;
    }

    clamp_risk(risk)
}

// ============================================================================
// Heat
// ============================================================================

pub mod heat_stroke {
    pub const EXTREME_TEMP: f64 = 40.0;
    pub const VERY_HOT_TEMP: f64 = 35.0;
    pub const HOT_TEMP: f64 = 32.0;
    pub const MUGGY_HUMIDITY: f64 = 60.0;
    pub const MUGGY_TEMP: f64 = 30.0;
    pub const EXTREME_UV: f64 = 8.0;
    pub const HIGH_UV: f64 = 6.0;
    pub const STILL_AIR: f64 = 5.0;
    pub const SYNERGY_TEMP: f64 = 35.0;
    pub const SYNERGY_HUMIDITY: f64 = 50.0;
    pub const SYNERGY_UV: f64 = 8.0;
    pub const SYNERGY_BONUS: f64 = 0.15;
}

pub fn heat_stroke_risk(w: &WeatherReading) -> f64 {
    use heat_stroke::*;
    let mut risk = 0.0;

    if w.temperature >= EXTREME_TEMP {
        risk += 0.50;
    } else if w.temperature >= VERY_HOT_TEMP {
        risk += 0.35;
    } else if w.temperature >= HOT_TEMP {
        risk += 0.20;
    }

    // Humidity blocks evaporative cooling
    if w.humidity >= MUGGY_HUMIDITY && w.temperature >= MUGGY_TEMP {
        risk += 0.20;
    }

    if w.uv_index >= EXTREME_UV {
        risk += 0.15;
    } else if w.uv_index >= HIGH_UV {
        risk += 0.05;
    }

    if w.wind_speed < STILL_AIR {
        risk += 0.05;
    }

    if w.temperature >= SYNERGY_TEMP && w.humidity >= SYNERGY_HUMIDITY && w.uv_index >= SYNERGY_UV {
        risk += SYNERGY_BONUS;
    }

    clamp_risk(risk)
}

// ============================================================================
// Waterborne
// ============================================================================

pub mod cholera {
    pub const FLOOD_RAIN: f64 = 50.0;
    pub const HEAVY_RAIN: f64 = 20.0;
    pub const MODERATE_RAIN: f64 = 10.0;
    pub const WARM_TEMP: f64 = 25.0;
    pub const MILD_TEMP: f64 = 20.0;
    pub const HUMIDITY: f64 = 75.0;
    pub const SYNERGY_RAIN: f64 = 30.0;
    pub const SYNERGY_TEMP: f64 = 25.0;
    pub const SYNERGY_BONUS: f64 = 0.20;
}

pub fn cholera_risk(w: &WeatherReading) -> f64 {
    use cholera::*;
    let mut risk = 0.0;

    if w.rainfall > FLOOD_RAIN {
        risk += 0.35;
    } else if w.rainfall > HEAVY_RAIN {
        risk += 0.20;
    } else if w.rainfall > MODERATE_RAIN {
        risk += 0.10;
    }

    if w.temperature > WARM_TEMP {
        risk += 0.20;
    } else if w.temperature > MILD_TEMP {
        risk += 0.10;
    }

    if w.humidity > HUMIDITY {
        risk += 0.10;
    }

    // Flood water contaminating supply in warm conditions
    if w.rainfall > SYNERGY_RAIN && w.temperature > SYNERGY_TEMP {
        risk += SYNERGY_BONUS;
    }

    clamp_risk(risk)
}

pub mod leptospirosis {
    pub const FLOOD_RAIN: f64 = 40.0;
    pub const HEAVY_RAIN: f64 = 15.0;
    pub const WARM_TEMP: (f64, f64) = (22.0, 32.0);
    pub const HUMIDITY: f64 = 80.0;
    pub const SYNERGY_RAIN: f64 = 40.0;
    pub const SYNERGY_TEMP: (f64, f64) = (25.0, 32.0);
    pub const SYNERGY_HUMIDITY: f64 = 80.0;
    pub const SYNERGY_BONUS: f64 = 0.20;
}

pub fn leptospirosis_risk(w: &WeatherReading) -> f64 {
    use leptospirosis::*;
    let mut risk = 0.0;

    if w.rainfall > FLOOD_RAIN {
        risk += 0.35;
    } else if w.rainfall > HEAVY_RAIN {
        risk += 0.20;
    }

    if within(w.temperature, WARM_TEMP.0, WARM_TEMP.1) {
        risk += 0.20;
    }
    if w.humidity > HUMIDITY {
        risk += 0.15;
    }

    if w.rainfall > SYNERGY_RAIN
        && within(w.temperature, SYNERGY_TEMP.0, SYNERGY_TEMP.1)
        && w.humidity > SYNERGY_HUMIDITY
    {
        risk += SYNERGY_BONUS;
    }

    clamp_risk(risk)
}
