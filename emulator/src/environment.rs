use crate::config::Config;
use crate::noise::NoiseSource;
use chrono::{DateTime, Datelike, Utc};
use std::f64::consts::PI;

const TEMP_MEAN: f64 = 5.0;
const TEMP_AMPLITUDE: f64 = 25.0;
const TEMP_NOISE_SIGMA: f64 = 1.0;
const DAYS_PER_YEAR: f64 = 365.0;

pub const DEFAULT_PHASE_SHIFT_DAYS: f64 = 200.0;

const HUMIDITY_NOISE_SIGMA: f64 = 3.0;
const HUMIDITY_MIN: f64 = 0.0;
const HUMIDITY_MAX: f64 = 100.0;

/// Base relative humidity per calendar month, January first.
const MONTHLY_HUMIDITY: [f64; 12] = [
    88.0, 86.0, 80.0, 68.0, 58.0, 64.0, 69.0, 70.0, 72.0, 76.0, 82.0, 85.0,
];

/// Seasonal weather parameters shared by every simulated device.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentModel {
    pub phase_shift_days: f64,
    pub dryness_level: f64,
}

impl Default for EnvironmentModel {
    fn default() -> Self {
        Self {
            phase_shift_days: DEFAULT_PHASE_SHIFT_DAYS,
            dryness_level: 0.0,
        }
    }
}

impl EnvironmentModel {
    pub fn from_config(config: &Config) -> Self {
        Self {
            phase_shift_days: config.temperature_phase_shift_days,
            dryness_level: config.dryness_level,
        }
    }

    pub fn temperature(&self, ts_ms: i64, noise: &mut impl NoiseSource) -> f64 {
        seasonal_temperature(ts_ms, self.phase_shift_days, noise)
    }

    pub fn humidity(&self, ts_ms: i64, noise: &mut impl NoiseSource) -> f64 {
        seasonal_humidity(ts_ms, self.dryness_level, noise)
    }
}

/// Sinusoid over the UTC day of year plus N(0, 1) noise. Unbounded.
pub fn seasonal_temperature(ts_ms: i64, phase_shift_days: f64, noise: &mut impl NoiseSource) -> f64 {
    let day = utc_datetime(ts_ms).ordinal() as f64;
    let angle = 2.0 * PI * ((day - 1.0 - phase_shift_days) / DAYS_PER_YEAR);

    TEMP_MEAN + TEMP_AMPLITUDE * angle.sin() + noise.gaussian(TEMP_NOISE_SIGMA)
}

/// Monthly base humidity plus N(0, 3) noise minus `dryness`, clamped to [0, 100].
pub fn seasonal_humidity(ts_ms: i64, dryness: f64, noise: &mut impl NoiseSource) -> f64 {
    let month = utc_datetime(ts_ms).month0() as usize;
    let h = MONTHLY_HUMIDITY[month] + noise.gaussian(HUMIDITY_NOISE_SIGMA) - dryness;

    h.clamp(HUMIDITY_MIN, HUMIDITY_MAX)
}

// Timestamps outside chrono's calendar range evaluate as the epoch.
fn utc_datetime(ts_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts_ms).unwrap_or(DateTime::UNIX_EPOCH)
}
