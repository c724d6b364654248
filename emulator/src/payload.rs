use crate::environment::EnvironmentModel;
use crate::errors::Result;
use crate::location::{device_location, Coordinate};
use crate::noise::NoiseSource;
use crate::topics::{sensor_topic, HUMIDITY_SUFFIX, LOCATION_SUFFIX, STATE_SUFFIX};
use serde::{Deserialize, Serialize};

const RSSI_MIN: i32 = -100;
const RSSI_MAX: i32 = -50;
const SNR_MIN: f64 = -10.0;
const SNR_MAX: f64 = 10.0;
const BATTERY_MIN: f64 = 20.0;
const BATTERY_MAX: f64 = 100.0;

pub const ACK_STATUS_OK: &str = "ok";
pub const ACK_DETAILS: &str = "Command accepted by emulator";

/// One simulated device's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope<'a> {
    pub environment: &'a str,
    pub tenant: &'a str,
    pub device: &'a str,
}

/// Humidity and temperature reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumidityPayload {
    pub d: String,
    pub ts: i64,
    pub h: f64,
    pub t: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPayload {
    pub d: String,
    pub ts: i64,
    pub lat: f64,
    pub lon: f64,
}

/// Radio and battery state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    pub d: String,
    pub ts: i64,
    pub rssi: i32,
    pub snr: f64,
    pub bat: f64,
    pub online: bool,
}

/// Reply to a device command. `cmd_id` is echoed verbatim, whatever its JSON type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckPayload {
    pub cmd_id: serde_json::Value,
    pub ts: i64,
    pub status: String,
    pub details: String,
}

impl AckPayload {
    pub fn accepted(cmd_id: serde_json::Value, ts: i64) -> Self {
        Self {
            cmd_id,
            ts,
            status: ACK_STATUS_OK.to_string(),
            details: ACK_DETAILS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// The three records emitted for one scope at one timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Readings {
    pub humidity: HumidityPayload,
    pub location: LocationPayload,
    pub state: StatePayload,
}

impl Readings {
    pub fn generate(
        device: &str,
        ts: i64,
        model: &EnvironmentModel,
        base: Coordinate,
        noise: &mut impl NoiseSource,
    ) -> Self {
        let temperature = model.temperature(ts, noise);
        let humidity = model.humidity(ts, noise);
        let position = device_location(base, device, noise);

        Self {
            humidity: HumidityPayload {
                d: device.to_string(),
                ts,
                h: round_to(humidity, 1),
                t: round_to(temperature, 1),
            },
            location: LocationPayload {
                d: device.to_string(),
                ts,
                lat: round_to(position.lat, 6),
                lon: round_to(position.lon, 6),
            },
            state: StatePayload {
                d: device.to_string(),
                ts,
                rssi: noise.uniform_int(RSSI_MIN, RSSI_MAX),
                snr: round_to(noise.uniform(SNR_MIN, SNR_MAX), 1),
                bat: round_to(noise.uniform(BATTERY_MIN, BATTERY_MAX), 1),
                online: true,
            },
        }
    }

    pub fn into_messages(self, scope: &Scope<'_>) -> Result<[OutgoingMessage; 3]> {
        let topic = |suffix: &str| sensor_topic(scope.environment, scope.tenant, scope.device, suffix);

        Ok([
            OutgoingMessage {
                topic: topic(HUMIDITY_SUFFIX),
                payload: serde_json::to_vec(&self.humidity)?,
            },
            OutgoingMessage {
                topic: topic(LOCATION_SUFFIX),
                payload: serde_json::to_vec(&self.location)?,
            },
            OutgoingMessage {
                topic: topic(STATE_SUFFIX),
                payload: serde_json::to_vec(&self.state)?,
            },
        ])
    }
}

/// Builds the humidity, location and state messages for `scope` at `ts`.
pub fn assemble(
    scope: &Scope<'_>,
    ts: i64,
    model: &EnvironmentModel,
    base: Coordinate,
    noise: &mut impl NoiseSource,
) -> Result<[OutgoingMessage; 3]> {
    Readings::generate(scope.device, ts, model, base, noise).into_messages(scope)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
