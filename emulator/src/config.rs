use crate::errors::{Error, Result};
use crate::location::Coordinate;
use crate::payload::Scope;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

/// Command line / environment surface of the emulator.
#[derive(Debug, Clone, Parser)]
#[command(name = "sensor-emulator", about = "Synthetic MQTT telemetry for a fleet of simulated devices")]
pub struct Args {
    #[arg(long, env = "MQTT_HOST", default_value = "localhost")]
    pub mqtt_host: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    pub mqtt_port: u16,

    #[arg(long, env = "CLIENT_ID", default_value = "sensor-emulator")]
    pub client_id: String,

    /// Comma separated environment names
    #[arg(long, env = "ENVIRONMENTS", default_value = "dev")]
    pub environments: String,

    /// Comma separated tenant names
    #[arg(long, env = "TENANTS", default_value = "tenant-a")]
    pub tenants: String,

    /// Comma separated device identifiers
    #[arg(
        long,
        env = "DEVICES",
        default_value = "device-001,device-002,device-003,device-004,device-005"
    )]
    pub devices: String,

    /// Subtracted from every humidity reading before clamping
    #[arg(long, env = "DRYNESS_LEVEL", default_value_t = 0.0, allow_negative_numbers = true)]
    pub dryness_level: f64,

    #[arg(long, env = "REALTIME_INTERVAL_SEC", default_value_t = 60.0, allow_negative_numbers = true)]
    pub realtime_interval_sec: f64,

    #[arg(long, env = "BACKFILL_FROM_YEAR", default_value_t = 2020)]
    pub backfill_from_year: i32,

    #[arg(long, env = "BACKFILL_INTERVAL_SEC", default_value_t = 60.0, allow_negative_numbers = true)]
    pub backfill_interval_sec: f64,

    #[arg(long, env = "BASE_LAT", default_value_t = 54.8433, allow_negative_numbers = true)]
    pub base_lat: f64,

    #[arg(long, env = "BASE_LON", default_value_t = 83.0931, allow_negative_numbers = true)]
    pub base_lon: f64,

    /// Days before day 1 at which the seasonal temperature curve crosses its mean
    #[arg(long, env = "TEMPERATURE_PHASE_SHIFT_DAYS", default_value_t = 200.0, allow_negative_numbers = true)]
    pub temperature_phase_shift_days: f64,

    /// Serve Prometheus metrics on this address when set
    #[arg(long, env = "METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

/// Validated, immutable runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub client_id: String,
    pub environments: Vec<String>,
    pub tenants: Vec<String>,
    pub devices: Vec<String>,
    pub dryness_level: f64,
    pub realtime_interval: Duration,
    pub backfill_from_year: i32,
    /// Kept signed: the scheduler rejects non-positive steps itself.
    pub backfill_step_ms: i64,
    pub base: Coordinate,
    pub temperature_phase_shift_days: f64,
    pub metrics_addr: Option<SocketAddr>,
}

impl Args {
    pub fn into_config(self) -> Result<Config> {
        let environments = split_list("ENVIRONMENTS", &self.environments)?;
        let tenants = split_list("TENANTS", &self.tenants)?;
        let devices = split_list("DEVICES", &self.devices)?;

        require_finite("DRYNESS_LEVEL", self.dryness_level)?;
        require_finite("BACKFILL_INTERVAL_SEC", self.backfill_interval_sec)?;
        require_finite("BASE_LAT", self.base_lat)?;
        require_finite("BASE_LON", self.base_lon)?;
        require_finite("TEMPERATURE_PHASE_SHIFT_DAYS", self.temperature_phase_shift_days)?;

        if !self.realtime_interval_sec.is_finite() || self.realtime_interval_sec <= 0.0 {
            return Err(Error::Config(format!(
                "REALTIME_INTERVAL_SEC must be > 0, got {}",
                self.realtime_interval_sec
            )));
        }

        let realtime_interval = Duration::try_from_secs_f64(self.realtime_interval_sec)
            .map_err(|e| Error::Config(format!("REALTIME_INTERVAL_SEC: {}", e)))?;
        if realtime_interval.is_zero() {
            return Err(Error::Config(format!(
                "REALTIME_INTERVAL_SEC {} rounds down to zero",
                self.realtime_interval_sec
            )));
        }

        if self.client_id.trim().is_empty() {
            return Err(Error::Config("CLIENT_ID cannot be empty".to_string()));
        }

        Ok(Config {
            mqtt_host: self.mqtt_host,
            mqtt_port: self.mqtt_port,
            client_id: self.client_id,
            environments,
            tenants,
            devices,
            dryness_level: self.dryness_level,
            realtime_interval,
            backfill_from_year: self.backfill_from_year,
            backfill_step_ms: (self.backfill_interval_sec * 1000.0) as i64,
            base: Coordinate {
                lat: self.base_lat,
                lon: self.base_lon,
            },
            temperature_phase_shift_days: self.temperature_phase_shift_days,
            metrics_addr: self.metrics_addr,
        })
    }
}

impl Config {
    /// Every (environment, tenant, device) combination, environment-major.
    pub fn scopes(&self) -> impl Iterator<Item = Scope<'_>> + '_ {
        self.environments.iter().flat_map(move |environment| {
            self.tenants.iter().flat_map(move |tenant| {
                self.devices.iter().map(move |device| Scope {
                    environment,
                    tenant,
                    device,
                })
            })
        })
    }

    /// Number of messages published per timestamp.
    pub fn messages_per_fan_out(&self) -> usize {
        3 * self.environments.len() * self.tenants.len() * self.devices.len()
    }

    pub fn log_summary(&self) {
        info!("MQTT broker: {}:{} (client id {})", self.mqtt_host, self.mqtt_port, self.client_id);
        info!("Environments: {:?}", self.environments);
        info!("Tenants: {:?}", self.tenants);
        info!("Devices: {:?}", self.devices);
        info!("Dryness level: {}", self.dryness_level);
        info!("Realtime interval: {:?}", self.realtime_interval);
        info!(
            "Backfill from year {} with step {} ms",
            self.backfill_from_year, self.backfill_step_ms
        );
        info!("Base coordinate: {}, {}", self.base.lat, self.base.lon);
    }
}

fn split_list(name: &str, raw: &str) -> Result<Vec<String>> {
    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if items.is_empty() {
        return Err(Error::Config(format!("{} must name at least one entry", name)));
    }

    Ok(items)
}

fn require_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must be a finite number, got {}", name, value)))
    }
}
