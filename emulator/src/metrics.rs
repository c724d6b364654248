use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Opts, Registry, TextEncoder};
use tracing::warn;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref PUBLISHED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "emulator_published_total",
        "Total sensor messages handed to the MQTT client"
    ))
    .unwrap();
    pub static ref PUBLISH_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "emulator_publish_failures_total",
        "Total sensor or ack messages the MQTT client refused"
    ))
    .unwrap();
    pub static ref BACKFILL_TIMESTAMPS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "emulator_backfill_timestamps_total",
        "Historical timestamps replayed during backfill"
    ))
    .unwrap();
    pub static ref REALTIME_TICKS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "emulator_realtime_ticks_total",
        "Fan-outs performed in realtime mode"
    ))
    .unwrap();
    pub static ref LAST_FAN_OUT_TIMESTAMP: Gauge = Gauge::with_opts(Opts::new(
        "emulator_last_fan_out_timestamp_ms",
        "Simulated timestamp of the most recent fan-out"
    ))
    .unwrap();
    pub static ref COMMANDS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "emulator_commands_total",
        "Total command messages received"
    ))
    .unwrap();
    pub static ref COMMANDS_DROPPED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "emulator_commands_dropped_total",
        "Commands dropped for a malformed topic or a full queue"
    ))
    .unwrap();
    pub static ref ACKS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "emulator_acks_total",
        "Total acknowledgments published"
    ))
    .unwrap();
}

pub fn init_metrics() {
    let collectors: [Box<dyn prometheus::core::Collector>; 8] = [
        Box::new(PUBLISHED_TOTAL.clone()),
        Box::new(PUBLISH_FAILURES_TOTAL.clone()),
        Box::new(BACKFILL_TIMESTAMPS_TOTAL.clone()),
        Box::new(REALTIME_TICKS_TOTAL.clone()),
        Box::new(LAST_FAN_OUT_TIMESTAMP.clone()),
        Box::new(COMMANDS_TOTAL.clone()),
        Box::new(COMMANDS_DROPPED_TOTAL.clone()),
        Box::new(ACKS_TOTAL.clone()),
    ];

    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            warn!("Failed to register metric: {}", e);
        }
    }
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
