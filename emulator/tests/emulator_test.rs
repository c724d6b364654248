use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sensor_emulator::config::{Args, Config};
use sensor_emulator::errors::Result;
use sensor_emulator::publisher::Publisher;
use sensor_emulator::responder::{CommandResponder, InboundCommand};
use sensor_emulator::scheduler::{BackfillWindow, Scheduler};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Default)]
struct RecordingPublisher {
    sent: Mutex<Vec<(String, Value)>>,
}

impl RecordingPublisher {
    fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }

    fn on_topic(&self, suffix: &str) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|(topic, _)| topic.ends_with(suffix))
            .map(|(_, value)| value)
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let value: Value = serde_json::from_slice(&payload).unwrap();
        self.sent.lock().unwrap().push((topic.to_string(), value));
        Ok(())
    }
}

fn config(args: &[&str]) -> Arc<Config> {
    let mut argv = vec!["sensor-emulator"];
    argv.extend_from_slice(args);
    Arc::new(Args::parse_from(argv).into_config().unwrap())
}

fn year_start(year: i32) -> i64 {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap().timestamp_millis()
}

#[tokio::test]
async fn test_backfill_day_of_hourly_readings() {
    let config = config(&[
        "--environments", "dev,staging",
        "--tenants", "tenant-a",
        "--devices", "device-001,device-002,device-003",
        "--backfill-from-year", "2023",
        "--backfill-interval-sec", "3600",
    ]);
    let publisher = Arc::new(RecordingPublisher::default());
    let mut scheduler = Scheduler::new(config.clone(), publisher.clone(), StdRng::seed_from_u64(2023));

    let end = year_start(2023) + 24 * 3_600_000;
    let batches = scheduler.run_backfill(end).await.unwrap();

    let window = BackfillWindow::new(2023, end, 3_600_000).unwrap();
    assert_eq!(batches, window.len());
    assert_eq!(batches, 24);
    assert_eq!(publisher.sent().len(), 24 * config.messages_per_fan_out());

    // January base humidity is 88; noise is σ=3.
    let humidity = publisher.on_topic("/humidity");
    assert_eq!(humidity.len(), 24 * 6);
    let mean_h = humidity.iter().map(|v| v["h"].as_f64().unwrap()).sum::<f64>() / humidity.len() as f64;
    assert!((mean_h - 88.0).abs() < 2.0, "mean humidity {}", mean_h);

    for state in publisher.on_topic("/state") {
        let rssi = state["rssi"].as_i64().unwrap();
        assert!((-100..=-50).contains(&rssi));
        assert_eq!(state["online"], true);
    }
}

#[tokio::test]
async fn test_location_center_stable_across_schedulers() {
    let config = config(&["--devices", "device-042", "--backfill-from-year", "2024"]);
    let end = year_start(2024) + 400 * 60_000;

    let mut means = Vec::new();
    for seed in [1, 2] {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut scheduler = Scheduler::new(config.clone(), publisher.clone(), StdRng::seed_from_u64(seed));
        scheduler.run_backfill(end).await.unwrap();

        let locations = publisher.on_topic("/location");
        assert_eq!(locations.len(), 400);
        let n = locations.len() as f64;
        let lat = locations.iter().map(|v| v["lat"].as_f64().unwrap()).sum::<f64>() / n;
        let lon = locations.iter().map(|v| v["lon"].as_f64().unwrap()).sum::<f64>() / n;
        means.push((lat, lon));
    }

    assert!((means[0].0 - means[1].0).abs() < 5e-5);
    assert!((means[0].1 - means[1].1).abs() < 5e-5);
    assert!((means[0].0 - 54.8433).abs() <= 0.0051);
    assert!((means[0].1 - 83.0931).abs() <= 0.0101);
}

#[tokio::test]
async fn test_responder_and_scheduler_share_publisher() {
    let config = config(&["--devices", "device-001", "--backfill-from-year", "2022"]);
    let publisher = Arc::new(RecordingPublisher::default());

    let (tx, rx) = mpsc::channel(16);
    let responder = CommandResponder::new(publisher.clone());
    let responder_handle = tokio::spawn(async move { responder.run(rx).await });

    let mut scheduler = Scheduler::new(config, publisher.clone(), StdRng::seed_from_u64(7));
    let backfill = tokio::spawn(async move { scheduler.run_backfill(year_start(2022) + 100 * 60_000).await });

    for (topic, body) in [
        ("dev/t1/devices/device-001/command", br#"{"cmd_id":"abc123"}"#.to_vec()),
        ("dev/t1/devices/device-001/command", b"\x00garbage".to_vec()),
        ("dev/t1/devices", br#"{"cmd_id":"lost"}"#.to_vec()),
    ] {
        tx.send(InboundCommand {
            topic: topic.to_string(),
            payload: body,
        })
        .await
        .unwrap();
    }
    drop(tx);

    assert_eq!(backfill.await.unwrap().unwrap(), 100);
    tokio::time::timeout(Duration::from_secs(5), responder_handle)
        .await
        .unwrap()
        .unwrap();

    let sent = publisher.sent();
    let acks: Vec<_> = sent.iter().filter(|(topic, _)| topic.ends_with("/ack")).collect();
    assert_eq!(acks.len(), 2);
    assert!(acks.iter().all(|(topic, _)| topic == "dev/t1/devices/device-001/ack"));
    assert_eq!(acks[0].1["cmd_id"], "abc123");
    assert_eq!(acks[0].1["status"], "ok");
    assert_eq!(acks[1].1["cmd_id"], "unknown");

    assert_eq!(sent.len() - acks.len(), 100 * 3);
}
