use crate::config::Config;
use crate::environment::EnvironmentModel;
use crate::errors::{Error, Result};
use crate::metrics::{
    BACKFILL_TIMESTAMPS_TOTAL, LAST_FAN_OUT_TIMESTAMP, PUBLISHED_TOTAL, PUBLISH_FAILURES_TOTAL,
    REALTIME_TICKS_TOTAL,
};
use crate::noise::NoiseSource;
use crate::payload::assemble;
use crate::publisher::Publisher;
use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Backfill progress is logged once per this many timestamps.
const PROGRESS_EVERY: u64 = 500;

/// Historical range replayed before switching to realtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillWindow {
    pub start_ms: i64,
    pub end_ms: i64,
    pub step_ms: i64,
}

impl BackfillWindow {
    /// Starts at Jan 1 00:00 UTC of `from_year`; `end_ms` is exclusive.
    pub fn new(from_year: i32, end_ms: i64, step_ms: i64) -> Result<Self> {
        if step_ms <= 0 {
            return Err(Error::InvalidBackfillStep(step_ms));
        }

        let start = Utc
            .with_ymd_and_hms(from_year, 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| Error::Config(format!("BACKFILL_FROM_YEAR {} is out of range", from_year)))?;

        Ok(Self {
            start_ms: start.timestamp_millis(),
            end_ms,
            step_ms,
        })
    }

    /// ceil((end - start) / step), or 0 when the window is empty.
    pub fn len(&self) -> u64 {
        if self.end_ms <= self.start_ms {
            return 0;
        }
        let span = (i128::from(self.end_ms) - i128::from(self.start_ms)) as u128;
        span.div_ceil(self.step_ms as u128) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn timestamps(&self) -> impl Iterator<Item = i64> {
        let BackfillWindow { start_ms, end_ms, step_ms } = *self;
        std::iter::successors(Some(start_ms), move |ts| ts.checked_add(step_ms))
            .take_while(move |ts| *ts < end_ms)
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub published: usize,
    pub failed: usize,
}

/// Drives the backfill phase followed by the never-ending realtime phase.
pub struct Scheduler<P, N = StdRng> {
    config: Arc<Config>,
    model: EnvironmentModel,
    publisher: P,
    noise: N,
}

impl<P, N> Scheduler<P, N>
where
    P: Publisher,
    N: NoiseSource + Send,
{
    pub fn new(config: Arc<Config>, publisher: P, noise: N) -> Self {
        let model = EnvironmentModel::from_config(&config);
        Self {
            config,
            model,
            publisher,
            noise,
        }
    }

    /// Publishes humidity, location and state for every scope at `ts`.
    /// Failed publishes are counted and skipped.
    pub async fn fan_out(&mut self, ts: i64) -> FanOutReport {
        let mut report = FanOutReport::default();

        for scope in self.config.scopes() {
            let messages = match assemble(&scope, ts, &self.model, self.config.base, &mut self.noise) {
                Ok(messages) => messages,
                Err(e) => {
                    error!("Failed to serialize readings for {}: {}", scope.device, e);
                    report.failed += 3;
                    PUBLISH_FAILURES_TOTAL.inc_by(3.0);
                    continue;
                }
            };

            for message in messages {
                match self.publisher.publish(&message.topic, message.payload).await {
                    Ok(()) => {
                        report.published += 1;
                        PUBLISHED_TOTAL.inc();
                    }
                    Err(e) => {
                        report.failed += 1;
                        PUBLISH_FAILURES_TOTAL.inc();
                        warn!("Failed to publish to {}: {}", message.topic, e);
                    }
                }
            }
        }

        LAST_FAN_OUT_TIMESTAMP.set(ts as f64);
        report
    }

    /// Replays every step from Jan 1 of the configured year up to `end_ms`
    /// as fast as the publisher accepts. Returns the number of timestamps.
    pub async fn run_backfill(&mut self, end_ms: i64) -> Result<u64> {
        let window = BackfillWindow::new(
            self.config.backfill_from_year,
            end_ms,
            self.config.backfill_step_ms,
        )?;
        let total = window.len();

        info!(
            "Starting backfill from {} to {}, step = {} ms ({} timestamps, {} messages each)",
            format_ts(window.start_ms),
            format_ts(window.end_ms),
            window.step_ms,
            total,
            self.config.messages_per_fan_out()
        );

        let mut batch = 0u64;
        for ts in window.timestamps() {
            let report = self.fan_out(ts).await;
            batch += 1;
            BACKFILL_TIMESTAMPS_TOTAL.inc();

            if report.failed > 0 {
                debug!("Backfill batch {} had {} failed publishes", batch, report.failed);
            }
            if batch % PROGRESS_EVERY == 0 {
                info!("Backfill progress: {} (batch {}/{})", format_ts(ts), batch, total);
            }

            // Keep the command responder served during a long replay.
            tokio::task::yield_now().await;
        }

        info!("Backfill finished, total batches: {}", batch);
        Ok(batch)
    }

    /// One fan-out at wall-clock now, then a full interval of sleep, forever.
    /// Time spent publishing is not subtracted from the sleep.
    pub async fn run_realtime(&mut self) {
        info!(
            "Switching to realtime mode, interval = {:?}",
            self.config.realtime_interval
        );

        loop {
            let now_ms = Utc::now().timestamp_millis();
            let report = self.fan_out(now_ms).await;
            REALTIME_TICKS_TOTAL.inc();

            debug!(
                "Realtime tick at {}: {} published, {} failed",
                format_ts(now_ms),
                report.published,
                report.failed
            );

            tokio::time::sleep(self.config.realtime_interval).await;
        }
    }

    /// Backfill up to the moment of the call, then realtime. Only returns on
    /// a backfill configuration error.
    pub async fn run(&mut self) -> Result<()> {
        let end_ms = Utc::now().timestamp_millis();
        self.run_backfill(end_ms).await?;
        self.run_realtime().await;
        Ok(())
    }
}

fn format_ts(ts_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts_ms.to_string())
}
