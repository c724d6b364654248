use crate::errors::Result;
use crate::metrics::{ACKS_TOTAL, COMMANDS_DROPPED_TOTAL, COMMANDS_TOTAL, PUBLISH_FAILURES_TOTAL};
use crate::payload::AckPayload;
use crate::publisher::Publisher;
use crate::topics::CommandTopic;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const UNKNOWN_COMMAND_ID: &str = "unknown";

/// A command message as delivered by the transport.
#[derive(Debug, Clone)]
pub struct InboundCommand {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Builds the acknowledgment for a command, or `None` if the topic is too
/// short to address a device.
///
/// Bodies that are not a JSON object are treated as an empty record, so
/// such commands are still acknowledged, with `cmd_id` "unknown".
pub fn build_ack(topic: &str, payload: &[u8], now_ms: i64) -> Option<(String, AckPayload)> {
    let Some(command_topic) = CommandTopic::parse(topic) else {
        warn!("Unexpected topic format for command, skipping: {}", topic);
        return None;
    };

    let body = parse_body(payload);
    let cmd_id = body
        .get("cmd_id")
        .cloned()
        .unwrap_or_else(|| Value::String(UNKNOWN_COMMAND_ID.to_string()));

    Some((command_topic.ack_topic(), AckPayload::accepted(cmd_id, now_ms)))
}

fn parse_body(payload: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            debug!("Command body is not an object ({}), using empty record", other);
            Map::new()
        }
        Err(e) => {
            debug!("Command body is not valid JSON ({}), using empty record", e);
            Map::new()
        }
    }
}

/// Acknowledges every command on a well-formed topic. No retry, no
/// deduplication.
pub struct CommandResponder<P> {
    publisher: P,
}

impl<P: Publisher> CommandResponder<P> {
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    /// Returns whether an acknowledgment was published.
    pub async fn respond(&self, command: &InboundCommand) -> Result<bool> {
        COMMANDS_TOTAL.inc();
        info!(
            "Command received on {} ({} bytes)",
            command.topic,
            command.payload.len()
        );

        let Some((ack_topic, ack)) = build_ack(&command.topic, &command.payload, Utc::now().timestamp_millis())
        else {
            COMMANDS_DROPPED_TOTAL.inc();
            return Ok(false);
        };

        let body = serde_json::to_vec(&ack)?;
        self.publisher.publish(&ack_topic, body).await?;
        ACKS_TOTAL.inc();
        info!("Sent ACK to {} for cmd_id {}", ack_topic, ack.cmd_id);

        Ok(true)
    }

    /// Handles commands until every sender is dropped.
    pub async fn run(&self, mut rx: mpsc::Receiver<InboundCommand>) {
        info!("Command responder started");

        while let Some(command) = rx.recv().await {
            if let Err(e) = self.respond(&command).await {
                PUBLISH_FAILURES_TOTAL.inc();
                error!("Failed to acknowledge command on {}: {}", command.topic, e);
            }
        }

        info!("Command channel closed, responder stopped");
    }
}
