use crate::config::Config;
use crate::errors::{Error, Result};
use crate::metrics::COMMANDS_DROPPED_TOTAL;
use crate::publisher::MqttPublisher;
use crate::responder::InboundCommand;
use crate::topics::COMMAND_FILTER;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, QoS};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const KEEP_ALIVE_SECS: u64 = 60;
const REQUEST_CAPACITY: usize = 20000;
const RECONNECT_DELAY_SECS: u64 = 3;

pub fn mqtt_options(config: &Config) -> MqttOptions {
    let mut mqtt_options = MqttOptions::new(&config.client_id, &config.mqtt_host, config.mqtt_port);
    mqtt_options.set_keep_alive(Duration::from_secs(KEEP_ALIVE_SECS));
    mqtt_options.set_clean_session(true);
    mqtt_options
}

/// Creates the client and spawns its event loop. Inbound commands are
/// handed to `commands`.
pub fn connect(config: &Config, commands: mpsc::Sender<InboundCommand>) -> (MqttPublisher, JoinHandle<()>) {
    info!("Connecting to MQTT broker at {}:{}", config.mqtt_host, config.mqtt_port);

    let (client, eventloop) = AsyncClient::new(mqtt_options(config), REQUEST_CAPACITY);
    let subscriber = client.clone();

    let handle = tokio::spawn(async move {
        run_event_loop(eventloop, subscriber, commands).await;
    });

    (MqttPublisher::new(client), handle)
}

/// Drives the connection forever. rumqttc reconnects on the next poll after
/// an error; the command subscription is renewed on every ConnAck since the
/// session is clean.
pub async fn run_event_loop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    commands: mpsc::Sender<InboundCommand>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!("Connected to MQTT broker, rc: {:?}", ack.code);
                // The request queue may be full of publishes; waiting on it
                // here would stall the loop that drains it.
                let client = client.clone();
                tokio::spawn(async move {
                    match subscribe_commands(&client).await {
                        Ok(()) => info!("Subscribed to commands: {}", COMMAND_FILTER),
                        Err(e) => error!("Failed to subscribe to {}: {}", COMMAND_FILTER, e),
                    }
                });
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if let Err(e) = forward_command(publish, &commands) {
                    error!("Failed to hand over command: {}", e);
                }
            }
            Ok(_) => {}
            Err(e) => {
                error!("MQTT error: {}, retrying in {}s", e, RECONNECT_DELAY_SECS);
                tokio::time::sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
            }
        }
    }
}

async fn subscribe_commands(client: &AsyncClient) -> Result<()> {
    client
        .subscribe(COMMAND_FILTER, QoS::AtMostOnce)
        .await
        .map_err(Error::Mqtt)
}

/// Never blocks the event loop: a full queue drops the command.
fn forward_command(publish: Publish, commands: &mpsc::Sender<InboundCommand>) -> Result<()> {
    debug!(
        "Received message on topic {}, size: {} bytes",
        publish.topic,
        publish.payload.len()
    );

    let command = InboundCommand {
        topic: publish.topic,
        payload: publish.payload.to_vec(),
    };

    match commands.try_send(command) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(command)) => {
            COMMANDS_DROPPED_TOTAL.inc();
            warn!("Command queue full, dropping command on {}", command.topic);
            Ok(())
        }
        Err(TrySendError::Closed(_)) => Err(Error::ChannelSend),
    }
}
