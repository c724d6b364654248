use crate::errors::Result;
use async_trait::async_trait;
use rumqttc::{AsyncClient, QoS};
use std::sync::Arc;

/// Outbound half of the transport.
///
/// Shared by the scheduler and the command responder, which publish
/// concurrently without any ordering between them.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        (**self).publish(topic, payload).await
    }
}

/// Fire-and-forget MQTT publishing (QoS 0, not retained).
///
/// `AsyncClient` is a handle onto the event loop's request channel, so
/// clones are cheap and `publish` only waits while that channel is full.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use rumqttc::MqttOptions;

    #[test]
    fn test_mqtt_publisher_enqueues_while_event_loop_alive() {
        tokio_test::block_on(async {
            let options = MqttOptions::new("publisher-test", "localhost", 1883);
            // Never polled: requests stay queued in the event loop.
            let (client, _eventloop) = AsyncClient::new(options, 10);
            let publisher = Arc::new(MqttPublisher::new(client));

            assert!(publisher
                .publish("dev/t1/sensors/d1/state", b"{}".to_vec())
                .await
                .is_ok());
        });
    }

    #[test]
    fn test_wildcard_topic_is_rejected() {
        tokio_test::block_on(async {
            let options = MqttOptions::new("publisher-test", "localhost", 1883);
            let (client, _eventloop) = AsyncClient::new(options, 10);
            let publisher = MqttPublisher::new(client);

            let result = publisher.publish("dev/+/sensors/d1/state", b"{}".to_vec()).await;
            assert!(matches!(result, Err(Error::Mqtt(_))));
        });
    }
}
