/// Wildcard subscription covering the command topic of every device.
pub const COMMAND_FILTER: &str = "+/+/devices/+/command";

pub const HUMIDITY_SUFFIX: &str = "humidity";
pub const LOCATION_SUFFIX: &str = "location";
pub const STATE_SUFFIX: &str = "state";
pub const ACK_SUFFIX: &str = "ack";

pub fn sensor_topic(env: &str, tenant: &str, device: &str, suffix: &str) -> String {
    format!("{}/{}/sensors/{}/{}", env, tenant, device, suffix)
}

pub fn device_topic(env: &str, tenant: &str, device: &str, suffix: &str) -> String {
    format!("{}/{}/devices/{}/{}", env, tenant, device, suffix)
}

/// `{env}/{tenant}/{kind}/{device}/{suffix}` split into its segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTopic<'a> {
    pub environment: &'a str,
    pub tenant: &'a str,
    pub kind: &'a str,
    pub device: &'a str,
    pub suffix: &'a str,
}

impl<'a> CommandTopic<'a> {
    /// `None` when the topic has fewer than five segments. Extra trailing
    /// segments are ignored.
    pub fn parse(topic: &'a str) -> Option<Self> {
        let mut parts = topic.split('/');

        Some(Self {
            environment: parts.next()?,
            tenant: parts.next()?,
            kind: parts.next()?,
            device: parts.next()?,
            suffix: parts.next()?,
        })
    }

    pub fn ack_topic(&self) -> String {
        device_topic(self.environment, self.tenant, self.device, ACK_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_builders() {
        assert_eq!(
            sensor_topic("dev", "tenant-a", "device-001", HUMIDITY_SUFFIX),
            "dev/tenant-a/sensors/device-001/humidity"
        );
        assert_eq!(
            device_topic("prod", "t2", "device-009", ACK_SUFFIX),
            "prod/t2/devices/device-009/ack"
        );
    }

    #[test]
    fn test_parse_command_topic() {
        let topic = CommandTopic::parse("dev/t1/devices/device-001/command").unwrap();
        assert_eq!(topic.environment, "dev");
        assert_eq!(topic.tenant, "t1");
        assert_eq!(topic.kind, "devices");
        assert_eq!(topic.device, "device-001");
        assert_eq!(topic.suffix, "command");
        assert_eq!(topic.ack_topic(), "dev/t1/devices/device-001/ack");
    }

    #[test]
    fn test_parse_rejects_short_topics() {
        assert!(CommandTopic::parse("dev/t1/devices").is_none());
        assert!(CommandTopic::parse("dev/t1/devices/device-001").is_none());
        assert!(CommandTopic::parse("").is_none());
    }

    #[test]
    fn test_parse_ignores_extra_segments() {
        let topic = CommandTopic::parse("dev/t1/devices/d1/command/extra").unwrap();
        assert_eq!(topic.suffix, "command");
        assert_eq!(topic.ack_topic(), "dev/t1/devices/d1/ack");
    }
}
