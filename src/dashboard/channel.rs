use std::time::Duration;

use rand::Rng;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use serde_json::json;

use crate::config::MqttConfig;

/// Topic layout for one door controller. The device listens on `cmd`
/// and publishes everything else.
#[derive(Debug, Clone)]
pub struct Topics {
    pub log: String,
    pub ack: String,
    pub status: String,
    pub cmd: String,
}

impl Topics {
    pub fn for_device(device_id: &str) -> Self {
        Self {
            log: format!("iot/rfid/{device_id}/log"),
            ack: format!("iot/rfid/{device_id}/ack"),
            status: format!("iot/rfid/{device_id}/status"),
            cmd: format!("iot/rfid/{device_id}/cmd"),
        }
    }

    /// Last path segment, the part the classifier keys on.
    pub fn leaf(topic: &str) -> &str {
        topic.rsplit('/').next().unwrap_or(topic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Unlock { duration_ms: u64 },
    Lock,
    Ping,
    Buzz { duration_ms: u64 },
}

impl Command {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unlock { .. } => "UNLOCK",
            Self::Lock => "LOCK",
            Self::Ping => "PING",
            Self::Buzz { .. } => "BUZZ",
        }
    }

    /// Wire form. Each command carries a fresh client-generated id;
    /// the device echoes it in acks but nothing correlates on it here.
    pub fn to_payload(self) -> (String, String) {
        let id = request_id();
        let mut payload = json!({ "id": id, "cmd": self.name() });
        match self {
            Self::Unlock { duration_ms } | Self::Buzz { duration_ms } => {
                payload["durationMs"] = json!(duration_ms);
            }
            Self::Lock | Self::Ping => {}
        }
        (id, payload.to_string())
    }
}

fn request_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let salt = rand::rng().random_range(0..1000);
    format!("req_{millis}_{salt}")
}

/// MQTT link to the door controller. Holds the publish half; the
/// caller drives the `EventLoop` and feeds incoming frames to the
/// classifier.
pub struct DeviceChannel {
    client: AsyncClient,
    topics: Topics,
}

impl DeviceChannel {
    pub fn connect(config: &MqttConfig) -> (Self, EventLoop) {
        let client_id = format!("doorman-dash-{}", rand::rng().random_range(0..10_000));
        let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
        options
            .set_credentials(config.username.clone(), config.password.clone())
            .set_keep_alive(Duration::from_secs(config.keep_alive_seconds));

        let (client, event_loop) = AsyncClient::new(options, 64);
        let channel = Self {
            client,
            topics: Topics::for_device(&config.device_id),
        };
        (channel, event_loop)
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Subscribes to the device's three outbound topics at QoS 1.
    pub async fn subscribe_all(&self) -> Result<(), rumqttc::ClientError> {
        for topic in [&self.topics.log, &self.topics.ack, &self.topics.status] {
            self.client.subscribe(topic, QoS::AtLeastOnce).await?;
        }
        Ok(())
    }

    /// Publishes a command at QoS 1 and returns its request id.
    pub async fn send(&self, command: Command) -> Result<String, rumqttc::ClientError> {
        let (id, payload) = command.to_payload();
        self.client
            .publish(&self.topics.cmd, QoS::AtLeastOnce, false, payload)
            .await?;
        tracing::info!(cmd = command.name(), request_id = %id, "Command published");
        Ok(id)
    }

    pub async fn disconnect(&self) -> Result<(), rumqttc::ClientError> {
        self.client.disconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_follow_device_scope() {
        let topics = Topics::for_device("esp32_01");
        assert_eq!(topics.log, "iot/rfid/esp32_01/log");
        assert_eq!(topics.cmd, "iot/rfid/esp32_01/cmd");
        assert_eq!(Topics::leaf(&topics.status), "status");
    }

    #[test]
    fn unlock_payload_carries_duration_and_id() {
        let (id, payload) = Command::Unlock { duration_ms: 2000 }.to_payload();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["cmd"], "UNLOCK");
        assert_eq!(value["durationMs"], 2000);
        assert_eq!(value["id"], id);
        assert!(id.starts_with("req_"));
        assert_eq!(id.split('_').count(), 3);
    }

    #[test]
    fn bare_commands_omit_duration() {
        let (_, payload) = Command::Lock.to_payload();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["cmd"], "LOCK");
        assert!(value.get("durationMs").is_none());
    }

    #[test]
    fn request_ids_are_unique_enough() {
        let (a, _) = Command::Ping.to_payload();
        let (b, _) = Command::Ping.to_payload();
        // Same millisecond is possible; the random salt still has to
        // collide for the ids to match.
        if a == b {
            let (c, _) = Command::Ping.to_payload();
            assert_ne!(a, c);
        }
    }
}
