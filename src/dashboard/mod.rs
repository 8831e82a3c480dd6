//! Headless dashboard client: authenticates against the REST API,
//! keeps the session fresh, and bridges the device's MQTT telemetry
//! into the live feed and the activity history.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{Event, EventLoop, Incoming};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub mod api_client;
pub mod channel;
pub mod classify;
pub mod feed;
pub mod session;

use api_client::{ApiClient, NewHistoryEntry};
use channel::{Command, DeviceChannel, Topics};
use classify::{DeviceEvent, Topic};
use feed::{Direction, LiveFeed};
use session::{Session, SessionState};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorStatus {
    Locked,
    Unlocked,
}

pub struct Dashboard {
    config: Config,
    session: Arc<Mutex<Session>>,
    feed: Arc<Mutex<LiveFeed>>,
    door: Arc<Mutex<DoorStatus>>,
    channel: DeviceChannel,
    revalidator: Option<JoinHandle<()>>,
}

impl Dashboard {
    /// Builds the client stack. The returned event loop must be fed to
    /// [`Dashboard::run`].
    pub fn new(config: Config) -> (Self, EventLoop) {
        let client = ApiClient::new(config.dashboard.api_base_url.clone());
        let (channel, event_loop) = DeviceChannel::connect(&config.mqtt);

        let dashboard = Self {
            session: Arc::new(Mutex::new(Session::new(client))),
            feed: Arc::new(Mutex::new(LiveFeed::default())),
            door: Arc::new(Mutex::new(DoorStatus::Locked)),
            channel,
            revalidator: None,
            config,
        };
        (dashboard, event_loop)
    }

    pub fn feed(&self) -> Arc<Mutex<LiveFeed>> {
        self.feed.clone()
    }

    pub async fn door_status(&self) -> DoorStatus {
        *self.door.lock().await
    }

    /// Logs in with the configured credentials and starts the
    /// background token revalidation.
    pub async fn login(&mut self) -> anyhow::Result<()> {
        let creds = self.config.dashboard.clone();
        self.session
            .lock()
            .await
            .login(&creds.username, &creds.password)
            .await?;

        let every = Duration::from_secs(creds.session_revalidate_minutes * 60);
        self.revalidator = Some(session::spawn_revalidator(self.session.clone(), every));

        // Warm start: show what the door has been up to lately.
        let client = self.session.lock().await.client().clone();
        match client.list_history(feed::FEED_CAPACITY as u64).await {
            Ok(entries) => {
                let counts = history_type_counts(&entries);
                tracing::info!(total = entries.len(), ?counts, "Loaded activity history");
            }
            Err(e) => tracing::warn!("Failed to load activity history: {e}"),
        }
        Ok(())
    }

    pub async fn logout(&mut self) {
        if let Some(handle) = self.revalidator.take() {
            handle.abort();
        }
        self.session.lock().await.logout().await;
        if let Err(e) = self.channel.disconnect().await {
            tracing::debug!("MQTT disconnect failed: {e}");
        }
    }

    pub async fn unlock(&self, duration_ms: Option<u64>) -> anyhow::Result<String> {
        let duration_ms = duration_ms.unwrap_or(self.config.dashboard.unlock_duration_ms);
        let id = self.channel.send(Command::Unlock { duration_ms }).await?;
        self.record_sent(Command::Unlock { duration_ms }, &id).await;
        self.mirror_history(
            "unlock",
            "Door unlocked",
            &format!("Duration: {duration_ms}ms"),
            "lock-open",
        )
        .await;
        Ok(id)
    }

    pub async fn lock(&self) -> anyhow::Result<String> {
        let id = self.channel.send(Command::Lock).await?;
        self.record_sent(Command::Lock, &id).await;
        self.mirror_history("lock", "Door locked", "Lock command sent", "lock")
            .await;
        Ok(id)
    }

    pub async fn ping(&self) -> anyhow::Result<String> {
        let id = self.channel.send(Command::Ping).await?;
        self.record_sent(Command::Ping, &id).await;
        Ok(id)
    }

    pub async fn buzz(&self, duration_ms: Option<u64>) -> anyhow::Result<String> {
        let duration_ms = duration_ms.unwrap_or(self.config.dashboard.buzz_duration_ms);
        let id = self.channel.send(Command::Buzz { duration_ms }).await?;
        self.record_sent(Command::Buzz { duration_ms }, &id).await;
        Ok(id)
    }

    /// Drives the MQTT event loop until shutdown or session expiry.
    /// Connection errors are logged and retried after the configured
    /// fixed delay; the broker client handles the actual reconnect.
    pub async fn run(&mut self, mut event_loop: EventLoop) -> anyhow::Result<()> {
        let reconnect = Duration::from_secs(self.config.mqtt.reconnect_seconds);

        loop {
            if self.session.lock().await.state() == SessionState::SessionExpired {
                tracing::warn!("Session expired, shutting down dashboard");
                break;
            }

            tokio::select! {
                event = event_loop.poll() => match event {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        self.on_connected().await?;
                    }
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        let payload = String::from_utf8_lossy(&publish.payload).to_string();
                        self.handle_frame(&publish.topic, &payload).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("MQTT connection error: {e}");
                        self.feed.lock().await.push(
                            Direction::Error,
                            DeviceEvent::Error {
                                text: e.to_string(),
                            }
                            .render(),
                        );
                        tokio::time::sleep(reconnect).await;
                    }
                },
                () = shutdown_signal() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.logout().await;
        Ok(())
    }

    async fn on_connected(&self) -> anyhow::Result<()> {
        tracing::info!(device = %self.config.mqtt.device_id, "Connected to MQTT broker");
        self.channel.subscribe_all().await?;

        self.feed.lock().await.push(
            Direction::System,
            DeviceEvent::System {
                text: "Connected to MQTT broker".to_string(),
            }
            .render(),
        );
        self.mirror_history(
            "system",
            "MQTT connected",
            "Connected to the broker",
            "satellite-dish",
        )
        .await;

        // Probe the device so its ack shows up in the feed early.
        self.ping().await?;
        Ok(())
    }

    async fn handle_frame(&self, topic: &str, payload: &str) {
        // Any frame may piggyback the current door state.
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) {
            if let Some(status) = value.get("doorStatus").and_then(|v| v.as_str()) {
                let mut door = self.door.lock().await;
                *door = if status == "UNLOCKED" {
                    DoorStatus::Unlocked
                } else {
                    DoorStatus::Locked
                };
            }
        }

        let event = classify::classify(&Topic::from_leaf(Topics::leaf(topic)), payload);
        let line = event.render();

        match &event {
            DeviceEvent::RfidResult { .. } | DeviceEvent::RfidScan { .. } => {
                self.mirror_history("rfid", &line.title, &line.desc, line.icon)
                    .await;
            }
            _ => {}
        }

        self.feed.lock().await.push(Direction::Receive, line);
    }

    async fn record_sent(&self, command: Command, id: &str) {
        let event = DeviceEvent::CommandEcho {
            cmd: command.name().to_string(),
            id: Some(id.to_string()),
            duration_ms: match command {
                Command::Unlock { duration_ms } | Command::Buzz { duration_ms } => {
                    Some(duration_ms)
                }
                Command::Lock | Command::Ping => None,
            },
        };
        self.feed.lock().await.push(Direction::Send, event.render());
    }

    /// Persists a dashboard-side event to the activity history. Losing
    /// an entry is not worth failing the action for.
    async fn mirror_history(&self, kind: &str, title: &str, desc: &str, icon: &str) {
        let entry = NewHistoryEntry {
            kind: kind.to_string(),
            title: title.to_string(),
            desc: desc.to_string(),
            icon: icon.to_string(),
        };
        let client = self.session.lock().await.client().clone();
        if let Err(e) = client.add_history(&entry).await {
            tracing::warn!("Failed to record history entry: {e}");
        }
    }
}

/// Counts history entries per type, the working set behind the
/// activity summary.
#[must_use]
pub fn history_type_counts(
    entries: &[crate::api::HistoryEntryDto],
) -> std::collections::BTreeMap<String, usize> {
    let mut counts = std::collections::BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.kind.clone()).or_insert(0) += 1;
    }
    counts
}

/// Connects, authenticates, and runs the dashboard until shutdown.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let (mut dashboard, event_loop) = Dashboard::new(config);
    dashboard.login().await?;
    dashboard.run(event_loop).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HistoryEntryDto;

    fn entry(kind: &str) -> HistoryEntryDto {
        HistoryEntryDto {
            id: 0,
            kind: kind.to_string(),
            title: String::new(),
            desc: String::new(),
            icon: String::new(),
            timestamp: 0,
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn type_counts_group_entries() {
        let entries = vec![entry("rfid"), entry("unlock"), entry("rfid")];
        let counts = history_type_counts(&entries);
        assert_eq!(counts.get("rfid"), Some(&2));
        assert_eq!(counts.get("unlock"), Some(&1));
        assert_eq!(counts.get("lock"), None);
    }

    // Commands queue into the client channel without a broker
    // connection, so the send path is testable offline. The history
    // mirror call fails against the unreachable API and only warns.
    #[tokio::test]
    async fn commands_reach_the_feed() {
        let (dashboard, _event_loop) = Dashboard::new(Config::default());

        let id = dashboard.unlock(None).await.unwrap();
        assert!(id.starts_with("req_"));

        let feed = dashboard.feed();
        let feed = feed.lock().await;
        let last = feed.latest().unwrap();
        assert_eq!(last.direction, Direction::Send);
        assert_eq!(last.line.title, "Unlock command sent");
        assert!(last.line.desc.contains("2000ms"));
    }

    #[tokio::test]
    async fn lock_uses_no_duration() {
        let (dashboard, _event_loop) = Dashboard::new(Config::default());

        dashboard.lock().await.unwrap();

        let feed = dashboard.feed();
        let feed = feed.lock().await;
        let last = feed.latest().unwrap();
        assert_eq!(last.line.title, "Lock command sent");
        assert!(!last.line.desc.contains("ms"));
    }
}
