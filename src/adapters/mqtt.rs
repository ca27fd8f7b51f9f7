//! MQTT broker session adapter.
//!
//! Implements [`PublishPort`] and feeds inbound traffic into the event
//! queue ([`crate::events`]).
//!
//! - **`target_os = "espidf"`**: `EspMqttClient` with the last will set to
//!   `<commandTopic>/status` (retained). The client reconnects on its own
//!   every [`RECONNECT_DELAY`]; a receiver thread re-subscribes on every
//!   (re)connect and forwards messages to the main loop.
//! - **all other targets**: records publishes and lets tests inject
//!   messages.

use log::{info, warn};

use crate::app::ports::PublishPort;
use crate::config::DeviceConfig;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use std::sync::{Arc, Mutex};
#[cfg(target_os = "espidf")]
use std::time::Duration;

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttConnection, EventPayload, LwtConfiguration,
    MqttClientConfiguration, QoS,
};

#[cfg(target_os = "espidf")]
use crate::events::{Event, push_event};

#[cfg(target_os = "espidf")]
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Broker URL for the configured address and port.
pub fn broker_url(cfg: &DeviceConfig) -> String {
    format!("mqtt://{}:{}", cfg.broker_address, cfg.broker_port)
}

/// Topics to (re)subscribe on every connect.
fn owned_subscriptions(cfg: &DeviceConfig) -> Vec<String> {
    cfg.subscription_topics()
        .iter()
        .map(|t| (*t).to_string())
        .collect()
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF session
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct MqttSession {
    client: Arc<Mutex<EspMqttClient<'static>>>,
}

#[cfg(target_os = "espidf")]
impl MqttSession {
    /// Create the client and start the receiver thread. The connection
    /// itself comes up asynchronously; [`Event::BrokerConnected`] marks it.
    pub fn start(cfg: &DeviceConfig) -> Result<Self, CommsError> {
        let url = broker_url(cfg);
        let will_topic = cfg.will_topic();
        let conf = MqttClientConfiguration {
            client_id: Some(cfg.client_id.as_str()),
            username: (!cfg.mqtt_username.is_empty()).then_some(cfg.mqtt_username.as_str()),
            password: (!cfg.mqtt_password.is_empty()).then_some(cfg.mqtt_password.as_str()),
            lwt: Some(LwtConfiguration {
                topic: &will_topic,
                payload: cfg.lwt_message.as_bytes(),
                qos: QoS::AtMostOnce,
                retain: true,
            }),
            reconnect_timeout: Some(RECONNECT_DELAY),
            buffer_size: 1024,
            ..Default::default()
        };

        info!("MQTT: connecting to {} as {}", url, cfg.client_id);
        let (client, conn) = EspMqttClient::new(&url, &conf).map_err(|e| {
            warn!("MQTT: client creation failed: {}", e);
            CommsError::BrokerConnectFailed
        })?;
        let client = Arc::new(Mutex::new(client));

        spawn_receiver(conn, client.clone(), owned_subscriptions(cfg))?;
        Ok(Self { client })
    }
}

#[cfg(target_os = "espidf")]
fn spawn_receiver(
    mut conn: EspMqttConnection,
    client: Arc<Mutex<EspMqttClient<'static>>>,
    topics: Vec<String>,
) -> Result<(), CommsError> {
    std::thread::Builder::new()
        .name("mqtt-rx".into())
        .stack_size(8 * 1024)
        .spawn(move || {
            while let Ok(event) = conn.next() {
                match event.payload() {
                    EventPayload::Connected(_) => {
                        info!("MQTT: connected to broker");
                        if let Err(e) = subscribe_all(&client, &topics) {
                            warn!("MQTT: {}", e);
                        }
                        push_event(Event::BrokerConnected);
                    }
                    EventPayload::Disconnected => {
                        warn!("MQTT: disconnected, retrying");
                        push_event(Event::BrokerDisconnected);
                    }
                    EventPayload::Received {
                        topic: Some(topic),
                        data,
                        details: Details::Complete,
                        ..
                    } => match Event::message(topic, data) {
                        Some(ev) => {
                            push_event(ev);
                        }
                        None => warn!("MQTT: topic too long, dropped: {}", topic),
                    },
                    _ => {}
                }
            }
            warn!("MQTT: connection closed, receiver exiting");
        })
        .map(|_| ())
        .map_err(|_| CommsError::BrokerConnectFailed)
}

#[cfg(target_os = "espidf")]
fn subscribe_all(
    client: &Arc<Mutex<EspMqttClient<'static>>>,
    topics: &[String],
) -> Result<(), CommsError> {
    let mut client = client
        .lock()
        .map_err(|_| CommsError::MqttSubscribeFailed)?;
    let mut result = Ok(());
    for topic in topics {
        let ok = client.subscribe(topic, QoS::AtMostOnce).is_ok();
        info!("MQTT: subscribing to {}: {}", topic, if ok { "ok" } else { "failed" });
        if !ok {
            result = Err(CommsError::MqttSubscribeFailed);
        }
    }
    result
}

#[cfg(target_os = "espidf")]
impl PublishPort for MqttSession {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError> {
        let mut client = self
            .client
            .lock()
            .map_err(|_| CommsError::MqttPublishFailed)?;
        client
            .enqueue(topic, QoS::AtMostOnce, retain, payload.as_bytes())
            .map(|_| ())
            .map_err(|_| CommsError::MqttPublishFailed)
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

/// One recorded publish.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct MqttSession {
    pub url: String,
    pub subscriptions: Vec<String>,
    pub published: Vec<Published>,
    /// Make every publish fail.
    pub offline: bool,
}

#[cfg(not(target_os = "espidf"))]
impl MqttSession {
    pub fn start(cfg: &DeviceConfig) -> Result<Self, CommsError> {
        let session = Self {
            url: broker_url(cfg),
            subscriptions: owned_subscriptions(cfg),
            ..Default::default()
        };
        info!(
            "MQTT(sim): {} with {} subscriptions",
            session.url,
            session.subscriptions.len()
        );
        Ok(session)
    }

    /// Queue an inbound message as if the broker had delivered it. Waits
    /// while the queue is full. `false` if the topic is too long.
    pub fn inject(&self, topic: &str, payload: &[u8]) -> bool {
        match crate::events::Event::message(topic, payload) {
            Some(ev) => {
                crate::events::push_event(ev);
                true
            }
            None => false,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl PublishPort for MqttSession {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError> {
        if self.offline {
            warn!("MQTT(sim): offline, dropping publish to {}", topic);
            return Err(CommsError::MqttPublishFailed);
        }
        self.published.push(Published {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        });
        Ok(())
    }
}
