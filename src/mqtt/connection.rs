use tracing::{debug, info};

use super::config::MqttConfig;
use super::error::BusError;
use super::message::BusEvent;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Non-blocking handle onto the bus client.
///
/// Every call only queues a request and returns; outcomes come back later as
/// [`BusEvent`]s on the driver's channel.
pub trait BusLink: Send {
    /// Ask the driver to begin a connection attempt.
    fn start(&mut self) -> Result<(), BusError>;

    fn subscribe(&mut self, topic: &str) -> Result<(), BusError>;

    /// Fire-and-forget publish at QoS 0, not retained.
    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), BusError>;
}

/// The single broker connection of the panel.
pub struct Connection {
    address: String,
    client_id: String,
    user: String,
    state: ConnectionState,
    link: Box<dyn BusLink>,
}

impl Connection {
    pub fn new(config: &MqttConfig, client_id: String, link: Box<dyn BusLink>) -> Self {
        Self {
            address: config.address(),
            client_id,
            user: config.user.clone(),
            state: ConnectionState::Disconnected,
            link,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Moves to `Connecting` and hands the attempt to the driver.
    pub fn connect(&mut self) -> Result<(), BusError> {
        info!(
            "Connecting to {} as {} (user {})",
            self.address(),
            self.client_id,
            self.user
        );
        self.state = ConnectionState::Connecting;
        self.link.start().inspect_err(|_| {
            self.state = ConnectionState::Disconnected;
        })
    }

    /// Applies the state change a driver event implies.
    pub fn observe(&mut self, event: &BusEvent) {
        let next = match event {
            BusEvent::Connected => ConnectionState::Connected,
            BusEvent::ConnectFailed(_) | BusEvent::ConnectionLost(_) => {
                ConnectionState::Disconnected
            }
            BusEvent::Message(_) => return,
        };
        debug!("Connection state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        self.link.subscribe(topic)
    }

    pub fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.link.publish(topic, payload)
    }
}
