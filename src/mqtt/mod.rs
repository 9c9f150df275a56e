//! # MQTT Integration Module
//!
//! Connects the panel to the device's broker. The wire protocol is handled by
//! `rumqttc`; this module only decides when to connect and translates broker
//! traffic into events for the session.
//!
//! ```text
//! mqtt/
//! ├── config.rs      - Broker endpoint, credentials, topics
//! ├── connection.rs  - Connection state and the BusLink seam
//! ├── driver.rs      - rumqttc event loop task (Idle/Polling typestate)
//! ├── error.rs       - BusError
//! └── message.rs     - Decoded publishes and driver events
//! ```
//!
//! The driver never reconnects on its own. After any failure it reports a
//! [`message::BusEvent`] and waits for the next [`connection::BusLink::start`].

pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod message;
