//! Builds and publishes the device configuration message.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::mqtt::connection::Connection;
use crate::mqtt::error::BusError;

/// Payload of the config topic: `{"interval_sec": <int>, "colors": "<str>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub interval_sec: u32,
    pub colors: String,
}

impl DeviceConfig {
    pub fn to_payload(&self) -> Result<Vec<u8>, BusError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn summary(&self) -> String {
        format!(
            "Config sent. Interval: {}s. Colors: {}",
            self.interval_sec, self.colors
        )
    }
}

/// Raw contents of the two form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigForm {
    pub interval: String,
    pub colors: String,
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Error: not connected to the broker.")]
    NotConnected,

    #[error("Error: interval must be a positive number.")]
    InvalidInterval,

    #[error("Error sending configuration.")]
    Publish(#[source] BusError),
}

impl ConfigForm {
    pub fn new(interval: impl Into<String>, colors: impl Into<String>) -> Self {
        Self {
            interval: interval.into(),
            colors: colors.into(),
        }
    }

    /// The interval is read from its leading digits (`"12abc"` is 12, `"2.5"` is 2)
    /// and must be at least 1. Colors lose their outer whitespace; the device
    /// parses the list itself.
    pub fn validate(&self) -> Result<DeviceConfig, ComposeError> {
        let interval_sec = leading_integer(&self.interval)
            .filter(|secs| *secs >= 1)
            .and_then(|secs| u32::try_from(secs).ok())
            .ok_or(ComposeError::InvalidInterval)?;

        Ok(DeviceConfig {
            interval_sec,
            colors: self.colors.trim().to_string(),
        })
    }
}

/// Optional sign plus the run of digits at the start of `text`, after leading
/// whitespace. Anything after the digits is ignored.
fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .map_or(rest, |end| &rest[..end]);
    if digits.is_empty() {
        return None;
    }
    // Too many digits to fit is out of range either way
    let value = digits.parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

/// Checks the preconditions and publishes on `topic`. Nothing is sent on error.
pub fn send_config(
    connection: &mut Connection,
    topic: &str,
    form: &ConfigForm,
) -> Result<DeviceConfig, ComposeError> {
    if !connection.is_connected() {
        return Err(ComposeError::NotConnected);
    }
    let config = form.validate()?;

    let payload = config.to_payload().map_err(ComposeError::Publish)?;
    connection.publish(topic, payload).map_err(|e| {
        error!("Failed to publish config: {}", e);
        ComposeError::Publish(e)
    })?;

    info!("Config published on {}: {:?}", topic, config);
    Ok(config)
}
