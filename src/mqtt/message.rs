use std::fmt;

use rumqttc::Publish;

/// A publish received from the broker, decoded to text.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MqttMessage {
    pub topic: String,
    pub content: String,
}

impl fmt::Display for MqttMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.topic, self.content)
    }
}

impl MqttMessage {
    pub fn from_topic(topic: impl Into<String>, content: impl Into<String>) -> Self {
        MqttMessage {
            topic: topic.into(),
            content: content.into(),
        }
    }

    /// Invalid UTF-8 is replaced rather than dropped so the counter still sees the message.
    pub fn from_publish(publish: &Publish) -> Self {
        Self::from_topic(
            publish.topic.clone(),
            String::from_utf8_lossy(&publish.payload),
        )
    }
}

/// Everything the bus driver reports back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// ConnAck received
    Connected,
    /// The attempt ended before a ConnAck arrived
    ConnectFailed(String),
    /// An established session dropped
    ConnectionLost(String),
    Message(MqttMessage),
}
