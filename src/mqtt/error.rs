//! Error types for the bus link

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    /// The driver task has stopped and no longer accepts connect requests
    #[error("Bus driver is not running")]
    LinkDown,

    /// rumqttc refused to queue the request
    #[error("Request rejected by client: {0}")]
    Request(#[from] rumqttc::ClientError),

    #[error("Payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
