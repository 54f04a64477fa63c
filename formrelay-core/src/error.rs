use std::time::Duration;

use thiserror::Error;

/// A submission that cannot be turned into a record.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Malformed field {token:?} in payload {decoded:?}")]
    MalformedField { token: String, decoded: String },
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Relay IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payload of {size} bytes exceeds the {limit} byte datagram limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Relay channel is full, message dropped")]
    ChannelFull,

    #[error("Relay channel closed")]
    Closed,

    #[error("Relay address {0} did not resolve")]
    Unresolved(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Store write timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid table name: {0:?}")]
    InvalidTable(String),
}

/// Failure of a single relayed message. Never outlives that message.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Parse error: {0}")]
    Parse(#[from] RecordError),

    #[error("Saving error: {0}")]
    Store(#[from] StoreError),
}
