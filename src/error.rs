//! Error types and result handling for user-event-relay.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! Most errors here are scoped to a single inbound message. The consume loop
//! turns them into a negative acknowledgement so the broker redelivers the
//! message. A broker error while rejecting a message ends the consume loop
//! instead.
//!
//! # Example
//!
//! ```rust
//! use user_event_relay::{Error, Result};
//!
//! fn decode_something() -> Result<()> {
//!     Err(Error::InvalidMessage {
//!         message: "missing payload".to_string(),
//!     })
//! }
//!
//! match decode_something() {
//!     Ok(()) => println!("Decoded"),
//!     Err(Error::InvalidMessage { message }) => eprintln!("Bad message: {}", message),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// The main error type for user-event-relay operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error, from an unreadable file or invalid values.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error, such as failing to install a signal handler.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Kafka client, consumer or producer error.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// JSON error while decoding an envelope or encoding an outbound event.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or malformed change envelope.
    #[error("Invalid message format: {message}")]
    InvalidMessage {
        /// Description of what was invalid
        message: String,
    },

    /// A wire timestamp outside the representable date range.
    #[error("Invalid timestamp: {micros} microseconds since epoch is out of range")]
    InvalidTimestamp {
        /// The offending wire value
        micros: i64,
    },

    /// A change with neither a before nor an after snapshot.
    #[error("Invalid change: both before and after snapshots are absent")]
    InvalidChange,

    /// The broker did not confirm an outbound event.
    #[error("Publish error: {message}")]
    Publish {
        /// Description of the delivery failure
        message: String,
    },
}

impl Error {
    pub(crate) fn invalid_message(message: impl Into<String>) -> Self {
        Error::InvalidMessage {
            message: message.into(),
        }
    }
}

/// A convenient Result type alias for user-event-relay operations.
///
/// This is equivalent to `std::result::Result<T, user_event_relay::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
