//! # Feed Errors
//!
//! One taxonomy for everything that can go wrong between an upstream API and a
//! subscriber socket. None of these are fatal: upstream variants are absorbed
//! by the fallback chain, `Delivery` by the dispatcher.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("[{source_name}] invalid URL '{url}': {message}")]
    InvalidUrl {
        source_name: String,
        url: String,
        message: String,
    },

    /// Network failure, TLS failure or timeout.
    #[error("[{source_name}] transport failure for {url}: {message}")]
    Transport {
        source_name: String,
        url: String,
        message: String,
    },

    #[error("[{source_name}] HTTP status {status} for {url}")]
    Status {
        source_name: String,
        url: String,
        status: u16,
    },

    /// The body was not JSON, or not the JSON shape the caller expected.
    #[error("[{source_name}] decode failure for {url}: {message}")]
    Decode {
        source_name: String,
        url: String,
        message: String,
    },

    /// The query succeeded but yielded nothing usable.
    #[error("[{source_name}] no session found: {message}")]
    NoSessionFound {
        source_name: String,
        message: String,
    },

    /// The payload could not be serialized for the wire.
    #[error("payload encoding failed: {message}")]
    Encode { message: String },

    #[error("delivery to client '{client_id}' failed")]
    Delivery { client_id: String },
}

impl FeedError {
    pub fn no_session(source_name: &str, message: impl Into<String>) -> Self {
        FeedError::NoSessionFound {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    /// True for the variants raised before any HTTP response was read.
    pub fn is_transport(&self) -> bool {
        matches!(self, FeedError::Transport { .. })
    }
}
