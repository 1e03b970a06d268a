pub mod http;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

pub use http::HttpChannel;

/// Connectivity of the chat channel as shown to the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChannelStatus {
    #[default]
    Ready,
    Connected,
    Error(String),
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelStatus::Ready => f.write_str("Chat is ready"),
            ChannelStatus::Connected => f.write_str("Connected to the listing assistant"),
            ChannelStatus::Error(reason) => write!(f, "Chat unavailable: {}", reason),
        }
    }
}

/// Error types for chat channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Chat channel is not configured: {0}")]
    NotConfigured(String),
    #[error("Chat platform request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Chat platform answered {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl ChannelError {
    /// Whether trying the same request again may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ChannelError::Transport(_) => true,
            ChannelError::Rejected { status, .. } => *status == 429 || *status >= 500,
            ChannelError::NotConfigured(_) | ChannelError::Exhausted { .. } => false,
        }
    }
}

/// A user message plus the metadata the agent reads alongside it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundMessage {
    pub text: String,
    pub metadata: Map<String, Value>,
}

/// Transport to the hosted chat platform
///
/// Implementations own their retry policy; callers only see the final outcome.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Verify credentials and reachability
    async fn connect(&self) -> Result<(), ChannelError>;

    /// Deliver one message to the agent
    async fn send(&self, message: &OutboundMessage) -> Result<(), ChannelError>;

    /// Get the name of the chat platform
    fn name(&self) -> &'static str;
}
