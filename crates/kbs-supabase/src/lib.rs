//! Client for the hosted database backend.
//!
//! Two surfaces are covered:
//! - Realtime change feeds over the Phoenix websocket protocol
//!   ([`RealtimeClient`]), delivering row-level INSERT/UPDATE/DELETE events
//!   per subscribed table.
//! - The REST table API ([`RestClient`]) used for listing and editing rows.
//!
//! Neither surface retries. A closed socket ends every subscription and is
//! only reported through the logs.

pub mod change;
pub mod client;
pub mod protocol;
pub mod rest;

pub use change::{ChangeEvent, ChangeFilter, RowChange, RowSnapshot};
pub use client::{ChangeSubscription, RealtimeClient, RealtimeConfig, SubscriptionHandle};
pub use rest::RestClient;

/// Errors that can occur while talking to the hosted backend.
#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    /// The configured project URL cannot be parsed or converted.
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The project URL uses a scheme other than http(s).
    #[error("unsupported url scheme `{0}`")]
    UnsupportedScheme(String),
    /// Establishing or using the websocket failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// The socket handshake did not finish in time.
    #[error("timed out connecting after {0:?}")]
    ConnectTimeout(std::time::Duration),
    /// A REST request failed or returned an error status.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// A message could not be encoded or decoded.
    #[error("failed to (de)serialize message: {0}")]
    Json(#[from] serde_json::Error),
    /// The server sent a message that does not follow the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The socket task is gone; no further commands can be issued.
    #[error("realtime socket is closed")]
    SocketClosed,
}

/// A source of row change events, scoped to named channels.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Subscribes to the changes matching `filter` on a logical channel.
    async fn subscribe(
        &self,
        channel: &str,
        filter: ChangeFilter,
    ) -> Result<ChangeSubscription, SupabaseError>;
}
