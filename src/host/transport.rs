//! # Transport contract.
//!
//! The retry core only distinguishes three outcomes of a request:
//! delivered, worth retrying, and never going to succeed.

use async_trait::async_trait;
use serde_json::Value;

use crate::store::WorkId;

/// Kind of request sent to the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Device profile subscription.
    Subscribe,
    /// Push interaction event (delivered, clicked...).
    PushEvent,
    /// Application (mobile) event.
    MobileEvent,
    /// Push token update.
    TokenUpdate,
}

/// A request ready for the transport.
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundRequest {
    /// Request kind.
    pub kind: RequestKind,
    /// Endpoint taken from the configuration row.
    pub endpoint: String,
    /// Auth token taken from the configuration row.
    pub auth: String,
    /// Durable item being delivered, if any.
    pub item_id: Option<WorkId>,
    /// Opaque request body.
    pub payload: Value,
}

/// Outcome of [`TransportClient::send`].
#[derive(Clone, Debug, PartialEq)]
pub enum SendOutcome {
    /// Delivered; carries the server response.
    Success(Value),
    /// Transient failure (network, 5xx, throttling).
    Retryable(String),
    /// Failure that retrying cannot fix (malformed input, 4xx).
    Fatal(String),
}

/// Network client used to deliver requests.
#[async_trait]
pub trait TransportClient: Send + Sync + 'static {
    /// Sends one request. Implementations must not panic on network errors.
    async fn send(&self, request: OutboundRequest) -> SendOutcome;
}
