use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Supported push platforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Firebase,
    Huawei,
    RuStore,
}

impl ProviderKind {
    /// Scan order used when no priority list is configured.
    pub const DEFAULT_ORDER: [ProviderKind; 3] =
        [ProviderKind::Firebase, ProviderKind::Huawei, ProviderKind::RuStore];

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Firebase => "firebase",
            ProviderKind::Huawei => "huawei",
            ProviderKind::RuStore => "rustore",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A push platform SDK, as seen by the token manager.
///
/// `Ok(None)` and `Ok(Some(""))` both mean "no token yet"; errors are
/// reported and treated the same way.
#[async_trait]
pub trait TokenProvider: Send + Sync + 'static {
    /// Platform this provider talks to.
    fn kind(&self) -> ProviderKind;

    /// Fetches the platform's current token.
    async fn fetch_token(&self) -> anyhow::Result<Option<String>>;
}

/// Where a resolved token came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenOrigin {
    /// Set out-of-band by the host.
    Manual,
    /// Fetched from a registered provider.
    Provider(ProviderKind),
}

impl TokenOrigin {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenOrigin::Manual => "manual",
            TokenOrigin::Provider(kind) => kind.as_str(),
        }
    }
}

/// A push token and its origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenCandidate {
    pub origin: TokenOrigin,
    pub token: String,
}

impl TokenCandidate {
    pub fn new(origin: TokenOrigin, token: impl Into<String>) -> Self {
        Self {
            origin,
            token: token.into(),
        }
    }
}
