//! Push token resolution.
//!
//! - [`TokenProvider`] one push platform able to hand out a token
//! - [`ProviderKind`] the fixed set of supported platforms
//! - [`TokenCandidate`] a resolved token and where it came from
//! - [`TokenManager`] manual override, priority scan, bounded polling and
//!   per-session "token acquired" deduplication
//!
//! ## Resolution
//! ```text
//! get_current_token()
//!   ├─ manual token set ─────────────────────────► Manual(token)
//!   └─ for p in priority (≤ 3, registered only):
//!         get_non_empty_token(p): attempts × { fetch; non-empty ─► return; sleep }
//!         first hit short-circuits ─────────────► Provider(p, token)
//! then: token not seen this session ─► TokenAcquired (once per value)
//! ```

mod manager;
mod provider;

pub use manager::TokenManager;
pub use provider::{ProviderKind, TokenCandidate, TokenOrigin, TokenProvider};
