use serde::{Deserialize, Serialize};

/// The single configuration row written by initialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// Server endpoint identifier.
    pub endpoint: String,
    /// Owner tag of durable items created by this installation.
    pub user_tag: Option<String>,
    /// Auth token attached to every request.
    pub auth_token: Option<String>,
    /// Last push token the server acknowledged.
    pub last_token: Option<String>,
}

/// One field of [`ConfigRecord`], for partial updates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigField {
    UserTag(Option<String>),
    AuthToken(Option<String>),
    LastToken(Option<String>),
}

impl ConfigRecord {
    /// Applies a partial update in place.
    pub fn apply(&mut self, field: ConfigField) {
        match field {
            ConfigField::UserTag(v) => self.user_tag = v,
            ConfigField::AuthToken(v) => self.auth_token = v,
            ConfigField::LastToken(v) => self.last_token = v,
        }
    }
}
