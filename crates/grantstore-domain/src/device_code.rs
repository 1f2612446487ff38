//! Device flow codes - pending device-authorization sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending device-authorization-grant poll record
///
/// The device code is the unique key. The user code is the short code the
/// user types on a second device; it is not unique, so lookups by user code
/// rank candidates by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFlowCode {
    /// Unique device code
    pub device_code: String,

    /// User-facing code (not unique)
    pub user_code: String,

    /// Subject, set once the user approves the request
    #[serde(default)]
    pub subject_id: Option<String>,

    /// Client that initiated the flow
    pub client_id: String,

    /// When the flow was initiated
    pub creation_time: DateTime<Utc>,

    /// When the code expires; `None` never expires
    pub expiration: Option<DateTime<Utc>>,

    /// Opaque serialized payload
    pub data: String,
}

impl DeviceFlowCode {
    /// Create a pending (unapproved) device flow code
    pub fn new(
        device_code: impl Into<String>,
        user_code: impl Into<String>,
        client_id: impl Into<String>,
        creation_time: DateTime<Utc>,
    ) -> Self {
        Self {
            device_code: device_code.into(),
            user_code: user_code.into(),
            subject_id: None,
            client_id: client_id.into(),
            creation_time,
            expiration: None,
            data: String::new(),
        }
    }

    /// Set the expiration time
    #[must_use]
    pub fn expires_at(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Whether the code is eligible for deletion at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= now)
    }

    /// Whether a user has approved this request
    pub fn is_authorized(&self) -> bool {
        self.subject_id.is_some()
    }
}
