//! Grant module - issued authorization artifacts kept by the operational store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known grant type tags
///
/// The store does not interpret these; the sweeper deletes expired grants
/// regardless of their type.
pub mod grant_types {
    /// Authorization code issued by the authorize endpoint
    pub const AUTHORIZATION_CODE: &str = "authorization_code";
    /// Reference (opaque) access token
    pub const REFERENCE_TOKEN: &str = "reference_token";
    /// Refresh token
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Remembered user consent
    pub const USER_CONSENT: &str = "user_consent";
    /// Device code, once redeemed into a grant
    pub const DEVICE_CODE: &str = "device_code";
}

/// A persisted grant
///
/// Grants are written by the issuing component and only ever deleted by the
/// sweeper, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedGrant {
    /// Globally unique key
    pub key: String,

    /// Grant type tag (see [`grant_types`])
    #[serde(rename = "type")]
    pub grant_type: String,

    /// Subject the grant was issued to
    pub subject_id: String,

    /// Client the grant was issued for
    pub client_id: String,

    /// When the grant was created
    pub creation_time: DateTime<Utc>,

    /// When the grant expires; `None` never expires
    pub expiration: Option<DateTime<Utc>>,

    /// When the grant was consumed (one-time use artifacts)
    #[serde(default)]
    pub consumed_time: Option<DateTime<Utc>>,

    /// Opaque serialized payload
    pub data: String,
}

impl PersistedGrant {
    /// Create a new grant with a freshly generated key
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use grantstore_domain::{grant_types, PersistedGrant};
    ///
    /// let now = Utc::now();
    /// let grant = PersistedGrant::new(grant_types::REFRESH_TOKEN, "alice", "web", now)
    ///     .expires_at(now + Duration::hours(1));
    ///
    /// assert!(!grant.is_expired(now));
    /// assert!(grant.is_expired(now + Duration::hours(2)));
    /// ```
    pub fn new(
        grant_type: impl Into<String>,
        subject_id: impl Into<String>,
        client_id: impl Into<String>,
        creation_time: DateTime<Utc>,
    ) -> Self {
        Self {
            key: uuid::Uuid::now_v7().simple().to_string(),
            grant_type: grant_type.into(),
            subject_id: subject_id.into(),
            client_id: client_id.into(),
            creation_time,
            expiration: None,
            consumed_time: None,
            data: String::new(),
        }
    }

    /// Set the expiration time
    #[must_use]
    pub fn expires_at(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Set the opaque payload
    #[must_use]
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    /// Whether the grant is eligible for deletion at `now`
    ///
    /// A grant without an expiration never expires. A grant expiring exactly
    /// at `now` is expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= now)
    }
}
