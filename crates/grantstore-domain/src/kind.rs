//! Record kinds drained by the expiration sweeper

use crate::{DeviceFlowCode, PersistedGrant};
use serde::{Deserialize, Serialize};

/// Logical record kind held by the operational store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Persisted grants (codes, tokens, consents)
    Grants,

    /// Device flow codes
    DeviceCodes,
}

impl RecordKind {
    /// All kinds, in the order a sweep visits them
    pub const ALL: [RecordKind; 2] = [RecordKind::Grants, RecordKind::DeviceCodes];

    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Grants => "grants",
            RecordKind::DeviceCodes => "device_codes",
        }
    }

    /// Parse a kind from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "grants" | "grant" => Some(RecordKind::Grants),
            "device_codes" | "device_code" => Some(RecordKind::DeviceCodes),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid record kind: {}", s))
    }
}

/// A record returned by an expiry query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiredRecord {
    /// An expired grant
    Grant(PersistedGrant),

    /// An expired device flow code
    DeviceCode(DeviceFlowCode),
}

impl ExpiredRecord {
    /// The record's unique key (grant key or device code)
    pub fn key(&self) -> &str {
        match self {
            ExpiredRecord::Grant(grant) => &grant.key,
            ExpiredRecord::DeviceCode(code) => &code.device_code,
        }
    }

    /// The kind this record belongs to
    pub fn kind(&self) -> RecordKind {
        match self {
            ExpiredRecord::Grant(_) => RecordKind::Grants,
            ExpiredRecord::DeviceCode(_) => RecordKind::DeviceCodes,
        }
    }

    /// Take the grant out of the record, if it is one
    pub fn into_grant(self) -> Option<PersistedGrant> {
        match self {
            ExpiredRecord::Grant(grant) => Some(grant),
            ExpiredRecord::DeviceCode(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_kind_round_trip() {
        for kind in RecordKind::ALL {
            assert_eq!(RecordKind::parse(kind.as_str()), Some(kind));
            assert_eq!(kind.to_string().parse::<RecordKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_parse_aliases() {
        assert_eq!(RecordKind::parse("GRANT"), Some(RecordKind::Grants));
        assert_eq!(RecordKind::parse("device_code"), Some(RecordKind::DeviceCodes));
        assert_eq!(RecordKind::parse("tokens"), None);
        assert!("tokens".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_expired_record_accessors() {
        let grant = PersistedGrant::new("refresh_token", "1", "client", Utc::now());
        let key = grant.key.clone();
        let record = ExpiredRecord::Grant(grant);
        assert_eq!(record.key(), key);
        assert_eq!(record.kind(), RecordKind::Grants);
        assert!(record.into_grant().is_some());

        let record = ExpiredRecord::DeviceCode(DeviceFlowCode::new("dev", "user", "tv", Utc::now()));
        assert_eq!(record.key(), "dev");
        assert_eq!(record.kind(), RecordKind::DeviceCodes);
        assert!(record.into_grant().is_none());
    }
}
