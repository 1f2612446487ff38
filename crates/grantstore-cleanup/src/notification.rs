//! Built-in notification sinks for removed grants

use async_trait::async_trait;
use grantstore_domain::{OperationalStoreNotification, PersistedGrant};

/// Sink that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotification;

#[async_trait]
impl OperationalStoreNotification for NoopNotification {
    async fn persisted_grants_removed(&self, _grants: &[PersistedGrant]) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Sink that writes one audit event per removed grant
///
/// Events go to the `grantstore::audit` target so they can be routed apart
/// from operational logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotification;

#[async_trait]
impl OperationalStoreNotification for LoggingNotification {
    async fn persisted_grants_removed(&self, grants: &[PersistedGrant]) -> anyhow::Result<()> {
        for grant in grants {
            tracing::info!(
                target: "grantstore::audit",
                key = %grant.key,
                grant_type = %grant.grant_type,
                subject_id = %grant.subject_id,
                client_id = %grant.client_id,
                expiration = ?grant.expiration,
                "expired grant removed"
            );
        }
        Ok(())
    }
}
