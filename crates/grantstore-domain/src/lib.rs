//! Grantstore Domain Layer
//!
//! This crate defines the records persisted by the operational store and the
//! trait interfaces that the store implementations and the expiration sweeper
//! depend upon.
//!
//! ## Key Concepts
//!
//! - **PersistedGrant**: an issued artifact (authorization code, refresh token,
//!   reference token, consent) with an optional expiration
//! - **DeviceFlowCode**: a pending device-authorization session, keyed by device
//!   code with a secondary, non-unique user code
//! - **RecordKind**: the two logical record kinds a sweep drains
//! - **Clock**: source of "now", swappable in tests
//!
//! ## Architecture
//!
//! - No storage code lives here; implementations live in `grantstore-store`
//! - Store and notification seams are async traits so that both in-process
//!   and database-backed implementations can suspend

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod device_code;
pub mod grant;
pub mod kind;
pub mod traits;

// Re-exports for convenience
pub use clock::{Clock, MockClock, SystemClock};
pub use device_code::DeviceFlowCode;
pub use grant::{grant_types, PersistedGrant};
pub use kind::{ExpiredRecord, RecordKind};
pub use traits::{OperationalStore, OperationalStoreNotification, RecordStore};
