//! Registered authenticator devices.

use chrono::{DateTime, Utc};

/// A public-key credential bound to exactly one user.
///
/// `credential_id` is unique across all devices; `counter` only ever
/// increases (authenticator usage count, checked on every authentication).
#[derive(Debug, Clone)]
pub struct Device {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub credential_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub counter: u32,
    pub transports: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Fields for registering a device; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub user_id: i64,
    pub name: String,
    pub credential_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub counter: u32,
    pub transports: Option<Vec<String>>,
}
