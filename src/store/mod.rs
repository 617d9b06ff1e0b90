//! Storage collaborator boundary.
//!
//! Persistence mechanics (transactions, row locking, migrations) live behind
//! this trait; the crate only states the invariants the store must uphold:
//! usernames and emails are unique, credential ids are unique across all
//! devices, and device lookups are scoped to the owning user.

use async_trait::async_trait;

use crate::models::{Device, NewDevice, NewUser, User};

mod memory;

pub use memory::InMemoryStore;

/// Failure surfaced by a storage implementation.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct StoreError(#[from] anyhow::Error);

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable storage for users, devices, and trusted client identifiers.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// Whole-record save; the caller mutates a loaded `User` and writes it back.
    async fn update_user(&self, user: &User) -> StoreResult<()>;

    async fn devices_for_user(&self, user_id: i64) -> StoreResult<Vec<Device>>;

    /// Scoped lookup: a credential id belonging to a different user is `None`.
    async fn find_device_by_credential_id(
        &self,
        user_id: i64,
        credential_id: &[u8],
    ) -> StoreResult<Option<Device>>;

    async fn create_device(&self, device: NewDevice) -> StoreResult<Device>;
    async fn update_device(&self, device: &Device) -> StoreResult<()>;

    /// Deletes a device owned by `user_id`; returns whether anything was removed.
    async fn delete_device(&self, user_id: i64, device_id: i64) -> StoreResult<bool>;

    async fn device_count(&self, user_id: i64) -> StoreResult<usize> {
        Ok(self.devices_for_user(user_id).await?.len())
    }

    /// Whether this client identifier has completed MFA for the user before.
    async fn client_known(&self, user_id: i64, client_id: &str) -> StoreResult<bool>;
    async fn register_client(&self, user_id: i64, client_id: &str) -> StoreResult<()>;
}
