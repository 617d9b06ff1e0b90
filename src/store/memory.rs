//! In-memory `CredentialStore` for tests and embedding.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::models::{Device, NewDevice, NewUser, User};

use super::{CredentialStore, StoreError, StoreResult};

/// Mutex-guarded maps. Each call is atomic; read-modify-write sequences that
/// span calls keep the narrow race window the storage contract acknowledges.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<i64, User>,
    devices: HashMap<i64, Device>,
    clients: HashMap<i64, HashSet<String>>,
    next_user_id: i64,
    next_device_id: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::from(anyhow::anyhow!("store mutex poisoned")))
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.lock()?;

        if inner.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::from(anyhow::anyhow!(
                "username already taken: {}",
                user.username
            )));
        }
        if !user.email.is_empty() && inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::from(anyhow::anyhow!(
                "email already registered: {}",
                user.email
            )));
        }

        inner.next_user_id += 1;
        let created = User {
            id: inner.next_user_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            email_confirmed: user.email_confirmed,
            need_password_reset: user.need_password_reset,
            pending_code: None,
            current_challenge: None,
            last_login: None,
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if !inner.users.contains_key(&user.id) {
            return Err(StoreError::from(anyhow::anyhow!(
                "no such user: {}",
                user.id
            )));
        }

        if inner
            .users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(StoreError::from(anyhow::anyhow!(
                "username already taken: {}",
                user.username
            )));
        }
        if !user.email.is_empty()
            && inner
                .users
                .values()
                .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::from(anyhow::anyhow!(
                "email already registered: {}",
                user.email
            )));
        }

        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn devices_for_user(&self, user_id: i64) -> StoreResult<Vec<Device>> {
        let mut devices: Vec<Device> = self
            .lock()?
            .devices
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        devices.sort_by_key(|d| d.id);
        Ok(devices)
    }

    async fn find_device_by_credential_id(
        &self,
        user_id: i64,
        credential_id: &[u8],
    ) -> StoreResult<Option<Device>> {
        Ok(self
            .lock()?
            .devices
            .values()
            .find(|d| d.user_id == user_id && d.credential_id == credential_id)
            .cloned())
    }

    async fn create_device(&self, device: NewDevice) -> StoreResult<Device> {
        let mut inner = self.lock()?;

        if inner
            .devices
            .values()
            .any(|d| d.credential_id == device.credential_id)
        {
            return Err(StoreError::from(anyhow::anyhow!(
                "credential id already registered"
            )));
        }

        inner.next_device_id += 1;
        let created = Device {
            id: inner.next_device_id,
            user_id: device.user_id,
            name: device.name,
            credential_id: device.credential_id,
            public_key: device.public_key,
            counter: device.counter,
            transports: device.transports,
            created_at: Utc::now(),
        };
        inner.devices.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_device(&self, device: &Device) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if !inner.devices.contains_key(&device.id) {
            return Err(StoreError::from(anyhow::anyhow!(
                "no such device: {}",
                device.id
            )));
        }
        inner.devices.insert(device.id, device.clone());
        Ok(())
    }

    async fn delete_device(&self, user_id: i64, device_id: i64) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        match inner.devices.get(&device_id) {
            Some(device) if device.user_id == user_id => {
                inner.devices.remove(&device_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn client_known(&self, user_id: i64, client_id: &str) -> StoreResult<bool> {
        Ok(self
            .lock()?
            .clients
            .get(&user_id)
            .is_some_and(|ids| ids.contains(client_id)))
    }

    async fn register_client(&self, user_id: i64, client_id: &str) -> StoreResult<()> {
        self.lock()?
            .clients
            .entry(user_id)
            .or_default()
            .insert(client_id.to_string());
        Ok(())
    }
}
