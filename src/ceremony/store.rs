//! Credential storage collaborator
//!
//! Durable persistence is outside this crate; the ceremony layer only
//! depends on the [`CredentialStore`] trait. The in-memory implementation
//! backs development and tests, and anything that holds real users should
//! replace it behind the same trait.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;
use uuid::Uuid;
use webauthn_rs::prelude::{AuthenticationResult, Passkey};

/// Errors surfaced by a credential store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Registered-credential storage, keyed by user handle
pub trait CredentialStore: Send + Sync {
    /// Persist a newly registered passkey
    ///
    /// Registering the same credential id again replaces the stored entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store is unavailable.
    fn persist(&self, user: Uuid, passkey: Passkey) -> Result<(), StoreError>;

    /// All passkeys registered for a user; empty when the user is unknown
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store is unavailable.
    fn lookup(&self, user: Uuid) -> Result<Vec<Passkey>, StoreError>;

    /// Apply post-authentication bookkeeping (signature counter update)
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store is unavailable.
    fn update(&self, user: Uuid, result: &AuthenticationResult) -> Result<(), StoreError>;
}

/// Process-local credential store
#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<HashMap<Uuid, Vec<Passkey>>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn persist(&self, user: Uuid, passkey: Passkey) -> Result<(), StoreError> {
        let mut credentials = self
            .credentials
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;

        let entry = credentials.entry(user).or_default();
        entry.retain(|existing| existing.cred_id() != passkey.cred_id());
        entry.push(passkey);
        Ok(())
    }

    fn lookup(&self, user: Uuid) -> Result<Vec<Passkey>, StoreError> {
        let credentials = self
            .credentials
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;

        Ok(credentials.get(&user).cloned().unwrap_or_default())
    }

    fn update(&self, user: Uuid, result: &AuthenticationResult) -> Result<(), StoreError> {
        let mut credentials = self
            .credentials
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;

        if let Some(passkeys) = credentials.get_mut(&user) {
            for passkey in passkeys.iter_mut() {
                // update_credential is a no-op unless the credential id matches
                passkey.update_credential(result);
            }
        }
        Ok(())
    }
}
