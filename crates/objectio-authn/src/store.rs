//! User, access key and session token storage

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::backend::{Backends, CredentialBackend, StoredCredential, TokenBackend, TokenGrant};
use crate::error::{BackendError, StoreError};
use crate::user::{AccessKey, KeyStatus, User, UserStatus, unix_now};

/// In-memory user, access key and token store
///
/// In production, this would be backed by the metadata service
#[derive(Default)]
pub struct UserStore {
    /// Users indexed by user_id
    users: RwLock<HashMap<String, User>>,
    /// Access keys indexed by access_key_id
    keys: RwLock<HashMap<String, AccessKey>>,
    /// Session grants indexed by token
    tokens: RwLock<HashMap<String, TokenGrant>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend handles for building strategies against this store
    pub fn backends(self: &Arc<Self>) -> Backends {
        Backends::new(self.clone()).with_tokens(self.clone())
    }

    // =========== User Operations ===========

    /// Create a new user
    pub fn create_user(&self, display_name: &str) -> Result<User, StoreError> {
        let mut users = self.users.write();

        if users.values().any(|u| u.display_name == display_name) {
            return Err(StoreError::UserAlreadyExists(display_name.to_string()));
        }

        let user = User::new(display_name);
        users.insert(user.user_id.clone(), user.clone());
        Ok(user)
    }

    pub fn get_user(&self, user_id: &str) -> Result<User, StoreError> {
        self.users
            .read()
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))
    }

    pub fn update_user_status(&self, user_id: &str, status: UserStatus) -> Result<(), StoreError> {
        let mut users = self.users.write();
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))?;
        user.status = status;
        Ok(())
    }

    // =========== Access Key Operations ===========

    /// Create a new access key for an active user
    pub fn create_access_key(&self, user_id: &str) -> Result<AccessKey, StoreError> {
        self.import_access_key(AccessKey::generate(user_id))
    }

    /// Register an access key with a known secret
    pub fn import_access_key(&self, key: AccessKey) -> Result<AccessKey, StoreError> {
        let user = self.get_user(&key.user_id)?;
        if !user.is_active() {
            return Err(StoreError::UserInactive(user.user_id));
        }

        let mut keys = self.keys.write();
        if keys.contains_key(&key.access_key_id) {
            return Err(StoreError::AccessKeyAlreadyExists(key.access_key_id));
        }
        keys.insert(key.access_key_id.clone(), key.clone());
        Ok(key)
    }

    pub fn update_access_key_status(
        &self,
        access_key_id: &str,
        status: KeyStatus,
    ) -> Result<(), StoreError> {
        let mut keys = self.keys.write();
        let key = keys
            .get_mut(access_key_id)
            .ok_or_else(|| StoreError::AccessKeyNotFound(access_key_id.to_string()))?;
        key.status = status;
        Ok(())
    }

    pub fn delete_access_key(&self, access_key_id: &str) -> Result<(), StoreError> {
        self.keys
            .write()
            .remove(access_key_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::AccessKeyNotFound(access_key_id.to_string()))
    }

    // =========== Session Tokens ===========

    /// Issue a random session token for a user
    pub fn issue_token(&self, user_id: &str, ttl: Duration) -> Result<String, StoreError> {
        let token = format!("tk_{}", Uuid::new_v4().simple());
        self.import_token(&token, user_id, ttl)?;
        Ok(token)
    }

    /// Register a known token for a user
    pub fn import_token(
        &self,
        token: &str,
        user_id: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let user = self.get_user(user_id)?;
        if !user.is_active() {
            return Err(StoreError::UserInactive(user.user_id));
        }

        let grant = TokenGrant {
            user_id: user.user_id,
            user_arn: user.arn,
            display_name: Some(user.display_name),
            expires_at: unix_now().saturating_add(ttl.as_secs()),
            attributes: HashMap::new(),
        };
        self.tokens.write().insert(token.to_string(), grant);
        Ok(())
    }

    pub fn revoke_token(&self, token: &str) -> Result<(), StoreError> {
        self.tokens
            .write()
            .remove(token)
            .map(|_| ())
            .ok_or(StoreError::TokenNotFound)
    }
}

#[async_trait]
impl CredentialBackend for UserStore {
    async fn lookup_access_key(
        &self,
        access_key_id: &str,
    ) -> Result<Option<StoredCredential>, BackendError> {
        let Some(access_key) = self.keys.read().get(access_key_id).cloned() else {
            return Ok(None);
        };
        let Some(user) = self.users.read().get(&access_key.user_id).cloned() else {
            tracing::warn!(
                "Access key {} references missing user {}",
                access_key_id,
                access_key.user_id
            );
            return Ok(None);
        };
        Ok(Some(StoredCredential { access_key, user }))
    }
}

#[async_trait]
impl TokenBackend for UserStore {
    async fn resolve_token(&self, token: &str) -> Result<Option<TokenGrant>, BackendError> {
        let Some(grant) = self.tokens.read().get(token).cloned() else {
            return Ok(None);
        };
        // Suspending a user invalidates the sessions they hold.
        let active = self
            .users
            .read()
            .get(&grant.user_id)
            .is_some_and(User::is_active);
        Ok(active.then_some(grant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_user() {
        let store = UserStore::new();
        store.create_user("testuser").unwrap();
        let result = store.create_user("testuser");
        assert!(matches!(result, Err(StoreError::UserAlreadyExists(_))));
    }

    #[test]
    fn test_access_key_requires_active_user() {
        let store = UserStore::new();
        let user = store.create_user("testuser").unwrap();
        store
            .update_user_status(&user.user_id, UserStatus::Suspended)
            .unwrap();
        assert!(matches!(
            store.create_access_key(&user.user_id),
            Err(StoreError::UserInactive(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_access_key() {
        let store = UserStore::new();
        let user = store.create_user("testuser").unwrap();
        let key = store.create_access_key(&user.user_id).unwrap();

        let found = store
            .lookup_access_key(&key.access_key_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.access_key.access_key_id, key.access_key_id);
        assert_eq!(found.user.user_id, user.user_id);

        store.delete_access_key(&key.access_key_id).unwrap();
        assert!(store.lookup_access_key(&key.access_key_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let store = UserStore::new();
        let user = store.create_user("swiftuser").unwrap();
        let token = store
            .issue_token(&user.user_id, Duration::from_secs(3600))
            .unwrap();

        let grant = store.resolve_token(&token).await.unwrap().unwrap();
        assert_eq!(grant.user_id, user.user_id);
        assert!(grant.expires_at > unix_now());

        store
            .update_user_status(&user.user_id, UserStatus::Suspended)
            .unwrap();
        assert!(store.resolve_token(&token).await.unwrap().is_none());

        store.revoke_token(&token).unwrap();
        assert!(matches!(
            store.revoke_token(&token),
            Err(StoreError::TokenNotFound)
        ));
    }
}
