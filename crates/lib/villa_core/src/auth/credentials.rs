//! User credential store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{NewUser, Principal, UserWithPassword};

/// Looks up and creates users. Username matching is case-insensitive.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<UserWithPassword>, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, AuthError>;

    async fn user_name_exists(&self, user_name: &str) -> Result<bool, AuthError>;

    /// Create a user holding exactly `user.role`.
    async fn create_user(&self, user: NewUser) -> Result<Principal, AuthError>;
}

/// Credential store kept in process memory.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<Uuid, UserWithPassword>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.principal.user_name.eq_ignore_ascii_case(user_name))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, AuthError> {
        Ok(self.users.read().await.get(&id).map(|u| u.principal.clone()))
    }

    async fn user_name_exists(&self, user_name: &str) -> Result<bool, AuthError> {
        Ok(self.find_by_user_name(user_name).await?.is_some())
    }

    async fn create_user(&self, user: NewUser) -> Result<Principal, AuthError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.principal.user_name.eq_ignore_ascii_case(&user.user_name))
        {
            return Err(AuthError::DuplicateUser);
        }
        let principal = Principal {
            id: Uuid::new_v4(),
            normalized_email: user.user_name.to_uppercase(),
            user_name: user.user_name,
            name: user.name,
            roles: vec![user.role],
        };
        users.insert(
            principal.id,
            UserWithPassword {
                principal: principal.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(user_name: &str) -> NewUser {
        NewUser {
            user_name: user_name.into(),
            name: "Name".into(),
            password_hash: "hash".into(),
            role: "customer".into(),
        }
    }

    #[tokio::test]
    async fn lookups_ignore_case() {
        let store = MemoryCredentialStore::new();
        let created = store.create_user(new_user("Alice")).await.unwrap();
        assert_eq!(created.normalized_email, "ALICE");

        let found = store.find_by_user_name("alice").await.unwrap().unwrap();
        assert_eq!(found.principal.id, created.id);
        assert!(store.user_name_exists("ALICE").await.unwrap());
        assert_eq!(store.find_by_id(created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn duplicate_user_name_is_rejected() {
        let store = MemoryCredentialStore::new();
        store.create_user(new_user("bob")).await.unwrap();
        let err = store.create_user(new_user("BOB")).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUser));
    }
}
