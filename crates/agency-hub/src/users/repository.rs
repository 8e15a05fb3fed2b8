use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::domain::{NewUser, User, UserId};
use crate::store::RepositoryError;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    /// Fails with `Conflict` when the email is already registered.
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn set_token(&self, id: UserId, token: &str) -> Result<(), RepositoryError>;
}

#[derive(Debug, Default)]
struct Accounts {
    next_id: i64,
    rows: BTreeMap<UserId, User>,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    accounts: Arc<Mutex<Accounts>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let accounts = self.accounts.lock().expect("user table poisoned");
        Ok(accounts.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let accounts = self.accounts.lock().expect("user table poisoned");
        Ok(accounts
            .rows
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut accounts = self.accounts.lock().expect("user table poisoned");
        if accounts.rows.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict("Email already exists".to_string()));
        }
        accounts.next_id += 1;
        let id = UserId(accounts.next_id);
        let user = user.into_user(id);
        accounts.rows.insert(id, user.clone());
        Ok(user)
    }

    async fn set_token(&self, id: UserId, token: &str) -> Result<(), RepositoryError> {
        let mut accounts = self.accounts.lock().expect("user table poisoned");
        let user = accounts.rows.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.token = Some(token.to_string());
        Ok(())
    }
}
