use async_trait::async_trait;
use std::sync::Arc;

use super::domain::{
    AuthenticatedUser, LoginRequest, NewUser, SignupRequest, User, UserId,
};
use super::repository::UserRepository;
use super::tokens::TokenSigner;
use crate::store::RepositoryError;

/// Error raised by signup, login, and token checks.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    MissingFields(&'static str),
    #[error("Email already exists")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Server misconfiguration: SECRET_KEY is not set")]
    Unconfigured,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    InvalidToken,
    /// Well-formed token that is no longer the user's current session.
    #[error("Invalid or expired token")]
    Superseded,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Resolves a session token to the caller it belongs to.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

pub struct AuthService<U> {
    users: Arc<U>,
    signer: Option<TokenSigner>,
    hash_cost: u32,
}

impl<U> AuthService<U>
where
    U: UserRepository + 'static,
{
    /// `signer` is `None` when no secret is configured; token operations then
    /// fail with [`AuthError::Unconfigured`].
    pub fn new(users: Arc<U>, signer: Option<TokenSigner>) -> Self {
        Self {
            users,
            signer,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    fn signer(&self) -> Result<&TokenSigner, AuthError> {
        self.signer.as_ref().ok_or(AuthError::Unconfigured)
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<User, AuthError> {
        let (Some(username), Some(email), Some(password)) = (
            non_empty(request.username),
            non_empty(request.email),
            non_empty(request.password),
        ) else {
            return Err(AuthError::MissingFields(
                "Username, email and password are required",
            ));
        };

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let cost = self.hash_cost;
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|error| AuthError::Hashing(error.to_string()))?
            .map_err(|error| AuthError::Hashing(error.to_string()))?;

        let user = self
            .users
            .insert(NewUser {
                username,
                email,
                password_hash,
            })
            .await
            .map_err(|error| match error {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;
        tracing::info!(user = %user.id, "user registered");
        Ok(user)
    }

    /// Check credentials and start a new session. The issued token replaces any
    /// earlier one for the same user.
    pub async fn login(&self, request: LoginRequest) -> Result<String, AuthError> {
        let (Some(email), Some(password)) =
            (non_empty(request.email), non_empty(request.password))
        else {
            return Err(AuthError::MissingFields("Email and password are required"));
        };

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|error| AuthError::Hashing(error.to_string()))?
            .unwrap_or(false);
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.signer()?.issue(user.id)?;
        self.users.set_token(user.id, &token).await?;
        tracing::info!(user = %user.id, "session issued");
        Ok(token)
    }

    /// A token is valid when it decodes and is still the user's stored session.
    pub async fn verify(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.signer()?.decode(token)?;
        let user = self
            .users
            .get(UserId(claims.id))
            .await?
            .ok_or(AuthError::Superseded)?;
        if user.token.as_deref() != Some(token) {
            return Err(AuthError::Superseded);
        }
        Ok(user)
    }
}

#[async_trait]
impl<U> TokenVerifier for AuthService<U>
where
    U: UserRepository + 'static,
{
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let user = self.verify(token).await?;
        Ok(AuthenticatedUser {
            id: user.id,
            email: user.email,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
