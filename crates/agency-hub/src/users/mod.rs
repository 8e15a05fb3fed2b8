//! Accounts, bcrypt credentials, and JWT session tokens.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod sqlite;
pub mod tokens;

#[cfg(test)]
mod tests;

pub use domain::{AuthenticatedUser, NewUser, User, UserId};
pub use repository::{InMemoryUserRepository, UserRepository};
pub use router::{require_token, user_router};
pub use service::{AuthError, AuthService, TokenVerifier};
pub use sqlite::SqliteUserRepository;
pub use tokens::{Claims, TokenSigner};
