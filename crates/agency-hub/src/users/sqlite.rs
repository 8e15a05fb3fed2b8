use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::domain::{NewUser, User, UserId};
use super::repository::UserRepository;
use crate::store::RepositoryError;

#[derive(Debug, Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password")?,
        token: row.try_get("token")?,
    })
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, email, password, token FROM users WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, username, email, password, token FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let result = sqlx::query("INSERT INTO users (username, email, password) VALUES (?, ?, ?)")
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await
            .map_err(|error| match error {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    RepositoryError::Conflict("Email already exists".to_string())
                }
                other => RepositoryError::Database(other),
            })?;
        Ok(user.into_user(UserId(result.last_insert_rowid())))
    }

    async fn set_token(&self, id: UserId, token: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET token = ? WHERE id = ?")
            .bind(token)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
