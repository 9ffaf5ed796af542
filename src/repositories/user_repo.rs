use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::user::normalize_email;
use crate::models::{FromSqliteRow, User};

const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM users WHERE id = ?")?;
            let result = stmt.query_row([&id], User::from_row).optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let pool = self.pool.clone();
        let email = normalize_email(email);
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM users WHERE email = ?")?;
            let result = stmt.query_row([&email], User::from_row).optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Fails with `UserExists` when the email is taken.
    pub async fn create(&self, email: &str, password: &str) -> Result<User> {
        let password_hash = hash_password(password)?;
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            password_hash,
            generating_since: None,
            created_at: Utc::now(),
        };

        let pool = self.pool.clone();
        let row = user.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
                rusqlite::params![row.id, row.email, row.password_hash, row.created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(user)
    }

    pub async fn verify_password(&self, email: &str, password: &str) -> Result<Option<User>> {
        let user = self.find_by_email(email).await?;

        match user {
            Some(user) => {
                if verify_password(password, &user.password_hash)? {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    pub async fn update_password(&self, id: &str, new_password: &str) -> Result<bool> {
        let password_hash = hash_password(new_password)?;
        let pool = self.pool.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "UPDATE users SET password_hash = ? WHERE id = ?",
                rusqlite::params![password_hash, id],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Set the in-flight generation marker unless a fresh one is already set.
    /// Markers older than `stale_before` are overwritten. Returns whether the
    /// marker was claimed.
    pub async fn claim_generation(
        &self,
        id: &str,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "UPDATE users SET generating_since = ?
                 WHERE id = ?
                   AND (generating_since IS NULL OR julianday(generating_since) < julianday(?))",
                rusqlite::params![now, id, stale_before],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn release_generation(&self, id: &str) -> Result<()> {
        let pool = self.pool.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            conn.execute(
                "UPDATE users SET generating_since = NULL WHERE id = ?",
                [&id],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Create a single-use password reset token for the user.
    pub async fn create_reset_token(&self, user_id: &str) -> Result<String> {
        let pool = self.pool.clone();
        let token = Uuid::new_v4().to_string();
        let user_id = user_id.to_string();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        let token_clone = token.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO password_resets (token, user_id, expires_at) VALUES (?, ?, ?)",
                rusqlite::params![token_clone, user_id, expires_at],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(token)
    }

    /// Consume a reset token and return its user id if it was valid.
    pub async fn consume_reset_token(&self, token: &str) -> Result<Option<String>> {
        let pool = self.pool.clone();
        let token = token.to_string();
        let now = Utc::now();

        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let result: Option<(String, DateTime<Utc>)> = conn
                .query_row(
                    "SELECT user_id, expires_at FROM password_resets WHERE token = ?",
                    [&token],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            conn.execute("DELETE FROM password_resets WHERE token = ?", [&token])?;

            Ok(result.and_then(|(user_id, expires_at)| (expires_at > now).then_some(user_id)))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AppError::PasswordHash)?
        .to_string();
    Ok(password_hash)
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AppError::PasswordHash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::migrations::run_migrations;

    fn repo() -> UserRepository {
        let pool = create_memory_pool().unwrap();
        run_migrations(&pool).unwrap();
        UserRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_normalizes_email() {
        let repo = repo();
        let user = repo.create("  Lifter@Example.com", "secret1").await.unwrap();
        assert_eq!(user.email, "lifter@example.com");
        assert!(repo.find_by_email("LIFTER@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_maps_to_user_exists() {
        let repo = repo();
        repo.create("a@b.io", "secret1").await.unwrap();
        let err = repo.create("A@b.io", "secret2").await.unwrap_err();
        assert!(matches!(err, AppError::UserExists));
    }

    #[tokio::test]
    async fn test_verify_password() {
        let repo = repo();
        repo.create("a@b.io", "secret1").await.unwrap();
        assert!(repo.verify_password("a@b.io", "secret1").await.unwrap().is_some());
        assert!(repo.verify_password("a@b.io", "wrong").await.unwrap().is_none());
        assert!(repo.verify_password("x@b.io", "secret1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_generation_marker_claimed_once() {
        let repo = repo();
        let user = repo.create("a@b.io", "secret1").await.unwrap();
        let now = Utc::now();
        let stale_before = now - Duration::seconds(60);

        assert!(repo.claim_generation(&user.id, now, stale_before).await.unwrap());
        assert!(!repo.claim_generation(&user.id, now, stale_before).await.unwrap());

        repo.release_generation(&user.id).await.unwrap();
        assert!(repo.claim_generation(&user.id, now, stale_before).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_generation_marker_is_reclaimed() {
        let repo = repo();
        let user = repo.create("a@b.io", "secret1").await.unwrap();
        let long_ago = Utc::now() - Duration::minutes(10);
        assert!(repo
            .claim_generation(&user.id, long_ago, long_ago - Duration::seconds(60))
            .await
            .unwrap());

        let now = Utc::now();
        assert!(repo
            .claim_generation(&user.id, now, now - Duration::seconds(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_reset_token_is_single_use() {
        let repo = repo();
        let user = repo.create("a@b.io", "secret1").await.unwrap();
        let token = repo.create_reset_token(&user.id).await.unwrap();

        assert_eq!(
            repo.consume_reset_token(&token).await.unwrap(),
            Some(user.id.clone())
        );
        assert_eq!(repo.consume_reset_token(&token).await.unwrap(), None);
    }
}
