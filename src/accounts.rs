use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db;
use crate::error::AccountError;

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_new_account(
    username: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), AccountError> {
    if password != confirm_password {
        return Err(AccountError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN || password.chars().any(char::is_whitespace) {
        return Err(AccountError::InvalidCredentials(
            "password must be at least 8 characters long and must not contain spaces",
        ));
    }
    if username.is_empty() || username.chars().any(char::is_whitespace) {
        return Err(AccountError::InvalidCredentials(
            "username must not be empty or contain spaces",
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccountError::Hash(err.to_string()))
}

fn verify_password(password: &str, stored: &str) -> Result<bool, AccountError> {
    let parsed = PasswordHash::new(stored).map_err(|err| AccountError::Hash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub async fn create_account(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), AccountError> {
    validate_new_account(username, password, confirm_password)?;
    let hash = hash_password(password)?;

    if !db::insert_account(pool, username, &hash).await? {
        return Err(AccountError::UsernameTaken(username.to_string()));
    }
    info!(username, "account created");
    Ok(())
}

/// Checks credentials and returns the user id that keys saved snapshots.
pub async fn authenticate(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<String, AccountError> {
    let stored = db::fetch_password_hash(pool, username)
        .await?
        .ok_or_else(|| AccountError::NotFound(username.to_string()))?;

    if !verify_password(password, &stored)? {
        warn!(username, "login rejected");
        return Err(AccountError::WrongPassword);
    }
    info!(username, "login succeeded");
    Ok(username.to_string())
}
