//! Account creation, login and password hashing.

use crate::errors::{HabitError, HabitResult};
use crate::models::User;
use crate::store::Database;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::info;

pub const EMPTY_USERNAME: &str = "Please insert a username.";
pub const EMPTY_PASSWORD: &str = "Please insert a password.";
pub const USERNAME_TAKEN: &str = "Username already exists.";
pub const UNKNOWN_USERNAME: &str = "This username does not exist";
pub const WRONG_PASSWORD: &str = "Incorrect password";

/// Hash a password with Argon2id into a PHC string.
pub fn hash_password(password: &str) -> HabitResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HabitError::Auth(format!("failed to hash password: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> HabitResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| HabitError::Auth(format!("invalid password hash format: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn signup(db: &mut Database, username: &str, password: &str) -> HabitResult<User> {
    if username.is_empty() {
        return Err(HabitError::validation(EMPTY_USERNAME));
    }
    if password.is_empty() {
        return Err(HabitError::validation(EMPTY_PASSWORD));
    }
    if db.user_by_username(username).is_some() {
        return Err(HabitError::validation(USERNAME_TAKEN));
    }

    let hash = hash_password(password)?;
    let user = db.create_user(username, hash)?;
    info!(user_id = user.id, "user signed up");
    Ok(user)
}

pub fn login(db: &Database, username: &str, password: &str) -> HabitResult<User> {
    let user = db
        .user_by_username(username)
        .ok_or_else(|| HabitError::validation(UNKNOWN_USERNAME))?;
    if !verify_password(password, &user.password_hash)? {
        return Err(HabitError::validation(WRONG_PASSWORD));
    }
    Ok(user.clone())
}
