//! User entity model, DTOs and validation.

use omdb_core::password::validate_password_plaintext;
use omdb_core::types::{DbId, Timestamp};
use omdb_core::validator::{is_email, Validator};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Maximum user name length in bytes.
pub const MAX_NAME_LEN: usize = 500;

/// A user row from the `users` table.
///
/// The password hash and version never leave the process in JSON.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub created_at: Timestamp,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub activated: bool,
    #[serde(skip)]
    pub version: i32,
}

impl User {
    /// An unsaved, not-yet-activated user.
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            name,
            email,
            password_hash,
            ..Self::default()
        }
    }
}

/// DTO for `POST /v1/users`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub fn validate_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(is_email(email), "email", "must be a valid email address");
}

/// Check a user's fields, plus the plaintext password when one is at hand.
///
/// # Panics
///
/// Panics if `user` has no password hash: every code path that builds a
/// `User` is expected to hash the password first.
pub fn validate_user(v: &mut Validator, user: &User, plaintext_password: Option<&str>) {
    v.check(!user.name.is_empty(), "name", "must be provided");
    v.check(
        user.name.len() <= MAX_NAME_LEN,
        "name",
        "must not be more than 500 bytes long",
    );

    validate_email(v, &user.email);

    if let Some(password) = plaintext_password {
        validate_password_plaintext(v, password);
    }

    if user.password_hash.is_empty() {
        panic!("missing password hash for user");
    }
}
