use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::users::repo_types::PublicUser;

/// Request body for user creation. Missing fields fail validation, not parsing.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for partial update.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `?name=` query for search; `q` is accepted too.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(alias = "q")]
    pub name: Option<String>,
}

/// Validated creation input, password still in plaintext.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Search hits plus the trimmed term that produced them.
#[derive(Debug)]
pub struct SearchResult {
    pub users: Vec<PublicUser>,
    pub count: usize,
    pub term: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub message: &'static str,
    pub status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
