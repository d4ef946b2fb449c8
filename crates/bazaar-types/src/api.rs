use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AdKind, Role};

// -- JWT Claims --

/// Identity claims carried by a session token. Shared by the token codec and
/// any client that wants to inspect its own token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

/// `GET /users/me`: the caller plus everything they authored.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub ads: Vec<AdResponse>,
    pub comments: Vec<CommentResponse>,
}

// -- Ads --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAdRequest {
    pub title: String,
    #[serde(default)]
    pub kind: AdKind,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdOwner {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdResponse {
    pub id: i64,
    pub title: String,
    pub kind: AdKind,
    pub description: String,
    pub owner: AdOwner,
    pub created_at: DateTime<Utc>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: i64,
    pub text: String,
    pub owner_id: i64,
    pub ad_id: i64,
    pub created_at: DateTime<Utc>,
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct DetailResponse {
    pub detail: String,
}
