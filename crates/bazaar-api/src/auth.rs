use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};

use bazaar_db::Database;
use bazaar_types::api::{LoginRequest, RegisterRequest, TokenResponse};
use bazaar_types::models::Role;

use crate::config::AuthConfig;
use crate::convert::user_response;
use crate::error::{ApiError, ApiResult};
use crate::password;
use crate::repository::Repository;
use crate::run_blocking;
use crate::token::TokenCodec;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenCodec,
}

impl AppStateInner {
    pub fn new(db: Database, config: &AuthConfig) -> AppState {
        Arc::new(Self {
            db,
            tokens: TokenCodec::new(config),
        })
    }
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    validate_username(&req.username)?;
    validate_email(&req.email)?;
    if req.password.is_empty() {
        return Err(ApiError::Validation("Password must not be empty".into()));
    }

    // Admins are only made by promotion.
    let role = req.role.unwrap_or_default();
    if role.is_admin() {
        return Err(ApiError::Authorization("Cannot register as admin"));
    }

    let user = run_blocking(move || {
        Repository::new(&state.db).create_user(&req.username, &req.email, &req.password, role)
    })
    .await?;

    info!("Registered user {} (id {})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(user_response(&user))))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<Json<TokenResponse>> {
    let token = run_blocking(move || {
        authenticate(&state.db, &state.tokens, &req.username, &req.password)
    })
    .await?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

/// Check credentials and mint a session token.
///
/// An unknown username and a wrong password fail identically, and an unknown
/// username still pays for one hash so response timing stays comparable.
pub fn authenticate(db: &Database, tokens: &TokenCodec, username: &str, password: &str) -> ApiResult<String> {
    let Some((user, stored_hash)) = Repository::new(db).find_credentials(username)? else {
        let _ = password::hash_password(password);
        warn!("Failed login for unknown user");
        return Err(ApiError::Authentication);
    };

    if !password::verify_password(password, &stored_hash) {
        warn!("Failed login for {}", user.username);
        return Err(ApiError::Authentication);
    }

    info!("User {} logged in", user.username);
    tokens.issue(&user.username, &user.email)
}

/// Bootstrap an admin account, e.g. from startup config. Returns false if
/// the username is already taken.
///
/// The seed goes through the same username and email rules as registration.
/// A taken username that does not belong to an admin is left untouched and
/// reported with a warning.
pub fn ensure_admin(db: &Database, username: &str, email: &str, password: &str) -> ApiResult<bool> {
    validate_username(username)?;
    validate_email(email)?;
    if password.is_empty() {
        return Err(ApiError::Validation("Password must not be empty".into()));
    }

    if let Some(existing) = db.get_user_by_username(username)? {
        if existing.role == Role::Admin.as_str() {
            info!("Bootstrap admin {} already exists", username);
        } else {
            warn!(
                "Bootstrap admin username {} belongs to a {} account; no admin created",
                username, existing.role
            );
        }
        return Ok(false);
    }
    let admin = Repository::new(db).create_user(username, email, password, Role::Admin)?;
    info!("Created bootstrap admin {} (id {})", admin.username, admin.id);
    Ok(true)
}

fn validate_username(username: &str) -> ApiResult<()> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(ApiError::Validation("Username must be 3 to 32 characters".into()));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ApiError::Validation(
            "Username may only contain letters, digits, '_', '.' and '-'".into(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> ApiResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ApiError::Validation("Invalid email address".into()))
    }
}
