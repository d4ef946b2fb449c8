use bazaar_db::Database;
use bazaar_types::models::User;

use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::token::TokenCodec;

/// Map a bearer token to the user it names.
///
/// The returned record is read fresh from the store, so its `role` (not
/// anything carried in the token) decides what the request may do.
/// Fails with `InvalidToken` for a bad signature, malformed or expired
/// payload, or an empty `username` claim, and with `UserNotFound` when the
/// user was deleted after the token was issued.
pub fn resolve(tokens: &TokenCodec, db: &Database, token: &str) -> ApiResult<User> {
    let claims = tokens.decode(token)?;
    if claims.username.is_empty() {
        return Err(ApiError::InvalidToken);
    }

    let row = db
        .get_user_by_username(&claims.username)?
        .ok_or(ApiError::UserNotFound)?;

    convert::user(row)
}
