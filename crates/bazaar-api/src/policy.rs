//! Ownership and role rules checked before every mutating operation.
//!
//! Each rule is a pure function of the acting user and the loaded target.
//! There is no "unknown" outcome: a request without a resolved actor is
//! rejected by the auth middleware and a missing target is `NotFound`
//! before any rule runs.

use bazaar_types::models::{Ad, Comment, User};

use crate::error::{ApiError, ApiResult};

pub fn can_delete_ad(actor: &User, ad: &Ad) -> bool {
    actor.id == ad.owner_id || actor.role.is_admin()
}

pub fn can_delete_comment(actor: &User, comment: &Comment) -> bool {
    actor.id == comment.owner_id || actor.role.is_admin()
}

/// Promotion only ever goes user → admin; an admin is never re-targeted.
pub fn can_promote_to_admin(actor: &User, target: &User) -> bool {
    actor.role.is_admin() && !target.role.is_admin()
}

/// Turn a decision into `Authorization` when it denies.
pub fn require(allowed: bool, denied: &'static str) -> ApiResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(ApiError::Authorization(denied))
    }
}
