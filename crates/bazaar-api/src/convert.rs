//! Row → model conversions. Stored roles and titles that do not parse are
//! errors, never a silent default.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use bazaar_db::models::{AdRow, CommentRow, UserRow};
use bazaar_types::api::{AdOwner, AdResponse, CommentResponse, UserResponse};
use bazaar_types::models::{Ad, Comment, User};

use crate::error::{ApiError, ApiResult};

pub(crate) fn user(row: UserRow) -> ApiResult<User> {
    let role = row
        .role
        .parse()
        .map_err(|e| ApiError::Internal(format!("user {}: {}", row.id, e)))?;

    Ok(User {
        id: row.id,
        created_at: timestamp(&row.created_at, "user", row.id),
        username: row.username,
        email: row.email,
        role,
    })
}

pub(crate) fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role,
    }
}

pub(crate) fn ad(row: &AdRow) -> ApiResult<Ad> {
    let kind = row
        .kind
        .parse()
        .map_err(|e| ApiError::Internal(format!("ad {}: {}", row.id, e)))?;

    Ok(Ad {
        id: row.id,
        title: row.title.clone(),
        kind,
        description: row.description.clone(),
        owner_id: row.owner_id,
        created_at: timestamp(&row.created_at, "ad", row.id),
    })
}

pub(crate) fn ad_response(row: AdRow) -> ApiResult<AdResponse> {
    let ad = ad(&row)?;
    Ok(AdResponse {
        id: ad.id,
        title: ad.title,
        kind: ad.kind,
        description: ad.description,
        owner: AdOwner {
            id: row.owner_id,
            username: row.owner_username,
            email: row.owner_email,
        },
        created_at: ad.created_at,
    })
}

pub(crate) fn comment(row: CommentRow) -> Comment {
    Comment {
        id: row.id,
        created_at: timestamp(&row.created_at, "comment", row.id),
        text: row.text,
        owner_id: row.owner_id,
        ad_id: row.ad_id,
    }
}

pub(crate) fn comment_response(comment: Comment) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        text: comment.text,
        owner_id: comment.owner_id,
        ad_id: comment.ad_id,
        created_at: comment.created_at,
    }
}

fn timestamp(raw: &str, table: &str, id: i64) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on {} {}: {}", raw, table, id, e);
            DateTime::default()
        })
}
