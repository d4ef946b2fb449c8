/// Database row types. These map directly to SQLite rows.
/// Distinct from bazaar-types models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

/// An ad joined with its owner's public fields.
#[derive(Debug, Clone)]
pub struct AdRow {
    pub id: i64,
    pub title: String,
    pub kind: String,
    pub description: String,
    pub owner_id: i64,
    pub owner_username: String,
    pub owner_email: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub text: String,
    pub owner_id: i64,
    pub ad_id: i64,
    pub created_at: String,
}
