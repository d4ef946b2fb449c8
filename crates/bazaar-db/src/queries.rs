use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::models::{AdRow, CommentRow, UserRow};
use crate::{Database, Result};

const USER_COLUMNS: &str = "id, username, email, password, role, created_at";

const AD_SELECT: &str = "SELECT a.id, a.title, a.kind, a.description, a.owner_id, u.username, u.email, a.created_at
     FROM ads a
     JOIN users u ON a.owner_id = u.id";

const COMMENT_COLUMNS: &str = "id, text, owner_id, ad_id, created_at";

impl Database {
    // -- Users --

    /// Insert a user. A clash on username or email surfaces as
    /// [`DbError::UniqueViolation`](crate::DbError::UniqueViolation).
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password, role) VALUES (?1, ?2, ?3, ?4)",
                params![username, email, password_hash, role],
            )?;
            let id = conn.last_insert_rowid();
            let row = conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                user_from_row,
            )?;
            Ok(row)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Returns false if no user has this id.
    pub fn set_user_role(&self, id: i64, role: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET role = ?1 WHERE id = ?2",
                params![role, id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Ads --

    pub fn create_ad(&self, title: &str, kind: &str, description: &str, owner_id: i64) -> Result<AdRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO ads (title, kind, description, owner_id) VALUES (?1, ?2, ?3, ?4)",
                params![title, kind, description, owner_id],
            )?;
            let id = conn.last_insert_rowid();
            let row = conn.query_row(&format!("{AD_SELECT} WHERE a.id = ?1"), [id], ad_from_row)?;
            Ok(row)
        })
    }

    pub fn get_ad(&self, id: i64) -> Result<Option<AdRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(&format!("{AD_SELECT} WHERE a.id = ?1"), [id], ad_from_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_ads(&self) -> Result<Vec<AdRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{AD_SELECT} ORDER BY a.id"))?;
            let rows = stmt
                .query_map([], ad_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_ads_by_owner(&self, owner_id: i64) -> Result<Vec<AdRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{AD_SELECT} WHERE a.owner_id = ?1 ORDER BY a.id"))?;
            let rows = stmt
                .query_map([owner_id], ad_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete an ad and its comments in one transaction.
    /// Returns false if the ad did not exist.
    pub fn delete_ad(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM comments WHERE ad_id = ?1", [id])?;
            let deleted = tx.execute("DELETE FROM ads WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
    }

    // -- Comments --

    /// Insert a comment under `ad_id`. Returns `None` without writing anything
    /// if the ad does not exist.
    pub fn create_comment(&self, text: &str, owner_id: i64, ad_id: i64) -> Result<Option<CommentRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let ad_exists: Option<i64> = tx
                .query_row("SELECT id FROM ads WHERE id = ?1", [ad_id], |row| row.get(0))
                .optional()?;
            if ad_exists.is_none() {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO comments (text, owner_id, ad_id) VALUES (?1, ?2, ?3)",
                params![text, owner_id, ad_id],
            )?;
            let id = tx.last_insert_rowid();
            let row = tx.query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                [id],
                comment_from_row,
            )?;
            tx.commit()?;
            Ok(Some(row))
        })
    }

    pub fn get_comment(&self, id: i64) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                    [id],
                    comment_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_comments(&self) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| query_comments(conn, None))
    }

    pub fn list_comments_by_ad(&self, ad_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| query_comments(conn, Some(("ad_id", ad_id))))
    }

    pub fn list_comments_by_owner(&self, owner_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| query_comments(conn, Some(("owner_id", owner_id))))
    }

    /// Returns false if the comment did not exist.
    pub fn delete_comment(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

// `column` is always one of our own literals, never caller input.
fn query_user<P: rusqlite::ToSql>(conn: &Connection, column: &str, value: P) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;
    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

fn query_comments(conn: &Connection, filter: Option<(&str, i64)>) -> Result<Vec<CommentRow>> {
    let rows = match filter {
        Some((column, value)) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE {column} = ?1 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map([value], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(&format!("SELECT {COMMENT_COLUMNS} FROM comments ORDER BY id"))?;
            let rows = stmt
                .query_map([], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn ad_from_row(row: &Row<'_>) -> rusqlite::Result<AdRow> {
    Ok(AdRow {
        id: row.get(0)?,
        title: row.get(1)?,
        kind: row.get(2)?,
        description: row.get(3)?,
        owner_id: row.get(4)?,
        owner_username: row.get(5)?,
        owner_email: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        text: row.get(1)?,
        owner_id: row.get(2)?,
        ad_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}
