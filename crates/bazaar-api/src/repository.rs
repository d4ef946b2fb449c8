//! Entity operations over the store, returning the API error taxonomy.
//! Deletes and role changes run their policy check here, right before the write.

use tracing::info;

use bazaar_db::Database;
use bazaar_types::api::{AdResponse, CommentResponse};
use bazaar_types::models::{AdKind, Role, User};

use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::password;
use crate::policy;

pub struct Repository<'a> {
    db: &'a Database,
}

impl<'a> Repository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // -- Users --

    /// Checked for clashes before hashing so a duplicate never costs a hash
    /// or a partial write. A racing insert still ends as `Duplicate` via the
    /// store's unique constraints.
    pub fn create_user(&self, username: &str, email: &str, password: &str, role: Role) -> ApiResult<User> {
        if self.db.get_user_by_username(username)?.is_some()
            || self.db.get_user_by_email(email)?.is_some()
        {
            return Err(ApiError::Duplicate);
        }

        let password_hash = password::hash_password(password)?;
        let row = self.db.create_user(username, email, &password_hash, role.as_str())?;
        convert::user(row)
    }

    pub fn get_user(&self, id: i64) -> ApiResult<User> {
        let row = self.db.get_user_by_id(id)?.ok_or(ApiError::NotFound("User"))?;
        convert::user(row)
    }

    /// The user and their stored password hash, for login.
    pub fn find_credentials(&self, username: &str) -> ApiResult<Option<(User, String)>> {
        match self.db.get_user_by_username(username)? {
            Some(row) => {
                let hash = row.password.clone();
                Ok(Some((convert::user(row)?, hash)))
            }
            None => Ok(None),
        }
    }

    pub fn promote_to_admin(&self, actor: &User, target_id: i64) -> ApiResult<User> {
        // Non-admins learn nothing about which ids exist.
        policy::require(actor.role.is_admin(), "Only admins can change roles")?;

        let target = self.get_user(target_id)?;
        policy::require(
            policy::can_promote_to_admin(actor, &target),
            "User is already an admin",
        )?;

        if !self.db.set_user_role(target.id, Role::Admin.as_str())? {
            return Err(ApiError::NotFound("User"));
        }

        info!("User {} promoted to admin by {}", target.username, actor.username);
        Ok(User {
            role: Role::Admin,
            ..target
        })
    }

    // -- Ads --

    pub fn create_ad(&self, owner: &User, title: &str, kind: AdKind, description: &str) -> ApiResult<AdResponse> {
        let row = self.db.create_ad(title, kind.as_str(), description, owner.id)?;
        info!("Ad {} created by {}", row.id, owner.username);
        convert::ad_response(row)
    }

    pub fn get_ad(&self, id: i64) -> ApiResult<AdResponse> {
        let row = self.db.get_ad(id)?.ok_or(ApiError::NotFound("Ad"))?;
        convert::ad_response(row)
    }

    pub fn list_ads(&self) -> ApiResult<Vec<AdResponse>> {
        self.db.list_ads()?.into_iter().map(convert::ad_response).collect()
    }

    pub fn list_ads_by_owner(&self, owner_id: i64) -> ApiResult<Vec<AdResponse>> {
        self.db
            .list_ads_by_owner(owner_id)?
            .into_iter()
            .map(convert::ad_response)
            .collect()
    }

    /// Removes the ad and all of its comments.
    pub fn delete_ad(&self, actor: &User, id: i64) -> ApiResult<()> {
        let row = self.db.get_ad(id)?.ok_or(ApiError::NotFound("Ad"))?;
        let ad = convert::ad(&row)?;
        policy::require(policy::can_delete_ad(actor, &ad), "Not allowed to delete this ad")?;

        if !self.db.delete_ad(id)? {
            return Err(ApiError::NotFound("Ad"));
        }
        info!("Ad {} deleted by {}", id, actor.username);
        Ok(())
    }

    // -- Comments --

    pub fn create_comment(&self, author: &User, ad_id: i64, text: &str) -> ApiResult<CommentResponse> {
        let row = self
            .db
            .create_comment(text, author.id, ad_id)?
            .ok_or(ApiError::NotFound("Ad"))?;
        info!("Comment {} on ad {} created by {}", row.id, ad_id, author.username);
        Ok(convert::comment_response(convert::comment(row)))
    }

    pub fn get_comment(&self, id: i64) -> ApiResult<CommentResponse> {
        let row = self.db.get_comment(id)?.ok_or(ApiError::NotFound("Comment"))?;
        Ok(convert::comment_response(convert::comment(row)))
    }

    pub fn list_comments(&self) -> ApiResult<Vec<CommentResponse>> {
        Ok(self
            .db
            .list_comments()?
            .into_iter()
            .map(|row| convert::comment_response(convert::comment(row)))
            .collect())
    }

    pub fn list_comments_for_ad(&self, ad_id: i64) -> ApiResult<Vec<CommentResponse>> {
        if self.db.get_ad(ad_id)?.is_none() {
            return Err(ApiError::NotFound("Ad"));
        }
        Ok(self
            .db
            .list_comments_by_ad(ad_id)?
            .into_iter()
            .map(|row| convert::comment_response(convert::comment(row)))
            .collect())
    }

    pub fn list_comments_by_owner(&self, owner_id: i64) -> ApiResult<Vec<CommentResponse>> {
        Ok(self
            .db
            .list_comments_by_owner(owner_id)?
            .into_iter()
            .map(|row| convert::comment_response(convert::comment(row)))
            .collect())
    }

    pub fn delete_comment(&self, actor: &User, id: i64) -> ApiResult<()> {
        let row = self.db.get_comment(id)?.ok_or(ApiError::NotFound("Comment"))?;
        let comment = convert::comment(row);
        policy::require(
            policy::can_delete_comment(actor, &comment),
            "Not allowed to delete this comment",
        )?;

        if !self.db.delete_comment(id)? {
            return Err(ApiError::NotFound("Comment"));
        }
        info!("Comment {} deleted by {}", id, actor.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Database, User, User, User) {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob, carol) = {
            let repo = Repository::new(&db);
            let alice = repo.create_user("alice", "alice@example.com", "pw123", Role::User).unwrap();
            let bob = repo.create_user("bob", "bob@example.com", "pw456", Role::User).unwrap();
            let carol = repo.create_user("carol", "carol@example.com", "pw789", Role::Admin).unwrap();
            (alice, bob, carol)
        };
        (db, alice, bob, carol)
    }

    #[test]
    fn duplicate_username_or_email_rejected() {
        let (db, ..) = seeded();
        let repo = Repository::new(&db);

        let err = repo.create_user("alice", "new@example.com", "x", Role::User).unwrap_err();
        assert!(matches!(err, ApiError::Duplicate));
        let err = repo.create_user("alice2", "alice@example.com", "x", Role::User).unwrap_err();
        assert!(matches!(err, ApiError::Duplicate));

        assert!(db.get_user_by_username("alice2").unwrap().is_none());
    }

    #[test]
    fn stored_password_is_hashed() {
        let (db, ..) = seeded();
        let (_, hash) = Repository::new(&db).find_credentials("alice").unwrap().unwrap();
        assert!(password::verify_password("pw123", &hash));
        assert_ne!(hash, "pw123");
    }

    #[test]
    fn ad_delete_is_owner_or_admin() {
        let (db, alice, bob, carol) = seeded();
        let repo = Repository::new(&db);
        let bike = repo.create_ad(&alice, "Bike", AdKind::Sell, "A red bike").unwrap();
        assert_eq!(bike.id, 1);
        assert_eq!(bike.owner.username, "alice");

        let err = repo.delete_ad(&bob, bike.id).unwrap_err();
        assert!(matches!(err, ApiError::Authorization(_)));
        assert!(repo.get_ad(bike.id).is_ok());

        repo.delete_ad(&carol, bike.id).unwrap();
        assert!(matches!(repo.get_ad(bike.id), Err(ApiError::NotFound("Ad"))));
        assert!(matches!(repo.delete_ad(&carol, bike.id), Err(ApiError::NotFound("Ad"))));
    }

    #[test]
    fn comment_on_missing_ad_is_not_found() {
        let (db, alice, ..) = seeded();
        let repo = Repository::new(&db);
        let err = repo.create_comment(&alice, 404, "hello?").unwrap_err();
        assert!(matches!(err, ApiError::NotFound("Ad")));
        assert!(repo.list_comments().unwrap().is_empty());
    }

    #[test]
    fn comment_delete_is_author_or_admin() {
        let (db, alice, bob, carol) = seeded();
        let repo = Repository::new(&db);
        let ad = repo.create_ad(&alice, "Bike", AdKind::Sell, "A red bike").unwrap();
        let by_bob = repo.create_comment(&bob, ad.id, "still for sale?").unwrap();
        let by_bob_again = repo.create_comment(&bob, ad.id, "hello?").unwrap();

        assert!(matches!(repo.delete_comment(&alice, by_bob.id), Err(ApiError::Authorization(_))));
        repo.delete_comment(&bob, by_bob.id).unwrap();
        repo.delete_comment(&carol, by_bob_again.id).unwrap();
        assert!(repo.list_comments_for_ad(ad.id).unwrap().is_empty());
    }

    #[test]
    fn deleting_ad_drops_comments() {
        let (db, alice, bob, _) = seeded();
        let repo = Repository::new(&db);
        let ad = repo.create_ad(&alice, "Bike", AdKind::Sell, "A red bike").unwrap();
        repo.create_comment(&bob, ad.id, "still for sale?").unwrap();

        repo.delete_ad(&alice, ad.id).unwrap();
        assert!(repo.list_comments().unwrap().is_empty());
        assert!(matches!(repo.list_comments_for_ad(ad.id), Err(ApiError::NotFound("Ad"))));
    }

    #[test]
    fn promotion_rules() {
        let (db, alice, bob, carol) = seeded();
        let repo = Repository::new(&db);

        assert!(matches!(repo.promote_to_admin(&alice, bob.id), Err(ApiError::Authorization(_))));
        assert!(matches!(repo.promote_to_admin(&alice, 999), Err(ApiError::Authorization(_))));
        assert!(matches!(repo.promote_to_admin(&carol, 999), Err(ApiError::NotFound("User"))));

        let promoted = repo.promote_to_admin(&carol, bob.id).unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert_eq!(repo.get_user(bob.id).unwrap().role, Role::Admin);

        // Admins cannot be re-targeted, not even by another admin.
        assert!(matches!(repo.promote_to_admin(&carol, bob.id), Err(ApiError::Authorization(_))));
        assert!(matches!(repo.promote_to_admin(&promoted, carol.id), Err(ApiError::Authorization(_))));
    }
}
