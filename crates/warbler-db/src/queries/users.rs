use rusqlite::{OptionalExtension, params};
use tracing::debug;
use warbler_types::User;
use warbler_types::models::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL};

use crate::error::Result;
use crate::models::{NewUser, ProfileUpdate, USER_COLUMNS, user_from_row};
use crate::uow::UnitOfWork;

impl UnitOfWork<'_> {
    /// Insert a pending user. A missing or duplicate username or email
    /// fails here with `DbError::Integrity`.
    pub fn add_user(&self, new_user: &NewUser) -> Result<User> {
        self.conn().execute(
            "INSERT INTO users
                 (id, username, email, password, image_url, header_image_url, bio, location)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new_user.id,
                new_user.username,
                new_user.email,
                new_user.password_hash,
                new_user.image_url,
                new_user.header_image_url,
                new_user.bio,
                new_user.location,
            ],
        )?;

        let id = self.conn().last_insert_rowid();
        debug!("Staged user {}", id);
        self.fetch_user(id)
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
                [id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = ?1"),
                [username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.id"))?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Case-insensitive substring match on username.
    pub fn search_users(&self, fragment: &str) -> Result<Vec<User>> {
        let pattern = format!("%{}%", escape_like(fragment));
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users u
             WHERE u.username LIKE ?1 ESCAPE '\\'
             ORDER BY u.username"
        ))?;
        let users = stmt
            .query_map([pattern], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Returns `None` when no user has this id.
    pub fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<Option<User>> {
        let Some(current) = self.get_user(id)? else {
            return Ok(None);
        };

        let username = update.username.as_deref().unwrap_or(&current.username);
        let email = update.email.as_deref().unwrap_or(&current.email);
        let image_url = image_or_default(
            update.image_url.as_deref(),
            &current.image_url,
            DEFAULT_IMAGE_URL,
        );
        let header_image_url = image_or_default(
            update.header_image_url.as_deref(),
            &current.header_image_url,
            DEFAULT_HEADER_IMAGE_URL,
        );
        let bio = optional_text(update.bio.as_deref(), current.bio.as_deref());
        let location = optional_text(update.location.as_deref(), current.location.as_deref());

        self.conn().execute(
            "UPDATE users
             SET username = ?2, email = ?3, image_url = ?4, header_image_url = ?5,
                 bio = ?6, location = ?7
             WHERE id = ?1",
            params![id, username, email, image_url, header_image_url, bio, location],
        )?;

        debug!("Staged profile update for user {}", id);
        self.fetch_user(id).map(Some)
    }

    /// Deletes the user along with their messages, follows and likes.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let removed = self.conn().execute("DELETE FROM users WHERE id = ?1", [id])?;
        debug!("Staged delete of user {} ({} row)", id, removed);
        Ok(removed > 0)
    }

    /// Bulk delete of every user, cascading to all other tables.
    pub fn delete_all_users(&self) -> Result<usize> {
        let removed = self.conn().execute("DELETE FROM users", [])?;
        debug!("Staged delete of all {} users", removed);
        Ok(removed)
    }

    fn fetch_user(&self, id: i64) -> Result<User> {
        let user = self.conn().query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
            [id],
            user_from_row,
        )?;
        Ok(user)
    }
}

fn image_or_default<'a>(update: Option<&'a str>, current: &'a str, default: &'a str) -> &'a str {
    match update {
        Some("") => default,
        Some(url) => url,
        None => current,
    }
}

fn optional_text<'a>(update: Option<&'a str>, current: Option<&'a str>) -> Option<&'a str> {
    match update {
        Some("") => None,
        Some(text) => Some(text),
        None => current,
    }
}

fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewMessage;
    use crate::queries::test_util::{FAKE_HASH, insert_user, seeded_db};

    #[test]
    fn add_user_assigns_id_when_unset() {
        let db = seeded_db();
        let uow = db.begin().unwrap();
        let user = uow
            .add_user(&NewUser::new(Some("auto"), Some("auto@test.com"), FAKE_HASH.into(), None))
            .unwrap();
        assert!(user.id > 222);
        assert_eq!(user.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(user.bio, None);
    }

    #[test]
    fn duplicate_username_and_email_are_integrity_errors() {
        let db = seeded_db();
        let uow = db.begin().unwrap();

        let same_name =
            NewUser::new(Some("testu1"), Some("fresh@test.com"), FAKE_HASH.into(), None);
        assert!(uow.add_user(&same_name).unwrap_err().is_integrity());

        let same_email =
            NewUser::new(Some("fresh"), Some("testu1@test.com"), FAKE_HASH.into(), None);
        assert!(uow.add_user(&same_email).unwrap_err().is_integrity());
    }

    #[test]
    fn lookups_by_id_and_username() {
        let db = seeded_db();
        let uow = db.begin().unwrap();

        assert_eq!(uow.get_user(111).unwrap().unwrap().username, "testu1");
        assert_eq!(uow.get_user_by_username("testu2").unwrap().unwrap().id, 222);
        assert!(uow.get_user(999).unwrap().is_none());
        assert!(uow.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn search_is_case_insensitive_and_literal() {
        let db = seeded_db();
        let uow = db.begin().unwrap();
        insert_user(&uow, 333, "Other_User").unwrap();

        let names: Vec<String> = uow
            .search_users("TESTU")
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["testu1", "testu2"]);

        // Underscore matches itself only
        let hits = uow.search_users("r_u").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 333);
        assert!(uow.search_users("%").unwrap().is_empty());
    }

    #[test]
    fn update_profile_merges_fields() {
        let db = seeded_db();
        let uow = db.begin().unwrap();

        let updated = uow
            .update_profile(
                111,
                &ProfileUpdate {
                    bio: Some("Warbling since 2026".into()),
                    image_url: Some("/img/me.png".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.username, "testu1");
        assert_eq!(updated.bio.as_deref(), Some("Warbling since 2026"));
        assert_eq!(updated.image_url, "/img/me.png");

        let cleared = uow
            .update_profile(
                111,
                &ProfileUpdate {
                    bio: Some(String::new()),
                    image_url: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(cleared.bio, None);
        assert_eq!(cleared.image_url, DEFAULT_IMAGE_URL);
    }

    #[test]
    fn update_profile_unknown_user_and_conflicts() {
        let db = seeded_db();
        let uow = db.begin().unwrap();

        assert!(uow.update_profile(999, &ProfileUpdate::default()).unwrap().is_none());

        let taken = ProfileUpdate {
            username: Some("testu2".into()),
            ..Default::default()
        };
        assert!(uow.update_profile(111, &taken).unwrap_err().is_integrity());
    }

    #[test]
    fn delete_user_cascades() {
        let db = seeded_db();
        let uow = db.begin().unwrap();
        let msg = uow.add_message(222, &NewMessage::new("Warble")).unwrap();
        uow.add_message(111, &NewMessage::new("Hello")).unwrap();
        uow.add_follow(111, 222).unwrap();
        uow.add_follow(222, 111).unwrap();
        uow.add_like(111, msg.id).unwrap();

        assert!(uow.delete_user(111).unwrap());
        assert!(!uow.delete_user(111).unwrap());

        assert_eq!(uow.count_messages(111).unwrap(), 0);
        assert!(uow.followers(222).unwrap().is_empty());
        assert!(uow.following(222).unwrap().is_empty());
        assert!(uow.all_likes().unwrap().is_empty());
        assert_eq!(uow.count_messages(222).unwrap(), 1);
    }

    #[test]
    fn delete_all_users_clears_everything() {
        let db = seeded_db();
        let uow = db.begin().unwrap();
        uow.add_message(111, &NewMessage::new("Hello")).unwrap();

        assert_eq!(uow.delete_all_users().unwrap(), 2);
        assert!(uow.list_users().unwrap().is_empty());
        assert!(uow.get_message(1).unwrap().is_none());
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("a%b_c\\d"), "a\\%b\\_c\\\\d");
    }
}
