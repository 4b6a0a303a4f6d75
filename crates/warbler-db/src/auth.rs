use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::{debug, warn};
use warbler_types::User;

use crate::error::{DbError, Result};
use crate::models::NewUser;
use crate::uow::UnitOfWork;

/// Hash a password with Argon2id and a fresh random salt, in PHC format.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::PasswordHash(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// False on mismatch and on a stored value that is not a PHC hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password is not a valid hash: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Validate and hash a new user's credentials.
///
/// Nothing is stored: hand the result to `UnitOfWork::add_user`. A missing
/// password is rejected here; a missing or taken username or email only
/// fails once the row is inserted.
pub fn signup(
    username: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
    image_url: Option<&str>,
) -> Result<NewUser> {
    let password = match password {
        Some(p) if !p.is_empty() => p,
        _ => {
            return Err(DbError::InvalidArgument(
                "password must be a non-empty string".into(),
            ));
        }
    };

    let password_hash = hash_password(password)?;
    Ok(NewUser::new(username, email, password_hash, image_url))
}

/// Look the user up by name and check the password. `Ok(None)` for an
/// unknown username or a wrong password.
pub fn authenticate(uow: &UnitOfWork<'_>, username: &str, password: &str) -> Result<Option<User>> {
    let Some(user) = uow.get_user_by_username(username)? else {
        debug!("Authentication failed: no user named {}", username);
        return Ok(None);
    };

    if verify_password(password, &user.password) {
        Ok(Some(user))
    } else {
        debug!("Authentication failed: wrong password for {}", username);
        Ok(None)
    }
}
