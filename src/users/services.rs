use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::error::UserError;
use crate::users::{
    dto::{NewUser, SearchResult},
    password::{check_credentials, hash_password},
    repo,
    repo_types::{PublicUser, UserPatch},
};

const MIN_SEARCH_LEN: usize = 2;

fn not_found(id: i64) -> UserError {
    UserError::NotFound(format!("No user found with ID {}", id))
}

pub async fn list_users(db: &SqlitePool) -> Result<Vec<PublicUser>, UserError> {
    Ok(repo::list(db).await?)
}

pub async fn get_user(db: &SqlitePool, id: i64) -> Result<PublicUser, UserError> {
    repo::get_by_id(db, id).await?.ok_or_else(|| not_found(id))
}

/// The existence check gives a fast rejection; the unique index still
/// decides when two creates race.
#[instrument(skip(db, new_user), fields(email = %new_user.email))]
pub async fn create_user(db: &SqlitePool, new_user: NewUser) -> Result<PublicUser, UserError> {
    if repo::exists_by_email(db, &new_user.email, None).await? {
        warn!("email already registered");
        return Err(UserError::DuplicateEmail);
    }

    let hash = hash_password(&new_user.password)?;
    let created_at = OffsetDateTime::now_utc();
    let id = repo::insert(db, &new_user.name, &new_user.email, &hash, created_at).await?;

    info!(user_id = id, "user created");
    Ok(PublicUser {
        id,
        name: new_user.name,
        email: new_user.email,
        created_at,
    })
}

#[instrument(skip(db, patch))]
pub async fn update_user(db: &SqlitePool, id: i64, patch: UserPatch) -> Result<(), UserError> {
    if patch.is_empty() {
        return Err(UserError::InvalidArgument(
            "At least one field (name or email) must be provided".into(),
        ));
    }
    if repo::get_by_id(db, id).await?.is_none() {
        return Err(not_found(id));
    }
    if let Some(email) = patch.email.as_deref() {
        if repo::exists_by_email(db, email, Some(id)).await? {
            warn!(%email, "email already used by another user");
            return Err(UserError::DuplicateEmail);
        }
    }

    // Row may have been deleted between the lookup and the write.
    if repo::update_fields(db, id, &patch).await? == 0 {
        return Err(not_found(id));
    }
    info!(user_id = id, "user updated");
    Ok(())
}

#[instrument(skip(db))]
pub async fn delete_user(db: &SqlitePool, id: i64) -> Result<(), UserError> {
    if repo::delete(db, id).await? == 0 {
        return Err(not_found(id));
    }
    info!(user_id = id, "user deleted");
    Ok(())
}

#[instrument(skip(db))]
pub async fn search_users(db: &SqlitePool, fragment: &str) -> Result<SearchResult, UserError> {
    let term = fragment.trim();
    if term.is_empty() {
        return Err(UserError::InvalidArgument(
            "Please provide a name parameter to search".into(),
        ));
    }
    if term.chars().count() < MIN_SEARCH_LEN {
        return Err(UserError::InvalidArgument(
            "Search term must be at least 2 characters long".into(),
        ));
    }

    let users = repo::find_by_name_substring(db, term).await?;
    Ok(SearchResult {
        count: users.len(),
        users,
        term: term.to_string(),
    })
}

/// Unknown email and wrong password yield the same `AuthFailed`.
#[instrument(skip(db, password))]
pub async fn authenticate(
    db: &SqlitePool,
    email: &str,
    password: &str,
) -> Result<PublicUser, UserError> {
    let Some(user) = repo::get_by_email(db, email).await? else {
        warn!("login unknown email");
        return Err(UserError::AuthFailed);
    };

    let user_id = user.id;
    match check_credentials(user, password) {
        Ok(public) => {
            info!(user_id, "user logged in");
            Ok(public)
        }
        Err(e) => {
            if matches!(e, UserError::AuthFailed) {
                warn!(user_id, "login invalid password");
            }
            Err(e)
        }
    }
}
