use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::error::StoreError;
use crate::users::repo_types::{PublicUser, User, UserPatch};

fn map_write_err(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::ConstraintViolation(db_err.message().to_string())
        }
        _ => StoreError::Backend(e),
    }
}

/// All users in insertion order.
pub async fn list(db: &SqlitePool) -> Result<Vec<PublicUser>, StoreError> {
    let rows = sqlx::query_as::<_, PublicUser>(
        r#"
        SELECT id, name, email, created_at
        FROM users
        ORDER BY id ASC
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get_by_id(db: &SqlitePool, id: i64) -> Result<Option<PublicUser>, StoreError> {
    let user = sqlx::query_as::<_, PublicUser>(
        r#"
        SELECT id, name, email, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Full row including the password hash. Login path only.
pub async fn get_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, StoreError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password_hash, created_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Case-insensitive (ASCII) substring match on `name`. Wildcard characters in
/// `fragment` are matched literally.
pub async fn find_by_name_substring(
    db: &SqlitePool,
    fragment: &str,
) -> Result<Vec<PublicUser>, StoreError> {
    let rows = sqlx::query_as::<_, PublicUser>(
        r#"
        SELECT id, name, email, created_at
        FROM users
        WHERE instr(lower(name), lower(?)) > 0
        ORDER BY id ASC
        "#,
    )
    .bind(fragment)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn exists_by_email(
    db: &SqlitePool,
    email: &str,
    exclude_id: Option<i64>,
) -> Result<bool, StoreError> {
    let hits = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM users
        WHERE email = ? AND (? IS NULL OR id <> ?)
        "#,
    )
    .bind(email)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_one(db)
    .await?;
    Ok(hits > 0)
}

/// Returns the new id. A duplicate email surfaces as `ConstraintViolation`.
pub async fn insert(
    db: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
    created_at: OffsetDateTime,
) -> Result<i64, StoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(created_at)
    .execute(db)
    .await
    .map_err(map_write_err)?;
    Ok(result.last_insert_rowid())
}

/// Applies the supplied fields in one statement. Unknown ids affect 0 rows.
pub async fn update_fields(db: &SqlitePool, id: i64, patch: &UserPatch) -> Result<u64, StoreError> {
    if patch.is_empty() {
        return Err(StoreError::InvalidArgument("No fields to update".into()));
    }
    let result = sqlx::query(
        r#"
        UPDATE users
        SET name  = COALESCE(?, name),
            email = COALESCE(?, email)
        WHERE id = ?
        "#,
    )
    .bind(patch.name.as_deref())
    .bind(patch.email.as_deref())
    .bind(id)
    .execute(db)
    .await
    .map_err(map_write_err)?;
    Ok(result.rows_affected())
}

pub async fn delete(db: &SqlitePool, id: i64) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}
