//! Database reads for `users` and `contact_shares`.

use dtmobile_core::UserSummary;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub user_login: String,
    pub display_name: String,
}

impl From<UserRow> for UserSummary {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name,
            user_login: row.user_login,
        }
    }
}

/// Users with the given ids; unknown ids are skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_users_by_id(pool: &PgPool, ids: &[i64]) -> Result<Vec<UserRow>, DbError> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, user_login, display_name FROM users WHERE id = ANY($1) ORDER BY id",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Ids of non-deleted contacts shared with `user_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_contacts_shared_with_user(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT s.contact_id \
         FROM contact_shares s \
         JOIN contacts c ON c.id = s.contact_id \
         WHERE s.user_id = $1 AND c.deleted_at IS NULL \
         ORDER BY s.contact_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}
