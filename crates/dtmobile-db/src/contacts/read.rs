//! Read operations for contacts.
//!
//! A contact is viewable by a user when it is assigned to them
//! (`assigned_to = 'user-<id>'`) or shared with them.

use dtmobile_core::ContactFilter;
use sqlx::PgPool;

use super::types::{ContactGroupRow, ContactLocationRow, ContactMetaRow, ContactRow};
use crate::DbError;

// $1 user id, $2 'user-<id>', $3 assigned-to-me flag, $4 accepted seeker paths
const VIEWABLE_FILTER: &str = "\
    (EXISTS (SELECT 1 FROM contact_meta m \
             WHERE m.contact_id = c.id AND m.meta_key = 'assigned_to' AND m.meta_value = $2) \
     OR EXISTS (SELECT 1 FROM contact_shares s \
                WHERE s.contact_id = c.id AND s.user_id = $1)) \
    AND (NOT $3 OR EXISTS (SELECT 1 FROM contact_meta m \
                           WHERE m.contact_id = c.id AND m.meta_key = 'assigned_to' \
                             AND m.meta_value = $2)) \
    AND (cardinality($4::text[]) = 0 OR COALESCE(NULLIF(( \
            SELECT m.meta_value FROM contact_meta m \
            WHERE m.contact_id = c.id AND m.meta_key = 'seeker_path' \
            ORDER BY m.id LIMIT 1), ''), 'none') = ANY($4::text[]))";

fn assignee_key(user_id: i64) -> String {
    format!("user-{user_id}")
}

/// Non-deleted contacts matching `filter`, most recently updated first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_viewable_contacts(
    pool: &PgPool,
    filter: &ContactFilter,
) -> Result<Vec<ContactRow>, DbError> {
    let sql = format!(
        "SELECT c.id, c.title, c.is_team_contact, c.updated_at \
         FROM contacts c \
         WHERE c.deleted_at IS NULL AND {VIEWABLE_FILTER} \
         ORDER BY c.updated_at DESC, c.id DESC"
    );
    let rows = sqlx::query_as::<_, ContactRow>(&sql)
        .bind(filter.user_id)
        .bind(assignee_key(filter.user_id))
        .bind(filter.assigned_to_me)
        .bind(&filter.seeker_paths)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Number of soft-deleted contacts that would otherwise match `filter`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_deleted_contacts(pool: &PgPool, filter: &ContactFilter) -> Result<i64, DbError> {
    let sql = format!(
        "SELECT COUNT(*) FROM contacts c \
         WHERE c.deleted_at IS NOT NULL AND {VIEWABLE_FILTER}"
    );
    let count = sqlx::query_scalar::<_, i64>(&sql)
        .bind(filter.user_id)
        .bind(assignee_key(filter.user_id))
        .bind(filter.assigned_to_me)
        .bind(&filter.seeker_paths)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// All metadata rows for the given contacts, in storage order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_contact_meta(
    pool: &PgPool,
    contact_ids: &[i64],
) -> Result<Vec<ContactMetaRow>, DbError> {
    let rows = sqlx::query_as::<_, ContactMetaRow>(
        "SELECT contact_id, meta_key, meta_value \
         FROM contact_meta \
         WHERE contact_id = ANY($1) \
         ORDER BY contact_id, id",
    )
    .bind(contact_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Locations connected to the given contacts, in connection order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_contact_locations(
    pool: &PgPool,
    contact_ids: &[i64],
) -> Result<Vec<ContactLocationRow>, DbError> {
    let rows = sqlx::query_as::<_, ContactLocationRow>(
        "SELECT cl.contact_id, l.id AS location_id, l.title, l.raw \
         FROM contact_locations cl \
         JOIN locations l ON l.id = cl.location_id \
         WHERE cl.contact_id = ANY($1) \
         ORDER BY cl.contact_id, cl.position, l.id",
    )
    .bind(contact_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Groups connected to the given contacts, in connection order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_contact_groups(
    pool: &PgPool,
    contact_ids: &[i64],
) -> Result<Vec<ContactGroupRow>, DbError> {
    let rows = sqlx::query_as::<_, ContactGroupRow>(
        "SELECT cg.contact_id, g.id AS group_id, g.title \
         FROM contact_groups cg \
         JOIN groups g ON g.id = cg.group_id \
         WHERE cg.contact_id = ANY($1) \
         ORDER BY cg.contact_id, cg.position, g.id",
    )
    .bind(contact_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
