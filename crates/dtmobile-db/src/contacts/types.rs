//! Row types for the `contacts` table and its connection tables.

use chrono::{DateTime, Utc};

/// A row from the `contacts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContactRow {
    pub id: i64,
    pub title: String,
    pub is_team_contact: bool,
    pub updated_at: DateTime<Utc>,
}

/// One metadata value. Keys with several values span several rows.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContactMetaRow {
    pub contact_id: i64,
    pub meta_key: String,
    pub meta_value: String,
}

/// A location connected to a contact, with its raw geocoder payload.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContactLocationRow {
    pub contact_id: i64,
    pub location_id: i64,
    pub title: String,
    pub raw: serde_json::Value,
}

/// A group connected to a contact.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContactGroupRow {
    pub contact_id: i64,
    pub group_id: i64,
    pub title: String,
}
