//! Collaborator interface backing the contacts endpoint.
//!
//! The enrichment core never performs I/O; everything it needs is fetched
//! through [`ContactsRepository`] first.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::{enrich::RawRecord, geo::GeoPoint, users::UserSummary};

/// Error object reported by the record store, passed to callers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{code}: {message}")]
pub struct SearchError {
    pub code: String,
    pub message: String,
}

impl SearchError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Which viewable contacts to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactFilter {
    pub user_id: i64,
    /// Only contacts assigned to `user_id`.
    pub assigned_to_me: bool,
    /// Accepted seeker paths; empty accepts any. A contact without a
    /// seeker path counts as `none`.
    pub seeker_paths: Vec<String>,
}

impl ContactFilter {
    /// Contacts assigned to the user that still need a first contact attempt.
    #[must_use]
    pub fn contact_attempt_needed(user_id: i64) -> Self {
        Self {
            user_id,
            assigned_to_me: true,
            seeker_paths: vec![crate::metadata::SEEKER_PATH_NONE.to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub records: Vec<RawRecord>,
    pub total: i64,
    pub deleted: i64,
}

#[async_trait]
pub trait ContactsRepository: Send + Sync {
    /// The user's reference point: the first connected location that
    /// geocodes to a point. `None` when the user has none.
    async fn reference_location(&self, user_id: i64) -> Result<Option<GeoPoint>, SearchError>;

    /// Viewable contacts matching `filter`, each with its linked locations
    /// and groups in connection order.
    async fn search_viewable_contacts(
        &self,
        filter: &ContactFilter,
    ) -> Result<SearchResult, SearchError>;

    /// Batch user lookup; unknown ids are simply absent from the result.
    async fn lookup_users(&self, ids: &[i64]) -> Result<Vec<UserSummary>, SearchError>;

    /// Ids of contacts shared with `user_id`.
    async fn shared_with_user(&self, user_id: i64) -> Result<Vec<i64>, SearchError>;
}
