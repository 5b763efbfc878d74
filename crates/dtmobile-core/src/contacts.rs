//! The "my contacts" read: fetch, enrich, package.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::{
    enrich::{EnrichedRecord, RecordEnricher},
    geo::GeoPoint,
    metadata::assigned_user_id,
    repository::{ContactFilter, ContactsRepository},
    users::UserDirectory,
    CoreError,
};

/// Response body of the contacts endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactsView {
    pub contacts: Vec<EnrichedRecord>,
    pub total: i64,
    pub deleted: i64,
    pub user_location: GeoPoint,
}

/// Load and enrich the contacts assigned to `user_id` that still need a
/// first contact attempt.
///
/// # Errors
///
/// Returns [`CoreError::MissingReferenceLocation`] when the user has no
/// geocoded location, or [`CoreError::Upstream`] with the repository's error
/// unchanged.
pub async fn load_contacts_view(
    repo: &dyn ContactsRepository,
    user_id: i64,
) -> Result<ContactsView, CoreError> {
    let user_location = repo
        .reference_location(user_id)
        .await?
        .ok_or(CoreError::MissingReferenceLocation { user_id })?;

    let result = repo
        .search_viewable_contacts(&ContactFilter::contact_attempt_needed(user_id))
        .await?;

    let assignee_ids: Vec<i64> = result
        .records
        .iter()
        .filter_map(|r| r.metadata.first("assigned_to").and_then(assigned_user_id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let users = if assignee_ids.is_empty() {
        UserDirectory::default()
    } else {
        UserDirectory::from_users(repo.lookup_users(&assignee_ids).await?)
    };

    let shared: HashSet<i64> = repo.shared_with_user(user_id).await?.into_iter().collect();

    let enricher = RecordEnricher {
        user_location,
        current_user_id: Some(user_id),
        shared_with_user: Some(&shared),
        users: &users,
    };
    let contacts = enricher.enrich(&result.records);

    tracing::debug!(
        user_id,
        contacts = contacts.len(),
        total = result.total,
        "enriched contacts"
    );

    Ok(ContactsView {
        contacts,
        total: result.total,
        deleted: result.deleted,
        user_location,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::{
        enrich::RawRecord,
        metadata::RawMetadata,
        relations::{DistancePair, LinkedLocation},
        repository::{SearchError, SearchResult},
        users::UserSummary,
    };

    #[derive(Default)]
    struct FakeRepo {
        location: Option<GeoPoint>,
        records: Vec<RawRecord>,
        users: Vec<UserSummary>,
        shared: Vec<i64>,
        search_error: Option<SearchError>,
        looked_up: Mutex<Vec<Vec<i64>>>,
    }

    #[async_trait]
    impl ContactsRepository for FakeRepo {
        async fn reference_location(&self, _: i64) -> Result<Option<GeoPoint>, SearchError> {
            Ok(self.location)
        }

        async fn search_viewable_contacts(
            &self,
            filter: &ContactFilter,
        ) -> Result<SearchResult, SearchError> {
            assert!(filter.assigned_to_me);
            if let Some(err) = &self.search_error {
                return Err(err.clone());
            }
            Ok(SearchResult {
                records: self.records.clone(),
                total: i64::try_from(self.records.len()).unwrap_or_default(),
                deleted: 1,
            })
        }

        async fn lookup_users(&self, ids: &[i64]) -> Result<Vec<UserSummary>, SearchError> {
            self.looked_up.lock().unwrap().push(ids.to_vec());
            Ok(self
                .users
                .iter()
                .filter(|u| ids.contains(&u.id))
                .cloned()
                .collect())
        }

        async fn shared_with_user(&self, _: i64) -> Result<Vec<i64>, SearchError> {
            Ok(self.shared.clone())
        }
    }

    fn contact(id: i64, assigned_to: &str) -> RawRecord {
        let mut metadata = RawMetadata::new();
        metadata.push("assigned_to", assigned_to);
        metadata.push("overall_status", "assigned");
        RawRecord {
            id,
            title: format!("Contact {id}"),
            permalink: format!("http://localhost/contacts/{id}"),
            is_team_contact: false,
            metadata,
            locations: vec![LinkedLocation {
                id: 100 + id,
                display_name: "Market Square".to_string(),
                raw_geometry: json!({
                    "results": [{ "geometry": { "location": { "lat": 40.0, "lng": -75.0 } } }]
                }),
            }],
            groups: Vec::new(),
        }
    }

    #[tokio::test]
    async fn missing_reference_location_fails_the_request() {
        let repo = FakeRepo {
            records: vec![contact(1, "user-5")],
            ..FakeRepo::default()
        };
        let err = load_contacts_view(&repo, 5).await.unwrap_err();
        assert!(matches!(err, CoreError::MissingReferenceLocation { user_id: 5 }));
    }

    #[tokio::test]
    async fn upstream_error_is_propagated_unchanged() {
        let repo = FakeRepo {
            location: Some(GeoPoint::new(40.0, -75.0)),
            search_error: Some(SearchError::new("database_error", "store unavailable")),
            ..FakeRepo::default()
        };
        let err = load_contacts_view(&repo, 5).await.unwrap_err();
        match err {
            CoreError::Upstream(e) => {
                assert_eq!(e.code, "database_error");
                assert_eq!(e.message, "store unavailable");
            }
            other @ CoreError::MissingReferenceLocation { .. } => {
                panic!("unexpected error: {other}")
            }
        }
    }

    #[tokio::test]
    async fn enriches_batch_with_shared_flags_and_single_user_lookup() {
        let repo = FakeRepo {
            location: Some(GeoPoint::new(40.0, -75.0)),
            records: vec![contact(1, "user-5"), contact(2, "user-8"), contact(3, "user-5")],
            users: vec![UserSummary {
                id: 5,
                display_name: "Sam".to_string(),
                user_login: "sam".to_string(),
            }],
            shared: vec![2],
            ..FakeRepo::default()
        };

        let view = load_contacts_view(&repo, 5).await.expect("view");

        assert_eq!(view.total, 3);
        assert_eq!(view.deleted, 1);
        assert_eq!(view.user_location, GeoPoint::new(40.0, -75.0));
        assert_eq!(*repo.looked_up.lock().unwrap(), vec![vec![5, 8]]);

        let ids: Vec<i64> = view.contacts.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(view.contacts[0].shared_with_user, Some(false));
        assert_eq!(view.contacts[1].shared_with_user, Some(true));
        assert!(view.contacts[0].requires_update);
        assert!(!view.contacts[1].requires_update);
        assert_eq!(
            view.contacts[1].assigned_to.as_ref().map(|a| a.display_name.as_str()),
            Some("Nobody")
        );
        assert_eq!(view.contacts[0].distances, vec![DistancePair::from_miles(0.0)]);
    }
}
