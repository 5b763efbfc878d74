//! Contact enrichment: relations + reconciled metadata + derived flags.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::{
    geo::GeoPoint,
    metadata::{reconcile_fields, Assignee, RawMetadata},
    relations::{resolve_relations, DistancePair, Geometry, LinkedGroup, LinkedLocation},
    users::UserLookup,
};

pub const OVERALL_STATUS_KEY: &str = "overall_status";
pub const STATUS_ASSIGNED: &str = "assigned";

/// A contact as returned by the search collaborator, with its linked
/// locations and groups already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub id: i64,
    pub title: String,
    pub permalink: String,
    pub is_team_contact: bool,
    pub metadata: RawMetadata,
    pub locations: Vec<LinkedLocation>,
    pub groups: Vec<LinkedGroup>,
}

/// UI-ready projection of one contact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "post_title")]
    pub title: String,
    pub is_team_contact: bool,
    pub permalink: String,
    pub overall_status: String,
    pub locations: Vec<String>,
    pub locations_geometry: Vec<Geometry>,
    #[serde(rename = "distance")]
    pub distances: Vec<DistancePair>,
    pub groups: Vec<LinkedGroup>,
    pub phone_numbers: Vec<String>,
    #[serde(flatten)]
    pub milestone_flags: BTreeMap<String, bool>,
    pub seeker_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Assignee>,
    pub requires_update: bool,
    pub last_modified: i64,
    /// `None` when no authenticated user was available to compute it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_with_user: Option<bool>,
}

/// Per-request inputs shared by every record in a batch. All read-only.
pub struct RecordEnricher<'a> {
    pub user_location: GeoPoint,
    /// The authenticated user, if any.
    pub current_user_id: Option<i64>,
    /// Contacts shared with the current user; `None` skips the flag.
    pub shared_with_user: Option<&'a HashSet<i64>>,
    pub users: &'a dyn UserLookup,
}

impl RecordEnricher<'_> {
    /// Enrich a batch, preserving input order.
    #[must_use]
    pub fn enrich(&self, records: &[RawRecord]) -> Vec<EnrichedRecord> {
        records.iter().map(|r| self.enrich_record(r)).collect()
    }

    #[must_use]
    pub fn enrich_record(&self, record: &RawRecord) -> EnrichedRecord {
        let relations = resolve_relations(&record.locations, &record.groups, self.user_location);
        let fields = reconcile_fields(&record.metadata, self.users);

        let overall_status = record
            .metadata
            .first(OVERALL_STATUS_KEY)
            .unwrap_or_default()
            .to_string();

        let requires_update = fields.requires_update
            || assigned_to_current_user(
                &overall_status,
                fields.assigned_to.as_ref(),
                self.current_user_id,
            );

        EnrichedRecord {
            id: record.id,
            title: record.title.clone(),
            is_team_contact: record.is_team_contact,
            permalink: record.permalink.clone(),
            overall_status,
            locations: relations.locations,
            locations_geometry: relations.locations_geometry,
            distances: relations.distances,
            groups: relations.groups,
            phone_numbers: fields.phone_numbers,
            milestone_flags: fields.milestones,
            seeker_path: fields.seeker_path,
            assigned_to: fields.assigned_to,
            requires_update,
            last_modified: fields.last_modified,
            shared_with_user: self.shared_with_user.map(|ids| ids.contains(&record.id)),
        }
    }
}

/// An `assigned` contact whose assignee is the requesting user always needs
/// an update from them.
fn assigned_to_current_user(
    overall_status: &str,
    assignee: Option<&Assignee>,
    current_user_id: Option<i64>,
) -> bool {
    match (assignee, current_user_id) {
        (Some(assignee), Some(user_id)) => {
            overall_status == STATUS_ASSIGNED && assignee.id == user_id
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::users::{UserDirectory, UserSummary};

    fn record(id: i64, metadata: RawMetadata) -> RawRecord {
        RawRecord {
            id,
            title: format!("Contact {id}"),
            permalink: format!("https://dt.example/contacts/{id}"),
            is_team_contact: false,
            metadata,
            locations: Vec::new(),
            groups: Vec::new(),
        }
    }

    fn meta(pairs: &[(&str, &str)]) -> RawMetadata {
        let mut m = RawMetadata::new();
        for (k, v) in pairs {
            m.push(*k, *v);
        }
        m
    }

    fn enricher<'a>(
        users: &'a UserDirectory,
        shared: Option<&'a HashSet<i64>>,
        current_user_id: Option<i64>,
    ) -> RecordEnricher<'a> {
        RecordEnricher {
            user_location: GeoPoint::new(40.0, -75.0),
            current_user_id,
            shared_with_user: shared,
            users,
        }
    }

    #[test]
    fn assigned_to_requester_forces_requires_update() {
        let users = UserDirectory::from_users(vec![UserSummary {
            id: 5,
            display_name: "Sam".to_string(),
            user_login: "sam".to_string(),
        }]);
        let raw = record(
            1,
            meta(&[
                ("overall_status", "assigned"),
                ("assigned_to", "user-5"),
                ("requires_update", "no"),
            ]),
        );
        let out = enricher(&users, None, Some(5)).enrich_record(&raw);
        assert!(out.requires_update);
        assert_eq!(out.overall_status, "assigned");
    }

    #[test]
    fn requires_update_order_of_keys_does_not_matter() {
        let users = UserDirectory::default();
        let raw = record(
            1,
            meta(&[
                ("requires_update", "no"),
                ("assigned_to", "user-5"),
                ("overall_status", "assigned"),
            ]),
        );
        assert!(enricher(&users, None, Some(5)).enrich_record(&raw).requires_update);
    }

    #[test]
    fn other_assignee_or_status_keeps_raw_requires_update() {
        let users = UserDirectory::default();
        let other_user = record(
            1,
            meta(&[("overall_status", "assigned"), ("assigned_to", "user-6")]),
        );
        assert!(!enricher(&users, None, Some(5)).enrich_record(&other_user).requires_update);

        let active = record(
            2,
            meta(&[("overall_status", "active"), ("assigned_to", "user-5")]),
        );
        assert!(!enricher(&users, None, Some(5)).enrich_record(&active).requires_update);

        let anonymous = record(
            3,
            meta(&[("overall_status", "assigned"), ("assigned_to", "user-5")]),
        );
        assert!(!enricher(&users, None, None).enrich_record(&anonymous).requires_update);

        let flagged = record(4, meta(&[("requires_update", "yes")]));
        assert!(enricher(&users, None, Some(5)).enrich_record(&flagged).requires_update);
    }

    #[test]
    fn shared_with_user_reflects_set_membership() {
        let users = UserDirectory::default();
        let shared: HashSet<i64> = [2].into_iter().collect();
        let out = enricher(&users, Some(&shared), Some(5))
            .enrich(&[record(1, RawMetadata::new()), record(2, RawMetadata::new())]);
        assert_eq!(out[0].shared_with_user, Some(false));
        assert_eq!(out[1].shared_with_user, Some(true));
    }

    #[test]
    fn shared_with_user_skipped_without_authenticated_user() {
        let users = UserDirectory::default();
        let out = enricher(&users, None, None).enrich(&[record(1, RawMetadata::new())]);
        assert_eq!(out[0].shared_with_user, None);
        let json = serde_json::to_value(&out[0]).expect("serialize");
        assert!(json.get("shared_with_user").is_none());
    }

    #[test]
    fn output_order_matches_input_order() {
        let users = UserDirectory::default();
        let input: Vec<RawRecord> = [9, 3, 7, 1]
            .into_iter()
            .map(|id| record(id, RawMetadata::new()))
            .collect();
        let ids: Vec<i64> = enricher(&users, None, Some(1))
            .enrich(&input)
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![9, 3, 7, 1]);
    }

    #[test]
    fn two_locations_one_unmapped() {
        let users = UserDirectory::default();
        let mut raw = record(1, RawMetadata::new());
        raw.locations = vec![
            LinkedLocation {
                id: 10,
                display_name: "Downtown".to_string(),
                raw_geometry: json!({
                    "results": [{ "geometry": { "location": { "lat": 40.0, "lng": -75.0 } } }]
                }),
            },
            LinkedLocation {
                id: 11,
                display_name: "Unknown".to_string(),
                raw_geometry: json!({}),
            },
        ];
        let out = enricher(&users, None, Some(1)).enrich_record(&raw);
        assert_eq!(out.distances.len(), 2);
        assert_eq!(out.distances[0].miles, Some(0.0));
        assert_eq!(out.distances[0].kilometers, Some(0.0));
        assert_eq!(out.distances[1], DistancePair::UNKNOWN);
        assert_eq!(out.locations.len(), out.locations_geometry.len());
    }

    #[test]
    fn serializes_with_mobile_client_field_names() {
        let users = UserDirectory::default();
        let raw = record(
            12,
            meta(&[
                ("milestone_prayer", "yes"),
                ("assigned_to", "user-42"),
                ("last_modified", "1700000000"),
            ]),
        );
        let out = enricher(&users, None, Some(1)).enrich_record(&raw);
        let json = serde_json::to_value(&out).expect("serialize");
        assert_eq!(json["ID"], json!(12));
        assert_eq!(json["post_title"], json!("Contact 12"));
        assert_eq!(json["milestone_prayer"], json!(true));
        assert_eq!(json["seeker_path"], json!("none"));
        assert_eq!(json["last_modified"], json!(1_700_000_000_i64));
        assert_eq!(
            json["assigned_to"],
            json!({ "id": 42, "type": "user", "name": "Nobody", "user_login": "nobody" })
        );
        assert_eq!(json["overall_status"], json!(""));
        assert!(json["distance"].as_array().is_some_and(Vec::is_empty));
    }
}
