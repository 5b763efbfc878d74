//! Postgres-backed [`ContactsRepository`].

use std::collections::HashMap;

use async_trait::async_trait;
use dtmobile_core::{
    ContactFilter, ContactsRepository, GeoPoint, LinkedGroup, LinkedLocation, RawMetadata,
    RawRecord, SearchError, SearchResult, UserSummary,
};
use sqlx::PgPool;

use crate::contacts::{
    count_deleted_contacts, list_contact_groups, list_contact_locations, list_contact_meta,
    list_viewable_contacts, ContactGroupRow, ContactLocationRow, ContactMetaRow, ContactRow,
};

#[derive(Debug, Clone)]
pub struct PgContactsRepository {
    pool: PgPool,
    site_url: String,
}

impl PgContactsRepository {
    /// `site_url` is the base permalinks are built from, without a trailing slash.
    #[must_use]
    pub fn new(pool: PgPool, site_url: impl Into<String>) -> Self {
        Self {
            pool,
            site_url: site_url.into(),
        }
    }

    fn permalink(&self, kind: &str, id: i64) -> String {
        format!("{}/{kind}/{id}/", self.site_url)
    }
}

#[async_trait]
impl ContactsRepository for PgContactsRepository {
    async fn reference_location(&self, user_id: i64) -> Result<Option<GeoPoint>, SearchError> {
        Ok(crate::resolve_reference_location(&self.pool, user_id).await?)
    }

    async fn search_viewable_contacts(
        &self,
        filter: &ContactFilter,
    ) -> Result<SearchResult, SearchError> {
        let (contacts, deleted) = futures::try_join!(
            list_viewable_contacts(&self.pool, filter),
            count_deleted_contacts(&self.pool, filter),
        )?;

        let ids: Vec<i64> = contacts.iter().map(|c| c.id).collect();
        let (meta, locations, groups) = if ids.is_empty() {
            (Vec::new(), Vec::new(), Vec::new())
        } else {
            futures::try_join!(
                list_contact_meta(&self.pool, &ids),
                list_contact_locations(&self.pool, &ids),
                list_contact_groups(&self.pool, &ids),
            )?
        };

        let records = assemble_records(contacts, meta, locations, groups, |kind, id| {
            self.permalink(kind, id)
        });
        let total = i64::try_from(records.len()).unwrap_or(i64::MAX);

        Ok(SearchResult {
            records,
            total,
            deleted,
        })
    }

    async fn lookup_users(&self, ids: &[i64]) -> Result<Vec<UserSummary>, SearchError> {
        let rows = crate::list_users_by_id(&self.pool, ids).await?;
        Ok(rows.into_iter().map(UserSummary::from).collect())
    }

    async fn shared_with_user(&self, user_id: i64) -> Result<Vec<i64>, SearchError> {
        Ok(crate::list_contacts_shared_with_user(&self.pool, user_id).await?)
    }
}

/// Stitch per-contact metadata and connections onto their contacts,
/// keeping contact order and the row order within each contact.
fn assemble_records(
    contacts: Vec<ContactRow>,
    meta: Vec<ContactMetaRow>,
    locations: Vec<ContactLocationRow>,
    groups: Vec<ContactGroupRow>,
    permalink: impl Fn(&str, i64) -> String,
) -> Vec<RawRecord> {
    let mut meta_by_contact: HashMap<i64, RawMetadata> = HashMap::new();
    for row in meta {
        meta_by_contact
            .entry(row.contact_id)
            .or_default()
            .push(row.meta_key, row.meta_value);
    }

    let mut locations_by_contact: HashMap<i64, Vec<LinkedLocation>> = HashMap::new();
    for row in locations {
        locations_by_contact
            .entry(row.contact_id)
            .or_default()
            .push(LinkedLocation {
                id: row.location_id,
                display_name: row.title,
                raw_geometry: row.raw,
            });
    }

    let mut groups_by_contact: HashMap<i64, Vec<LinkedGroup>> = HashMap::new();
    for row in groups {
        groups_by_contact
            .entry(row.contact_id)
            .or_default()
            .push(LinkedGroup {
                id: row.group_id,
                permalink: permalink("groups", row.group_id),
                display_name: row.title,
            });
    }

    contacts
        .into_iter()
        .map(|contact| RawRecord {
            permalink: permalink("contacts", contact.id),
            metadata: meta_by_contact.remove(&contact.id).unwrap_or_default(),
            locations: locations_by_contact.remove(&contact.id).unwrap_or_default(),
            groups: groups_by_contact.remove(&contact.id).unwrap_or_default(),
            id: contact.id,
            title: contact.title,
            is_team_contact: contact.is_team_contact,
        })
        .collect()
}
