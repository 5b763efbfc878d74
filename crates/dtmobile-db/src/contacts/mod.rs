//! Database reads for contacts, their metadata and their connections.

mod read;
mod types;

pub use read::{
    count_deleted_contacts, list_contact_groups, list_contact_locations, list_contact_meta,
    list_viewable_contacts,
};
pub use types::{ContactGroupRow, ContactLocationRow, ContactMetaRow, ContactRow};
