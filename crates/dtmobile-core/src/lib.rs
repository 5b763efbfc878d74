mod app_config;
mod config;
pub mod contacts;
pub mod enrich;
pub mod geo;
pub mod metadata;
pub mod relations;
pub mod repository;
pub mod users;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, DEFAULT_LOG_LEVEL};
pub use contacts::{load_contacts_view, ContactsView};
pub use enrich::{EnrichedRecord, RawRecord, RecordEnricher};
pub use geo::{distance, DistanceUnit, GeoPoint};
pub use metadata::{reconcile_fields, yes_no_to_bool, Assignee, RawMetadata, ReconciledFields};
pub use relations::{resolve_relations, DistancePair, Geometry, LinkedGroup, LinkedLocation};
pub use repository::{ContactFilter, ContactsRepository, SearchError, SearchResult};
pub use users::{UserDirectory, UserLookup, UserSummary};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("user {user_id} has no resolvable reference location")]
    MissingReferenceLocation { user_id: i64 },
    #[error(transparent)]
    Upstream(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
