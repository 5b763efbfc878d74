//! Command handlers for the CLI.

use dtmobile_core::{distance, AppConfig, DistanceUnit, GeoPoint, DEFAULT_LOG_LEVEL};

/// `DTM_LOG_LEVEL`, or the default level. Read on its own so commands that
/// never touch the database do not need a full config.
pub(crate) fn log_level<F>(lookup: F) -> String
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    lookup("DTM_LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
}

pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = dtmobile_db::PoolConfig::from_app_config(config);
    let pool = dtmobile_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

/// Build the contacts view for `user_id` and render it as pretty JSON.
///
/// # Errors
///
/// Returns an error if the user has no geocoded location or a database
/// query fails.
pub(crate) async fn run_contacts(
    pool: sqlx::PgPool,
    config: &AppConfig,
    user_id: i64,
) -> anyhow::Result<String> {
    let repo = dtmobile_db::PgContactsRepository::new(pool, config.site_url.clone());
    let view = dtmobile_core::load_contacts_view(&repo, user_id).await?;
    tracing::info!(
        user_id,
        total = view.total,
        returned = view.contacts.len(),
        "contacts view loaded"
    );
    Ok(serde_json::to_string_pretty(&view)?)
}

pub(crate) fn format_distance(from: GeoPoint, to: GeoPoint, unit: DistanceUnit) -> String {
    let label = match unit {
        DistanceUnit::Mile => "mi",
        DistanceUnit::Kilometer => "km",
        DistanceUnit::NauticalMile => "nmi",
    };
    format!("{:.4} {label}", distance(from, to, unit))
}
