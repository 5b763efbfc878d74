//! Reference-location lookup for users.

use dtmobile_core::{
    relations::{extract_geometry, locate, GeometryLookup},
    GeoPoint,
};
use sqlx::PgPool;

use crate::DbError;

/// Raw geocoder payloads of the locations connected to `user_id`, in
/// connection order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_user_location_raws(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<serde_json::Value>, DbError> {
    let raws = sqlx::query_scalar::<_, serde_json::Value>(
        "SELECT l.raw \
         FROM user_locations ul \
         JOIN locations l ON l.id = ul.location_id \
         WHERE ul.user_id = $1 \
         ORDER BY ul.position, l.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(raws)
}

/// The first connected location of `user_id` that geocodes to a point.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn resolve_reference_location(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<GeoPoint>, DbError> {
    let raws = list_user_location_raws(pool, user_id).await?;
    Ok(first_point(&raws))
}

fn first_point(raws: &[serde_json::Value]) -> Option<GeoPoint> {
    raws.iter()
        .find_map(|raw| match locate(&extract_geometry(raw)) {
            GeometryLookup::Present(point) => Some(point),
            GeometryLookup::Absent | GeometryLookup::Malformed => None,
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn first_point_skips_locations_without_geometry() {
        let raws = vec![
            json!({}),
            json!({ "results": [{ "geometry": { "location": { "lat": "x", "lng": 1 } } }] }),
            json!({ "results": [{ "geometry": { "location": { "lat": 35.2, "lng": -80.8 } } }] }),
            json!({ "results": [{ "geometry": { "location": { "lat": 1.0, "lng": 1.0 } } }] }),
        ];
        assert_eq!(first_point(&raws), Some(GeoPoint::new(35.2, -80.8)));
    }

    #[test]
    fn first_point_is_none_without_any_geometry() {
        assert_eq!(first_point(&[]), None);
        assert_eq!(first_point(&[json!(null)]), None);
    }
}
