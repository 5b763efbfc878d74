use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::IntoResponse,
};
use dtmobile_core::{
    ContactFilter, ContactsRepository, GeoPoint, LinkedLocation, RawMetadata, RawRecord,
    SearchError, SearchResult, UserSummary,
};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

use super::*;

const NAMESPACE: &str = "dt-mobile-api";
const CONTACTS_URI: &str = "/dt-mobile-api/v1/contacts";

#[derive(Default)]
struct FakeRepo {
    location: Option<GeoPoint>,
    records: Vec<RawRecord>,
    search_error: Option<SearchError>,
}

#[async_trait]
impl ContactsRepository for FakeRepo {
    async fn reference_location(&self, _: i64) -> Result<Option<GeoPoint>, SearchError> {
        Ok(self.location)
    }

    async fn search_viewable_contacts(
        &self,
        _: &ContactFilter,
    ) -> Result<SearchResult, SearchError> {
        match &self.search_error {
            Some(err) => Err(err.clone()),
            None => Ok(SearchResult {
                records: self.records.clone(),
                total: 2,
                deleted: 1,
            }),
        }
    }

    async fn lookup_users(&self, _: &[i64]) -> Result<Vec<UserSummary>, SearchError> {
        Ok(vec![UserSummary {
            id: 5,
            display_name: "Sam Field".to_string(),
            user_login: "sam".to_string(),
        }])
    }

    async fn shared_with_user(&self, _: i64) -> Result<Vec<i64>, SearchError> {
        Ok(vec![2])
    }
}

struct FakeHealth(bool);

#[async_trait]
impl HealthCheck for FakeHealth {
    async fn check(&self) -> Result<(), String> {
        if self.0 {
            Ok(())
        } else {
            Err("connection refused".to_string())
        }
    }
}

fn record(id: i64, raw_geometry: Value) -> RawRecord {
    let mut metadata = RawMetadata::new();
    metadata.push("assigned_to", "user-5");
    metadata.push("overall_status", "assigned");
    metadata.push("milestone_prayer", "yes");
    metadata.push("last_modified", "1700000000");
    RawRecord {
        id,
        title: format!("Contact {id}"),
        permalink: format!("http://localhost/contacts/{id}/"),
        is_team_contact: false,
        metadata,
        locations: vec![LinkedLocation {
            id: 40 + id,
            display_name: "Market".to_string(),
            raw_geometry,
        }],
        groups: Vec::new(),
    }
}

fn seeded_repo() -> FakeRepo {
    FakeRepo {
        location: Some(GeoPoint::new(40.0, -75.0)),
        records: vec![
            record(
                1,
                json!({ "results": [{ "geometry": { "location": { "lat": 40.0, "lng": -75.0 } } }] }),
            ),
            record(2, json!({})),
        ],
        search_error: None,
    }
}

fn app_with(repo: FakeRepo, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let state = AppState {
        contacts: Arc::new(repo),
        health: Arc::new(FakeHealth(true)),
    };
    build_app(state, NAMESPACE, auth, rate_limit)
}

fn authed_app(repo: FakeRepo) -> Router {
    let auth = AuthState::from_keys("5:field-token", false, Some("salt")).expect("auth");
    app_with(repo, auth, RateLimitState::new(100, Duration::from_secs(60)))
}

fn get_contacts(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(CONTACTS_URI);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

#[test]
fn api_error_missing_reference_location_maps_to_unprocessable() {
    let response = ApiError::new("req-1", "missing_reference_location", "no location").into_response();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
fn api_error_unknown_code_maps_to_internal_error() {
    for code in ["database_error", "validation_error", "not_found"] {
        let response = ApiError::new("req-1", code, "boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "code {code}");
    }
}

#[tokio::test]
async fn contacts_returns_enriched_projection() {
    let response = authed_app(seeded_repo())
        .oneshot(get_contacts(Some("field-token")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["total"], json!(2));
    assert_eq!(json["deleted"], json!(1));
    assert_eq!(json["user_location"], json!({ "lat": 40.0, "lng": -75.0 }));

    let contacts = json["contacts"].as_array().expect("contacts array");
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0]["ID"], json!(1));
    assert_eq!(
        contacts[0]["distance"],
        json!([{ "miles": 0.0, "kilometers": 0.0 }])
    );
    assert_eq!(
        contacts[1]["distance"],
        json!([{ "miles": null, "kilometers": null }])
    );
    assert_eq!(contacts[0]["milestone_prayer"], json!(true));
    assert_eq!(contacts[0]["seeker_path"], json!("none"));
    assert_eq!(contacts[0]["last_modified"], json!(1_700_000_000_i64));
    assert_eq!(contacts[0]["requires_update"], json!(true));
    assert_eq!(contacts[0]["assigned_to"]["name"], json!("Sam Field"));
    assert_eq!(contacts[0]["shared_with_user"], json!(false));
    assert_eq!(contacts[1]["shared_with_user"], json!(true));
}

#[tokio::test]
async fn contacts_rejects_missing_or_unknown_token() {
    for token in [None, Some("not-the-token")] {
        let response = authed_app(seeded_repo())
            .oneshot(get_contacts(token))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn contacts_without_authenticated_user_is_unauthorized() {
    let auth = AuthState::from_keys("", true, None).expect("dev auth");
    let app = app_with(
        seeded_repo(),
        auth,
        RateLimitState::new(100, Duration::from_secs(60)),
    );
    let response = app.oneshot(get_contacts(None)).await.expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], json!("unauthorized"));
}

#[tokio::test]
async fn contacts_fails_without_reference_location() {
    let repo = FakeRepo {
        location: None,
        ..seeded_repo()
    };
    let response = authed_app(repo)
        .oneshot(get_contacts(Some("field-token")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], json!("missing_reference_location"));
}

#[tokio::test]
async fn contacts_propagates_upstream_error_object() {
    let repo = FakeRepo {
        search_error: Some(SearchError::new("database_error", "database query failed")),
        ..seeded_repo()
    };
    let response = authed_app(repo)
        .oneshot(get_contacts(Some("field-token")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], json!("database_error"));
    assert_eq!(json["error"]["message"], json!("database query failed"));
}

#[tokio::test]
async fn contacts_route_follows_configured_namespace() {
    let auth = AuthState::from_keys("5:field-token", false, None).expect("auth");
    let state = AppState {
        contacts: Arc::new(seeded_repo()),
        health: Arc::new(FakeHealth(true)),
    };
    let app = build_app(
        state,
        "field-app",
        auth,
        RateLimitState::new(100, Duration::from_secs(60)),
    );

    let moved = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/field-app/v1/contacts")
                .header("authorization", "Bearer field-token")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(moved.status(), StatusCode::OK);

    let old = app
        .oneshot(get_contacts(Some("field-token")))
        .await
        .expect("response");
    assert_eq!(old.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rate_limit_rejects_requests_over_the_window() {
    let auth = AuthState::from_keys("5:field-token", false, None).expect("auth");
    let app = app_with(seeded_repo(), auth, RateLimitState::new(1, Duration::from_secs(60)));

    let first = app
        .clone()
        .oneshot(get_contacts(Some("field-token")))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(get_contacts(Some("field-token")))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let response = authed_app(seeded_repo())
        .oneshot(
            Request::builder()
                .uri(CONTACTS_URI)
                .header("authorization", "Bearer field-token")
                .header("x-request-id", "req-abc")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-abc")
    );
}

#[tokio::test]
async fn health_reports_database_state() {
    for (healthy, status, label) in [
        (true, StatusCode::OK, "ok"),
        (false, StatusCode::SERVICE_UNAVAILABLE, "degraded"),
    ] {
        let state = AppState {
            contacts: Arc::new(FakeRepo::default()),
            health: Arc::new(FakeHealth(healthy)),
        };
        let auth = AuthState::from_keys("5:field-token", false, None).expect("auth");
        let app = build_app(
            state,
            NAMESPACE,
            auth,
            RateLimitState::new(100, Duration::from_secs(60)),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/dt-mobile-api/v1/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), status);
        let json = json_body(response).await;
        assert_eq!(json["data"]["status"], json!(label));
    }
}
