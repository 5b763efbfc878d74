//! `GET /{namespace}/v1/contacts`: the requesting user's contacts needing a
//! first contact attempt, enriched with distances and relationship data.

use axum::{extract::State, Extension, Json};
use dtmobile_core::{load_contacts_view, ContactsView, CoreError};

use crate::middleware::{CurrentUser, RequestId};

use super::{ApiError, AppState};

pub(super) async fn list_contacts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ContactsView>, ApiError> {
    let Some(user_id) = user.0 else {
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "an authenticated user is required",
        ));
    };

    load_contacts_view(state.contacts.as_ref(), user_id)
        .await
        .map(Json)
        .map_err(|e| map_core_error(req_id.0, e))
}

fn map_core_error(request_id: String, error: CoreError) -> ApiError {
    match error {
        CoreError::MissingReferenceLocation { user_id } => {
            tracing::warn!(user_id, "user has no reference location");
            ApiError::new(
                request_id,
                "missing_reference_location",
                error.to_string(),
            )
        }
        CoreError::Upstream(upstream) => {
            tracing::error!(code = %upstream.code, message = %upstream.message, "contact search failed");
            ApiError::new(request_id, upstream.code, upstream.message)
        }
    }
}
