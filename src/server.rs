use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use crate::{
    expiry::{self, Expiry, PolicyError, Remaining},
    notify::PanelEvent,
    store::StoreError,
    AppState,
};

/// Errors surfaced by the two endpoints. Each renders as a JSON object with
/// an `error` field and the matching status code; storage failures never
/// leak internal detail into the response body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Add request without a uid.
    #[error("Missing parameter: uid")]
    MissingUid,
    /// Lookup request without a uid.
    #[error("Missing UID")]
    MissingLookupUid,
    /// Duration validation failed; message comes from the policy.
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// Lookup for a uid with no record.
    #[error("UID not found")]
    UnknownUid,
    /// Record exists but its marker is at or before now. The sweep may not
    /// have removed it yet; the read path re-checks independently.
    #[error("UID has expired")]
    Expired,
    #[error("internal storage error")]
    Storage(#[from] StoreError),
}

impl ApiError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingUid | Self::MissingLookupUid | Self::Policy(_) | Self::Expired => {
                StatusCode::BAD_REQUEST
            }
            Self::UnknownUid => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Storage(err) = &self {
            error!(error = %err, "storage failure while handling request");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

/// Parameters of `/add_uid`, taken from the query string or the form body
/// interchangeably.
#[derive(Debug, Default, Deserialize)]
pub struct AddParams {
    pub uid: Option<String>,
    pub time: Option<String>,
    #[serde(rename = "type")]
    pub unit: Option<String>,
    pub permanent: Option<String>,
}

impl AddParams {
    /// Query values win over form values; empty strings count as absent.
    fn merged_with(self, form: Option<AddParams>) -> AddParams {
        let form = form.unwrap_or_default();
        AddParams {
            uid: non_empty(self.uid).or_else(|| non_empty(form.uid)),
            time: non_empty(self.time).or_else(|| non_empty(form.time)),
            unit: non_empty(self.unit).or_else(|| non_empty(form.unit)),
            permanent: non_empty(self.permanent).or_else(|| non_empty(form.permanent)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TimeParams {
    pub uid: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Serialize)]
pub struct AddResponse {
    pub uid: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TimeResponse {
    Permanent {
        uid: String,
        status: &'static str,
        message: &'static str,
    },
    Active {
        uid: String,
        remaining_time: Remaining,
    },
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/add_uid", get(add_uid).post(add_uid))
        .route("/get_time", get(get_time).post(get_time))
        .with_state(state)
}

/// Stores a uid with a resolved expiration marker, overwriting any prior
/// record, and fires the outward provision notification.
pub async fn add_uid(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AddParams>,
    form: Option<Form<AddParams>>,
) -> Result<Json<AddResponse>, ApiError> {
    let params = query.merged_with(form.map(|Form(params)| params));
    let uid = params.uid.ok_or(ApiError::MissingUid)?;
    let permanent = params
        .permanent
        .as_deref()
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let now = Local::now().naive_local();
    let marker = expiry::compute(now, permanent, params.time.as_deref(), params.unit.as_deref())?;

    state.notifier.notify(PanelEvent::Provision, &uid);
    state.store.update(|records| {
        records.insert(uid.clone(), marker);
    })?;

    let expires_at = match marker {
        Expiry::Permanent => "never".to_string(),
        Expiry::At(_) => marker.to_string(),
    };
    info!(uid = %uid, expires_at = %expires_at, "added uid");
    Ok(Json(AddResponse { uid, expires_at }))
}

/// Reports how long a uid remains valid. Expired records answer with an
/// error even before the sweep has physically removed them.
pub async fn get_time(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TimeParams>,
    form: Option<Form<TimeParams>>,
) -> Result<Json<TimeResponse>, ApiError> {
    let uid = non_empty(query.uid)
        .or_else(|| form.and_then(|Form(params)| non_empty(params.uid)))
        .ok_or(ApiError::MissingLookupUid)?;

    let records = state.store.load()?;
    let marker = records.get(&uid).ok_or(ApiError::UnknownUid)?;
    match marker {
        Expiry::Permanent => Ok(Json(TimeResponse::Permanent {
            uid,
            status: "permanent",
            message: "This UID will never expire.",
        })),
        Expiry::At(when) => {
            let now = Local::now().naive_local();
            if expiry::is_expired(marker, now) {
                return Err(ApiError::Expired);
            }
            Ok(Json(TimeResponse::Active {
                uid,
                remaining_time: expiry::remaining(*when, now),
            }))
        }
    }
}
