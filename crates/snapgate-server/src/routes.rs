//! Route table and handlers
//!
//! | Method | Path | Caller |
//! |---|---|---|
//! | `GET` | `/health` | anyone |
//! | `GET`, `POST` | `/api/snapshots` | producer |
//! | `GET` | `/api/snapshots/:id` | producer |
//! | `POST` | `/api/snapshots/:id/upload-url` | producer |
//! | `PUT` | `/api/snapshots/:id/files/*path` | producer |
//! | `POST` | `/api/snapshots/:id/{finalize,extend,revoke,rotate-password}` | producer |
//! | `GET` | `/s/:id`, `/s/:id/`, `/s/:id/*path` | viewer |
//! | `POST` | `/s/:id/gate` | viewer (form) |
//! | `GET`, `POST` | `/s/:id/_comments` | viewer |
//!
//! Viewer routes share one wildcard so the gate cookie, scoped to
//! `/s/:id`, reaches all of them.

use crate::auth::{cookie, ClientIdentity, Producer};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, FromRequest, Path, Request, State};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_TYPE, LOCATION, SET_COOKIE, X_CONTENT_TYPE_OPTIONS,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Form, Json, Router};
use serde::Deserialize;
use snapgate_core::{FileEntry, PlanTier, SnapError, SnapshotId};
use snapgate_delivery::{
    password_prompt, CommentRequest, Delivery, Viewer, FALLBACK_CONTENT_TYPE, GATE_COOKIE_PREFIX,
};
use snapgate_lifecycle::{
    CreateSnapshot, CreatedSnapshot, ExtendSnapshot, FinalizeSnapshot, RotatedPassword,
    SnapshotDetail, SnapshotSummary, UploadAuthorization, UploadRequest,
};
use tower_http::trace::TraceLayer;

/// Viewer sub-path receiving the gate form
pub const GATE_PATH: &str = "gate";

/// Viewer sub-path of the comment thread
pub const COMMENTS_PATH: &str = "_comments";

/// Build the application router
pub fn router(state: AppState) -> Router {
    let largest_file = PlanTier::Pro.caps().max_file_bytes as usize;
    Router::new()
        .route("/health", get(health))
        .route("/api/snapshots", get(list_snapshots).post(create_snapshot))
        .route("/api/snapshots/:id", get(get_snapshot))
        .route("/api/snapshots/:id/upload-url", post(authorize_upload))
        .route(
            "/api/snapshots/:id/files/*path",
            put(store_file).layer(DefaultBodyLimit::max(largest_file)),
        )
        .route("/api/snapshots/:id/finalize", post(finalize))
        .route("/api/snapshots/:id/extend", post(extend))
        .route("/api/snapshots/:id/revoke", post(revoke))
        .route("/api/snapshots/:id/rotate-password", post(rotate_password))
        .route("/s/:id", get(serve_index))
        .route("/s/:id/", get(serve_index))
        .route("/s/:id/*path", get(serve_path).post(submit_path))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| SnapError::bad_request(rejection.body_text()).into())
}

fn snapshot_id(raw: &str) -> ApiResult<SnapshotId> {
    SnapshotId::parse(raw).ok_or_else(|| SnapError::not_found("snapshot not found").into())
}

async fn health() -> &'static str {
    "ok"
}

async fn create_snapshot(
    State(state): State<AppState>,
    Producer(uid): Producer,
    body: Result<Json<CreateSnapshot>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedSnapshot>)> {
    let created = state.lifecycle.create(&uid, json_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_snapshots(
    State(state): State<AppState>,
    Producer(uid): Producer,
) -> ApiResult<Json<Vec<SnapshotSummary>>> {
    Ok(Json(state.lifecycle.list_owner_snapshots(&uid).await?))
}

async fn get_snapshot(
    State(state): State<AppState>,
    Producer(uid): Producer,
    Path(id): Path<String>,
) -> ApiResult<Json<SnapshotDetail>> {
    let id = snapshot_id(&id)?;
    Ok(Json(state.lifecycle.get_snapshot(&uid, &id).await?))
}

async fn authorize_upload(
    State(state): State<AppState>,
    Producer(uid): Producer,
    Path(id): Path<String>,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> ApiResult<Json<UploadAuthorization>> {
    let id = snapshot_id(&id)?;
    let request = json_body(body)?;
    Ok(Json(
        state.lifecycle.authorize_upload(&uid, &id, request).await?,
    ))
}

async fn store_file(
    State(state): State<AppState>,
    Producer(uid): Producer,
    Path((id, path)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<FileEntry>> {
    let id = snapshot_id(&id)?;
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let entry = state
        .lifecycle
        .store_file(&uid, &id, &path, content_type, body.to_vec())
        .await?;
    Ok(Json(entry))
}

async fn finalize(
    State(state): State<AppState>,
    Producer(uid): Producer,
    Path(id): Path<String>,
    body: Result<Json<FinalizeSnapshot>, JsonRejection>,
) -> ApiResult<Json<SnapshotSummary>> {
    let id = snapshot_id(&id)?;
    let request = json_body(body)?;
    Ok(Json(state.lifecycle.finalize(&uid, &id, request).await?))
}

async fn extend(
    State(state): State<AppState>,
    Producer(uid): Producer,
    Path(id): Path<String>,
    body: Result<Json<ExtendSnapshot>, JsonRejection>,
) -> ApiResult<Json<SnapshotSummary>> {
    let id = snapshot_id(&id)?;
    let request = json_body(body)?;
    Ok(Json(state.lifecycle.extend(&uid, &id, request).await?))
}

async fn revoke(
    State(state): State<AppState>,
    Producer(uid): Producer,
    Path(id): Path<String>,
) -> ApiResult<Json<SnapshotSummary>> {
    let id = snapshot_id(&id)?;
    Ok(Json(state.lifecycle.revoke(&uid, &id).await?))
}

async fn rotate_password(
    State(state): State<AppState>,
    Producer(uid): Producer,
    Path(id): Path<String>,
) -> ApiResult<Json<RotatedPassword>> {
    let id = snapshot_id(&id)?;
    Ok(Json(state.lifecycle.rotate_password(&uid, &id).await?))
}

fn gate_cookie<'a>(headers: &'a HeaderMap, raw_id: &str) -> Option<&'a str> {
    cookie(headers, &format!("{GATE_COOKIE_PREFIX}{raw_id}"))
}

async fn deliver(
    state: &AppState,
    raw_id: &str,
    path: &str,
    headers: &HeaderMap,
    client: &ClientIdentity,
) -> ApiResult<Response> {
    let viewer = Viewer {
        gate_token: gate_cookie(headers, raw_id),
        client_ip: &client.ip,
        user_agent: &client.user_agent,
    };
    let response = match state.delivery.serve(raw_id, path, viewer).await? {
        Delivery::Asset(asset) => {
            let content_type = HeaderValue::from_str(&asset.content_type)
                .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));
            (
                [
                    (CONTENT_TYPE, content_type),
                    (CACHE_CONTROL, HeaderValue::from_static("private, no-cache")),
                    (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
                ],
                asset.body,
            )
                .into_response()
        }
        Delivery::PasswordPrompt(page) => (StatusCode::UNAUTHORIZED, Html(page)).into_response(),
    };
    Ok(response)
}

async fn serve_index(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    client: ClientIdentity,
) -> ApiResult<Response> {
    deliver(&state, &id, "", &headers, &client).await
}

async fn serve_path(
    State(state): State<AppState>,
    Path((id, path)): Path<(String, String)>,
    headers: HeaderMap,
    client: ClientIdentity,
) -> ApiResult<Response> {
    if path == COMMENTS_PATH {
        let comments = state
            .delivery
            .list_comments(&id, gate_cookie(&headers, &id))
            .await?;
        return Ok(Json(comments).into_response());
    }
    deliver(&state, &id, &path, &headers, &client).await
}

/// Gate form body
#[derive(Debug, Deserialize)]
pub struct GateForm {
    /// Plaintext gate password
    pub password: String,
}

async fn submit_path(
    State(state): State<AppState>,
    Path((id, path)): Path<(String, String)>,
    headers: HeaderMap,
    request: Request,
) -> ApiResult<Response> {
    match path.as_str() {
        GATE_PATH => {
            let Form(form) = Form::<GateForm>::from_request(request, &state)
                .await
                .map_err(|rejection| SnapError::bad_request(rejection.body_text()))?;
            submit_gate(&state, &id, &form.password).await
        }
        COMMENTS_PATH => {
            let body = Json::<CommentRequest>::from_request(request, &state).await;
            let comment = state
                .delivery
                .append_comment(&id, gate_cookie(&headers, &id), json_body(body)?)
                .await?;
            Ok((StatusCode::CREATED, Json(comment)).into_response())
        }
        _ => Err(SnapError::not_found("no such route").into()),
    }
}

async fn submit_gate(state: &AppState, raw_id: &str, password: &str) -> ApiResult<Response> {
    match state.delivery.gate_check(raw_id, password).await {
        Ok(pass) => Ok((
            StatusCode::SEE_OTHER,
            [
                (LOCATION, format!("{}/", pass.cookie_path)),
                (SET_COOKIE, pass.set_cookie_header()),
            ],
        )
            .into_response()),
        Err(SnapError::Forbidden { .. }) => match SnapshotId::parse(raw_id) {
            Some(id) => {
                let page = Html(password_prompt(&id, true));
                Ok((StatusCode::FORBIDDEN, page).into_response())
            }
            None => Err(SnapError::forbidden("incorrect password").into()),
        },
        Err(err) => Err(ApiError::from(err)),
    }
}
