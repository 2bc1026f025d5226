/// Queue API routes
use crate::{
    error::{Result, ServerError},
    middleware::AuthenticatedUser,
    services::AdvanceResult,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jukebox_core::{QueueItem, QueueItemId, QueueSnapshot, Tally, TallyDelta, VoteDirection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub source_url: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub direction: VoteDirection,
}

#[derive(Debug, Serialize)]
pub struct HeadResponse {
    pub head: Option<QueueItem>,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub now_playing: Option<QueueItem>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    #[serde(flatten)]
    pub snapshot: QueueSnapshot,
    pub poll_interval_ms: u64,
}

/// Strong validator derived from the queue revision
pub fn snapshot_etag(revision: i64) -> String {
    format!("\"rev-{}\"", revision)
}

fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .any(|candidate| candidate == etag || candidate == "*")
}

/// GET /api/queue
pub async fn list_queue(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<QueueItem>>> {
    let order = app_state.queue_service.current_order().await?;
    Ok(Json(order))
}

/// GET /api/queue/head
pub async fn get_head(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<HeadResponse>> {
    let head = app_state.queue_service.head().await?;
    Ok(Json(HeadResponse { head }))
}

/// GET /api/queue/snapshot
///
/// Answers `304 Not Modified` when `If-None-Match` carries the current revision.
pub async fn get_snapshot(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<Response> {
    let snapshot = app_state.queue_service.snapshot().await?;
    let etag = snapshot_etag(snapshot.revision);
    let etag_header = HeaderValue::from_str(&etag)
        .map_err(|e| ServerError::Internal(format!("Invalid ETag: {}", e)))?;

    if etag_matches(&headers, &etag) {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag_header)]).into_response());
    }

    let body = SnapshotResponse {
        snapshot,
        poll_interval_ms: app_state.poll_interval_ms,
    };

    Ok((
        [
            (header::ETAG, etag_header),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        Json(body),
    )
        .into_response())
}

/// POST /api/queue
pub async fn enqueue(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<QueueItem>)> {
    let item = app_state
        .queue_service
        .enqueue(user.user_id(), &req.source_url)
        .await?;

    tracing::info!(
        item_id = %item.id,
        submitter = user.display_name(),
        "Queued submission"
    );

    Ok((StatusCode::CREATED, Json(item)))
}

/// POST /api/queue/start
pub async fn start(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<StartResponse>> {
    let now_playing = app_state.queue_service.start(user.user_id()).await?;
    Ok(Json(StartResponse { now_playing }))
}

/// POST /api/queue/:id/vote
pub async fn vote(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(req): Json<VoteRequest>,
) -> Result<Json<TallyDelta>> {
    let delta = app_state
        .queue_service
        .vote(user.user_id(), QueueItemId::new(id), req.direction)
        .await?;

    Ok(Json(delta))
}

/// POST /api/queue/:id/advance
pub async fn advance(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<AdvanceResult>> {
    let result = app_state
        .queue_service
        .advance(user.user_id(), QueueItemId::new(id))
        .await?;

    Ok(Json(result))
}

/// POST /api/queue/:id/tally/recompute
pub async fn recompute_tally(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Tally>> {
    let tally = app_state
        .queue_service
        .recompute(user.user_id(), QueueItemId::new(id))
        .await?;

    Ok(Json(tally))
}
