use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::decision::machine::DeckState;
use crate::decision::persister::{SavedItem, SwipeLimits, SwipeStats};
use crate::decision::registry::SessionHandle;
use crate::decision::session::{FeedEvent, FeedSession};
use crate::errors::AppError;
use crate::models::opportunity::{FeedCard, OpportunityId};
use crate::models::profile::UserId;
use crate::models::swipe::{SwipeDirection, SwipeId};
use crate::scoring::MatchResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: UserId,
}

#[derive(Deserialize)]
pub struct SavedQuery {
    pub user_id: UserId,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_page_limit")]
    pub limit: usize,
}

fn default_page_limit() -> usize {
    50
}

const MAX_PAGE_LIMIT: usize = 100;

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub user_id: UserId,
}

#[derive(Deserialize)]
pub struct SwipeRequest {
    pub direction: SwipeDirection,
}

#[derive(Deserialize)]
pub struct ApplyRequest {
    pub opportunity_id: OpportunityId,
}

#[derive(Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub user_id: UserId,
    pub state: DeckState,
    pub active_card: Option<FeedCard>,
    pub remaining: usize,
    pub events: Vec<FeedEvent>,
}

#[derive(Serialize)]
pub struct GestureResponse {
    /// `false` when the gesture was ignored (settling, no card, stale id).
    pub accepted: bool,
    #[serde(flatten)]
    pub session: SessionView,
}

async fn view(id: Uuid, handle: &SessionHandle) -> SessionView {
    let state = handle.session.state();
    let remaining = match state {
        DeckState::Ready { index } => index + 1,
        _ => 0,
    };
    SessionView {
        session_id: id,
        user_id: handle.session.user_id(),
        active_card: handle.session.active_card(),
        state,
        remaining,
        events: handle.drain_events().await,
    }
}

async fn lookup(state: &AppState, id: Uuid) -> Result<Arc<SessionHandle>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Feed session {id} not found")))
}

/// POST /api/v1/feed/sessions
/// Shows the cached queue immediately and refreshes from the store in the background.
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let profile = state.store.get_profile(req.user_id).await?;
    let prefs = state.store.get_preferences(req.user_id).await?;

    let (session, events) = FeedSession::new(
        profile,
        state.loader.clone(),
        state.persister.clone(),
        &state.feed,
    );
    let (id, handle) = state.sessions.insert(SessionHandle::new(session, events)).await;
    info!("Opened feed session {id} for user {}", req.user_id);

    handle.session.hydrate().await;
    handle.session.spawn_refresh(prefs);

    Ok((StatusCode::CREATED, Json(view(id, &handle).await)))
}

/// GET /api/v1/feed/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = lookup(&state, id).await?;
    Ok(Json(view(id, &handle).await))
}

/// POST /api/v1/feed/sessions/:id/swipe
pub async fn handle_swipe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SwipeRequest>,
) -> Result<Json<GestureResponse>, AppError> {
    let handle = lookup(&state, id).await?;
    let accepted = handle.session.swipe(req.direction);
    Ok(Json(GestureResponse {
        accepted,
        session: view(id, &handle).await,
    }))
}

/// POST /api/v1/feed/sessions/:id/apply
pub async fn handle_apply(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ApplyRequest>,
) -> Result<Json<GestureResponse>, AppError> {
    let handle = lookup(&state, id).await?;
    let accepted = handle.session.apply_explicit(req.opportunity_id);
    Ok(Json(GestureResponse {
        accepted,
        session: view(id, &handle).await,
    }))
}

/// POST /api/v1/feed/sessions/:id/undo
pub async fn handle_undo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GestureResponse>, AppError> {
    let handle = lookup(&state, id).await?;
    let accepted = handle.session.undo();
    Ok(Json(GestureResponse {
        accepted,
        session: view(id, &handle).await,
    }))
}

/// POST /api/v1/feed/sessions/:id/settle
/// Sent by the client when the exit animation finishes.
pub async fn handle_settle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = lookup(&state, id).await?;
    handle.session.settle();
    Ok(Json(view(id, &handle).await))
}

/// POST /api/v1/feed/sessions/:id/reload
/// Re-reads preferences and refreshes in the foreground.
pub async fn handle_reload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = lookup(&state, id).await?;
    let prefs = state
        .store
        .get_preferences(handle.session.user_id())
        .await?;
    handle.session.refresh(&prefs).await;
    Ok(Json(view(id, &handle).await))
}

/// DELETE /api/v1/feed/sessions/:id
/// Pending swipe writes are allowed to finish before the session is dropped.
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let handle = state
        .sessions
        .remove(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Feed session {id} not found")))?;
    handle.session.teardown();
    handle.session.flush().await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/swipes/stats
pub async fn handle_swipe_stats(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<SwipeStats>, AppError> {
    Ok(Json(state.persister.stats(params.user_id).await?))
}

/// GET /api/v1/swipes/saved
pub async fn handle_list_saved(
    State(state): State<AppState>,
    Query(params): Query<SavedQuery>,
) -> Result<Json<Vec<SavedItem>>, AppError> {
    if params.limit == 0 || params.limit > MAX_PAGE_LIMIT {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }
    let items = state
        .persister
        .saved(params.user_id, params.skip, params.limit)
        .await?;
    Ok(Json(items))
}

/// GET /api/v1/swipes/limits
pub async fn handle_swipe_limits(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<SwipeLimits>, AppError> {
    Ok(Json(state.persister.limits(params.user_id).await?))
}

/// DELETE /api/v1/swipes/:id
pub async fn handle_remove_saved(
    State(state): State<AppState>,
    Path(swipe_id): Path<SwipeId>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    if state.persister.remove_saved(params.user_id, swipe_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Swipe {swipe_id} not found")))
    }
}

/// GET /api/v1/opportunities/:id/match
pub async fn handle_match(
    State(state): State<AppState>,
    Path(opportunity_id): Path<OpportunityId>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<MatchResult>, AppError> {
    let opportunity = state.store.get_opportunity(opportunity_id).await?;
    let profile = state.store.get_profile(params.user_id).await?;
    Ok(Json(state.scorer.score(&opportunity, &profile)))
}
