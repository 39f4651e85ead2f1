pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::feed::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Feed sessions
        .route("/api/v1/feed/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/feed/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_close_session),
        )
        .route("/api/v1/feed/sessions/:id/swipe", post(handlers::handle_swipe))
        .route("/api/v1/feed/sessions/:id/settle", post(handlers::handle_settle))
        .route("/api/v1/feed/sessions/:id/undo", post(handlers::handle_undo))
        .route("/api/v1/feed/sessions/:id/apply", post(handlers::handle_apply))
        .route("/api/v1/feed/sessions/:id/reload", post(handlers::handle_reload))
        // Swipe records
        .route("/api/v1/swipes/stats", get(handlers::handle_swipe_stats))
        .route("/api/v1/swipes/saved", get(handlers::handle_list_saved))
        .route("/api/v1/swipes/limits", get(handlers::handle_swipe_limits))
        .route("/api/v1/swipes/:id", delete(handlers::handle_remove_saved))
        // Eligibility check
        .route(
            "/api/v1/opportunities/:id/match",
            get(handlers::handle_match),
        )
        .with_state(state)
}
