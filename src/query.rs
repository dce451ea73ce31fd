//! Read-only JSON endpoint over the action log
//!
//! Routes (message actions only):
//! - `GET /messages/all`
//! - `GET /messages/search/:term` - content contains `term`
//! - `GET /messages/user/:username` - sent by `username`

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::action_log::{Action, ActionLog};
use crate::error::AppError;

const MESSAGE: &str = "message";

/// Build the query router.
pub fn create_router(log: Arc<ActionLog>) -> Router {
    Router::new()
        .route("/messages/all", get(all_messages))
        .route("/messages/search/:term", get(search_messages))
        .route("/messages/user/:username", get(user_messages))
        .with_state(log)
}

/// Serve the query router until the listener fails.
pub async fn serve(listener: TcpListener, log: Arc<ActionLog>) -> Result<(), AppError> {
    info!("JSON endpoint listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(log)).await?;
    Ok(())
}

/// GET /messages/all
async fn all_messages(State(log): State<Arc<ActionLog>>) -> Json<Vec<Action>> {
    Json(log.query(Some(MESSAGE), None, None).await)
}

/// GET /messages/search/:term
async fn search_messages(
    State(log): State<Arc<ActionLog>>,
    Path(term): Path<String>,
) -> Json<Vec<Action>> {
    Json(log.query(Some(MESSAGE), Some(&term), None).await)
}

/// GET /messages/user/:username
async fn user_messages(
    State(log): State<Arc<ActionLog>>,
    Path(username): Path<String>,
) -> Json<Vec<Action>> {
    Json(log.query(Some(MESSAGE), None, Some(&username)).await)
}
