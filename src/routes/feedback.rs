//! Feedback routes. Anyone signed in may submit; the inbox is admin-only.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::routes::error::ApiError;
use crate::routes::session::Session;
use crate::services::access::ensure_admin;
use crate::services::feedback::{self, FeedbackQuery, FeedbackRow, FeedbackStatus, NewFeedback};
use crate::state::AppState;

#[derive(Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub id: Uuid,
}

/// `POST /api/feedback`
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<NewFeedback>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let id = feedback::submit(&state.pool, &session.user.email, body).await?;
    Ok((StatusCode::CREATED, Json(SubmitResponse { success: true, id })))
}

/// `GET /api/admin/feedback`
pub async fn list(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<FeedbackQuery>,
) -> Result<Json<Vec<FeedbackRow>>, ApiError> {
    ensure_admin(&session.user)?;
    Ok(Json(feedback::list(&state.pool, &query).await?))
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: String,
}

/// `PATCH /api/admin/feedback/{id}`: mark new, read, or resolved.
pub async fn set_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Result<StatusCode, ApiError> {
    ensure_admin(&session.user)?;
    let status = FeedbackStatus::parse(&body.status)?;
    feedback::set_status(&state.pool, id, status).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/admin/feedback/{id}`
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ensure_admin(&session.user)?;
    feedback::soft_delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
