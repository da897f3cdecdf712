//! Project and design routes: browsing, saving the cart as a revision, and
//! loading a saved design back for editing.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::revision;
use crate::routes::cart::CartResponse;
use crate::routes::error::ApiError;
use crate::routes::session::Session;
use crate::services::access::Permission;
use crate::services::design::{self, DesignDetail, DesignFilter, DesignRow};
use crate::services::layout::{self, LayoutRow};
use crate::services::project::{self, NewProject, ProjectRow, SavedDesign};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ProjectQuery {
    pub property_id: Option<Uuid>,
}

/// `GET /api/projects`
pub async fn list_projects(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Vec<ProjectRow>>, ApiError> {
    Ok(Json(project::list_projects(&state.pool, &session.user, query.property_id).await?))
}

/// `POST /api/projects`
pub async fn create_project(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<NewProject>,
) -> Result<(StatusCode, Json<ProjectRow>), ApiError> {
    let row = project::create_project(&state.pool, &session.user, body).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/projects/{id}`
pub async fn get_project(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectRow>, ApiError> {
    Ok(Json(project::get_project(&state.pool, &session.user, id, Permission::View).await?))
}

/// `GET /api/projects/{id}/designs`
pub async fn list_project_designs(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Query(mut filter): Query<DesignFilter>,
) -> Result<Json<Vec<DesignRow>>, ApiError> {
    project::get_project(&state.pool, &session.user, id, Permission::View).await?;
    filter.project_id = Some(id);
    filter.include_deleted = false;
    Ok(Json(design::list_designs(&state.pool, &session.user, &filter).await?))
}

#[derive(Deserialize)]
pub struct SaveBody {
    /// Base name for a new design. Ignored in edit mode, where the edited
    /// design's base name is kept.
    pub design_name: Option<String>,
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub design: SavedDesign,
    /// Name the following save of this base will get.
    pub next_design_name: String,
}

/// `POST /api/projects/{id}/designs`: save the cart as the next revision.
pub async fn save_design(
    State(state): State<AppState>,
    mut session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<SaveBody>,
) -> Result<(StatusCode, Json<SaveResponse>), ApiError> {
    let base = match session.state.editing_design() {
        Some(design_id) => {
            let detail = design::get_design(&state.pool, &session.user, design_id).await?;
            project::edited_base_name(&detail.row, id)?
        }
        None => body.design_name.unwrap_or_default(),
    };

    let cart = {
        let carts = state.carts.read().await;
        carts.get(&session.token).cloned().unwrap_or_default()
    };
    let saved = project::save_design_revision(&state.pool, &session.user, id, &base, &cart).await?;

    state.discard_cart(&session.token).await;
    session.state.exit_edit_mode();
    session.save(&state).await?;

    let next_design_name = revision::next_revision_name(&saved.design_name);
    Ok((StatusCode::CREATED, Json(SaveResponse { success: true, design: saved, next_design_name })))
}

/// `GET /api/designs/{id}`
pub async fn get_design(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<DesignDetail>, ApiError> {
    Ok(Json(design::get_design(&state.pool, &session.user, id).await?))
}

/// `DELETE /api/designs/{id}`: soft delete.
pub async fn delete_design(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    design::soft_delete_design(&state.pool, &session.user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/designs/{id}/edit`: load a saved design into the cart and
/// enter edit mode on it.
pub async fn edit_design(
    State(state): State<AppState>,
    mut session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    let detail = design::get_design(&state.pool, &session.user, id).await?;
    let project = project::get_project(&state.pool, &session.user, detail.row.project_id, Permission::Edit).await?;
    let boq_limit = project.boq_quantity.and_then(|q| u32::try_from(q).ok());

    let response = {
        let mut carts = state.carts.write().await;
        let cart = carts.entry(session.token.clone()).or_default();
        cart.load(detail.items)?;
        if let Err(e) = cart.set_boq_limit(boq_limit) {
            warn!(design_id = %id, error = %e, "saved design exceeds project BOQ; limit not applied");
        }
        CartResponse::from(cart.summary())
    };

    session.state.enter_edit_mode(id);
    session.state.project_id = Some(project.id);
    session.state.project_name = Some(project.project_name);
    session.state.project_code = project.project_code;
    session.save(&state).await?;

    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct NewLayoutBody {
    pub name: String,
}

/// `GET /api/projects/{id}/layouts`
pub async fn list_layouts(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LayoutRow>>, ApiError> {
    Ok(Json(layout::list_layouts(&state.pool, &session.user, id).await?))
}

/// `POST /api/projects/{id}/layouts`
pub async fn create_layout(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<NewLayoutBody>,
) -> Result<(StatusCode, Json<LayoutRow>), ApiError> {
    let row = layout::create_layout(&state.pool, &session.user, id, &body.name).await?;
    Ok((StatusCode::CREATED, Json(row)))
}
