//! Layout routes. Every write carries the `version` the client last saw.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::routes::error::ApiError;
use crate::routes::session::Session;
use crate::services::access::Permission;
use crate::services::layout::{self, ItemPatch, LayoutItem, LayoutRow, NewLayoutItem};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct VersionQuery {
    pub version: i32,
}

#[derive(Serialize)]
pub struct ItemResponse {
    pub layout: LayoutRow,
    pub item: LayoutItem,
}

/// `GET /api/layouts/{id}`
pub async fn get_layout(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<LayoutRow>, ApiError> {
    Ok(Json(layout::get_layout(&state.pool, &session.user, id, Permission::View).await?))
}

#[derive(Deserialize)]
pub struct UpdateBody {
    pub version: i32,
    pub name: Option<String>,
    pub items: Option<Vec<LayoutItem>>,
}

/// `PATCH /api/layouts/{id}`: rename and/or replace all items.
pub async fn update_layout(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<LayoutRow>, ApiError> {
    let row = layout::update_layout(
        &state.pool,
        &session.user,
        id,
        body.version,
        body.name.as_deref(),
        body.items,
        state.config.layout_min_item_size,
    )
    .await?;
    Ok(Json(row))
}

/// `DELETE /api/layouts/{id}`: rejected for a project's last layout.
pub async fn delete_layout(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    layout::delete_layout(&state.pool, &session.user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct BackgroundBody {
    pub version: i32,
    /// `data:image/png;base64,...` or `data:image/jpeg;base64,...`;
    /// `null` removes the background.
    pub image: Option<String>,
}

/// `PUT /api/layouts/{id}/background`
pub async fn set_background(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<BackgroundBody>,
) -> Result<Json<LayoutRow>, ApiError> {
    let row = layout::set_background(
        &state.pool,
        &session.user,
        id,
        body.version,
        body.image,
        state.config.max_background_bytes,
    )
    .await?;
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct AddItemBody {
    pub version: i32,
    #[serde(flatten)]
    pub item: NewLayoutItem,
}

/// `POST /api/layouts/{id}/items`
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<AddItemBody>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let (layout, item) =
        layout::create_item(&state.pool, &session.user, id, body.version, body.item, state.config.layout_min_item_size)
            .await?;
    Ok((StatusCode::CREATED, Json(ItemResponse { layout, item })))
}

#[derive(Deserialize)]
pub struct PatchItemBody {
    pub version: i32,
    #[serde(flatten)]
    pub patch: ItemPatch,
}

/// `PATCH /api/layouts/{id}/items/{item_id}`: move, resize, relabel.
pub async fn patch_item(
    State(state): State<AppState>,
    session: Session,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<PatchItemBody>,
) -> Result<Json<ItemResponse>, ApiError> {
    let (layout, item) = layout::patch_item(
        &state.pool,
        &session.user,
        id,
        body.version,
        item_id,
        body.patch,
        state.config.layout_min_item_size,
    )
    .await?;
    Ok(Json(ItemResponse { layout, item }))
}

/// `DELETE /api/layouts/{id}/items/{item_id}?version=N`
pub async fn delete_item(
    State(state): State<AppState>,
    session: Session,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<VersionQuery>,
) -> Result<Json<LayoutRow>, ApiError> {
    Ok(Json(layout::delete_item(&state.pool, &session.user, id, query.version, item_id).await?))
}
