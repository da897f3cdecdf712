//! Layout service: room layouts placing saved panels and field devices.
//!
//! DESIGN
//! ======
//! A layout belongs to a project and holds a background image (data URL)
//! plus a list of positioned items. The item list is stored as one JSONB
//! column and edited as a whole: handlers load the layout, apply a pure
//! edit, and write it back guarded by the `version` the client last saw.
//! A write whose version no longer matches is rejected as stale.
//!
//! A project always keeps at least one layout. Deletion locks the project's
//! layouts so two concurrent deletes cannot both pass the count check.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::info;
use uuid::Uuid;

use crate::services::access::Permission;
use crate::services::project::{self, ProjectError};
use crate::services::session::SessionUser;

const PNG_PREFIX: &str = "data:image/png;base64,";
const JPEG_PREFIX: &str = "data:image/jpeg;base64,";
const LAYOUT_NAME_MAX_LEN: usize = 120;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("layout not found: {0}")]
    NotFound(Uuid),
    #[error("a project must keep at least one layout")]
    LastLayout,
    #[error("layout item not found: {0}")]
    ItemNotFound(Uuid),
    #[error("layout name must be 1-{LAYOUT_NAME_MAX_LEN} characters")]
    InvalidName,
    #[error("background must be a base64 PNG or JPEG data URL")]
    InvalidImage,
    #[error("background is {size} bytes; the limit is {max}")]
    ImageTooLarge { size: usize, max: usize },
    #[error("layout was changed by someone else; reload and try again")]
    Stale,
    #[error("item coordinates must be finite numbers")]
    InvalidGeometry,
    #[error("design {0} is not part of this project")]
    DesignNotInProject(Uuid),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// What a layout item depicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutItemKind {
    /// One panel of a saved design, by its index in the design's cart.
    Panel { design_id: Uuid, item_index: usize },
    /// A device that is not a configured panel (thermostat, card holder, ...).
    FieldDevice {
        device_type: String,
        #[serde(default)]
        label: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutItem {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: LayoutItemKind,
    #[serde(flatten)]
    pub geometry: Geometry,
}

/// Item as submitted by the client, before it gets an id.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLayoutItem {
    #[serde(flatten)]
    pub kind: LayoutItemKind,
    #[serde(flatten)]
    pub geometry: Geometry,
}

/// Partial move/resize of one item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub background_image: Option<String>,
    pub items: Vec<LayoutItem>,
    pub version: i32,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub updated_at: i64,
}

type LayoutTuple = (Uuid, Uuid, String, Option<String>, Json<Vec<LayoutItem>>, i32, i64, i64);

fn layout_from_tuple(row: LayoutTuple) -> LayoutRow {
    let (id, project_id, name, background_image, Json(items), version, created_at, updated_at) = row;
    LayoutRow { id, project_id, name, background_image, items, version, created_at, updated_at }
}

const LAYOUT_COLUMNS: &str = "id, project_id, name, background_image, items, version,
     (extract(epoch FROM created_at) * 1000)::BIGINT,
     (extract(epoch FROM updated_at) * 1000)::BIGINT";

// =============================================================================
// PURE EDITS
// =============================================================================

/// Check a background upload.
///
/// # Errors
///
/// Returns `InvalidImage` for anything but a non-empty base64 PNG/JPEG data
/// URL and `ImageTooLarge` above `max_bytes`.
pub fn validate_background(data_url: &str, max_bytes: usize) -> Result<(), LayoutError> {
    let payload = data_url
        .strip_prefix(PNG_PREFIX)
        .or_else(|| data_url.strip_prefix(JPEG_PREFIX))
        .ok_or(LayoutError::InvalidImage)?;
    if payload.is_empty()
        || !payload.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
    {
        return Err(LayoutError::InvalidImage);
    }
    if data_url.len() > max_bytes {
        return Err(LayoutError::ImageTooLarge { size: data_url.len(), max: max_bytes });
    }
    Ok(())
}

/// Check that `target` may be deleted from a project holding `layout_ids`.
///
/// # Errors
///
/// Returns `NotFound` if `target` is not among them and `LastLayout` if it
/// is the only one.
pub fn ensure_can_delete(layout_ids: &[Uuid], target: Uuid) -> Result<(), LayoutError> {
    if !layout_ids.contains(&target) {
        return Err(LayoutError::NotFound(target));
    }
    if layout_ids.len() <= 1 {
        return Err(LayoutError::LastLayout);
    }
    Ok(())
}

/// Clamp a geometry onto the canvas: no negative coordinates, no item
/// smaller than `min_size`.
///
/// # Errors
///
/// Returns `InvalidGeometry` for NaN or infinite values.
pub fn normalize_geometry(geometry: Geometry, min_size: f64) -> Result<Geometry, LayoutError> {
    let Geometry { x, y, width, height } = geometry;
    if ![x, y, width, height].iter().all(|v| v.is_finite()) {
        return Err(LayoutError::InvalidGeometry);
    }
    Ok(Geometry { x: x.max(0.0), y: y.max(0.0), width: width.max(min_size), height: height.max(min_size) })
}

/// Trimmed, length-checked layout name.
///
/// # Errors
///
/// Returns `InvalidName` for blank or overlong names.
pub fn normalize_name(raw: &str) -> Result<String, LayoutError> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > LAYOUT_NAME_MAX_LEN {
        return Err(LayoutError::InvalidName);
    }
    Ok(name.to_owned())
}

/// Append a new item.
///
/// # Errors
///
/// Returns `InvalidGeometry` for non-finite coordinates.
pub fn add_item(items: &mut Vec<LayoutItem>, new: NewLayoutItem, min_size: f64) -> Result<LayoutItem, LayoutError> {
    let item = LayoutItem { id: Uuid::new_v4(), kind: new.kind, geometry: normalize_geometry(new.geometry, min_size)? };
    items.push(item.clone());
    Ok(item)
}

/// Move, resize, or relabel one item.
///
/// # Errors
///
/// Returns `ItemNotFound` or `InvalidGeometry`; `items` is unchanged on error.
pub fn update_item(
    items: &mut [LayoutItem],
    item_id: Uuid,
    patch: ItemPatch,
    min_size: f64,
) -> Result<LayoutItem, LayoutError> {
    let item = items.iter_mut().find(|i| i.id == item_id).ok_or(LayoutError::ItemNotFound(item_id))?;
    let current = item.geometry;
    let geometry = normalize_geometry(
        Geometry {
            x: patch.x.unwrap_or(current.x),
            y: patch.y.unwrap_or(current.y),
            width: patch.width.unwrap_or(current.width),
            height: patch.height.unwrap_or(current.height),
        },
        min_size,
    )?;
    item.geometry = geometry;
    if let (Some(new_label), LayoutItemKind::FieldDevice { label, .. }) = (patch.label, &mut item.kind) {
        *label = Some(new_label.trim().to_owned()).filter(|l| !l.is_empty());
    }
    Ok(item.clone())
}

/// Remove one item.
///
/// # Errors
///
/// Returns `ItemNotFound` if no item has `item_id`.
pub fn remove_item(items: &mut Vec<LayoutItem>, item_id: Uuid) -> Result<LayoutItem, LayoutError> {
    let index = items.iter().position(|i| i.id == item_id).ok_or(LayoutError::ItemNotFound(item_id))?;
    Ok(items.remove(index))
}

// =============================================================================
// QUERIES
// =============================================================================

/// List a project's layouts, oldest first.
///
/// # Errors
///
/// Returns project access or database errors.
pub async fn list_layouts(pool: &PgPool, user: &SessionUser, project_id: Uuid) -> Result<Vec<LayoutRow>, LayoutError> {
    project::get_project(pool, user, project_id, Permission::View).await?;
    let rows = sqlx::query_as::<_, LayoutTuple>(&format!(
        "SELECT {LAYOUT_COLUMNS} FROM layouts WHERE project_id = $1 ORDER BY created_at ASC, id ASC"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(layout_from_tuple).collect())
}

/// Create an empty layout in a project.
///
/// # Errors
///
/// Returns `InvalidName`, project access, or database errors.
pub async fn create_layout(
    pool: &PgPool,
    user: &SessionUser,
    project_id: Uuid,
    name: &str,
) -> Result<LayoutRow, LayoutError> {
    let name = normalize_name(name)?;
    project::get_project(pool, user, project_id, Permission::Edit).await?;
    let row = sqlx::query_as::<_, LayoutTuple>(&format!(
        "INSERT INTO layouts (id, project_id, name) VALUES ($1, $2, $3) RETURNING {LAYOUT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(project_id)
    .bind(&name)
    .fetch_one(pool)
    .await?;
    info!(layout_id = %row.0, %project_id, %name, "layout created");
    Ok(layout_from_tuple(row))
}

/// Fetch a layout, requiring `permission` on its project.
///
/// # Errors
///
/// Returns `NotFound` for unknown or invisible layouts.
pub async fn get_layout(
    pool: &PgPool,
    user: &SessionUser,
    layout_id: Uuid,
    permission: Permission,
) -> Result<LayoutRow, LayoutError> {
    let row = sqlx::query_as::<_, LayoutTuple>(&format!("SELECT {LAYOUT_COLUMNS} FROM layouts WHERE id = $1"))
        .bind(layout_id)
        .fetch_optional(pool)
        .await?
        .map(layout_from_tuple)
        .ok_or(LayoutError::NotFound(layout_id))?;
    match project::get_project(pool, user, row.project_id, permission).await {
        Ok(_) => Ok(row),
        Err(ProjectError::NotFound(_)) => Err(LayoutError::NotFound(layout_id)),
        Err(e) => Err(e.into()),
    }
}

async fn write_layout(pool: &PgPool, layout: &LayoutRow, expected_version: i32) -> Result<LayoutRow, LayoutError> {
    let row = sqlx::query_as::<_, LayoutTuple>(&format!(
        "UPDATE layouts
         SET name = $3, background_image = $4, items = $5, version = version + 1, updated_at = now()
         WHERE id = $1 AND version = $2
         RETURNING {LAYOUT_COLUMNS}"
    ))
    .bind(layout.id)
    .bind(expected_version)
    .bind(&layout.name)
    .bind(&layout.background_image)
    .bind(Json(&layout.items))
    .fetch_optional(pool)
    .await?
    .ok_or(LayoutError::Stale)?;
    Ok(layout_from_tuple(row))
}

/// Load a layout for editing, apply `edit`, and write it back if `version`
/// still matches.
async fn edit_layout<T, F>(
    pool: &PgPool,
    user: &SessionUser,
    layout_id: Uuid,
    version: i32,
    edit: F,
) -> Result<(LayoutRow, T), LayoutError>
where
    F: FnOnce(&mut LayoutRow) -> Result<T, LayoutError>,
{
    let mut layout = get_layout(pool, user, layout_id, Permission::Edit).await?;
    if layout.version != version {
        return Err(LayoutError::Stale);
    }
    let output = edit(&mut layout)?;
    let saved = write_layout(pool, &layout, version).await?;
    Ok((saved, output))
}

/// Rename a layout and/or replace its whole item list.
///
/// # Errors
///
/// Returns `Stale` on a version mismatch.
pub async fn update_layout(
    pool: &PgPool,
    user: &SessionUser,
    layout_id: Uuid,
    version: i32,
    name: Option<&str>,
    items: Option<Vec<LayoutItem>>,
    min_size: f64,
) -> Result<LayoutRow, LayoutError> {
    let name = name.map(normalize_name).transpose()?;
    let items = match items {
        Some(items) => Some(
            items
                .into_iter()
                .map(|item| normalize_geometry(item.geometry, min_size).map(|geometry| LayoutItem { geometry, ..item }))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => None,
    };
    if let Some(items) = &items {
        let project_id = get_layout(pool, user, layout_id, Permission::View).await?.project_id;
        for item in items {
            ensure_design_in_project(pool, project_id, &item.kind).await?;
        }
    }
    let (saved, ()) = edit_layout(pool, user, layout_id, version, |layout| {
        if let Some(name) = name {
            layout.name = name;
        }
        if let Some(items) = items {
            layout.items = items;
        }
        Ok(())
    })
    .await?;
    Ok(saved)
}

/// Replace (or clear, with `None`) the background image.
///
/// # Errors
///
/// Returns image validation errors or `Stale`.
pub async fn set_background(
    pool: &PgPool,
    user: &SessionUser,
    layout_id: Uuid,
    version: i32,
    data_url: Option<String>,
    max_bytes: usize,
) -> Result<LayoutRow, LayoutError> {
    if let Some(data_url) = &data_url {
        validate_background(data_url, max_bytes)?;
    }
    let (saved, ()) = edit_layout(pool, user, layout_id, version, |layout| {
        layout.background_image = data_url;
        Ok(())
    })
    .await?;
    Ok(saved)
}

async fn ensure_design_in_project(pool: &PgPool, project_id: Uuid, kind: &LayoutItemKind) -> Result<(), LayoutError> {
    let LayoutItemKind::Panel { design_id, .. } = kind else {
        return Ok(());
    };
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM user_designs WHERE id = $1 AND project_id = $2 AND deleted_at IS NULL)",
    )
    .bind(design_id)
    .bind(project_id)
    .fetch_one(pool)
    .await?;
    if exists { Ok(()) } else { Err(LayoutError::DesignNotInProject(*design_id)) }
}

/// Place a new item on a layout.
///
/// # Errors
///
/// Returns `DesignNotInProject` for panels of foreign designs, or `Stale`.
pub async fn create_item(
    pool: &PgPool,
    user: &SessionUser,
    layout_id: Uuid,
    version: i32,
    new: NewLayoutItem,
    min_size: f64,
) -> Result<(LayoutRow, LayoutItem), LayoutError> {
    let project_id = get_layout(pool, user, layout_id, Permission::Edit).await?.project_id;
    ensure_design_in_project(pool, project_id, &new.kind).await?;
    edit_layout(pool, user, layout_id, version, |layout| add_item(&mut layout.items, new, min_size)).await
}

/// Move, resize, or relabel an item.
///
/// # Errors
///
/// Returns `ItemNotFound` or `Stale`.
pub async fn patch_item(
    pool: &PgPool,
    user: &SessionUser,
    layout_id: Uuid,
    version: i32,
    item_id: Uuid,
    patch: ItemPatch,
    min_size: f64,
) -> Result<(LayoutRow, LayoutItem), LayoutError> {
    edit_layout(pool, user, layout_id, version, |layout| update_item(&mut layout.items, item_id, patch, min_size))
        .await
}

/// Remove an item from a layout.
///
/// # Errors
///
/// Returns `ItemNotFound` or `Stale`.
pub async fn delete_item(
    pool: &PgPool,
    user: &SessionUser,
    layout_id: Uuid,
    version: i32,
    item_id: Uuid,
) -> Result<LayoutRow, LayoutError> {
    let (saved, _) =
        edit_layout(pool, user, layout_id, version, |layout| remove_item(&mut layout.items, item_id)).await?;
    Ok(saved)
}

/// Delete a layout unless it is the project's last one.
///
/// # Errors
///
/// Returns `LastLayout` when it is the only layout of its project.
pub async fn delete_layout(pool: &PgPool, user: &SessionUser, layout_id: Uuid) -> Result<(), LayoutError> {
    let project_id = get_layout(pool, user, layout_id, Permission::Edit).await?.project_id;

    let mut tx = pool.begin().await?;
    let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM layouts WHERE project_id = $1 ORDER BY id FOR UPDATE")
        .bind(project_id)
        .fetch_all(tx.as_mut())
        .await?;
    ensure_can_delete(&ids, layout_id)?;
    sqlx::query("DELETE FROM layouts WHERE id = $1")
        .bind(layout_id)
        .execute(tx.as_mut())
        .await?;
    tx.commit().await?;

    info!(%layout_id, %project_id, remaining = ids.len() - 1, "layout deleted");
    Ok(())
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod tests;
