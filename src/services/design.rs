//! Design service: browsing, loading, and soft-deleting saved designs.
//!
//! DESIGN
//! ======
//! Saved designs are immutable revisions (see `services::project`). The
//! browser filters them by property, project, name, and panel type; the
//! filter SQL is assembled with `QueryBuilder` so every user value is bound.
//! Non-admin users only ever see designs of properties they can reach.
//!
//! Loading a design for edit decodes `design_data` back into cart items.
//! Imported designs may carry only `panel_configurations` rows, so those are
//! decoded as a fallback.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cart::CartItem;
use crate::panel::{PanelDesign, PanelType, PanelValidationError};
use crate::services::access::{self, AccessError, Permission};
use crate::services::session::SessionUser;

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 500;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DesignError {
    #[error("design not found: {0}")]
    NotFound(Uuid),
    #[error("design {id} cannot be loaded: {reason}")]
    Corrupt { id: Uuid, reason: String },
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct DesignRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub property_id: Uuid,
    pub project_name: String,
    pub design_name: String,
    pub base_name: String,
    pub revision: i32,
    pub total_quantity: i32,
    pub created_by: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

type DesignTuple = (Uuid, Uuid, Uuid, String, String, String, i32, i32, Option<String>, i64, Option<i64>);

fn design_from_tuple(row: DesignTuple) -> DesignRow {
    let (id, project_id, property_id, project_name, design_name, base_name, revision, total_quantity, created_by, created_at, deleted_at) =
        row;
    DesignRow {
        id,
        project_id,
        property_id,
        project_name,
        design_name,
        base_name,
        revision,
        total_quantity,
        created_by,
        created_at,
        deleted_at,
    }
}

const DESIGN_SELECT: &str = "SELECT d.id, d.project_id, d.property_id, p.project_name, d.design_name, d.base_name,
        d.revision, d.total_quantity, d.created_by,
        (extract(epoch FROM d.created_at) * 1000)::BIGINT,
        (extract(epoch FROM d.deleted_at) * 1000)::BIGINT
     FROM user_designs d
     JOIN user_projects p ON p.id = d.project_id
     WHERE true";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignSort {
    NameAsc,
    NameDesc,
    #[default]
    NewestFirst,
    OldestFirst,
}

impl DesignSort {
    fn order_by(self) -> &'static str {
        match self {
            Self::NameAsc => " ORDER BY d.base_name ASC, d.revision ASC",
            Self::NameDesc => " ORDER BY d.base_name DESC, d.revision DESC",
            Self::NewestFirst => " ORDER BY d.created_at DESC",
            Self::OldestFirst => " ORDER BY d.created_at ASC",
        }
    }
}

/// Browser filters, taken from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DesignFilter {
    pub property_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub search: Option<String>,
    pub panel_type: Option<String>,
    pub sort: DesignSort,
    pub include_deleted: bool,
    pub limit: Option<i64>,
}

/// Which designs a query may return.
#[derive(Debug, Clone, Copy)]
pub enum DesignScope {
    All,
    User(Uuid),
}

impl DesignScope {
    #[must_use]
    pub fn for_user(user: &SessionUser) -> Self {
        if user.is_admin { Self::All } else { Self::User(user.id) }
    }
}

/// A design with its decoded panels.
#[derive(Debug, Clone, Serialize)]
pub struct DesignDetail {
    #[serde(flatten)]
    pub row: DesignRow,
    pub items: Vec<CartItem>,
}

// =============================================================================
// QUERY BUILDING
// =============================================================================

/// Escape `LIKE` wildcards in user search text.
#[must_use]
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Append `AND ...` clauses for `filter` and `scope` to a query whose
/// `WHERE` is already open. Unknown panel types match nothing.
pub fn push_design_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &DesignFilter, scope: DesignScope) {
    if let DesignScope::User(user_id) = scope {
        builder.push(
            " AND d.property_id IN (SELECT a.property_id FROM users u
               JOIN ug_property_access a ON a.ug_id = u.ug_id WHERE u.id = ",
        );
        builder.push_bind(user_id);
        builder.push(")");
    }
    if !filter.include_deleted {
        builder.push(" AND d.deleted_at IS NULL");
    }
    if let Some(property_id) = filter.property_id {
        builder.push(" AND d.property_id = ");
        builder.push_bind(property_id);
    }
    if let Some(project_id) = filter.project_id {
        builder.push(" AND d.project_id = ");
        builder.push_bind(project_id);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        builder.push(" AND d.design_name ILIKE ");
        builder.push_bind(like_pattern(search));
    }
    if let Some(raw) = filter.panel_type.as_deref().filter(|s| !s.trim().is_empty()) {
        match PanelType::from_str(raw) {
            Some(panel_type) => {
                builder.push(
                    " AND EXISTS (SELECT 1 FROM panel_configurations pc WHERE pc.design_id = d.id AND pc.panel_type = ",
                );
                builder.push_bind(panel_type.as_str());
                builder.push(")");
            }
            None => {
                builder.push(" AND false");
            }
        }
    }
    builder.push(filter.sort.order_by());
    builder.push(" LIMIT ");
    builder.push_bind(filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE));
}

// =============================================================================
// DECODING
// =============================================================================

/// Decode stored `design_data` into cart items, validating each panel.
///
/// # Errors
///
/// Returns the first malformed or invalid panel.
pub fn decode_design_items(data: serde_json::Value) -> Result<Vec<CartItem>, PanelValidationError> {
    let items: Vec<CartItem> =
        serde_json::from_value(data).map_err(|e| PanelValidationError::Malformed(e.to_string()))?;
    for item in &items {
        item.design.validate()?;
    }
    Ok(items)
}

/// Decode one `panel_configurations` row. A config without its own `type`
/// takes the row's `panel_type`.
///
/// # Errors
///
/// Returns a validation error for malformed configs.
pub fn decode_panel_config(
    panel_type: &str,
    quantity: i32,
    mut config: serde_json::Value,
) -> Result<CartItem, PanelValidationError> {
    let panel_type = PanelType::from_str(panel_type)
        .ok_or_else(|| PanelValidationError::Malformed(format!("unknown panel type {panel_type}")))?;
    match config.as_object_mut() {
        Some(map) => {
            map.entry("type").or_insert_with(|| panel_type.as_str().into());
        }
        None => config = serde_json::json!({ "type": panel_type.as_str() }),
    }
    let design = PanelDesign::from_value(config)?;
    Ok(CartItem { id: Uuid::new_v4(), design, quantity: u32::try_from(quantity.max(1)).unwrap_or(1) })
}

// =============================================================================
// QUERIES
// =============================================================================

/// List designs visible to the user.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_designs(pool: &PgPool, user: &SessionUser, filter: &DesignFilter) -> Result<Vec<DesignRow>, DesignError> {
    let mut builder = QueryBuilder::new(DESIGN_SELECT);
    push_design_filters(&mut builder, filter, DesignScope::for_user(user));
    let rows = builder.build_query_as::<DesignTuple>().fetch_all(pool).await?;
    Ok(rows.into_iter().map(design_from_tuple).collect())
}

async fn fetch_design(pool: &PgPool, design_id: Uuid) -> Result<(DesignRow, serde_json::Value), DesignError> {
    let mut builder = QueryBuilder::new(DESIGN_SELECT);
    builder.push(" AND d.id = ");
    builder.push_bind(design_id);
    let row = builder
        .build_query_as::<DesignTuple>()
        .fetch_optional(pool)
        .await?
        .map(design_from_tuple)
        .ok_or(DesignError::NotFound(design_id))?;

    let data: serde_json::Value = sqlx::query_scalar("SELECT design_data FROM user_designs WHERE id = $1")
        .bind(design_id)
        .fetch_one(pool)
        .await?;
    Ok((row, data))
}

async fn require_access(
    pool: &PgPool,
    user: &SessionUser,
    row: &DesignRow,
    permission: Permission,
) -> Result<(), DesignError> {
    match access::ensure_property_access(pool, user, row.property_id, permission).await {
        Ok(()) => Ok(()),
        Err(AccessError::PropertyNotFound(_)) => Err(DesignError::NotFound(row.id)),
        Err(e) => Err(e.into()),
    }
}

async fn load_items(pool: &PgPool, design_id: Uuid, data: serde_json::Value) -> Result<Vec<CartItem>, DesignError> {
    let stored = decode_design_items(data).map_err(|e| DesignError::Corrupt { id: design_id, reason: e.to_string() })?;
    if !stored.is_empty() {
        return Ok(stored);
    }

    let rows = sqlx::query_as::<_, (String, i32, serde_json::Value)>(
        "SELECT panel_type, quantity, config FROM panel_configurations WHERE design_id = $1 ORDER BY position ASC",
    )
    .bind(design_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(panel_type, quantity, config)| {
            decode_panel_config(&panel_type, quantity, config)
                .map_err(|e| DesignError::Corrupt { id: design_id, reason: e.to_string() })
        })
        .collect()
}

/// Fetch a live design with its panels.
///
/// # Errors
///
/// Returns `NotFound` for unknown, deleted, or invisible designs.
pub async fn get_design(pool: &PgPool, user: &SessionUser, design_id: Uuid) -> Result<DesignDetail, DesignError> {
    let (row, data) = fetch_design(pool, design_id).await?;
    if row.deleted_at.is_some() && !user.is_admin {
        return Err(DesignError::NotFound(design_id));
    }
    require_access(pool, user, &row, Permission::View).await?;
    let items = load_items(pool, design_id, data).await.inspect_err(|e| {
        warn!(%design_id, error = %e, "stored design failed to decode");
    })?;
    Ok(DesignDetail { row, items })
}

/// Soft-delete a design.
///
/// # Errors
///
/// Returns `NotFound` if the design is unknown or already deleted.
pub async fn soft_delete_design(pool: &PgPool, user: &SessionUser, design_id: Uuid) -> Result<(), DesignError> {
    let (row, _) = fetch_design(pool, design_id).await?;
    require_access(pool, user, &row, Permission::Edit).await?;
    let result = sqlx::query("UPDATE user_designs SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
        .bind(design_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DesignError::NotFound(design_id));
    }
    info!(%design_id, by = %user.email, "design soft-deleted");
    Ok(())
}

/// Restore a soft-deleted design. Admin only.
///
/// # Errors
///
/// Returns `AdminRequired` for non-admins and `NotFound` if nothing changed.
pub async fn restore_design(pool: &PgPool, user: &SessionUser, design_id: Uuid) -> Result<(), DesignError> {
    access::ensure_admin(user)?;
    let result = sqlx::query("UPDATE user_designs SET deleted_at = NULL WHERE id = $1 AND deleted_at IS NOT NULL")
        .bind(design_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DesignError::NotFound(design_id));
    }
    info!(%design_id, by = %user.email, "design restored");
    Ok(())
}

#[cfg(test)]
#[path = "design_test.rs"]
mod tests;
