//! Project service: project CRUD and saving carts as design revisions.
//!
//! DESIGN
//! ======
//! A project belongs to a property and inherits its access. Saving a cart
//! writes one `user_designs` row (the whole cart as `design_data`) plus one
//! `panel_configurations` row per cart item.
//!
//! Revision numbers are allocated inside the insert transaction. A
//! transaction-scoped advisory lock keyed on `(property_id, base_name)`
//! serializes concurrent saves of the same base, and the unique index on
//! `(property_id, base_name, revision)` rejects anything that slips past.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::cart::Cart;
use crate::revision;
use crate::services::access::{self, AccessError, Permission};
use crate::services::design::DesignRow;
use crate::services::session::SessionUser;

const PROJECT_NAME_MAX_LEN: usize = 200;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("project not found: {0}")]
    NotFound(Uuid),
    #[error("project name must be 1-{PROJECT_NAME_MAX_LEN} characters")]
    InvalidName,
    #[error("design name is required")]
    MissingDesignName,
    #[error("BOQ quantity must not be negative")]
    NegativeBoq,
    #[error("cart is empty")]
    EmptyCart,
    #[error("revision limit reached for {0}")]
    RevisionLimit(String),
    #[error("design {design_id} being edited belongs to another project; save it to project {project_id}")]
    EditedElsewhere { design_id: Uuid, project_id: Uuid },
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("failed to encode design: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectRow {
    pub id: Uuid,
    pub property_id: Uuid,
    pub project_name: String,
    pub project_code: Option<String>,
    pub boq_quantity: Option<i32>,
    pub created_by: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

type ProjectTuple = (Uuid, Uuid, String, Option<String>, Option<i32>, Option<String>, i64);

fn project_from_tuple(row: ProjectTuple) -> ProjectRow {
    let (id, property_id, project_name, project_code, boq_quantity, created_by, created_at) = row;
    ProjectRow { id, property_id, project_name, project_code, boq_quantity, created_by, created_at }
}

const PROJECT_COLUMNS: &str = "p.id, p.property_id, p.project_name, p.project_code, p.boq_quantity, p.created_by,
     (extract(epoch FROM p.created_at) * 1000)::BIGINT";

#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub property_id: Uuid,
    pub project_name: String,
    #[serde(default)]
    pub project_code: Option<String>,
    #[serde(default)]
    pub boq_quantity: Option<i32>,
}

/// Base name for saving an edited design into `target_project`. Revisions of
/// an edited design stay in the project it was loaded from.
///
/// # Errors
///
/// Returns `EditedElsewhere` when the design belongs to another project.
pub fn edited_base_name(design: &DesignRow, target_project: Uuid) -> Result<String, ProjectError> {
    if design.project_id != target_project {
        return Err(ProjectError::EditedElsewhere { design_id: design.id, project_id: design.project_id });
    }
    Ok(design.base_name.clone())
}

/// Result of saving a cart.
#[derive(Debug, Clone, Serialize)]
pub struct SavedDesign {
    pub id: Uuid,
    pub project_id: Uuid,
    pub design_name: String,
    pub base_name: String,
    pub revision: u32,
    pub total_quantity: u32,
    pub panel_count: usize,
}

/// Trimmed, length-checked project name.
///
/// # Errors
///
/// Returns `InvalidName` for blank or overlong names.
pub fn normalize_project_name(raw: &str) -> Result<String, ProjectError> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > PROJECT_NAME_MAX_LEN {
        return Err(ProjectError::InvalidName);
    }
    Ok(name.to_owned())
}

/// Advisory lock key for revision allocation of one base name.
#[must_use]
pub fn revision_lock_key(property_id: Uuid, base: &str) -> String {
    format!("{property_id}:{}", base.trim())
}

fn db_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a project under a property the user can edit.
///
/// # Errors
///
/// Returns validation, access, or database errors.
pub async fn create_project(pool: &PgPool, user: &SessionUser, new: NewProject) -> Result<ProjectRow, ProjectError> {
    let project_name = normalize_project_name(&new.project_name)?;
    if new.boq_quantity.is_some_and(|q| q < 0) {
        return Err(ProjectError::NegativeBoq);
    }
    access::ensure_property_access(pool, user, new.property_id, Permission::Edit).await?;

    let id = Uuid::new_v4();
    let project_code = new.project_code.map(|c| c.trim().to_owned()).filter(|c| !c.is_empty());
    let created_at: i64 = sqlx::query_scalar(
        "INSERT INTO user_projects (id, property_id, project_name, project_code, boq_quantity, created_by)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING (extract(epoch FROM created_at) * 1000)::BIGINT",
    )
    .bind(id)
    .bind(new.property_id)
    .bind(&project_name)
    .bind(&project_code)
    .bind(new.boq_quantity)
    .bind(&user.email)
    .fetch_one(pool)
    .await?;

    info!(%id, property_id = %new.property_id, name = %project_name, "project created");
    Ok(ProjectRow {
        id,
        property_id: new.property_id,
        project_name,
        project_code,
        boq_quantity: new.boq_quantity,
        created_by: Some(user.email.clone()),
        created_at,
    })
}

/// List projects the user can see, optionally within one property.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_projects(
    pool: &PgPool,
    user: &SessionUser,
    property_id: Option<Uuid>,
) -> Result<Vec<ProjectRow>, ProjectError> {
    let rows = if user.is_admin {
        sqlx::query_as::<_, ProjectTuple>(&format!(
            "SELECT {PROJECT_COLUMNS}
             FROM user_projects p
             WHERE ($1::UUID IS NULL OR p.property_id = $1)
             ORDER BY p.created_at DESC"
        ))
        .bind(property_id)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, ProjectTuple>(&format!(
            "SELECT {PROJECT_COLUMNS}
             FROM user_projects p
             WHERE ($2::UUID IS NULL OR p.property_id = $2)
               AND p.property_id IN (
                 SELECT a.property_id FROM users u
                 JOIN ug_property_access a ON a.ug_id = u.ug_id
                 WHERE u.id = $1)
             ORDER BY p.created_at DESC"
        ))
        .bind(user.id)
        .bind(property_id)
        .fetch_all(pool)
        .await?
    };
    Ok(rows.into_iter().map(project_from_tuple).collect())
}

/// Fetch one project, requiring `permission` on its property.
///
/// # Errors
///
/// Returns `NotFound` for unknown projects and access errors otherwise.
pub async fn get_project(
    pool: &PgPool,
    user: &SessionUser,
    project_id: Uuid,
    permission: Permission,
) -> Result<ProjectRow, ProjectError> {
    let row = sqlx::query_as::<_, ProjectTuple>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM user_projects p WHERE p.id = $1"
    ))
    .bind(project_id)
    .fetch_optional(pool)
    .await?
    .map(project_from_tuple)
    .ok_or(ProjectError::NotFound(project_id))?;

    match access::ensure_property_access(pool, user, row.property_id, permission).await {
        Ok(()) => Ok(row),
        // Hide projects of properties the user cannot see.
        Err(AccessError::PropertyNotFound(_)) => Err(ProjectError::NotFound(project_id)),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// SAVE
// =============================================================================

/// Save the cart as the next revision of `design_name` in a project.
///
/// Any `(revN)` suffix on `design_name` is ignored; the revision is always
/// allocated from what is already stored for the base name.
///
/// # Errors
///
/// Returns `EmptyCart`, `MissingDesignName`, access, or database errors.
pub async fn save_design_revision(
    pool: &PgPool,
    user: &SessionUser,
    project_id: Uuid,
    design_name: &str,
    cart: &Cart,
) -> Result<SavedDesign, ProjectError> {
    if cart.is_empty() {
        return Err(ProjectError::EmptyCart);
    }
    let base = revision::base_name(design_name).to_owned();
    if base.is_empty() {
        return Err(ProjectError::MissingDesignName);
    }
    let project = get_project(pool, user, project_id, Permission::Edit).await?;

    let design_data = serde_json::to_value(cart.items())?;
    let total_quantity = cart.total_quantity();

    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(revision_lock_key(project.property_id, &base))
        .execute(tx.as_mut())
        .await?;

    let existing: Vec<String> =
        sqlx::query_scalar("SELECT design_name FROM user_designs WHERE property_id = $1 AND base_name = $2")
            .bind(project.property_id)
            .bind(&base)
            .fetch_all(tx.as_mut())
            .await?;

    let next = revision::allocate_revision(&base, existing.iter().map(String::as_str));
    let revision_col = i32::try_from(next).map_err(|_| ProjectError::RevisionLimit(base.clone()))?;
    let name = revision::format_revision(&base, next);

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO user_designs
            (id, project_id, property_id, design_name, base_name, revision, design_data, total_quantity, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(id)
    .bind(project.id)
    .bind(project.property_id)
    .bind(&name)
    .bind(&base)
    .bind(revision_col)
    .bind(&design_data)
    .bind(db_int(total_quantity))
    .bind(&user.email)
    .execute(tx.as_mut())
    .await?;

    for (position, item) in cart.items().iter().enumerate() {
        sqlx::query(
            "INSERT INTO panel_configurations (id, design_id, position, panel_type, quantity, config)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(i32::try_from(position).unwrap_or(i32::MAX))
        .bind(item.design.panel_type().as_str())
        .bind(db_int(item.quantity))
        .bind(serde_json::to_value(&item.design)?)
        .execute(tx.as_mut())
        .await?;
    }
    tx.commit().await?;

    info!(%id, %project_id, design = %name, revision = next, panels = cart.items().len(), "design revision saved");
    Ok(SavedDesign {
        id,
        project_id,
        design_name: name,
        base_name: base,
        revision: next,
        total_quantity,
        panel_count: cart.items().len(),
    })
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
