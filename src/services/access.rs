//! Access control over the property hierarchy.
//!
//! DESIGN
//! ======
//! A user reaches a property through their user group:
//! `users.ug_id -> ug_property_access(ug_id, property_id, can_edit)`.
//! Projects, designs, and layouts inherit the access of their property.
//! Admin users pass every check.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::services::session::SessionUser;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("property not found: {0}")]
    PropertyNotFound(Uuid),
    #[error("not allowed to modify property {0}")]
    ReadOnly(Uuid),
    #[error("admin access required")]
    AdminRequired,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    View,
    Edit,
}

/// Property visible to the current user.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyRow {
    pub id: Uuid,
    pub name: String,
    pub region: Option<String>,
    pub address: Option<String>,
    pub can_edit: bool,
}

#[must_use]
pub fn access_satisfies(can_edit: bool, permission: Permission) -> bool {
    match permission {
        Permission::View => true,
        Permission::Edit => can_edit,
    }
}

/// # Errors
///
/// Returns `AdminRequired` for non-admin users.
pub fn ensure_admin(user: &SessionUser) -> Result<(), AccessError> {
    if user.is_admin { Ok(()) } else { Err(AccessError::AdminRequired) }
}

/// Require `permission` on a property.
///
/// Properties the user cannot see at all are reported as not found.
///
/// # Errors
///
/// Returns `PropertyNotFound` or `ReadOnly` when access is missing.
pub async fn ensure_property_access(
    pool: &PgPool,
    user: &SessionUser,
    property_id: Uuid,
    permission: Permission,
) -> Result<(), AccessError> {
    if user.is_admin {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM property WHERE id = $1)")
            .bind(property_id)
            .fetch_one(pool)
            .await?;
        return if exists { Ok(()) } else { Err(AccessError::PropertyNotFound(property_id)) };
    }

    let can_edit: Option<bool> = sqlx::query_scalar(
        "SELECT bool_or(a.can_edit)
         FROM users u
         JOIN ug_property_access a ON a.ug_id = u.ug_id
         WHERE u.id = $1 AND a.property_id = $2",
    )
    .bind(user.id)
    .bind(property_id)
    .fetch_one(pool)
    .await?;

    match can_edit {
        None => Err(AccessError::PropertyNotFound(property_id)),
        Some(can_edit) if access_satisfies(can_edit, permission) => Ok(()),
        Some(_) => Err(AccessError::ReadOnly(property_id)),
    }
}

/// List properties the user can see.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_properties(pool: &PgPool, user: &SessionUser) -> Result<Vec<PropertyRow>, AccessError> {
    let rows = if user.is_admin {
        sqlx::query_as::<_, (Uuid, String, Option<String>, Option<String>, bool)>(
            "SELECT id, name, region, address, true FROM property ORDER BY name ASC",
        )
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, (Uuid, String, Option<String>, Option<String>, bool)>(
            "SELECT p.id, p.name, p.region, p.address, bool_or(a.can_edit)
             FROM users u
             JOIN ug_property_access a ON a.ug_id = u.ug_id
             JOIN property p ON p.id = a.property_id
             WHERE u.id = $1
             GROUP BY p.id, p.name, p.region, p.address
             ORDER BY p.name ASC",
        )
        .bind(user.id)
        .fetch_all(pool)
        .await?
    };

    Ok(rows
        .into_iter()
        .map(|(id, name, region, address, can_edit)| PropertyRow { id, name, region, address, can_edit })
        .collect())
}

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;
