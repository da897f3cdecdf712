//! Session management and per-session navigation state.
//!
//! ARCHITECTURE
//! ============
//! A session is an opaque random token (cookie) bound to a user's email. The
//! cross-page state the configurator needs (current project, edit mode, BOQ
//! imports) is an explicit `SessionState` stored with the session row and
//! handed to handlers by the session extractor, rather than being scattered
//! across client-side storage keys.

use std::collections::HashSet;
use std::fmt::Write;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no user with email {0}")]
    UnknownUser(String),
    #[error("email is required")]
    MissingEmail,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// =============================================================================
// TYPES
// =============================================================================

/// User row returned from session validation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub ug_id: Option<Uuid>,
    pub is_admin: bool,
}

/// Navigation state carried between pages of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub project_id: Option<Uuid>,
    pub project_code: Option<String>,
    pub project_name: Option<String>,
    pub edit_mode: bool,
    pub editing_design_id: Option<Uuid>,
    pub boq_project_ids: Vec<Uuid>,
    pub boq_import_results: Option<serde_json::Value>,
}

impl SessionState {
    pub fn enter_edit_mode(&mut self, design_id: Uuid) {
        self.edit_mode = true;
        self.editing_design_id = Some(design_id);
    }

    pub fn exit_edit_mode(&mut self) {
        self.edit_mode = false;
        self.editing_design_id = None;
    }

    /// Design whose next revision a save should produce, if editing.
    #[must_use]
    pub fn editing_design(&self) -> Option<Uuid> {
        if self.edit_mode { self.editing_design_id } else { None }
    }
}

/// Partial update of `SessionState`. `Some(None)` clears an optional field.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionPatch {
    #[serde(with = "double_option")]
    pub project_id: Option<Option<Uuid>>,
    #[serde(with = "double_option")]
    pub project_code: Option<Option<String>>,
    #[serde(with = "double_option")]
    pub project_name: Option<Option<String>>,
    pub edit_mode: Option<bool>,
    #[serde(with = "double_option")]
    pub editing_design_id: Option<Option<Uuid>>,
    pub boq_project_ids: Option<Vec<Uuid>>,
    #[serde(with = "double_option")]
    pub boq_import_results: Option<Option<serde_json::Value>>,
}

impl SessionPatch {
    pub fn apply(self, state: &mut SessionState) {
        if let Some(value) = self.project_id {
            state.project_id = value;
        }
        if let Some(value) = self.project_code {
            state.project_code = value;
        }
        if let Some(value) = self.project_name {
            state.project_name = value;
        }
        if let Some(value) = self.editing_design_id {
            state.editing_design_id = value;
        }
        if let Some(value) = self.edit_mode {
            state.edit_mode = value;
        }
        if !state.edit_mode {
            state.editing_design_id = None;
        }
        if let Some(value) = self.boq_project_ids {
            state.boq_project_ids = value;
        }
        if let Some(value) = self.boq_import_results {
            state.boq_import_results = value;
        }
    }
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// A validated session: who is calling and what they were doing.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub token: String,
    pub user: SessionUser,
    pub state: SessionState,
}

// =============================================================================
// QUERIES
// =============================================================================

/// Look up an imported user by email.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_user(pool: &PgPool, email: &str) -> Result<Option<SessionUser>, sqlx::Error> {
    let row = sqlx::query_as::<_, (Uuid, String, Option<String>, Option<Uuid>, bool)>(
        "SELECT id, email, name, ug_id, is_admin FROM users WHERE lower(email) = $1",
    )
    .bind(normalize_email(email))
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, email, name, ug_id, is_admin)| SessionUser { id, email, name, ug_id, is_admin }))
}

/// Create a session for an existing user, returning the record.
///
/// # Errors
///
/// Returns `UnknownUser` if no imported user has this email.
pub async fn create_session(pool: &PgPool, email: &str, ttl_hours: i32) -> Result<SessionRecord, SessionError> {
    if email.trim().is_empty() {
        return Err(SessionError::MissingEmail);
    }
    let user = find_user(pool, email)
        .await?
        .ok_or_else(|| SessionError::UnknownUser(normalize_email(email)))?;

    let token = generate_token();
    let state = SessionState::default();
    sqlx::query(
        "INSERT INTO sessions (token, user_email, context, expires_at)
         VALUES ($1, $2, $3, now() + make_interval(hours => $4))",
    )
    .bind(&token)
    .bind(&user.email)
    .bind(serde_json::to_value(&state).unwrap_or_else(|_| serde_json::json!({})))
    .bind(ttl_hours)
    .execute(pool)
    .await?;

    tracing::info!(email = %user.email, "session created");
    Ok(SessionRecord { token, user, state })
}

/// Validate a session token and return the user and state behind it.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<SessionRecord>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT u.id, u.email, u.name, u.ug_id, u.is_admin, s.context
          FROM sessions s
          JOIN users u ON u.email = s.user_email
          WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| {
        let context: serde_json::Value = r.get("context");
        SessionRecord {
            token: token.to_owned(),
            user: SessionUser {
                id: r.get("id"),
                email: r.get("email"),
                name: r.get("name"),
                ug_id: r.get("ug_id"),
                is_admin: r.get("is_admin"),
            },
            state: serde_json::from_value(context).unwrap_or_default(),
        }
    }))
}

/// Persist the navigation state of a session.
///
/// # Errors
///
/// Returns a database error if the update fails.
pub async fn save_state(pool: &PgPool, token: &str, state: &SessionState) -> Result<(), sqlx::Error> {
    let context = serde_json::to_value(state).unwrap_or_else(|_| serde_json::json!({}));
    sqlx::query("UPDATE sessions SET context = $2 WHERE token = $1")
        .bind(token)
        .bind(context)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a session by token.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete expired sessions and return which of `tokens` are still live.
///
/// # Errors
///
/// Returns a database error if either query fails.
pub async fn prune_expired(pool: &PgPool, tokens: &[String]) -> Result<HashSet<String>, sqlx::Error> {
    let pruned = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()").execute(pool).await?.rows_affected();
    if pruned > 0 {
        tracing::info!(pruned, "expired sessions deleted");
    }
    let live: Vec<String> = sqlx::query_scalar("SELECT token FROM sessions WHERE token = ANY($1)")
        .bind(tokens)
        .fetch_all(pool)
        .await?;
    Ok(live.into_iter().collect())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
