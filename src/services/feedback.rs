//! Feedback inbox.
//!
//! Any signed-in user may submit feedback; admins triage it by status and
//! soft-delete what they are done with.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

const MESSAGE_MAX_LEN: usize = 5000;
const CATEGORY_MAX_LEN: usize = 40;

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("feedback message is empty")]
    EmptyMessage,
    #[error("feedback message is longer than {MESSAGE_MAX_LEN} characters")]
    MessageTooLong,
    #[error("feedback not found: {0}")]
    NotFound(Uuid),
    #[error("unknown feedback status: {0}")]
    UnknownStatus(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    New,
    Read,
    Resolved,
}

impl FeedbackStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Read => "read",
            Self::Resolved => "resolved",
        }
    }

    /// # Errors
    ///
    /// Returns `UnknownStatus` for anything but the three stored values.
    pub fn parse(raw: &str) -> Result<Self, FeedbackError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "read" => Ok(Self::Read),
            "resolved" => Ok(Self::Resolved),
            other => Err(FeedbackError::UnknownStatus(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    pub message: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRow {
    pub id: Uuid,
    pub user_email: Option<String>,
    pub category: String,
    pub message: String,
    pub page: Option<String>,
    pub status: FeedbackStatus,
    /// Epoch milliseconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedbackQuery {
    pub status: Option<FeedbackStatus>,
    pub oldest_first: bool,
}

/// Trim and bound a submission.
///
/// # Errors
///
/// Returns `EmptyMessage` or `MessageTooLong`.
pub fn prepare(new: NewFeedback) -> Result<NewFeedback, FeedbackError> {
    let message = new.message.trim().to_owned();
    if message.is_empty() {
        return Err(FeedbackError::EmptyMessage);
    }
    if message.chars().count() > MESSAGE_MAX_LEN {
        return Err(FeedbackError::MessageTooLong);
    }
    let category = new
        .category
        .map(|c| c.trim().to_lowercase().chars().take(CATEGORY_MAX_LEN).collect::<String>())
        .filter(|c| !c.is_empty());
    let page = new.page.map(|p| p.trim().to_owned()).filter(|p| !p.is_empty());
    Ok(NewFeedback { message, category, page })
}

/// Store a submission.
///
/// # Errors
///
/// Returns validation or database errors.
pub async fn submit(pool: &PgPool, user_email: &str, new: NewFeedback) -> Result<Uuid, FeedbackError> {
    let new = prepare(new)?;
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO feedback (id, user_email, category, message, page)
         VALUES ($1, $2, COALESCE($3, 'general'), $4, $5)",
    )
    .bind(id)
    .bind(user_email)
    .bind(&new.category)
    .bind(&new.message)
    .bind(&new.page)
    .execute(pool)
    .await?;
    info!(%id, %user_email, "feedback submitted");
    Ok(id)
}

/// List live feedback, newest first unless asked otherwise.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list(pool: &PgPool, query: &FeedbackQuery) -> Result<Vec<FeedbackRow>, FeedbackError> {
    let order = if query.oldest_first { "ASC" } else { "DESC" };
    let rows = sqlx::query_as::<_, (Uuid, Option<String>, String, String, Option<String>, String, i64)>(&format!(
        "SELECT id, user_email, category, message, page, status,
                (extract(epoch FROM created_at) * 1000)::BIGINT
         FROM feedback
         WHERE deleted_at IS NULL AND ($1::TEXT IS NULL OR status = $1)
         ORDER BY created_at {order}"
    ))
    .bind(query.status.map(FeedbackStatus::as_str))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id, user_email, category, message, page, status, created_at)| {
            Ok(FeedbackRow { id, user_email, category, message, page, status: FeedbackStatus::parse(&status)?, created_at })
        })
        .collect()
}

/// Change the triage status of a feedback entry.
///
/// # Errors
///
/// Returns `NotFound` for unknown or deleted entries.
pub async fn set_status(pool: &PgPool, id: Uuid, status: FeedbackStatus) -> Result<(), FeedbackError> {
    let result = sqlx::query("UPDATE feedback SET status = $2 WHERE id = $1 AND deleted_at IS NULL")
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(FeedbackError::NotFound(id));
    }
    info!(%id, status = status.as_str(), "feedback status changed");
    Ok(())
}

/// Soft-delete a feedback entry.
///
/// # Errors
///
/// Returns `NotFound` for unknown or already deleted entries.
pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<(), FeedbackError> {
    let result = sqlx::query("UPDATE feedback SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(FeedbackError::NotFound(id));
    }
    info!(%id, "feedback deleted");
    Ok(())
}

#[cfg(test)]
#[path = "feedback_test.rs"]
mod tests;
