//! API error responses.
//!
//! Every handler failure renders as `{"success": false, "message": ...}` with
//! an optional `notice` for placement rejections that explain themselves
//! (the DND/MUR wiring rules). Database failures are logged and reported
//! with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::cart::CartError;
use crate::panel::{PanelValidationError, PlacementError};
use crate::services::access::AccessError;
use crate::services::design::DesignError;
use crate::services::feedback::FeedbackError;
use crate::services::layout::LayoutError;
use crate::services::project::ProjectError;
use crate::services::session::SessionError;

const INTERNAL_MESSAGE: &str = "something went wrong; please try again";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub notice: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'a str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), notice: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "sign in to continue")
    }

    /// Log `err` and hide it behind a generic 500.
    pub fn internal(err: &dyn std::fmt::Display) -> Self {
        tracing::error!(error = %err, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { success: false, message: &self.message, notice: self.notice };
        (self.status, Json(body)).into_response()
    }
}

// =============================================================================
// SERVICE ERROR MAPPING
// =============================================================================

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::internal(&err)
    }
}

impl From<PlacementError> for ApiError {
    fn from(err: PlacementError) -> Self {
        let notice = err.notice();
        Self { status: StatusCode::UNPROCESSABLE_ENTITY, message: err.to_string(), notice }
    }
}

impl From<PanelValidationError> for ApiError {
    fn from(err: PanelValidationError) -> Self {
        match err {
            PanelValidationError::Placement(inner) => inner.into(),
            other => Self::new(StatusCode::UNPROCESSABLE_ENTITY, other.to_string()),
        }
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ItemNotFound(_) => Self::not_found(err.to_string()),
            CartError::InvalidDesign(inner) => inner.into(),
            CartError::BoqExceeded { .. } | CartError::LimitBelowTotal { .. } => {
                Self::new(StatusCode::CONFLICT, err.to_string())
            }
            CartError::IndexOutOfRange { .. } | CartError::ZeroQuantity | CartError::Empty => {
                Self::bad_request(err.to_string())
            }
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::PropertyNotFound(_) => Self::not_found(err.to_string()),
            AccessError::ReadOnly(_) | AccessError::AdminRequired => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            AccessError::Database(e) => Self::internal(&e),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::UnknownUser(_) => Self::new(StatusCode::UNAUTHORIZED, err.to_string()),
            SessionError::MissingEmail => Self::bad_request(err.to_string()),
            SessionError::Database(e) => Self::internal(&e),
        }
    }
}

impl From<ProjectError> for ApiError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::NotFound(_) => Self::not_found(err.to_string()),
            ProjectError::InvalidName | ProjectError::MissingDesignName | ProjectError::NegativeBoq => {
                Self::bad_request(err.to_string())
            }
            ProjectError::EmptyCart | ProjectError::RevisionLimit(_) | ProjectError::EditedElsewhere { .. } => {
                Self::new(StatusCode::CONFLICT, err.to_string())
            }
            ProjectError::Access(inner) => inner.into(),
            ProjectError::Encode(e) => Self::internal(&e),
            ProjectError::Database(e) => Self::internal(&e),
        }
    }
}

impl From<DesignError> for ApiError {
    fn from(err: DesignError) -> Self {
        match err {
            DesignError::NotFound(_) => Self::not_found(err.to_string()),
            DesignError::Corrupt { .. } => Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            DesignError::Access(inner) => inner.into(),
            DesignError::Database(e) => Self::internal(&e),
        }
    }
}

impl From<LayoutError> for ApiError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::NotFound(_) | LayoutError::ItemNotFound(_) => Self::not_found(err.to_string()),
            LayoutError::LastLayout | LayoutError::Stale => Self::new(StatusCode::CONFLICT, err.to_string()),
            LayoutError::ImageTooLarge { .. } => Self::new(StatusCode::PAYLOAD_TOO_LARGE, err.to_string()),
            LayoutError::InvalidName
            | LayoutError::InvalidImage
            | LayoutError::InvalidGeometry
            | LayoutError::DesignNotInProject(_) => Self::bad_request(err.to_string()),
            LayoutError::Project(inner) => inner.into(),
            LayoutError::Database(e) => Self::internal(&e),
        }
    }
}

impl From<FeedbackError> for ApiError {
    fn from(err: FeedbackError) -> Self {
        match err {
            FeedbackError::NotFound(_) => Self::not_found(err.to_string()),
            FeedbackError::EmptyMessage | FeedbackError::MessageTooLong | FeedbackError::UnknownStatus(_) => {
                Self::bad_request(err.to_string())
            }
            FeedbackError::Database(e) => Self::internal(&e),
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
