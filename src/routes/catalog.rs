//! Read-only lookups: the icon library and the caller's properties.

use axum::extract::State;
use axum::response::Json;

use crate::panel::icons::{self, CatalogIcon};
use crate::routes::error::ApiError;
use crate::routes::session::Session;
use crate::services::access::{self, PropertyRow};
use crate::state::AppState;

/// `GET /api/icons`
pub async fn list_icons() -> Json<&'static [CatalogIcon]> {
    Json(icons::CATALOG)
}

/// `GET /api/properties`: properties the caller can reach.
pub async fn list_properties(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<PropertyRow>>, ApiError> {
    Ok(Json(access::list_properties(&state.pool, &session.user).await?))
}
