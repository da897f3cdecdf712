//! Admin routes: the design browser across all properties and the bulk
//! JSON importer.
//!
//! The import report is also kept in the caller's session state so the
//! client can show it again after a reload.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::routes::error::ApiError;
use crate::routes::session::Session;
use crate::services::access::ensure_admin;
use crate::services::design::{self, DesignFilter, DesignRow};
use crate::services::importer::{self, ImportPreview, ImportReport, PgImportSink};
use crate::state::AppState;

/// `GET /api/admin/designs`: every design, soft-deleted ones on request.
pub async fn list_designs(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<DesignFilter>,
) -> Result<Json<Vec<DesignRow>>, ApiError> {
    ensure_admin(&session.user)?;
    Ok(Json(design::list_designs(&state.pool, &session.user, &filter).await?))
}

/// `POST /api/admin/designs/{id}/restore`
pub async fn restore_design(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    design::restore_design(&state.pool, &session.user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/admin/import/preview`: record counts, nothing written.
pub async fn preview_import(session: Session, Json(doc): Json<Value>) -> Result<Json<ImportPreview>, ApiError> {
    ensure_admin(&session.user)?;
    Ok(Json(importer::preview(&doc)))
}

/// `POST /api/admin/import`
pub async fn run_import(
    State(state): State<AppState>,
    mut session: Session,
    Json(doc): Json<Value>,
) -> Result<Json<ImportReport>, ApiError> {
    ensure_admin(&session.user)?;
    let name = importer::import_display_name(&doc);
    info!(user = %session.user.email, %name, "import started");

    let sink = PgImportSink::new(state.pool.clone());
    let report = importer::run_import(&sink, &doc).await;

    session.state.boq_import_results = Some(serde_json::to_value(&report).map_err(|e| ApiError::internal(&e))?);
    session.save(&state).await?;
    Ok(Json(report))
}
