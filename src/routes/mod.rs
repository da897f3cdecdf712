//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every endpoint is JSON under `/api`, plus `/healthz` for the load
//! balancer. Handlers authenticate through the `Session` extractor and report
//! failures as `ApiError`. The import and background-upload routes accept
//! bodies up to their configured caps; everything else keeps Axum's default.

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod feedback;
pub mod layouts;
pub mod projects;
pub mod session;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let import_limit = DefaultBodyLimit::max(state.config.max_import_bytes);
    // Base64 inflates the image by a third, plus the JSON envelope.
    let background_limit = DefaultBodyLimit::max(state.config.max_background_bytes.saturating_mul(4) / 3 + 4096);

    Router::new()
        .route(
            "/api/session",
            get(session::current)
                .post(session::login)
                .patch(session::update)
                .delete(session::logout),
        )
        .route("/api/icons", get(catalog::list_icons))
        .route("/api/properties", get(catalog::list_properties))
        .route("/api/projects", get(projects::list_projects).post(projects::create_project))
        .route("/api/projects/{id}", get(projects::get_project))
        .route(
            "/api/projects/{id}/designs",
            get(projects::list_project_designs).post(projects::save_design),
        )
        .route(
            "/api/projects/{id}/layouts",
            get(projects::list_layouts).post(projects::create_layout),
        )
        .route("/api/designs/{id}", get(projects::get_design).delete(projects::delete_design))
        .route("/api/designs/{id}/edit", post(projects::edit_design))
        .route("/api/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/cart/boq", put(cart::set_boq))
        .route("/api/cart/items", post(cart::add_item))
        .route(
            "/api/cart/items/{item_id}",
            put(cart::replace_item).delete(cart::remove_item),
        )
        .route("/api/cart/items/{item_id}/quantity", put(cart::set_quantity))
        .route("/api/cart/reorder", post(cart::reorder))
        .route("/api/cart/items/{item_id}/icons", post(cart::place_icon))
        .route("/api/cart/items/{item_id}/icons/move", post(cart::move_icon))
        .route(
            "/api/cart/items/{item_id}/icons/{position}",
            delete(cart::remove_icon),
        )
        .route("/api/cart/items/{item_id}/pir", post(cart::toggle_pir))
        .route("/api/cart/items/{item_id}/texts/{position}", put(cart::set_text))
        .route("/api/cart/items/{item_id}/style", put(cart::set_style))
        .route(
            "/api/layouts/{id}",
            get(layouts::get_layout)
                .patch(layouts::update_layout)
                .delete(layouts::delete_layout),
        )
        .route(
            "/api/layouts/{id}/background",
            put(layouts::set_background).layer(background_limit),
        )
        .route("/api/layouts/{id}/items", post(layouts::add_item))
        .route(
            "/api/layouts/{id}/items/{item_id}",
            patch(layouts::patch_item).delete(layouts::delete_item),
        )
        .route("/api/feedback", post(feedback::submit))
        .route("/api/admin/feedback", get(feedback::list))
        .route(
            "/api/admin/feedback/{id}",
            patch(feedback::set_status).delete(feedback::delete),
        )
        .route("/api/admin/designs", get(admin::list_designs))
        .route("/api/admin/designs/{id}/restore", post(admin::restore_design))
        .route("/api/admin/import", post(admin::run_import).layer(import_limit.clone()))
        .route("/api/admin/import/preview", post(admin::preview_import).layer(import_limit))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
