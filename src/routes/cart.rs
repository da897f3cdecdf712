//! Cart routes: assembling panels and editing their cells.
//!
//! DESIGN
//! ======
//! The cart lives in `AppState::carts` under the session token. Panel edits
//! are applied to a copy of the item's design and written back through
//! `Cart::replace_design`, so a rejected edit never leaves a half-applied
//! design behind.

use axum::extract::{Path, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::{Cart, CartError, CartItem, CartSummary};
use crate::panel::{
    MoveOutcome, PanelDesign, PanelDimension, PanelMode, PanelStyle, PanelType, PlacedIcon, icons,
};
use crate::routes::error::ApiError;
use crate::routes::session::Session;
use crate::state::AppState;

// =============================================================================
// RESPONSES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub total_quantity: u32,
    pub boq_limit: Option<u32>,
    pub remaining: Option<u32>,
}

impl From<CartSummary<'_>> for CartResponse {
    fn from(summary: CartSummary<'_>) -> Self {
        Self {
            items: summary.items.to_vec(),
            total_quantity: summary.total_quantity,
            boq_limit: summary.boq_limit,
            remaining: summary.remaining,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub item: CartItem,
    pub cart: CartResponse,
}

#[derive(Debug, Serialize)]
pub struct EditResponse<T: Serialize> {
    pub result: T,
    pub item: CartItem,
}

/// Run `f` against the session's cart, creating an empty one on first use.
async fn with_cart<T>(
    state: &AppState,
    token: &str,
    f: impl FnOnce(&mut Cart) -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    let mut carts = state.carts.write().await;
    let cart = carts.entry(token.to_owned()).or_default();
    f(cart)
}

/// Apply `edit` to a copy of one item's design and store it if it validates.
async fn edit_design<T: Serialize>(
    state: &AppState,
    token: &str,
    item_id: Uuid,
    edit: impl FnOnce(&mut PanelDesign) -> Result<T, ApiError>,
) -> Result<Json<EditResponse<T>>, ApiError> {
    with_cart(state, token, |cart| {
        let mut design = cart
            .get(item_id)
            .map(|item| item.design.clone())
            .ok_or_else(|| ApiError::from(CartError::ItemNotFound(item_id)))?;
        let result = edit(&mut design)?;
        let item = cart.replace_design(item_id, design)?.clone();
        Ok(Json(EditResponse { result, item }))
    })
    .await
}

// =============================================================================
// CART
// =============================================================================

/// `GET /api/cart`: read-only, so a session that never adds anything holds
/// no cart entry.
pub async fn get_cart(State(state): State<AppState>, session: Session) -> Json<CartResponse> {
    let carts = state.carts.read().await;
    match carts.get(&session.token) {
        Some(cart) => Json(CartResponse::from(cart.summary())),
        None => Json(CartResponse::from(Cart::new().summary())),
    }
}

/// `DELETE /api/cart`
pub async fn clear_cart(State(state): State<AppState>, session: Session) -> Result<Json<CartResponse>, ApiError> {
    with_cart(&state, &session.token, |cart| {
        cart.clear();
        Ok(Json(CartResponse::from(cart.summary())))
    })
    .await
}

#[derive(Deserialize)]
pub struct BoqBody {
    pub limit: Option<u32>,
}

/// `PUT /api/cart/boq`: set or lift the BOQ limit.
pub async fn set_boq(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<BoqBody>,
) -> Result<Json<CartResponse>, ApiError> {
    with_cart(&state, &session.token, |cart| {
        cart.set_boq_limit(body.limit)?;
        Ok(Json(CartResponse::from(cart.summary())))
    })
    .await
}

#[derive(Deserialize)]
pub struct AddItemBody {
    pub panel_type: Option<String>,
    #[serde(default)]
    pub dimension: PanelDimension,
    /// A complete design, e.g. a copy of another item.
    pub design: Option<serde_json::Value>,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

fn design_from_body(body: AddItemBody) -> Result<PanelDesign, ApiError> {
    if let Some(design) = body.design {
        return Ok(PanelDesign::from_value(design)?);
    }
    let raw = body.panel_type.ok_or_else(|| ApiError::bad_request("panel_type or design is required"))?;
    let panel_type =
        PanelType::from_str(&raw).ok_or_else(|| ApiError::bad_request(format!("unknown panel type {raw}")))?;
    Ok(PanelDesign::new(panel_type, body.dimension))
}

/// `POST /api/cart/items`
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<AddItemBody>,
) -> Result<Json<ItemResponse>, ApiError> {
    let quantity = body.quantity;
    let design = design_from_body(body)?;
    with_cart(&state, &session.token, |cart| {
        let item = cart.add(design, quantity)?.clone();
        Ok(Json(ItemResponse { item, cart: CartResponse::from(cart.summary()) }))
    })
    .await
}

#[derive(Deserialize)]
pub struct ReplaceBody {
    pub design: serde_json::Value,
}

/// `PUT /api/cart/items/{item_id}`: replace an item's whole design.
pub async fn replace_item(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<Uuid>,
    Json(body): Json<ReplaceBody>,
) -> Result<Json<CartItem>, ApiError> {
    let design = PanelDesign::from_value(body.design)?;
    with_cart(&state, &session.token, |cart| Ok(Json(cart.replace_design(item_id, design)?.clone()))).await
}

/// `DELETE /api/cart/items/{item_id}`
pub async fn remove_item(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    with_cart(&state, &session.token, |cart| {
        cart.remove(item_id)?;
        Ok(Json(CartResponse::from(cart.summary())))
    })
    .await
}

#[derive(Deserialize)]
pub struct QuantityBody {
    pub quantity: u32,
}

/// `PUT /api/cart/items/{item_id}/quantity`
pub async fn set_quantity(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<Uuid>,
    Json(body): Json<QuantityBody>,
) -> Result<Json<ItemResponse>, ApiError> {
    with_cart(&state, &session.token, |cart| {
        let item = cart.set_quantity(item_id, body.quantity)?.clone();
        Ok(Json(ItemResponse { item, cart: CartResponse::from(cart.summary()) }))
    })
    .await
}

#[derive(Deserialize)]
pub struct ReorderBody {
    pub from: usize,
    pub to: usize,
}

/// `POST /api/cart/reorder`
pub async fn reorder(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<ReorderBody>,
) -> Result<Json<CartResponse>, ApiError> {
    with_cart(&state, &session.token, |cart| {
        cart.move_item(body.from, body.to)?;
        Ok(Json(CartResponse::from(cart.summary())))
    })
    .await
}

// =============================================================================
// PANEL EDITING
// =============================================================================

#[derive(Deserialize)]
pub struct PlaceIconBody {
    pub icon_id: String,
    /// Target cell; the first legal empty cell when absent.
    pub position: Option<usize>,
    /// Custom caption replacing the catalog label.
    pub label: Option<String>,
}

/// `POST /api/cart/items/{item_id}/icons`
pub async fn place_icon(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<Uuid>,
    Json(body): Json<PlaceIconBody>,
) -> Result<Json<EditResponse<PlacedIcon>>, ApiError> {
    let icon = icons::find(&body.icon_id)
        .ok_or_else(|| ApiError::not_found(format!("unknown icon {}", body.icon_id)))?;
    let mut spec = icon.spec();
    if let Some(label) = body.label.map(|l| l.trim().to_owned()).filter(|l| !l.is_empty()) {
        spec.label = label;
    }
    edit_design(&state, &session.token, item_id, |design| {
        let grid = design.grid_mut();
        let placed = match body.position {
            Some(position) => grid.place_at(&spec, position)?,
            None => grid.place_first_free(&spec)?,
        };
        Ok(placed)
    })
    .await
}

#[derive(Deserialize)]
pub struct MoveBody {
    pub from: usize,
    pub to: usize,
}

/// `POST /api/cart/items/{item_id}/icons/move`: drag onto an empty cell
/// (move) or an occupied one (swap).
pub async fn move_icon(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<Uuid>,
    Json(body): Json<MoveBody>,
) -> Result<Json<EditResponse<MoveOutcome>>, ApiError> {
    edit_design(&state, &session.token, item_id, |design| {
        design.grid_mut().move_icon(body.from, body.to).map_err(ApiError::from)
    })
    .await
}

/// `DELETE /api/cart/items/{item_id}/icons/{position}`
pub async fn remove_icon(
    State(state): State<AppState>,
    session: Session,
    Path((item_id, position)): Path<(Uuid, usize)>,
) -> Result<Json<EditResponse<PlacedIcon>>, ApiError> {
    edit_design(&state, &session.token, item_id, |design| {
        design.grid_mut().remove_at(position).map_err(ApiError::from)
    })
    .await
}

#[derive(Serialize)]
pub struct PirState {
    pub enabled: bool,
}

/// `POST /api/cart/items/{item_id}/pir`: switch the motion sensor on or off.
pub async fn toggle_pir(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<Uuid>,
) -> Result<Json<EditResponse<PirState>>, ApiError> {
    let spec = icons::find("PIR")
        .map(icons::CatalogIcon::spec)
        .ok_or_else(|| ApiError::internal(&"motion sensor missing from icon catalog"))?;
    edit_design(&state, &session.token, item_id, |design| {
        Ok(PirState { enabled: design.grid_mut().toggle_pir(&spec)? })
    })
    .await
}

#[derive(Deserialize)]
pub struct TextBody {
    pub text: String,
}

/// `PUT /api/cart/items/{item_id}/texts/{position}`: set or clear (blank)
/// a cell's text.
pub async fn set_text(
    State(state): State<AppState>,
    session: Session,
    Path((item_id, position)): Path<(Uuid, usize)>,
    Json(body): Json<TextBody>,
) -> Result<Json<EditResponse<()>>, ApiError> {
    edit_design(&state, &session.token, item_id, |design| {
        design.grid_mut().set_text(position, &body.text).map_err(ApiError::from)
    })
    .await
}

#[derive(Deserialize)]
pub struct StyleBody {
    pub style: Option<PanelStyle>,
    pub mode: Option<PanelMode>,
    pub dimension: Option<PanelDimension>,
}

/// `PUT /api/cart/items/{item_id}/style`: colours, fonts, mode, and size.
pub async fn set_style(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<Uuid>,
    Json(body): Json<StyleBody>,
) -> Result<Json<EditResponse<()>>, ApiError> {
    edit_design(&state, &session.token, item_id, |design| {
        let grid = design.grid_mut();
        if let Some(dimension) = body.dimension {
            grid.set_dimension(dimension)?;
        }
        if let Some(mode) = body.mode {
            grid.set_mode(mode);
        }
        if let Some(style) = body.style {
            grid.style = style;
        }
        Ok(())
    })
    .await
}

#[cfg(test)]
#[path = "cart_test.rs"]
mod tests;
