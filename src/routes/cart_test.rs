use super::*;
use crate::state::test_helpers;
use axum::http::StatusCode;

fn body(value: serde_json::Value) -> AddItemBody {
    serde_json::from_value(value).unwrap()
}

async fn seeded() -> (AppState, Uuid) {
    let state = test_helpers::test_app_state();
    let mut cart = Cart::new();
    let item_id = cart.add(PanelDesign::new(PanelType::Sp, PanelDimension::Standard), 2).unwrap().id;
    test_helpers::seed_cart(&state, "tok", cart).await;
    (state, item_id)
}

#[test]
fn add_body_defaults_to_one_standard_panel() {
    let b = body(serde_json::json!({"panel_type": "tag"}));
    assert_eq!(b.quantity, 1);
    let design = design_from_body(b).unwrap();
    assert_eq!(design.panel_type(), PanelType::Tag);
    assert_eq!(design.grid().dimension, PanelDimension::Standard);
}

#[test]
fn add_body_requires_type_or_design() {
    let err = design_from_body(body(serde_json::json!({}))).unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    let err = design_from_body(body(serde_json::json!({"panel_type": "XL"}))).unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
}

#[test]
fn add_body_validates_full_design() {
    let err = design_from_body(body(serde_json::json!({"design": {"type": "SP", "dimension": "tall"}}))).unwrap_err();
    assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn cart_response_carries_totals() {
    let (state, _) = seeded().await;
    let carts = state.carts.read().await;
    let response = CartResponse::from(carts["tok"].summary());
    assert_eq!(response.items.len(), 1);
    assert_eq!(response.total_quantity, 2);
    assert_eq!(response.boq_limit, None);
}

#[tokio::test]
async fn with_cart_creates_empty_cart_for_new_session() {
    let state = test_helpers::test_app_state();
    let len = with_cart(&state, "fresh", |cart| Ok(cart.items().len())).await.unwrap();
    assert_eq!(len, 0);
    assert!(state.carts.read().await.contains_key("fresh"));
}

fn session(token: &str) -> Session {
    Session {
        token: token.to_owned(),
        user: crate::services::session::SessionUser {
            id: Uuid::new_v4(),
            email: "guest@example.com".to_owned(),
            name: None,
            ug_id: None,
            is_admin: false,
        },
        state: crate::services::session::SessionState::default(),
    }
}

#[tokio::test]
async fn get_cart_does_not_create_an_entry() {
    let state = test_helpers::test_app_state();
    let Json(response) = get_cart(State(state.clone()), session("viewer")).await;
    assert!(response.items.is_empty());
    assert_eq!(response.total_quantity, 0);
    assert!(state.carts.read().await.is_empty());
}

#[tokio::test]
async fn get_cart_returns_existing_cart() {
    let (state, item_id) = seeded().await;
    let Json(response) = get_cart(State(state.clone()), session("tok")).await;
    assert_eq!(response.items.len(), 1);
    assert_eq!(response.items[0].id, item_id);
    assert_eq!(state.carts.read().await.len(), 1);
}

#[tokio::test]
async fn edit_design_applies_successful_edit() {
    let (state, item_id) = seeded().await;
    let spec = icons::find("L1").unwrap().spec();
    let Json(response) =
        edit_design(&state, "tok", item_id, |d| d.grid_mut().place_at(&spec, 0).map_err(ApiError::from)).await.unwrap();
    assert_eq!(response.result.position, 0);
    assert_eq!(state.carts.read().await["tok"].get(item_id).unwrap().design.grid().icons.len(), 1);
}

#[tokio::test]
async fn rejected_edit_leaves_design_untouched() {
    let (state, item_id) = seeded().await;
    let before = state.carts.read().await["tok"].get(item_id).unwrap().design.clone();
    let spec = icons::find("DND").unwrap().spec();

    let err = edit_design(&state, "tok", item_id, |d| {
        d.grid_mut().set_text(0, "Hall").map_err(ApiError::from)?;
        d.grid_mut().place_at(&spec, 2).map_err(ApiError::from)
    })
    .await
    .unwrap_err();

    assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(err.notice.is_some());
    assert_eq!(state.carts.read().await["tok"].get(item_id).unwrap().design, before);
}

#[tokio::test]
async fn edit_design_unknown_item_is_not_found() {
    let (state, _) = seeded().await;
    let err = edit_design(&state, "tok", Uuid::new_v4(), |_| Ok(())).await.unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}
