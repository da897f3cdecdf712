//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool, the parsed config, and the live carts. A cart
//! is keyed by session token and lives in memory until it is saved as a
//! design revision or the session ends. Carts of expired sessions are
//! dropped by `services::sweeper`.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::cart::Cart;
use crate::config::AppConfig;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    /// Session token -> cart being assembled.
    pub carts: Arc<RwLock<HashMap<String, Cart>>>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        Self { pool, config: Arc::new(config), carts: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Drop the cart belonging to a session.
    pub async fn discard_cart(&self, token: &str) {
        let mut carts = self.carts.write().await;
        carts.remove(token);
    }

    /// Tokens that currently hold a cart.
    pub async fn cart_tokens(&self) -> Vec<String> {
        self.carts.read().await.keys().cloned().collect()
    }

    /// Drop the carts of the given sessions. Returns how many were held.
    pub async fn evict_carts(&self, tokens: &[String]) -> usize {
        let mut carts = self.carts.write().await;
        tokens.iter().filter(|token| carts.remove(token.as_str()).is_some()).count()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
