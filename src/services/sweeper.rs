//! Cart sweeper: background eviction of carts whose session has expired.
//!
//! DESIGN
//! ======
//! Carts live in memory keyed by session token, so a session that expires
//! without logging out would otherwise keep its cart forever. Each cycle
//! snapshots the held tokens, deletes expired session rows, and evicts the
//! snapshot tokens that no longer have a row. Tokens added after the
//! snapshot are left for the next cycle.
//!
//! ERROR HANDLING
//! ==============
//! A failed cycle is logged and retried on the next tick. Nothing is evicted
//! unless the live-token query succeeded.

use std::collections::HashSet;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::services::session;
use crate::state::AppState;

/// Spawn the background sweep task. Returns a handle for shutdown.
pub fn spawn_cart_sweeper(state: AppState) -> JoinHandle<()> {
    let sweep_secs = state.config.cart_sweep_secs;
    info!(sweep_secs, "cart sweep configured");
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(sweep_secs)).await;
            match sweep_carts(&state).await {
                Ok(0) => {}
                Ok(evicted) => info!(evicted, "carts of expired sessions dropped"),
                Err(e) => warn!(error = %e, "cart sweep failed"),
            }
        }
    })
}

/// Run one sweep cycle. Returns the number of carts evicted.
///
/// # Errors
///
/// Returns the database error when pruning or the live-token lookup fails.
pub async fn sweep_carts(state: &AppState) -> Result<usize, sqlx::Error> {
    let held = state.cart_tokens().await;
    let live = session::prune_expired(&state.pool, &held).await?;
    let dead = dead_tokens(held, &live);
    if dead.is_empty() {
        return Ok(0);
    }
    Ok(state.evict_carts(&dead).await)
}

/// Tokens from `held` that have no live session.
pub(crate) fn dead_tokens(held: Vec<String>, live: &HashSet<String>) -> Vec<String> {
    held.into_iter().filter(|token| !live.contains(token)).collect()
}

#[cfg(test)]
#[path = "sweeper_test.rs"]
mod tests;
