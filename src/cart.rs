//! Cart: the ordered list of panel designs a project is being built from.
//!
//! DESIGN
//! ======
//! A cart lives in memory per session until it is saved as a design
//! revision. Items keep insertion order; the customer can reorder them.
//! Quantities can be capped by a BOQ (bill of quantities) limit imported for
//! the project: the sum of item quantities never exceeds it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::panel::{PanelDesign, PanelValidationError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CartError {
    #[error("cart item not found: {0}")]
    ItemNotFound(Uuid),
    #[error("cart index {index} is out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("quantity {requested} exceeds the {available} units left in the BOQ")]
    BoqExceeded { requested: u32, available: u32 },
    #[error("cart already holds {total} units, above the BOQ limit of {limit}")]
    LimitBelowTotal { total: u32, limit: u32 },
    #[error("cart is empty")]
    Empty,
    #[error(transparent)]
    InvalidDesign(#[from] PanelValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub design: PanelDesign,
    pub quantity: u32,
}

/// Totals shown alongside the item list.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary<'a> {
    pub items: &'a [CartItem],
    pub total_quantity: u32,
    pub boq_limit: Option<u32>,
    pub remaining: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<CartItem>,
    boq_limit: Option<u32>,
}

// =============================================================================
// OPERATIONS
// =============================================================================

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn boq_limit(&self) -> Option<u32> {
        self.boq_limit
    }

    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().fold(0_u32, |sum, item| sum.saturating_add(item.quantity))
    }

    /// Units still unallocated under the BOQ limit, if one is set.
    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.boq_limit.map(|limit| limit.saturating_sub(self.total_quantity()))
    }

    #[must_use]
    pub fn summary(&self) -> CartSummary<'_> {
        CartSummary {
            items: &self.items,
            total_quantity: self.total_quantity(),
            boq_limit: self.boq_limit,
            remaining: self.remaining(),
        }
    }

    fn check_allocation(&self, requested: u32, replacing: u32) -> Result<(), CartError> {
        if requested == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if let Some(limit) = self.boq_limit {
            let available = limit.saturating_sub(self.total_quantity().saturating_sub(replacing));
            if requested > available {
                return Err(CartError::BoqExceeded { requested, available });
            }
        }
        Ok(())
    }

    /// Append a validated design.
    ///
    /// # Errors
    ///
    /// Rejects invalid designs, zero quantities, and BOQ overruns.
    pub fn add(&mut self, design: PanelDesign, quantity: u32) -> Result<&CartItem, CartError> {
        design.validate()?;
        self.check_allocation(quantity, 0)?;
        self.items.push(CartItem { id: Uuid::new_v4(), design, quantity });
        let index = self.items.len() - 1;
        Ok(&self.items[index])
    }

    fn index_of(&self, item_id: Uuid) -> Result<usize, CartError> {
        self.items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(CartError::ItemNotFound(item_id))
    }

    #[must_use]
    pub fn get(&self, item_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Replace an item's design, keeping its ID, position, and quantity.
    ///
    /// # Errors
    ///
    /// Rejects invalid designs and unknown IDs.
    pub fn replace_design(&mut self, item_id: Uuid, design: PanelDesign) -> Result<&CartItem, CartError> {
        design.validate()?;
        let index = self.index_of(item_id)?;
        self.items[index].design = design;
        Ok(&self.items[index])
    }

    /// # Errors
    ///
    /// Rejects zero quantities and BOQ overruns.
    pub fn set_quantity(&mut self, item_id: Uuid, quantity: u32) -> Result<&CartItem, CartError> {
        let index = self.index_of(item_id)?;
        self.check_allocation(quantity, self.items[index].quantity)?;
        self.items[index].quantity = quantity;
        Ok(&self.items[index])
    }

    /// Move the item at `from` so it ends up at index `to`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if either index is past the end.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), CartError> {
        let len = self.items.len();
        for index in [from, to] {
            if index >= len {
                return Err(CartError::IndexOutOfRange { index, len });
            }
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ItemNotFound` for unknown IDs.
    pub fn remove(&mut self, item_id: Uuid) -> Result<CartItem, CartError> {
        let index = self.index_of(item_id)?;
        Ok(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Set or lift the BOQ limit.
    ///
    /// # Errors
    ///
    /// Rejects a limit below what is already allocated.
    pub fn set_boq_limit(&mut self, limit: Option<u32>) -> Result<(), CartError> {
        if let Some(limit) = limit {
            let total = self.total_quantity();
            if total > limit {
                return Err(CartError::LimitBelowTotal { total, limit });
            }
        }
        self.boq_limit = limit;
        Ok(())
    }

    /// Replace the whole cart with previously saved items (edit mode).
    /// Items get fresh IDs; the BOQ limit is kept only if still satisfied.
    ///
    /// # Errors
    ///
    /// Rejects any invalid design; the cart is unchanged on error.
    pub fn load(&mut self, items: Vec<CartItem>) -> Result<(), CartError> {
        let mut loaded = Vec::with_capacity(items.len());
        for item in items {
            item.design.validate()?;
            if item.quantity == 0 {
                return Err(CartError::ZeroQuantity);
            }
            loaded.push(CartItem { id: Uuid::new_v4(), ..item });
        }
        self.items = loaded;
        if let Some(limit) = self.boq_limit
            && self.total_quantity() > limit
        {
            self.boq_limit = None;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "cart_test.rs"]
mod tests;
