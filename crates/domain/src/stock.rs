//! Stock record for a catalog item.

use common::{ItemId, Money};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// On-hand stock and unit price for one item.
///
/// `stock_quantity` is unsigned, so it can never go negative; a decrement
/// larger than what is available fails instead of saturating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    id: ItemId,
    name: String,
    stock_quantity: u32,
    price: Money,
    description: Option<String>,
}

impl StockItem {
    /// Creates a new stock record, validating the price.
    pub fn new(
        name: impl Into<String>,
        stock_quantity: u32,
        price: Money,
        description: Option<String>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid_argument("item name must not be empty"));
        }
        if !price.is_positive() {
            return Err(DomainError::invalid_argument(format!(
                "item price must be greater than 0, got {price}"
            )));
        }

        Ok(Self {
            id: ItemId::new(),
            name,
            stock_quantity,
            price,
            description,
        })
    }

    /// Rebuilds a stock record from persisted fields without validation.
    pub fn from_parts(
        id: ItemId,
        name: String,
        stock_quantity: u32,
        price: Money,
        description: Option<String>,
    ) -> Self {
        Self {
            id,
            name,
            stock_quantity,
            price,
            description,
        }
    }

    /// Removes `quantity` units from stock.
    pub fn decrease_stock(&mut self, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(DomainError::invalid_argument(
                "quantity must be greater than 0",
            ));
        }
        if self.stock_quantity < quantity {
            return Err(DomainError::InsufficientStock {
                item_id: self.id,
                requested: quantity,
                available: self.stock_quantity,
            });
        }
        self.stock_quantity -= quantity;
        Ok(())
    }

    /// Returns `quantity` units to stock.
    pub fn increase_stock(&mut self, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(DomainError::invalid_argument(
                "quantity must be greater than 0",
            ));
        }
        self.stock_quantity = self.stock_quantity.checked_add(quantity).ok_or_else(|| {
            DomainError::invalid_argument(format!(
                "restoring {quantity} units would overflow stock of item {}",
                self.id
            ))
        })?;
        Ok(())
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stock_quantity(&self) -> u32 {
        self.stock_quantity
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
