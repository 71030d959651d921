//! Derived order money.
//!
//! `subtotal`, `tax` and `total` are never edited directly: they are
//! recomputed from the item lines whenever a line changes. Arithmetic is
//! exact `Decimal`; rounding is a display concern.

use super::error::{OrderError, OrderResult};
use crate::models::{Order, OrderItem, ServiceCategory, ServiceType, find_category};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum allowed quantity per line
pub const MAX_QUANTITY: u32 = 9999;
/// Maximum allowed unit price (1,000,000)
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Computed money triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

#[inline]
pub fn line_total(quantity: u32, unit_price: Decimal) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// subtotal = Σ line totals, tax = subtotal × rate, total = subtotal + tax
pub fn price_items(items: &[OrderItem], tax_rate: Decimal) -> Totals {
    let subtotal: Decimal = items.iter().map(|i| i.total).sum();
    let tax = subtotal * tax_rate;
    Totals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

/// Validate a raw quantity from the operator
pub fn validate_quantity(quantity: i64) -> OrderResult<u32> {
    if quantity <= 0 || quantity > MAX_QUANTITY as i64 {
        return Err(OrderError::InvalidQuantity(quantity));
    }
    Ok(quantity as u32)
}

pub fn validate_unit_price(price: Decimal) -> OrderResult<Decimal> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(OrderError::InvalidPrice(format!(
            "unit price must be non-negative, got {}",
            price
        )));
    }
    if price > MAX_UNIT_PRICE {
        return Err(OrderError::InvalidPrice(format!(
            "unit price exceeds maximum allowed ({}), got {}",
            MAX_UNIT_PRICE, price
        )));
    }
    Ok(price)
}

/// Check every line before an order is written
pub fn validate_items(items: &[OrderItem]) -> OrderResult<()> {
    if items.is_empty() {
        return Err(OrderError::EmptyItems);
    }
    for item in items {
        validate_quantity(item.quantity as i64)?;
        validate_unit_price(item.unit_price)?;
    }
    Ok(())
}

impl Order {
    /// Recompute line totals and the money triple at `tax_rate`
    pub fn reprice(&mut self, tax_rate: Decimal) -> Totals {
        for item in &mut self.items {
            item.total = line_total(item.quantity, item.unit_price);
        }
        let totals = price_items(&self.items, tax_rate);
        self.subtotal = totals.subtotal;
        self.tax = totals.tax;
        self.total = totals.total;
        totals
    }

    /// Recompute line totals, then check the stored triple against them.
    /// The tax rate is not known here; only `total = subtotal + tax` is held.
    pub fn check_totals(&mut self) -> OrderResult<()> {
        for item in &mut self.items {
            item.total = line_total(item.quantity, item.unit_price);
        }
        let subtotal: Decimal = self.items.iter().map(|i| i.total).sum();
        if self.subtotal != subtotal {
            return Err(OrderError::TotalsMismatch(format!(
                "subtotal {} but items sum to {}",
                self.subtotal, subtotal
            )));
        }
        if self.tax.is_sign_negative() && !self.tax.is_zero() {
            return Err(OrderError::TotalsMismatch(format!("negative tax {}", self.tax)));
        }
        if self.total != self.subtotal + self.tax {
            return Err(OrderError::TotalsMismatch(format!(
                "total {} but subtotal + tax is {}",
                self.total,
                self.subtotal + self.tax
            )));
        }
        Ok(())
    }
}

/// Editable list of item lines; never empty
#[derive(Debug, Clone, PartialEq)]
pub struct ItemLines {
    items: Vec<OrderItem>,
}

impl Default for ItemLines {
    fn default() -> Self {
        Self {
            items: vec![Self::blank_line()],
        }
    }
}

impl ItemLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing lines (e.g. when editing an order)
    pub fn from_items(items: Vec<OrderItem>) -> OrderResult<Self> {
        if items.is_empty() {
            return Err(OrderError::EmptyItems);
        }
        let mut lines = Self { items };
        for item in &mut lines.items {
            item.total = line_total(item.quantity, item.unit_price);
        }
        Ok(lines)
    }

    /// Empty line: no category, quantity 1, price 0
    pub fn blank_line() -> OrderItem {
        OrderItem {
            id: crate::util::new_id(),
            category: String::new(),
            service_type: ServiceType::default(),
            quantity: 1,
            unit_price: Decimal::ZERO,
            total: Decimal::ZERO,
            notes: None,
        }
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<OrderItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a blank line, returning its id
    pub fn add_line(&mut self) -> String {
        let line = Self::blank_line();
        let id = line.id.clone();
        self.items.push(line);
        id
    }

    /// Remove a line; the last remaining line cannot be removed
    pub fn remove_line(&mut self, item_id: &str) -> OrderResult<OrderItem> {
        let index = self.position(item_id)?;
        if self.items.len() <= 1 {
            return Err(OrderError::LastItem);
        }
        Ok(self.items.remove(index))
    }

    pub fn set_quantity(&mut self, item_id: &str, quantity: i64) -> OrderResult<()> {
        let quantity = validate_quantity(quantity)?;
        let item = self.line_mut(item_id)?;
        item.quantity = quantity;
        item.total = line_total(item.quantity, item.unit_price);
        Ok(())
    }

    pub fn set_unit_price(&mut self, item_id: &str, price: Decimal) -> OrderResult<()> {
        let price = validate_unit_price(price)?;
        let item = self.line_mut(item_id)?;
        item.unit_price = price;
        item.total = line_total(item.quantity, item.unit_price);
        Ok(())
    }

    /// Pick a category by name.
    ///
    /// A known category snapshots its base price and service type onto the
    /// line. A name with no matching category (deleted since) keeps the
    /// line's last-known price and type.
    pub fn set_category(
        &mut self,
        item_id: &str,
        category: &str,
        categories: &[ServiceCategory],
    ) -> OrderResult<()> {
        let item = self.line_mut(item_id)?;
        item.category = category.to_string();
        if let Some(found) = find_category(categories, category) {
            item.unit_price = found.base_price;
            item.service_type = found.service_type.clone();
        }
        item.total = line_total(item.quantity, item.unit_price);
        Ok(())
    }

    pub fn set_notes(&mut self, item_id: &str, notes: Option<String>) -> OrderResult<()> {
        let item = self.line_mut(item_id)?;
        item.notes = notes.filter(|n| !n.trim().is_empty());
        Ok(())
    }

    pub fn totals(&self, tax_rate: Decimal) -> Totals {
        price_items(&self.items, tax_rate)
    }

    fn position(&self, item_id: &str) -> OrderResult<usize> {
        self.items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| OrderError::ItemNotFound(item_id.to_string()))
    }

    fn line_mut(&mut self, item_id: &str) -> OrderResult<&mut OrderItem> {
        let index = self.position(item_id)?;
        Ok(&mut self.items[index])
    }
}
