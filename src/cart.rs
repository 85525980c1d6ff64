//! Shopping Cart
//!
//! Ordered selection of catalog items for the current session. The same
//! item may appear any number of times; entries are addressed by position.

use crate::catalog::CatalogItem;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Default)]
pub struct Cart {
    entries: Vec<&'static CatalogItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item to the end of the selection
    pub fn add(&mut self, item: &'static CatalogItem) {
        self.entries.push(item);
    }

    /// Remove the entry at `index`; out of range is a no-op
    pub fn remove(&mut self, index: usize) -> Option<&'static CatalogItem> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    /// Sum of unit prices over the current selection
    pub fn total(&self) -> Decimal {
        self.entries.iter().map(|item| item.unit_price).sum()
    }

    /// Glyphs in selection order
    pub fn glyphs(&self) -> Vec<&'static str> {
        self.entries.iter().map(|item| item.glyph).collect()
    }

    pub fn entries(&self) -> &[&'static CatalogItem] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
