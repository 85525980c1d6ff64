//! Product Catalog
//!
//! The fixed list of items the shop sells. Prices are flat, in USDC.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// A purchasable item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: u32,
    pub glyph: &'static str,
    pub name: &'static str,
    pub unit_price: Decimal,
}

/// Every item on sale, in display order
pub static CATALOG: [CatalogItem; 12] = [
    CatalogItem { id: 1, glyph: "🍎", name: "Apple", unit_price: dec!(0.001) },
    CatalogItem { id: 2, glyph: "🍌", name: "Banana", unit_price: dec!(0.001) },
    CatalogItem { id: 3, glyph: "🍕", name: "Pizza", unit_price: dec!(0.002) },
    CatalogItem { id: 4, glyph: "🧃", name: "Juice", unit_price: dec!(0.001) },
    CatalogItem { id: 5, glyph: "🍩", name: "Donut", unit_price: dec!(0.001) },
    CatalogItem { id: 6, glyph: "🍔", name: "Burger", unit_price: dec!(0.002) },
    CatalogItem { id: 7, glyph: "🍿", name: "Popcorn", unit_price: dec!(0.001) },
    CatalogItem { id: 8, glyph: "🍫", name: "Chocolate", unit_price: dec!(0.001) },
    CatalogItem { id: 9, glyph: "🥤", name: "Soda", unit_price: dec!(0.001) },
    CatalogItem { id: 10, glyph: "🍦", name: "Ice Cream", unit_price: dec!(0.001) },
    CatalogItem { id: 11, glyph: "🌮", name: "Taco", unit_price: dec!(0.002) },
    CatalogItem { id: 12, glyph: "🍪", name: "Cookie", unit_price: dec!(0.001) },
];

/// Look up an item by its stable id
pub fn find(id: u32) -> Option<&'static CatalogItem> {
    CATALOG.iter().find(|item| item.id == id)
}
