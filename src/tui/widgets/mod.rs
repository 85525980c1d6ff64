//! TUI Widgets
//!
//! Custom widgets for the storefront.

mod checkout;
mod wallet;

pub use checkout::render_checkout;
pub use wallet::render_wallet;
