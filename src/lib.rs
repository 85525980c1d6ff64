// x402 Shop - pay-per-request storefront over the x402 payment protocol

pub mod config;
pub mod models;
pub mod types;
pub mod catalog;
pub mod cart;
pub mod ledger;    // ERC-20 balance reads
pub mod wallet;    // Embedded wallet session and key storage
pub mod payment;   // x402 wire types, paying client, facilitator
pub mod checkout;
pub mod middleware;
pub mod routes;
pub mod tui;       // Terminal storefront
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
