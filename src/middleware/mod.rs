// Middleware: payment gating and CORS

pub mod cors;
pub mod paywall;

pub use cors::*;
pub use paywall::*;
