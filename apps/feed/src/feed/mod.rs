pub mod cache;
pub mod filter;
pub mod handlers;
pub mod loader;
