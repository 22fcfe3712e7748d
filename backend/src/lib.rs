pub mod catchers;
pub mod config;
pub mod cors;
pub mod error;
pub mod ledger;
pub mod raffle;
pub mod rate_limiter;
pub mod routes;
pub mod session;
pub mod sheets;
pub mod store;
pub mod utils;
pub use shared::{models::*, error::*, user_info::*};

#[cfg(test)]
mod tests;
