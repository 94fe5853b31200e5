// src/fetch/mod.rs

pub mod auth;
pub mod client;
pub mod ids;
pub mod types;

#[cfg(test)]
pub(crate) mod test_server;

pub use auth::TokenCache;
pub use client::{parse_api_base, BitableClient, IdPage, TableStore};
pub use ids::{fetch_existing_ids, ExistingIds, IdentifierFetchError};
