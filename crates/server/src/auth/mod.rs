pub mod api_key;
pub mod middleware;

pub use api_key::{ApiKeyTable, hash_api_key};
