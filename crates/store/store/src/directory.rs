use async_trait::async_trait;

use zoo_core::{Model, User};

use crate::error::StoreError;

/// Read-only user lookup.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
}

/// Read-only model lookup.
#[async_trait]
pub trait ModelDirectory: Send + Sync {
    async fn by_user_id_slug(&self, user_id: &str, slug: &str)
    -> Result<Option<Model>, StoreError>;

    async fn by_id(&self, model_id: &str) -> Result<Option<Model>, StoreError>;
}
