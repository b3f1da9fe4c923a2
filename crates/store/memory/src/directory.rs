use async_trait::async_trait;
use dashmap::DashMap;

use zoo_core::{Model, User};
use zoo_store::directory::{ModelDirectory, UserDirectory};
use zoo_store::error::StoreError;

/// In-memory user and model lookup, seeded through [`MemoryDirectory::insert_user`]
/// and [`MemoryDirectory::insert_model`].
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: DashMap<String, User>,
    models: DashMap<String, Model>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user, keyed by username.
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.username.clone(), user);
    }

    /// Add or replace a model, keyed by id.
    pub fn insert_model(&self, model: Model) {
        self.models.insert(model.id.clone(), model);
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(username).map(|u| u.value().clone()))
    }
}

#[async_trait]
impl ModelDirectory for MemoryDirectory {
    async fn by_user_id_slug(
        &self,
        user_id: &str,
        slug: &str,
    ) -> Result<Option<Model>, StoreError> {
        Ok(self
            .models
            .iter()
            .find(|m| m.user_id == user_id && m.slug == slug)
            .map(|m| m.value().clone()))
    }

    async fn by_id(&self, model_id: &str) -> Result<Option<Model>, StoreError> {
        Ok(self.models.get(model_id).map(|m| m.value().clone()))
    }
}
