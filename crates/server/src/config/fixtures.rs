use chrono::Utc;
use serde::Deserialize;

use zoo_core::{Model, User};

/// Development data seeded into the memory backend.
#[derive(Debug, Default, Deserialize)]
pub struct FixturesConfig {
    #[serde(default)]
    pub users: Vec<UserFixture>,
    #[serde(default)]
    pub models: Vec<ModelFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserFixture {
    pub id: String,
    pub username: String,
}

impl From<&UserFixture> for User {
    fn from(f: &UserFixture) -> Self {
        Self {
            id: f.id.clone(),
            username: f.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelFixture {
    pub id: String,
    pub user_id: String,
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    /// Plan tier: retained versions per file.
    #[serde(default = "default_keep")]
    pub keep: u32,
}

impl From<&ModelFixture> for Model {
    fn from(f: &ModelFixture) -> Self {
        Self {
            id: f.id.clone(),
            user_id: f.user_id.clone(),
            slug: f.slug.clone(),
            name: f.name.clone(),
            description: f.description.clone(),
            visibility: f.visibility.clone(),
            keep: f.keep,
            created_time: Utc::now(),
            downloads: None,
        }
    }
}

fn default_visibility() -> String {
    "public".to_owned()
}

fn default_keep() -> u32 {
    10
}
