use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::downloads::DownloadCounts;

/// A registered user. Owned by an external collaborator; referenced only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct User {
    pub id: String,
    pub username: String,
}

/// A model that files are uploaded against. Owned by an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Model {
    pub id: String,
    /// Owning user. Only this user may upload files to the model.
    pub user_id: String,
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub visibility: String,
    /// Plan tier value: the retained-version count per slot, which also
    /// selects the upload size limit.
    pub keep: u32,
    pub created_time: DateTime<Utc>,
    /// Download counters, filled in by hydration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<DownloadCounts>,
}
