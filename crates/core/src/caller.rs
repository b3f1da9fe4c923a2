use serde::{Deserialize, Serialize};

/// The authenticated identity performing a request.
///
/// Resolved by the HTTP layer and threaded explicitly through the upload
/// pipeline; nothing in the pipeline reads identity from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Identifier of the authenticated user.
    pub user_id: String,
    /// How the caller authenticated (e.g. `"api_key"`).
    pub auth_method: String,
}

impl Caller {
    /// Create a caller for the given user id.
    pub fn new(user_id: impl Into<String>, auth_method: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            auth_method: auth_method.into(),
        }
    }
}
