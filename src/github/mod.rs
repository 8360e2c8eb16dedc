use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub mod api;
pub mod client;
pub mod fake;
pub mod host;

pub use client::RepoClient;
pub use host::{ContentHost, GithubHost};

/// Where the blog lives: repository coordinates plus the directory that
/// holds the post files and the category manifest. `content_dir` may be
/// empty for the repository root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoCoordinates {
    pub owner: String,
    pub repo: String,
    pub content_dir: String,
}

/// The user behind the token, as reported by the identity endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub login: String,
    /// Display name; the store may not have one, then it is the login.
    pub name: String,
    pub avatar_url: String,
    pub email: String,
}

/// Successful authentication. `warning` is set when the identity check
/// passed but the content directory does not exist yet (it is created
/// implicitly by the first write).
#[derive(Debug, Clone, PartialEq)]
pub struct AuthOutcome {
    pub user: UserProfile,
    pub warning: Option<String>,
}

/// Per-slug result of a batch delete. The batch always runs to the end;
/// failed slugs carry their failure so callers can report them.
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub slug: String,
    pub result: Result<(), StoreError>,
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        self.result.is_ok()
    }
}
