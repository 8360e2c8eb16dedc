use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Response, StatusCode};

use crate::error::StoreError;
use crate::github::api::{
    ApiErrorBody, BlobResponse, ContentResponse, DeleteFileRequest, PutFileRequest, UserResponse,
};
use crate::github::UserProfile;

const API_ROOT: &str = "https://api.github.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// The remote file store, reduced to the five calls the client needs.
/// Paths are repository-relative. The real implementation talks to the
/// contents API; tests use the in-memory fake.
#[async_trait]
pub trait ContentHost: Send + Sync {
    /// Who owns the token. The cheapest call that validates it.
    async fn current_user(&self) -> Result<UserProfile, StoreError>;

    /// File (with inline body) or directory listing at `path`.
    async fn get_content(&self, path: &str) -> Result<ContentResponse, StoreError>;

    /// Raw transport-encoded body of a blob, addressed by content hash.
    async fn get_blob(&self, sha: &str) -> Result<String, StoreError>;

    /// Create (`revision` absent) or overwrite (`revision` present) the
    /// file at `path` with an already transport-encoded body.
    async fn put_file(
        &self,
        path: &str,
        message: &str,
        content: &str,
        revision: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Remove the file at `path` at the given revision.
    async fn delete_file(&self, path: &str, message: &str, revision: &str)
        -> Result<(), StoreError>;
}

pub struct GithubHost {
    owner: String,
    repo: String,
    client: reqwest::Client,
}

impl GithubHost {
    pub fn new(owner: &str, repo: &str, token: &str) -> Result<GithubHost, StoreError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| StoreError::Local(format!("token is not a valid header value: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        let client = reqwest::Client::builder()
            .user_agent("gitpress")
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Ok(GithubHost {
            owner: owner.to_string(),
            repo: repo.to_string(),
            client,
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            API_ROOT, self.owner, self.repo, path
        )
    }

    fn blob_url(&self, sha: &str) -> String {
        format!("{}/repos/{}/{}/git/blobs/{}", API_ROOT, self.owner, self.repo, sha)
    }

    /// Timeouts play the role of the aborted request; everything else
    /// that never produced an answer is a network failure.
    fn request_error(e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Aborted
        } else {
            StoreError::Network(e.to_string())
        }
    }

    async fn failure(resp: Response, path: &str) -> StoreError {
        let status = resp.status();
        match status {
            StatusCode::UNAUTHORIZED => StoreError::InvalidToken,
            StatusCode::FORBIDDEN => StoreError::MissingPermission,
            StatusCode::NOT_FOUND => StoreError::NotFound {
                path: path.to_string(),
            },
            _ => {
                let message = resp
                    .json::<ApiErrorBody>()
                    .await
                    .map(|body| body.message)
                    .unwrap_or_else(|_| format!("request failed with status {}", status));
                StoreError::Remote {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, StoreError> {
        resp.json::<T>()
            .await
            .map_err(|e| StoreError::Network(format!("malformed answer: {}", e)))
    }
}

#[async_trait]
impl ContentHost for GithubHost {
    async fn current_user(&self) -> Result<UserProfile, StoreError> {
        let resp = self
            .client
            .get(format!("{}/user", API_ROOT))
            .send()
            .await
            .map_err(Self::request_error)?;
        if !resp.status().is_success() {
            return Err(Self::failure(resp, "user").await);
        }

        let user: UserResponse = Self::read_json(resp).await?;
        let name = user.name.filter(|n| !n.is_empty()).unwrap_or_else(|| user.login.clone());
        Ok(UserProfile {
            login: user.login,
            name,
            avatar_url: user.avatar_url,
            email: user.email.unwrap_or_default(),
        })
    }

    async fn get_content(&self, path: &str) -> Result<ContentResponse, StoreError> {
        let resp = self
            .client
            .get(self.contents_url(path))
            .send()
            .await
            .map_err(Self::request_error)?;
        if !resp.status().is_success() {
            return Err(Self::failure(resp, path).await);
        }

        Self::read_json(resp).await
    }

    async fn get_blob(&self, sha: &str) -> Result<String, StoreError> {
        let resp = self
            .client
            .get(self.blob_url(sha))
            .send()
            .await
            .map_err(Self::request_error)?;
        if !resp.status().is_success() {
            return Err(Self::failure(resp, sha).await);
        }

        let blob: BlobResponse = Self::read_json(resp).await?;
        Ok(blob.content)
    }

    async fn put_file(
        &self,
        path: &str,
        message: &str,
        content: &str,
        revision: Option<&str>,
    ) -> Result<(), StoreError> {
        let body = PutFileRequest {
            message,
            content,
            sha: revision,
        };

        let resp = self
            .client
            .put(self.contents_url(path))
            .json(&body)
            .send()
            .await
            .map_err(Self::request_error)?;
        if !resp.status().is_success() {
            return Err(Self::failure(resp, path).await);
        }
        Ok(())
    }

    async fn delete_file(
        &self,
        path: &str,
        message: &str,
        revision: &str,
    ) -> Result<(), StoreError> {
        let body = DeleteFileRequest {
            message,
            sha: revision,
        };

        let resp = self
            .client
            .delete(self.contents_url(path))
            .json(&body)
            .send()
            .await
            .map_err(Self::request_error)?;
        if !resp.status().is_success() {
            return Err(Self::failure(resp, path).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_shapes() {
        let host = GithubHost::new("ana", "blog", "token").unwrap();
        assert_eq!(
            host.contents_url("posts/hello.md"),
            "https://api.github.com/repos/ana/blog/contents/posts/hello.md"
        );
        assert_eq!(
            host.blob_url("abc123"),
            "https://api.github.com/repos/ana/blog/git/blobs/abc123"
        );
    }
}
