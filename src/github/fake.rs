//! In-memory stand-in for the remote store. Unit tests drive the client
//! against this instead of the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::github::api::{decode_transport, encode_transport, ContentResponse, DirEntry, FileEntry};
use crate::github::host::ContentHost;
use crate::github::UserProfile;

#[derive(Debug, Clone)]
pub struct FakeFile {
    pub sha: String,
    /// Transport-encoded body, exactly what the wire would carry.
    pub content: String,
}

/// Keyed by repository-relative path. Every call is appended to `ops`
/// so tests can assert call order (the fetch-then-write discipline).
pub struct FakeHost {
    pub files: Mutex<HashMap<String, FakeFile>>,
    pub ops: Mutex<Vec<String>>,
    pub profile: UserProfile,
    /// When set, the identity endpoint fails with this error.
    pub identity_error: Mutex<Option<StoreError>>,
    /// When set, every content lookup fails with this error.
    pub content_error: Mutex<Option<StoreError>>,
    next_sha: AtomicU64,
}

impl Default for FakeHost {
    fn default() -> Self {
        FakeHost {
            files: Mutex::new(HashMap::new()),
            ops: Mutex::new(Vec::new()),
            profile: UserProfile {
                login: "writer".to_string(),
                name: "Writer".to_string(),
                avatar_url: "https://avatars.example/writer.png".to_string(),
                email: "writer@example.com".to_string(),
            },
            identity_error: Mutex::new(None),
            content_error: Mutex::new(None),
            next_sha: AtomicU64::new(1),
        }
    }
}

impl FakeHost {
    pub async fn seed(&self, path: &str, text: &str) {
        let sha = self.mint_sha();
        self.files.lock().await.insert(
            path.to_string(),
            FakeFile {
                sha,
                content: encode_transport(text),
            },
        );
    }

    /// Decoded body of a stored file, for asserting what a write left.
    pub async fn text_of(&self, path: &str) -> Option<String> {
        let files = self.files.lock().await;
        let file = files.get(path)?;
        decode_transport(&file.content).ok()
    }

    pub async fn sha_of(&self, path: &str) -> Option<String> {
        self.files.lock().await.get(path).map(|f| f.sha.clone())
    }

    pub async fn recorded_ops(&self) -> Vec<String> {
        self.ops.lock().await.clone()
    }

    fn mint_sha(&self) -> String {
        format!("sha-{}", self.next_sha.fetch_add(1, Ordering::Relaxed))
    }

    async fn record(&self, op: String) {
        self.ops.lock().await.push(op);
    }

    fn listing_for(files: &HashMap<String, FakeFile>, dir: &str) -> Vec<DirEntry> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };

        let mut entries: Vec<DirEntry> = files
            .iter()
            .filter_map(|(path, file)| {
                let rest = path.strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('/') {
                    return None;
                }
                Some(DirEntry {
                    name: rest.to_string(),
                    path: path.clone(),
                    sha: file.sha.clone(),
                    entry_type: "file".to_string(),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }
}

#[async_trait]
impl ContentHost for FakeHost {
    async fn current_user(&self) -> Result<UserProfile, StoreError> {
        self.record("user".to_string()).await;

        if let Some(e) = self.identity_error.lock().await.clone() {
            return Err(e);
        }
        Ok(self.profile.clone())
    }

    async fn get_content(&self, path: &str) -> Result<ContentResponse, StoreError> {
        self.record(format!("get {}", path)).await;

        if let Some(e) = self.content_error.lock().await.clone() {
            return Err(e);
        }

        let files = self.files.lock().await;
        if let Some(file) = files.get(path) {
            let name = path.rsplit('/').next().unwrap_or(path).to_string();
            return Ok(ContentResponse::File(FileEntry {
                name,
                path: path.to_string(),
                sha: file.sha.clone(),
                content: Some(file.content.clone()),
            }));
        }

        let entries = Self::listing_for(&files, path);
        if entries.is_empty() {
            return Err(StoreError::NotFound {
                path: path.to_string(),
            });
        }
        Ok(ContentResponse::Listing(entries))
    }

    async fn get_blob(&self, sha: &str) -> Result<String, StoreError> {
        self.record(format!("blob {}", sha)).await;

        let files = self.files.lock().await;
        files
            .values()
            .find(|file| file.sha == sha)
            .map(|file| file.content.clone())
            .ok_or_else(|| StoreError::NotFound {
                path: sha.to_string(),
            })
    }

    async fn put_file(
        &self,
        path: &str,
        _message: &str,
        content: &str,
        revision: Option<&str>,
    ) -> Result<(), StoreError> {
        self.record(format!("put {} rev={}", path, revision.unwrap_or("none")))
            .await;

        let mut files = self.files.lock().await;
        match (files.get(path), revision) {
            // Blind create over an existing file is rejected like the
            // real store rejects it.
            (Some(_), None) => Err(StoreError::Remote {
                status: 422,
                message: format!("\"sha\" wasn't supplied for existing path {}", path),
            }),
            (Some(existing), Some(revision)) if existing.sha != revision => {
                Err(StoreError::Remote {
                    status: 409,
                    message: format!("{} is at {}, not {}", path, existing.sha, revision),
                })
            }
            (None, Some(_)) => Err(StoreError::NotFound {
                path: path.to_string(),
            }),
            _ => {
                let sha = self.mint_sha();
                files.insert(
                    path.to_string(),
                    FakeFile {
                        sha,
                        content: content.to_string(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn delete_file(
        &self,
        path: &str,
        _message: &str,
        revision: &str,
    ) -> Result<(), StoreError> {
        self.record(format!("delete {} rev={}", path, revision)).await;

        let mut files = self.files.lock().await;
        match files.get(path) {
            None => Err(StoreError::NotFound {
                path: path.to_string(),
            }),
            Some(existing) if existing.sha != revision => Err(StoreError::Remote {
                status: 409,
                message: format!("{} is at {}, not {}", path, existing.sha, revision),
            }),
            Some(_) => {
                files.remove(path);
                Ok(())
            }
        }
    }
}
