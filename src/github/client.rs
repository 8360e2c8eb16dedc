use std::sync::Arc;

use futures::future::join_all;
use spdlog::{debug, warn};

use crate::error::StoreError;
use crate::front_matter;
use crate::github::api::{decode_transport, encode_transport, ContentResponse, DirEntry, FileEntry};
use crate::github::host::ContentHost;
use crate::github::{AuthOutcome, DeleteOutcome};
use crate::post::Post;

/// All remote reads and writes of posts and the category manifest go
/// through here. The client owns no session state beyond the host
/// handle and the content directory it was built for.
pub struct RepoClient {
    host: Arc<dyn ContentHost>,
    content_dir: String,
}

impl RepoClient {
    pub fn new(host: Arc<dyn ContentHost>, content_dir: &str) -> RepoClient {
        RepoClient {
            host,
            content_dir: content_dir.trim_matches('/').to_string(),
        }
    }

    pub fn content_dir(&self) -> &str {
        &self.content_dir
    }

    fn entry_path(&self, name: &str) -> String {
        if self.content_dir.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.content_dir, name)
        }
    }

    fn post_path(&self, slug: &str) -> String {
        self.entry_path(&format!("{}.md", slug))
    }

    /// Validates the token against the identity endpoint, then probes
    /// read access to the content directory. A missing directory is
    /// fine (the first write creates it) and only produces a warning.
    pub async fn authenticate(&self) -> Result<AuthOutcome, StoreError> {
        let user = self.host.current_user().await?;

        match self.host.get_content(&self.content_dir).await {
            Ok(_) => Ok(AuthOutcome { user, warning: None }),
            Err(e) if e.is_not_found() => {
                let warning = format!(
                    "content directory '{}' does not exist yet; it will be created on first write",
                    self.content_dir
                );
                warn!("{}", warning);
                Ok(AuthOutcome {
                    user,
                    warning: Some(warning),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Every post in the content directory, newest first. Files that
    /// cannot be fetched or decoded are logged and skipped; one corrupt
    /// file must not take the listing down.
    pub async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let entries = match self.host.get_content(&self.content_dir).await {
            Ok(ContentResponse::Listing(entries)) => entries,
            Ok(ContentResponse::File(_)) => {
                return Err(StoreError::Remote {
                    status: 422,
                    message: format!("'{}' is a file, not a directory", self.content_dir),
                })
            }
            Err(e) if e.is_not_found() => return Ok(vec![]),
            Err(e) => return Err(e),
        };

        let mut posts = Vec::new();
        for entry in entries.iter().filter(|e| e.is_markdown_file()) {
            match self.fetch_entry(entry).await {
                Ok(post) => posts.push(post),
                Err(e) => warn!("skipping post file {}: {}", entry.name, e),
            }
        }

        posts.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(posts)
    }

    async fn fetch_entry(&self, entry: &DirEntry) -> Result<Post, StoreError> {
        let wire = self.host.get_blob(&entry.sha).await?;
        let text = decode_transport(&wire)?;

        let decoded = front_matter::decode(&text, Some(entry.stem()));
        log_ignored_keys(entry.stem(), &decoded.ignored_keys);
        Ok(decoded.post)
    }

    /// One post by slug. A missing file is an empty result, not an
    /// error; anything else propagates.
    pub async fn get_post(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        let path = self.post_path(slug);
        let Some(text) = self.read_file_text(&path).await? else {
            return Ok(None);
        };

        let decoded = front_matter::decode(&text, Some(slug));
        log_ignored_keys(slug, &decoded.ignored_keys);
        Ok(Some(decoded.post))
    }

    /// Writes a brand-new post file. No revision token is sent, so the
    /// store rejects the call if the path already exists.
    pub async fn create_post(&self, post: &Post) -> Result<(), StoreError> {
        let message = format!("Create post: {}", post.title);
        let wire = encode_transport(&front_matter::encode(post));
        self.host
            .put_file(&self.post_path(&post.slug), &message, &wire, None)
            .await
    }

    /// Overwrites an existing post file. The current revision token is
    /// fetched first and sent with the write; a missing file surfaces
    /// here as the pre-fetch error.
    pub async fn update_post(&self, post: &Post) -> Result<(), StoreError> {
        let path = self.post_path(&post.slug);
        let revision = self.fetch_revision(&path).await?;

        let message = format!("Update post: {}", post.title);
        let wire = encode_transport(&front_matter::encode(post));
        self.host
            .put_file(&path, &message, &wire, Some(&revision))
            .await
    }

    /// Removes one post file, fetching its current revision first. A
    /// missing file is an error here, unlike `get_post`.
    pub async fn delete_post(&self, slug: &str) -> Result<(), StoreError> {
        let path = self.post_path(slug);
        let revision = self.fetch_revision(&path).await?;

        let message = format!("Delete post: {}", slug);
        self.host.delete_file(&path, &message, &revision).await
    }

    /// Deletes several posts concurrently. The batch always runs to the
    /// end; per-slug failures are logged and reported in the outcome
    /// list instead of aborting the rest.
    pub async fn delete_posts(&self, slugs: &[String]) -> Vec<DeleteOutcome> {
        let deletes = slugs.iter().map(|slug| async move {
            let result = self.delete_post(slug).await;
            if let Err(e) = &result {
                warn!("failed to delete post {}: {}", slug, e);
            }
            DeleteOutcome {
                slug: slug.clone(),
                result,
            }
        });

        join_all(deletes).await
    }

    /// Text of a non-post file in the content directory (the category
    /// manifest). Missing file or directory-shaped answer is `None`.
    pub async fn read_text_file(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.read_file_text(&self.entry_path(name)).await
    }

    /// Create-or-update a non-post file. The current revision is
    /// fetched when the file exists; a missing file means plain create.
    pub async fn write_text_file(
        &self,
        name: &str,
        message: &str,
        text: &str,
    ) -> Result<(), StoreError> {
        let path = self.entry_path(name);
        let revision = match self.host.get_content(&path).await {
            Ok(ContentResponse::File(file)) => Some(file.sha),
            Ok(ContentResponse::Listing(_)) => None,
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        self.host
            .put_file(&path, message, &encode_transport(text), revision.as_deref())
            .await
    }

    async fn read_file_text(&self, path: &str) -> Result<Option<String>, StoreError> {
        let file = match self.host.get_content(path).await {
            Ok(ContentResponse::File(file)) => file,
            Ok(ContentResponse::Listing(_)) => {
                warn!("expected a file at {}, found a directory", path);
                return Ok(None);
            }
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let wire = match file_body(&file) {
            Some(inline) => inline.to_string(),
            None => self.host.get_blob(&file.sha).await?,
        };
        Ok(Some(decode_transport(&wire)?))
    }

    async fn fetch_revision(&self, path: &str) -> Result<String, StoreError> {
        match self.host.get_content(path).await? {
            ContentResponse::File(file) => Ok(file.sha),
            ContentResponse::Listing(_) => Err(StoreError::NotFound {
                path: path.to_string(),
            }),
        }
    }
}

fn file_body(file: &FileEntry) -> Option<&str> {
    file.content.as_deref().filter(|c| !c.is_empty())
}

fn log_ignored_keys(slug: &str, ignored: &[String]) {
    if !ignored.is_empty() {
        debug!(
            "post {}: ignoring unknown front matter keys: {}",
            slug,
            ignored.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::github::fake::{FakeFile, FakeHost};

    use super::*;

    fn post(slug: &str, title: &str, day: u32) -> Post {
        Post {
            slug: slug.to_string(),
            title: title.to_string(),
            description: "d".to_string(),
            category: "development".to_string(),
            tags: vec!["t".to_string()],
            date: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            read_time: 1,
            content: "body text".to_string(),
            cover_image: None,
            author: Some("Writer".to_string()),
        }
    }

    fn client(host: &Arc<FakeHost>) -> RepoClient {
        RepoClient::new(host.clone(), "posts")
    }

    #[tokio::test]
    async fn test_authenticate_reports_user() {
        let host = Arc::new(FakeHost::default());
        host.seed("posts/existing.md", "hello").await;

        let outcome = client(&host).authenticate().await.unwrap();
        assert_eq!(outcome.user.login, "writer");
        assert_eq!(outcome.user.name, "Writer");
        assert!(outcome.warning.is_none());
    }

    #[tokio::test]
    async fn test_authenticate_warns_on_missing_directory() {
        let host = Arc::new(FakeHost::default());

        let outcome = client(&host).authenticate().await.unwrap();
        assert_eq!(outcome.user.login, "writer");
        assert!(outcome.warning.is_some());
    }

    #[tokio::test]
    async fn test_authenticate_classifies_failures() {
        let host = Arc::new(FakeHost::default());
        *host.identity_error.lock().await = Some(StoreError::InvalidToken);
        let err = client(&host).authenticate().await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidToken));
        assert!(err.is_auth_failure());

        let host = Arc::new(FakeHost::default());
        *host.content_error.lock().await = Some(StoreError::MissingPermission);
        let err = client(&host).authenticate().await.unwrap_err();
        assert!(matches!(err, StoreError::MissingPermission));

        let host = Arc::new(FakeHost::default());
        *host.content_error.lock().await = Some(StoreError::Aborted);
        let err = client(&host).authenticate().await.unwrap_err();
        assert!(matches!(err, StoreError::Aborted));
    }

    #[tokio::test]
    async fn test_list_posts_skips_corrupt_and_sorts_newest_first() {
        let host = Arc::new(FakeHost::default());
        let older = post("older", "Older", 1);
        let newer = post("newer", "Newer", 9);
        host.seed("posts/older.md", &front_matter::encode(&older)).await;
        host.seed("posts/newer.md", &front_matter::encode(&newer)).await;
        host.seed("posts/readme.txt", "not a post").await;
        host.files.lock().await.insert(
            "posts/corrupt.md".to_string(),
            FakeFile {
                sha: "sha-corrupt".to_string(),
                content: "%%% not base64 %%%".to_string(),
            },
        );

        let posts = client(&host).list_posts().await.unwrap();
        let slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, ["newer", "older"]);
    }

    #[tokio::test]
    async fn test_list_posts_takes_slug_from_file_name() {
        let host = Arc::new(FakeHost::default());
        let renamed = post("original-slug", "A Completely New Title", 2);
        host.seed("posts/original-slug.md", &front_matter::encode(&renamed))
            .await;

        let posts = client(&host).list_posts().await.unwrap();
        assert_eq!(posts[0].slug, "original-slug");
        assert_eq!(posts[0].title, "A Completely New Title");
    }

    #[tokio::test]
    async fn test_list_posts_on_missing_directory_is_empty() {
        let host = Arc::new(FakeHost::default());
        let posts = client(&host).list_posts().await.unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_get_post_missing_is_none() {
        let host = Arc::new(FakeHost::default());
        host.seed("posts/here.md", &front_matter::encode(&post("here", "Here", 1)))
            .await;

        let found = client(&host).get_post("missing-slug").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_get_post_round_trips_fields() {
        let host = Arc::new(FakeHost::default());
        let original = post("here", "Here", 1);
        host.seed("posts/here.md", &front_matter::encode(&original)).await;

        let found = client(&host).get_post("here").await.unwrap().unwrap();
        assert_eq!(found, original);
    }

    #[tokio::test]
    async fn test_create_post_writes_without_revision() {
        let host = Arc::new(FakeHost::default());
        let new_post = post("fresh", "Fresh", 3);

        client(&host).create_post(&new_post).await.unwrap();

        let stored = host.text_of("posts/fresh.md").await.unwrap();
        assert_eq!(stored, front_matter::encode(&new_post));
        assert_eq!(host.recorded_ops().await, ["put posts/fresh.md rev=none"]);
    }

    #[tokio::test]
    async fn test_create_post_rejects_existing_path() {
        let host = Arc::new(FakeHost::default());
        let new_post = post("fresh", "Fresh", 3);

        client(&host).create_post(&new_post).await.unwrap();
        let clash = client(&host).create_post(&new_post).await;
        assert!(matches!(clash, Err(StoreError::Remote { status: 422, .. })));
    }

    #[tokio::test]
    async fn test_update_post_fetches_revision_first() {
        let host = Arc::new(FakeHost::default());
        let mut existing = post("piece", "Piece", 4);
        host.seed("posts/piece.md", &front_matter::encode(&existing)).await;
        let sha = host.sha_of("posts/piece.md").await.unwrap();

        existing.content = "rewritten body".to_string();
        client(&host).update_post(&existing).await.unwrap();

        assert_eq!(
            host.recorded_ops().await,
            [
                "get posts/piece.md".to_string(),
                format!("put posts/piece.md rev={}", sha),
            ]
        );
        let stored = host.text_of("posts/piece.md").await.unwrap();
        assert!(stored.contains("rewritten body"));
    }

    #[tokio::test]
    async fn test_update_post_missing_is_an_error() {
        let host = Arc::new(FakeHost::default());
        let err = client(&host).update_post(&post("ghost", "Ghost", 5)).await;
        assert!(matches!(err, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_post_fetches_revision_first() {
        let host = Arc::new(FakeHost::default());
        host.seed("posts/gone.md", &front_matter::encode(&post("gone", "Gone", 6)))
            .await;
        let sha = host.sha_of("posts/gone.md").await.unwrap();

        client(&host).delete_post("gone").await.unwrap();

        assert!(host.text_of("posts/gone.md").await.is_none());
        assert_eq!(
            host.recorded_ops().await,
            [
                "get posts/gone.md".to_string(),
                format!("delete posts/gone.md rev={}", sha),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_post_missing_is_an_error() {
        let host = Arc::new(FakeHost::default());
        let err = client(&host).delete_post("never-was").await;
        assert!(matches!(err, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_posts_completes_past_missing_slugs() {
        let host = Arc::new(FakeHost::default());
        host.seed("posts/one.md", &front_matter::encode(&post("one", "One", 1)))
            .await;
        host.seed("posts/two.md", &front_matter::encode(&post("two", "Two", 2)))
            .await;

        let slugs = vec![
            "one".to_string(),
            "missing".to_string(),
            "two".to_string(),
        ];
        let outcomes = client(&host).delete_posts(&slugs).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_deleted());
        assert!(!outcomes[1].is_deleted());
        assert!(outcomes[2].is_deleted());
        assert!(matches!(
            outcomes[1].result,
            Err(StoreError::NotFound { .. })
        ));

        assert!(host.text_of("posts/one.md").await.is_none());
        assert!(host.text_of("posts/two.md").await.is_none());
    }

    #[tokio::test]
    async fn test_text_file_create_then_update() {
        let host = Arc::new(FakeHost::default());
        let repo = client(&host);

        assert!(repo.read_text_file("categories.json").await.unwrap().is_none());

        repo.write_text_file("categories.json", "Update categories", "[]")
            .await
            .unwrap();
        let first_sha = host.sha_of("posts/categories.json").await.unwrap();

        repo.write_text_file("categories.json", "Update categories", "[{}]")
            .await
            .unwrap();

        let text = repo.read_text_file("categories.json").await.unwrap().unwrap();
        assert_eq!(text, "[{}]");

        let ops = host.recorded_ops().await;
        assert!(ops.contains(&format!("put posts/categories.json rev={}", first_sha)));
    }
}
