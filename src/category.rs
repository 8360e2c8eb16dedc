//! In-memory category cache backed by one JSON manifest file in the
//! content directory. Mutations apply in memory first and rewrite the
//! whole manifest best-effort; a failed rewrite is reported but never
//! rolls the memory back.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use spdlog::{error, warn};

use crate::error::StoreError;
use crate::github::RepoClient;
use crate::text_utils::{format_instant, slugify};

pub const MANIFEST_FILE: &str = "categories.json";
const MANIFEST_MESSAGE: &str = "Update categories";
const FALLBACK_ID: &str = "uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Outcome of a category mutation: the change is already visible in
/// memory, `persist_error` says whether the manifest rewrite made it.
#[derive(Debug)]
pub struct Applied<T> {
    pub value: T,
    pub persist_error: Option<StoreError>,
}

impl<T> Applied<T> {
    pub fn persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

pub struct CategoryStore {
    categories: Vec<Category>,
}

impl Default for CategoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryStore {
    pub fn new() -> CategoryStore {
        CategoryStore { categories: vec![] }
    }

    /// Hydrates the cache from the manifest. Falls back to the default
    /// set when the store is not configured, the manifest is missing,
    /// unreadable, or holds no valid entry. When the store IS
    /// configured and the manifest was missing or invalid (but
    /// readable), the defaults are written back best-effort.
    pub async fn load(&mut self, client: Option<&RepoClient>) {
        let Some(client) = client else {
            self.categories = default_categories();
            return;
        };

        match client.read_text_file(MANIFEST_FILE).await {
            Ok(Some(text)) => match parse_manifest(&text) {
                Some(valid) if !valid.is_empty() => self.categories = valid,
                Some(_) => {
                    self.categories = default_categories();
                    self.write_back(client).await;
                }
                None => {
                    warn!("category manifest is not valid JSON, using defaults");
                    self.categories = default_categories();
                }
            },
            Ok(None) => {
                self.categories = default_categories();
                self.write_back(client).await;
            }
            Err(e) => {
                warn!("could not load category manifest: {}", e);
                self.categories = default_categories();
            }
        }
    }

    pub fn all(&self) -> &[Category] {
        &self.categories
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    /// The list with the `all` pseudo-category prepended, for filters
    /// that offer an everything view.
    pub fn with_all(&self) -> Vec<Category> {
        let now = format_instant(&Utc::now());
        let mut listed = vec![Category {
            id: "all".to_string(),
            label: "All".to_string(),
            created_at: now.clone(),
            updated_at: now,
        }];
        listed.extend(self.categories.iter().cloned());
        listed
    }

    /// Resolves a possibly-stale id: itself when known, else the first
    /// category, else the placeholder.
    pub fn resolve_or_first(&self, id: &str) -> String {
        if self.get(id).is_some() {
            return id.to_string();
        }
        self.categories
            .first()
            .map(|category| category.id.clone())
            .unwrap_or_else(|| FALLBACK_ID.to_string())
    }

    pub async fn create(
        &mut self,
        label: &str,
        client: Option<&RepoClient>,
    ) -> Result<Applied<Category>, StoreError> {
        let id = category_id(label);
        if self.get(&id).is_some() {
            return Err(StoreError::Category(format!(
                "category '{}' already exists",
                id
            )));
        }

        let now = format_instant(&Utc::now());
        let category = Category {
            id,
            label: label.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.categories.push(category.clone());

        let persist_error = self.try_persist(client).await;
        Ok(Applied {
            value: category,
            persist_error,
        })
    }

    /// Renames a category. The id is re-derived from the new label and
    /// must not collide with a different existing category; `createdAt`
    /// is kept, `updatedAt` bumped.
    pub async fn rename(
        &mut self,
        id: &str,
        new_label: &str,
        client: Option<&RepoClient>,
    ) -> Result<Applied<Category>, StoreError> {
        let index = self
            .categories
            .iter()
            .position(|category| category.id == id)
            .ok_or_else(|| StoreError::Category(format!("category '{}' does not exist", id)))?;

        let new_id = category_id(new_label);
        if new_id != id && self.get(&new_id).is_some() {
            return Err(StoreError::Category(format!(
                "category '{}' already exists",
                new_id
            )));
        }

        {
            let category = &mut self.categories[index];
            category.id = new_id;
            category.label = new_label.to_string();
            category.updated_at = format_instant(&Utc::now());
        }
        let value = self.categories[index].clone();

        let persist_error = self.try_persist(client).await;
        Ok(Applied {
            value,
            persist_error,
        })
    }

    /// Removes one category; asking for an id that is not there is an
    /// error (unlike the batch form).
    pub async fn delete(
        &mut self,
        id: &str,
        client: Option<&RepoClient>,
    ) -> Result<Applied<()>, StoreError> {
        let index = self
            .categories
            .iter()
            .position(|category| category.id == id)
            .ok_or_else(|| StoreError::Category(format!("category '{}' does not exist", id)))?;
        self.categories.remove(index);

        let persist_error = self.try_persist(client).await;
        Ok(Applied {
            value: (),
            persist_error,
        })
    }

    /// Removes every listed id that exists; missing ids are silently
    /// skipped. Returns how many were removed.
    pub async fn delete_many(
        &mut self,
        ids: &[String],
        client: Option<&RepoClient>,
    ) -> Applied<usize> {
        if ids.is_empty() {
            return Applied {
                value: 0,
                persist_error: None,
            };
        }

        let before = self.categories.len();
        self.categories.retain(|category| !ids.contains(&category.id));
        let removed = before - self.categories.len();

        let persist_error = self.try_persist(client).await;
        Applied {
            value: removed,
            persist_error,
        }
    }

    async fn try_persist(&self, client: Option<&RepoClient>) -> Option<StoreError> {
        let Some(client) = client else {
            return Some(StoreError::NotConfigured);
        };

        match self.persist(client).await {
            Ok(()) => None,
            Err(e) => {
                error!("could not save category manifest: {}", e);
                Some(e)
            }
        }
    }

    async fn persist(&self, client: &RepoClient) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.categories)
            .map_err(|e| StoreError::Local(e.to_string()))?;
        client
            .write_text_file(MANIFEST_FILE, MANIFEST_MESSAGE, &text)
            .await
    }

    async fn write_back(&self, client: &RepoClient) {
        if let Err(e) = self.persist(client).await {
            warn!("could not write default categories back: {}", e);
        }
    }
}

/// `None` means the text is not JSON at all; `Some(valid)` carries the
/// entries that have a usable id (the rest are dropped).
fn parse_manifest(text: &str) -> Option<Vec<Category>> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let Some(items) = value.as_array() else {
        return Some(vec![]);
    };

    let valid = items
        .iter()
        .filter_map(|item| serde_json::from_value::<Category>(item.clone()).ok())
        .filter(|category| !category.id.trim().is_empty())
        .collect();
    Some(valid)
}

fn category_id(label: &str) -> String {
    let slug = slugify(label);
    if slug.is_empty() {
        FALLBACK_ID.to_string()
    } else {
        slug
    }
}

fn default_categories() -> Vec<Category> {
    let now = format_instant(&Utc::now());
    [
        ("design", "Design"),
        ("development", "Development"),
        ("marketing", "Marketing"),
        ("business", "Business"),
    ]
    .iter()
    .map(|(id, label)| Category {
        id: id.to_string(),
        label: label.to_string(),
        created_at: now.clone(),
        updated_at: now.clone(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::github::fake::FakeHost;

    use super::*;

    fn repo(host: &Arc<FakeHost>) -> RepoClient {
        RepoClient::new(host.clone(), "posts")
    }

    fn ids(store: &CategoryStore) -> Vec<&str> {
        store.all().iter().map(|c| c.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_load_without_store_uses_defaults() {
        let mut store = CategoryStore::new();
        store.load(None).await;
        assert_eq!(ids(&store), ["design", "development", "marketing", "business"]);
    }

    #[tokio::test]
    async fn test_load_missing_manifest_writes_defaults_back() {
        let host = Arc::new(FakeHost::default());
        let client = repo(&host);

        let mut store = CategoryStore::new();
        store.load(Some(&client)).await;

        assert_eq!(store.all().len(), 4);
        let written = host.text_of("posts/categories.json").await.unwrap();
        assert!(written.contains("\"design\""));
        assert!(written.contains("\"createdAt\""));
    }

    #[tokio::test]
    async fn test_load_reads_stored_manifest() {
        let host = Arc::new(FakeHost::default());
        host.seed("posts/categories.json", crate::test_data::CATEGORY_MANIFEST)
            .await;
        let client = repo(&host);

        let mut store = CategoryStore::new();
        store.load(Some(&client)).await;

        assert_eq!(ids(&store), ["design", "development"]);
        assert_eq!(
            store.get("development").unwrap().updated_at,
            "2024-03-11T16:30:00.000Z"
        );
    }

    #[tokio::test]
    async fn test_load_keeps_valid_entries_only() {
        let host = Arc::new(FakeHost::default());
        let manifest = r#"[
            {"id": "good", "label": "Good", "createdAt": "x", "updatedAt": "x"},
            {"label": "no id"},
            {"id": "   ", "label": "blank id"}
        ]"#;
        host.seed("posts/categories.json", manifest).await;
        let client = repo(&host);

        let mut store = CategoryStore::new();
        store.load(Some(&client)).await;

        assert_eq!(ids(&store), ["good"]);
        // A usable manifest is not rewritten.
        let ops = host.recorded_ops().await;
        assert!(!ops.iter().any(|op| op.starts_with("put ")));
    }

    #[tokio::test]
    async fn test_load_non_array_manifest_falls_back_and_writes() {
        let host = Arc::new(FakeHost::default());
        host.seed("posts/categories.json", "{\"not\": \"an array\"}").await;
        let client = repo(&host);

        let mut store = CategoryStore::new();
        store.load(Some(&client)).await;

        assert_eq!(store.all().len(), 4);
        let written = host.text_of("posts/categories.json").await.unwrap();
        assert!(written.starts_with('['));
    }

    #[tokio::test]
    async fn test_load_unparsable_manifest_falls_back_without_writing() {
        let host = Arc::new(FakeHost::default());
        host.seed("posts/categories.json", "not json {{{").await;
        let client = repo(&host);

        let mut store = CategoryStore::new();
        store.load(Some(&client)).await;

        assert_eq!(store.all().len(), 4);
        assert_eq!(host.text_of("posts/categories.json").await.unwrap(), "not json {{{");
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let host = Arc::new(FakeHost::default());
        let client = repo(&host);

        let mut store = CategoryStore::new();
        let outcome = store.create("Field Notes", Some(&client)).await.unwrap();
        assert!(outcome.persisted());
        assert_eq!(outcome.value.id, "field-notes");

        let found = store.get("field-notes").unwrap();
        assert_eq!(found.label, "Field Notes");

        let written = host.text_of("posts/categories.json").await.unwrap();
        assert!(written.contains("\"field-notes\""));
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let mut store = CategoryStore::new();
        store.create("News", None).await.unwrap();

        let clash = store.create("news", None).await;
        assert!(matches!(clash, Err(StoreError::Category(_))));
        assert_eq!(store.all().len(), 1);
    }

    #[tokio::test]
    async fn test_create_empty_label_gets_placeholder_id() {
        let mut store = CategoryStore::new();
        let outcome = store.create("???", None).await.unwrap();
        assert_eq!(outcome.value.id, "uncategorized");
    }

    #[tokio::test]
    async fn test_mutation_without_store_keeps_memory_and_reports() {
        let mut store = CategoryStore::new();
        let outcome = store.create("Offline", None).await.unwrap();

        assert!(!outcome.persisted());
        assert!(matches!(outcome.persist_error, Some(StoreError::NotConfigured)));
        assert!(store.get("offline").is_some());
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_memory() {
        let host = Arc::new(FakeHost::default());
        *host.content_error.lock().await = Some(StoreError::Network("down".to_string()));
        let client = repo(&host);

        let mut store = CategoryStore::new();
        let outcome = store.create("Unsaved", Some(&client)).await.unwrap();

        assert!(!outcome.persisted());
        assert!(store.get("unsaved").is_some());
    }

    #[tokio::test]
    async fn test_rename_collision_leaves_both_unchanged() {
        let mut store = CategoryStore::new();
        store.create("Design", None).await.unwrap();
        store.create("Research", None).await.unwrap();

        let clash = store.rename("research", "Design", None).await;
        assert!(matches!(clash, Err(StoreError::Category(_))));

        assert_eq!(store.get("design").unwrap().label, "Design");
        assert_eq!(store.get("research").unwrap().label, "Research");
    }

    #[tokio::test]
    async fn test_rename_relabels_in_place() {
        let mut store = CategoryStore::new();
        let created = store.create("Design", None).await.unwrap().value;

        let outcome = store.rename("design", "Designs & Sketches", None).await.unwrap();
        assert_eq!(outcome.value.id, "designs-sketches");
        assert_eq!(outcome.value.label, "Designs & Sketches");
        assert_eq!(outcome.value.created_at, created.created_at);

        assert!(store.get("design").is_none());
        assert!(store.get("designs-sketches").is_some());
    }

    #[tokio::test]
    async fn test_rename_to_same_id_is_allowed() {
        let mut store = CategoryStore::new();
        store.create("Design", None).await.unwrap();

        let outcome = store.rename("design", "DESIGN", None).await.unwrap();
        assert_eq!(outcome.value.id, "design");
        assert_eq!(outcome.value.label, "DESIGN");
        assert_eq!(store.all().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_an_error() {
        let mut store = CategoryStore::new();
        let err = store.delete("ghost", None).await;
        assert!(matches!(err, Err(StoreError::Category(_))));
    }

    #[tokio::test]
    async fn test_delete_many_skips_missing_ids() {
        let mut store = CategoryStore::new();
        store.create("One", None).await.unwrap();
        store.create("Two", None).await.unwrap();
        store.create("Three", None).await.unwrap();

        let ids_to_drop = vec!["one".to_string(), "ghost".to_string(), "three".to_string()];
        let outcome = store.delete_many(&ids_to_drop, None).await;

        assert_eq!(outcome.value, 2);
        assert_eq!(ids(&store), ["two"]);
    }

    #[tokio::test]
    async fn test_delete_many_with_no_ids_is_a_no_op() {
        let host = Arc::new(FakeHost::default());
        let client = repo(&host);

        let mut store = CategoryStore::new();
        let outcome = store.delete_many(&[], Some(&client)).await;

        assert_eq!(outcome.value, 0);
        assert!(outcome.persisted());
        assert!(host.recorded_ops().await.is_empty());
    }

    #[tokio::test]
    async fn test_with_all_prepends_pseudo_category() {
        let mut store = CategoryStore::new();
        store.load(None).await;

        let listed = store.with_all();
        assert_eq!(listed[0].id, "all");
        assert_eq!(listed[0].label, "All");
        assert_eq!(listed.len(), 5);
    }

    #[tokio::test]
    async fn test_resolve_or_first() {
        let mut store = CategoryStore::new();
        assert_eq!(store.resolve_or_first("anything"), "uncategorized");

        store.load(None).await;
        assert_eq!(store.resolve_or_first("marketing"), "marketing");
        assert_eq!(store.resolve_or_first("long-gone"), "design");
    }
}
