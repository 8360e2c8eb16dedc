//! Autosave cache for the post being edited. One snapshot, overwritten
//! on every save, cleared on successful publish.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::local_state::{LocalState, DRAFT_FILE};

/// The editor snapshot as typed: tags stay one comma-joined string and
/// nothing is normalized until publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub content: String,
    pub saved_at: String,
}

pub fn save(state: &LocalState, draft: &Draft) -> Result<(), StoreError> {
    state.write(DRAFT_FILE, draft)
}

/// The last saved snapshot; missing and corrupt files are both `None`.
pub fn load(state: &LocalState) -> Option<Draft> {
    state.read(DRAFT_FILE)
}

pub fn clear(state: &LocalState) -> Result<(), StoreError> {
    state.remove(DRAFT_FILE)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn draft(title: &str) -> Draft {
        Draft {
            title: title.to_string(),
            description: "desc".to_string(),
            category: "design".to_string(),
            tags: "one, two".to_string(),
            cover_image: None,
            content: "# heading".to_string(),
            saved_at: "2024-05-20T09:15:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = tempdir().unwrap();
        let state = LocalState::at(dir.path());

        save(&state, &draft("first")).unwrap();
        save(&state, &draft("second")).unwrap();

        let loaded = load(&state).unwrap();
        assert_eq!(loaded.title, "second");
    }

    #[test]
    fn test_clear_removes_snapshot() {
        let dir = tempdir().unwrap();
        let state = LocalState::at(dir.path());

        save(&state, &draft("kept")).unwrap();
        clear(&state).unwrap();
        assert!(load(&state).is_none());
    }

    #[test]
    fn test_corrupt_snapshot_loads_as_none() {
        let dir = tempdir().unwrap();
        let state = LocalState::at(dir.path());

        fs::create_dir_all(dir.path()).unwrap();
        fs::write(state.path_of(DRAFT_FILE), "not json at all").unwrap();
        assert!(load(&state).is_none());
    }
}
