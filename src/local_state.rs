//! Local persistence for session and draft state: one JSON file per
//! key under a state directory. Stands in for the browser storage the
//! editor keeps these things in.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::{fs, io};

use serde::de::DeserializeOwned;
use serde::Serialize;
use spdlog::warn;

use crate::error::StoreError;

pub const SESSION_FILE: &str = "session.json";
pub const DRAFT_FILE: &str = "draft.json";

#[derive(Clone)]
pub struct LocalState {
    root: PathBuf,
}

impl LocalState {
    /// State under the user's configuration directory.
    pub fn in_user_dir() -> Result<LocalState, StoreError> {
        let base = dirs::config_dir()
            .ok_or_else(|| StoreError::Local("no user configuration directory".to_string()))?;
        Ok(LocalState::at(base.join("gitpress")))
    }

    pub fn at(root: impl Into<PathBuf>) -> LocalState {
        LocalState { root: root.into() }
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Reads one state file. Missing and corrupt files both come back
    /// as `None`; corruption is logged, never surfaced.
    pub fn read<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let path = self.path_of(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("could not read {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("discarding corrupt state file {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|e| self.io_error(e))?;

        let text = serde_json::to_string_pretty(value)
            .map_err(|e| StoreError::Local(e.to_string()))?;
        fs::write(self.path_of(name), text).map_err(|e| self.io_error(e))
    }

    /// Removes one state file; already gone is fine.
    pub fn remove(&self, name: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_of(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, e: io::Error) -> StoreError {
        StoreError::Local(format!("{}: {}", self.root.display(), e))
    }
}
