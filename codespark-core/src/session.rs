//! # Session persistence
//!
//! User state that survives restarts: the recently selected projects and the
//! one that was active when the process last exited. This is kept apart from
//! [`Config`](crate::Config) so that settings files stay hand-editable.

use crate::project::ProjectId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User session data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    /// Recently selected projects, most recent first
    pub recent_projects: Vec<ProjectId>,
    /// The project active at last exit
    pub last_opened_project: Option<ProjectId>,
}

impl Session {
    /// Load session data from the default location.
    ///
    /// A missing or corrupt file yields an empty session.
    pub fn load() -> Self {
        match Self::session_file_path().and_then(|path| Self::load_from(&path)) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Failed to load session: {}. Using default.", e);
                Self::default()
            }
        }
    }

    /// Load session data from `path`; a missing file is an empty session.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read session file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse session file: {}", e)))
    }

    /// Save session data to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::session_file_path()?)
    }

    /// Save session data to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::config(format!("Failed to create session directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| Error::config(format!("Failed to write session file: {}", e)))?;

        Ok(())
    }

    /// Move `id` to the front of the recent list and mark it last opened.
    pub fn add_recent_project(&mut self, id: ProjectId, max_count: usize) {
        self.recent_projects.retain(|p| *p != id);
        self.recent_projects.insert(0, id);
        self.recent_projects.truncate(max_count);
        self.last_opened_project = Some(id);
    }

    /// Drop every reference to a deleted project.
    pub fn forget_project(&mut self, id: ProjectId) {
        self.recent_projects.retain(|p| *p != id);
        if self.last_opened_project == Some(id) {
            self.last_opened_project = None;
        }
    }

    fn session_file_path() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join("codespark").join("session.json"))
            .ok_or_else(|| Error::config("Could not determine data directory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_recent_projects_are_deduplicated_and_trimmed() {
        let mut session = Session::default();
        let ids: Vec<_> = (0..4).map(|_| ProjectId::new()).collect();
        for id in &ids {
            session.add_recent_project(*id, 3);
        }
        session.add_recent_project(ids[2], 3);

        assert_eq!(session.recent_projects, vec![ids[2], ids[3], ids[1]]);
        assert_eq!(session.last_opened_project, Some(ids[2]));

        session.forget_project(ids[2]);
        assert_eq!(session.recent_projects, vec![ids[3], ids[1]]);
        assert_eq!(session.last_opened_project, None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("session.json");
        assert_eq!(Session::load_from(&path).unwrap(), Session::default());

        let mut session = Session::default();
        session.add_recent_project(ProjectId::new(), 10);
        session.save_to(&path).unwrap();

        assert_eq!(Session::load_from(&path).unwrap(), session);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Session::load_from(&path).unwrap_err().is_config());
    }
}
