//! # Project registry for CodeSpark Core
//!
//! The [`ProjectRegistry`] owns the list of projects and the one that is
//! currently selected. Selecting a project loads its file tree from the
//! [`FileStore`] into a fresh [`Workspace`]; the previous workspace, with any
//! buffers it still had, is dropped.
//!
//! Project records are kept in memory and can be saved to and loaded from a
//! JSON index file. File trees always live in the store.

use crate::events::{notify, Event, EventType, SharedEventBus};
use crate::store::FileStore;
use crate::workspace::Workspace;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Branch label reported for every project.
pub const DEFAULT_BRANCH: &str = "main";

/// Format version written to project index files.
const INDEX_VERSION: u32 = 1;

/// Identity of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Uuid);

impl ProjectId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ProjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A coding project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub id: ProjectId,
    /// Display name, never blank
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Main language identifier
    pub language: String,
    /// Whether the project is visible to others
    pub is_public: bool,
    /// Remote repository, if any
    pub repository_url: Option<String>,
    /// Creation time
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last metadata change
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Project {
    /// Build a project record from creation parameters.
    ///
    /// No validation happens here; [`ProjectRegistry::create`] validates.
    pub fn new(params: NewProject) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: ProjectId::new(),
            name: params.name.trim().to_string(),
            description: params.description,
            language: params.language,
            is_public: params.is_public,
            repository_url: params.repository_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Version-control branch label.
    pub fn branch(&self) -> &'static str {
        DEFAULT_BRANCH
    }
}

/// Parameters of [`ProjectRegistry::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Main language; the registry default is used when blank
    pub language: String,
    /// Visibility
    pub is_public: bool,
    /// Remote repository
    pub repository_url: Option<String>,
}

impl NewProject {
    /// Parameters with a name and defaults for everything else.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// Set the language.
    pub fn language<S: Into<String>>(mut self, language: S) -> Self {
        self.language = language.into();
        self
    }

    /// Set the visibility.
    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// Set the repository URL.
    pub fn repository_url<S: Into<String>>(mut self, url: S) -> Self {
        self.repository_url = Some(url.into());
        self
    }
}

/// Partial update for [`ProjectRegistry::update`]; `None` leaves a field
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New language
    pub language: Option<String>,
    /// New visibility
    pub is_public: Option<bool>,
    /// New repository URL; `Some(None)` clears it
    pub repository_url: Option<Option<String>>,
}

/// Dashboard filter over the project list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    /// Case-insensitive substring of the name or description
    pub term: Option<String>,
    /// Exact language
    pub language: Option<String>,
}

impl ProjectFilter {
    /// Filter matching every project.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to a search term.
    pub fn term<S: Into<String>>(mut self, term: S) -> Self {
        self.term = Some(term.into());
        self
    }

    /// Restrict to a language.
    pub fn language<S: Into<String>>(mut self, language: S) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Whether `project` passes the filter.
    pub fn matches(&self, project: &Project) -> bool {
        let term_ok = match self.term.as_deref().map(str::to_lowercase) {
            Some(term) if !term.is_empty() => {
                project.name.to_lowercase().contains(&term)
                    || project.description.to_lowercase().contains(&term)
            }
            _ => true,
        };
        let language_ok = self
            .language
            .as_deref()
            .map_or(true, |language| project.language == language);
        term_ok && language_ok
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectIndex {
    version: u32,
    projects: Vec<Project>,
}

/// Project list plus the selected project's workspace.
///
/// # Example
///
/// ```rust
/// use codespark_core::project::{NewProject, ProjectRegistry};
/// use codespark_core::store::MemoryFileStore;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let mut registry = ProjectRegistry::new(Arc::new(MemoryFileStore::new()));
/// let project = registry.create(NewProject::new("demo").language("rust")).await?;
///
/// let workspace = registry.select(project.id).await?;
/// assert_eq!(workspace.tree().file_count(), 0);
/// assert_eq!(registry.active_project().unwrap().name, "demo");
/// # Ok::<(), codespark_core::Error>(())
/// # });
/// ```
pub struct ProjectRegistry {
    projects: BTreeMap<ProjectId, Project>,
    active: Option<Workspace>,
    store: Arc<dyn FileStore>,
    events: Option<SharedEventBus>,
    /// Most recent first
    recent: Vec<ProjectId>,
    max_recent: usize,
    default_language: String,
}

impl fmt::Debug for ProjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectRegistry")
            .field("projects", &self.projects.len())
            .field("active", &self.active)
            .field("recent", &self.recent)
            .finish_non_exhaustive()
    }
}

impl ProjectRegistry {
    /// Create an empty registry over a store.
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self {
            projects: BTreeMap::new(),
            active: None,
            store,
            events: None,
            recent: Vec::new(),
            max_recent: 10,
            default_language: "javascript".to_string(),
        }
    }

    /// Attach an event bus; workspaces opened afterwards use it too.
    pub fn with_events(mut self, events: SharedEventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Language given to projects created without one.
    pub fn set_default_language<S: Into<String>>(&mut self, language: S) {
        self.default_language = language.into();
    }

    /// Number of recent projects remembered.
    pub fn set_max_recent(&mut self, max_recent: usize) {
        self.max_recent = max_recent;
        self.recent.truncate(max_recent);
    }

    /// The file store.
    pub fn store(&self) -> &Arc<dyn FileStore> {
        &self.store
    }

    /// All projects, most recently updated first.
    pub fn list(&self) -> Vec<&Project> {
        let mut projects: Vec<&Project> = self.projects.values().collect();
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.name.cmp(&b.name)));
        projects
    }

    /// Projects passing `filter`, in [`list`](Self::list) order.
    pub fn filter(&self, filter: &ProjectFilter) -> Vec<&Project> {
        self.list().into_iter().filter(|p| filter.matches(p)).collect()
    }

    /// Distinct non-blank languages, sorted.
    pub fn languages(&self) -> Vec<String> {
        self.projects
            .values()
            .filter(|p| !p.language.trim().is_empty())
            .map(|p| p.language.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// A project by id.
    pub fn get(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id)
    }

    /// Number of projects.
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Whether there are no projects.
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Selected projects, most recent first.
    pub fn recent_projects(&self) -> &[ProjectId] {
        &self.recent
    }

    /// Workspace of the selected project.
    pub fn active(&self) -> Option<&Workspace> {
        self.active.as_ref()
    }

    /// Mutable workspace of the selected project.
    pub fn active_mut(&mut self) -> Option<&mut Workspace> {
        self.active.as_mut()
    }

    /// Record of the selected project.
    pub fn active_project(&self) -> Option<&Project> {
        self.active.as_ref().and_then(|ws| self.projects.get(&ws.project_id()))
    }

    /// Create a project with an empty tree.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if the name is blank.
    pub async fn create(&mut self, params: NewProject) -> Result<Project> {
        if params.name.trim().is_empty() {
            return Err(Error::validation("name", "Project name cannot be blank"));
        }

        let mut project = Project::new(params);
        if project.language.trim().is_empty() {
            project.language = self.default_language.clone();
        }

        self.projects.insert(project.id, project.clone());
        info!("Created project '{}' ({})", project.name, project.id);
        notify(
            self.events.as_ref(),
            Event::new(EventType::ProjectCreated, project.id.to_string()),
        )
        .await;
        Ok(project)
    }

    /// Change a project's details.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown id, [`Error::Validation`] for a
    /// blank name.
    pub async fn update(&mut self, id: ProjectId, changes: ProjectUpdate) -> Result<Project> {
        if let Some(name) = &changes.name {
            if name.trim().is_empty() {
                return Err(Error::validation("name", "Project name cannot be blank"));
            }
        }
        let project = self
            .projects
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("project {}", id)))?;

        if let Some(name) = changes.name {
            project.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            project.description = description;
        }
        if let Some(language) = changes.language {
            project.language = language;
        }
        if let Some(is_public) = changes.is_public {
            project.is_public = is_public;
        }
        if let Some(url) = changes.repository_url {
            project.repository_url = url;
        }
        project.updated_at = chrono::Utc::now();

        let project = project.clone();
        debug!("Updated project {}", id);
        notify(
            self.events.as_ref(),
            Event::new(EventType::ProjectUpdated, id.to_string()),
        )
        .await;
        Ok(project)
    }

    /// Make a project current: load its tree into a fresh workspace and open
    /// its first file.
    ///
    /// Unsaved buffers of the previous workspace are dropped with a warning.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown id; [`Error::BackendUnavailable`]
    /// if loading fails, in which case the previous workspace stays current.
    pub async fn select(&mut self, id: ProjectId) -> Result<&mut Workspace> {
        let name = self
            .projects
            .get(&id)
            .map(|p| p.name.clone())
            .ok_or_else(|| Error::not_found(format!("project {}", id)))?;

        let workspace = Workspace::load(id, Arc::clone(&self.store), self.events.clone()).await?;
        if let Some(previous) = self.active.take() {
            previous.warn_unsaved();
        }

        self.recent.retain(|p| *p != id);
        self.recent.insert(0, id);
        self.recent.truncate(self.max_recent);

        info!("Selected project '{}' ({})", name, id);
        notify(
            self.events.as_ref(),
            Event::new(EventType::ProjectSelected, id.to_string()),
        )
        .await;
        Ok(self.active.insert(workspace))
    }

    /// Drop the current workspace, if any.
    pub fn close(&mut self) {
        if let Some(previous) = self.active.take() {
            previous.warn_unsaved();
            debug!("Closed project {}", previous.project_id());
        }
    }

    /// Delete a project and every persisted node of its tree.
    ///
    /// Nodes are deleted deepest first. If the store fails midway the
    /// project record is kept so the delete can be retried, and the project
    /// is closed if some of its nodes are already gone.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown id, [`Error::BackendUnavailable`]
    /// if the store fails.
    pub async fn delete(&mut self, id: ProjectId) -> Result<Project> {
        if !self.projects.contains_key(&id) {
            return Err(Error::not_found(format!("project {}", id)));
        }

        let mut entries = self
            .store
            .list_tree(id)
            .await
            .map_err(|e| Error::backend_unavailable("list_tree", e))?
            .entries;
        entries.sort_by_key(|e| std::cmp::Reverse(crate::path::segments(&e.path).count()));

        for (deleted, entry) in entries.iter().enumerate() {
            if let Err(e) = self.store.delete_node(entry.node_id).await {
                // The open tree would list nodes the store no longer has
                if deleted > 0 && self.active.as_ref().map(|ws| ws.project_id()) == Some(id) {
                    warn!(
                        "Closing project {} after {} of {} nodes were deleted",
                        id,
                        deleted,
                        entries.len()
                    );
                    self.close();
                }
                return Err(Error::backend_unavailable("delete_node", e));
            }
        }

        if self.active.as_ref().map(|ws| ws.project_id()) == Some(id) {
            self.close();
        }
        self.recent.retain(|p| *p != id);
        let project = self
            .projects
            .remove(&id)
            .ok_or_else(|| Error::not_found(format!("project {}", id)))?;

        info!(
            "Deleted project '{}' ({}) and {} nodes",
            project.name,
            id,
            entries.len()
        );
        notify(
            self.events.as_ref(),
            Event::new(EventType::ProjectDeleted, id.to_string()),
        )
        .await;
        Ok(project)
    }

    /// Write every project record to a JSON index file.
    pub async fn save_index<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let index = ProjectIndex {
            version: INDEX_VERSION,
            projects: self.projects.values().cloned().collect(),
        };
        let content = serde_json::to_string_pretty(&index)?;
        tokio::fs::write(path, content).await?;
        debug!("Saved {} projects to {:?}", index.projects.len(), path);
        Ok(())
    }

    /// Replace the project records with those of a JSON index file.
    ///
    /// A missing file yields an empty registry. The current workspace is
    /// closed if its project is not in the index. Returns the number of
    /// projects loaded.
    pub async fn load_index<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let projects = if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let index: ProjectIndex = serde_json::from_str(&content)?;
            if index.version > INDEX_VERSION {
                warn!(
                    "Project index {:?} has version {}, newer than {}",
                    path, index.version, INDEX_VERSION
                );
            }
            index.projects
        } else {
            Vec::new()
        };

        self.projects = projects.into_iter().map(|p| (p.id, p)).collect();
        if let Some(id) = self.active.as_ref().map(|ws| ws.project_id()) {
            if !self.projects.contains_key(&id) {
                self.close();
            }
        }
        let known = &self.projects;
        self.recent.retain(|id| known.contains_key(id));

        debug!("Loaded {} projects from {:?}", self.projects.len(), path);
        Ok(self.projects.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NodeKind;
    use crate::testing::FlakyStore;
    use tempfile::tempdir;

    fn registry() -> (ProjectRegistry, Arc<FlakyStore>) {
        let store = Arc::new(FlakyStore::new());
        (ProjectRegistry::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_create_validates_name_and_defaults_language() {
        let (mut registry, _) = registry();
        let err = registry.create(NewProject::new("   ")).await.unwrap_err();
        assert!(err.is_validation());
        assert!(registry.is_empty());

        let project = registry.create(NewProject::new("  api ")).await.unwrap();
        assert_eq!(project.name, "api");
        assert_eq!(project.language, "javascript");
        assert_eq!(project.branch(), "main");
    }

    #[tokio::test]
    async fn test_select_unknown_project() {
        let (mut registry, _) = registry();
        let err = registry.select(ProjectId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_failed_select_keeps_previous_workspace() {
        let (mut registry, store) = registry();
        let a = registry.create(NewProject::new("a")).await.unwrap();
        let b = registry.create(NewProject::new("b")).await.unwrap();
        registry.select(a.id).await.unwrap();

        store.fail("list_tree");
        assert!(registry.select(b.id).await.unwrap_err().is_backend_unavailable());
        assert_eq!(registry.active().unwrap().project_id(), a.id);
    }

    #[tokio::test]
    async fn test_select_replaces_workspace_and_tracks_recent() {
        let (mut registry, _) = registry();
        let a = registry.create(NewProject::new("a")).await.unwrap();
        let b = registry.create(NewProject::new("b")).await.unwrap();

        let first_epoch = registry.select(a.id).await.unwrap().epoch();
        registry.select(b.id).await.unwrap();
        let again = registry.select(a.id).await.unwrap().epoch();

        assert_ne!(first_epoch, again);
        assert_eq!(registry.recent_projects(), &[a.id, b.id]);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_store() {
        let (mut registry, store) = registry();
        let project = registry.create(NewProject::new("doomed")).await.unwrap();
        let workspace = registry.select(project.id).await.unwrap();
        workspace.insert("", "src", NodeKind::Directory).await.unwrap();
        workspace.insert("/src", "main.py", NodeKind::File).await.unwrap();

        registry.delete(project.id).await.unwrap();
        assert!(registry.active().is_none());
        assert_eq!(store.inner().node_count(project.id).await, 0);
        assert!(registry.select(project.id).await.unwrap_err().is_not_found());
        assert!(registry.delete(project.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_record() {
        let (mut registry, store) = registry();
        let project = registry.create(NewProject::new("p")).await.unwrap();
        registry
            .select(project.id)
            .await
            .unwrap()
            .insert("", "a.rs", NodeKind::File)
            .await
            .unwrap();

        store.fail("delete_node");
        assert!(registry.delete(project.id).await.unwrap_err().is_backend_unavailable());
        assert!(registry.get(project.id).is_some());
        assert_eq!(registry.active().unwrap().tree().file_count(), 1);
    }

    #[tokio::test]
    async fn test_partially_deleted_project_is_closed() {
        let (mut registry, store) = registry();
        let project = registry.create(NewProject::new("p")).await.unwrap();
        let workspace = registry.select(project.id).await.unwrap();
        workspace.insert("", "a.js", NodeKind::File).await.unwrap();
        workspace.insert("", "b.js", NodeKind::File).await.unwrap();

        store.fail_after("delete_node", 1);
        assert!(registry.delete(project.id).await.unwrap_err().is_backend_unavailable());
        assert!(registry.get(project.id).is_some());
        assert!(registry.active().is_none());
        assert_eq!(store.inner().node_count(project.id).await, 1);

        // Reopening shows what the store still has, and the retry finishes
        let workspace = registry.select(project.id).await.unwrap();
        assert_eq!(workspace.tree().file_count(), 1);
        let remaining = workspace.tree().file_paths()[0].clone();
        workspace.edit_file(&remaining, "kept").unwrap();
        assert!(workspace.flush_file(&remaining).await.unwrap());

        registry.delete(project.id).await.unwrap();
        assert_eq!(store.inner().node_count(project.id).await, 0);
    }

    #[tokio::test]
    async fn test_update_and_filter() {
        let (mut registry, _) = registry();
        let web = registry
            .create(NewProject::new("Web shop").description("Storefront").language("typescript"))
            .await
            .unwrap();
        registry
            .create(NewProject::new("Scraper").description("Crawls the web").language("python"))
            .await
            .unwrap();
        registry
            .create(NewProject::new("Engine").language("rust"))
            .await
            .unwrap();

        let hits = registry.filter(&ProjectFilter::all().term("WEB"));
        assert_eq!(hits.len(), 2);
        let hits = registry.filter(&ProjectFilter::all().term("web").language("python"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Scraper");
        assert_eq!(registry.languages(), vec!["python", "rust", "typescript"]);

        let updated = registry
            .update(
                web.id,
                ProjectUpdate {
                    language: Some("javascript".into()),
                    repository_url: Some(Some("https://example.com/shop.git".into())),
                    ..ProjectUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.language, "javascript");
        assert!(updated.updated_at >= web.updated_at);

        let err = registry
            .update(web.id, ProjectUpdate { name: Some(" ".into()), ..ProjectUpdate::default() })
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_index_roundtrip() {
        let dir = tempdir().unwrap();
        let index = dir.path().join("projects.json");
        let store: Arc<dyn FileStore> = Arc::new(FlakyStore::new());

        let mut registry = ProjectRegistry::new(Arc::clone(&store));
        let project = registry.create(NewProject::new("kept").public(true)).await.unwrap();
        registry.save_index(&index).await.unwrap();

        let mut restored = ProjectRegistry::new(store);
        assert_eq!(restored.load_index(&index).await.unwrap(), 1);
        assert_eq!(restored.get(project.id), Some(&project));

        let missing = dir.path().join("none.json");
        assert_eq!(restored.load_index(&missing).await.unwrap(), 0);
    }
}
