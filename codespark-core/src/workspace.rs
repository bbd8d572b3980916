//! # Opened project workspace
//!
//! A [`Workspace`] is everything that exists while one project is selected:
//! its [`FileTree`], its [`EditorState`] and its chat [`Conversation`]. They
//! are created together on selection and dropped together on the next one.
//!
//! Tree mutations go through the workspace so that editor buffers follow
//! them: removing a path closes every buffer under it, renaming a path moves
//! them.

use crate::ai::{ContextFile, Conversation};
use crate::editor::{Buffer, CloseMode, EditorSnapshot, EditorState};
use crate::events::{notify, Event, EventType, SharedEventBus};
use crate::path;
use crate::project::ProjectId;
use crate::store::{FileStore, NodeKind};
use crate::tree::{FileNode, FileTree, FilteredView};
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// State of the selected project.
pub struct Workspace {
    project_id: ProjectId,
    /// Changes on every selection; stale AI results compare against it
    epoch: Uuid,
    tree: FileTree,
    editor: EditorState,
    conversation: Conversation,
    events: Option<SharedEventBus>,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("project_id", &self.project_id)
            .field("epoch", &self.epoch)
            .field("files", &self.tree.file_count())
            .field("editor", &self.editor)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Load a project's tree and open its first file, if any.
    ///
    /// # Errors
    ///
    /// [`Error::BackendUnavailable`] if the tree or the first file cannot
    /// be read.
    pub async fn load(
        project_id: ProjectId,
        store: Arc<dyn FileStore>,
        events: Option<SharedEventBus>,
    ) -> Result<Self> {
        let tree = FileTree::load(project_id, store).await?;
        let mut workspace = Self {
            project_id,
            epoch: Uuid::new_v4(),
            tree,
            editor: EditorState::new(),
            conversation: Conversation::new(),
            events,
        };

        if let Some(first) = workspace.tree.first_file() {
            workspace.editor.open(&mut workspace.tree, &first).await?;
        }
        Ok(workspace)
    }

    /// Project shown in this workspace.
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Identity of this selection.
    pub fn epoch(&self) -> Uuid {
        self.epoch
    }

    /// The file tree.
    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    /// The editor.
    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    /// Chat log.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub(crate) fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// Editor snapshot for rendering.
    pub fn snapshot(&self) -> EditorSnapshot {
        self.editor.snapshot()
    }

    /// What to render for the tree: the search result or everything.
    pub fn view(&self) -> FilteredView {
        self.tree.view()
    }

    async fn emit(&self, event: Event) {
        notify(self.events.as_ref(), event.with("project_id", self.project_id.to_string())).await;
    }

    /// Create a file or directory.
    pub async fn insert(&mut self, parent_path: &str, name: &str, kind: NodeKind) -> Result<FileNode> {
        let node = self.tree.insert(parent_path, name, kind).await?;
        self.emit(Event::new(EventType::FileCreated, node.path()).with("kind", kind.as_str()))
            .await;
        Ok(node)
    }

    /// Remove a file or directory and close every buffer beneath it.
    pub async fn remove(&mut self, raw: &str) -> Result<FileNode> {
        let target = path::normalize(raw)?;
        match self.tree.remove(&target).await {
            Ok(node) => {
                let closed = self.editor.forget_under(&target);
                if !closed.is_empty() {
                    info!("Closed {} buffers under removed '{}'", closed.len(), target);
                }
                self.emit(Event::new(EventType::FileRemoved, target)).await;
                Ok(node)
            }
            Err(e) => {
                // Part of the subtree may be gone; its buffers go with it
                let orphaned: Vec<String> = self
                    .editor
                    .open_paths()
                    .into_iter()
                    .filter(|p| path::is_same_or_under(&target, p) && self.tree.file(p).is_none())
                    .map(str::to_string)
                    .collect();
                for p in orphaned {
                    self.editor.forget_under(&p);
                }
                Err(e)
            }
        }
    }

    /// Rename a file or directory; open buffers follow it.
    pub async fn rename(&mut self, raw: &str, new_name: &str) -> Result<String> {
        let source = path::normalize(raw)?;
        let target = self.tree.rename(&source, new_name).await?;
        if target != source {
            self.editor.retarget(&source, &target);
            self.emit(Event::new(EventType::FileRenamed, target.clone()).with("from", source))
                .await;
        }
        Ok(target)
    }

    /// Filter the tree view.
    pub fn search(&mut self, term: &str) -> &FilteredView {
        self.tree.search(term)
    }

    /// Drop the tree filter.
    pub fn clear_search(&mut self) {
        self.tree.clear_search();
    }

    /// Make a file active.
    pub async fn open_file(&mut self, raw: &str) -> Result<&Buffer> {
        let buffer = self.editor.open(&mut self.tree, raw).await?;
        notify(
            self.events.as_ref(),
            Event::new(EventType::BufferOpened, path::normalize(raw)?),
        )
        .await;
        Ok(buffer)
    }

    /// Replace a file's buffer content.
    pub fn edit_file<S: Into<String>>(&mut self, raw: &str, content: S) -> Result<()> {
        self.editor.edit(&mut self.tree, raw, content)
    }

    /// Save a file's buffer.
    pub async fn flush_file(&mut self, raw: &str) -> Result<bool> {
        let written = self.editor.flush(&mut self.tree, raw).await?;
        if written {
            self.emit(Event::new(EventType::BufferSaved, path::normalize(raw)?))
                .await;
        }
        Ok(written)
    }

    /// Close a file's buffer.
    pub async fn close_file(&mut self, raw: &str, mode: CloseMode) -> Result<()> {
        self.editor.close(&mut self.tree, raw, mode)?;
        self.emit(Event::new(EventType::BufferClosed, path::normalize(raw)?))
            .await;
        Ok(())
    }

    /// Save every dirty buffer.
    ///
    /// Every buffer is attempted. Returns how many were written, or the
    /// first failure once all were tried.
    pub async fn flush_all(&mut self) -> Result<usize> {
        let mut written = 0;
        let mut first_error = None;

        for p in self.editor.dirty_paths() {
            match self.flush_file(&p).await {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to save '{}': {}", p, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    /// Current content of a file: the live buffer if open, else the
    /// persisted content (loaded and cached on first access).
    pub async fn read_file(&mut self, raw: &str) -> Result<String> {
        if let Some(buffer) = self.editor.buffer(raw) {
            return Ok(buffer.content().to_string());
        }
        self.tree.read_content(raw).await
    }

    /// Like [`read_file`](Self::read_file) without caching anything.
    pub async fn peek_file(&self, raw: &str) -> Result<ContextFile> {
        let canonical = path::normalize(raw)?;
        let file = self
            .tree
            .file(&canonical)
            .ok_or_else(|| Error::not_found(format!("file '{}'", canonical)))?;
        let content = match self.editor.buffer(&canonical) {
            Some(buffer) => buffer.content().to_string(),
            None => self.tree.peek_content(&canonical).await?,
        };
        Ok(ContextFile {
            language: file.language().to_string(),
            path: canonical,
            content,
        })
    }

    /// Collect context files, skipping paths that are not files.
    pub(crate) async fn context_files<'a, I>(&self, paths: I) -> Vec<ContextFile>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut files = Vec::new();
        for p in paths {
            match self.peek_file(p).await {
                Ok(file) => files.push(file),
                Err(e) => warn!("Skipping context file '{}': {}", p, e),
            }
        }
        files
    }

    /// Append text to a file's buffer and, optionally, save it.
    ///
    /// Returns whether the result was persisted. A failed save keeps the
    /// buffer dirty.
    pub(crate) async fn append_to_file(&mut self, raw: &str, separator: &str, text: &str, flush: bool) -> Result<bool> {
        let current = self.read_file(raw).await?;
        self.edit_file(raw, format!("{}{}{}", current, separator, text))?;

        if !flush {
            return Ok(false);
        }
        match self.flush_file(raw).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Generated code kept unsaved in '{}': {}", raw, e);
                Ok(false)
            }
        }
    }

    /// Report unsaved buffers before the workspace is dropped.
    pub(crate) fn warn_unsaved(&self) {
        let dirty = self.editor.dirty_paths();
        if !dirty.is_empty() {
            warn!(
                "Closing project {} with {} unsaved buffers: {}",
                self.project_id,
                dirty.len(),
                dirty.join(", ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::testing::FlakyStore;

    async fn workspace_with_files() -> (Workspace, Arc<FlakyStore>) {
        let store = Arc::new(FlakyStore::new());
        let project = ProjectId::new();
        for path in ["/src/app.js", "/src/lib/math.js", "/README.md"] {
            store
                .inner()
                .create_node(project, path, NodeKind::File)
                .await
                .unwrap();
        }
        let workspace = Workspace::load(project, store.clone(), None).await.unwrap();
        (workspace, store)
    }

    #[tokio::test]
    async fn test_load_opens_first_file_in_path_order() {
        let (workspace, _) = workspace_with_files().await;
        assert_eq!(workspace.editor().active_path(), Some("/README.md"));
        assert_eq!(workspace.tree().file_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_project_has_no_active_file() {
        let store = Arc::new(FlakyStore::new());
        let workspace = Workspace::load(ProjectId::new(), store, None).await.unwrap();
        assert!(workspace.editor().active_path().is_none());
    }

    #[tokio::test]
    async fn test_remove_closes_buffers_beneath() {
        let (mut workspace, _) = workspace_with_files().await;
        workspace.open_file("/src/lib/math.js").await.unwrap();
        workspace.edit_file("/src/app.js", "x").unwrap();

        workspace.remove("/src").await.unwrap();
        assert!(workspace.editor().buffer("/src/app.js").is_none());
        assert!(workspace.editor().active_path().is_none());
        assert!(workspace.editor().buffer("/README.md").is_some());
    }

    #[tokio::test]
    async fn test_rename_then_edit_new_path() {
        let (mut workspace, store) = workspace_with_files().await;
        workspace.open_file("/src/lib/math.js").await.unwrap();

        let new_path = workspace.rename("/src/lib", "util").await.unwrap();
        assert_eq!(new_path, "/src/util");
        assert_eq!(workspace.editor().active_path(), Some("/src/util/math.js"));

        workspace.edit_file("/src/util/math.js", "export const add = (a, b) => a + b;").unwrap();
        workspace.flush_file("/src/util/math.js").await.unwrap();
        let persisted = store
            .inner()
            .content_at(workspace.project_id(), "/src/util/math.js")
            .await;
        assert_eq!(persisted.as_deref(), Some("export const add = (a, b) => a + b;"));
    }

    #[tokio::test]
    async fn test_flush_all_attempts_every_buffer() {
        let (mut workspace, store) = workspace_with_files().await;
        workspace.edit_file("/src/app.js", "a").unwrap();
        workspace.edit_file("/README.md", "b").unwrap();

        store.fail_after("write_content", 1);
        assert!(workspace.flush_all().await.unwrap_err().is_backend_unavailable());
        assert_eq!(workspace.editor().dirty_paths().len(), 1);

        store.heal("write_content");
        assert_eq!(workspace.flush_all().await.unwrap(), 1);
        assert!(!workspace.editor().has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_mutations_emit_events() {
        let store = Arc::new(FlakyStore::new());
        let bus = EventBus::shared().await.unwrap();
        let mut workspace = Workspace::load(ProjectId::new(), store, Some(bus.clone()))
            .await
            .unwrap();

        workspace.insert("", "a.rs", NodeKind::File).await.unwrap();
        workspace.rename("/a.rs", "b.rs").await.unwrap();
        workspace.remove("/b.rs").await.unwrap();

        let kinds: Vec<_> = bus
            .read()
            .await
            .pending()
            .await
            .iter()
            .map(|e| e.event_type())
            .collect();
        assert_eq!(
            kinds,
            vec![EventType::FileCreated, EventType::FileRenamed, EventType::FileRemoved]
        );
    }

    #[tokio::test]
    async fn test_peek_prefers_live_buffer() {
        let (mut workspace, _) = workspace_with_files().await;
        workspace.edit_file("/src/app.js", "live").unwrap();
        let file = workspace.peek_file("/src/app.js").await.unwrap();
        assert_eq!(file.content, "live");
        assert_eq!(file.language, "javascript");

        let files = workspace.context_files(["/src/app.js", "/missing.js", "/src"]).await;
        assert_eq!(files.len(), 1);
    }
}
