//! # Editor buffers
//!
//! [`EditorState`] tracks the active file and the live content of every file
//! opened (or touched by an AI intent) since the project was loaded. It owns
//! no tree nodes: buffers are keyed by canonical path and every operation
//! re-resolves that path against the [`FileTree`] it is handed, so a rename or
//! removal elsewhere can never leave the editor holding a stale node.
//!
//! Files nobody opened have no buffer; their content is read from the tree on
//! demand.

use crate::path;
use crate::tree::FileTree;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// How [`EditorState::close`] treats unsaved edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMode {
    /// Refuse to close a dirty buffer
    RequireClean,
    /// Drop unsaved edits
    Discard,
}

/// Live content of an open file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Buffer {
    content: String,
    dirty: bool,
}

impl Buffer {
    /// Current content, including unsaved edits.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the content differs from what was last persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Read-only view of the editor for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorSnapshot {
    /// Active file, if any
    pub active_path: Option<String>,
    /// Buffer content of the active file
    pub content: Option<String>,
    /// Dirty flag of the active file
    pub dirty: bool,
    /// Every path with a buffer
    pub open_paths: Vec<String>,
}

/// Active file cursor plus open buffers.
///
/// # Example
///
/// ```rust
/// use codespark_core::editor::{CloseMode, EditorState};
/// use codespark_core::project::ProjectId;
/// use codespark_core::store::{MemoryFileStore, NodeKind};
/// use codespark_core::tree::FileTree;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let mut tree = FileTree::new(ProjectId::new(), Arc::new(MemoryFileStore::new()));
/// tree.insert("", "notes.md", NodeKind::File).await?;
///
/// let mut editor = EditorState::new();
/// editor.open(&mut tree, "/notes.md").await?;
/// editor.edit(&mut tree, "/notes.md", "# Notes")?;
/// assert!(editor.close(&mut tree, "/notes.md", CloseMode::RequireClean).is_err());
///
/// editor.flush(&mut tree, "/notes.md").await?;
/// editor.close(&mut tree, "/notes.md", CloseMode::RequireClean)?;
/// # Ok::<(), codespark_core::Error>(())
/// # });
/// ```
#[derive(Debug, Default)]
pub struct EditorState {
    active_path: Option<String>,
    buffers: BTreeMap<String, Buffer>,
}

impl EditorState {
    /// Create an editor with nothing open.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active file.
    pub fn active_path(&self) -> Option<&str> {
        self.active_path.as_deref()
    }

    /// Buffer for a path, if open.
    pub fn buffer(&self, raw: &str) -> Option<&Buffer> {
        let canonical = path::normalize(raw).ok()?;
        self.buffers.get(&canonical)
    }

    /// Paths with a buffer, in path order.
    pub fn open_paths(&self) -> Vec<&str> {
        self.buffers.keys().map(String::as_str).collect()
    }

    /// Paths whose buffer holds unsaved edits.
    pub fn dirty_paths(&self) -> Vec<String> {
        self.buffers
            .iter()
            .filter(|(_, b)| b.dirty)
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Whether any buffer is dirty.
    pub fn has_unsaved_changes(&self) -> bool {
        self.buffers.values().any(|b| b.dirty)
    }

    /// Snapshot for rendering.
    pub fn snapshot(&self) -> EditorSnapshot {
        let active = self
            .active_path
            .as_ref()
            .and_then(|p| self.buffers.get(p));
        EditorSnapshot {
            active_path: self.active_path.clone(),
            content: active.map(|b| b.content.clone()),
            dirty: active.map(|b| b.dirty).unwrap_or(false),
            open_paths: self.buffers.keys().cloned().collect(),
        }
    }

    /// Make `path` the active file, creating its buffer from the tree's
    /// content if it has none.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] unless `path` is a file, or
    /// [`Error::BackendUnavailable`] if its content has to be loaded and the
    /// read fails. The cursor does not move on error.
    pub async fn open(&mut self, tree: &mut FileTree, raw: &str) -> Result<&Buffer> {
        let canonical = path::normalize(raw)?;
        if tree.file(&canonical).is_none() {
            return Err(Error::not_found(format!("file '{}'", canonical)));
        }

        if !self.buffers.contains_key(&canonical) {
            let content = tree.read_content(&canonical).await?;
            self.buffers.insert(
                canonical.clone(),
                Buffer {
                    content,
                    dirty: false,
                },
            );
        }

        debug!("Active file is now '{}'", canonical);
        self.active_path = Some(canonical.clone());
        self.buffers
            .get(&canonical)
            .ok_or_else(|| Error::not_found(format!("buffer '{}'", canonical)))
    }

    /// Replace the buffer content of `path` and mark it dirty.
    ///
    /// Creates the buffer if the file was not open. Does not touch the
    /// active cursor.
    pub fn edit<S: Into<String>>(&mut self, tree: &mut FileTree, raw: &str, content: S) -> Result<()> {
        let canonical = path::normalize(raw)?;
        if tree.file(&canonical).is_none() {
            return Err(Error::not_found(format!("file '{}'", canonical)));
        }

        let buffer = self.buffers.entry(canonical.clone()).or_insert(Buffer {
            content: String::new(),
            dirty: false,
        });
        buffer.content = content.into();
        buffer.dirty = true;
        tree.set_dirty(&canonical, true);
        Ok(())
    }

    /// Persist the buffer of `path`.
    ///
    /// Returns `false` when there was nothing to write (no buffer, or a
    /// clean one).
    ///
    /// # Errors
    ///
    /// [`Error::BackendUnavailable`] if the write fails; the buffer keeps its
    /// content and stays dirty so the flush can be retried.
    pub async fn flush(&mut self, tree: &mut FileTree, raw: &str) -> Result<bool> {
        let canonical = path::normalize(raw)?;
        let file_id = tree
            .file(&canonical)
            .ok_or_else(|| Error::not_found(format!("file '{}'", canonical)))?
            .file_id();

        let content = match self.buffers.get(&canonical) {
            Some(buffer) if buffer.dirty => buffer.content.clone(),
            _ => return Ok(false),
        };

        tree.store()
            .write_content(file_id, &content)
            .await
            .map_err(|e| Error::backend_unavailable("write_content", e))?;

        if let Some(buffer) = self.buffers.get_mut(&canonical) {
            buffer.dirty = false;
        }
        tree.record_persisted(&canonical, content);
        info!("Saved '{}'", canonical);
        Ok(true)
    }

    /// Close the buffer of `path`.
    ///
    /// Closing a path with no buffer is a no-op. Closing the active file
    /// clears the cursor.
    ///
    /// # Errors
    ///
    /// [`Error::PreconditionViolation`] for a dirty buffer under
    /// [`CloseMode::RequireClean`].
    pub fn close(&mut self, tree: &mut FileTree, raw: &str, mode: CloseMode) -> Result<()> {
        let canonical = path::normalize(raw)?;
        let dirty = self
            .buffers
            .get(&canonical)
            .map(|b| b.dirty)
            .unwrap_or(false);

        if dirty {
            match mode {
                CloseMode::RequireClean => {
                    return Err(crate::precondition!(
                        "'{}' has unsaved changes; flush or discard before closing",
                        canonical
                    ));
                }
                CloseMode::Discard => {
                    warn!("Discarding unsaved changes to '{}'", canonical);
                    tree.set_dirty(&canonical, false);
                }
            }
        }

        self.buffers.remove(&canonical);
        if self.active_path.as_deref() == Some(canonical.as_str()) {
            self.active_path = None;
        }
        debug!("Closed '{}'", canonical);
        Ok(())
    }

    /// Drop every buffer at or under `base`. Returns the dropped paths.
    pub(crate) fn forget_under(&mut self, base: &str) -> Vec<String> {
        let gone: Vec<String> = self
            .buffers
            .keys()
            .filter(|p| path::is_same_or_under(base, p))
            .cloned()
            .collect();
        for p in &gone {
            if self.buffers.get(p).map(|b| b.dirty).unwrap_or(false) {
                warn!("Dropping unsaved changes to removed file '{}'", p);
            }
            self.buffers.remove(p);
        }

        if self
            .active_path
            .as_deref()
            .map(|p| path::is_same_or_under(base, p))
            .unwrap_or(false)
        {
            self.active_path = None;
        }
        gone
    }

    /// Move buffers (and the cursor) from under `from` to under `to`.
    pub(crate) fn retarget(&mut self, from: &str, to: &str) {
        let moved: Vec<(String, String)> = self
            .buffers
            .keys()
            .filter_map(|p| path::rebase(p, from, to).map(|new| (p.clone(), new)))
            .collect();
        for (old, new) in moved {
            if let Some(buffer) = self.buffers.remove(&old) {
                self.buffers.insert(new, buffer);
            }
        }

        if let Some(active) = self.active_path.as_deref() {
            if let Some(new) = path::rebase(active, from, to) {
                self.active_path = Some(new);
            }
        }
    }
}
