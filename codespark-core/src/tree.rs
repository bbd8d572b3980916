//! # Project file tree
//!
//! [`FileTree`] owns the hierarchical namespace of one project. Directories
//! own their children in a map keyed by name and nodes carry no parent
//! pointers; a node's path is always recomputed top-down, so renaming a
//! directory rewrites every descendant path in one pass.
//!
//! Structural mutations (`insert`, `remove`, `rename`) are issued to the
//! [`FileStore`] first and applied to memory only once the store confirms.
//! Because every mutation takes `&mut self`, nobody can observe the tree
//! while a command is in flight, and a dropped future leaves it untouched.
//! A multi-node command that fails halfway is reconciled: renames already
//! applied by the store are reverted, deletions already applied are pruned.
//!
//! The filtered view produced by [`FileTree::search`] is derived data: it is
//! rebuilt from scratch on every search and after every mutation while a
//! search is active. Trees are expected to hold hundreds of nodes, not
//! millions, so no incremental maintenance is attempted.

use crate::language::language_for_path;
use crate::path;
use crate::project::ProjectId;
use crate::store::{FileStore, NodeId, NodeKind, TreeSnapshot};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A node of a project tree.
#[derive(Debug, Clone)]
pub enum FileNode {
    /// A directory and its children
    Directory(Directory),
    /// A file
    File(FileEntry),
}

/// A directory node.
#[derive(Debug, Clone)]
pub struct Directory {
    path: String,
    name: String,
    /// `None` for the root and for directories implied by a snapshot
    node_id: Option<NodeId>,
    children: BTreeMap<String, FileNode>,
}

/// A file node.
#[derive(Debug, Clone)]
pub struct FileEntry {
    path: String,
    name: String,
    file_id: NodeId,
    language: &'static str,
    /// Last persisted content, `None` until first read from the store
    content: Option<String>,
    dirty: bool,
}

impl FileNode {
    /// Canonical path of the node.
    pub fn path(&self) -> &str {
        match self {
            FileNode::Directory(dir) => &dir.path,
            FileNode::File(file) => &file.path,
        }
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        match self {
            FileNode::Directory(dir) => &dir.name,
            FileNode::File(file) => &file.name,
        }
    }

    /// Node kind.
    pub fn kind(&self) -> NodeKind {
        match self {
            FileNode::Directory(_) => NodeKind::Directory,
            FileNode::File(_) => NodeKind::File,
        }
    }

    /// Store identity, if the node is persisted.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            FileNode::Directory(dir) => dir.node_id,
            FileNode::File(file) => Some(file.file_id),
        }
    }

    /// Whether this node is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileNode::File(_))
    }

    /// Whether this node is a directory.
    pub fn is_directory(&self) -> bool {
        matches!(self, FileNode::Directory(_))
    }

    /// Borrow as a file.
    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            FileNode::File(file) => Some(file),
            FileNode::Directory(_) => None,
        }
    }

    /// Borrow as a directory.
    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            FileNode::Directory(dir) => Some(dir),
            FileNode::File(_) => None,
        }
    }

    /// Rewrite this node's path and every descendant path.
    fn rebase(&mut self, new_path: String) {
        match self {
            FileNode::Directory(dir) => {
                dir.name = path::name_of(&new_path).to_string();
                for (name, child) in dir.children.iter_mut() {
                    child.rebase(format!("{}/{}", new_path, name));
                }
                dir.path = new_path;
            }
            FileNode::File(file) => {
                file.name = path::name_of(&new_path).to_string();
                file.language = language_for_path(&new_path);
                file.path = new_path;
            }
        }
    }

    /// Persisted nodes of this subtree in pre-order: parents before children.
    fn collect_persisted(&self, out: &mut Vec<(NodeId, String)>) {
        if let Some(id) = self.node_id() {
            out.push((id, self.path().to_string()));
        }
        if let FileNode::Directory(dir) = self {
            for child in dir.children.values() {
                child.collect_persisted(out);
            }
        }
    }

    fn collect_files(&self, out: &mut Vec<String>) {
        match self {
            FileNode::File(file) => out.push(file.path.clone()),
            FileNode::Directory(dir) => {
                for child in dir.children.values() {
                    child.collect_files(out);
                }
            }
        }
    }
}

impl Directory {
    fn new(path: String, node_id: Option<NodeId>) -> Self {
        Self {
            name: path::name_of(&path).to_string(),
            path,
            node_id,
            children: BTreeMap::new(),
        }
    }

    /// Canonical path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store identity, if persisted.
    pub fn node_id(&self) -> Option<NodeId> {
        self.node_id
    }

    /// Child by name.
    pub fn child(&self, name: &str) -> Option<&FileNode> {
        self.children.get(name)
    }

    /// Children ordered by name.
    pub fn children(&self) -> impl Iterator<Item = &FileNode> {
        self.children.values()
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the directory has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl FileEntry {
    fn new(path: String, file_id: NodeId, content: Option<String>) -> Self {
        Self {
            name: path::name_of(&path).to_string(),
            language: language_for_path(&path),
            path,
            file_id,
            content,
            dirty: false,
        }
    }

    /// Canonical path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store identity; never changes.
    pub fn file_id(&self) -> NodeId {
        self.file_id
    }

    /// Language inferred from the file extension.
    pub fn language(&self) -> &'static str {
        self.language
    }

    /// Last persisted content, if it has been loaded.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Whether an open buffer holds unpersisted edits for this file.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// One node of a [`FilteredView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewNode {
    /// Node name
    pub name: String,
    /// Canonical path
    pub path: String,
    /// Node kind
    pub kind: NodeKind,
    /// Dirty flag for files
    pub dirty: bool,
    /// Retained children, ordered by name
    pub children: Vec<ViewNode>,
}

impl ViewNode {
    fn leaf(node: &FileNode) -> Self {
        Self {
            name: node.name().to_string(),
            path: node.path().to_string(),
            kind: node.kind(),
            dirty: node.as_file().map(FileEntry::is_dirty).unwrap_or(false),
            children: Vec::new(),
        }
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a ViewNode>) {
        for child in &self.children {
            out.push(child);
            child.walk(out);
        }
    }
}

/// Read-only projection of a tree, optionally restricted to a search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilteredView {
    term: String,
    root: ViewNode,
}

impl FilteredView {
    /// Build a projection of `root` keeping matches for `term` and their
    /// ancestors. An empty term keeps everything.
    fn build(root: &FileNode, term: &str) -> Self {
        let needle = term.to_lowercase();
        let children = match root {
            FileNode::Directory(dir) => dir
                .children
                .values()
                .filter_map(|child| filter_node(child, &needle))
                .collect(),
            FileNode::File(_) => Vec::new(),
        };

        let mut view_root = ViewNode::leaf(root);
        view_root.children = children;
        Self {
            term: term.to_string(),
            root: view_root,
        }
    }

    /// Search term the view was built for; empty for an unfiltered view.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Root of the projection (always present).
    pub fn root(&self) -> &ViewNode {
        &self.root
    }

    /// Whether nothing besides the root was retained.
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Retained nodes in pre-order, root excluded.
    pub fn nodes(&self) -> Vec<&ViewNode> {
        let mut out = Vec::new();
        self.root.walk(&mut out);
        out
    }

    /// Whether the node at `path` was retained.
    pub fn contains(&self, path: &str) -> bool {
        self.nodes().iter().any(|n| n.path == path)
    }
}

/// Post-order filter: a directory survives if it matches or any child does.
fn filter_node(node: &FileNode, needle: &str) -> Option<ViewNode> {
    let matches = needle.is_empty()
        || node.name().to_lowercase().contains(needle)
        || node.path().to_lowercase().contains(needle);

    match node {
        FileNode::File(_) => matches.then(|| ViewNode::leaf(node)),
        FileNode::Directory(dir) => {
            let children: Vec<ViewNode> = dir
                .children
                .values()
                .filter_map(|child| filter_node(child, needle))
                .collect();
            if matches || !children.is_empty() {
                let mut view = ViewNode::leaf(node);
                view.children = children;
                Some(view)
            } else {
                None
            }
        }
    }
}

/// The file tree of one project.
///
/// # Example
///
/// ```rust
/// use codespark_core::project::ProjectId;
/// use codespark_core::store::{MemoryFileStore, NodeKind};
/// use codespark_core::tree::FileTree;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let mut tree = FileTree::new(ProjectId::new(), Arc::new(MemoryFileStore::new()));
/// tree.insert("", "src", NodeKind::Directory).await?;
/// tree.insert("/src", "main.rs", NodeKind::File).await?;
///
/// assert!(tree.resolve("/src/main.rs").unwrap().is_file());
/// assert!(tree.search("main").contains("/src"));
/// # Ok::<(), codespark_core::Error>(())
/// # });
/// ```
pub struct FileTree {
    project_id: ProjectId,
    root: FileNode,
    store: Arc<dyn FileStore>,
    filtered: Option<FilteredView>,
}

impl fmt::Debug for FileTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTree")
            .field("project_id", &self.project_id)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FileTree {
    /// Create an empty tree for a project.
    pub fn new(project_id: ProjectId, store: Arc<dyn FileStore>) -> Self {
        Self {
            project_id,
            root: FileNode::Directory(Directory::new(String::new(), None)),
            store,
            filtered: None,
        }
    }

    /// Load a project's tree from the store.
    ///
    /// File content is not read here; it is fetched lazily the first time a
    /// file is opened.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnavailable`] if the listing fails and
    /// [`Error::InvalidPath`] if the store reports a malformed path.
    pub async fn load(project_id: ProjectId, store: Arc<dyn FileStore>) -> Result<Self> {
        let snapshot = store
            .list_tree(project_id)
            .await
            .map_err(|e| Error::backend_unavailable("list_tree", e))?;

        let mut tree = Self::new(project_id, store);
        tree.apply_snapshot(snapshot)?;

        info!(
            "Loaded tree for project {} ({} files)",
            project_id,
            tree.file_count()
        );
        Ok(tree)
    }

    fn apply_snapshot(&mut self, snapshot: TreeSnapshot) -> Result<()> {
        let mut entries = snapshot.entries;
        entries.sort_by_key(|e| path::segments(&e.path).count());

        for entry in entries {
            let canonical = path::normalize(&entry.path)?;
            if canonical.is_empty() {
                warn!("Ignoring snapshot entry {} for the project root", entry.node_id);
                continue;
            }

            let parent = path::parent_of(&canonical).unwrap_or_default();
            let name = path::name_of(&canonical).to_string();
            let dir = self.ensure_directory(&parent)?;

            match dir.children.get_mut(&name) {
                None => {
                    let node = match entry.kind {
                        NodeKind::Directory => {
                            FileNode::Directory(Directory::new(canonical, Some(entry.node_id)))
                        }
                        NodeKind::File => {
                            FileNode::File(FileEntry::new(canonical, entry.node_id, None))
                        }
                    };
                    dir.children.insert(name, node);
                }
                Some(FileNode::Directory(existing))
                    if entry.kind == NodeKind::Directory && existing.node_id.is_none() =>
                {
                    existing.node_id = Some(entry.node_id);
                }
                Some(_) => {
                    warn!("Duplicate snapshot entry for '{}', keeping the first", canonical);
                }
            }
        }
        Ok(())
    }

    /// Walk to `dir_path`, creating implicit directories along the way.
    fn ensure_directory(&mut self, dir_path: &str) -> Result<&mut Directory> {
        let mut current = self.root_dir_mut();
        for segment in path::segments(dir_path) {
            let child_path = format!("{}/{}", current.path, segment);
            let node = current
                .children
                .entry(segment.to_string())
                .or_insert_with(|| FileNode::Directory(Directory::new(child_path, None)));
            current = match node {
                FileNode::Directory(dir) => dir,
                FileNode::File(file) => return Err(Error::path_conflict(file.path.clone())),
            };
        }
        Ok(current)
    }

    fn root_dir_mut(&mut self) -> &mut Directory {
        match &mut self.root {
            FileNode::Directory(dir) => dir,
            FileNode::File(_) => unreachable!("tree root is always a directory"),
        }
    }

    /// Project this tree belongs to.
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Root directory node.
    pub fn root(&self) -> &FileNode {
        &self.root
    }

    pub(crate) fn store(&self) -> &Arc<dyn FileStore> {
        &self.store
    }

    /// Resolve a path to its node in O(depth). The empty path is the root.
    pub fn resolve(&self, raw: &str) -> Option<&FileNode> {
        let canonical = path::normalize(raw).ok()?;
        let mut node = &self.root;
        for segment in path::segments(&canonical) {
            node = node.as_directory()?.children.get(segment)?;
        }
        Some(node)
    }

    fn resolve_mut(&mut self, canonical: &str) -> Option<&mut FileNode> {
        let mut node = &mut self.root;
        for segment in path::segments(canonical) {
            node = match node {
                FileNode::Directory(dir) => dir.children.get_mut(segment)?,
                FileNode::File(_) => return None,
            };
        }
        Some(node)
    }

    fn directory_mut(&mut self, canonical: &str) -> Option<&mut Directory> {
        match self.resolve_mut(canonical)? {
            FileNode::Directory(dir) => Some(dir),
            FileNode::File(_) => None,
        }
    }

    fn file_mut(&mut self, canonical: &str) -> Option<&mut FileEntry> {
        match self.resolve_mut(canonical)? {
            FileNode::File(file) => Some(file),
            FileNode::Directory(_) => None,
        }
    }

    /// Resolve a path that must name a file.
    pub fn file(&self, raw: &str) -> Option<&FileEntry> {
        self.resolve(raw)?.as_file()
    }

    /// Paths of every file in pre-order (directories before their
    /// contents, siblings by name).
    pub fn file_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.root.collect_files(&mut out);
        out
    }

    /// The first file in path order, used as the initial active file.
    pub fn first_file(&self) -> Option<String> {
        self.file_paths().into_iter().next()
    }

    /// Number of files in the tree.
    pub fn file_count(&self) -> usize {
        self.file_paths().len()
    }

    /// Create a file or directory under `parent_path`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPath`] if the parent path or name is malformed
    /// - [`Error::NotFound`] if `parent_path` is not an existing directory
    /// - [`Error::PathConflict`] if a sibling named `name` exists
    /// - [`Error::BackendUnavailable`] if the store rejects the command; the
    ///   tree is left unchanged
    pub async fn insert(&mut self, parent_path: &str, name: &str, kind: NodeKind) -> Result<FileNode> {
        let parent = path::normalize(parent_path)?;
        path::validate_name(name)?;
        let new_path = path::join(&parent, name)?;

        match self.resolve(&parent) {
            Some(FileNode::Directory(dir)) => {
                if dir.children.contains_key(name) {
                    return Err(Error::path_conflict(new_path));
                }
            }
            _ => return Err(Error::not_found(format!("directory '{}'", shown(&parent)))),
        }

        let node_id = self
            .store
            .create_node(self.project_id, &new_path, kind)
            .await
            .map_err(|e| Error::backend_unavailable("create_node", e))?;

        let node = match kind {
            NodeKind::Directory => FileNode::Directory(Directory::new(new_path.clone(), Some(node_id))),
            NodeKind::File => FileNode::File(FileEntry::new(new_path.clone(), node_id, Some(String::new()))),
        };

        let dir = self
            .directory_mut(&parent)
            .ok_or_else(|| Error::not_found(format!("directory '{}'", shown(&parent))))?;
        dir.children.insert(name.to_string(), node.clone());
        self.refresh_filter();

        info!("Created {} '{}'", kind, new_path);
        Ok(node)
    }

    /// Remove a node and, for directories, everything beneath it.
    ///
    /// Persisted nodes are deleted deepest first. If the store fails midway,
    /// nodes it already deleted are pruned from memory and the rest of the
    /// subtree stays in place.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if nothing exists at `path`
    /// - [`Error::PreconditionViolation`] for the project root
    /// - [`Error::BackendUnavailable`] if a delete command fails
    pub async fn remove(&mut self, raw: &str) -> Result<FileNode> {
        let target = path::normalize(raw)?;
        if target.is_empty() {
            return Err(Error::precondition("the project root cannot be removed"));
        }

        let mut persisted = Vec::new();
        self.resolve(&target)
            .ok_or_else(|| Error::not_found(format!("'{}'", target)))?
            .collect_persisted(&mut persisted);
        persisted.reverse();

        let mut deleted: Vec<String> = Vec::new();
        for (node_id, node_path) in persisted {
            if let Err(e) = self.store.delete_node(node_id).await {
                if !deleted.is_empty() {
                    warn!(
                        "Removal of '{}' failed after {} deletions; pruning them",
                        target,
                        deleted.len()
                    );
                    for gone in &deleted {
                        self.detach(gone);
                    }
                    self.refresh_filter();
                }
                return Err(Error::backend_unavailable("delete_node", e));
            }
            deleted.push(node_path);
        }

        let removed = self
            .detach(&target)
            .ok_or_else(|| Error::not_found(format!("'{}'", target)))?;
        self.refresh_filter();

        info!("Removed {} '{}'", removed.kind(), target);
        Ok(removed)
    }

    /// Rename a node in place, rewriting every descendant path.
    ///
    /// Returns the new canonical path.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if nothing exists at `path`
    /// - [`Error::PathConflict`] if a sibling named `new_name` exists
    /// - [`Error::InvalidPath`] if `new_name` is not a single segment
    /// - [`Error::PreconditionViolation`] for the project root
    /// - [`Error::BackendUnavailable`] if a rename command fails; renames
    ///   the store already applied are reverted and the tree is unchanged
    pub async fn rename(&mut self, raw: &str, new_name: &str) -> Result<String> {
        let source = path::normalize(raw)?;
        if source.is_empty() {
            return Err(Error::precondition("the project root cannot be renamed"));
        }
        path::validate_name(new_name)?;

        let parent = path::parent_of(&source).unwrap_or_default();
        let target = path::join(&parent, new_name)?;

        let node = self
            .resolve(&source)
            .ok_or_else(|| Error::not_found(format!("'{}'", source)))?;
        if target == source {
            return Ok(target);
        }
        let sibling_exists = self
            .resolve(&parent)
            .and_then(FileNode::as_directory)
            .map(|dir| dir.children.contains_key(new_name))
            .unwrap_or(false);
        if sibling_exists {
            return Err(Error::path_conflict(target));
        }

        let mut persisted = Vec::new();
        node.collect_persisted(&mut persisted);
        let moves: Vec<(NodeId, String, String)> = persisted
            .into_iter()
            .filter_map(|(id, old)| {
                let new = path::rebase(&old, &source, &target)?;
                Some((id, old, new))
            })
            .collect();

        for (done, (node_id, _, new)) in moves.iter().enumerate() {
            if let Err(e) = self.store.rename_node(*node_id, new).await {
                for (undo_id, old, _) in moves[..done].iter().rev() {
                    if let Err(undo) = self.store.rename_node(*undo_id, old).await {
                        warn!("Failed to restore '{}' after rename failure: {:#}", old, undo);
                    }
                }
                return Err(Error::backend_unavailable("rename_node", e));
            }
        }

        let mut node = self
            .detach(&source)
            .ok_or_else(|| Error::not_found(format!("'{}'", source)))?;
        node.rebase(target.clone());
        let dir = self
            .directory_mut(&parent)
            .ok_or_else(|| Error::not_found(format!("directory '{}'", shown(&parent))))?;
        dir.children.insert(new_name.to_string(), node);
        self.refresh_filter();

        info!("Renamed '{}' to '{}'", source, target);
        Ok(target)
    }

    fn detach(&mut self, canonical: &str) -> Option<FileNode> {
        let parent = path::parent_of(canonical)?;
        let name = path::name_of(canonical);
        self.directory_mut(&parent)?.children.remove(name)
    }

    /// Restrict the view to nodes matching `term` (case-insensitive, on
    /// name or full path) plus their ancestors.
    ///
    /// The projection is rebuilt from the canonical tree on every call.
    pub fn search(&mut self, term: &str) -> &FilteredView {
        let view = FilteredView::build(&self.root, term);
        debug!(
            "Search '{}' retained {} nodes",
            term,
            view.nodes().len()
        );
        self.filtered.insert(view)
    }

    /// Drop the active search.
    pub fn clear_search(&mut self) {
        self.filtered = None;
    }

    /// The active filtered view, if a search is active.
    pub fn filtered_view(&self) -> Option<&FilteredView> {
        self.filtered.as_ref()
    }

    /// The view to render: the active search, or the whole tree.
    pub fn view(&self) -> FilteredView {
        match &self.filtered {
            Some(view) => view.clone(),
            None => FilteredView::build(&self.root, ""),
        }
    }

    fn refresh_filter(&mut self) {
        if let Some(term) = self.filtered.as_ref().map(|v| v.term.clone()) {
            self.filtered = Some(FilteredView::build(&self.root, &term));
        }
    }

    /// Content of a file, loading it from the store on first access.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] unless `path` is a file,
    /// [`Error::BackendUnavailable`] if the read fails.
    pub async fn read_content(&mut self, raw: &str) -> Result<String> {
        let canonical = path::normalize(raw)?;
        let file = self
            .file(&canonical)
            .ok_or_else(|| Error::not_found(format!("file '{}'", canonical)))?;
        if let Some(content) = file.content() {
            return Ok(content.to_string());
        }

        let file_id = file.file_id();
        let content = self
            .store
            .read_content(file_id)
            .await
            .map_err(|e| Error::backend_unavailable("read_content", e))?;
        if let Some(file) = self.file_mut(&canonical) {
            file.content = Some(content.clone());
        }
        debug!("Loaded content of '{}' ({} bytes)", canonical, content.len());
        Ok(content)
    }

    /// Content of a file without caching it in the tree.
    pub async fn peek_content(&self, raw: &str) -> Result<String> {
        let canonical = path::normalize(raw)?;
        let file = self
            .file(&canonical)
            .ok_or_else(|| Error::not_found(format!("file '{}'", canonical)))?;
        match file.content() {
            Some(content) => Ok(content.to_string()),
            None => self
                .store
                .read_content(file.file_id())
                .await
                .map_err(|e| Error::backend_unavailable("read_content", e)),
        }
    }

    pub(crate) fn set_dirty(&mut self, canonical: &str, dirty: bool) {
        if let Some(file) = self.file_mut(canonical) {
            file.dirty = dirty;
        }
        if self.filtered.is_some() {
            self.refresh_filter();
        }
    }

    pub(crate) fn record_persisted(&mut self, canonical: &str, content: String) {
        if let Some(file) = self.file_mut(canonical) {
            file.content = Some(content);
            file.dirty = false;
        }
        if self.filtered.is_some() {
            self.refresh_filter();
        }
    }
}

fn shown(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
