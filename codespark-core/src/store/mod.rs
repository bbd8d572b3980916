//! # File store interface
//!
//! The [`FileStore`] trait is the persistence boundary of a project tree. The
//! core issues one command per persisted node and reconciles the result with
//! its in-memory tree; any failure is surfaced as
//! [`Error::BackendUnavailable`](crate::Error::BackendUnavailable) without
//! interpretation.
//!
//! Two implementations ship with the crate: [`MemoryFileStore`] keeps
//! everything in process, [`DirectoryFileStore`] persists a JSON manifest and
//! one content object per file under a root directory.

mod directory;
mod memory;

pub use directory::DirectoryFileStore;
pub use memory::MemoryFileStore;

use crate::project::ProjectId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identity of a persisted node, assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh random node id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A directory that may hold children
    Directory,
    /// A file with text content
    File,
}

impl NodeKind {
    /// Lowercase label used in logs and listings.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Directory => "directory",
            NodeKind::File => "file",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted node as reported by [`FileStore::list_tree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Store-assigned identity
    pub node_id: NodeId,
    /// Canonical path within the project
    pub path: String,
    /// Node kind
    pub kind: NodeKind,
}

/// Flat listing of a project's persisted nodes.
///
/// Directories that only exist implicitly (as the parent of a listed path)
/// may be absent; the tree creates them on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Persisted nodes in no particular order
    pub entries: Vec<SnapshotEntry>,
}

/// Persistence backend for project trees and file content.
///
/// Every method may fail with a transport error; callers treat any error as
/// "backend unavailable" and never inspect it.
///
/// # Example
///
/// ```rust
/// use codespark_core::store::{FileStore, MemoryFileStore, NodeKind};
/// use codespark_core::project::ProjectId;
///
/// # tokio_test::block_on(async {
/// let store = MemoryFileStore::new();
/// let project = ProjectId::new();
/// let id = store.create_node(project, "/main.rs", NodeKind::File).await?;
/// store.write_content(id, "fn main() {}").await?;
/// assert_eq!(store.read_content(id).await?, "fn main() {}");
/// # Ok::<(), anyhow::Error>(())
/// # });
/// ```
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist a new node and return its identity.
    async fn create_node(
        &self,
        project_id: ProjectId,
        path: &str,
        kind: NodeKind,
    ) -> anyhow::Result<NodeId>;

    /// Delete a single node. Children are deleted by their own commands.
    async fn delete_node(&self, node_id: NodeId) -> anyhow::Result<()>;

    /// Move a single node to a new canonical path.
    async fn rename_node(&self, node_id: NodeId, new_path: &str) -> anyhow::Result<()>;

    /// Read a file's persisted content.
    async fn read_content(&self, file_id: NodeId) -> anyhow::Result<String>;

    /// Replace a file's persisted content.
    async fn write_content(&self, file_id: NodeId, text: &str) -> anyhow::Result<()>;

    /// List every persisted node of a project.
    async fn list_tree(&self, project_id: ProjectId) -> anyhow::Result<TreeSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_parse_roundtrip() {
        let id = NodeId::new();
        let parsed: NodeId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_node_kind_serde_names() {
        assert_eq!(serde_json::to_string(&NodeKind::Directory).unwrap(), "\"directory\"");
        assert_eq!(NodeKind::File.to_string(), "file");
    }
}
