use super::{FileStore, NodeId, NodeKind, SnapshotEntry, TreeSnapshot};
use crate::project::ProjectId;
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// In-process [`FileStore`] backed by a hash map.
///
/// Used by tests and as a scratch store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    nodes: RwLock<HashMap<NodeId, StoredNode>>,
}

#[derive(Debug, Clone)]
struct StoredNode {
    project_id: ProjectId,
    path: String,
    kind: NodeKind,
    content: String,
}

impl MemoryFileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes persisted for a project.
    pub async fn node_count(&self, project_id: ProjectId) -> usize {
        let nodes = self.nodes.read().await;
        nodes.values().filter(|n| n.project_id == project_id).count()
    }

    /// Persisted content of the file at `path`, if any.
    pub async fn content_at(&self, project_id: ProjectId, path: &str) -> Option<String> {
        let nodes = self.nodes.read().await;
        nodes
            .values()
            .find(|n| n.project_id == project_id && n.path == path && n.kind == NodeKind::File)
            .map(|n| n.content.clone())
    }

    /// Current path of a node.
    pub async fn path_of(&self, node_id: NodeId) -> Option<String> {
        let nodes = self.nodes.read().await;
        nodes.get(&node_id).map(|n| n.path.clone())
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn create_node(
        &self,
        project_id: ProjectId,
        path: &str,
        kind: NodeKind,
    ) -> anyhow::Result<NodeId> {
        let mut nodes = self.nodes.write().await;
        if nodes
            .values()
            .any(|n| n.project_id == project_id && n.path == path)
        {
            bail!("a node already exists at '{}'", path);
        }

        let id = NodeId::new();
        nodes.insert(
            id,
            StoredNode {
                project_id,
                path: path.to_string(),
                kind,
                content: String::new(),
            },
        );
        debug!("Stored {} '{}' as {}", kind, path, id);
        Ok(id)
    }

    async fn delete_node(&self, node_id: NodeId) -> anyhow::Result<()> {
        let mut nodes = self.nodes.write().await;
        nodes
            .remove(&node_id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("unknown node {}", node_id))
    }

    async fn rename_node(&self, node_id: NodeId, new_path: &str) -> anyhow::Result<()> {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(&node_id)
            .ok_or_else(|| anyhow!("unknown node {}", node_id))?;
        node.path = new_path.to_string();
        Ok(())
    }

    async fn read_content(&self, file_id: NodeId) -> anyhow::Result<String> {
        let nodes = self.nodes.read().await;
        match nodes.get(&file_id) {
            Some(node) if node.kind == NodeKind::File => Ok(node.content.clone()),
            Some(_) => bail!("node {} is a directory", file_id),
            None => bail!("unknown node {}", file_id),
        }
    }

    async fn write_content(&self, file_id: NodeId, text: &str) -> anyhow::Result<()> {
        let mut nodes = self.nodes.write().await;
        match nodes.get_mut(&file_id) {
            Some(node) if node.kind == NodeKind::File => {
                node.content = text.to_string();
                Ok(())
            }
            Some(_) => bail!("node {} is a directory", file_id),
            None => bail!("unknown node {}", file_id),
        }
    }

    async fn list_tree(&self, project_id: ProjectId) -> anyhow::Result<TreeSnapshot> {
        let nodes = self.nodes.read().await;
        let mut entries: Vec<SnapshotEntry> = nodes
            .iter()
            .filter(|(_, n)| n.project_id == project_id)
            .map(|(id, n)| SnapshotEntry {
                node_id: *id,
                path: n.path.clone(),
                kind: n.kind,
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(TreeSnapshot { entries })
    }
}
