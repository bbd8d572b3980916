use super::{FileStore, NodeId, NodeKind, SnapshotEntry, TreeSnapshot};
use crate::project::ProjectId;
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

const MANIFEST_FILE: &str = "nodes.json";
const OBJECTS_DIR: &str = "objects";

/// [`FileStore`] persisting to a local directory.
///
/// Layout under the root:
///
/// ```text
/// nodes.json        manifest: node id -> project, path, kind
/// objects/<id>      content of each file node
/// ```
///
/// Content is addressed by node id, so renames only touch the manifest.
/// Every manifest update is written to a temporary file and renamed into
/// place; a failed write leaves the previous manifest in effect.
pub struct DirectoryFileStore {
    root: PathBuf,
    manifest: Mutex<Manifest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Manifest {
    nodes: BTreeMap<NodeId, ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    project_id: ProjectId,
    path: String,
    kind: NodeKind,
}

impl DirectoryFileStore {
    /// Open (or initialize) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created or an existing
    /// manifest cannot be parsed.
    pub async fn open<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(root.join(OBJECTS_DIR))
            .await
            .with_context(|| format!("failed to create store directory {:?}", root))?;

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = if tokio::fs::try_exists(&manifest_path).await? {
            let content = tokio::fs::read_to_string(&manifest_path)
                .await
                .with_context(|| format!("failed to read {:?}", manifest_path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {:?}", manifest_path))?
        } else {
            Manifest::default()
        };

        info!(
            "Opened file store at {:?} ({} nodes)",
            root,
            manifest.nodes.len()
        );
        Ok(Self {
            root,
            manifest: Mutex::new(manifest),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, node_id: NodeId) -> PathBuf {
        self.root.join(OBJECTS_DIR).join(node_id.to_string())
    }

    async fn persist(&self, manifest: &Manifest) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(manifest)?;
        write_atomically(&self.root.join(MANIFEST_FILE), &content).await
    }

    async fn file_entry(&self, file_id: NodeId) -> anyhow::Result<()> {
        let manifest = self.manifest.lock().await;
        match manifest.nodes.get(&file_id) {
            Some(entry) if entry.kind == NodeKind::File => Ok(()),
            Some(entry) => bail!("node {} at '{}' is a directory", file_id, entry.path),
            None => bail!("unknown node {}", file_id),
        }
    }
}

#[async_trait]
impl FileStore for DirectoryFileStore {
    async fn create_node(
        &self,
        project_id: ProjectId,
        path: &str,
        kind: NodeKind,
    ) -> anyhow::Result<NodeId> {
        let mut manifest = self.manifest.lock().await;
        if manifest
            .nodes
            .values()
            .any(|e| e.project_id == project_id && e.path == path)
        {
            bail!("a node already exists at '{}'", path);
        }

        let id = NodeId::new();
        if kind == NodeKind::File {
            write_atomically(&self.object_path(id), "").await?;
        }

        let mut updated = manifest.clone();
        updated.nodes.insert(
            id,
            ManifestEntry {
                project_id,
                path: path.to_string(),
                kind,
            },
        );
        self.persist(&updated).await?;
        *manifest = updated;

        debug!("Created {} '{}' as {}", kind, path, id);
        Ok(id)
    }

    async fn delete_node(&self, node_id: NodeId) -> anyhow::Result<()> {
        let mut manifest = self.manifest.lock().await;
        let mut updated = manifest.clone();
        let entry = updated
            .nodes
            .remove(&node_id)
            .ok_or_else(|| anyhow!("unknown node {}", node_id))?;
        self.persist(&updated).await?;
        *manifest = updated;

        if entry.kind == NodeKind::File {
            match tokio::fs::remove_file(self.object_path(node_id)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to remove object {}", node_id))
                }
            }
        }

        debug!("Deleted {} '{}'", entry.kind, entry.path);
        Ok(())
    }

    async fn rename_node(&self, node_id: NodeId, new_path: &str) -> anyhow::Result<()> {
        let mut manifest = self.manifest.lock().await;
        let mut updated = manifest.clone();
        let entry = updated
            .nodes
            .get_mut(&node_id)
            .ok_or_else(|| anyhow!("unknown node {}", node_id))?;
        entry.path = new_path.to_string();
        self.persist(&updated).await?;
        *manifest = updated;
        Ok(())
    }

    async fn read_content(&self, file_id: NodeId) -> anyhow::Result<String> {
        self.file_entry(file_id).await?;
        match tokio::fs::read_to_string(self.object_path(file_id)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e).with_context(|| format!("failed to read object {}", file_id)),
        }
    }

    async fn write_content(&self, file_id: NodeId, text: &str) -> anyhow::Result<()> {
        self.file_entry(file_id).await?;
        write_atomically(&self.object_path(file_id), text).await
    }

    async fn list_tree(&self, project_id: ProjectId) -> anyhow::Result<TreeSnapshot> {
        let manifest = self.manifest.lock().await;
        let mut entries: Vec<SnapshotEntry> = manifest
            .nodes
            .iter()
            .filter(|(_, e)| e.project_id == project_id)
            .map(|(id, e)| SnapshotEntry {
                node_id: *id,
                path: e.path.clone(),
                kind: e.kind,
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(TreeSnapshot { entries })
    }
}

async fn write_atomically(target: &Path, content: &str) -> anyhow::Result<()> {
    let tmp = target.with_extension("tmp");
    tokio::fs::write(&tmp, content)
        .await
        .with_context(|| format!("failed to write {:?}", tmp))?;
    tokio::fs::rename(&tmp, target)
        .await
        .with_context(|| format!("failed to move {:?} into place", target))?;
    Ok(())
}
