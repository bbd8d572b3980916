#![allow(dead_code)]

use async_trait::async_trait;
use codespark_core::ai::{AiBackend, AnalysisKind, ContextFile};
use codespark_core::store::{MemoryFileStore, TreeSnapshot};
use codespark_core::{FileStore, NodeId, NodeKind, ProjectId};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::Notify;

/// In-memory store whose operations can be switched off.
#[derive(Default)]
pub struct SwitchableStore {
    pub inner: MemoryFileStore,
    faults: Mutex<HashMap<&'static str, Fault>>,
}

impl SwitchableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call to `operation` until healed.
    pub fn fail(&self, operation: &'static str) {
        self.faults.lock().unwrap().insert(operation, Fault::Always);
    }

    /// Let `successes` calls to `operation` through, fail the next one, then
    /// recover.
    pub fn fail_after(&self, operation: &'static str, successes: usize) {
        self.faults
            .lock()
            .unwrap()
            .insert(operation, Fault::Once { after: successes });
    }

    pub fn heal(&self, operation: &'static str) {
        self.faults.lock().unwrap().remove(operation);
    }

    fn check(&self, operation: &'static str) -> anyhow::Result<()> {
        let mut faults = self.faults.lock().unwrap();
        match faults.get_mut(operation) {
            Some(Fault::Always) => anyhow::bail!("{} refused: store offline", operation),
            Some(Fault::Once { after: 0 }) => {
                faults.remove(operation);
                anyhow::bail!("{} refused: store offline", operation)
            }
            Some(Fault::Once { after }) => {
                *after -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

enum Fault {
    Always,
    Once { after: usize },
}

#[async_trait]
impl FileStore for SwitchableStore {
    async fn create_node(
        &self,
        project_id: ProjectId,
        path: &str,
        kind: NodeKind,
    ) -> anyhow::Result<NodeId> {
        self.check("create_node")?;
        self.inner.create_node(project_id, path, kind).await
    }

    async fn delete_node(&self, node_id: NodeId) -> anyhow::Result<()> {
        self.check("delete_node")?;
        self.inner.delete_node(node_id).await
    }

    async fn rename_node(&self, node_id: NodeId, new_path: &str) -> anyhow::Result<()> {
        self.check("rename_node")?;
        self.inner.rename_node(node_id, new_path).await
    }

    async fn read_content(&self, file_id: NodeId) -> anyhow::Result<String> {
        self.check("read_content")?;
        self.inner.read_content(file_id).await
    }

    async fn write_content(&self, file_id: NodeId, text: &str) -> anyhow::Result<()> {
        self.check("write_content")?;
        self.inner.write_content(file_id, text).await
    }

    async fn list_tree(&self, project_id: ProjectId) -> anyhow::Result<TreeSnapshot> {
        self.check("list_tree")?;
        self.inner.list_tree(project_id).await
    }
}

/// Backend that holds every request until released.
#[derive(Default)]
pub struct GatedBackend {
    /// Signalled when a request reaches the backend
    pub entered: Notify,
    /// Lets one waiting request answer
    pub release: Notify,
}

impl GatedBackend {
    async fn pass(&self, reply: String) -> anyhow::Result<String> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(reply)
    }
}

#[async_trait]
impl AiBackend for GatedBackend {
    async fn chat(&self, prompt: &str, _context: &str) -> anyhow::Result<String> {
        self.pass(format!("re: {}", prompt)).await
    }

    async fn generate(
        &self,
        description: &str,
        language: &str,
        _context_files: &[ContextFile],
    ) -> anyhow::Result<String> {
        self.pass(format!("// {} ({})", description, language)).await
    }

    async fn analyze(&self, file: &ContextFile, kind: AnalysisKind) -> anyhow::Result<String> {
        self.pass(format!("{} report for {}", kind, file.path)).await
    }
}

/// Backend that answers at once.
pub struct InstantBackend;

#[async_trait]
impl AiBackend for InstantBackend {
    async fn chat(&self, prompt: &str, _context: &str) -> anyhow::Result<String> {
        Ok(format!("re: {}", prompt))
    }

    async fn generate(
        &self,
        description: &str,
        _language: &str,
        _context_files: &[ContextFile],
    ) -> anyhow::Result<String> {
        Ok(format!("// {}", description))
    }

    async fn analyze(&self, file: &ContextFile, kind: AnalysisKind) -> anyhow::Result<String> {
        Ok(format!("{} report for {}", kind, file.path))
    }
}
