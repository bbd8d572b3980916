//! Test doubles shared by unit tests.

use crate::ai::{AiBackend, AnalysisKind, ContextFile};
use crate::project::ProjectId;
use crate::store::{FileStore, MemoryFileStore, NodeId, NodeKind, TreeSnapshot};
use anyhow::bail;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// [`MemoryFileStore`] whose operations can be made to fail on demand.
#[derive(Default)]
pub(crate) struct FlakyStore {
    inner: MemoryFileStore,
    faults: Mutex<HashMap<&'static str, Fault>>,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inner(&self) -> &MemoryFileStore {
        &self.inner
    }

    /// Fail every call to `operation` until healed.
    pub(crate) fn fail(&self, operation: &'static str) {
        self.faults.lock().unwrap().insert(operation, Fault::Always);
    }

    /// Let `successes` calls to `operation` through, fail the next one, then
    /// recover.
    pub(crate) fn fail_after(&self, operation: &'static str, successes: usize) {
        self.faults
            .lock()
            .unwrap()
            .insert(operation, Fault::Once { after: successes });
    }

    pub(crate) fn heal(&self, operation: &'static str) {
        self.faults.lock().unwrap().remove(operation);
    }

    fn check(&self, operation: &'static str) -> anyhow::Result<()> {
        let mut faults = self.faults.lock().unwrap();
        match faults.get_mut(operation) {
            Some(Fault::Always) => bail!("{} refused: store offline", operation),
            Some(Fault::Once { after: 0 }) => {
                faults.remove(operation);
                bail!("{} refused: store offline", operation)
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
impl FileStore for FlakyStore {
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

/// AI backend that answers with fixed text and records what it was sent.
#[derive(Default)]
pub(crate) struct EchoBackend {
    pub(crate) fail: std::sync::atomic::AtomicBool,
    pub(crate) prompts: Mutex<Vec<String>>,
}

impl EchoBackend {
    fn answer(&self, prompt: String, reply: String) -> anyhow::Result<String> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            bail!("model overloaded");
        }
        self.prompts.lock().unwrap().push(prompt);
        Ok(reply)
    }
}

#[async_trait]
impl AiBackend for EchoBackend {
    async fn chat(&self, prompt: &str, context: &str) -> anyhow::Result<String> {
        self.answer(format!("{}\n{}", context, prompt), format!("echo: {}", prompt))
    }

    async fn generate(
        &self,
        description: &str,
        _language: &str,
        _context_files: &[ContextFile],
    ) -> anyhow::Result<String> {
        self.answer(description.to_string(), "fn generated() {}".to_string())
    }

    async fn analyze(&self, file: &ContextFile, kind: AnalysisKind) -> anyhow::Result<String> {
        self.answer(
            file.content.clone(),
            format!("{} review of {} bytes of {}", kind, file.content.len(), file.language),
        )
    }
}
