use super::context::{analysis_prompt, chat_context, generation_prompt, ContextFile};
use super::history::{AiSession, AnalysisTarget, SessionHistory, SessionKind, SessionStatus};
use super::{AiBackend, AiMessage, AnalysisKind};
use crate::config::{AiConfig, EditorConfig};
use crate::events::{notify, Event, EventType, SharedEventBus};
use crate::project::{ProjectId, ProjectRegistry};
use crate::workspace::Workspace;
use crate::{precondition, Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A chat message for the open project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Must be the open project
    pub project_id: ProjectId,
    /// File to put first in the context; defaults to the active file
    pub active_file_path: Option<String>,
    /// What the user typed
    pub prompt: String,
}

/// A code generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// What to generate
    pub description: String,
    /// Output language; defaults to the project's language
    pub target_language: Option<String>,
    /// Files sent along as context; unknown paths are skipped
    pub context_file_paths: Vec<String>,
}

/// A code analysis request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// File to analyze; required
    pub file_path: Option<String>,
    /// What to look for
    pub kind: AnalysisKind,
}

/// Result of a merged code generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOutcome {
    /// Generated code
    pub code: String,
    /// File the code was appended to, if a file was open
    pub target: Option<String>,
    /// Whether the appended buffer was saved
    pub persisted: bool,
}

/// How an intent's result was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// Merged into the project that was open when the intent was issued
    Merged(T),
    /// That project was closed or replaced before the backend answered;
    /// nothing was changed
    Stale,
}

impl<T> Resolution<T> {
    /// Whether the result was dropped.
    pub fn is_stale(&self) -> bool {
        matches!(self, Resolution::Stale)
    }

    /// The merged value, if any.
    pub fn merged(self) -> Option<T> {
        match self {
            Resolution::Merged(value) => Some(value),
            Resolution::Stale => None,
        }
    }
}

/// Identity of the workspace an intent was issued against.
#[derive(Debug, Clone, Copy)]
struct Ticket {
    project_id: ProjectId,
    epoch: Uuid,
    session: Uuid,
}

/// Routes AI intents to the backend and merges their results.
///
/// The registry lock is held only to prepare an intent and to merge its
/// result, never across the backend call, so several intents can be in
/// flight at once. Each result is merged only if the workspace it was
/// issued against is still the selected one.
///
/// # Example
///
/// ```rust
/// # use async_trait::async_trait;
/// # use codespark_core::ai::{AiBackend, AnalysisKind, ContextFile};
/// # struct Canned;
/// # #[async_trait]
/// # impl AiBackend for Canned {
/// #     async fn chat(&self, p: &str, _: &str) -> anyhow::Result<String> { Ok(p.to_uppercase()) }
/// #     async fn generate(&self, _: &str, _: &str, _: &[ContextFile]) -> anyhow::Result<String> { Ok(String::new()) }
/// #     async fn analyze(&self, _: &ContextFile, _: AnalysisKind) -> anyhow::Result<String> { Ok(String::new()) }
/// # }
/// use codespark_core::ai::{AiDispatcher, ChatRequest};
/// use codespark_core::project::{NewProject, ProjectRegistry};
/// use codespark_core::store::MemoryFileStore;
/// use std::sync::Arc;
/// use tokio::sync::RwLock;
///
/// # tokio_test::block_on(async {
/// let mut registry = ProjectRegistry::new(Arc::new(MemoryFileStore::new()));
/// let project = registry.create(NewProject::new("demo")).await?;
/// registry.select(project.id).await?;
///
/// let registry = Arc::new(RwLock::new(registry));
/// let dispatcher = AiDispatcher::new(Arc::new(Canned), Arc::clone(&registry));
/// let reply = dispatcher
///     .chat(ChatRequest { project_id: project.id, active_file_path: None, prompt: "hi".into() })
///     .await?;
///
/// assert_eq!(reply.merged().unwrap().content, "HI");
/// assert_eq!(registry.read().await.active().unwrap().conversation().len(), 2);
/// # Ok::<(), codespark_core::Error>(())
/// # });
/// ```
#[derive(Clone)]
pub struct AiDispatcher {
    backend: Arc<dyn AiBackend>,
    registry: Arc<RwLock<ProjectRegistry>>,
    history: Arc<Mutex<SessionHistory>>,
    ai: AiConfig,
    editor: EditorConfig,
    events: Option<SharedEventBus>,
}

impl AiDispatcher {
    /// Create a dispatcher with default settings.
    pub fn new(backend: Arc<dyn AiBackend>, registry: Arc<RwLock<ProjectRegistry>>) -> Self {
        Self {
            backend,
            registry,
            history: Arc::new(Mutex::new(SessionHistory::new())),
            ai: AiConfig::default(),
            editor: EditorConfig::default(),
            events: None,
        }
    }

    /// Use the given settings.
    pub fn with_config(mut self, ai: AiConfig, editor: EditorConfig) -> Self {
        self.ai = ai;
        self.editor = editor;
        self
    }

    /// Report merges and discards on an event bus.
    pub fn with_events(mut self, events: SharedEventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Recent AI sessions, newest first, up to the configured limit.
    pub async fn sessions(&self, project_id: Option<ProjectId>) -> Vec<AiSession> {
        self.history
            .lock()
            .await
            .recent(self.ai.history_limit, project_id)
    }

    /// One recorded session, if it is still retained.
    pub async fn session(&self, id: Uuid) -> Option<AiSession> {
        self.history.lock().await.get(id).cloned()
    }

    /// Past analyses of one file, newest first.
    pub async fn analyses(&self, project_id: ProjectId, file_path: &str) -> Vec<AiSession> {
        self.history.lock().await.analyses_of(project_id, file_path)
    }

    /// Drop the session records of a deleted project.
    pub async fn forget_project(&self, project_id: ProjectId) {
        self.history.lock().await.forget_project(project_id);
        debug!("Forgot AI sessions of project {}", project_id);
    }

    /// Send a chat message.
    ///
    /// The user message is appended to the conversation before the backend
    /// is called, the assistant's answer once it arrives. A backend failure
    /// is appended as an assistant message carrying the error text and also
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a blank prompt
    /// - [`Error::PreconditionViolation`] unless `project_id` is open
    /// - [`Error::AiBackend`] if the backend fails
    pub async fn chat(&self, request: ChatRequest) -> Result<Resolution<AiMessage>> {
        if request.prompt.trim().is_empty() {
            return Err(Error::validation("prompt", "Prompt is required"));
        }

        let (epoch, context) = {
            let registry = self.registry.read().await;
            let project_id = open_project(&registry)?;
            if project_id != request.project_id {
                return Err(precondition!(
                    "project {} is not the open project",
                    request.project_id
                ));
            }
            let project = registry
                .get(project_id)
                .cloned()
                .ok_or_else(|| Error::not_found(format!("project {}", project_id)))?;
            let workspace = registry
                .active()
                .ok_or_else(|| precondition!("no project is open"))?;

            let active_path = request
                .active_file_path
                .clone()
                .or_else(|| workspace.editor().active_path().map(str::to_string));
            let active = match &active_path {
                Some(p) => workspace.context_files([p.as_str()]).await.pop(),
                None => None,
            };
            let active_canonical = active.as_ref().map(|f| f.path.clone());
            let others: Vec<String> = workspace
                .tree()
                .file_paths()
                .into_iter()
                .filter(|p| Some(p) != active_canonical.as_ref())
                .take(self.ai.context_files)
                .collect();
            let others = workspace
                .context_files(others.iter().map(String::as_str))
                .await;

            let context = chat_context(&project, active.as_ref(), &others, self.ai.context_chars);
            (workspace.epoch(), context)
        };

        let ticket = {
            let mut registry = self.registry.write().await;
            let workspace = registry
                .active_mut()
                .filter(|ws| ws.epoch() == epoch)
                .ok_or_else(|| {
                    precondition!("project {} was closed while preparing the chat", request.project_id)
                })?;
            workspace
                .conversation_mut()
                .push(AiMessage::user(request.prompt.clone()));
            self.ticket(workspace, SessionKind::Chat, &request.prompt)
                .await
        };

        debug!("Chat request for project {}", ticket.project_id);
        let result = self.backend.chat(&request.prompt, &context).await;

        let mut registry = self.registry.write().await;
        let current = registry
            .active_mut()
            .filter(|ws| ws.epoch() == ticket.epoch);
        match (result, current) {
            (Ok(text), Some(workspace)) => {
                let message = AiMessage::assistant(text.clone());
                workspace.conversation_mut().push(message.clone());
                self.settle(ticket, SessionStatus::Completed, text).await;
                self.merged(ticket, SessionKind::Chat).await;
                Ok(Resolution::Merged(message))
            }
            (Ok(text), None) => {
                self.settle(ticket, SessionStatus::Discarded, text).await;
                self.discarded(ticket, SessionKind::Chat).await;
                Ok(Resolution::Stale)
            }
            (Err(cause), workspace) => {
                let error = Error::ai_backend("chat", cause);
                if let Some(workspace) = workspace {
                    workspace
                        .conversation_mut()
                        .push(AiMessage::assistant(format!("Error: {}", error)));
                }
                self.settle(ticket, SessionStatus::Failed, error.to_string())
                    .await;
                Err(error)
            }
        }
    }

    /// Generate code and append it to the active file.
    ///
    /// The code is appended after a separator (a blank line by default) and
    /// the buffer is saved. A failed save leaves the buffer dirty and is
    /// reported through [`GenerationOutcome::persisted`]. With no active
    /// file, or with empty output, nothing is changed and the code is only
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a blank description
    /// - [`Error::PreconditionViolation`] if no project is open
    /// - [`Error::AiBackend`] if the backend fails
    pub async fn generate(&self, request: GenerationRequest) -> Result<Resolution<GenerationOutcome>> {
        if request.description.trim().is_empty() {
            return Err(Error::validation("description", "Description is required"));
        }

        let (ticket, language, files) = {
            let registry = self.registry.read().await;
            let project_id = open_project(&registry)?;
            let workspace = registry
                .active()
                .ok_or_else(|| precondition!("no project is open"))?;

            let language = request
                .target_language
                .clone()
                .filter(|l| !l.trim().is_empty())
                .or_else(|| registry.get(project_id).map(|p| p.language.clone()))
                .unwrap_or_else(|| self.editor.default_language.clone());
            let files = workspace
                .context_files(request.context_file_paths.iter().map(String::as_str))
                .await;

            let prompt = generation_prompt(&request.description, &language, &files);
            let ticket = self
                .ticket(workspace, SessionKind::CodeGeneration, prompt)
                .await;
            (ticket, language, files)
        };

        let code = match self
            .backend
            .generate(&request.description, &language, &files)
            .await
        {
            Ok(code) => code,
            Err(cause) => {
                return self
                    .fail(ticket, Error::ai_backend("code_generation", cause))
                    .await;
            }
        };

        let mut registry = self.registry.write().await;
        let workspace = match registry
            .active_mut()
            .filter(|ws| ws.epoch() == ticket.epoch)
        {
            Some(workspace) => workspace,
            None => {
                self.settle(ticket, SessionStatus::Discarded, code).await;
                self.discarded(ticket, SessionKind::CodeGeneration).await;
                return Ok(Resolution::Stale);
            }
        };

        let target = workspace
            .editor()
            .active_path()
            .map(str::to_string)
            .filter(|_| !code.is_empty());
        let persisted = match &target {
            Some(path) => {
                let appended = workspace
                    .append_to_file(
                        path,
                        &self.editor.generation_separator,
                        &code,
                        self.editor.flush_after_generation,
                    )
                    .await;
                match appended {
                    Ok(persisted) => persisted,
                    Err(e) => return self.fail(ticket, e).await,
                }
            }
            None => false,
        };
        if let Some(path) = &target {
            info!("Appended generated code to '{}' (saved: {})", path, persisted);
        }

        self.settle(ticket, SessionStatus::Completed, code.clone())
            .await;
        self.merged(ticket, SessionKind::CodeGeneration).await;
        Ok(Resolution::Merged(GenerationOutcome {
            code,
            target,
            persisted,
        }))
    }

    /// Analyze one file. Nothing in the tree or the editor changes.
    ///
    /// The live buffer is analyzed if the file is open, the persisted
    /// content otherwise.
    ///
    /// # Errors
    ///
    /// - [`Error::PreconditionViolation`] if no file is designated or no
    ///   project is open
    /// - [`Error::NotFound`] if the path is not a file
    /// - [`Error::AiBackend`] if the backend fails
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<Resolution<String>> {
        let path = request
            .file_path
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| precondition!("no file designated for analysis"))?;

        let (ticket, file) = {
            let registry = self.registry.read().await;
            open_project(&registry)?;
            let workspace = registry
                .active()
                .ok_or_else(|| precondition!("no project is open"))?;
            let file: ContextFile = workspace.peek_file(&path).await?;
            let session = self.history.lock().await.begin_analysis(
                workspace.project_id(),
                AnalysisTarget {
                    file_path: file.path.clone(),
                    kind: request.kind,
                },
                analysis_prompt(&file, request.kind),
            );
            let ticket = Ticket {
                project_id: workspace.project_id(),
                epoch: workspace.epoch(),
                session,
            };
            (ticket, file)
        };

        let text = match self.backend.analyze(&file, request.kind).await {
            Ok(text) => text,
            Err(cause) => {
                return self
                    .fail(ticket, Error::ai_backend("code_analysis", cause))
                    .await;
            }
        };

        let still_current = self
            .registry
            .read()
            .await
            .active()
            .map_or(false, |ws| ws.epoch() == ticket.epoch);
        if !still_current {
            self.settle(ticket, SessionStatus::Discarded, text).await;
            self.discarded(ticket, SessionKind::CodeAnalysis).await;
            return Ok(Resolution::Stale);
        }

        self.settle(ticket, SessionStatus::Completed, text.clone())
            .await;
        self.merged(ticket, SessionKind::CodeAnalysis).await;
        Ok(Resolution::Merged(text))
    }

    async fn ticket<S: Into<String>>(&self, workspace: &Workspace, kind: SessionKind, prompt: S) -> Ticket {
        let session = self
            .history
            .lock()
            .await
            .begin(workspace.project_id(), kind, prompt);
        Ticket {
            project_id: workspace.project_id(),
            epoch: workspace.epoch(),
            session,
        }
    }

    async fn settle(&self, ticket: Ticket, status: SessionStatus, response: String) {
        self.history
            .lock()
            .await
            .settle(ticket.session, status, response);
    }

    /// Settle the session as failed and hand the error back.
    async fn fail<T>(&self, ticket: Ticket, error: Error) -> Result<T> {
        self.settle(ticket, SessionStatus::Failed, error.to_string())
            .await;
        Err(error)
    }

    async fn merged(&self, ticket: Ticket, kind: SessionKind) {
        notify(
            self.events.as_ref(),
            Event::new(EventType::AiResponseMerged, ticket.project_id.to_string())
                .with("kind", kind.to_string()),
        )
        .await;
    }

    async fn discarded(&self, ticket: Ticket, kind: SessionKind) {
        warn!(
            "Discarding {} result for project {}: it is no longer open",
            kind, ticket.project_id
        );
        notify(
            self.events.as_ref(),
            Event::new(EventType::AiResponseDiscarded, ticket.project_id.to_string())
                .with("kind", kind.to_string()),
        )
        .await;
    }
}

fn open_project(registry: &ProjectRegistry) -> Result<ProjectId> {
    registry
        .active()
        .map(Workspace::project_id)
        .ok_or_else(|| precondition!("no project is open"))
}
