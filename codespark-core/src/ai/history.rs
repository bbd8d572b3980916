//! Record of AI requests made during this process's lifetime.

use super::AnalysisKind;
use crate::project::ProjectId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use uuid::Uuid;

/// Records kept before the oldest is dropped.
const MAX_RETAINED: usize = 1000;

/// Which intent produced a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Chat message
    Chat,
    /// Code generation
    CodeGeneration,
    /// Code analysis
    CodeAnalysis,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionKind::Chat => "chat",
            SessionKind::CodeGeneration => "code_generation",
            SessionKind::CodeAnalysis => "code_analysis",
        })
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Waiting for the backend
    Pending,
    /// Answered and merged
    Completed,
    /// The backend failed
    Failed,
    /// Answered after its project was closed; not merged
    Discarded,
}

/// File and focus of a code analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisTarget {
    /// Canonical path of the analyzed file
    pub file_path: String,
    /// What the analysis looked for
    pub kind: AnalysisKind,
}

/// One AI request and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSession {
    /// Unique identifier
    pub id: Uuid,
    /// Project the request was made for
    pub project_id: ProjectId,
    /// Intent
    pub kind: SessionKind,
    /// Prompt as sent
    pub prompt: String,
    /// Backend response, or the error text for failed sessions
    pub response: Option<String>,
    /// Status
    pub status: SessionStatus,
    /// Analyzed file, for code analysis sessions
    pub analysis: Option<AnalysisTarget>,
    /// Creation time
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Bounded, in-memory list of [`AiSession`]s.
#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    sessions: VecDeque<AiSession>,
}

impl SessionHistory {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending request and return its id.
    pub fn begin<S: Into<String>>(&mut self, project_id: ProjectId, kind: SessionKind, prompt: S) -> Uuid {
        if self.sessions.len() >= MAX_RETAINED {
            self.sessions.pop_front();
        }
        let id = Uuid::new_v4();
        self.sessions.push_back(AiSession {
            id,
            project_id,
            kind,
            prompt: prompt.into(),
            response: None,
            status: SessionStatus::Pending,
            analysis: None,
            created_at: chrono::Utc::now(),
        });
        id
    }

    /// Record a pending code analysis of one file.
    pub fn begin_analysis<S: Into<String>>(
        &mut self,
        project_id: ProjectId,
        target: AnalysisTarget,
        prompt: S,
    ) -> Uuid {
        let id = self.begin(project_id, SessionKind::CodeAnalysis, prompt);
        if let Some(session) = self.sessions.back_mut() {
            session.analysis = Some(target);
        }
        id
    }

    /// Look up one session.
    pub fn get(&self, id: Uuid) -> Option<&AiSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Analyses of one file, newest first.
    pub fn analyses_of(&self, project_id: ProjectId, file_path: &str) -> Vec<AiSession> {
        self.sessions
            .iter()
            .rev()
            .filter(|s| s.project_id == project_id)
            .filter(|s| s.analysis.as_ref().map_or(false, |a| a.file_path == file_path))
            .cloned()
            .collect()
    }

    /// Settle a pending session.
    pub fn settle<S: Into<String>>(&mut self, id: Uuid, status: SessionStatus, response: S) {
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) {
            session.status = status;
            session.response = Some(response.into());
        }
    }

    /// Up to `limit` sessions, newest first, optionally for one project.
    pub fn recent(&self, limit: usize, project_id: Option<ProjectId>) -> Vec<AiSession> {
        self.sessions
            .iter()
            .rev()
            .filter(|s| project_id.map_or(true, |p| s.project_id == p))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Drop every session of a project.
    pub fn forget_project(&mut self, project_id: ProjectId) {
        self.sessions.retain(|s| s.project_id != project_id);
    }

    /// Number of recorded sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_is_newest_first_and_filtered() {
        let mut history = SessionHistory::new();
        let a = ProjectId::new();
        let b = ProjectId::new();
        let first = history.begin(a, SessionKind::Chat, "one");
        history.begin(b, SessionKind::CodeAnalysis, "two");
        history.begin(a, SessionKind::CodeGeneration, "three");
        history.settle(first, SessionStatus::Completed, "done");

        let all = history.recent(10, None);
        let prompts: Vec<_> = all.iter().map(|s| s.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["three", "two", "one"]);

        let only_a = history.recent(1, Some(a));
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].prompt, "three");

        let settled = history.recent(10, Some(a)).pop().unwrap();
        assert_eq!(settled.status, SessionStatus::Completed);
        assert_eq!(settled.response.as_deref(), Some("done"));
    }

    #[test]
    fn test_forget_project() {
        let mut history = SessionHistory::new();
        let a = ProjectId::new();
        history.begin(a, SessionKind::Chat, "x");
        history.begin(ProjectId::new(), SessionKind::Chat, "y");
        history.forget_project(a);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_lookup_by_id() {
        let mut history = SessionHistory::new();
        let project = ProjectId::new();
        let id = history.begin(project, SessionKind::Chat, "hello");
        history.begin(project, SessionKind::Chat, "again");

        let session = history.get(id).unwrap();
        assert_eq!(session.prompt, "hello");
        assert!(session.analysis.is_none());
        assert!(history.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_analyses_are_kept_per_file() {
        let mut history = SessionHistory::new();
        let project = ProjectId::new();
        let target = |path: &str, kind| AnalysisTarget {
            file_path: path.to_string(),
            kind,
        };
        let first = history.begin_analysis(project, target("/app.js", AnalysisKind::Bugs), "a");
        history.begin_analysis(project, target("/lib.js", AnalysisKind::General), "b");
        history.begin(project, SessionKind::Chat, "c");
        history.begin_analysis(project, target("/app.js", AnalysisKind::Security), "d");
        history.settle(first, SessionStatus::Completed, "no bugs");

        let analyses = history.analyses_of(project, "/app.js");
        let kinds: Vec<_> = analyses
            .iter()
            .map(|s| s.analysis.as_ref().unwrap().kind)
            .collect();
        assert_eq!(kinds, vec![AnalysisKind::Security, AnalysisKind::Bugs]);
        assert_eq!(analyses[1].response.as_deref(), Some("no bugs"));
        assert_eq!(analyses[1].kind, SessionKind::CodeAnalysis);
        assert!(history.analyses_of(ProjectId::new(), "/app.js").is_empty());
    }
}
