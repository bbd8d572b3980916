//! # AI-assisted intents
//!
//! The [`AiDispatcher`] routes the three user intents (chat, code generation,
//! code analysis) to an [`AiBackend`] and merges each kind of result into the
//! open project in its own way:
//!
//! - chat appends to the project's [`Conversation`]
//! - generation appends code to the active file and saves it
//! - analysis returns text and touches nothing
//!
//! The backend is a black box. The core makes one attempt per intent and
//! surfaces failures as [`Error::AiBackend`](crate::Error::AiBackend).

mod context;
mod dispatch;
mod history;

pub use context::{analysis_prompt, chat_context, generation_prompt, ContextFile};
pub use dispatch::{
    AiDispatcher, AnalysisRequest, ChatRequest, GenerationOutcome, GenerationRequest, Resolution,
};
pub use history::{AiSession, AnalysisTarget, SessionHistory, SessionKind, SessionStatus};

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiRole {
    /// The person using the editor
    User,
    /// The AI backend
    Assistant,
}

/// One message of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiMessage {
    /// Author
    pub role: AiRole,
    /// Text
    pub content: String,
    /// When the message was appended
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AiMessage {
    /// A message from the user.
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::new(AiRole::User, content)
    }

    /// A message from the assistant.
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::new(AiRole::Assistant, content)
    }

    fn new<S: Into<String>>(role: AiRole, content: S) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: chrono::Utc::now(),
        }
    }
}

/// Append-only chat log of one opened project.
///
/// Lives as long as the project stays selected; it is never persisted.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<AiMessage>,
}

impl Conversation {
    /// An empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[AiMessage] {
        &self.messages
    }

    /// Most recent message.
    pub fn last(&self) -> Option<&AiMessage> {
        self.messages.last()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing was said yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn push(&mut self, message: AiMessage) {
        self.messages.push(message);
    }
}

/// What a code analysis should look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// General issues
    #[default]
    General,
    /// Performance problems
    Performance,
    /// Security vulnerabilities
    Security,
    /// Deviations from best practices
    BestPractices,
    /// Likely bugs
    Bugs,
}

impl AnalysisKind {
    /// Every kind, in menu order.
    pub const ALL: [AnalysisKind; 5] = [
        AnalysisKind::General,
        AnalysisKind::Performance,
        AnalysisKind::Security,
        AnalysisKind::BestPractices,
        AnalysisKind::Bugs,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::General => "general",
            AnalysisKind::Performance => "performance",
            AnalysisKind::Security => "security",
            AnalysisKind::BestPractices => "best_practices",
            AnalysisKind::Bugs => "bugs",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                Error::validation(
                    "analysis_kind",
                    format!(
                        "unknown analysis kind '{}', expected one of: general, performance, security, best_practices, bugs",
                        s
                    ),
                )
            })
    }
}

/// The AI model behind the intents.
///
/// Implementations perform exactly one request per call; the core never
/// retries.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use codespark_core::ai::{AiBackend, AnalysisKind, ContextFile};
///
/// struct Canned;
///
/// #[async_trait]
/// impl AiBackend for Canned {
///     async fn chat(&self, prompt: &str, _context: &str) -> anyhow::Result<String> {
///         Ok(format!("You asked: {}", prompt))
///     }
///
///     async fn generate(
///         &self,
///         _description: &str,
///         _language: &str,
///         _context_files: &[ContextFile],
///     ) -> anyhow::Result<String> {
///         Ok("fn main() {}".to_string())
///     }
///
///     async fn analyze(&self, file: &ContextFile, kind: AnalysisKind) -> anyhow::Result<String> {
///         Ok(format!("No {} issues in {}", kind, file.path))
///     }
/// }
/// ```
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Answer a chat prompt given the project context.
    async fn chat(&self, prompt: &str, context: &str) -> anyhow::Result<String>;

    /// Generate code in `language` from a description.
    async fn generate(
        &self,
        description: &str,
        language: &str,
        context_files: &[ContextFile],
    ) -> anyhow::Result<String>;

    /// Review one file.
    async fn analyze(&self, file: &ContextFile, kind: AnalysisKind) -> anyhow::Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_kind_names() {
        for kind in AnalysisKind::ALL {
            assert_eq!(kind.as_str().parse::<AnalysisKind>().unwrap(), kind);
            assert_eq!(
                serde_json::to_string(&kind).unwrap(),
                format!("\"{}\"", kind.as_str())
            );
        }
        assert!("style".parse::<AnalysisKind>().unwrap_err().is_validation());
    }

    #[test]
    fn test_conversation_is_append_only() {
        let mut conversation = Conversation::new();
        conversation.push(AiMessage::user("hi"));
        conversation.push(AiMessage::assistant("hello"));
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages()[0].role, AiRole::User);
        assert_eq!(conversation.last().unwrap().content, "hello");
    }
}
