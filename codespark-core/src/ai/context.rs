//! Prompt and context assembly.

use super::AnalysisKind;
use crate::project::Project;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// A file handed to the AI backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFile {
    /// Canonical path
    pub path: String,
    /// Language identifier, used as the code fence tag
    pub language: String,
    /// Full content (live buffer if the file is open)
    pub content: String,
}

impl ContextFile {
    /// Fenced code block, content cut to `max_chars` characters.
    fn fenced(&self, max_chars: Option<usize>, out: &mut String) {
        let _ = writeln!(out, "File: {}", self.path);
        let _ = writeln!(out, "```{}", self.language);
        match max_chars {
            Some(limit) if self.content.chars().count() > limit => {
                out.push_str(truncate_chars(&self.content, limit));
                out.push_str("...\n");
            }
            _ => {
                out.push_str(&self.content);
                if !self.content.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
        out.push_str("```\n\n");
    }
}

/// Longest prefix of `text` with at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Context string sent along with a chat prompt.
///
/// Project header first, then the active file, then the other files, each
/// truncated to `max_chars` characters.
///
/// # Example
///
/// ```rust
/// use codespark_core::ai::{chat_context, ContextFile};
/// use codespark_core::project::{NewProject, Project};
///
/// let project = Project::new(NewProject::new("demo").language("rust"));
/// let main = ContextFile {
///     path: "/main.rs".into(),
///     language: "rust".into(),
///     content: "fn main() {}".into(),
/// };
/// let context = chat_context(&project, Some(&main), &[], 500);
/// assert!(context.starts_with("Project: demo (rust)"));
/// assert!(context.contains("```rust\nfn main() {}\n```"));
/// ```
pub fn chat_context(
    project: &Project,
    active: Option<&ContextFile>,
    others: &[ContextFile],
    max_chars: usize,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Project: {} ({})", project.name, project.language);
    let _ = writeln!(out, "Description: {}", project.description);
    out.push('\n');

    if let Some(file) = active {
        let _ = writeln!(out, "Active file: {}", file.path);
        file.fenced(Some(max_chars), &mut out);
    }
    for file in others {
        file.fenced(Some(max_chars), &mut out);
    }
    out
}

/// Prompt text describing a generation request.
pub fn generation_prompt(description: &str, language: &str, files: &[ContextFile]) -> String {
    let mut out = format!(
        "Generate {} code based on the following description:\n{}\n\n",
        language, description
    );
    if !files.is_empty() {
        out.push_str("Context files:\n");
        for file in files {
            file.fenced(None, &mut out);
        }
    }
    out
}

/// Prompt text describing an analysis request.
pub fn analysis_prompt(file: &ContextFile, kind: AnalysisKind) -> String {
    let mut out = format!(
        "Analyze the following {} code for {} issues:\n\n",
        file.language, kind
    );
    file.fenced(None, &mut out);
    out.push_str("Provide suggestions for improvement.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::NewProject;

    fn file(path: &str, content: &str) -> ContextFile {
        ContextFile {
            path: path.to_string(),
            language: "javascript".to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_chat_context_layout() {
        let project = Project::new(
            NewProject::new("web")
                .language("javascript")
                .description("A site"),
        );
        let long = "x".repeat(600);
        let context = chat_context(
            &project,
            Some(&file("/index.js", "main()")),
            &[file("/big.js", &long)],
            500,
        );

        assert!(context.starts_with("Project: web (javascript)\nDescription: A site\n\n"));
        assert!(context.contains("Active file: /index.js\nFile: /index.js\n```javascript\nmain()\n```"));
        assert!(context.contains(&format!("{}...\n```", "x".repeat(500))));
        assert!(!context.contains(&"x".repeat(501)));
    }

    #[test]
    fn test_generation_and_analysis_prompts() {
        let prompt = generation_prompt("a sum function", "python", &[]);
        assert_eq!(
            prompt,
            "Generate python code based on the following description:\na sum function\n\n"
        );

        let with_files = generation_prompt("x", "javascript", &[file("/a.js", "let a = 1;\n")]);
        assert!(with_files.contains("Context files:\nFile: /a.js\n```javascript\nlet a = 1;\n```"));

        let analysis = analysis_prompt(&file("/a.js", "eval(x)"), AnalysisKind::Security);
        assert!(analysis.starts_with("Analyze the following javascript code for security issues:"));
        assert!(analysis.ends_with("Provide suggestions for improvement."));
    }
}
