//! # CodeSpark Core
//!
//! Core functionality for CodeSpark, a project-centric code workspace with
//! AI assistance. This crate keeps a project's file tree in memory in step
//! with a persistent [`FileStore`](store::FileStore), manages editor buffers,
//! and routes chat, generation and analysis requests to an AI backend.
//!
//! ## Architecture
//!
//! - [`ProjectRegistry`] owns project records and at most one active
//!   [`Workspace`].
//! - A [`Workspace`] pairs a [`FileTree`] with an [`EditorState`] and a chat
//!   [`Conversation`](ai::Conversation). Every mutation is confirmed by the
//!   store before it becomes visible in memory.
//! - [`AiDispatcher`](ai::AiDispatcher) awaits the backend without holding
//!   any lock, and drops results whose project was closed in the meantime.
//! - Components report what happened on a shared [`EventBus`].
//!
//! ## Example
//!
//! ```rust
//! use codespark_core::{NewProject, NodeKind, ProjectRegistry};
//! use codespark_core::store::MemoryFileStore;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let mut registry = ProjectRegistry::new(Arc::new(MemoryFileStore::new()));
//! let project = registry.create(NewProject::new("hello")).await?;
//!
//! let workspace = registry.select(project.id).await?;
//! workspace.insert("", "src", NodeKind::Directory).await?;
//! workspace.insert("/src", "main.js", NodeKind::File).await?;
//! workspace.edit_file("/src/main.js", "console.log('hi');")?;
//! workspace.flush_file("/src/main.js").await?;
//!
//! assert_eq!(workspace.tree().file_paths(), vec!["/src/main.js".to_string()]);
//! # Ok::<(), codespark_core::Error>(())
//! # });
//! ```

pub mod ai;
pub mod application;
pub mod config;
pub mod editor;
pub mod error;
pub mod events;
pub mod language;
pub mod path;
pub mod project;
pub mod session;
pub mod store;
pub mod tree;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use application::Application;
pub use config::Config;
pub use editor::{Buffer, CloseMode, EditorSnapshot, EditorState};
pub use error::{Error, Result};
pub use events::{Event, EventBus, EventType};
pub use project::{NewProject, Project, ProjectFilter, ProjectId, ProjectRegistry, ProjectUpdate};
pub use session::Session;
pub use store::{FileStore, NodeId, NodeKind};
pub use tree::{FileNode, FileTree, FilteredView};
pub use workspace::Workspace;

/// Initialize tracing for the application
///
/// Installs a formatting subscriber that honours `RUST_LOG`. Does nothing if
/// a global subscriber is already set.
///
/// # Example
///
/// ```rust
/// codespark_core::init_tracing();
/// tracing::info!("Application started");
/// ```
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}
