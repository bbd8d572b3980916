//! Command execution for the `codespark` binary.
//!
//! A [`Cli`] owns one initialized [`Application`] over a
//! [`DirectoryFileStore`] and the persisted [`Session`], runs a single
//! [`Action`] and writes human-readable output to any [`Write`] sink.

use anyhow::{anyhow, bail, Context};
use codespark_core::store::DirectoryFileStore;
use codespark_core::tree::ViewNode;
use codespark_core::{
    path, Application, Config, NewProject, NodeKind, ProjectFilter, ProjectId, ProjectRegistry,
    ProjectUpdate, Session, Workspace,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// One thing the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// List projects
    Projects {
        search: Option<String>,
        language: Option<String>,
    },
    /// Create a project
    Create {
        name: String,
        description: Option<String>,
        language: Option<String>,
        public: bool,
        repository: Option<String>,
    },
    /// Change project metadata
    Update {
        project: String,
        name: Option<String>,
        description: Option<String>,
        language: Option<String>,
        public: Option<bool>,
        repository: Option<Option<String>>,
    },
    /// Delete a project
    Delete { project: String },
    /// Select the project in use
    Use { project: String },
    /// Print the file tree
    Tree { search: Option<String> },
    /// Create a file or directory
    New { path: String, directory: bool },
    /// Remove a file or directory
    Remove { path: String },
    /// Rename a file or directory
    Move { path: String, name: String },
    /// Print a file
    Cat { path: String },
    /// Replace and save a file's content
    Write { path: String, content: String },
}

/// The binary's view of an application plus its session.
pub struct Cli {
    app: Application,
    session: Session,
    session_path: PathBuf,
}

impl Cli {
    /// Open the store under `data_dir` and initialize the application.
    pub async fn open(config: Config, data_dir: PathBuf, session_path: PathBuf) -> anyhow::Result<Self> {
        let store = DirectoryFileStore::open(data_dir.join("store")).await?;
        let mut app =
            Application::new(config, Arc::new(store)).with_index(data_dir.join("projects.json"));
        app.initialize().await?;

        let session = Session::load_from(&session_path).unwrap_or_else(|e| {
            warn!("Ignoring unreadable session: {}", e);
            Session::default()
        });
        debug!("Session has {} recent projects", session.recent_projects.len());

        Ok(Self {
            app,
            session,
            session_path,
        })
    }

    /// Save everything and shut the application down.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.app.shutdown().await?;
        self.session.save_to(&self.session_path)?;
        Ok(())
    }

    /// Execute one action, writing its output to `out`.
    pub async fn run<W: Write>(&mut self, action: Action, out: &mut W) -> anyhow::Result<()> {
        let handle = self.app.registry();
        let mut registry = handle.write().await;

        match action {
            Action::Projects { search, language } => {
                let mut filter = ProjectFilter::all();
                filter.term = search;
                filter.language = language;
                let projects = registry.filter(&filter);
                if projects.is_empty() {
                    writeln!(out, "No projects found")?;
                }
                let current = self.session.last_opened_project;
                for project in projects {
                    let marker = if Some(project.id) == current { '*' } else { ' ' };
                    writeln!(
                        out,
                        "{} {}  {} [{}]{}",
                        marker,
                        project.id,
                        project.name,
                        project.language,
                        if project.is_public { " public" } else { "" }
                    )?;
                    if !project.description.is_empty() {
                        writeln!(out, "      {}", project.description)?;
                    }
                }
            }
            Action::Create {
                name,
                description,
                language,
                public,
                repository,
            } => {
                let mut params = NewProject::new(name).public(public);
                if let Some(description) = description {
                    params = params.description(description);
                }
                if let Some(language) = language {
                    params = params.language(language);
                }
                if let Some(url) = repository {
                    params = params.repository_url(url);
                }
                let project = registry.create(params).await?;
                writeln!(out, "Created {} ({})", project.name, project.id)?;
            }
            Action::Update {
                project,
                name,
                description,
                language,
                public,
                repository,
            } => {
                let id = find_project(&registry, &project)?;
                let changes = ProjectUpdate {
                    name,
                    description,
                    language,
                    is_public: public,
                    repository_url: repository,
                };
                let project = registry.update(id, changes).await?;
                writeln!(out, "Updated {} ({})", project.name, project.id)?;
            }
            Action::Delete { project } => {
                let id = find_project(&registry, &project)?;
                drop(registry);
                let project = self.app.delete_project(id).await?;
                self.session.forget_project(id);
                writeln!(out, "Deleted {}", project.name)?;
            }
            Action::Use { project } => {
                let id = find_project(&registry, &project)?;
                let files = registry.select(id).await?.tree().file_count();
                let max = self.app.config().app.max_recent_projects;
                self.session.add_recent_project(id, max);
                let name = registry
                    .get(id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                writeln!(out, "Using {} ({} files)", name, files)?;
            }
            Action::Tree { search } => {
                let ws = workspace(&mut registry, &self.session).await?;
                let view = match search {
                    Some(term) => ws.search(&term).clone(),
                    None => ws.view(),
                };
                if view.is_empty() {
                    writeln!(out, "(empty)")?;
                }
                for child in &view.root().children {
                    print_node(out, child, 0)?;
                }
            }
            Action::New { path: raw, directory } => {
                let ws = workspace(&mut registry, &self.session).await?;
                let canonical = path::normalize(&raw)?;
                let parent = path::parent_of(&canonical)
                    .ok_or_else(|| anyhow!("'{}' has no parent directory", raw))?;
                let kind = if directory {
                    NodeKind::Directory
                } else {
                    NodeKind::File
                };
                let node = ws
                    .insert(&parent, path::name_of(&canonical), kind)
                    .await?;
                writeln!(out, "Created {} {}", kind, node.path())?;
            }
            Action::Remove { path: raw } => {
                let ws = workspace(&mut registry, &self.session).await?;
                let node = ws.remove(&raw).await?;
                writeln!(out, "Removed {}", node.path())?;
            }
            Action::Move { path: raw, name } => {
                let ws = workspace(&mut registry, &self.session).await?;
                let target = ws.rename(&raw, &name).await?;
                writeln!(out, "Renamed to {}", target)?;
            }
            Action::Cat { path: raw } => {
                let ws = workspace(&mut registry, &self.session).await?;
                let content = ws.read_file(&raw).await?;
                write!(out, "{}", content)?;
                if !content.is_empty() && !content.ends_with('\n') {
                    writeln!(out)?;
                }
            }
            Action::Write { path: raw, content } => {
                let ws = workspace(&mut registry, &self.session).await?;
                ws.edit_file(&raw, content)?;
                ws.flush_file(&raw)
                    .await
                    .with_context(|| format!("failed to save '{}'", raw))?;
                writeln!(out, "Saved {}", path::normalize(&raw)?)?;
            }
        }
        Ok(())
    }
}

/// Resolve a project by id or, failing that, by case-insensitive name.
fn find_project(registry: &ProjectRegistry, needle: &str) -> anyhow::Result<ProjectId> {
    if let Ok(id) = needle.parse::<ProjectId>() {
        if registry.get(id).is_some() {
            return Ok(id);
        }
    }

    let matches: Vec<_> = registry
        .list()
        .into_iter()
        .filter(|p| p.name.eq_ignore_ascii_case(needle.trim()))
        .collect();
    match matches.as_slice() {
        [project] => Ok(project.id),
        [] => bail!("no project named '{}'", needle),
        _ => bail!("several projects are named '{}'; use an id", needle),
    }
}

/// The workspace of the project in use, selecting it if needed.
async fn workspace<'a>(
    registry: &'a mut ProjectRegistry,
    session: &Session,
) -> anyhow::Result<&'a mut Workspace> {
    let id = session
        .last_opened_project
        .ok_or_else(|| anyhow!("no project in use; run `codespark use <project>` first"))?;
    if registry.active().map(Workspace::project_id) != Some(id) {
        registry.select(id).await?;
    }
    registry
        .active_mut()
        .ok_or_else(|| anyhow!("project {} could not be opened", id))
}

fn print_node<W: Write>(out: &mut W, node: &ViewNode, depth: usize) -> std::io::Result<()> {
    let suffix = match node.kind {
        NodeKind::Directory => "/",
        NodeKind::File if node.dirty => " *",
        NodeKind::File => "",
    };
    writeln!(out, "{}{}{}", "  ".repeat(depth), node.name, suffix)?;
    for child in &node.children {
        print_node(out, child, depth + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    async fn open(dir: &TempDir) -> Cli {
        Cli::open(
            Config::default(),
            dir.path().join("data"),
            dir.path().join("session.json"),
        )
        .await
        .unwrap()
    }

    async fn run(cli: &mut Cli, action: Action) -> String {
        let mut out = Vec::new();
        cli.run(action, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_file_commands_need_a_project_in_use() {
        let dir = tempdir().unwrap();
        let mut cli = open(&dir).await;
        let err = cli
            .run(Action::Tree { search: None }, &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no project in use"));
    }

    #[tokio::test]
    async fn test_state_persists_across_invocations() {
        let dir = tempdir().unwrap();

        let mut cli = open(&dir).await;
        run(
            &mut cli,
            Action::Create {
                name: "Todo API".to_string(),
                description: Some("REST backend".to_string()),
                language: None,
                public: false,
                repository: None,
            },
        )
        .await;
        let used = run(&mut cli, Action::Use { project: "todo api".to_string() }).await;
        assert!(used.starts_with("Using Todo API"));
        run(&mut cli, Action::New { path: "src".to_string(), directory: true }).await;
        run(&mut cli, Action::New { path: "src/index.js".to_string(), directory: false }).await;
        run(
            &mut cli,
            Action::Write {
                path: "src/index.js".to_string(),
                content: "console.log('hi');".to_string(),
            },
        )
        .await;
        cli.close().await.unwrap();

        let mut cli = open(&dir).await;
        let listing = run(&mut cli, Action::Projects { search: Some("rest".to_string()), language: None }).await;
        assert!(listing.contains("Todo API [javascript]"));
        assert!(listing.starts_with('*'));

        let tree = run(&mut cli, Action::Tree { search: None }).await;
        assert_eq!(tree, "src/\n  index.js\n");
        let content = run(&mut cli, Action::Cat { path: "/src/index.js".to_string() }).await;
        assert_eq!(content, "console.log('hi');\n");

        let moved = run(
            &mut cli,
            Action::Move { path: "src".to_string(), name: "lib".to_string() },
        )
        .await;
        assert_eq!(moved, "Renamed to /lib\n");
        cli.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_forgets_the_project() {
        let dir = tempdir().unwrap();
        let mut cli = open(&dir).await;
        run(
            &mut cli,
            Action::Create {
                name: "scratch".to_string(),
                description: None,
                language: Some("rust".to_string()),
                public: true,
                repository: None,
            },
        )
        .await;
        run(&mut cli, Action::Use { project: "scratch".to_string() }).await;
        run(&mut cli, Action::Delete { project: "scratch".to_string() }).await;

        assert_eq!(cli.session.last_opened_project, None);
        let listing = run(&mut cli, Action::Projects { search: None, language: None }).await;
        assert_eq!(listing, "No projects found\n");
        assert!(cli
            .run(Action::Use { project: "scratch".to_string() }, &mut Vec::new())
            .await
            .is_err());
    }
}
