//! # CodeSpark Core Application Module
//!
//! This module provides the [`Application`] struct that wires the core
//! together: configuration, the event bus, the [`ProjectRegistry`] and,
//! when an AI backend is supplied, the [`AiDispatcher`].
//!
//! Front ends (the CLI, a web layer) own one [`Application`], call
//! [`initialize`](Application::initialize) once, and
//! [`shutdown`](Application::shutdown) before exiting so that unsaved
//! buffers and the project index are written out.

use crate::{
    ai::{AiBackend, AiDispatcher},
    config::Config,
    error::Result,
    events::{notify, Event, EventBus, EventType, SharedEventBus},
    project::{Project, ProjectId, ProjectRegistry},
    store::FileStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Main application coordinator for CodeSpark.
///
/// # Example
///
/// ```rust
/// use codespark_core::{Application, Config, NewProject};
/// use codespark_core::store::MemoryFileStore;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let mut app = Application::new(Config::default(), Arc::new(MemoryFileStore::new()));
/// app.initialize().await?;
///
/// let registry = app.registry();
/// let project = registry.write().await.create(NewProject::new("demo")).await?;
/// assert_eq!(project.language, "javascript");
///
/// app.shutdown().await?;
/// # Ok::<(), codespark_core::Error>(())
/// # });
/// ```
pub struct Application {
    /// Project registry and the active workspace
    registry: Arc<RwLock<ProjectRegistry>>,
    /// AI front door, present once a backend is attached
    dispatcher: Option<AiDispatcher>,
    /// Event bus for inter-component communication
    event_bus: SharedEventBus,
    /// Application configuration
    config: Config,
    /// JSON file holding project records
    index_path: Option<PathBuf>,
    /// Whether the application has been initialized
    initialized: bool,
}

impl Application {
    /// Create a new application over a file store.
    ///
    /// Nothing is loaded until [`initialize`](Self::initialize) is called.
    pub fn new(config: Config, store: Arc<dyn FileStore>) -> Self {
        info!("Creating new CodeSpark application instance");

        let event_bus = Arc::new(RwLock::new(EventBus::new()));
        let mut registry = ProjectRegistry::new(store).with_events(Arc::clone(&event_bus));
        registry.set_default_language(config.editor.default_language.clone());
        registry.set_max_recent(config.app.max_recent_projects);

        Self {
            registry: Arc::new(RwLock::new(registry)),
            dispatcher: None,
            event_bus,
            config,
            index_path: None,
            initialized: false,
        }
    }

    /// Persist project records to `path` across restarts.
    pub fn with_index<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// Route AI requests to `backend`.
    pub fn with_ai_backend(mut self, backend: Arc<dyn AiBackend>) -> Self {
        self.dispatcher = Some(
            AiDispatcher::new(backend, Arc::clone(&self.registry))
                .with_config(self.config.ai.clone(), self.config.editor.clone())
                .with_events(Arc::clone(&self.event_bus)),
        );
        self
    }

    /// Initialize the event bus and load the project index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index exists but cannot be read.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            warn!("Application is already initialized");
            return Ok(());
        }

        info!("Initializing CodeSpark application");

        self.event_bus.write().await.initialize().await?;

        if let Some(path) = &self.index_path {
            let count = self.registry.write().await.load_index(path).await?;
            info!("Loaded {} projects", count);
        }

        notify(
            Some(&self.event_bus),
            Event::new(EventType::ApplicationStartup, env!("CARGO_PKG_VERSION")),
        )
        .await;

        self.initialized = true;
        info!("Application initialization completed successfully");
        Ok(())
    }

    /// Flush unsaved buffers, save the project index and stop the event bus.
    ///
    /// Failures are logged; shutdown always completes.
    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.initialized {
            warn!("Attempting to shutdown uninitialized application");
            return Ok(());
        }

        info!("Shutting down CodeSpark application");

        notify(Some(&self.event_bus), Event::new(EventType::ApplicationShutdown, "")).await;

        {
            let mut registry = self.registry.write().await;
            if let Some(workspace) = registry.active_mut() {
                match workspace.flush_all().await {
                    Ok(0) => {}
                    Ok(n) => info!("Saved {} buffers", n),
                    Err(e) => error!("Unsaved buffers remain: {}", e),
                }
            }
            if let Some(path) = &self.index_path {
                if let Err(e) = registry.save_index(path).await {
                    error!("Failed to save project index: {}", e);
                }
            }
        }

        {
            let bus = self.event_bus.read().await;
            if let Err(e) = bus.process_events().await {
                error!("Event delivery error: {}", e);
            }
        }

        if let Err(e) = self.event_bus.write().await.shutdown().await {
            error!("Event bus shutdown error: {}", e);
        }

        self.initialized = false;
        info!("Application shutdown completed");
        Ok(())
    }

    /// Check if the application has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Apply a new configuration to every component.
    ///
    /// # Errors
    ///
    /// Returns a validation error, leaving the current settings in place, if
    /// `config` is invalid.
    pub async fn reconfigure(&mut self, config: Config) -> Result<()> {
        config.validate()?;

        {
            let mut registry = self.registry.write().await;
            registry.set_default_language(config.editor.default_language.clone());
            registry.set_max_recent(config.app.max_recent_projects);
        }
        self.dispatcher = self
            .dispatcher
            .take()
            .map(|d| d.with_config(config.ai.clone(), config.editor.clone()));
        self.config = config;

        notify(
            Some(&self.event_bus),
            Event::new(EventType::ConfigurationChanged, ""),
        )
        .await;
        Ok(())
    }

    /// Delete a project, its files and its AI session records.
    ///
    /// # Errors
    ///
    /// Same as [`ProjectRegistry::delete`]; session records are kept when
    /// the project survives.
    pub async fn delete_project(&self, id: ProjectId) -> Result<Project> {
        let project = self.registry.write().await.delete(id).await?;
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.forget_project(id).await;
        }
        Ok(project)
    }

    /// Shared handle to the project registry.
    pub fn registry(&self) -> Arc<RwLock<ProjectRegistry>> {
        Arc::clone(&self.registry)
    }

    /// The AI dispatcher, if a backend was attached.
    pub fn dispatcher(&self) -> Option<&AiDispatcher> {
        self.dispatcher.as_ref()
    }

    /// Get a reference to the event bus.
    pub fn event_bus(&self) -> SharedEventBus {
        Arc::clone(&self.event_bus)
    }

    /// Current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
