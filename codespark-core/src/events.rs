//! # Event system for CodeSpark Core
//!
//! A small publish-subscribe bus used to tell interested parties (a UI, a
//! logger, tests) that something happened: a file was created, a buffer was
//! saved, a project was selected, an AI response was merged or discarded.
//!
//! Emitting never blocks on handlers. Events are queued and delivered by
//! [`EventBus::process_events`], which hosts call once per tick. Handler
//! failures are logged and never reach the emitter.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Trait for types that react to bus events.
///
/// # Example
///
/// ```rust
/// use codespark_core::events::{Event, EventHandler, EventType};
///
/// struct SaveLogger;
///
/// impl EventHandler for SaveLogger {
///     fn handle(&mut self, event: &Event) -> anyhow::Result<()> {
///         if event.event_type() == EventType::BufferSaved {
///             println!("saved {}", event.data());
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Handle one event. Errors are logged by the bus.
    fn handle(&mut self, event: &Event) -> anyhow::Result<()>;
}

impl<F> EventHandler for F
where
    F: FnMut(&Event) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&mut self, event: &Event) -> anyhow::Result<()> {
        self(event)
    }
}

/// Something that happened in the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    id: Uuid,
    event_type: EventType,
    /// Main payload, usually a path or a project id
    data: String,
    metadata: HashMap<String, String>,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl Event {
    /// Create an event with a payload.
    ///
    /// # Example
    ///
    /// ```rust
    /// use codespark_core::events::{Event, EventType};
    ///
    /// let event = Event::new(EventType::FileCreated, "/src/main.rs");
    /// assert_eq!(event.data(), "/src/main.rs");
    /// ```
    pub fn new<S: Into<String>>(event_type: EventType, data: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            data: data.into(),
            metadata: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Builder-style metadata entry.
    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Unique identifier of this event.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Event type.
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// All metadata.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// A single metadata value.
    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }

    /// Creation time.
    pub fn timestamp(&self) -> chrono::DateTime<chrono::Utc> {
        self.timestamp
    }
}

/// Kinds of events emitted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    // Tree events
    /// A file or directory was created
    FileCreated,
    /// A file or directory was removed
    FileRemoved,
    /// A file or directory was renamed
    FileRenamed,

    // Editor events
    /// A buffer was opened
    BufferOpened,
    /// A buffer was persisted
    BufferSaved,
    /// A buffer was closed
    BufferClosed,

    // Project events
    /// A project was created
    ProjectCreated,
    /// A project became active
    ProjectSelected,
    /// Project metadata changed
    ProjectUpdated,
    /// A project was deleted
    ProjectDeleted,

    // AI events
    /// An AI result was merged into the active project
    AiResponseMerged,
    /// An AI result arrived after a project switch and was dropped
    AiResponseDiscarded,

    // Application events
    /// The application is starting up
    ApplicationStartup,
    /// The application is shutting down
    ApplicationShutdown,
    /// Configuration was changed
    ConfigurationChanged,
}

impl EventType {
    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            EventType::FileCreated => "File or directory was created",
            EventType::FileRemoved => "File or directory was removed",
            EventType::FileRenamed => "File or directory was renamed",
            EventType::BufferOpened => "Buffer was opened",
            EventType::BufferSaved => "Buffer was saved",
            EventType::BufferClosed => "Buffer was closed",
            EventType::ProjectCreated => "Project was created",
            EventType::ProjectSelected => "Project was selected",
            EventType::ProjectUpdated => "Project was updated",
            EventType::ProjectDeleted => "Project was deleted",
            EventType::AiResponseMerged => "AI response was merged",
            EventType::AiResponseDiscarded => "Stale AI response was discarded",
            EventType::ApplicationStartup => "Application is starting up",
            EventType::ApplicationShutdown => "Application is shutting down",
            EventType::ConfigurationChanged => "Configuration was changed",
        }
    }
}

/// Shared handle to the bus, as held by every component.
pub type SharedEventBus = Arc<RwLock<EventBus>>;

/// Central event bus.
///
/// # Example
///
/// ```rust
/// use codespark_core::events::{Event, EventBus, EventType};
///
/// # tokio_test::block_on(async {
/// let mut event_bus = EventBus::new();
/// event_bus.initialize().await?;
///
/// event_bus.emit(Event::new(EventType::BufferSaved, "/src/main.rs")).await?;
/// assert_eq!(event_bus.queue_size().await, 1);
/// event_bus.process_events().await?;
/// assert_eq!(event_bus.queue_size().await, 0);
/// # Ok::<(), codespark_core::Error>(())
/// # });
/// ```
pub struct EventBus {
    handlers: Arc<RwLock<HashMap<EventType, Vec<HandlerEntry>>>>,
    event_queue: Arc<Mutex<VecDeque<Event>>>,
    initialized: bool,
    max_queue_size: usize,
    async_processing: bool,
}

/// Does not derive Debug because dyn EventHandler does not implement Debug.
struct HandlerEntry {
    id: Uuid,
    handler: Arc<Mutex<dyn EventHandler>>,
    /// Higher runs first
    priority: i32,
}

impl EventBus {
    /// Create a new, uninitialized bus.
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            event_queue: Arc::new(Mutex::new(VecDeque::new())),
            initialized: false,
            max_queue_size: 1000,
            async_processing: true,
        }
    }

    /// Create a bus, initialize it and wrap it for sharing.
    pub async fn shared() -> Result<SharedEventBus> {
        let mut bus = Self::new();
        bus.initialize().await?;
        Ok(Arc::new(RwLock::new(bus)))
    }

    /// Initialize the event bus.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            warn!("Event bus is already initialized");
            return Ok(());
        }

        debug!("Initializing event bus");
        self.initialized = true;
        Ok(())
    }

    /// Drop every handler and pending event.
    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.initialized {
            return Ok(());
        }

        debug!("Shutting down event bus");
        self.handlers.write().await.clear();
        self.event_queue.lock().await.clear();
        self.initialized = false;
        Ok(())
    }

    /// Whether the bus accepts events.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Subscribe to one event type. Returns an id for [`unsubscribe`](Self::unsubscribe).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Event`] if the bus is not initialized.
    pub async fn subscribe(
        &self,
        event_type: EventType,
        handler: Arc<Mutex<dyn EventHandler>>,
        priority: i32,
    ) -> Result<Uuid> {
        if !self.initialized {
            return Err(Error::event("Event bus not initialized"));
        }

        let id = Uuid::new_v4();
        let mut handlers = self.handlers.write().await;
        let type_handlers = handlers.entry(event_type).or_default();
        type_handlers.push(HandlerEntry {
            id,
            handler,
            priority,
        });
        type_handlers.sort_by(|a, b| b.priority.cmp(&a.priority));

        debug!(
            "Subscribed handler {} to {:?} events with priority {}",
            id, event_type, priority
        );
        Ok(id)
    }

    /// Remove a subscription.
    pub async fn unsubscribe(&self, subscription_id: Uuid) -> Result<()> {
        let mut handlers = self.handlers.write().await;
        for type_handlers in handlers.values_mut() {
            type_handlers.retain(|entry| entry.id != subscription_id);
        }
        debug!("Unsubscribed handler {}", subscription_id);
        Ok(())
    }

    /// Emit an event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Event`] if the bus is not initialized.
    pub async fn emit(&self, event: Event) -> Result<()> {
        if !self.initialized {
            return Err(Error::event("Event bus not initialized"));
        }

        if self.async_processing {
            self.queue_event(event).await
        } else {
            self.process_event_immediately(event).await
        }
    }

    /// Deliver every queued event.
    pub async fn process_events(&self) -> Result<()> {
        if !self.initialized {
            return Ok(());
        }

        let mut processed_count = 0;
        loop {
            let event = self.event_queue.lock().await.pop_front();
            match event {
                Some(event) => {
                    if let Err(e) = self.process_event_immediately(event).await {
                        error!("Event processing error: {}", e);
                    }
                    processed_count += 1;
                }
                None => break,
            }
        }

        if processed_count > 0 {
            debug!("Processed {} events", processed_count);
        }
        Ok(())
    }

    /// Number of undelivered events.
    pub async fn queue_size(&self) -> usize {
        self.event_queue.lock().await.len()
    }

    /// Snapshot of undelivered events, oldest first.
    pub async fn pending(&self) -> Vec<Event> {
        self.event_queue.lock().await.iter().cloned().collect()
    }

    /// Number of handlers for an event type.
    pub async fn handler_count(&self, event_type: EventType) -> usize {
        let handlers = self.handlers.read().await;
        handlers.get(&event_type).map_or(0, |h| h.len())
    }

    /// Set the maximum queue size. The oldest event is dropped on overflow.
    pub fn set_max_queue_size(&mut self, max_size: usize) {
        self.max_queue_size = max_size;
    }

    /// Deliver events on [`emit`](Self::emit) instead of queueing them.
    pub fn set_async_processing(&mut self, async_mode: bool) {
        self.async_processing = async_mode;
    }

    async fn queue_event(&self, event: Event) -> Result<()> {
        let mut queue = self.event_queue.lock().await;
        if queue.len() >= self.max_queue_size {
            warn!("Event queue is full, dropping oldest event");
            queue.pop_front();
        }

        debug!("Queued event: {:?}", event.event_type());
        queue.push_back(event);
        Ok(())
    }

    async fn process_event_immediately(&self, event: Event) -> Result<()> {
        let handlers = self.handlers.read().await;
        if let Some(type_handlers) = handlers.get(&event.event_type()) {
            for entry in type_handlers {
                let mut handler = entry.handler.lock().await;
                if let Err(e) = handler.handle(&event) {
                    error!(
                        "Handler {} failed to process {:?} event: {}",
                        entry.id,
                        event.event_type(),
                        e
                    );
                }
            }
        }
        Ok(())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Emit on an optional shared bus, logging instead of failing.
pub(crate) async fn notify(bus: Option<&SharedEventBus>, event: Event) {
    if let Some(bus) = bus {
        if let Err(e) = bus.read().await.emit(event).await {
            debug!("Event not delivered: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    impl EventHandler for CountingHandler {
        fn handle(&mut self, _event: &Event) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_emit_requires_initialization() {
        let bus = EventBus::new();
        let err = bus
            .emit(Event::new(EventType::FileCreated, "/a"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "Event");
    }

    #[tokio::test]
    async fn test_queued_delivery() {
        let mut bus = EventBus::new();
        bus.initialize().await.unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Mutex::new(CountingHandler {
            calls: Arc::clone(&calls),
        }));
        bus.subscribe(EventType::BufferSaved, handler, 0).await.unwrap();

        bus.emit(Event::new(EventType::BufferSaved, "/a.js")).await.unwrap();
        bus.emit(Event::new(EventType::BufferClosed, "/a.js")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        bus.process_events().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.queue_size().await, 0);
    }

    #[tokio::test]
    async fn test_priority_order() {
        let mut bus = EventBus::new();
        bus.set_async_processing(false);
        bus.initialize().await.unwrap();

        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        for priority in [1, 10, 5] {
            let order = Arc::clone(&order);
            let handler = move |_: &Event| -> anyhow::Result<()> {
                order.lock().unwrap().push(priority);
                Ok(())
            };
            bus.subscribe(EventType::ProjectSelected, Arc::new(Mutex::new(handler)), priority)
                .await
                .unwrap();
        }

        bus.emit(Event::new(EventType::ProjectSelected, "p")).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec![10, 5, 1]);
    }

    #[tokio::test]
    async fn test_unsubscribe_and_shutdown() {
        let mut bus = EventBus::new();
        bus.initialize().await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Mutex::new(CountingHandler { calls }));

        let id = bus.subscribe(EventType::FileRemoved, handler.clone(), 0).await.unwrap();
        bus.unsubscribe(id).await.unwrap();
        assert_eq!(bus.handler_count(EventType::FileRemoved).await, 0);

        bus.subscribe(EventType::FileRemoved, handler, 0).await.unwrap();
        bus.shutdown().await.unwrap();
        assert!(!bus.is_initialized());
        assert_eq!(bus.handler_count(EventType::FileRemoved).await, 0);
    }

    #[tokio::test]
    async fn test_queue_overflow_drops_oldest() {
        let mut bus = EventBus::new();
        bus.set_max_queue_size(2);
        bus.initialize().await.unwrap();

        for path in ["/1", "/2", "/3"] {
            bus.emit(Event::new(EventType::FileCreated, path)).await.unwrap();
        }
        let pending: Vec<_> = bus.pending().await.iter().map(|e| e.data().to_string()).collect();
        assert_eq!(pending, vec!["/2", "/3"]);
    }

    #[test]
    fn test_event_metadata() {
        let event = Event::new(EventType::FileRenamed, "/b.js").with("from", "/a.js");
        assert_eq!(event.get_metadata("from"), Some("/a.js"));
        assert_eq!(event.event_type().description(), "File or directory was renamed");
    }
}
