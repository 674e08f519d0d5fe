//! Editor notifications for hosts.
//!
//! ## Learning: Two Kinds of Observers
//!
//! Plugins react to each other through resource handlers, which run
//! synchronously inside the engine and may mutate the state. Hosts (a UI,
//! a CLI, a collaboration bridge) sit outside and only need to know *that*
//! something happened, so they subscribe to a `tokio::sync::broadcast`
//! channel of plain values. A slow subscriber lags and skips ahead; it
//! never blocks the editor.

use tokio::sync::broadcast;
use vellum_dom::StepId;

/// Events published by an editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// Every plugin was constructed and set up, in this order
    PluginsActivated(Vec<String>),
    /// The selection was set or reported by the host
    SelectionChanged,
    /// A history step was committed
    StepAdded(StepId),
    /// A step was undone
    Undo(StepId),
    /// A step was redone
    Redo(StepId),
    /// A step produced elsewhere was applied
    ExternalStep(StepId),
    /// The history was cleared
    HistoryReset,
    /// A user command ran successfully
    CommandExecuted(String),
    /// The editor was torn down
    Destroyed,
}

/// Events buffered per subscriber before it starts lagging.
pub const CHANNEL_CAPACITY: usize = 256;

/// Broadcasts [`EditorEvent`]s to hosts.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EditorEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publishes `event` to every current subscriber.
    pub fn emit(&self, event: EditorEvent) {
        tracing::trace!(?event, "emitting");
        // No receivers is not a problem
        let _ = self.sender.send(event);
    }

    /// A receiver for every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver wrapper that skips over lag instead of failing.
///
/// ## Example
///
/// ```ignore
/// let mut handler = EventHandler::new(editor.subscribe());
///
/// tokio::spawn(async move {
///     while let Some(event) = handler.next().await {
///         if let EditorEvent::StepAdded(step) = event {
///             autosave.schedule(step);
///         }
///     }
/// });
/// ```
pub struct EventHandler {
    receiver: broadcast::Receiver<EditorEvent>,
}

impl EventHandler {
    pub fn new(receiver: broadcast::Receiver<EditorEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next event; `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<EditorEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(missed = n, "event subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next event if one is already queued.
    pub fn try_next(&mut self) -> Option<EditorEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(missed = n, "event subscriber lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}
