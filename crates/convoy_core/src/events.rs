use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;

/// Notifications published by packagers, copiers and pipelines
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
  /// Cached output was discarded and will be rebuilt on the next request
  Invalidate,
  Info(String),
  Warn(String),
  Error(String),
}

impl Event {
  /// The same event with `prefix` in front of its message
  pub fn prefixed(self, prefix: &str) -> Self {
    match self {
      Event::Invalidate => Event::Invalidate,
      Event::Info(message) => Event::Info(format!("{prefix}: {message}")),
      Event::Warn(message) => Event::Warn(format!("{prefix}: {message}")),
      Event::Error(message) => Event::Error(format!("{prefix}: {message}")),
    }
  }
}

pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Observer registry.
///
/// Handlers run synchronously on the emitting thread, outside of the registry lock, so a handler
/// may subscribe, unsubscribe or emit again.
#[derive(Default)]
pub struct EventEmitter {
  next_id: AtomicU64,
  handlers: RwLock<Vec<(SubscriptionId, EventHandler)>>,
}

impl fmt::Debug for EventEmitter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EventEmitter")
      .field("handlers", &self.handlers.read().len())
      .finish()
  }
}

impl EventEmitter {
  pub fn subscribe(&self, handler: impl Fn(&Event) + Send + Sync + 'static) -> SubscriptionId {
    let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
    self.handlers.write().push((id, Arc::new(handler)));
    id
  }

  pub fn unsubscribe(&self, id: SubscriptionId) {
    self.handlers.write().retain(|(handler_id, _)| *handler_id != id);
  }

  pub fn emit(&self, event: Event) {
    let handlers = self
      .handlers
      .read()
      .iter()
      .map(|(_, handler)| handler.clone())
      .collect::<Vec<_>>();

    for handler in handlers {
      handler(&event);
    }
  }

  pub fn info(&self, message: impl Into<String>) {
    let message = message.into();
    tracing::info!("{message}");
    self.emit(Event::Info(message));
  }

  pub fn warn(&self, message: impl Into<String>) {
    let message = message.into();
    tracing::warn!("{message}");
    self.emit(Event::Warn(message));
  }

  /// Publish an error. Having no subscriber is fine, the error is still logged.
  pub fn error(&self, message: impl Into<String>) {
    let message = message.into();
    tracing::error!("{message}");
    self.emit(Event::Error(message));
  }
}
