/*
[INPUT]:  Decoded server messages and user-registered callbacks
[OUTPUT]: Per-tag fan-out with failure isolation
[POS]:    WebSocket layer - inbound message routing
[UPDATE]: When handler semantics or message tags change
*/

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use super::message::{MessageKind, ServerMessage};

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Callback invoked for every message of one kind
pub type Handler = Arc<dyn Fn(&ServerMessage) -> HandlerResult + Send + Sync>;

/// Wrap a closure as a [`Handler`]
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&ServerMessage) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type HandlerTable = HashMap<MessageKind, Vec<(HandlerId, Handler)>>;

/// Concurrency-safe multimap from message kind to handlers
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HandlerTable>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&MessageKind, usize> =
            handlers.iter().map(|(kind, list)| (kind, list.len())).collect();
        f.debug_struct("HandlerRegistry").field("handlers", &counts).finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `handler` under `kind`.
    ///
    /// Registering the same `Arc` twice under one kind returns a token for the
    /// existing entry instead of adding a duplicate.
    pub fn register(self: &Arc<Self>, kind: MessageKind, handler: Handler) -> Registration {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let entries = handlers.entry(kind).or_default();

        let id = match entries
            .iter()
            .find(|(_, existing)| Arc::ptr_eq(existing, &handler))
        {
            Some((id, _)) => *id,
            None => {
                let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
                entries.push((id, handler));
                id
            }
        };

        Registration {
            registry: Arc::downgrade(self),
            kind,
            id,
        }
    }

    fn remove(&self, kind: MessageKind, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            handlers.remove(&kind);
        }
        removed
    }

    pub fn handler_count(&self, kind: MessageKind) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Invoke every handler for the message's kind. Returns how many succeeded.
    ///
    /// Handlers run outside the lock so they may register or deregister.
    pub fn dispatch(&self, message: &ServerMessage) -> usize {
        let Some(kind) = message.kind() else {
            return 0;
        };

        let snapshot: Vec<(HandlerId, Handler)> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        let mut ok = 0;
        for (id, handler) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(message))) {
                Ok(Ok(())) => ok += 1,
                Ok(Err(err)) => {
                    tracing::error!(
                        kind = ?kind,
                        handler = id.0,
                        error = %err,
                        "message handler failed"
                    );
                }
                Err(_) => {
                    tracing::error!(kind = ?kind, handler = id.0, "message handler panicked");
                }
            }
        }
        ok
    }
}

/// Opaque token for one handler registration
#[derive(Debug)]
pub struct Registration {
    registry: Weak<HandlerRegistry>,
    kind: MessageKind,
    id: HandlerId,
}

impl Registration {
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Remove the handler. Returns false if it was already gone.
    pub fn remove(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.kind, self.id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn error_message() -> ServerMessage {
        ServerMessage::Error {
            message: "boom".to_string(),
        }
    }

    fn counting(counter: &Arc<AtomicUsize>) -> Handler {
        let counter = Arc::clone(counter);
        handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn failing_and_panicking_handlers_are_isolated() {
        let registry = HandlerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let _failing = registry.register(MessageKind::Error, handler(|_| Err("nope".into())));
        let _panicking = registry.register(MessageKind::Error, handler(|_| panic!("handler bug")));
        let _counting = registry.register(MessageKind::Error, counting(&counter));

        assert_eq!(registry.dispatch(&error_message()), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removal_is_idempotent_and_scoped_to_token() {
        let registry = HandlerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let first = registry.register(MessageKind::Error, counting(&counter));
        let _second = registry.register(MessageKind::Error, counting(&counter));

        assert!(first.remove());
        assert!(!first.remove());
        assert_eq!(registry.handler_count(MessageKind::Error), 1);

        registry.dispatch(&error_message());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_registration_is_collapsed() {
        let registry = HandlerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let shared = counting(&counter);

        registry.register(MessageKind::Error, Arc::clone(&shared));
        registry.register(MessageKind::Error, shared);

        assert_eq!(registry.handler_count(MessageKind::Error), 1);
    }

    #[test]
    fn pong_is_never_dispatched() {
        let registry = HandlerRegistry::new();
        assert_eq!(registry.dispatch(&ServerMessage::Pong), 0);
    }
}
