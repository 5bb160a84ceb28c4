//! In-process publish/subscribe bus connecting panel requests to the host.
//!
//! Dispatch is synchronous. Handlers run against a snapshot of the listeners
//! registered when `publish` was called, and the registry lock is released
//! before any handler runs, so a handler may publish, subscribe, or
//! unsubscribe. A handler unsubscribed while a dispatch is in progress is
//! skipped for the rest of that dispatch.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::trace;

use crate::sync::lock;
use crate::types::PaperId;

/// Requests published by paper lists and other surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopilotEvent {
    OpenSynthesis {
        paper_ids: Vec<PaperId>,
    },
    OpenAssessment {
        paper_id: PaperId,
        paper_title: Option<String>,
    },
}

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listener<E> {
    id: u64,
    active: Arc<AtomicBool>,
    handler: Handler<E>,
}

struct Registry<E> {
    listeners: Mutex<Vec<Listener<E>>>,
    next_id: AtomicU64,
}

/// Cloneable handle to a shared listener registry.
pub struct EventBus<E> {
    registry: Arc<Registry<E>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Registry {
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }
}

impl<E: 'static> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<E: 'static> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`. It stays registered until the returned
    /// subscription is explicitly unsubscribed.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        lock(&self.registry.listeners).push(Listener {
            id,
            active: active.clone(),
            handler: Arc::new(handler),
        });
        trace!(listener = id, "Subscribed");

        let registry: Weak<Registry<E>> = Arc::downgrade(&self.registry);
        Subscription {
            id,
            active,
            detach: Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    lock(&registry.listeners).retain(|l| l.id != id);
                }
            }),
        }
    }

    /// Deliver `event` to every current listener in registration order.
    /// Returns how many handlers ran.
    pub fn publish(&self, event: &E) -> usize {
        let snapshot: Vec<(Arc<AtomicBool>, Handler<E>)> = lock(&self.registry.listeners)
            .iter()
            .map(|l| (l.active.clone(), l.handler.clone()))
            .collect();

        let mut delivered = 0;
        for (active, handler) in snapshot {
            if active.load(Ordering::Acquire) {
                handler(event);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.registry.listeners).len()
    }
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Dropping it leaves the handler registered.
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    detach: Box<dyn FnOnce() + Send + Sync>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn unsubscribe(self) {
        self.active.store(false, Ordering::Release);
        (self.detach)();
        trace!(listener = self.id, "Unsubscribed");
    }
}
