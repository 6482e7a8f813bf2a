//! Publish/subscribe with hold-batching
//!
//! Listeners subscribe to one entity (a subgraph or a property). Delivery
//! is immediate by default. While a hold is active, events for entities
//! that have subscribers are queued; identical events collapse into one and
//! the queue is delivered in first-raised order when the outermost hold is
//! released.
//!
//! `EntityDestroyed` is always the last event an entity raises: pending
//! events of that entity are flushed first, the destroy event is delivered
//! immediately even during a hold, and every subscription of the entity is
//! then dropped.

use super::error::{GraphError, GraphResult};
use super::event::{EntityId, Event, EventKind};
use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{trace, warn};

/// Default bound on nested holds
pub const DEFAULT_MAX_HOLD_DEPTH: usize = 64;

/// Handle returned by [`NotificationBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// What a listener wants after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    /// Stop delivering to this listener for this entity
    Unsubscribe,
}

/// Receives events from the entities it subscribed to.
///
/// Listeners are called synchronously and must not mutate the store from
/// inside `on_event`. They should be idempotent: delivery is in order per
/// entity and at least once.
pub trait Listener: Send + Sync {
    fn on_event(&self, event: &Event) -> Disposition;
}

impl<F> Listener for F
where
    F: Fn(&Event) -> Disposition + Send + Sync,
{
    fn on_event(&self, event: &Event) -> Disposition {
        self(event)
    }
}

type Subscription = (ListenerId, Arc<dyn Listener>);

#[derive(Default)]
struct BusState {
    subscribers: FxHashMap<EntityId, Vec<Subscription>>,
    next_listener: u64,
    hold_depth: usize,
    pending: IndexSet<Event>,
}

/// The change notification bus shared by every entity of a store
pub struct NotificationBus {
    state: Mutex<BusState>,
    max_hold_depth: usize,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HOLD_DEPTH)
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("NotificationBus")
            .field("entities", &state.subscribers.len())
            .field("hold_depth", &state.hold_depth)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl NotificationBus {
    pub fn new(max_hold_depth: usize) -> Self {
        NotificationBus {
            state: Mutex::new(BusState::default()),
            max_hold_depth,
        }
    }

    /// Register `listener` for events raised by `entity`
    pub fn subscribe(&self, entity: EntityId, listener: Arc<dyn Listener>) -> ListenerId {
        let mut state = self.state();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state
            .subscribers
            .entry(entity)
            .or_default()
            .push((id, listener));
        id
    }

    /// Returns `false` if `listener` was not subscribed to `entity`
    pub fn unsubscribe(&self, entity: EntityId, listener: ListenerId) -> bool {
        let mut state = self.state();
        Self::remove_listeners(&mut state, entity, &[listener]) > 0
    }

    pub fn has_subscribers(&self, entity: EntityId) -> bool {
        self.subscriber_count(entity) > 0
    }

    pub fn subscriber_count(&self, entity: EntityId) -> usize {
        self.state()
            .subscribers
            .get(&entity)
            .map_or(0, |subs| subs.len())
    }

    /// Raise an event: deliver now, or queue it while held
    pub fn notify(&self, event: Event) {
        {
            let mut state = self.state();
            if !state.subscribers.contains_key(&event.entity) {
                return;
            }
            if state.hold_depth > 0 {
                trace!(entity = %event.entity, kind = ?event.kind, "queued event");
                state.pending.insert(event);
                return;
            }
        }
        self.deliver(&event);
    }

    /// Deliver the final event of `entity` and drop its subscribers
    pub fn destroy(&self, entity: EntityId) {
        let flushed: Vec<Event> = {
            let mut state = self.state();
            if !state.subscribers.contains_key(&entity) {
                return;
            }
            let (mine, rest): (Vec<Event>, Vec<Event>) =
                state.pending.drain(..).partition(|e| e.entity == entity);
            state.pending = rest.into_iter().collect();
            mine
        };
        for event in &flushed {
            self.deliver(event);
        }
        self.deliver(&Event::new(entity, EventKind::EntityDestroyed));
        self.state().subscribers.remove(&entity);
    }

    /// Start (or nest) a hold
    pub fn hold(&self) -> GraphResult<()> {
        let mut state = self.state();
        if state.hold_depth >= self.max_hold_depth {
            return Err(GraphError::invalid(format!(
                "notification holds nested deeper than {}",
                self.max_hold_depth
            )));
        }
        state.hold_depth += 1;
        Ok(())
    }

    /// End a hold; the outermost release delivers every queued event
    pub fn release(&self) -> GraphResult<()> {
        let pending = {
            let mut state = self.state();
            if state.hold_depth == 0 {
                warn!("release called without a matching hold");
                return Err(GraphError::invalid("release without hold"));
            }
            state.hold_depth -= 1;
            if state.hold_depth > 0 {
                return Ok(());
            }
            std::mem::take(&mut state.pending)
        };
        trace!(events = pending.len(), "flushing held notifications");
        for event in &pending {
            self.deliver(event);
        }
        Ok(())
    }

    /// Drop every hold at once and deliver what they queued
    pub fn release_all(&self) {
        let pending = {
            let mut state = self.state();
            if state.hold_depth == 0 {
                return;
            }
            state.hold_depth = 0;
            std::mem::take(&mut state.pending)
        };
        trace!(events = pending.len(), "flushing every notification hold");
        for event in &pending {
            self.deliver(event);
        }
    }

    pub fn is_held(&self) -> bool {
        self.hold_depth() > 0
    }

    pub fn hold_depth(&self) -> usize {
        self.state().hold_depth
    }

    /// Number of events waiting for the outermost release
    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    fn deliver(&self, event: &Event) {
        // Call listeners outside the lock so they may subscribe or unsubscribe
        let listeners: Vec<Subscription> = match self.state().subscribers.get(&event.entity) {
            Some(subs) => subs.clone(),
            None => return,
        };
        let mut leaving = Vec::new();
        for (id, listener) in listeners {
            if listener.on_event(event) == Disposition::Unsubscribe {
                leaving.push(id);
            }
        }
        if !leaving.is_empty() {
            let mut state = self.state();
            Self::remove_listeners(&mut state, event.entity, &leaving);
        }
    }

    fn remove_listeners(state: &mut BusState, entity: EntityId, ids: &[ListenerId]) -> usize {
        let Some(subs) = state.subscribers.get_mut(&entity) else {
            return 0;
        };
        let before = subs.len();
        subs.retain(|(id, _)| !ids.contains(id));
        let removed = before - subs.len();
        if subs.is_empty() {
            state.subscribers.remove(&entity);
        }
        removed
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        // A panicking listener never leaves the state half-updated
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
