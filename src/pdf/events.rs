//! Viewer event channel
//!
//! The viewer publishes [`EngineEvent`]s through an [`EventEmitter`]; the
//! controller owns the [`EventBus`], registers one [`Subscription`] per
//! event kind it cares about and drains queued events on its own thread.
//! Events of a kind nobody is subscribed to are dropped, both when emitted
//! and when drained, so nothing is delivered after `off`.

use std::sync::{Arc, Mutex, PoisonError};

use flume::{Receiver, Sender};

/// Events raised by the viewer
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineEvent {
    /// Document attached, pages laid out
    PagesInit,
    /// All page geometry measured
    PagesLoaded(usize),
    /// Current page changed (1-indexed)
    PageChanging(usize),
    /// Current scale changed
    ScaleChanging(f32),
}

impl EngineEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PagesInit => EventKind::PagesInit,
            Self::PagesLoaded(_) => EventKind::PagesLoaded,
            Self::PageChanging(_) => EventKind::PageChanging,
            Self::ScaleChanging(_) => EventKind::ScaleChanging,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    PagesInit,
    PagesLoaded,
    PageChanging,
    ScaleChanging,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::PagesInit,
        EventKind::PagesLoaded,
        EventKind::PageChanging,
        EventKind::ScaleChanging,
    ];
}

/// Registration handle returned by [`EventBus::on`].
///
/// Not `Clone`: every `on` is paired with exactly one `off`.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a subscription must be passed back to EventBus::off"]
pub struct Subscription {
    id: u64,
    kind: EventKind,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

type Registry = Arc<Mutex<Vec<(u64, EventKind)>>>;

fn is_subscribed(registry: &Registry, kind: EventKind) -> bool {
    registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .any(|(_, k)| *k == kind)
}

/// Sending half handed to the viewer
#[derive(Clone)]
pub struct EventEmitter {
    tx: Sender<EngineEvent>,
    registry: Registry,
}

impl EventEmitter {
    /// Publish an event; a no-op when nobody listens for its kind
    pub fn emit(&self, event: EngineEvent) {
        if is_subscribed(&self.registry, event.kind()) {
            let _ = self.tx.send(event);
        }
    }
}

/// Receiving half plus the subscription list
pub struct EventBus {
    tx: Sender<EngineEvent>,
    rx: Receiver<EngineEvent>,
    registry: Registry,
    next_id: u64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            tx,
            rx,
            registry: Arc::new(Mutex::new(Vec::new())),
            next_id: 1,
        }
    }

    #[must_use]
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            tx: self.tx.clone(),
            registry: self.registry.clone(),
        }
    }

    pub fn on(&mut self, kind: EventKind) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, kind));
        Subscription { id, kind }
    }

    pub fn off(&mut self, subscription: Subscription) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _)| *id != subscription.id);
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Take every queued event whose kind still has a listener
    pub fn drain(&self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            if is_subscribed(&self.registry, event.kind()) {
                events.push(event);
            }
        }
        events
    }
}
