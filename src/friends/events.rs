//! Deferred friend events for external observers.
//!
//! Mutations push a [`FriendEvent`] onto an unbounded FIFO queue and return.
//! The [`EventDispatcher`] owns the receiving end and delivers events to
//! observers later, either one tick at a time ([`EventDispatcher::dispatch_pending`])
//! or from a tokio task ([`EventDispatcher::run`]). Observers therefore never run
//! inside the mutation that produced the event, and may call back into the
//! friend graph freely.

use log::{debug, trace};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::friends::directory::Participant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FriendEvent {
    Added { owner: Participant, friend: Participant },
    Removed { owner: Participant, friend: Participant },
}

impl FriendEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FriendEvent::Added { .. } => "FriendAdded",
            FriendEvent::Removed { .. } => "FriendRemoved",
        }
    }

    pub fn owner(&self) -> &Participant {
        match self {
            FriendEvent::Added { owner, .. } | FriendEvent::Removed { owner, .. } => owner,
        }
    }

    pub fn friend(&self) -> &Participant {
        match self {
            FriendEvent::Added { friend, .. } | FriendEvent::Removed { friend, .. } => friend,
        }
    }
}

pub trait FriendObserver: Send + Sync {
    fn on_event(&self, event: &FriendEvent);
}

/// Sending half held by the friends service.
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<FriendEvent>,
}

impl EventQueue {
    /// A queue whose dispatcher has already gone away; every event is dropped.
    pub fn detached() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    pub fn enqueue(&self, event: FriendEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            debug!("No event dispatcher attached; dropping {}", name);
        }
    }
}

pub struct EventDispatcher {
    rx: mpsc::UnboundedReceiver<FriendEvent>,
    observers: Vec<Arc<dyn FriendObserver>>,
}

pub fn event_channel() -> (EventQueue, EventDispatcher) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventQueue { tx },
        EventDispatcher {
            rx,
            observers: Vec::new(),
        },
    )
}

impl EventDispatcher {
    pub fn subscribe(&mut self, observer: Arc<dyn FriendObserver>) {
        self.observers.push(observer);
    }

    /// Deliver everything queued before this call. Events enqueued by observers
    /// while this tick runs wait for the next tick.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut batch = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            batch.push(event);
        }
        for event in &batch {
            self.deliver(event);
        }
        batch.len()
    }

    /// Deliver events until every [`EventQueue`] clone has been dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            self.deliver(&event);
            tokio::task::yield_now().await;
        }
        debug!("Friend event queue closed");
    }

    fn deliver(&self, event: &FriendEvent) {
        trace!(
            "Dispatching {} ({} -> {}) to {} observers",
            event.name(),
            event.owner().id,
            event.friend().id,
            self.observers.len()
        );
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
