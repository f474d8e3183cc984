// Route exports
pub mod likes;
pub mod matches;
pub mod swipes;

use crate::core::{CatalogIndex, SwipeSession};
use crate::models::MatchEvent;
use crate::services::{ExclusionStore, RemoteSync};
use actix_web::web;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Bounded queue of matches waiting to be polled by the UI
#[derive(Debug)]
pub struct MatchInbox {
    events: Mutex<VecDeque<MatchEvent>>,
    capacity: usize,
}

impl MatchInbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Queue an event, dropping the oldest when full
    pub fn push(&self, event: MatchEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        if events.len() == self.capacity {
            if let Some(dropped) = events.pop_front() {
                tracing::warn!("Match inbox full, dropping {}", dropped.name);
            }
        }
        events.push_back(event);
    }

    pub fn drain(&self) -> Vec<MatchEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Application state shared across all handlers
pub struct AppState<R, S> {
    pub session: Arc<SwipeSession<R, S>>,
    pub catalog: Arc<CatalogIndex>,
    pub remote: Arc<R>,
    pub inbox: Arc<MatchInbox>,
}

impl<R, S> Clone for AppState<R, S> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            catalog: Arc::clone(&self.catalog),
            remote: Arc::clone(&self.remote),
            inbox: Arc::clone(&self.inbox),
        }
    }
}

impl<R: RemoteSync, S: ExclusionStore> AppState<R, S> {
    /// Wire the session's match events into a fresh inbox
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        session: Arc<SwipeSession<R, S>>,
        catalog: Arc<CatalogIndex>,
        remote: Arc<R>,
        inbox_capacity: usize,
    ) -> Self {
        let inbox = Arc::new(MatchInbox::new(inbox_capacity));

        let sink = Arc::clone(&inbox);
        session.on_match(move |event| sink.push(event.clone()));

        Self {
            session,
            catalog,
            remote,
            inbox,
        }
    }
}

pub fn configure_routes<R: RemoteSync, S: ExclusionStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(swipes::configure::<R, S>)
            .configure(likes::configure::<R, S>)
            .configure(matches::configure::<R, S>),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    fn create_event(name: &str, seq: u64) -> MatchEvent {
        MatchEvent {
            name: name.to_string(),
            gender: Gender::Neutral,
            seq,
            detected_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_inbox_drops_oldest_when_full() {
        let inbox = MatchInbox::new(2);
        inbox.push(create_event("Luna", 1));
        inbox.push(create_event("Rex", 2));
        inbox.push(create_event("Storm", 3));

        let drained: Vec<String> = inbox.drain().into_iter().map(|e| e.name).collect();
        assert_eq!(drained, vec!["Rex", "Storm"]);
        assert!(inbox.is_empty());
    }
}
