use crate::core::catalog::CatalogIndex;
use crate::core::filters::{filter_names, spec_from_facets};
use crate::core::ledger::SwipeLedger;
use crate::core::reconciler::{confirm_like, MatchReconciler, MatchVerdict, ReconcilerStats};
use crate::models::{
    Facets, LocalSwipeRecord, MatchEvent, NameEntry, SessionIdentity, SwipeDecision, SwipeTicket,
};
use crate::services::store::{
    encode_exclusions, encode_likes, load_exclusions, load_likes, LIKED_NAMES_KEY, SWIPED_NAMES_KEY,
};
use crate::services::{ExclusionStore, RemoteSync};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use uuid::Uuid;

/// Buffered match events per subscriber before it starts lagging
pub const MATCH_CHANNEL_CAPACITY: usize = 64;

type LaneSlot = (Option<oneshot::Receiver<()>>, oneshot::Sender<()>);

/// Orders remote writes for the same name in local action order
///
/// Each remote operation waits for the previous one on its name, so an undo's
/// delete can never overtake the like it reverts.
#[derive(Debug, Default)]
struct RemoteLanes {
    tails: HashMap<String, oneshot::Receiver<()>>,
}

impl RemoteLanes {
    fn enter(&mut self, key: &str) -> LaneSlot {
        self.tails
            .retain(|_, rx| matches!(rx.try_recv(), Err(oneshot::error::TryRecvError::Empty)));

        let (tx, rx) = oneshot::channel();
        let previous = self.tails.insert(key.to_string(), rx);
        (previous, tx)
    }

    fn clear(&mut self) {
        self.tails.clear();
    }
}

struct SessionState {
    ledger: SwipeLedger,
    reconciler: MatchReconciler,
    stack: VecDeque<NameEntry>,
    facets: Facets,
    lanes: RemoteLanes,
    ended: bool,
}

fn lock_state(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn report_task(finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        if e.is_panic() {
            tracing::error!("Remote sync task panicked: {}", e);
        }
    }
}

async fn wait_until_ended(ended: &mut watch::Receiver<bool>) {
    let _ = ended.wait_for(|ended| *ended).await;
}

/// Apply a remote verdict for `ticket` and publish the match it produced
///
/// Safe to call more than once per ticket: the first call consumes the
/// pending like, later ones are dropped as stale.
fn deliver(
    state: &Mutex<SessionState>,
    events: &broadcast::Sender<MatchEvent>,
    ticket: &SwipeTicket,
    verdict: MatchVerdict,
) -> bool {
    let mut guard = lock_state(state);
    let state = &mut *guard;
    if state.ended {
        return false;
    }

    let event = state.reconciler.resolve(ticket, verdict, &state.ledger);
    state.ledger.release(ticket);

    match event {
        Some(event) => {
            let name = event.name.clone();
            if events.send(event).is_err() {
                tracing::debug!("Match for {} had no subscribers", name);
            }
            true
        }
        None => false,
    }
}

/// Write the latest exclusion set and likes list through the store
///
/// The snapshot is taken after acquiring the persist lock, so the last write
/// always reflects the newest ledger state.
async fn persist_local<S: ExclusionStore>(
    store: &S,
    state: &Mutex<SessionState>,
    persist_lock: &tokio::sync::Mutex<()>,
) {
    let _guard = persist_lock.lock().await;

    let (excluded, liked) = {
        let state = lock_state(state);
        if state.ended {
            return;
        }
        (
            state.ledger.exclusion_snapshot(),
            state.ledger.liked_names().to_vec(),
        )
    };

    let result = match encode_exclusions(&excluded) {
        Ok(value) => store.save(SWIPED_NAMES_KEY, value).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::warn!("Failed to persist swiped names: {}", e);
    }

    let result = match encode_likes(&liked) {
        Ok(value) => store.save(LIKED_NAMES_KEY, value).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::warn!("Failed to persist local likes: {}", e);
    }
}

/// Snapshot of session counters
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub stack: usize,
    pub excluded: usize,
    pub liked: usize,
    pub in_flight: usize,
    pub open_tickets: usize,
    pub ended: bool,
    pub reconciler: ReconcilerStats,
}

/// One user's swiping session within a household
///
/// Local effects of `like`, `dismiss` and `undo` happen synchronously under the
/// session lock before the call returns. Everything a swipe starts after that
/// (remote sync and persistence) runs in tasks owned by the session, so it
/// completes even if the caller stops waiting, and is aborted when the session
/// ends.
pub struct SwipeSession<R, S> {
    id: Uuid,
    catalog: Arc<CatalogIndex>,
    remote: Arc<R>,
    store: Arc<S>,
    identity: Option<SessionIdentity>,
    stack_size: usize,
    state: Arc<Mutex<SessionState>>,
    tasks: Mutex<JoinSet<()>>,
    persist_lock: Arc<tokio::sync::Mutex<()>>,
    events: broadcast::Sender<MatchEvent>,
    ended_signal: watch::Sender<bool>,
}

impl<R: RemoteSync, S: ExclusionStore> SwipeSession<R, S> {
    /// Restore local history and build the first stack
    pub async fn start(
        catalog: Arc<CatalogIndex>,
        remote: Arc<R>,
        store: Arc<S>,
        identity: Option<SessionIdentity>,
        facets: Facets,
        stack_size: usize,
    ) -> Self {
        let excluded = load_exclusions(store.as_ref()).await;
        let liked = load_likes(store.as_ref()).await;

        if identity.is_none() {
            tracing::warn!("No household identity configured, swipes will stay local");
        }

        let (events, _) = broadcast::channel(MATCH_CHANNEL_CAPACITY);
        let (ended_signal, _) = watch::channel(false);
        let session = Self {
            id: Uuid::new_v4(),
            catalog,
            remote,
            store,
            identity,
            stack_size: if stack_size == 0 { usize::MAX } else { stack_size },
            state: Arc::new(Mutex::new(SessionState {
                ledger: SwipeLedger::from_exclusions(&excluded).with_likes(&liked),
                reconciler: MatchReconciler::new(),
                stack: VecDeque::new(),
                facets,
                lanes: RemoteLanes::default(),
                ended: false,
            })),
            tasks: Mutex::new(JoinSet::new()),
            persist_lock: Arc::new(tokio::sync::Mutex::new(())),
            events,
            ended_signal,
        };

        let stack = session.reload();
        tracing::info!(
            "Session {} started: {} names stacked, {} previously swiped, {} liked",
            session.id,
            stack,
            excluded.len(),
            liked.len()
        );

        session
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        lock_state(&self.state)
    }

    fn rebuild_stack(&self, state: &mut SessionState) {
        let spec = spec_from_facets(&state.facets, state.ledger.exclusion_set());
        state.stack = filter_names(&self.catalog, &spec, self.stack_size).into();
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.lock().ended {
            return;
        }

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        while let Some(finished) = tasks.try_join_next() {
            report_task(finished);
        }
        tasks.spawn(task);
    }

    /// Persist local history in a session-owned task and wait for it
    ///
    /// Dropping the returned future does not cancel the write.
    async fn persist(&self) {
        let (tx, rx) = oneshot::channel();
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let persist_lock = Arc::clone(&self.persist_lock);

        self.spawn(async move {
            persist_local(store.as_ref(), &state, &persist_lock).await;
            let _ = tx.send(());
        });

        let _ = rx.await;
    }

    /// Names in presentation order, top card first
    pub fn current_stack(&self) -> Vec<NameEntry> {
        self.lock().stack.iter().cloned().collect()
    }

    pub fn top(&self) -> Option<NameEntry> {
        self.lock().stack.front().cloned()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    pub fn facets(&self) -> Facets {
        self.lock().facets.clone()
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.lock().ledger.is_excluded(name)
    }

    /// Names liked on this device, oldest first
    pub fn local_likes(&self) -> Vec<String> {
        self.lock().ledger.liked_names().to_vec()
    }

    pub fn is_ended(&self) -> bool {
        self.lock().ended
    }

    /// Number of likes still waiting for a remote verdict
    pub fn in_flight(&self) -> usize {
        self.lock().reconciler.in_flight()
    }

    pub fn stats(&self) -> SessionStats {
        let state = self.lock();
        SessionStats {
            stack: state.stack.len(),
            excluded: state.ledger.len(),
            liked: state.ledger.liked_names().len(),
            in_flight: state.reconciler.in_flight(),
            open_tickets: state.ledger.open_tickets(),
            ended: state.ended,
            reconciler: state.reconciler.stats(),
        }
    }

    /// Receive every match raised from now on
    pub fn subscribe(&self) -> broadcast::Receiver<MatchEvent> {
        self.events.subscribe()
    }

    /// Invoke `callback` for each match until the session is dropped
    pub fn on_match<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: Fn(&MatchEvent) + Send + 'static,
    {
        let mut rx = self.events.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => callback(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Match listener lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Recompute the stack from the catalog; returns its new size
    pub fn reload(&self) -> usize {
        let mut state = self.lock();
        if state.ended {
            return 0;
        }
        self.rebuild_stack(&mut state);
        state.stack.len()
    }

    /// Replace the facet selection and rebuild the stack
    pub fn apply_facets(&self, facets: Facets) -> usize {
        let mut state = self.lock();
        if state.ended {
            return 0;
        }
        tracing::info!("Applying facets: {:?}", facets);
        state.facets = facets;
        self.rebuild_stack(&mut state);
        state.stack.len()
    }

    /// Pop the top card and record `decision` locally
    ///
    /// Only a tracked like keeps its ticket open; it is released once the
    /// remote verdict has been applied.
    fn take_top(&self, decision: SwipeDecision) -> Option<(NameEntry, SwipeTicket, Option<LaneSlot>)> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.ended {
            return None;
        }

        let entry = state.stack.pop_front()?;
        let ticket = state.ledger.record_swipe(&entry.name, decision);

        let lane = if self.identity.is_some() {
            if decision == SwipeDecision::Like {
                state.reconciler.track(&ticket, &entry);
            } else {
                state.ledger.release(&ticket);
            }
            Some(state.lanes.enter(&ticket.key))
        } else {
            state.ledger.release(&ticket);
            None
        };

        if state.stack.is_empty() {
            self.rebuild_stack(state);
        }

        Some((entry, ticket, lane))
    }

    /// Like the top card
    ///
    /// Returns the liked entry, or `None` when there is nothing to swipe. The
    /// card leaves the stack immediately; a match, if any, arrives later through
    /// [`subscribe`](Self::subscribe).
    pub async fn like(&self) -> Option<NameEntry> {
        let (entry, ticket, lane) = self.take_top(SwipeDecision::Like)?;
        tracing::info!("Liked {}", entry.name);

        if let (Some(identity), Some((previous, done))) = (self.identity.clone(), lane) {
            let remote = Arc::clone(&self.remote);
            let state = Arc::clone(&self.state);
            let events = self.events.clone();
            let liked = entry.clone();

            self.spawn(async move {
                if let Some(previous) = previous {
                    let _ = previous.await;
                }

                let verdict = confirm_like(remote.as_ref(), &identity, &liked).await;
                deliver(&state, &events, &ticket, verdict);

                let _ = done.send(());
            });
        }

        self.persist().await;
        Some(entry)
    }

    /// Dismiss the top card
    pub async fn dismiss(&self) -> Option<NameEntry> {
        let (entry, _ticket, lane) = self.take_top(SwipeDecision::Dismiss)?;
        tracing::info!("Dismissed {}", entry.name);

        if let (Some(identity), Some((previous, done))) = (self.identity.clone(), lane) {
            let remote = Arc::clone(&self.remote);
            let dismissed = entry.clone();

            self.spawn(async move {
                if let Some(previous) = previous {
                    let _ = previous.await;
                }

                if let Err(e) = remote
                    .record_decision(
                        &identity.household_id,
                        &identity.user_id,
                        &dismissed.name,
                        dismissed.gender,
                        SwipeDecision::Dismiss,
                    )
                    .await
                {
                    tracing::warn!("Failed to sync dismiss for {}: {}", dismissed.name, e);
                }

                let _ = done.send(());
            });
        }

        self.persist().await;
        Some(entry)
    }

    /// Revert the most recent swipe and put its card back on top
    ///
    /// Any pending match determination for that like is discarded, and an
    /// undone like leaves the local likes list.
    pub async fn undo(&self) -> Option<LocalSwipeRecord> {
        let (record, lane) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            if state.ended {
                return None;
            }

            let record = state.ledger.undo()?;
            let key = record.name.to_lowercase();
            state.reconciler.discard(&key);

            if let Some(entry) = self.catalog.entry(&record.name) {
                if !state.stack.iter().any(|e| e.key() == key) {
                    state.stack.push_front(entry.clone());
                }
            }

            let lane = self.identity.as_ref().map(|_| state.lanes.enter(&key));
            (record, lane)
        };

        tracing::info!("Undid {} of {}", record.decision, record.name);

        if let (Some(identity), Some((previous, done))) = (self.identity.clone(), lane) {
            let remote = Arc::clone(&self.remote);
            let name = record.name.clone();

            self.spawn(async move {
                if let Some(previous) = previous {
                    let _ = previous.await;
                }

                if let Err(e) = remote
                    .delete_decision(&identity.household_id, &identity.user_id, &name)
                    .await
                {
                    tracing::warn!("Failed to sync undo for {}: {}", name, e);
                }

                let _ = done.send(());
            });
        }

        self.persist().await;
        Some(record)
    }

    /// Forget all local swipe history and restack every candidate
    ///
    /// Remote decisions are left untouched.
    pub async fn reset_history(&self) -> usize {
        let stack = {
            let mut guard = self.lock();
            let state = &mut *guard;
            if state.ended {
                return 0;
            }
            state.ledger.clear();
            state.reconciler.clear();
            self.rebuild_stack(state);
            state.stack.len()
        };

        let _guard = self.persist_lock.lock().await;
        for key in [SWIPED_NAMES_KEY, LIKED_NAMES_KEY] {
            if let Err(e) = self.store.clear(key).await {
                tracing::warn!("Failed to clear {}: {}", key, e);
            }
        }

        tracing::info!("Swipe history reset, {} names stacked", stack);
        stack
    }

    /// End the session: abort remote work and drop every pending match
    pub fn end(&self) {
        {
            let mut state = self.lock();
            if state.ended {
                return;
            }
            state.ended = true;
            let dropped = state.reconciler.clear();
            state.lanes.clear();
            state.stack.clear();
            tracing::info!("Session {} ended, {} pending matches dropped", self.id, dropped);
        }

        self.ended_signal.send_replace(true);
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .abort_all();
    }

    /// Wait until all work issued so far has finished
    ///
    /// If the session ends meanwhile, the tasks being waited on are aborted
    /// too and this returns once they are gone.
    pub async fn settle(&self) {
        let mut ended = self.ended_signal.subscribe();

        loop {
            let mut tasks = {
                let mut guard = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
                std::mem::replace(&mut *guard, JoinSet::new())
            };

            if tasks.is_empty() {
                return;
            }

            let mut aborted = false;
            loop {
                tokio::select! {
                    finished = tasks.join_next() => match finished {
                        Some(finished) => report_task(finished),
                        None => break,
                    },
                    _ = wait_until_ended(&mut ended), if !aborted => {
                        tasks.abort_all();
                        aborted = true;
                    }
                }
            }
        }
    }
}

impl<R, S> Drop for SwipeSession<R, S> {
    fn drop(&mut self) {
        lock_state(&self.state).ended = true;
        self.ended_signal.send_replace(true);
    }
}
