use crate::models::{LocalSwipeRecord, SwipeDecision, SwipeTicket};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Local record of swiped names
///
/// Holds the persistent exclusion set (lowercase names ever swiped), the
/// user's own likes in the order they were made, the single undoable record,
/// and the current action sequence per name with an outstanding ticket.
/// Sequences come from one ledger-wide counter, so they only ever increase for
/// a given name.
#[derive(Debug, Default)]
pub struct SwipeLedger {
    excluded: HashSet<String>,
    liked: Vec<String>,
    last: Option<LocalSwipeRecord>,
    current_seq: HashMap<String, u64>,
    next_seq: u64,
}

impl SwipeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from a persisted exclusion set
    pub fn from_exclusions<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            excluded: names.into_iter().map(|n| n.as_ref().to_lowercase()).collect(),
            ..Self::default()
        }
    }

    /// Attach a persisted likes list; duplicates are dropped case-insensitively
    pub fn with_likes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.add_like(name.as_ref());
        }
        self
    }

    fn add_like(&mut self, name: &str) {
        let key = name.to_lowercase();
        if !self.liked.iter().any(|n| n.to_lowercase() == key) {
            self.liked.push(name.to_string());
        }
    }

    /// Record a decision and make it the undoable one
    ///
    /// Re-recording an already excluded name leaves the set unchanged but still
    /// moves the undo slot and issues a fresh sequence.
    pub fn record_swipe(&mut self, name: &str, decision: SwipeDecision) -> SwipeTicket {
        let key = name.to_lowercase();
        self.next_seq += 1;
        let seq = self.next_seq;

        self.excluded.insert(key.clone());
        self.current_seq.insert(key.clone(), seq);
        if decision == SwipeDecision::Like {
            self.add_like(name);
        }
        self.last = Some(LocalSwipeRecord {
            name: name.to_string(),
            decision,
            seq,
        });

        SwipeTicket { key, seq }
    }

    /// Revert the most recent swipe, if any
    pub fn undo(&mut self) -> Option<LocalSwipeRecord> {
        let record = self.last.take()?;
        let key = record.name.to_lowercase();
        self.excluded.remove(&key);
        self.current_seq.remove(&key);
        if record.decision == SwipeDecision::Like {
            self.liked.retain(|n| n.to_lowercase() != key);
        }
        Some(record)
    }

    /// Retire a ticket once nothing waits on it
    ///
    /// Only drops the entry while it still carries this ticket's sequence; a
    /// newer action on the same name keeps its own.
    pub fn release(&mut self, ticket: &SwipeTicket) -> bool {
        if self.is_current(ticket) {
            self.current_seq.remove(&ticket.key);
            true
        } else {
            false
        }
    }

    /// Number of names with an unreleased ticket
    pub fn open_tickets(&self) -> usize {
        self.current_seq.len()
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(&name.to_lowercase())
    }

    /// Names the user liked, oldest first
    pub fn liked_names(&self) -> &[String] {
        &self.liked
    }

    pub fn exclusion_set(&self) -> &HashSet<String> {
        &self.excluded
    }

    /// Sorted copy of the exclusion set, for persistence
    pub fn exclusion_snapshot(&self) -> BTreeSet<String> {
        self.excluded.iter().cloned().collect()
    }

    /// Whether the ticket still describes the latest action on its name
    pub fn is_current(&self, ticket: &SwipeTicket) -> bool {
        self.current_seq.get(&ticket.key) == Some(&ticket.seq)
    }

    pub fn undoable(&self) -> Option<&LocalSwipeRecord> {
        self.last.as_ref()
    }

    pub fn len(&self) -> usize {
        self.excluded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }

    /// Forget all history. Outstanding tickets stop being current.
    pub fn clear(&mut self) {
        self.excluded.clear();
        self.liked.clear();
        self.current_seq.clear();
        self.last = None;
    }
}
