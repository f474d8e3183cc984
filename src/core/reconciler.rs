use crate::core::ledger::SwipeLedger;
use crate::models::{Gender, MatchEvent, NameEntry, SessionIdentity, SwipeDecision, SwipeTicket};
use crate::services::RemoteSync;
use serde::Serialize;
use std::collections::HashMap;

/// Remote verdict for one like action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchVerdict {
    /// At least two household members now like the name
    Mutual,
    NotMutual,
    /// The remote side never agreed; no match may be raised
    Unconfirmed,
}

/// Persist a like remotely and determine whether it completed a match
///
/// Uses the match flag reported by `record_decision` when present and falls back
/// to the authoritative `check_mutual_like` otherwise. Remote failures are
/// logged and collapse to [`MatchVerdict::Unconfirmed`].
pub async fn confirm_like<R: RemoteSync>(
    remote: &R,
    identity: &SessionIdentity,
    entry: &NameEntry,
) -> MatchVerdict {
    let outcome = match remote
        .record_decision(
            &identity.household_id,
            &identity.user_id,
            &entry.name,
            entry.gender,
            SwipeDecision::Like,
        )
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!("Failed to sync like for {}: {}", entry.name, e);
            return MatchVerdict::Unconfirmed;
        }
    };

    let mutual = match outcome.is_mutual_like {
        Some(mutual) => mutual,
        None => match remote
            .check_mutual_like(&identity.household_id, &entry.name, &identity.user_id)
            .await
        {
            Ok(mutual) => mutual,
            Err(e) => {
                tracing::warn!("Match check failed for {}: {}", entry.name, e);
                return MatchVerdict::Unconfirmed;
            }
        },
    };

    if mutual {
        MatchVerdict::Mutual
    } else {
        MatchVerdict::NotMutual
    }
}

#[derive(Debug, Clone)]
struct PendingLike {
    seq: u64,
    name: String,
    gender: Gender,
}

/// Counters for observability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilerStats {
    pub raised: u64,
    pub stale_dropped: u64,
    pub discarded: u64,
}

/// Tracks likes awaiting remote confirmation
///
/// At most one like per name is tracked, keyed by lowercase name and tagged
/// with the ledger sequence that issued it. Resolving consumes the entry, so a
/// second response for the same action finds nothing and is dropped.
#[derive(Debug, Default)]
pub struct MatchReconciler {
    pending: HashMap<String, PendingLike>,
    stats: ReconcilerStats,
}

impl MatchReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a like; replaces any older like on the same name
    pub fn track(&mut self, ticket: &SwipeTicket, entry: &NameEntry) {
        let previous = self.pending.insert(
            ticket.key.clone(),
            PendingLike {
                seq: ticket.seq,
                name: entry.name.clone(),
                gender: entry.gender,
            },
        );
        if previous.is_some() {
            self.stats.discarded += 1;
        }
    }

    /// Forget the in-flight like for `key`, e.g. after undo
    pub fn discard(&mut self, key: &str) -> bool {
        let removed = self.pending.remove(key).is_some();
        if removed {
            self.stats.discarded += 1;
        }
        removed
    }

    /// Apply a remote verdict
    ///
    /// Returns the event to publish, if any. Responses whose ticket is no longer
    /// tracked, whose sequence was superseded, or which the ledger no longer
    /// considers current are dropped.
    pub fn resolve(
        &mut self,
        ticket: &SwipeTicket,
        verdict: MatchVerdict,
        ledger: &SwipeLedger,
    ) -> Option<MatchEvent> {
        let Some(pending) = self.pending.get(&ticket.key) else {
            tracing::debug!("Dropping response for untracked like on {}", ticket.key);
            self.stats.stale_dropped += 1;
            return None;
        };

        if pending.seq != ticket.seq {
            tracing::debug!(
                "Dropping stale response for {} (seq {} != {})",
                ticket.key,
                ticket.seq,
                pending.seq
            );
            self.stats.stale_dropped += 1;
            return None;
        }

        let pending = self.pending.remove(&ticket.key)?;

        if !ledger.is_current(ticket) {
            tracing::debug!("Dropping response for {}: ledger moved on", ticket.key);
            self.stats.stale_dropped += 1;
            return None;
        }

        match verdict {
            MatchVerdict::Mutual => {
                self.stats.raised += 1;
                tracing::info!("Match confirmed: {}", pending.name);
                Some(MatchEvent {
                    name: pending.name,
                    gender: pending.gender,
                    seq: pending.seq,
                    detected_at: chrono::Utc::now(),
                })
            }
            MatchVerdict::NotMutual | MatchVerdict::Unconfirmed => None,
        }
    }

    /// Drop all in-flight likes; returns how many were dropped
    pub fn clear(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        self.stats.discarded += count as u64;
        count
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> ReconcilerStats {
        self.stats
    }
}
