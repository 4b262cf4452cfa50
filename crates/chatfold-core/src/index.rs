//! Time-windowed deduplication index for a live chat feed.

use indexmap::IndexMap;

use crate::model::{BadgeHandle, NodeHandle};
use crate::normalize::{normalize, NormalizedKey};

/// Default merge window: repeats of the same normalized text arriving within
/// this span of the previous occurrence collapse into one visible entry.
pub const DEFAULT_WINDOW_MS: u64 = 15_000;

/// Aggregation record for one active normalized key.
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: NormalizedKey,
    /// Occurrences merged since this entry opened; always >= 1.
    pub count: u32,
    /// The first-seen node; stays visible and carries the badge for the
    /// entry's whole lifetime, never swapped.
    pub primary: NodeHandle,
    pub badge: BadgeHandle,
    /// Time of the most recently merged occurrence. Non-decreasing across
    /// merges while the entry lives.
    pub last_seen_ms: i64,
}

/// Decision returned by [`DedupIndex::ingest`] for one incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The incoming node becomes a fresh primary; attach the new badge to it
    /// in a hidden state.
    Promote {
        node: NodeHandle,
        badge: BadgeHandle,
        key: NormalizedKey,
    },
    /// In-window duplicate: hide the incoming node and show `count` on the
    /// existing primary's badge.
    Suppress {
        node: NodeHandle,
        primary: NodeHandle,
        badge: BadgeHandle,
        count: u32,
    },
    /// Normalization produced an empty key; no state change.
    Ignore,
}

/// Mutable deduplication state owned by one chat session.
///
/// Constructed at session start and discarded with it; independent sessions
/// never share state. Holds at most one entry per normalized key; a stale
/// entry is simply overwritten when its key recurs after the window lapses.
pub struct DedupIndex {
    window_ms: i64,
    next_badge: u64,
    entries: IndexMap<NormalizedKey, Entry>,
}

impl DedupIndex {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms: i64::try_from(window_ms).unwrap_or(i64::MAX),
            next_badge: 0,
            entries: IndexMap::new(),
        }
    }

    /// Classify one incoming message, in arrival order.
    ///
    /// The window is measured from the last occurrence, not the first, so a
    /// steady drip of the same message at sub-window intervals stays
    /// collapsed indefinitely. The boundary is exclusive on the merge side:
    /// a gap of exactly the window starts a fresh entry.
    pub fn ingest(&mut self, raw_text: &str, node: NodeHandle, now_ms: i64) -> IngestOutcome {
        let key = normalize(raw_text);
        if key.is_empty() {
            return IngestOutcome::Ignore;
        }

        if let Some(entry) = self.entries.get_mut(&key) {
            if now_ms - entry.last_seen_ms < self.window_ms {
                entry.count += 1;
                entry.last_seen_ms = now_ms;
                return IngestOutcome::Suppress {
                    node,
                    primary: entry.primary,
                    badge: entry.badge,
                    count: entry.count,
                };
            }
        }

        // New key, or the window lapsed. Overwriting abandons the stale
        // entry's primary and badge at their last rendered state; nothing
        // targets them again.
        let badge = self.next_badge();
        self.entries.insert(
            key.clone(),
            Entry {
                key: key.clone(),
                count: 1,
                primary: node,
                badge,
                last_seen_ms: now_ms,
            },
        );
        IngestOutcome::Promote { node, badge, key }
    }

    /// User-initiated reset for a badge's key.
    ///
    /// Removes the entry and returns the badge to hide. An absent key is a
    /// no-op, never a fault; the next ingest of that key always promotes.
    pub fn reset(&mut self, key: &NormalizedKey) -> Option<BadgeHandle> {
        self.entries.shift_remove(key).map(|entry| entry.badge)
    }

    /// Drop entries whose window has lapsed, returning how many went.
    ///
    /// Lapsed entries are dead weight, never read again except by
    /// key-collision overwrite; this sweep only bounds memory on very long
    /// sessions and is not required for correctness.
    pub fn prune_stale(&mut self, now_ms: i64) -> usize {
        let window_ms = self.window_ms;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now_ms - entry.last_seen_ms < window_ms);
        before - self.entries.len()
    }

    pub fn entry(&self, key: &NormalizedKey) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_badge(&mut self) -> BadgeHandle {
        self.next_badge += 1;
        BadgeHandle::new(self.next_badge)
    }
}
