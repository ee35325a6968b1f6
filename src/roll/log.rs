//! Roll log - the append-only history of finished rolls

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dice::RollOutcome;

/// Capacity of the "entry appended" feed
const FEED_CAPACITY: usize = 64;

/// A finished roll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollLogEntry {
    pub id: Uuid,
    pub actor: String,
    /// Notation exactly as it was typed
    pub notation: String,
    pub outcome: RollOutcome,
    pub completed_at: DateTime<Utc>,
}

impl fmt::Display for RollLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw: Vec<String> = self.outcome.dice.iter().map(|d| d.raw.to_string()).collect();
        write!(
            f,
            "{} rolled {} and got {} (Dice Results: {})",
            self.actor,
            self.notation,
            self.outcome.aggregate,
            raw.join(", ")
        )
    }
}

/// Shared, append-only roll history
///
/// Clones are read handles onto the same history. Only the coordinator
/// appends.
#[derive(Clone)]
pub struct RollLog {
    entries: Arc<RwLock<Vec<RollLogEntry>>>,
    feed: broadcast::Sender<RollLogEntry>,
}

impl Default for RollLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RollLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollLog").field("len", &self.len()).finish()
    }
}

impl RollLog {
    /// Create an empty log
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            feed,
        }
    }

    pub(crate) fn append(&self, entry: RollLogEntry) {
        self.entries.write().push(entry.clone());
        // No subscribers is fine
        let _ = self.feed.send(entry);
    }

    /// Copy of all entries, oldest first
    pub fn entries(&self) -> Vec<RollLogEntry> {
        self.entries.read().clone()
    }

    /// Most recent entry
    pub fn last(&self) -> Option<RollLogEntry> {
        self.entries.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Receive each entry as it is appended
    ///
    /// Slow receivers may lag and miss entries; `entries()` stays complete.
    pub fn subscribe(&self) -> broadcast::Receiver<RollLogEntry> {
        self.feed.subscribe()
    }
}
