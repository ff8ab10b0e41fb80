//! Settle debounce keyed by file path.
//!
//! A freshly created file is held until it has been quiet for its settle
//! delay. Further write notifications for the same path push the deadline
//! back, so a slow writer is not read half-way.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::classify::Classified;

#[derive(Debug)]
struct Pending {
    item: Classified,
    delay: Duration,
    deadline: Instant,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct Debouncer {
    pending: BTreeMap<PathBuf, Pending>,
    next_seq: u64,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `item` until `now + delay`. Re-scheduling a pending path resets it.
    pub fn schedule(&mut self, item: Classified, delay: Duration, now: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let deadline = now + delay;
        match self.pending.get_mut(&item.path) {
            Some(p) => {
                p.delay = delay;
                p.deadline = deadline;
            }
            None => {
                self.pending.insert(
                    item.path.clone(),
                    Pending {
                        item,
                        delay,
                        deadline,
                        seq,
                    },
                );
            }
        }
    }

    /// Push back the deadline of a pending path. Returns false if not pending.
    pub fn touch(&mut self, path: &Path, now: Instant) -> bool {
        match self.pending.get_mut(path) {
            Some(p) => {
                p.deadline = now + p.delay;
                true
            }
            None => false,
        }
    }

    /// Earliest deadline among pending files.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return every item due at `now`, earliest deadline first
    /// (ties in arrival order).
    pub fn drain_due(&mut self, now: Instant) -> Vec<Classified> {
        let due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();

        let mut out: Vec<Pending> = due
            .iter()
            .filter_map(|path| self.pending.remove(path))
            .collect();
        out.sort_by_key(|p| (p.deadline, p.seq));
        out.into_iter().map(|p| p.item).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
