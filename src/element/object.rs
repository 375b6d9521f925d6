use crate::clock::TimeTicket;
use crate::rht::{Rht, SetOutcome};

/// Unordered key→element map (spec §3, §4.D — CRDTObject). Holds only
/// tickets referencing children owned by the enclosing `CRDTRoot`'s
/// element arena; `Rht` resolves last-writer-wins on concurrent `set`s
/// to the same key.
#[derive(Debug, Clone, Default)]
pub struct CRDTObject {
    rht: Rht,
}

impl CRDTObject {
    pub fn new() -> Self {
        CRDTObject { rht: Rht::new() }
    }

    /// Sets `key` to reference `child`. Returns the outcome so the caller
    /// (the root, via `Operation::Set`) can tombstone a superseded child
    /// or immediately tombstone a losing new child.
    pub fn set(&mut self, key: &str, child: TimeTicket, executed_at: TimeTicket) -> SetOutcome {
        self.rht.set(key, child, executed_at)
    }

    pub fn get(&self, key: &str) -> Option<TimeTicket> {
        self.rht.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.rht.has(key)
    }

    /// Tombstones whichever key currently points at `child` (spec §4.G
    /// REMOVE addresses a child by createdAt, not by key). Returns
    /// whether a live entry was found and tombstoned.
    pub fn remove_child(&mut self, child: &TimeTicket, executed_at: TimeTicket) -> bool {
        self.rht.remove_value(child, executed_at)
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (&str, &TimeTicket)> {
        self.rht.iter_live()
    }

    pub fn len(&self) -> usize {
        self.rht.len_live()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physically drops the tombstoned reference to `child` (spec §4.H
    /// GC). The element itself is removed from the root's arena by the
    /// caller.
    pub fn purge(&mut self, child: &TimeTicket) {
        self.rht.purge_child(child);
    }
}
