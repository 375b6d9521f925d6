use crate::clock::TimeTicket;
use crate::error::CrdtResult;
use crate::rga::Rga;

/// Ordered list with moves (spec §3, §4.D — CRDTArray). Holds only
/// tickets referencing children owned by the enclosing `CRDTRoot`'s
/// element arena; `Rga` provides the RGA-like ordering.
#[derive(Debug, Clone)]
pub struct CRDTArray {
    seq: Rga,
}

impl CRDTArray {
    pub fn new() -> Self {
        CRDTArray { seq: Rga::new() }
    }

    /// Ticket identifying the head position — pass to `insert_after` to
    /// insert as the first element.
    pub fn head() -> TimeTicket {
        TimeTicket::initial()
    }

    pub fn insert_after(&mut self, prev_id: &TimeTicket, created_at: TimeTicket, executed_at: TimeTicket) -> CrdtResult<()> {
        self.seq.insert_after(prev_id, created_at, executed_at)
    }

    pub fn move_after(&mut self, prev_id: &TimeTicket, target_id: &TimeTicket, executed_at: TimeTicket) -> CrdtResult<bool> {
        self.seq.move_after(prev_id, target_id, executed_at)
    }

    pub fn remove(&mut self, target_id: &TimeTicket, executed_at: TimeTicket) -> CrdtResult<bool> {
        self.seq.remove(target_id, executed_at)
    }

    pub fn get_by_index(&self, index: usize) -> Option<TimeTicket> {
        self.seq.get_by_index(index)
    }

    pub fn iter_live(&self) -> impl Iterator<Item = &TimeTicket> {
        self.seq.iter_live()
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physically unlinks `child` (spec §4.H GC). The element itself is
    /// removed from the root's arena by the caller.
    pub fn purge(&mut self, child: &TimeTicket) {
        self.seq.purge(child);
    }
}

impl Default for CRDTArray {
    fn default() -> Self { Self::new() }
}
