use std::collections::HashMap;

use crate::clock::TimeTicket;
use crate::error::{CrdtError, CrdtResult};

/// A single slot in the array's node arena. `created_at` is the node's
/// stable identity (also the key under which its value lives in the
/// owning root's element arena); `position_ticket` is
/// `moved_at.unwrap_or(created_at)` and determines where the node
/// currently sits relative to concurrent siblings (spec §4.F).
#[derive(Debug, Clone)]
struct RgaNode {
    created_at: TimeTicket,
    position_ticket: TimeTicket,
    removed_at: Option<TimeTicket>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly-linked list of position tickets backing `CRDTArray` (spec §4.F).
/// Anchored by a head sentinel at `TimeTicket::initial()`. Tombstoned
/// nodes stay linked so concurrent moves can still resolve against them.
#[derive(Debug, Clone)]
pub struct Rga {
    nodes: Vec<RgaNode>,
    // created_at -> node index. Stable for the node's lifetime.
    by_id: HashMap<TimeTicket, usize>,
    head: usize,
}

impl Rga {
    pub fn new() -> Self {
        let head = RgaNode {
            created_at: TimeTicket::initial(),
            position_ticket: TimeTicket::initial(),
            removed_at: None,
            prev: None,
            next: None,
        };
        let mut by_id = HashMap::new();
        by_id.insert(TimeTicket::initial(), 0usize);
        Rga { nodes: vec![head], by_id, head: 0 }
    }

    fn find(&self, id: &TimeTicket) -> CrdtResult<usize> {
        self.by_id.get(id).copied().ok_or_else(|| CrdtError::missing_ticket(id.clone()))
    }

    /// Inserts a new node for `created_at` after `prev_id`, skipping
    /// forward over any concurrent siblings whose position ticket is
    /// newer than `executed_at` (descending-executedAt tie-break among
    /// inserts sharing the same `prev`).
    pub fn insert_after(&mut self, prev_id: &TimeTicket, created_at: TimeTicket, executed_at: TimeTicket) -> CrdtResult<()> {
        let prev = self.find(prev_id)?;
        let anchor = self.scan_insertion_point(prev, &executed_at);
        self.link_after(anchor, created_at, executed_at, None);
        Ok(())
    }

    /// Re-links `target_id` to sit after `prev_id`, applying the
    /// Thomas-write-rule: a no-op if a later move already won.
    pub fn move_after(&mut self, prev_id: &TimeTicket, target_id: &TimeTicket, executed_at: TimeTicket) -> CrdtResult<bool> {
        let target = self.find(target_id)?;
        if self.nodes[target].position_ticket.after(&executed_at) || self.nodes[target].position_ticket == executed_at {
            return Ok(false);
        }
        let prev = self.find(prev_id)?;

        self.unlink(target);
        let anchor = self.scan_insertion_point(prev, &executed_at);
        self.relink_after(anchor, target);
        self.nodes[target].position_ticket = executed_at;
        Ok(true)
    }

    /// Tombstones `target_id` if `executed_at` is newer than its current
    /// removal time. The node stays linked. Returns whether this call
    /// actually performed the removal (spec's `ConcurrentStale` no-op
    /// case returns `false`, not an error).
    pub fn remove(&mut self, target_id: &TimeTicket, executed_at: TimeTicket) -> CrdtResult<bool> {
        let idx = self.find(target_id)?;
        let current = self.nodes[idx].removed_at.clone().unwrap_or_else(TimeTicket::initial);
        if executed_at.after(&current) {
            self.nodes[idx].removed_at = Some(executed_at);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn is_removed(&self, id: &TimeTicket) -> CrdtResult<bool> {
        let idx = self.find(id)?;
        Ok(self.nodes[idx].removed_at.is_some())
    }

    /// Walks live (non-removed) nodes in list order.
    pub fn iter_live(&self) -> impl Iterator<Item = &TimeTicket> {
        LiveIter { rga: self, current: self.nodes[self.head].next }
    }

    pub fn get_by_index(&self, index: usize) -> Option<TimeTicket> {
        self.iter_live().nth(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.iter_live().count()
    }

    /// Physically unlinks and forgets `id` (spec §4.H GC). Only ever
    /// called on a tombstoned node once every peer has observed its
    /// removal, so no future concurrent move can still target it.
    pub fn purge(&mut self, id: &TimeTicket) {
        if let Some(idx) = self.by_id.remove(id) {
            self.unlink(idx);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scan_insertion_point(&self, prev: usize, executed_at: &TimeTicket) -> usize {
        let mut anchor = prev;
        while let Some(next) = self.nodes[anchor].next {
            if self.nodes[next].position_ticket.after(executed_at) {
                anchor = next;
            } else {
                break;
            }
        }
        anchor
    }

    fn link_after(&mut self, anchor: usize, created_at: TimeTicket, position_ticket: TimeTicket, removed_at: Option<TimeTicket>) {
        let next = self.nodes[anchor].next;
        let idx = self.nodes.len();
        self.nodes.push(RgaNode { created_at: created_at.clone(), position_ticket, removed_at, prev: Some(anchor), next });
        if let Some(n) = next {
            self.nodes[n].prev = Some(idx);
        }
        self.nodes[anchor].next = Some(idx);
        self.by_id.insert(created_at, idx);
    }

    fn relink_after(&mut self, anchor: usize, idx: usize) {
        let next = self.nodes[anchor].next;
        self.nodes[idx].prev = Some(anchor);
        self.nodes[idx].next = next;
        if let Some(n) = next {
            self.nodes[n].prev = Some(idx);
        }
        self.nodes[anchor].next = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let prev = self.nodes[idx].prev;
        let next = self.nodes[idx].next;
        if let Some(p) = prev {
            self.nodes[p].next = next;
        }
        if let Some(n) = next {
            self.nodes[n].prev = prev;
        }
    }
}

impl Default for Rga {
    fn default() -> Self { Self::new() }
}

struct LiveIter<'a> {
    rga: &'a Rga,
    current: Option<usize>,
}

impl<'a> Iterator for LiveIter<'a> {
    type Item = &'a TimeTicket;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(idx) = self.current {
            let node = &self.rga.nodes[idx];
            self.current = node.next;
            if node.removed_at.is_none() {
                return Some(&node.created_at);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorID;

    fn t(lamport: u64, actor: &str) -> TimeTicket {
        TimeTicket::new(lamport, 0, ActorID::from(actor))
    }

    #[test]
    fn insert_after_head_appends_in_order() {
        let mut rga = Rga::new();
        let head = TimeTicket::initial();
        let a = t(1, "a");
        let b = t(2, "a");
        rga.insert_after(&head, a.clone(), t(1, "a")).unwrap();
        rga.insert_after(&a, b.clone(), t(2, "a")).unwrap();
        let items: Vec<_> = rga.iter_live().cloned().collect();
        assert_eq!(items, vec![a, b]);
    }

    #[test]
    fn concurrent_inserts_after_same_prev_order_by_descending_executed_at() {
        let mut rga = Rga::new();
        let head = TimeTicket::initial();
        let first = t(1, "a");
        rga.insert_after(&head, first.clone(), t(1, "a")).unwrap();

        // Two concurrent inserts after `first`, arriving out of causal order.
        let low = t(2, "a");
        let high = t(3, "a");
        rga.insert_after(&first, low.clone(), t(2, "a")).unwrap();
        rga.insert_after(&first, high.clone(), t(3, "a")).unwrap();

        let items: Vec<_> = rga.iter_live().cloned().collect();
        // Higher executedAt sorts closer to the shared prev.
        assert_eq!(items, vec![first, high, low]);
    }

    #[test]
    fn move_after_relinks_and_updates_position() {
        let mut rga = Rga::new();
        let head = TimeTicket::initial();
        let b1 = t(1, "a");
        let c1 = t(2, "a");
        let move_me = t(3, "a");
        rga.insert_after(&head, b1.clone(), t(1, "a")).unwrap();
        rga.insert_after(&b1, c1.clone(), t(2, "a")).unwrap();
        rga.insert_after(&c1, move_me.clone(), t(3, "a")).unwrap();

        let moved = rga.move_after(&b1, &move_me, t(4, "a")).unwrap();
        assert!(moved);
        let items: Vec<_> = rga.iter_live().cloned().collect();
        assert_eq!(items, vec![b1, move_me, c1]);
    }

    #[test]
    fn move_after_is_noop_when_a_later_move_already_won() {
        let mut rga = Rga::new();
        let head = TimeTicket::initial();
        let a = t(1, "a");
        let b = t(2, "a");
        let target = t(3, "a");
        rga.insert_after(&head, a.clone(), t(1, "a")).unwrap();
        rga.insert_after(&a, b.clone(), t(2, "a")).unwrap();
        rga.insert_after(&b, target.clone(), t(3, "a")).unwrap();

        assert!(rga.move_after(&a, &target, t(10, "a")).unwrap());
        // An older move loses against the position_ticket set by the move above.
        assert!(!rga.move_after(&b, &target, t(5, "a")).unwrap());
    }

    #[test]
    fn remove_is_idempotent_on_older_timestamps() {
        let mut rga = Rga::new();
        let head = TimeTicket::initial();
        let a = t(1, "a");
        rga.insert_after(&head, a.clone(), t(1, "a")).unwrap();

        assert!(rga.remove(&a, t(5, "a")).unwrap());
        assert!(!rga.remove(&a, t(2, "a")).unwrap());
        assert!(rga.is_removed(&a).unwrap());
        assert_eq!(rga.len(), 0);
    }

    #[test]
    fn missing_prev_is_an_error() {
        let mut rga = Rga::new();
        let ghost = t(99, "nobody");
        let new_id = t(1, "a");
        assert!(rga.insert_after(&ghost, new_id, t(1, "a")).is_err());
    }
}
