use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::clock::TimeTicket;

/// Nodes for one key: almost always just the live entry, occasionally one
/// tombstone riding alongside it until GC — inline storage avoids a heap
/// allocation per key for the common case.
type NodeList = SmallVec<[RhtNode; 2]>;

/// A single entry of the replicated hash table. `removed_at` is the
/// executedAt of whichever later `set` superseded this entry (or, when
/// this entry itself lost a tie-break on arrival, its own executedAt);
/// `None` means this is the live entry for its key.
#[derive(Debug, Clone)]
struct RhtNode {
    value: TimeTicket,
    executed_at: TimeTicket,
    removed_at: Option<TimeTicket>,
}

/// Outcome of `Rht::set`, telling the caller (the owning `CRDTObject`)
/// which element, if any, needs to be tombstoned in the root's element
/// graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// No prior entry for this key; the new value is live.
    Inserted,
    /// The new value won and is now live; the previous live value (now
    /// tombstoned) is returned so the caller can mark it removed in root.
    Replaced { superseded: TimeTicket },
    /// The new value lost the tie-break against an existing (live or
    /// tombstoned) entry with an equal-or-newer executedAt. The new value
    /// is inserted already tombstoned so it still participates in future
    /// tie-breaks, but is never live.
    LostTiebreak,
}

/// Key → (child element ticket, executedAt), last-writer-wins on
/// executedAt (spec §3, §4.E). Maps string keys to the ticket of the
/// child `CRDTElement` stored in the owning root's arena; at most one
/// entry per key is live.
#[derive(Debug, Clone, Default)]
pub struct Rht {
    // Each key can have multiple nodes: at most one live, the rest
    // tombstoned and retained until GC (spec DESIGN.md Open Question 2).
    entries: BTreeMap<String, NodeList>,
}

impl Rht {
    pub fn new() -> Self {
        Rht { entries: BTreeMap::new() }
    }

    /// Inserts `value` for `key` iff no existing entry for `key` (live or
    /// tombstoned) has an executedAt >= `executed_at`.
    pub fn set(&mut self, key: &str, value: TimeTicket, executed_at: TimeTicket) -> SetOutcome {
        let nodes = self.entries.entry(key.to_string()).or_default();

        let beats_all = nodes.iter().all(|n| executed_at.after(&n.executed_at));

        if !beats_all {
            nodes.push(RhtNode { value, executed_at: executed_at.clone(), removed_at: Some(executed_at) });
            return SetOutcome::LostTiebreak;
        }

        let live_index = nodes.iter().position(|n| n.removed_at.is_none());
        let outcome = if let Some(idx) = live_index {
            let superseded = nodes[idx].value.clone();
            nodes[idx].removed_at = Some(executed_at.clone());
            SetOutcome::Replaced { superseded }
        } else {
            SetOutcome::Inserted
        };

        nodes.push(RhtNode { value, executed_at, removed_at: None });
        outcome
    }

    pub fn has(&self, key: &str) -> bool {
        self.live_node(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<TimeTicket> {
        self.live_node(key).map(|n| n.value.clone())
    }

    fn live_node(&self, key: &str) -> Option<&RhtNode> {
        self.entries.get(key)?.iter().find(|n| n.removed_at.is_none())
    }

    /// Live entries only, sorted by key (spec §6 canonical JSON order).
    pub fn iter_live(&self) -> impl Iterator<Item = (&str, &TimeTicket)> {
        self.entries.iter().filter_map(|(k, nodes)| {
            nodes.iter().find(|n| n.removed_at.is_none()).map(|n| (k.as_str(), &n.value))
        })
    }

    pub fn len_live(&self) -> usize {
        self.iter_live().count()
    }

    /// Tombstones whichever live entry currently points at `child`
    /// (spec §4.G REMOVE addresses a child by its own createdAt, not by
    /// key). Returns whether a live entry was found and tombstoned.
    pub fn remove_value(&mut self, child: &TimeTicket, executed_at: TimeTicket) -> bool {
        for nodes in self.entries.values_mut() {
            if let Some(n) = nodes.iter_mut().find(|n| n.removed_at.is_none() && &n.value == child) {
                n.removed_at = Some(executed_at);
                return true;
            }
        }
        false
    }

    /// Physically drops the tombstoned node referencing `child`, if any
    /// (spec §4.H GC — called once the root has confirmed `child` is
    /// dominated by the minimum synced version vector). Never removes a
    /// live entry.
    pub fn purge_child(&mut self, child: &TimeTicket) {
        let mut empty_key = None;
        for (key, nodes) in self.entries.iter_mut() {
            if let Some(pos) = nodes.iter().position(|n| n.removed_at.is_some() && &n.value == child) {
                nodes.remove(pos);
                if nodes.is_empty() {
                    empty_key = Some(key.clone());
                }
                break;
            }
        }
        if let Some(key) = empty_key {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorID;

    fn ticket(lamport: u64, actor: &str) -> TimeTicket {
        TimeTicket::new(lamport, 0, ActorID::from(actor))
    }

    #[test]
    fn lww_live_value_is_max_executed_at() {
        let mut rht = Rht::new();
        let v1 = ticket(100, "v1");
        let v2 = ticket(100, "v2");
        let v3 = ticket(100, "v3");

        assert_eq!(rht.set("k", v1.clone(), ticket(1, "a")), SetOutcome::Inserted);
        assert_eq!(rht.get("k"), Some(v1.clone()));

        // A later write wins and supersedes v1.
        assert_eq!(rht.set("k", v2.clone(), ticket(5, "a")), SetOutcome::Replaced { superseded: v1 });
        assert_eq!(rht.get("k"), Some(v2));

        // An out-of-order arrival with an older executedAt loses.
        assert_eq!(rht.set("k", v3, ticket(3, "a")), SetOutcome::LostTiebreak);
        assert_eq!(rht.get("k").unwrap(), ticket(100, "v2"));
    }

    #[test]
    fn unrelated_keys_are_independent() {
        let mut rht = Rht::new();
        rht.set("a", ticket(1, "va"), ticket(1, "x"));
        rht.set("b", ticket(1, "vb"), ticket(1, "x"));
        assert!(rht.has("a"));
        assert!(rht.has("b"));
        assert_eq!(rht.len_live(), 2);
    }

    #[test]
    fn iter_live_is_sorted_by_key() {
        let mut rht = Rht::new();
        rht.set("z", ticket(1, "vz"), ticket(1, "x"));
        rht.set("a", ticket(1, "va"), ticket(2, "x"));
        let keys: Vec<&str> = rht.iter_live().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "z"]);
    }
}
