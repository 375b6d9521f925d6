use std::collections::BTreeMap;

use crate::actor::ActorID;
use crate::clock::time_ticket::TimeTicket;

/// Per-actor lamport frontier (spec §3, §4.B). A `VersionVector` records,
/// for each actor this site has observed, the highest lamport timestamp
/// seen from that actor.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionVector {
    entries: BTreeMap<ActorID, u64>,
}

impl VersionVector {
    pub fn new() -> Self {
        VersionVector { entries: BTreeMap::new() }
    }

    pub fn get(&self, actor: &ActorID) -> u64 {
        self.entries.get(actor).copied().unwrap_or(0)
    }

    /// Unconditionally sets the entry for `actor` to `lamport`.
    pub fn set(&mut self, actor: ActorID, lamport: u64) {
        self.entries.insert(actor, lamport);
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Highest lamport value across all entries, or 0 if empty.
    pub fn max_lamport(&self) -> u64 {
        self.entries.values().copied().max().unwrap_or(0)
    }

    /// Entry-wise max against `other`, returned as a new vector.
    pub fn max(&self, other: &VersionVector) -> VersionVector {
        let mut result = self.clone();
        for (actor, lamport) in &other.entries {
            let entry = result.entries.entry(actor.clone()).or_insert(0);
            if *lamport > *entry {
                *entry = *lamport;
            }
        }
        result
    }

    /// True iff this vector has observed `ticket`'s actor up to at least
    /// `ticket`'s lamport. An actor absent from this vector is treated as
    /// "seen enough" (used for the no-peers GC case, spec §4.B).
    pub fn after_or_equal(&self, ticket: &TimeTicket) -> bool {
        match self.entries.get(ticket.actor_id()) {
            Some(&lamport) => lamport >= ticket.lamport(),
            None => true,
        }
    }

    pub fn deepcopy(&self) -> VersionVector {
        self.clone()
    }

    /// Rewrites the entry for `old` (if any) to live under `new` instead,
    /// merging with any existing entry for `new` by taking the max (spec.md
    /// §9 Open Question 1: tickets/ids issued under a placeholder actor are
    /// rewritten in place once the real actor id is known, rather than
    /// re-keyed wholesale).
    pub fn rename_actor(&mut self, old: &ActorID, new: ActorID) {
        if let Some(lamport) = self.entries.remove(old) {
            let entry = self.entries.entry(new).or_insert(0);
            if lamport > *entry {
                *entry = lamport;
            }
        }
    }

    /// Retains only entries whose actor appears as a key in `keys`.
    pub fn filter(&self, keys: &VersionVector) -> VersionVector {
        let mut result = VersionVector::new();
        for (actor, lamport) in &self.entries {
            if keys.entries.contains_key(actor) {
                result.entries.insert(actor.clone(), *lamport);
            }
        }
        result
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ActorID, &u64)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(lamport: u64, actor: &str) -> TimeTicket {
        TimeTicket::new(lamport, 0, ActorID::from(actor))
    }

    #[test]
    fn after_or_equal_matches_spec_scenario_6() {
        let mut vv = VersionVector::new();
        vv.set(ActorID::from("actorID-200"), 200);

        assert!(!vv.after_or_equal(&ticket(250, "actorID-200")));
        assert!(vv.after_or_equal(&ticket(150, "actorID-200")));
        assert!(vv.after_or_equal(&ticket(10, "actorID-999")));
    }

    #[test]
    fn empty_vector_sees_everything() {
        let vv = VersionVector::new();
        assert!(vv.after_or_equal(&ticket(1, "any")));
    }

    #[test]
    fn max_takes_entrywise_maximum() {
        let mut a = VersionVector::new();
        a.set(ActorID::from("x"), 5);
        a.set(ActorID::from("y"), 2);

        let mut b = VersionVector::new();
        b.set(ActorID::from("x"), 3);
        b.set(ActorID::from("z"), 9);

        let merged = a.max(&b);
        assert_eq!(merged.get(&ActorID::from("x")), 5);
        assert_eq!(merged.get(&ActorID::from("y")), 2);
        assert_eq!(merged.get(&ActorID::from("z")), 9);
    }

    #[test]
    fn filter_keeps_only_keys_present_in_argument() {
        let mut v = VersionVector::new();
        v.set(ActorID::from("x"), 1);
        v.set(ActorID::from("y"), 2);

        let mut keys = VersionVector::new();
        keys.set(ActorID::from("x"), 0);

        let filtered = v.filter(&keys);
        assert_eq!(filtered.size(), 1);
        assert_eq!(filtered.get(&ActorID::from("x")), 1);
        assert_eq!(filtered.get(&ActorID::from("y")), 0);
    }

    #[test]
    fn max_lamport_of_empty_vector_is_zero() {
        assert_eq!(VersionVector::new().max_lamport(), 0);
    }

    #[test]
    fn rename_actor_moves_the_entry() {
        let mut vv = VersionVector::new();
        vv.set(ActorID::from(""), 3);
        vv.rename_actor(&ActorID::from(""), ActorID::from("real-actor"));
        assert_eq!(vv.get(&ActorID::from("")), 0);
        assert_eq!(vv.get(&ActorID::from("real-actor")), 3);
    }

    #[test]
    fn rename_actor_merges_by_max_into_an_existing_entry() {
        let mut vv = VersionVector::new();
        vv.set(ActorID::from("placeholder"), 2);
        vv.set(ActorID::from("real-actor"), 5);
        vv.rename_actor(&ActorID::from("placeholder"), ActorID::from("real-actor"));
        assert_eq!(vv.get(&ActorID::from("real-actor")), 5);
        assert_eq!(vv.size(), 1);
    }
}
