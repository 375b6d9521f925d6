use std::cmp::Ordering;

use crate::actor::ActorID;

/// Totally ordered logical timestamp (spec §3, §4.A).
///
/// Order: lamport, then actorID lexicographically, then delimiter. Two
/// tickets issued by the same actor never compare equal, and for a given
/// actor the sequence of tickets it issues strictly increases.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeTicket {
    lamport: u64,
    delimiter: u32,
    actor_id: ActorID,
}

impl TimeTicket {
    pub fn new(lamport: u64, delimiter: u32, actor_id: ActorID) -> Self {
        TimeTicket { lamport, delimiter, actor_id }
    }

    pub fn lamport(&self) -> u64 { self.lamport }
    pub fn delimiter(&self) -> u32 { self.delimiter }
    pub fn actor_id(&self) -> &ActorID { &self.actor_id }

    /// Sentinel that sorts strictly before any real ticket.
    pub fn initial() -> Self {
        TimeTicket { lamport: 0, delimiter: 0, actor_id: ActorID::new() }
    }

    /// Sentinel that sorts at or after any real ticket.
    pub fn max() -> Self {
        TimeTicket { lamport: u64::MAX, delimiter: u32::MAX, actor_id: ActorID::from("\u{10FFFF}") }
    }

    pub fn is_initial(&self) -> bool { *self == Self::initial() }

    pub fn compare(&self, other: &Self) -> Ordering {
        self.lamport.cmp(&other.lamport)
            .then_with(|| self.actor_id.cmp(&other.actor_id))
            .then_with(|| self.delimiter.cmp(&other.delimiter))
    }

    pub fn after(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Greater
    }
}

impl PartialOrd for TimeTicket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for TimeTicket {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(lamport: u64, actor: &str, delim: u32) -> TimeTicket {
        TimeTicket::new(lamport, delim, ActorID::from(actor))
    }

    #[test]
    fn initial_is_strictly_least() {
        let initial = TimeTicket::initial();
        let any = t(1, "a", 0);
        assert!(any.after(&initial));
        assert!(!initial.after(&any));
    }

    #[test]
    fn max_is_strictly_greatest() {
        let max = TimeTicket::max();
        let any = t(1_000_000, "zzzzzzzz", 999);
        assert!(max.after(&any));
    }

    #[test]
    fn same_lamport_breaks_tie_by_actor() {
        let a = t(5, "actorA", 0);
        let b = t(5, "actorB", 0);
        assert!(b.after(&a));
        assert!(!a.after(&b));
    }

    #[test]
    fn same_lamport_same_actor_breaks_tie_by_delimiter() {
        let a = t(5, "actor", 0);
        let b = t(5, "actor", 1);
        assert!(b.after(&a));
    }

    #[test]
    fn structural_equality() {
        assert_eq!(t(5, "actor", 1), t(5, "actor", 1));
        assert_ne!(t(5, "actor", 1), t(5, "actor", 2));
    }
}
