use crate::actor::ActorID;
use crate::clock::version_vector::VersionVector;

/// Identifies and orders a single `Change` (spec §3, §4.C).
///
/// Two changes from the same actor compare by `client_seq`; lamport is
/// the standard Lamport clock value, advanced on `next()`/`sync_lamport`.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeID {
    client_seq: u32,
    lamport: u64,
    actor_id: ActorID,
    version_vector: VersionVector,
}

impl ChangeID {
    pub fn new(client_seq: u32, lamport: u64, actor_id: ActorID, version_vector: VersionVector) -> Self {
        ChangeID { client_seq, lamport, actor_id, version_vector }
    }

    /// A fresh id for a brand new document, before any change has been
    /// committed.
    pub fn initial(actor_id: ActorID) -> Self {
        ChangeID { client_seq: 0, lamport: 0, actor_id, version_vector: VersionVector::new() }
    }

    pub fn client_seq(&self) -> u32 { self.client_seq }
    pub fn lamport(&self) -> u64 { self.lamport }
    pub fn actor_id(&self) -> &ActorID { &self.actor_id }
    pub fn version_vector(&self) -> &VersionVector { &self.version_vector }

    /// Rewrites this id's actor, and renames the same placeholder tag
    /// inside its `version_vector` snapshot (spec.md §9 Open Question 1)
    /// so the snapshot stays consistent with the id it is attached to.
    pub fn set_actor(&mut self, actor_id: ActorID) {
        let old = std::mem::replace(&mut self.actor_id, actor_id.clone());
        self.version_vector.rename_actor(&old, actor_id);
    }

    /// Standard Lamport update used when committing a new local change:
    /// clientSeq increments, lamport becomes `max(local, observed) + 1`.
    pub fn next(&self) -> Self {
        ChangeID {
            client_seq: self.client_seq + 1,
            lamport: self.lamport + 1,
            actor_id: self.actor_id.clone(),
            version_vector: self.version_vector.clone(),
        }
    }

    /// Lamport update on receiving a remote change: `max(local, remote) + 1`.
    pub fn sync_lamport(&self, remote_lamport: u64) -> Self {
        ChangeID {
            client_seq: self.client_seq,
            lamport: self.lamport.max(remote_lamport) + 1,
            actor_id: self.actor_id.clone(),
            version_vector: self.version_vector.clone(),
        }
    }

    pub fn set_version_vector(&mut self, vv: VersionVector) {
        self.version_vector = vv;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_increments_seq_and_lamport() {
        let id = ChangeID::initial(ActorID::from("a1"));
        let n1 = id.next();
        assert_eq!(n1.client_seq(), 1);
        assert_eq!(n1.lamport(), 1);

        let n2 = n1.next();
        assert_eq!(n2.client_seq(), 2);
        assert_eq!(n2.lamport(), 2);
    }

    #[test]
    fn sync_lamport_takes_max_plus_one() {
        let id = ChangeID::initial(ActorID::from("a1"));
        let id = id.next(); // lamport = 1
        let synced = id.sync_lamport(10);
        assert_eq!(synced.lamport(), 11);

        let synced_low = id.sync_lamport(0);
        assert_eq!(synced_low.lamport(), 2);
    }

    #[test]
    fn set_actor_renames_the_placeholder_entry_in_its_own_version_vector() {
        use crate::actor::local_actor_placeholder;

        let placeholder = local_actor_placeholder();
        let mut id = ChangeID::initial(placeholder.clone());
        let mut vv = VersionVector::new();
        vv.set(placeholder.clone(), 7);
        id.set_version_vector(vv);

        id.set_actor(ActorID::from("real-actor"));
        assert_eq!(id.version_vector().get(&placeholder), 0);
        assert_eq!(id.version_vector().get(&ActorID::from("real-actor")), 7);
    }

    #[test]
    fn same_actor_changes_order_by_client_seq() {
        let id = ChangeID::initial(ActorID::from("a1"));
        let n1 = id.next();
        let n2 = n1.next();
        assert!(n2.client_seq() > n1.client_seq());
    }
}
