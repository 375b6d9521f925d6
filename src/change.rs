use crate::actor::ActorID;
use crate::clock::{ChangeID, VersionVector};
use crate::error::CrdtResult;
use crate::operation::Operation;
use crate::root::CRDTRoot;

/// An ordered, replayable unit of local edits (spec §3, §4.J). Immutable
/// once produced by `ChangeContext::get_change`, aside from the one
/// allowed rewrite in `set_actor`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Change {
    id: ChangeID,
    operations: Vec<Operation>,
    message: Option<String>,
}

impl Change {
    pub fn new(id: ChangeID, operations: Vec<Operation>, message: Option<String>) -> Self {
        Change { id, operations, message }
    }

    pub fn id(&self) -> &ChangeID {
        &self.id
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Rewrites this change's id and every placeholder-actor ticket its
    /// operations carry to `actor` — the one point where a locally
    /// authored change learns its real actor identity (spec.md §9 Open
    /// Question 1).
    pub fn set_actor(&mut self, actor: ActorID) {
        self.id.set_actor(actor.clone());
        for op in &mut self.operations {
            op.rewrite_actor(&actor);
        }
    }

    /// Replays every operation against `root`, atomically (spec §4.K,
    /// §7: "the root is not left half-applied — integration is
    /// transactional per Change"). Operations run against a scratch copy
    /// of `root` first; `root` itself is only overwritten once every
    /// operation has succeeded. On the first failure, `root` is left
    /// exactly as it was before this call — mirroring the scratch-root
    /// pattern `Document::update` uses for local edits.
    pub fn execute(&self, root: &mut CRDTRoot) -> CrdtResult<()> {
        let mut scratch = root.clone();
        for op in &self.operations {
            op.execute(&mut scratch)?;
        }
        *root = scratch;
        Ok(())
    }
}

/// Server-assigned delivery cursor for a document's change stream (spec
/// §4.J). Advances monotonically in both components as changes are
/// pushed and pulled.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Checkpoint {
    server_seq: u64,
    client_seq: u32,
}

impl Checkpoint {
    pub fn initial() -> Self {
        Checkpoint { server_seq: 0, client_seq: 0 }
    }

    pub fn server_seq(&self) -> u64 {
        self.server_seq
    }

    pub fn client_seq(&self) -> u32 {
        self.client_seq
    }

    /// Advances to the componentwise maximum of the current checkpoint and
    /// the incoming one; a replayed or reordered ack never moves it back.
    pub fn forward(&mut self, server_seq: u64, client_seq: u32) {
        self.server_seq = self.server_seq.max(server_seq);
        self.client_seq = self.client_seq.max(client_seq);
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::initial()
    }
}

/// Wire envelope exchanged between a document and its peers (spec §4.J).
/// `min_synced_version_vector` lets the receiver drive `CRDTRoot::garbage_collect`.
///
/// `snapshot`, when present, replaces the receiving document's root
/// wholesale (spec §4.K) instead of being replayed operation-by-operation.
/// Spec §6 describes the wire-level snapshot as an "opaque blob" — that
/// opacity is the serialization adapter's concern (out of scope, §1): by
/// the time a `ChangePack` reaches this core, the adapter has already
/// decoded the blob into a `CRDTRoot`, and it re-encodes one the same way
/// before a pack crosses back out to the wire. See DESIGN.md.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangePack {
    pub document_key: String,
    pub checkpoint: Checkpoint,
    pub min_synced_version_vector: Option<VersionVector>,
    pub changes: Vec<Change>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub snapshot: Option<CRDTRoot>,
    pub is_removed: bool,
}

impl ChangePack {
    pub fn new(document_key: impl Into<String>, checkpoint: Checkpoint) -> Self {
        ChangePack {
            document_key: document_key.into(),
            checkpoint,
            min_synced_version_vector: None,
            changes: Vec::new(),
            snapshot: None,
            is_removed: false,
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}
