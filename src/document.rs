use std::collections::HashMap;
use std::sync::Mutex;

use crate::actor::{local_actor_placeholder, ActorID};
use crate::change::{Change, ChangePack, Checkpoint};
use crate::change_context::ChangeContext;
use crate::clock::{ChangeID, VersionVector};
use crate::error::{CrdtError, CrdtResult};
use crate::json;
use crate::proxy::ObjectProxy;
use crate::root::CRDTRoot;

pub type SubscriptionID = u64;

/// A single replicated structured document (spec §3, §4.K). The facade
/// other crates are expected to drive: mutate it through `update`, sync
/// it with peers through `create_change_pack`/`apply_change_pack`, and
/// inspect it through `to_sorted_json`.
pub struct Document {
    key: String,
    root: CRDTRoot,
    change_id: ChangeID,
    /// This document's own accumulated knowledge of every actor's lamport
    /// frontier (spec §3/§4.C "versionVector snapshot at creation"):
    /// advanced by this actor's own lamport on every committed local
    /// change, and merged with a remote change's own snapshot plus its
    /// (actor, lamport) on every integrated remote change. Stamped into
    /// each new local `ChangeID` so the change's causal context travels
    /// with it on the wire.
    version_vector: VersionVector,
    checkpoint: Checkpoint,
    local_changes: Vec<Change>,
    subscribers: HashMap<SubscriptionID, Box<dyn FnMut(&Change) + Send>>,
    next_subscription_id: SubscriptionID,
    /// Set once a remote change fails to integrate (spec §7: "a corrupt
    /// change ... the document is marked suspect"). Sticky: the core
    /// never silently clears it, since the root may already reflect
    /// changes integrated before the corrupt one.
    suspect: bool,
}

impl Document {
    /// A brand new, empty document. The actor id starts as the
    /// placeholder and is only fixed once `set_actor` (typically called
    /// by whatever attaches this document to a real session) runs.
    pub fn new(key: impl Into<String>) -> Self {
        Document {
            key: key.into(),
            root: CRDTRoot::new(),
            change_id: ChangeID::initial(local_actor_placeholder()),
            version_vector: VersionVector::new(),
            checkpoint: Checkpoint::initial(),
            local_changes: Vec::new(),
            subscribers: HashMap::new(),
            next_subscription_id: 0,
            suspect: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    pub fn version_vector(&self) -> &VersionVector {
        &self.version_vector
    }

    /// True once a remote change has failed to integrate (spec §7). The
    /// caller decides what "suspect" means operationally (e.g. refusing
    /// further syncs, prompting a re-fetch) — this core only tracks and
    /// surfaces the flag.
    pub fn is_suspect(&self) -> bool {
        self.suspect
    }

    /// Fixes the actor id this document's local changes will be attributed
    /// to, rewriting any already-buffered local changes and this
    /// document's own tracked version vector in place (spec.md §9 Open
    /// Question 1).
    pub fn set_actor(&mut self, actor: ActorID) {
        let placeholder = self.change_id.actor_id().clone();
        self.version_vector.rename_actor(&placeholder, actor.clone());
        self.change_id.set_actor(actor.clone());
        for change in &mut self.local_changes {
            change.set_actor(actor.clone());
        }
    }

    /// Runs `callback` against a proxy over the document's root object,
    /// committing every operation it performs as a single `Change` only if
    /// it returns `Ok`. On `Err`, the document is left exactly as it was —
    /// the callback runs against a scratch copy of the root, never the
    /// live one (spec §7: a cancelled update must not partially apply).
    pub fn update(
        &mut self,
        message: Option<&str>,
        callback: impl FnOnce(&mut ObjectProxy) -> CrdtResult<()>,
    ) -> CrdtResult<()> {
        let mut next_id = self.change_id.next();
        // The causal context this change was authored against: everything
        // this document had observed up to (but not including) itself.
        next_id.set_version_vector(self.version_vector.clone());
        let mut context = ChangeContext::new(next_id.clone(), message.map(|s| s.to_string()));
        let mut scratch_root = self.root.clone();
        let root_object_id = scratch_root.root_object_id().clone();

        let outcome = {
            let mut proxy = ObjectProxy::new(&mut scratch_root, &mut context, root_object_id);
            callback(&mut proxy)
        };

        match outcome {
            Ok(()) => {
                if context.has_operations() {
                    self.root = scratch_root;
                    self.version_vector.set(next_id.actor_id().clone(), next_id.lamport());
                    self.change_id = next_id;
                    let change = context.get_change();
                    log::debug!("committed local change with {} operation(s)", change.operations().len());
                    self.notify(&change);
                    self.local_changes.push(change);
                } else {
                    log::trace!("update produced no operations; root left untouched");
                }
                Ok(())
            }
            Err(err) => {
                log::warn!("update callback failed, discarding {} buffered operation(s): {err}", context.operations_len());
                Err(err)
            }
        }
    }

    /// Applies every change in `pack` to the document's root, advances the
    /// local lamport clock and version vector past every remote change
    /// seen, forwards the checkpoint, and runs GC if the pack carries a
    /// `min_synced_version_vector` (spec §4.H, §4.J).
    ///
    /// Each `Change` integrates atomically (`Change::execute` itself never
    /// leaves `self.root` half-applied, spec §4.K/§7). If a change fails,
    /// integration stops there: changes earlier in `pack` remain applied,
    /// the failing change and everything after it are not, the document
    /// is marked suspect, and the error is returned to the caller.
    pub fn apply_change_pack(&mut self, pack: ChangePack) -> CrdtResult<()> {
        if pack.document_key != self.key {
            return Err(CrdtError::invariant(format!(
                "change pack for {:?} applied to document {:?}", pack.document_key, self.key,
            )));
        }

        for change in &pack.changes {
            if let Err(err) = change.execute(&mut self.root) {
                self.suspect = true;
                log::error!(
                    "remote change {:?} failed to integrate, marking document suspect: {err}",
                    change.id(),
                );
                return Err(err);
            }
            self.change_id = self.change_id.sync_lamport(change.id().lamport());
            self.version_vector = self.version_vector.max(change.id().version_vector());
            self.version_vector.set(change.id().actor_id().clone(), change.id().lamport());
            self.notify(change);
        }
        self.checkpoint.forward(pack.checkpoint.server_seq(), pack.checkpoint.client_seq());

        if let Some(snapshot) = pack.snapshot {
            log::debug!("installing snapshot, replacing root wholesale");
            self.root = snapshot;
        }

        if let Some(min_vv) = &pack.min_synced_version_vector {
            let purged = self.root.garbage_collect(min_vv);
            if purged > 0 {
                log::debug!("garbage collected {purged} tombstoned element(s) after sync");
            }
        }

        log::debug!("applied change pack with {} change(s)", pack.changes.len());
        Ok(())
    }

    /// Drains the locally accumulated changes since the last call into a
    /// `ChangePack` ready to send to peers.
    pub fn create_change_pack(&mut self) -> ChangePack {
        let changes = std::mem::take(&mut self.local_changes);
        ChangePack {
            document_key: self.key.clone(),
            checkpoint: self.checkpoint,
            min_synced_version_vector: None,
            changes,
            snapshot: None,
            is_removed: false,
        }
    }

    /// Registers `callback` to be invoked with every `Change` this
    /// document commits, whether authored locally via `update` or received
    /// via `apply_change_pack`. Returns an id usable with `unsubscribe`.
    pub fn subscribe(&mut self, callback: impl FnMut(&Change) + Send + 'static) -> SubscriptionID {
        let id = self.next_subscription_id;
        self.next_subscription_id += 1;
        self.subscribers.insert(id, Box::new(callback));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionID) {
        self.subscribers.remove(&id);
    }

    fn notify(&mut self, change: &Change) {
        for callback in self.subscribers.values_mut() {
            callback(change);
        }
    }

    /// Canonical JSON rendering of the current document state (spec §6):
    /// object keys sorted, arrays in list order, tombstoned entries
    /// omitted. Deterministic across replicas that have integrated the
    /// same set of changes (P1).
    pub fn to_sorted_json(&self) -> String {
        json::to_json(&self.root, self.root.root_object_id())
    }

    pub fn get_garbage_length(&self) -> usize {
        self.root.get_garbage_length()
    }

    pub fn garbage_collect(&mut self, min_synced_version_vector: &VersionVector) -> usize {
        self.root.garbage_collect(min_synced_version_vector)
    }
}

/// A `Document` behind the cooperative FIFO mutex spec §5 describes:
/// `update`, `apply_change_pack`, and `garbage_collect` are the only
/// suspending/blocking entry points, serialized through a single lock;
/// `to_sorted_json` and `get_garbage_length` take their own momentary
/// lock and never hold it across a caller-supplied callback, so a reader
/// is never blocked behind a writer's `update` closure for longer than
/// the closure itself runs. No async runtime is introduced — this core
/// has exactly one logical owner at a time, so a blocking `std::sync::Mutex`
/// already gives the serialization §5 asks for without pulling in an
/// executor the rest of the dependency stack has no other use for.
pub struct SharedDocument {
    inner: Mutex<Document>,
}

impl SharedDocument {
    pub fn new(key: impl Into<String>) -> Self {
        SharedDocument { inner: Mutex::new(Document::new(key)) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Document> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn update(
        &self,
        message: Option<&str>,
        callback: impl FnOnce(&mut ObjectProxy) -> CrdtResult<()>,
    ) -> CrdtResult<()> {
        self.lock().update(message, callback)
    }

    pub fn apply_change_pack(&self, pack: ChangePack) -> CrdtResult<()> {
        self.lock().apply_change_pack(pack)
    }

    pub fn create_change_pack(&self) -> ChangePack {
        self.lock().create_change_pack()
    }

    pub fn garbage_collect(&self, min_synced_version_vector: &VersionVector) -> usize {
        self.lock().garbage_collect(min_synced_version_vector)
    }

    pub fn to_sorted_json(&self) -> String {
        self.lock().to_sorted_json()
    }

    pub fn get_garbage_length(&self) -> usize {
        self.lock().get_garbage_length()
    }

    pub fn is_suspect(&self) -> bool {
        self.lock().is_suspect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Primitive;

    #[test]
    fn update_commits_on_success() {
        let mut doc = Document::new("doc-1");
        doc.update(Some("seed"), |root| {
            root.set("a1", Primitive::from("a1"))?;
            root.set_object("a3")?.set("b1", Primitive::from("b1"))?;
            Ok(())
        }).unwrap();

        assert_eq!(doc.to_sorted_json(), r#"{"a1":"a1","a3":{"b1":"b1"}}"#);
    }

    #[test]
    fn update_rolls_back_on_error() {
        let mut doc = Document::new("doc-1");
        doc.update(None, |root| { root.set("a1", Primitive::from(1i32)) }).unwrap();
        let before = doc.to_sorted_json();

        let err = doc.update(None, |root| {
            root.set("a2", Primitive::from(2i32))?;
            Err(CrdtError::cancelled("caller changed its mind"))
        }).unwrap_err();

        assert!(matches!(err, CrdtError::Cancelled { .. }));
        assert_eq!(doc.to_sorted_json(), before);
    }

    #[test]
    fn subscribers_observe_local_changes() {
        let mut doc = Document::new("doc-1");
        let seen = std::sync::Arc::new(std::sync::Mutex::new(0usize));
        let seen2 = seen.clone();
        doc.subscribe(move |_change| { *seen2.lock().unwrap() += 1; });

        doc.update(None, |root| root.set("a1", Primitive::from(1i32))).unwrap();
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn create_change_pack_drains_local_changes() {
        let mut doc = Document::new("doc-1");
        doc.update(None, |root| root.set("a1", Primitive::from(1i32))).unwrap();
        let pack = doc.create_change_pack();
        assert_eq!(pack.changes.len(), 1);
        assert!(!doc.create_change_pack().has_changes());
    }

    #[test]
    fn shared_document_serializes_updates() {
        let shared = SharedDocument::new("doc-1");
        shared.update(None, |root| root.set("a1", Primitive::from(1i32))).unwrap();
        shared.update(None, |root| root.set("a2", Primitive::from(2i32))).unwrap();
        assert_eq!(shared.to_sorted_json(), r#"{"a1":1,"a2":2}"#);
    }

    #[test]
    fn resuming_a_nested_container_across_updates() {
        let mut doc = Document::new("doc-1");
        doc.update(None, |root| { root.set_array("items")?; Ok(()) }).unwrap();
        doc.update(None, |root| { root.array("items")?.push(Primitive::from(1i32)) }).unwrap();
        doc.update(None, |root| { root.array("items")?.push(Primitive::from(2i32)) }).unwrap();
        assert_eq!(doc.to_sorted_json(), r#"{"items":[1,2]}"#);

        doc.update(None, |root| root.array("items")?.push(Primitive::from(3i32))).unwrap();
        assert_eq!(doc.to_sorted_json(), r#"{"items":[1,2,3]}"#);

        let type_err = doc.update(None, |root| root.object("items").map(|_| ())).unwrap_err();
        assert!(matches!(type_err, CrdtError::TypeMismatch { .. }));
    }

    #[test]
    fn apply_change_pack_replays_remote_changes() {
        let mut sender = Document::new("doc-1");
        sender.set_actor(ActorID::from("peer-a"));
        sender.update(None, |root| root.set("a1", Primitive::from("hi"))).unwrap();
        let pack = sender.create_change_pack();

        let mut receiver = Document::new("doc-1");
        receiver.apply_change_pack(pack).unwrap();
        assert_eq!(receiver.to_sorted_json(), sender.to_sorted_json());
    }

    #[test]
    fn apply_change_pack_installs_snapshot_wholesale() {
        let mut source = Document::new("doc-1");
        source.set_actor(ActorID::from("peer-a"));
        source.update(None, |root| root.set("k", Primitive::from("snapshotted"))).unwrap();

        let mut pack = source.create_change_pack();
        pack.changes.clear();
        pack.snapshot = Some(source.root.clone());

        let mut receiver = Document::new("doc-1");
        receiver.update(None, |root| root.set("stale", Primitive::from(true))).unwrap();
        receiver.apply_change_pack(pack).unwrap();

        assert_eq!(receiver.to_sorted_json(), r#"{"k":"snapshotted"}"#);
    }

    #[test]
    fn apply_change_pack_marks_document_suspect_on_integration_failure() {
        use crate::clock::TimeTicket;
        use crate::operation::{OpValue, Operation};

        let mut receiver = Document::new("doc-1");
        assert!(!receiver.is_suspect());

        let bogus_parent = TimeTicket::new(99, 0, ActorID::from("nobody"));
        let change = Change::new(
            ChangeID::initial(ActorID::from("peer-a")).next(),
            vec![Operation::Set {
                parent_created_at: bogus_parent,
                key: "a1".into(),
                value: OpValue::Primitive(Primitive::from(1i32)),
                executed_at: TimeTicket::new(1, 0, ActorID::from("peer-a")),
            }],
            None,
        );

        let mut pack = ChangePack::new("doc-1", Checkpoint::initial());
        pack.changes.push(change);

        let err = receiver.apply_change_pack(pack).unwrap_err();
        assert!(matches!(err, CrdtError::NotFound { .. }));
        assert!(receiver.is_suspect());
    }

    #[test]
    fn apply_change_pack_merges_remote_version_vector_knowledge() {
        let mut sender = Document::new("doc-1");
        sender.set_actor(ActorID::from("peer-a"));
        sender.update(None, |root| root.set("a1", Primitive::from("hi"))).unwrap();
        let pack = sender.create_change_pack();

        let mut receiver = Document::new("doc-1");
        receiver.apply_change_pack(pack).unwrap();

        assert_eq!(receiver.version_vector().get(&ActorID::from("peer-a")), 1);

        // A subsequent local change on the receiver stamps its ChangeID
        // with the accumulated knowledge, including the remote actor.
        receiver.set_actor(ActorID::from("peer-b"));
        receiver.update(None, |root| root.set("a2", Primitive::from("bye"))).unwrap();
        let pack_back = receiver.create_change_pack();
        let stamped = pack_back.changes[0].id().version_vector();
        assert_eq!(stamped.get(&ActorID::from("peer-a")), 1);
    }
}
