use std::collections::{HashMap, HashSet};

use log::warn;

use crate::actor::ActorID;
use crate::clock::{TimeTicket, VersionVector};
use crate::element::{CRDTArray, CRDTElement, CRDTObject, Meta};
use crate::error::{CrdtError, CrdtResult};

/// An owned element plus its metadata, as stored in the root's arena.
#[derive(Debug, Clone)]
pub struct ElementSlot {
    pub meta: Meta,
    pub value: CRDTElement,
}

/// Element registry + tombstone index (spec §3, §4.H). `CRDTRoot`
/// exclusively owns the document's element graph: every element lives in
/// `elements`, keyed by its createdAt ticket (invariant I3); containers
/// (`CRDTObject`/`CRDTArray`) only ever hold the ticket of a child, never
/// the child itself, so there is exactly one owner per element and no
/// ownership cycles (spec §9 "Back-references & cycles").
#[derive(Debug, Clone)]
pub struct CRDTRoot {
    elements: HashMap<TimeTicket, ElementSlot>,
    /// removedElementSetByCreatedAt: populated when removedAt transitions
    /// from None to Some.
    removed: HashSet<TimeTicket>,
    /// elementPairMapByCreatedAt: child createdAt -> parent createdAt, so
    /// GC can ask the parent to physically purge the child.
    parent_of: HashMap<TimeTicket, TimeTicket>,
    root_object_id: TimeTicket,
}

/// Well-known creation ticket for the document's root object.
pub fn bootstrap_ticket() -> TimeTicket {
    TimeTicket::new(0, 0, ActorID::from("\0root"))
}

impl CRDTRoot {
    pub fn new() -> Self {
        let root_id = bootstrap_ticket();
        let mut elements = HashMap::new();
        elements.insert(root_id.clone(), ElementSlot {
            meta: Meta::new(root_id.clone()),
            value: CRDTElement::Object(CRDTObject::new()),
        });
        CRDTRoot {
            elements,
            removed: HashSet::new(),
            parent_of: HashMap::new(),
            root_object_id: root_id,
        }
    }

    pub fn root_object_id(&self) -> &TimeTicket {
        &self.root_object_id
    }

    pub fn get(&self, id: &TimeTicket) -> CrdtResult<&ElementSlot> {
        self.elements.get(id).ok_or_else(|| CrdtError::missing_ticket(id.clone()))
    }

    pub fn get_mut(&mut self, id: &TimeTicket) -> CrdtResult<&mut ElementSlot> {
        self.elements.get_mut(id).ok_or_else(|| CrdtError::missing_ticket(id.clone()))
    }

    /// Inserts a brand-new element into the arena, owned from here on by
    /// the root (I3). `parent` records who will hold this element's
    /// ticket, so GC can route a purge to the right container.
    pub fn register(&mut self, parent: Option<TimeTicket>, created_at: TimeTicket, value: CRDTElement) -> TimeTicket {
        self.elements.insert(created_at.clone(), ElementSlot { meta: Meta::new(created_at.clone()), value });
        if let Some(parent) = parent {
            self.parent_of.insert(created_at.clone(), parent);
        }
        created_at
    }

    /// Tombstones the element at `id` if `executed_at` is newer than its
    /// current removal time (idempotent, spec §4.D). Returns whether the
    /// removedAt was actually updated.
    pub fn mark_removed(&mut self, id: &TimeTicket, executed_at: TimeTicket) -> CrdtResult<bool> {
        let slot = self.get_mut(id)?;
        let was_live = !slot.meta.is_removed();
        let updated = slot.meta.remove(executed_at);
        if updated && was_live {
            self.removed.insert(id.clone());
        }
        Ok(updated)
    }

    pub fn get_garbage_length(&self) -> usize {
        self.removed.len()
    }

    /// Purges every tombstoned element whose removal is dominated by
    /// `min_synced_version_vector` — every peer has observed it (spec
    /// §4.H, P3/P4). Returns the number of elements purged.
    pub fn garbage_collect(&mut self, min_synced_version_vector: &VersionVector) -> usize {
        let mut purged = 0usize;
        let candidates: Vec<TimeTicket> = self.removed.iter().cloned().collect();

        for child in candidates {
            let removed_at = match self.elements.get(&child) {
                Some(slot) => match slot.meta.removed_at() {
                    Some(t) => t.clone(),
                    None => continue,
                },
                None => {
                    // Already gone; drop stale bookkeeping.
                    self.removed.remove(&child);
                    continue;
                }
            };

            if !min_synced_version_vector.after_or_equal(&removed_at) {
                continue;
            }

            match self.parent_of.get(&child).cloned() {
                Some(parent_id) => {
                    if let Some(parent_slot) = self.elements.get_mut(&parent_id) {
                        match &mut parent_slot.value {
                            CRDTElement::Object(o) => o.purge(&child),
                            CRDTElement::Array(a) => a.purge(&child),
                            _ => warn!("GC: parent of {child:?} is neither Object nor Array"),
                        }
                    } else {
                        warn!("GC: parent {parent_id:?} of {child:?} no longer present; dropping tombstone");
                    }
                }
                None => {
                    warn!("GC: no parent recorded for {child:?}; dropping tombstone");
                }
            }

            self.elements.remove(&child);
            self.removed.remove(&child);
            self.parent_of.remove(&child);
            purged += 1;
        }

        purged
    }
}

impl Default for CRDTRoot {
    fn default() -> Self { Self::new() }
}
