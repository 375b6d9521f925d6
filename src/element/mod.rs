mod object;
mod array;

pub use object::CRDTObject;
pub use array::CRDTArray;

use crate::clock::TimeTicket;
use crate::value::Primitive;

/// Metadata every element carries (spec §3): creation time, last-move
/// time (Array children only), and tombstone time.
#[derive(Debug, Clone)]
pub struct Meta {
    created_at: TimeTicket,
    moved_at: Option<TimeTicket>,
    removed_at: Option<TimeTicket>,
}

impl Meta {
    pub fn new(created_at: TimeTicket) -> Self {
        Meta { created_at, moved_at: None, removed_at: None }
    }

    pub fn created_at(&self) -> &TimeTicket { &self.created_at }
    pub fn moved_at(&self) -> Option<&TimeTicket> { self.moved_at.as_ref() }
    pub fn removed_at(&self) -> Option<&TimeTicket> { self.removed_at.as_ref() }

    pub fn set_moved_at(&mut self, at: TimeTicket) {
        self.moved_at = Some(at);
    }

    /// Idempotent on older timestamps (spec §4.D): only a strictly newer
    /// `executed_at` updates the tombstone.
    pub fn remove(&mut self, executed_at: TimeTicket) -> bool {
        let current = self.removed_at.clone().unwrap_or_else(TimeTicket::initial);
        if executed_at.after(&current) {
            self.removed_at = Some(executed_at);
            true
        } else {
            false
        }
    }

    pub fn is_removed(&self) -> bool {
        self.removed_at.is_some()
    }
}

/// Minimal bookkeeping for a Tree/Text node: spec §1 explicitly leaves
/// the per-node splitting algorithm out of scope, but the root still
/// needs to track createdAt/removedAt uniformly so GC can account for
/// tombstoned Tree/Text content (spec §3).
#[derive(Debug, Clone)]
pub struct CRDTTextLike {
    /// Opaque payload; a real Text/Tree CRDT would replace this with its
    /// own node graph.
    pub content: String,
}

/// Polymorphic document element (spec §3, §4.D). Root arena entries are
/// always a `(Meta, CRDTElement)` pair stored together — see
/// `root::ElementSlot`.
#[derive(Debug, Clone)]
pub enum CRDTElement {
    Primitive(Primitive),
    Object(CRDTObject),
    Array(CRDTArray),
    Text(CRDTTextLike),
}

impl CRDTElement {
    pub fn type_name(&self) -> &'static str {
        match self {
            CRDTElement::Primitive(p) => p.type_name(),
            CRDTElement::Object(_) => "object",
            CRDTElement::Array(_) => "array",
            CRDTElement::Text(_) => "text",
        }
    }

    pub fn as_object(&self) -> Option<&CRDTObject> {
        match self { CRDTElement::Object(o) => Some(o), _ => None }
    }
    pub fn as_object_mut(&mut self) -> Option<&mut CRDTObject> {
        match self { CRDTElement::Object(o) => Some(o), _ => None }
    }
    pub fn as_array(&self) -> Option<&CRDTArray> {
        match self { CRDTElement::Array(a) => Some(a), _ => None }
    }
    pub fn as_array_mut(&mut self) -> Option<&mut CRDTArray> {
        match self { CRDTElement::Array(a) => Some(a), _ => None }
    }
    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self { CRDTElement::Primitive(p) => Some(p), _ => None }
    }
}
