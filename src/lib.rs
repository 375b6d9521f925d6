//! Core CRDT document engine for real-time collaborative structured
//! documents: logical clocks, last-writer-wins and RGA-ordered replicated
//! types, and the change/sync plumbing that keeps replicas converging.
//!
//! The crate has no network transport or persistence of its own — it is
//! the pure, replayable core a server or client wires up around.

pub mod actor;
pub mod change;
pub mod change_context;
pub mod clock;
pub mod document;
pub mod element;
pub mod error;
pub mod json;
pub mod operation;
pub mod proxy;
pub mod rga;
pub mod rht;
pub mod root;
pub mod value;

pub use actor::ActorID;
pub use change::{Change, ChangePack, Checkpoint};
pub use change_context::ChangeContext;
pub use clock::{ChangeID, TimeTicket, VersionVector};
pub use document::{Document, SharedDocument, SubscriptionID};
pub use element::{CRDTArray, CRDTElement, CRDTObject, CRDTTextLike, Meta};
pub use error::{CrdtError, CrdtResult};
pub use operation::{OpValue, Operation};
pub use proxy::{ArrayProxy, ObjectProxy};
pub use root::CRDTRoot;
pub use value::Primitive;
