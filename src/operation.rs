use crate::actor::{is_placeholder, ActorID};
use crate::clock::TimeTicket;
use crate::element::{CRDTArray, CRDTElement, CRDTObject, CRDTTextLike};
use crate::error::{CrdtError, CrdtResult};
use crate::rht::SetOutcome;
use crate::root::CRDTRoot;
use crate::value::Primitive;

/// Returns `ticket` unchanged unless it carries the placeholder actor, in
/// which case it is rebuilt with `actor` (spec.md §9 Open Question 1,
/// resolved in DESIGN.md: rewrite in place rather than re-keying).
fn rewritten(ticket: &TimeTicket, actor: &ActorID) -> TimeTicket {
    if is_placeholder(ticket.actor_id()) {
        TimeTicket::new(ticket.lamport(), ticket.delimiter(), actor.clone())
    } else {
        ticket.clone()
    }
}

/// What a SET or ADD instantiates. Containers start empty; subsequent
/// operations targeting the new element's createdAt populate them —
/// this is how the nested-object scenario in spec §8 scenario 1 is
/// built up from a sequence of flat operations.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpValue {
    Primitive(Primitive),
    Object,
    Array,
    /// Opaque Text/Tree payload (spec §1 Non-goal: node-splitting algorithm).
    Text(String),
}

impl OpValue {
    fn instantiate(self) -> CRDTElement {
        match self {
            OpValue::Primitive(p) => CRDTElement::Primitive(p),
            OpValue::Object => CRDTElement::Object(CRDTObject::new()),
            OpValue::Array => CRDTElement::Array(CRDTArray::new()),
            OpValue::Text(content) => CRDTElement::Text(CRDTTextLike { content }),
        }
    }
}

/// A single replayable mutation (spec §3, §4.G). Every variant carries
/// `parent_created_at` and `executed_at`; EDIT/STYLE/TREE-EDIT are
/// represented by `OpValue::Text` riding the same SET/ADD envelope since
/// this crate doesn't implement Text/Tree's own operation set (spec §1
/// Non-goal).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operation {
    Set {
        parent_created_at: TimeTicket,
        key: String,
        value: OpValue,
        executed_at: TimeTicket,
    },
    Add {
        parent_created_at: TimeTicket,
        prev_created_at: TimeTicket,
        value: OpValue,
        executed_at: TimeTicket,
    },
    Move {
        parent_created_at: TimeTicket,
        prev_created_at: TimeTicket,
        created_at: TimeTicket,
        executed_at: TimeTicket,
    },
    Remove {
        parent_created_at: TimeTicket,
        created_at: TimeTicket,
        executed_at: TimeTicket,
    },
}

impl Operation {
    pub fn parent_created_at(&self) -> &TimeTicket {
        match self {
            Operation::Set { parent_created_at, .. }
            | Operation::Add { parent_created_at, .. }
            | Operation::Move { parent_created_at, .. }
            | Operation::Remove { parent_created_at, .. } => parent_created_at,
        }
    }

    pub fn executed_at(&self) -> &TimeTicket {
        match self {
            Operation::Set { executed_at, .. }
            | Operation::Add { executed_at, .. }
            | Operation::Move { executed_at, .. }
            | Operation::Remove { executed_at, .. } => executed_at,
        }
    }

    fn opcode(&self) -> &'static str {
        match self {
            Operation::Set { .. } => "SET",
            Operation::Add { .. } => "ADD",
            Operation::Move { .. } => "MOVE",
            Operation::Remove { .. } => "REMOVE",
        }
    }

    /// `"<parent.lamport>:<parent.actor>:<parent.delimiter>.<OPCODE>"`
    /// (spec §4.G) — stable, debuggable identity for a replayed op.
    pub fn structure_as_string(&self) -> String {
        let p = self.parent_created_at();
        format!("{}:{}:{}.{}", p.lamport(), p.actor_id(), p.delimiter(), self.opcode())
    }

    /// Rewrites every placeholder-actor ticket this operation carries to
    /// `actor` (spec.md §9 Open Question 1). Called once, by
    /// `Change::set_actor`, before a locally authored change is ever
    /// applied or transmitted.
    pub fn rewrite_actor(&mut self, actor: &ActorID) {
        match self {
            Operation::Set { parent_created_at, executed_at, .. } => {
                *parent_created_at = rewritten(parent_created_at, actor);
                *executed_at = rewritten(executed_at, actor);
            }
            Operation::Add { parent_created_at, prev_created_at, executed_at, .. } => {
                *parent_created_at = rewritten(parent_created_at, actor);
                *prev_created_at = rewritten(prev_created_at, actor);
                *executed_at = rewritten(executed_at, actor);
            }
            Operation::Move { parent_created_at, prev_created_at, created_at, executed_at } => {
                *parent_created_at = rewritten(parent_created_at, actor);
                *prev_created_at = rewritten(prev_created_at, actor);
                *created_at = rewritten(created_at, actor);
                *executed_at = rewritten(executed_at, actor);
            }
            Operation::Remove { parent_created_at, created_at, executed_at } => {
                *parent_created_at = rewritten(parent_created_at, actor);
                *created_at = rewritten(created_at, actor);
                *executed_at = rewritten(executed_at, actor);
            }
        }
    }

    /// Applies this operation against `root`. Rewrites the root
    /// transactionally from the caller's point of view: on error, the
    /// root may have partially registered a new element but no container
    /// will reference it, so it is unreachable and inert (I1 holds for
    /// every *reachable* element).
    pub fn execute(&self, root: &mut CRDTRoot) -> CrdtResult<()> {
        match self {
            Operation::Set { parent_created_at, key, value, executed_at } => {
                require_object(root, parent_created_at)?;
                let element = value.clone().instantiate();
                let new_id = root.register(Some(parent_created_at.clone()), executed_at.clone(), element);

                let outcome = {
                    let slot = root.get_mut(parent_created_at)?;
                    let obj = slot.value.as_object_mut()
                        .ok_or_else(|| CrdtError::type_mismatch("object", slot.value.type_name()))?;
                    obj.set(key, new_id.clone(), executed_at.clone())
                };

                match outcome {
                    SetOutcome::Inserted => {}
                    SetOutcome::Replaced { superseded } => { root.mark_removed(&superseded, executed_at.clone())?; }
                    SetOutcome::LostTiebreak => { root.mark_removed(&new_id, executed_at.clone())?; }
                }
                log::trace!("applied {}", self.structure_as_string());
                Ok(())
            }

            Operation::Add { parent_created_at, prev_created_at, value, executed_at } => {
                require_array(root, parent_created_at)?;
                let element = value.clone().instantiate();
                let new_id = root.register(Some(parent_created_at.clone()), executed_at.clone(), element);

                let result = {
                    let slot = root.get_mut(parent_created_at)?;
                    let arr = slot.value.as_array_mut()
                        .ok_or_else(|| CrdtError::type_mismatch("array", slot.value.type_name()))?;
                    arr.insert_after(prev_created_at, new_id.clone(), executed_at.clone())
                };
                result?;
                log::trace!("applied {}", self.structure_as_string());
                Ok(())
            }

            Operation::Move { parent_created_at, prev_created_at, created_at, executed_at } => {
                require_array(root, parent_created_at)?;
                let moved = {
                    let slot = root.get_mut(parent_created_at)?;
                    let arr = slot.value.as_array_mut()
                        .ok_or_else(|| CrdtError::type_mismatch("array", slot.value.type_name()))?;
                    arr.move_after(prev_created_at, created_at, executed_at.clone())?
                };
                if moved {
                    root.get_mut(created_at)?.meta.set_moved_at(executed_at.clone());
                } else {
                    log::trace!("stale MOVE ignored: {}", self.structure_as_string());
                }
                Ok(())
            }

            Operation::Remove { parent_created_at, created_at, executed_at } => {
                let removed = {
                    let slot = root.get_mut(parent_created_at)?;
                    match &mut slot.value {
                        CRDTElement::Object(o) => o.remove_child(created_at, executed_at.clone()),
                        CRDTElement::Array(a) => a.remove(created_at, executed_at.clone())?,
                        other => return Err(CrdtError::type_mismatch("object or array", other.type_name())),
                    }
                };
                if removed {
                    root.mark_removed(created_at, executed_at.clone())?;
                } else {
                    log::trace!("stale REMOVE ignored: {}", self.structure_as_string());
                }
                Ok(())
            }
        }
    }
}

fn require_object(root: &CRDTRoot, id: &TimeTicket) -> CrdtResult<()> {
    let slot = root.get(id)?;
    if slot.value.as_object().is_some() { Ok(()) }
    else { Err(CrdtError::type_mismatch("object", slot.value.type_name())) }
}

fn require_array(root: &CRDTRoot, id: &TimeTicket) -> CrdtResult<()> {
    let slot = root.get(id)?;
    if slot.value.as_array().is_some() { Ok(()) }
    else { Err(CrdtError::type_mismatch("array", slot.value.type_name())) }
}
