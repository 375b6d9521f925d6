use crate::change_context::ChangeContext;
use crate::clock::TimeTicket;
use crate::element::CRDTArray;
use crate::error::{CrdtError, CrdtResult};
use crate::operation::{OpValue, Operation};
use crate::root::CRDTRoot;
use crate::value::Primitive;

/// Dynamic handle over a live `CRDTObject`, handed to a `Document::update`
/// callback (spec §9 — proxy layer). Every mutating method issues a
/// ticket through the context, applies the resulting operation to `root`
/// immediately, and records it — so the callback always observes its own
/// writes. Read accessors type-check without mutating anything: calling
/// `get_string` on a non-string key returns `TypeMismatch`, it never
/// panics or silently coerces.
pub struct ObjectProxy<'a> {
    root: &'a mut CRDTRoot,
    context: &'a mut ChangeContext,
    target: TimeTicket,
}

impl<'a> ObjectProxy<'a> {
    pub(crate) fn new(root: &'a mut CRDTRoot, context: &'a mut ChangeContext, target: TimeTicket) -> Self {
        ObjectProxy { root, context, target }
    }

    fn child(&self, key: &str) -> CrdtResult<TimeTicket> {
        let slot = self.root.get(&self.target)?;
        let obj = slot.value.as_object()
            .ok_or_else(|| CrdtError::type_mismatch("object", slot.value.type_name()))?;
        obj.get(key).ok_or_else(|| CrdtError::not_found(format!("key {key:?}")))
    }

    pub fn has(&self, key: &str) -> CrdtResult<bool> {
        let slot = self.root.get(&self.target)?;
        let obj = slot.value.as_object()
            .ok_or_else(|| CrdtError::type_mismatch("object", slot.value.type_name()))?;
        Ok(obj.has(key))
    }

    pub fn get_primitive(&self, key: &str) -> CrdtResult<&Primitive> {
        let child = self.child(key)?;
        let slot = self.root.get(&child)?;
        slot.value.as_primitive().ok_or_else(|| CrdtError::type_mismatch("primitive", slot.value.type_name()))
    }

    /// Sets `key` to a new primitive value (spec §4.G SET).
    pub fn set(&mut self, key: &str, value: impl Into<Primitive>) -> CrdtResult<()> {
        let executed_at = self.context.issue_time_ticket();
        let op = Operation::Set {
            parent_created_at: self.target.clone(),
            key: key.to_string(),
            value: OpValue::Primitive(value.into()),
            executed_at,
        };
        op.execute(self.root)?;
        self.context.push(op);
        Ok(())
    }

    /// Sets `key` to a new, empty nested object and returns a proxy onto it.
    pub fn set_object(&mut self, key: &str) -> CrdtResult<ObjectProxy<'_>> {
        let executed_at = self.context.issue_time_ticket();
        let op = Operation::Set {
            parent_created_at: self.target.clone(),
            key: key.to_string(),
            value: OpValue::Object,
            executed_at: executed_at.clone(),
        };
        op.execute(self.root)?;
        self.context.push(op);
        Ok(ObjectProxy::new(&mut *self.root, &mut *self.context, executed_at))
    }

    /// Sets `key` to a new, empty nested array and returns a proxy onto it.
    pub fn set_array(&mut self, key: &str) -> CrdtResult<ArrayProxy<'_>> {
        let executed_at = self.context.issue_time_ticket();
        let op = Operation::Set {
            parent_created_at: self.target.clone(),
            key: key.to_string(),
            value: OpValue::Array,
            executed_at: executed_at.clone(),
        };
        op.execute(self.root)?;
        self.context.push(op);
        Ok(ArrayProxy::new(&mut *self.root, &mut *self.context, executed_at))
    }

    /// Resumes editing the existing nested object stored at `key`, as
    /// opposed to `set_object` which always creates a fresh one.
    pub fn object(&mut self, key: &str) -> CrdtResult<ObjectProxy<'_>> {
        let child = self.child(key)?;
        let slot = self.root.get(&child)?;
        if slot.value.as_object().is_none() {
            return Err(CrdtError::type_mismatch("object", slot.value.type_name()));
        }
        Ok(ObjectProxy::new(&mut *self.root, &mut *self.context, child))
    }

    /// Resumes editing the existing nested array stored at `key`, as
    /// opposed to `set_array` which always creates a fresh one.
    pub fn array(&mut self, key: &str) -> CrdtResult<ArrayProxy<'_>> {
        let child = self.child(key)?;
        let slot = self.root.get(&child)?;
        if slot.value.as_array().is_none() {
            return Err(CrdtError::type_mismatch("array", slot.value.type_name()));
        }
        Ok(ArrayProxy::new(&mut *self.root, &mut *self.context, child))
    }

    /// Removes `key` (spec §4.G REMOVE, addressed internally by the
    /// child's createdAt).
    pub fn remove(&mut self, key: &str) -> CrdtResult<()> {
        let created_at = self.child(key)?;
        let executed_at = self.context.issue_time_ticket();
        let op = Operation::Remove { parent_created_at: self.target.clone(), created_at, executed_at };
        op.execute(self.root)?;
        self.context.push(op);
        Ok(())
    }
}

/// Dynamic handle over a live `CRDTArray` (spec §9 — proxy layer).
pub struct ArrayProxy<'a> {
    root: &'a mut CRDTRoot,
    context: &'a mut ChangeContext,
    target: TimeTicket,
}

impl<'a> ArrayProxy<'a> {
    pub(crate) fn new(root: &'a mut CRDTRoot, context: &'a mut ChangeContext, target: TimeTicket) -> Self {
        ArrayProxy { root, context, target }
    }

    fn array(&self) -> CrdtResult<&CRDTArray> {
        let slot = self.root.get(&self.target)?;
        slot.value.as_array().ok_or_else(|| CrdtError::type_mismatch("array", slot.value.type_name()))
    }

    fn last_created_at(&self) -> CrdtResult<TimeTicket> {
        Ok(self.array()?.iter_live().last().cloned().unwrap_or_else(CRDTArray::head))
    }

    fn nth_created_at(&self, index: usize) -> CrdtResult<TimeTicket> {
        self.array()?.get_by_index(index).ok_or_else(|| CrdtError::not_found(format!("index {index}")))
    }

    pub fn len(&self) -> CrdtResult<usize> {
        Ok(self.array()?.len())
    }

    pub fn is_empty(&self) -> CrdtResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Appends a primitive value at the end of the array (spec §4.G ADD).
    pub fn push(&mut self, value: impl Into<Primitive>) -> CrdtResult<()> {
        let prev_created_at = self.last_created_at()?;
        let executed_at = self.context.issue_time_ticket();
        let op = Operation::Add {
            parent_created_at: self.target.clone(),
            prev_created_at,
            value: OpValue::Primitive(value.into()),
            executed_at,
        };
        op.execute(self.root)?;
        self.context.push(op);
        Ok(())
    }

    /// Appends a new, empty nested object and returns a proxy onto it.
    pub fn push_object(&mut self) -> CrdtResult<ObjectProxy<'_>> {
        let prev_created_at = self.last_created_at()?;
        let executed_at = self.context.issue_time_ticket();
        let op = Operation::Add {
            parent_created_at: self.target.clone(),
            prev_created_at,
            value: OpValue::Object,
            executed_at: executed_at.clone(),
        };
        op.execute(self.root)?;
        self.context.push(op);
        Ok(ObjectProxy::new(&mut *self.root, &mut *self.context, executed_at))
    }

    /// Appends a new, empty nested array and returns a proxy onto it.
    pub fn push_array(&mut self) -> CrdtResult<ArrayProxy<'_>> {
        let prev_created_at = self.last_created_at()?;
        let executed_at = self.context.issue_time_ticket();
        let op = Operation::Add {
            parent_created_at: self.target.clone(),
            prev_created_at,
            value: OpValue::Array,
            executed_at: executed_at.clone(),
        };
        op.execute(self.root)?;
        self.context.push(op);
        Ok(ArrayProxy::new(&mut *self.root, &mut *self.context, executed_at))
    }

    /// Removes the live element currently at `index` (spec §4.G REMOVE).
    pub fn remove(&mut self, index: usize) -> CrdtResult<()> {
        let created_at = self.nth_created_at(index)?;
        let executed_at = self.context.issue_time_ticket();
        let op = Operation::Remove { parent_created_at: self.target.clone(), created_at, executed_at };
        op.execute(self.root)?;
        self.context.push(op);
        Ok(())
    }

    /// Moves the live element at `from` to sit immediately after the
    /// element at `to` (spec §4.G MOVE; `to == 0` moves to the front).
    pub fn move_to(&mut self, from: usize, to: usize) -> CrdtResult<()> {
        let created_at = self.nth_created_at(from)?;
        let prev_created_at = if to == 0 { CRDTArray::head() } else { self.nth_created_at(to - 1)? };
        let executed_at = self.context.issue_time_ticket();
        let op = Operation::Move { parent_created_at: self.target.clone(), prev_created_at, created_at, executed_at };
        op.execute(self.root)?;
        self.context.push(op);
        Ok(())
    }
}
