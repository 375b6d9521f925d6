use crate::change::Change;
use crate::clock::{ChangeID, TimeTicket};
use crate::operation::Operation;

/// Transient buffer scoped to a single `Document::update` call (spec §4.I).
/// Issues strictly monotone tickets for every operation synthesized while
/// the callback runs, then yields an immutable `Change` once it returns.
pub struct ChangeContext {
    id: ChangeID,
    delimiter: u32,
    operations: Vec<Operation>,
    message: Option<String>,
}

impl ChangeContext {
    pub fn new(id: ChangeID, message: Option<String>) -> Self {
        ChangeContext { id, delimiter: 0, operations: Vec::new(), message }
    }

    pub fn id(&self) -> &ChangeID {
        &self.id
    }

    /// Produces `(lamport, delimiter++, actor)`, strictly monotone within
    /// this context (spec §4.I). The lamport component is fixed for the
    /// whole context — ordering among this context's own tickets comes
    /// from the delimiter, matching `TimeTicket::compare`'s tie-break.
    pub fn issue_time_ticket(&mut self) -> TimeTicket {
        let ticket = TimeTicket::new(self.id.lamport(), self.delimiter, self.id.actor_id().clone());
        self.delimiter += 1;
        ticket
    }

    pub fn push(&mut self, op: Operation) {
        self.operations.push(op);
    }

    pub fn has_operations(&self) -> bool {
        !self.operations.is_empty()
    }

    pub fn operations_len(&self) -> usize {
        self.operations.len()
    }

    /// Yields the immutable `Change` this context accumulated, consuming it.
    pub fn get_change(self) -> Change {
        Change::new(self.id, self.operations, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorID;

    #[test]
    fn issued_tickets_strictly_increase() {
        let mut ctx = ChangeContext::new(ChangeID::initial(ActorID::from("a")).next(), None);
        let t1 = ctx.issue_time_ticket();
        let t2 = ctx.issue_time_ticket();
        assert!(t2.after(&t1));
    }

    #[test]
    fn has_operations_reflects_pushes() {
        let mut ctx = ChangeContext::new(ChangeID::initial(ActorID::from("a")).next(), None);
        assert!(!ctx.has_operations());
        let executed_at = ctx.issue_time_ticket();
        ctx.push(Operation::Remove {
            parent_created_at: TimeTicket::initial(),
            created_at: TimeTicket::initial(),
            executed_at,
        });
        assert!(ctx.has_operations());
        assert_eq!(ctx.operations_len(), 1);
    }
}
