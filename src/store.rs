use std::sync::Mutex;

use dashmap::DashMap;

use crate::assignment::FeeAssignment;
use crate::errors::{LedgerError, Result};
use crate::funding::FundingArrangement;
use crate::payments::PaymentRecord;
use crate::types::{
    AssignmentId, DiscountDefinition, DiscountId, FeeAdjustment, FeeStructureId, SessionId,
    StudentId,
};

/// balance-mutation contract the engines run against.
///
/// Three obligations: hand out assignment snapshots with their version
/// stamp, persist an updated assignment only if the stored version still
/// matches the one read (atomically, bumping it), and append immutable
/// audit rows. Everything else is lookup.
pub trait LedgerStore: Send + Sync {
    /// insert a new assignment; rejects a duplicate
    /// (student, structure, session) triple
    fn insert_assignment(&self, assignment: FeeAssignment) -> Result<()>;

    /// snapshot of an assignment with its current version
    fn find_assignment(&self, id: AssignmentId) -> Result<FeeAssignment>;

    /// all assignments for a student in a session
    fn assignments_for(&self, student_id: StudentId, session_id: SessionId)
        -> Result<Vec<FeeAssignment>>;

    /// conditional write: succeeds only if the stored version still equals
    /// `expected_version`, bumping it; returns the new version
    fn update_assignment(&self, updated: &FeeAssignment, expected_version: u64) -> Result<u64>;

    fn append_adjustment(&self, adjustment: FeeAdjustment) -> Result<()>;
    fn adjustments_for(&self, assignment_id: AssignmentId) -> Result<Vec<FeeAdjustment>>;

    fn append_payment(&self, record: PaymentRecord) -> Result<()>;
    fn payments_for(&self, assignment_id: AssignmentId) -> Result<Vec<PaymentRecord>>;

    fn insert_discount(&self, definition: DiscountDefinition) -> Result<()>;
    fn find_discount(&self, id: DiscountId) -> Result<DiscountDefinition>;

    /// insert a funding arrangement, enforcing at most one active
    /// arrangement per (student, session)
    fn insert_funding(&self, arrangement: FundingArrangement) -> Result<()>;
    fn find_active_funding(
        &self,
        student_id: StudentId,
        session_id: SessionId,
    ) -> Result<Option<FundingArrangement>>;
}

/// concurrent in-memory store; the version check in `update_assignment`
/// is atomic per assignment
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    assignments: DashMap<AssignmentId, FeeAssignment>,
    assignment_keys: DashMap<(StudentId, FeeStructureId, SessionId), AssignmentId>,
    adjustments: Mutex<Vec<FeeAdjustment>>,
    payments: Mutex<Vec<PaymentRecord>>,
    discounts: DashMap<DiscountId, DiscountDefinition>,
    funding: Mutex<Vec<FundingArrangement>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_recovering<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn insert_assignment(&self, assignment: FeeAssignment) -> Result<()> {
        let key = (
            assignment.student_id,
            assignment.fee_structure_id,
            assignment.session_id,
        );
        match self.assignment_keys.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(LedgerError::DuplicateAssignment {
                student_id: assignment.student_id,
                fee_structure_id: assignment.fee_structure_id,
                session_id: assignment.session_id,
            }),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(assignment.id);
                self.assignments.insert(assignment.id, assignment);
                Ok(())
            }
        }
    }

    fn find_assignment(&self, id: AssignmentId) -> Result<FeeAssignment> {
        self.assignments
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(LedgerError::AssignmentNotFound { id })
    }

    fn assignments_for(
        &self,
        student_id: StudentId,
        session_id: SessionId,
    ) -> Result<Vec<FeeAssignment>> {
        Ok(self
            .assignments
            .iter()
            .filter(|entry| entry.student_id == student_id && entry.session_id == session_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn update_assignment(&self, updated: &FeeAssignment, expected_version: u64) -> Result<u64> {
        let mut entry = self
            .assignments
            .get_mut(&updated.id)
            .ok_or(LedgerError::AssignmentNotFound { id: updated.id })?;
        if entry.version != expected_version {
            return Err(LedgerError::ConcurrencyConflict { id: updated.id });
        }
        let new_version = expected_version + 1;
        let mut stored = updated.clone();
        stored.version = new_version;
        *entry = stored;
        Ok(new_version)
    }

    fn append_adjustment(&self, adjustment: FeeAdjustment) -> Result<()> {
        Self::lock_recovering(&self.adjustments).push(adjustment);
        Ok(())
    }

    fn adjustments_for(&self, assignment_id: AssignmentId) -> Result<Vec<FeeAdjustment>> {
        Ok(Self::lock_recovering(&self.adjustments)
            .iter()
            .filter(|adjustment| adjustment.assignment_id == assignment_id)
            .cloned()
            .collect())
    }

    fn append_payment(&self, record: PaymentRecord) -> Result<()> {
        Self::lock_recovering(&self.payments).push(record);
        Ok(())
    }

    fn payments_for(&self, assignment_id: AssignmentId) -> Result<Vec<PaymentRecord>> {
        Ok(Self::lock_recovering(&self.payments)
            .iter()
            .filter(|record| record.assignment_id == assignment_id)
            .cloned()
            .collect())
    }

    fn insert_discount(&self, definition: DiscountDefinition) -> Result<()> {
        self.discounts.insert(definition.id, definition);
        Ok(())
    }

    fn find_discount(&self, id: DiscountId) -> Result<DiscountDefinition> {
        self.discounts
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(LedgerError::DiscountNotFound { id })
    }

    fn insert_funding(&self, arrangement: FundingArrangement) -> Result<()> {
        let mut funding = Self::lock_recovering(&self.funding);
        if arrangement.active
            && funding.iter().any(|existing| {
                existing.active
                    && existing.student_id == arrangement.student_id
                    && existing.session_id == arrangement.session_id
            })
        {
            return Err(LedgerError::DuplicateFundingArrangement {
                student_id: arrangement.student_id,
                session_id: arrangement.session_id,
            });
        }
        funding.push(arrangement);
        Ok(())
    }

    fn find_active_funding(
        &self,
        student_id: StudentId,
        session_id: SessionId,
    ) -> Result<Option<FundingArrangement>> {
        Ok(Self::lock_recovering(&self.funding)
            .iter()
            .find(|arrangement| {
                arrangement.active
                    && arrangement.student_id == student_id
                    && arrangement.session_id == session_id
            })
            .cloned())
    }
}
