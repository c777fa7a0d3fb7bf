use std::sync::Mutex;

use chrono::NaiveDate;
use hourglass_rs::{SafeTimeProvider, TimeSource};
use log::{info, warn};
use uuid::Uuid;

use crate::assignment::{FeeAssignment, FeeStructure};
use crate::decimal::Money;
use crate::discount::compute_discount;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::funding::{recompute_coverage, FundingArrangement};
use crate::late_fee::accrual_increment;
use crate::payments::{PaymentAllocator, PaymentRecord, PaymentRequest};
use crate::store::LedgerStore;
use crate::types::{
    ActorId, AdjustmentKind, AssignmentId, DiscountDefinition, DiscountId, FeeAdjustment,
    SessionId, StudentId,
};
use crate::waiver::compute_waiver;

/// collaborator-facing fee ledger.
///
/// Every mutating operation is one read-compute-conditional-write cycle
/// against the store; a losing writer surfaces `ConcurrencyConflict` and
/// leaves stored state untouched. Methods take `&self`, so one ledger can
/// be shared across request threads.
pub struct FeeLedger<S: LedgerStore> {
    store: S,
    time: SafeTimeProvider,
    events: Mutex<EventStore>,
}

impl<S: LedgerStore> FeeLedger<S> {
    /// create a ledger on system time
    pub fn new(store: S) -> Self {
        Self::with_time(store, SafeTimeProvider::new(TimeSource::System))
    }

    /// create a ledger with an explicit time source
    pub fn with_time(store: S, time: SafeTimeProvider) -> Self {
        Self {
            store,
            time,
            events: Mutex::new(EventStore::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn emit(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .emit(event);
    }

    /// drain events collected since the last call
    pub fn take_events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take_events()
    }

    /// create an assignment from a structure, value-copying its terms
    pub fn assign_fee(
        &self,
        student_id: StudentId,
        session_id: SessionId,
        structure: &FeeStructure,
    ) -> Result<FeeAssignment> {
        let now = self.time.now();
        let mut assignment = FeeAssignment::from_structure(student_id, session_id, structure, now);

        // seed coverage when an arrangement already applies
        if let Some(arrangement) = self.store.find_active_funding(student_id, session_id)? {
            if arrangement.covers_on(now.date_naive()) {
                assignment.sponsor_covered_amount =
                    recompute_coverage(&assignment, Some(&arrangement));
            }
        }

        self.store.insert_assignment(assignment.clone())?;
        info!(
            "assigned structure {} to student {} in session {}",
            structure.id, student_id, session_id
        );
        self.emit(Event::AssignmentCreated {
            assignment_id: assignment.id,
            student_id,
            session_id,
            amount: assignment.amount,
            timestamp: now,
        });
        Ok(assignment)
    }

    /// apply a named discount to an assignment's outstanding principal
    pub fn apply_discount(
        &self,
        assignment_id: AssignmentId,
        discount_id: DiscountId,
        reason: impl Into<String>,
        actor_id: ActorId,
    ) -> Result<FeeAssignment> {
        let now = self.time.now();
        let assignment = self.store.find_assignment(assignment_id)?;
        if !assignment.active {
            return Err(LedgerError::AssignmentInactive { id: assignment_id });
        }
        let definition = self.store.find_discount(discount_id)?;

        let application = compute_discount(&assignment, &definition)?;

        let mut updated = assignment.clone();
        updated.total_discount_amount += application.amount;

        // the taxable base changed; recompute sponsor coverage
        let old_coverage = updated.sponsor_covered_amount;
        let arrangement = self
            .store
            .find_active_funding(updated.student_id, updated.session_id)?
            .filter(|arrangement| arrangement.covers_on(now.date_naive()));
        updated.sponsor_covered_amount = recompute_coverage(&updated, arrangement.as_ref());

        // re-verify before writing: pending principal must stay >= 0
        let residual = updated.amount
            - updated.total_discount_amount
            - updated.sponsor_covered_amount
            - updated.principal_paid;
        if residual.is_negative() {
            return Err(LedgerError::DiscountExceedsPrincipal {
                discount: application.amount,
                pending: application.pending_principal,
            });
        }

        let new_version = self.store.update_assignment(&updated, assignment.version)?;
        updated.version = new_version;

        self.store.append_adjustment(FeeAdjustment {
            id: Uuid::new_v4(),
            assignment_id,
            kind: AdjustmentKind::Discount,
            amount: application.amount,
            reason: reason.into(),
            actor_id,
            discount: Some(application.snapshot.clone()),
            created_at: now,
        })?;

        self.emit(Event::DiscountApplied {
            assignment_id,
            amount: application.amount,
            discount_name: application.snapshot.name.clone(),
            timestamp: now,
        });
        if updated.sponsor_covered_amount != old_coverage {
            self.emit(Event::FundingCoverageRecalculated {
                assignment_id,
                old_coverage,
                new_coverage: updated.sponsor_covered_amount,
                timestamp: now,
            });
        }
        Ok(updated)
    }

    /// waive part or all of an assignment's outstanding late fee
    pub fn waive_late_fee(
        &self,
        assignment_id: AssignmentId,
        amount: Money,
        reason: impl Into<String>,
        actor_id: ActorId,
    ) -> Result<FeeAssignment> {
        let now = self.time.now();
        let assignment = self.store.find_assignment(assignment_id)?;
        if !assignment.active {
            return Err(LedgerError::AssignmentInactive { id: assignment_id });
        }

        let application = compute_waiver(&assignment, amount)?;

        let mut updated = assignment.clone();
        updated.late_fee_waived += application.amount;

        let new_version = self.store.update_assignment(&updated, assignment.version)?;
        updated.version = new_version;

        self.store.append_adjustment(FeeAdjustment {
            id: Uuid::new_v4(),
            assignment_id,
            kind: AdjustmentKind::LateFeeWaiver,
            amount: application.amount,
            reason: reason.into(),
            actor_id,
            discount: None,
            created_at: now,
        })?;

        self.emit(Event::LateFeeWaived {
            assignment_id,
            amount: application.amount,
            remaining_outstanding: updated.outstanding_late_fee(),
            timestamp: now,
        });
        Ok(updated)
    }

    /// process a payment; all targets succeed or none do
    pub fn pay(&self, request: PaymentRequest) -> Result<Vec<PaymentRecord>> {
        let allocator = PaymentAllocator::new(&self.store);
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        allocator.process(&request, self.time.now(), &mut events)
    }

    /// total still owed on an assignment; never mutates stored state
    pub fn get_pending(&self, assignment_id: AssignmentId) -> Result<Money> {
        Ok(self.store.find_assignment(assignment_id)?.pending())
    }

    /// late fee that would accrue as of a date; never mutates stored state
    pub fn preview_late_fee(&self, assignment_id: AssignmentId, as_of: NaiveDate) -> Result<Money> {
        let assignment = self.store.find_assignment(assignment_id)?;
        Ok(accrual_increment(&assignment, as_of).increment)
    }

    /// soft-delete an assignment (e.g., on student withdrawal)
    pub fn deactivate_assignment(&self, assignment_id: AssignmentId) -> Result<FeeAssignment> {
        let now = self.time.now();
        let assignment = self.store.find_assignment(assignment_id)?;
        if !assignment.active {
            return Ok(assignment);
        }

        let mut updated = assignment.clone();
        updated.active = false;
        let new_version = self.store.update_assignment(&updated, assignment.version)?;
        updated.version = new_version;

        self.emit(Event::AssignmentDeactivated {
            assignment_id,
            timestamp: now,
        });
        Ok(updated)
    }

    pub fn add_discount_definition(&self, definition: DiscountDefinition) -> Result<()> {
        self.store.insert_discount(definition)
    }

    /// register a funding arrangement and refresh coverage on the
    /// student's active assignments in the session
    pub fn add_funding_arrangement(&self, arrangement: FundingArrangement) -> Result<()> {
        let now = self.time.now();
        self.store.insert_funding(arrangement.clone())?;
        if !arrangement.covers_on(now.date_naive()) {
            return Ok(());
        }

        for assignment in self
            .store
            .assignments_for(arrangement.student_id, arrangement.session_id)?
        {
            if !assignment.active {
                continue;
            }
            let new_coverage = recompute_coverage(&assignment, Some(&arrangement));
            if new_coverage == assignment.sponsor_covered_amount {
                continue;
            }
            let mut updated = assignment.clone();
            updated.sponsor_covered_amount = new_coverage;
            if let Err(err) = self.store.update_assignment(&updated, assignment.version) {
                warn!(
                    "coverage refresh on assignment {} lost to a concurrent write: {}",
                    assignment.id, err
                );
                return Err(err);
            }
            self.emit(Event::FundingCoverageRecalculated {
                assignment_id: assignment.id,
                old_coverage: assignment.sponsor_covered_amount,
                new_coverage,
                timestamp: now,
            });
        }
        Ok(())
    }
}
