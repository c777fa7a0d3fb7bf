use chrono::{DateTime, Utc};
use log::{debug, error};
use uuid::Uuid;

use crate::assignment::FeeAssignment;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::late_fee::{accrual_increment, LateFeeCalculation};
use crate::store::LedgerStore;
use crate::types::PaymentSplit;

use super::{PaymentAllocation, PaymentRecord, PaymentRequest};

/// outcome of one committed version-checked cycle
struct AppliedAllocation {
    pre_image: FeeAssignment,
    post: FeeAssignment,
    accrual: LateFeeCalculation,
    record: PaymentRecord,
}

/// applies incoming payments late-fee-first under optimistic concurrency
pub struct PaymentAllocator<'a, S: LedgerStore> {
    store: &'a S,
}

impl<'a, S: LedgerStore> PaymentAllocator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// process a payment request.
    ///
    /// Each targeted assignment runs one read-compute-conditional-write
    /// cycle. A version mismatch is surfaced as `ConcurrencyConflict`,
    /// never silently retried. Targets are all-or-nothing: if any cycle
    /// fails, assignments already updated are rolled back to their
    /// pre-payment balances and no payment record is appended.
    pub fn process(
        &self,
        request: &PaymentRequest,
        recorded_at: DateTime<Utc>,
        events: &mut EventStore,
    ) -> Result<Vec<PaymentRecord>> {
        request.validate()?;

        let mut applied: Vec<AppliedAllocation> = Vec::with_capacity(request.allocations.len());
        for allocation in &request.allocations {
            match self.apply_one(request, allocation, recorded_at) {
                Ok(outcome) => applied.push(outcome),
                Err(err) => {
                    self.roll_back(&applied);
                    return Err(err);
                }
            }
        }

        // balances committed on every target; persist audit rows
        let mut records = Vec::with_capacity(applied.len());
        for outcome in applied {
            self.store.append_payment(outcome.record.clone())?;

            if outcome.accrual.increment.is_positive() {
                events.emit(Event::LateFeeAccrued {
                    assignment_id: outcome.post.id,
                    amount: outcome.accrual.increment,
                    days_late: outcome.accrual.days_late,
                    timestamp: recorded_at,
                });
            }
            events.emit(Event::PaymentReceived {
                assignment_id: outcome.post.id,
                amount: outcome.record.amount,
                split: outcome.record.split,
                payment_date: outcome.record.payment_date,
                timestamp: recorded_at,
            });
            if outcome.post.is_settled() {
                events.emit(Event::AssignmentSettled {
                    assignment_id: outcome.post.id,
                    timestamp: recorded_at,
                });
            }
            records.push(outcome.record);
        }
        Ok(records)
    }

    fn apply_one(
        &self,
        request: &PaymentRequest,
        allocation: &PaymentAllocation,
        recorded_at: DateTime<Utc>,
    ) -> Result<AppliedAllocation> {
        let pre_image = self.store.find_assignment(allocation.assignment_id)?;
        if pre_image.student_id != request.student_id || pre_image.session_id != request.session_id
        {
            // do not reveal other tenants' assignments
            return Err(LedgerError::AssignmentNotFound {
                id: allocation.assignment_id,
            });
        }
        if !pre_image.active {
            return Err(LedgerError::AssignmentInactive { id: pre_image.id });
        }

        let mut updated = pre_image.clone();

        // accrue late fee as of the payment date, within the same cycle
        let accrual = accrual_increment(&updated, request.payment_date);
        if accrual.increment.is_positive() {
            updated.late_fee_accrued += accrual.increment;
            if updated.late_fee_policy.charges_once() {
                updated.late_fee_applied = true;
            }
        }

        if updated.pending().is_zero() {
            return Err(LedgerError::NothingDue { id: updated.id });
        }

        // late fee first, remainder toward principal
        let outstanding_late_fee = updated.outstanding_late_fee();
        let late_fee_portion = allocation.amount.min(outstanding_late_fee);
        let principal_portion = allocation.amount - late_fee_portion;

        let pending_principal = updated.pending_principal();
        if principal_portion > pending_principal {
            return Err(LedgerError::Overpayment {
                requested: allocation.amount,
                pending: outstanding_late_fee + pending_principal,
            });
        }

        updated.late_fee_paid += late_fee_portion;
        updated.principal_paid += principal_portion;

        let new_version = self.store.update_assignment(&updated, pre_image.version)?;
        updated.version = new_version;
        debug!(
            "payment allocation on {}: late fee {}, principal {}",
            updated.id, late_fee_portion, principal_portion
        );

        let record = PaymentRecord {
            id: Uuid::new_v4(),
            assignment_id: updated.id,
            student_id: request.student_id,
            session_id: request.session_id,
            amount: allocation.amount,
            split: PaymentSplit {
                late_fee: late_fee_portion,
                principal: principal_portion,
            },
            mode: request.mode,
            payment_date: request.payment_date,
            recorded_at,
        };

        Ok(AppliedAllocation {
            pre_image,
            post: updated,
            accrual,
            record,
        })
    }

    /// compensating rollback of already-updated assignments, conditioned
    /// on the version our own write produced
    fn roll_back(&self, applied: &[AppliedAllocation]) {
        for outcome in applied.iter().rev() {
            let restore = outcome.pre_image.clone();
            if let Err(err) = self.store.update_assignment(&restore, outcome.post.version) {
                // a third writer slipped in; surface loudly, the caller
                // already sees the original failure
                error!(
                    "rollback of assignment {} failed after partial payment: {}",
                    restore.id, err
                );
            }
        }
    }
}
