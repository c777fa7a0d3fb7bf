use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{
    AssignmentId, FeeStructureId, LateFeeCap, LateFeePolicy, SessionId, StudentId,
};

/// fee structure template; assignments copy its terms at creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeStructure {
    pub id: FeeStructureId,
    pub name: String,
    pub amount: Money,
    pub due_date: Option<NaiveDate>,
    pub late_fee_policy: LateFeePolicy,
    pub late_fee_grace_days: u32,
    pub late_fee_cap: LateFeeCap,
}

impl FeeStructure {
    pub fn new(name: impl Into<String>, amount: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            amount,
            due_date: None,
            late_fee_policy: LateFeePolicy::None,
            late_fee_grace_days: 0,
            late_fee_cap: LateFeeCap::None,
        }
    }
}

/// one fee assignment per (student, fee structure, session)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeAssignment {
    // identification
    pub id: AssignmentId,
    pub student_id: StudentId,
    pub fee_structure_id: FeeStructureId,
    pub session_id: SessionId,

    // core balances
    pub amount: Money,
    pub total_discount_amount: Money,
    pub sponsor_covered_amount: Money,
    pub principal_paid: Money,
    pub late_fee_paid: Money,
    pub late_fee_accrued: Money,
    pub late_fee_waived: Money,

    // late fee terms, copied from the structure at creation; template
    // edits never change an existing assignment's behavior
    pub late_fee_policy: LateFeePolicy,
    pub late_fee_grace_days: u32,
    pub late_fee_cap: LateFeeCap,
    pub late_fee_applied: bool,

    pub due_date: Option<NaiveDate>,
    pub active: bool,

    /// monotonically increasing stamp for conflict detection on update
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl FeeAssignment {
    /// create a new assignment, value-copying the structure's terms
    pub fn from_structure(
        student_id: StudentId,
        session_id: SessionId,
        structure: &FeeStructure,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            fee_structure_id: structure.id,
            session_id,
            amount: structure.amount,
            total_discount_amount: Money::ZERO,
            sponsor_covered_amount: Money::ZERO,
            principal_paid: Money::ZERO,
            late_fee_paid: Money::ZERO,
            late_fee_accrued: Money::ZERO,
            late_fee_waived: Money::ZERO,
            late_fee_policy: structure.late_fee_policy,
            late_fee_grace_days: structure.late_fee_grace_days,
            late_fee_cap: structure.late_fee_cap,
            late_fee_applied: false,
            due_date: structure.due_date,
            active: true,
            version: 0,
            created_at,
        }
    }

    /// total still owed: gross amount plus accrued late fee, less every
    /// reduction recorded so far; never negative, total over any snapshot
    pub fn pending(&self) -> Money {
        (self.amount + self.late_fee_accrued
            - self.total_discount_amount
            - self.late_fee_waived
            - self.principal_paid
            - self.late_fee_paid)
            .max(Money::ZERO)
    }

    /// accrued late fee not yet paid or waived
    pub fn outstanding_late_fee(&self) -> Money {
        (self.late_fee_accrued - self.late_fee_paid - self.late_fee_waived).max(Money::ZERO)
    }

    /// principal still payable by the student after discounts and coverage
    pub fn pending_principal(&self) -> Money {
        (self.amount
            - self.total_discount_amount
            - self.sponsor_covered_amount
            - self.principal_paid)
            .max(Money::ZERO)
    }

    /// principal not yet paid, the base for late fee accrual
    pub fn unpaid_principal(&self) -> Money {
        (self.amount - self.total_discount_amount - self.principal_paid).max(Money::ZERO)
    }

    pub fn is_settled(&self) -> bool {
        self.pending().is_zero()
    }
}

/// net principal after discount and funding coverage
pub fn net_principal(amount: Money, discount: Money, funding: Money) -> Money {
    (amount - discount - funding).max(Money::ZERO)
}
