use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};

/// unique identifier for a fee assignment
pub type AssignmentId = Uuid;

/// unique identifier for a student
pub type StudentId = Uuid;

/// unique identifier for an enrollment session
pub type SessionId = Uuid;

/// unique identifier for a fee structure template
pub type FeeStructureId = Uuid;

/// unique identifier for a discount definition
pub type DiscountId = Uuid;

/// unique identifier for an actor (staff user) recorded on adjustments
pub type ActorId = Uuid;

/// late fee policy, value-copied onto each assignment at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LateFeePolicy {
    /// no late fee ever accrues
    #[default]
    None,
    /// a one-time flat charge
    Flat { value: Money },
    /// a one-time charge as a percentage of unpaid principal
    Percentage { rate: Rate },
    /// recurring: unpaid principal x rate x days late
    DailyPercentage { rate: Rate },
}

impl LateFeePolicy {
    /// flat and percentage policies charge at most once
    pub fn charges_once(&self) -> bool {
        matches!(self, LateFeePolicy::Flat { .. } | LateFeePolicy::Percentage { .. })
    }
}

/// cap on accrued late fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LateFeeCap {
    /// no clamp
    #[default]
    None,
    /// clamp to a fixed amount
    Fixed(Money),
    /// clamp to a percentage of unpaid principal
    Percentage(Rate),
}

impl LateFeeCap {
    /// clamp an amount against this cap for the given unpaid principal base
    pub fn clamp(&self, amount: Money, unpaid_principal: Money) -> Money {
        match self {
            LateFeeCap::None => amount,
            LateFeeCap::Fixed(cap) => amount.min(*cap),
            LateFeeCap::Percentage(rate) => amount.min(unpaid_principal.percentage(*rate)),
        }
    }
}

/// how a discount definition computes its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountKind {
    Flat,
    Percentage,
}

/// a named discount definition; `value` is a currency amount for flat
/// discounts and a percentage figure for percentage discounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountDefinition {
    pub id: DiscountId,
    pub name: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub active: bool,
}

/// denormalized copy of a discount definition at time of application,
/// so later edits or deletion of the definition do not corrupt history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountSnapshot {
    pub name: String,
    pub kind: DiscountKind,
    pub value: Decimal,
}

impl DiscountSnapshot {
    pub fn of(definition: &DiscountDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            kind: definition.kind,
            value: definition.value,
        }
    }
}

/// kind of an immutable adjustment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentKind {
    Discount,
    LateFeeWaiver,
}

/// immutable audit row for discounts and waivers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeAdjustment {
    pub id: Uuid,
    pub assignment_id: AssignmentId,
    pub kind: AdjustmentKind,
    pub amount: Money,
    pub reason: String,
    pub actor_id: ActorId,
    pub discount: Option<DiscountSnapshot>,
    pub created_at: DateTime<Utc>,
}

/// how a payment was tendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    Cash,
    Card,
    BankTransfer,
    Online,
}

/// realized late-fee/principal split of one payment allocation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PaymentSplit {
    pub late_fee: Money,
    pub principal: Money,
}

impl PaymentSplit {
    pub fn total(&self) -> Money {
        self.late_fee + self.principal
    }
}
