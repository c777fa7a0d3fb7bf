pub mod allocator;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{AssignmentId, PaymentMode, PaymentSplit, SessionId, StudentId};

pub use allocator::PaymentAllocator;

/// one target within a payment: the amount is consumed late-fee-first,
/// remainder toward principal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaymentAllocation {
    pub assignment_id: AssignmentId,
    pub amount: Money,
}

/// incoming payment, lump against a single assignment or itemized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub student_id: StudentId,
    pub session_id: SessionId,
    pub allocations: Vec<PaymentAllocation>,
    pub mode: PaymentMode,
    pub payment_date: NaiveDate,
}

impl PaymentRequest {
    /// legacy single-assignment payment
    pub fn lump(
        student_id: StudentId,
        session_id: SessionId,
        assignment_id: AssignmentId,
        amount: Money,
        mode: PaymentMode,
        payment_date: NaiveDate,
    ) -> Self {
        Self {
            student_id,
            session_id,
            allocations: vec![PaymentAllocation {
                assignment_id,
                amount,
            }],
            mode,
            payment_date,
        }
    }

    pub fn itemized(
        student_id: StudentId,
        session_id: SessionId,
        allocations: Vec<PaymentAllocation>,
        mode: PaymentMode,
        payment_date: NaiveDate,
    ) -> Self {
        Self {
            student_id,
            session_id,
            allocations,
            mode,
            payment_date,
        }
    }

    pub fn total(&self) -> Money {
        self.allocations.iter().map(|a| a.amount).sum()
    }

    /// shape validation, performed before any read
    pub fn validate(&self) -> Result<()> {
        if self.allocations.is_empty() {
            return Err(LedgerError::InvalidConfiguration {
                message: "payment has no allocations".to_string(),
            });
        }
        for allocation in &self.allocations {
            if !allocation.amount.is_positive() {
                return Err(LedgerError::InvalidAmount {
                    amount: allocation.amount,
                });
            }
        }
        for (i, allocation) in self.allocations.iter().enumerate() {
            if self.allocations[..i]
                .iter()
                .any(|other| other.assignment_id == allocation.assignment_id)
            {
                return Err(LedgerError::InvalidConfiguration {
                    message: format!(
                        "assignment {} targeted more than once",
                        allocation.assignment_id
                    ),
                });
            }
        }
        Ok(())
    }
}

/// persisted payment row with the realized split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub assignment_id: AssignmentId,
    pub student_id: StudentId,
    pub session_id: SessionId,
    pub amount: Money,
    pub split: PaymentSplit,
    pub mode: PaymentMode,
    pub payment_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_amounts(amounts: &[i64]) -> PaymentRequest {
        PaymentRequest::itemized(
            Uuid::new_v4(),
            Uuid::new_v4(),
            amounts
                .iter()
                .map(|&amount| PaymentAllocation {
                    assignment_id: Uuid::new_v4(),
                    amount: Money::from_major(amount),
                })
                .collect(),
            PaymentMode::Cash,
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
        )
    }

    #[test]
    fn test_validate_rejects_empty() {
        let request = request_with_amounts(&[]);
        assert!(matches!(
            request.validate(),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_amounts() {
        let request = request_with_amounts(&[100, 0]);
        assert!(matches!(
            request.validate(),
            Err(LedgerError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_targets() {
        let mut request = request_with_amounts(&[100]);
        let duplicate = request.allocations[0];
        request.allocations.push(duplicate);
        assert!(matches!(
            request.validate(),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_total() {
        let request = request_with_amounts(&[100, 250]);
        assert_eq!(request.total(), Money::from_major(350));
    }
}
