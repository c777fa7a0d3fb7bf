use crate::assignment::FeeAssignment;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

/// validated waiver ready to be written
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaiverApplication {
    pub amount: Money,
    /// outstanding late fee before the waiver
    pub outstanding_before: Money,
}

/// validate a partial or full waiver of outstanding late fee. Pure; the
/// caller persists the result and appends the adjustment record.
pub fn compute_waiver(assignment: &FeeAssignment, amount: Money) -> Result<WaiverApplication> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount { amount });
    }

    let outstanding = assignment.outstanding_late_fee();
    if !outstanding.is_positive() {
        return Err(LedgerError::NoOutstandingLateFee);
    }
    if amount > outstanding {
        return Err(LedgerError::ExceedsWaivableLateFee {
            requested: amount,
            outstanding,
        });
    }

    Ok(WaiverApplication {
        amount,
        outstanding_before: outstanding,
    })
}
