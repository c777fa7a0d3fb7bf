use rust_decimal::{Decimal, RoundingStrategy};

use crate::assignment::FeeAssignment;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{DiscountDefinition, DiscountKind, DiscountSnapshot};

/// validated discount ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountApplication {
    /// discount amount to add to the assignment
    pub amount: Money,
    /// pending principal before application
    pub pending_principal: Money,
    /// true when a percentage discount was reduced to the pending principal
    pub clamped: bool,
    /// definition as it read at time of application
    pub snapshot: DiscountSnapshot,
}

/// validate a discount against an assignment snapshot and compute the
/// amount to apply. Pure; the caller persists the result.
///
/// Percentage discounts silently cap at the pending principal; flat
/// discounts that exceed it hard-fail. The asymmetry is intentional and
/// preserved from observed behavior.
pub fn compute_discount(
    assignment: &FeeAssignment,
    definition: &DiscountDefinition,
) -> Result<DiscountApplication> {
    if !definition.active {
        return Err(LedgerError::DiscountInactive { id: definition.id });
    }

    let pending_principal = assignment.pending_principal();
    if !pending_principal.is_positive() {
        return Err(LedgerError::NoPendingPrincipal);
    }

    let (amount, clamped) = match definition.kind {
        DiscountKind::Percentage => {
            // six decimal places of intermediate precision before the
            // final currency rounding
            let raw = (assignment.amount.as_decimal() * definition.value / Decimal::from(100))
                .round_dp_with_strategy(6, RoundingStrategy::MidpointAwayFromZero);
            let computed = Money::from_decimal(raw);
            if computed > pending_principal {
                (pending_principal, true)
            } else {
                (computed, false)
            }
        }
        DiscountKind::Flat => {
            let computed = Money::from_decimal(definition.value);
            if computed > pending_principal {
                return Err(LedgerError::DiscountExceedsPrincipal {
                    discount: computed,
                    pending: pending_principal,
                });
            }
            (computed, false)
        }
    };

    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount { amount });
    }

    Ok(DiscountApplication {
        amount,
        pending_principal,
        clamped,
        snapshot: DiscountSnapshot::of(definition),
    })
}
