use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assignment::FeeAssignment;
use crate::decimal::{Money, Rate};
use crate::types::{SessionId, StudentId};

/// how much of the fee a sponsor covers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Coverage {
    /// covers the full post-discount base
    Full,
    Partial(PartialCoverage),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PartialCoverage {
    FixedAmount(Money),
    Percentage(Rate),
}

/// sponsorship/funding arrangement; at most one active per (student, session)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingArrangement {
    pub id: Uuid,
    pub student_id: StudentId,
    pub session_id: SessionId,
    pub coverage: Coverage,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub active: bool,
}

impl FundingArrangement {
    pub fn new(student_id: StudentId, session_id: SessionId, coverage: Coverage) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            session_id,
            coverage,
            valid_from: None,
            valid_to: None,
            active: true,
        }
    }

    /// whether the arrangement applies on the given date
    pub fn covers_on(&self, date: NaiveDate) -> bool {
        if !self.active {
            return false;
        }
        if let Some(from) = self.valid_from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.valid_to {
            if date > to {
                return false;
            }
        }
        true
    }

    /// covered amount for a post-discount base, never exceeding the base
    pub fn coverage_for(&self, base: Money) -> Money {
        match self.coverage {
            Coverage::Full => base,
            Coverage::Partial(PartialCoverage::FixedAmount(fixed)) => fixed.min(base),
            Coverage::Partial(PartialCoverage::Percentage(rate)) => {
                base.percentage(rate).min(base)
            }
        }
    }
}

/// recompute `sponsor_covered_amount` after the taxable base (amount minus
/// discount) changed. With no applicable arrangement the current value is
/// kept: coverage set directly at assignment creation is not erased by the
/// absence of an arrangement record.
pub fn recompute_coverage(
    assignment: &FeeAssignment,
    arrangement: Option<&FundingArrangement>,
) -> Money {
    match arrangement {
        Some(arrangement) => {
            let base = (assignment.amount - assignment.total_discount_amount).max(Money::ZERO);
            arrangement.coverage_for(base)
        }
        None => assignment.sponsor_covered_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::FeeStructure;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn assignment_with_discount(amount: i64, discount: i64) -> FeeAssignment {
        let structure = FeeStructure::new("Tuition", Money::from_major(amount));
        let mut a =
            FeeAssignment::from_structure(Uuid::new_v4(), Uuid::new_v4(), &structure, Utc::now());
        a.total_discount_amount = Money::from_major(discount);
        a
    }

    fn arrangement(coverage: Coverage) -> FundingArrangement {
        FundingArrangement::new(Uuid::new_v4(), Uuid::new_v4(), coverage)
    }

    #[test]
    fn test_full_coverage_tracks_post_discount_base() {
        let a = assignment_with_discount(1_000, 300);
        let f = arrangement(Coverage::Full);
        assert_eq!(recompute_coverage(&a, Some(&f)), Money::from_major(700));
    }

    #[test]
    fn test_fixed_coverage_capped_at_base() {
        let a = assignment_with_discount(1_000, 800);
        let f = arrangement(Coverage::Partial(PartialCoverage::FixedAmount(
            Money::from_major(500),
        )));
        // base is 200, fixed 500 caps there
        assert_eq!(recompute_coverage(&a, Some(&f)), Money::from_major(200));
    }

    #[test]
    fn test_percentage_coverage() {
        let a = assignment_with_discount(1_000, 200);
        let f = arrangement(Coverage::Partial(PartialCoverage::Percentage(
            Rate::from_percent(dec!(25)),
        )));
        assert_eq!(recompute_coverage(&a, Some(&f)), Money::from_major(200));
    }

    #[test]
    fn test_absent_arrangement_keeps_current_coverage() {
        let mut a = assignment_with_discount(1_000, 0);
        a.sponsor_covered_amount = Money::from_major(150);
        assert_eq!(recompute_coverage(&a, None), Money::from_major(150));
    }

    #[test]
    fn test_validity_window() {
        let mut f = arrangement(Coverage::Full);
        f.valid_from = Some(NaiveDate::from_ymd_opt(2024, 9, 1).unwrap());
        f.valid_to = Some(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());

        assert!(f.covers_on(NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()));
        assert!(f.covers_on(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()));
        assert!(!f.covers_on(NaiveDate::from_ymd_opt(2024, 8, 31).unwrap()));
        assert!(!f.covers_on(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()));

        f.active = false;
        assert!(!f.covers_on(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()));
    }
}
