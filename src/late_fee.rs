use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::assignment::FeeAssignment;
use crate::decimal::Money;
use crate::types::LateFeePolicy;

/// late fee calculation result
#[derive(Debug, Clone, PartialEq)]
pub struct LateFeeCalculation {
    /// increment to add to the accrued late fee (possibly zero)
    pub increment: Money,
    /// days past the grace window
    pub days_late: u32,
    /// unpaid principal the charge was computed on
    pub unpaid_base: Money,
    /// true when the reference date fell inside the grace window
    pub grace_applied: bool,
}

impl LateFeeCalculation {
    fn zero(unpaid_base: Money, grace_applied: bool) -> Self {
        Self {
            increment: Money::ZERO,
            days_late: 0,
            unpaid_base,
            grace_applied,
        }
    }
}

/// compute the late fee increment to accrue on an assignment as of a date.
///
/// Pure calculation; the caller persists the increment and, for policies
/// that charge once, sets `late_fee_applied` atomically with the write.
/// Repeated calls on the same date are no-ops for every policy: flat and
/// percentage are guarded by `late_fee_applied`, daily percentage computes
/// the total accrued-as-of-date and subtracts what is already recorded.
pub fn accrual_increment(assignment: &FeeAssignment, as_of: NaiveDate) -> LateFeeCalculation {
    let unpaid = assignment.unpaid_principal();

    if matches!(assignment.late_fee_policy, LateFeePolicy::None) {
        return LateFeeCalculation::zero(unpaid, false);
    }
    let due_date = match assignment.due_date {
        Some(d) => d,
        None => return LateFeeCalculation::zero(unpaid, false),
    };

    let grace_end = due_date + Duration::days(assignment.late_fee_grace_days as i64);
    if as_of <= grace_end {
        return LateFeeCalculation::zero(unpaid, true);
    }
    if !unpaid.is_positive() {
        return LateFeeCalculation::zero(unpaid, false);
    }

    let days_late = (as_of - grace_end).num_days() as u32;
    let cap = assignment.late_fee_cap;

    let increment = match assignment.late_fee_policy {
        LateFeePolicy::None => Money::ZERO,
        LateFeePolicy::Flat { value } => {
            if assignment.late_fee_applied {
                Money::ZERO
            } else {
                cap.clamp(value, unpaid)
            }
        }
        LateFeePolicy::Percentage { rate } => {
            if assignment.late_fee_applied {
                Money::ZERO
            } else {
                cap.clamp(unpaid.percentage(rate), unpaid)
            }
        }
        LateFeePolicy::DailyPercentage { rate } => {
            // cap applies to the accrued total, not the increment
            let total = Money::from_decimal(
                unpaid.as_decimal() * rate.as_decimal() * Decimal::from(days_late),
            );
            cap.clamp(total, unpaid) - assignment.late_fee_accrued
        }
    };

    LateFeeCalculation {
        increment: increment.max(Money::ZERO),
        days_late,
        unpaid_base: unpaid,
        grace_applied: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::FeeStructure;
    use crate::decimal::Rate;
    use crate::types::LateFeeCap;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn overdue_assignment(
        amount: i64,
        policy: LateFeePolicy,
        grace_days: u32,
        days_past_due: i64,
    ) -> (FeeAssignment, NaiveDate) {
        let today = NaiveDate::from_ymd_opt(2024, 9, 15).unwrap();
        let mut structure = FeeStructure::new("Tuition", Money::from_major(amount));
        structure.due_date = Some(today - Duration::days(days_past_due));
        structure.late_fee_policy = policy;
        structure.late_fee_grace_days = grace_days;
        let assignment =
            FeeAssignment::from_structure(Uuid::new_v4(), Uuid::new_v4(), &structure, Utc::now());
        (assignment, today)
    }

    #[test]
    fn test_flat_charges_once() {
        let (mut a, today) = overdue_assignment(
            1_000,
            LateFeePolicy::Flat {
                value: Money::from_major(50),
            },
            0,
            10,
        );

        let calc = accrual_increment(&a, today);
        assert_eq!(calc.increment, Money::from_major(50));
        assert!(!calc.grace_applied);

        // once the applied flag is set, the same or a later date charges nothing
        a.late_fee_accrued += calc.increment;
        a.late_fee_applied = true;
        assert_eq!(accrual_increment(&a, today).increment, Money::ZERO);
        assert_eq!(
            accrual_increment(&a, today + Duration::days(30)).increment,
            Money::ZERO
        );
    }

    #[test]
    fn test_percentage_of_unpaid_principal() {
        let (mut a, today) = overdue_assignment(
            1_000,
            LateFeePolicy::Percentage {
                rate: Rate::from_percent(dec!(5)),
            },
            0,
            3,
        );
        a.principal_paid = Money::from_major(400);

        let calc = accrual_increment(&a, today);
        assert_eq!(calc.unpaid_base, Money::from_major(600));
        assert_eq!(calc.increment, Money::from_major(30));
    }

    #[test]
    fn test_grace_window() {
        let (a, today) = overdue_assignment(
            1_000,
            LateFeePolicy::Flat {
                value: Money::from_major(50),
            },
            7,
            5,
        );

        // five days past due with seven grace days: still inside the window
        let calc = accrual_increment(&a, today);
        assert_eq!(calc.increment, Money::ZERO);
        assert!(calc.grace_applied);

        // the day the window closes is still free; the day after is not
        assert_eq!(accrual_increment(&a, today + Duration::days(2)).increment, Money::ZERO);
        let charged = accrual_increment(&a, today + Duration::days(3));
        assert_eq!(charged.increment, Money::from_major(50));
        assert_eq!(charged.days_late, 1);
    }

    #[test]
    fn test_no_due_date_disables_accrual() {
        let (mut a, today) = overdue_assignment(
            1_000,
            LateFeePolicy::Flat {
                value: Money::from_major(50),
            },
            0,
            10,
        );
        a.due_date = None;
        assert_eq!(accrual_increment(&a, today).increment, Money::ZERO);
    }

    #[test]
    fn test_nothing_unpaid_no_charge() {
        let (mut a, today) = overdue_assignment(
            1_000,
            LateFeePolicy::Flat {
                value: Money::from_major(50),
            },
            0,
            10,
        );
        a.principal_paid = Money::from_major(1_000);
        assert_eq!(accrual_increment(&a, today).increment, Money::ZERO);
    }

    #[test]
    fn test_daily_percentage_tops_up() {
        // 0.5% per day on 1000 unpaid, no grace
        let (mut a, today) = overdue_assignment(
            1_000,
            LateFeePolicy::DailyPercentage {
                rate: Rate::from_percent(dec!(0.5)),
            },
            0,
            4,
        );

        let first = accrual_increment(&a, today);
        assert_eq!(first.days_late, 4);
        assert_eq!(first.increment, Money::from_major(20));
        a.late_fee_accrued += first.increment;

        // same date again: total equals recorded, increment zero
        assert_eq!(accrual_increment(&a, today).increment, Money::ZERO);

        // two days later: top up by 2 more days
        let later = accrual_increment(&a, today + Duration::days(2));
        assert_eq!(later.increment, Money::from_major(10));
    }

    #[test]
    fn test_daily_percentage_cap_applies_to_total() {
        let (mut a, today) = overdue_assignment(
            1_000,
            LateFeePolicy::DailyPercentage {
                rate: Rate::from_percent(dec!(1)),
            },
            0,
            10,
        );
        a.late_fee_cap = LateFeeCap::Fixed(Money::from_major(75));

        // total would be 100, clamped to 75
        let calc = accrual_increment(&a, today);
        assert_eq!(calc.increment, Money::from_major(75));
        a.late_fee_accrued += calc.increment;

        // further days cannot push past the cap
        assert_eq!(
            accrual_increment(&a, today + Duration::days(30)).increment,
            Money::ZERO
        );
    }

    #[test]
    fn test_fixed_cap_clamps_flat() {
        let (a, today) = overdue_assignment(
            1_000,
            LateFeePolicy::Flat {
                value: Money::from_major(90),
            },
            0,
            5,
        );
        let mut capped = a.clone();
        capped.late_fee_cap = LateFeeCap::Fixed(Money::from_major(60));
        assert_eq!(accrual_increment(&capped, today).increment, Money::from_major(60));
    }

    #[test]
    fn test_percentage_cap_clamps_against_unpaid() {
        let (mut a, today) = overdue_assignment(
            1_000,
            LateFeePolicy::Flat {
                value: Money::from_major(90),
            },
            0,
            5,
        );
        // cap at 5% of unpaid principal = 50
        a.late_fee_cap = LateFeeCap::Percentage(Rate::from_percent(dec!(5)));
        assert_eq!(accrual_increment(&a, today).increment, Money::from_major(50));
    }

    #[test]
    fn test_rounds_to_currency_precision() {
        // 0.3% of 333.33 = 0.999999 -> 1.00
        let (mut a, today) = overdue_assignment(
            333,
            LateFeePolicy::Percentage {
                rate: Rate::from_percent(dec!(0.3)),
            },
            0,
            2,
        );
        a.amount = Money::from_str_exact("333.33").unwrap();
        let calc = accrual_increment(&a, today);
        assert_eq!(calc.increment, Money::from_str_exact("1.00").unwrap());
    }
}
