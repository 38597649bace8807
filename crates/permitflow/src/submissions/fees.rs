//! Table-driven fee calculation.
//!
//! The calculator is a pure function of the category's published schedule and
//! the submission's own attributes. It never reads the clock and carries no
//! hidden state, so identical inputs always produce an identical fee list.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::directory::FeeSchedule;

use super::domain::{FeeKind, FeePaymentStatus, SubmissionFee};

/// The submission attributes a fee schedule is applied to. The grace window
/// for the late surcharge is measured from `created_on`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeContext {
    pub created_on: NaiveDate,
    pub submission_date: NaiveDate,
    pub expedited: bool,
}

/// Applies the schedule in a fixed order: the base fee always, the late
/// surcharge once the submission date falls past the grace window, the
/// expedite surcharge when expedited handling was requested. Categories that
/// publish no expedite surcharge produce no expedite line.
pub fn calculate_fees(schedule: &FeeSchedule, context: &FeeContext) -> Vec<SubmissionFee> {
    let mut fees = vec![fee_line(
        FeeKind::Base,
        "Base submission fee",
        schedule.base_fee,
        &schedule.currency,
    )];

    let grace_ends = context.created_on + Duration::days(schedule.grace_period_days);
    if context.submission_date > grace_ends {
        fees.push(fee_line(
            FeeKind::Late,
            "Late submission surcharge",
            schedule.late_surcharge,
            &schedule.currency,
        ));
    }

    if context.expedited && schedule.expedite_surcharge > Decimal::ZERO {
        fees.push(fee_line(
            FeeKind::Expedite,
            "Expedited processing surcharge",
            schedule.expedite_surcharge,
            &schedule.currency,
        ));
    }

    fees
}

/// Sum of every line that is still payable or already collected. Waived
/// lines are excluded; paid lines count because the money was owed.
pub fn total_amount(fees: &[SubmissionFee]) -> Decimal {
    fees.iter()
        .filter(|fee| fee.status != FeePaymentStatus::Waived)
        .map(|fee| fee.amount)
        .sum()
}

fn fee_line(kind: FeeKind, description: &str, amount: Decimal, currency: &str) -> SubmissionFee {
    SubmissionFee {
        kind,
        description: description.to_string(),
        amount,
        currency: currency.to_string(),
        status: FeePaymentStatus::Unpaid,
        settled_at: None,
        settlement_note: None,
    }
}
