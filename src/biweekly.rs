use chrono::{Datelike, NaiveDate};
use log::{debug, trace};
use std::fmt;

use crate::compare::ComparisonResult;
use crate::error::{MortgageError, MortgageResult};
use crate::loan::{to_cents, Loan, LoanInputs};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PmtSchedule {
    Biweekly,
    Monthly,
}

impl fmt::Display for PmtSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PmtSchedule::Biweekly => write!(f, "bi-weekly"),
            PmtSchedule::Monthly => write!(f, "monthly"),
        }
    }
}

impl PmtSchedule {
    pub fn payments_per_year(&self) -> f64 {
        match self {
            PmtSchedule::Biweekly => 26.,
            PmtSchedule::Monthly => 12.,
        }
    }
}

/// A dated payment on a bi-weekly plan.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoanPayment {
    pub pmt_number: u32,
    pub pmt_date: NaiveDate,
    pub pmt_amount: f64,
    pub pmt_interest_paid: f64,
    pub pmt_end_balance: f64,
}

impl fmt::Display for LoanPayment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pmt number {}, date {}, payment ${:.2}, interest paid ${:.2}, ending balance ${:.2}",
            self.pmt_number,
            self.pmt_date,
            self.pmt_amount,
            self.pmt_interest_paid,
            self.pmt_end_balance
        )
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BiWeeklyResult {
    pub monthly_payment: f64,
    pub biweekly_payment: f64,
    /// Monthly-payment equivalents paid per year, about 13.
    pub effective_annual_payments: f64,
    pub payoff_date: NaiveDate,
    pub baseline_payoff_date: NaiveDate,
    pub payments: Vec<LoanPayment>,
    pub comparison: ComparisonResult,
}

impl BiWeeklyResult {
    pub fn total_interest(&self) -> f64 {
        self.comparison.modified_total_interest
    }

    pub fn years_saved(&self) -> f64 {
        self.comparison.months_saved as f64 / 12.
    }
}

pub(crate) fn get_next_pmt_date(
    begin_date: NaiveDate,
    pmt_schedule: PmtSchedule,
) -> MortgageResult<NaiveDate> {
    let end_date = match pmt_schedule {
        PmtSchedule::Biweekly => begin_date.checked_add_days(chrono::Days::new(14)),
        PmtSchedule::Monthly => begin_date.checked_add_months(chrono::Months::new(1)),
    };
    end_date.ok_or_else(|| {
        MortgageError::InvalidDate(format!("{} does not return a new payment date", begin_date))
    })
}

/// Whole months from `start` until `end` is reached, counting a partial month
/// as a full one.
pub(crate) fn months_until(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if end.day() > start.day() {
        months += 1;
    }
    months.max(0) as u32
}

/// Pays half the monthly payment every 14 days from `loan_date`, accruing
/// interest daily over each period, and compares the result against the
/// monthly schedule. Extra payments on `inputs` are ignored.
pub fn compute_biweekly_schedule(
    inputs: &LoanInputs,
    loan_date: NaiveDate,
) -> MortgageResult<BiWeeklyResult> {
    let baseline = Loan::new(inputs.without_extras())?;
    let monthly_payment = baseline.get_pmt_amount();
    let pmt_amount = to_cents(monthly_payment / 2.);
    let daily_rate = (inputs.annual_rate / 100.) / 365.;

    // half a monthly payment always outpaces two weeks of interest, so the
    // plan can never run longer than the monthly one
    let max_pmts = baseline.payoff_month() * 26 / 12 + 2;

    let mut payments = Vec::new();
    let mut begin_balance = baseline.inputs.financed_principal();
    let mut begin_date = loan_date;
    let mut cumulative_interest = 0.;
    let mut pmt_number = 0;

    while begin_balance > 0. && pmt_number < max_pmts {
        let end_date = get_next_pmt_date(begin_date, PmtSchedule::Biweekly)?;
        pmt_number += 1;

        let days = end_date.signed_duration_since(begin_date).num_days() as i32;
        let period_interest_rate = (1. + daily_rate).powi(days) - 1.;
        let interest = to_cents(begin_balance * period_interest_rate);
        let principal = to_cents(pmt_amount - interest).max(0.).min(begin_balance);
        let end_balance = to_cents(begin_balance - principal);
        cumulative_interest = to_cents(cumulative_interest + interest);

        let pmt = LoanPayment {
            pmt_number,
            pmt_date: end_date,
            pmt_amount: to_cents(interest + principal),
            pmt_interest_paid: interest,
            pmt_end_balance: end_balance,
        };
        trace!("{}", pmt);
        payments.push(pmt);

        begin_balance = end_balance;
        begin_date = end_date;
    }

    if begin_balance > 0. {
        return Err(MortgageError::invalid(
            "annual_rate",
            format!("bi-weekly payment of ${pmt_amount:.2} does not retire the loan"),
        ));
    }

    let payoff_date = begin_date;
    let baseline_payoff_date = loan_date
        .checked_add_months(chrono::Months::new(baseline.payoff_month()))
        .ok_or_else(|| MortgageError::InvalidDate(format!("{} plus the loan term", loan_date)))?;
    let comparison = ComparisonResult::new(
        baseline.total_interest(),
        baseline.payoff_month(),
        cumulative_interest,
        months_until(loan_date, payoff_date),
    );

    let result = BiWeeklyResult {
        monthly_payment,
        biweekly_payment: pmt_amount,
        effective_annual_payments: pmt_amount * PmtSchedule::Biweekly.payments_per_year()
            / monthly_payment,
        payoff_date,
        baseline_payoff_date,
        payments,
        comparison,
    };
    debug!(
        "bi-weekly: {} payments of ${:.2}, paid off {} instead of {}; {}",
        result.payments.len(),
        result.biweekly_payment,
        result.payoff_date,
        result.baseline_payoff_date,
        result.comparison
    );
    Ok(result)
}
