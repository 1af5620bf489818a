use log::{debug, trace};
use std::fmt;

use crate::error::{check_amount, MortgageError, MortgageResult};
use crate::loan::{AmortizationRow, LoanInputs, Schedule};

/// Rate-reset terms of an adjustable-rate mortgage, e.g. a 5/1 ARM with
/// 2/2/5 caps is `fixed_period_months: 60, adjustment_interval_months: 12,
/// initial_cap: 2.0, periodic_cap: 2.0, lifetime_cap: 5.0`.
///
/// Caps, index and margin are in percentage points.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmSchedule {
    pub fixed_period_months: u32,
    pub adjustment_interval_months: u32,
    pub initial_cap: f64,
    pub periodic_cap: f64,
    pub lifetime_cap: f64,
    pub index_rate: f64,
    pub margin: f64,
}

impl ArmSchedule {
    pub fn validate(&self) -> MortgageResult<()> {
        if self.fixed_period_months == 0 {
            return Err(MortgageError::invalid(
                "fixed_period_months",
                "must be at least one month",
            ));
        }
        if self.adjustment_interval_months == 0 {
            return Err(MortgageError::invalid(
                "adjustment_interval_months",
                "must be at least one month",
            ));
        }
        check_amount("initial_cap", self.initial_cap, 0., true)?;
        check_amount("periodic_cap", self.periodic_cap, 0., true)?;
        check_amount("lifetime_cap", self.lifetime_cap, 0., true)?;
        check_amount("index_rate", self.index_rate, 0., true)?;
        check_amount("margin", self.margin, 0., true)?;
        Ok(())
    }

    pub fn fully_indexed_rate(&self) -> f64 {
        self.index_rate + self.margin
    }

    /// Rate after a reset from `previous_rate`. The first reset is bounded by
    /// the initial cap, later ones by the periodic cap, and every rate stays
    /// within the lifetime cap of `initial_rate`.
    pub fn adjusted_rate(&self, previous_rate: f64, initial_rate: f64, first_adjustment: bool) -> f64 {
        let cap = if first_adjustment {
            self.initial_cap
        } else {
            self.periodic_cap
        };
        let floor = (initial_rate - self.lifetime_cap).max(0.);
        let ceiling = initial_rate + self.lifetime_cap;
        self.fully_indexed_rate()
            .clamp(previous_rate - cap, previous_rate + cap)
            .clamp(floor, ceiling)
    }
}

/// A run of months sharing one rate and one payment.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmPaymentPeriod {
    pub start_month: u32,
    pub end_month: u32,
    pub rate: f64,
    pub payment: f64,
    pub begin_balance: f64,
}

impl fmt::Display for ArmPaymentPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "months {}-{}, rate {:.3}%, payment ${:.2}, beginning balance ${:.2}",
            self.start_month, self.end_month, self.rate, self.payment, self.begin_balance
        )
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmResult {
    pub periods: Vec<ArmPaymentPeriod>,
    pub schedule: Vec<AmortizationRow>,
}

impl ArmResult {
    pub fn total_interest(&self) -> f64 {
        self.schedule.last().map_or(0., |row| row.cumulative_interest)
    }

    pub fn initial_payment(&self) -> f64 {
        self.periods.first().map_or(0., |period| period.payment)
    }

    pub fn max_payment(&self) -> f64 {
        self.periods
            .iter()
            .map(|period| period.payment)
            .fold(0., f64::max)
    }

    pub fn max_rate(&self) -> f64 {
        self.periods
            .iter()
            .map(|period| period.rate)
            .fold(0., f64::max)
    }
}

/// Amortizes `inputs` at its initial rate through the fixed period, then
/// resets the rate every adjustment interval and re-amortizes the remaining
/// balance over the remaining term.
pub fn compute_arm_payment(inputs: &LoanInputs, arm: &ArmSchedule) -> MortgageResult<ArmResult> {
    inputs.validate()?;
    arm.validate()?;

    let initial_rate = inputs.annual_rate;
    let mut rate = initial_rate;
    let mut balance = inputs.financed_principal();
    let mut months_elapsed = 0;
    let mut cumulative_interest = 0.;
    let mut periods = Vec::new();
    let mut schedule = Vec::with_capacity(inputs.term_months as usize);

    loop {
        let period_len = if periods.is_empty() {
            arm.fixed_period_months
        } else {
            arm.adjustment_interval_months
        }
        .min(inputs.term_months - months_elapsed);

        let rows = Schedule::resume(inputs, months_elapsed, balance, rate, cumulative_interest)?;
        let period = ArmPaymentPeriod {
            start_month: months_elapsed + 1,
            end_month: months_elapsed + period_len,
            rate,
            payment: rows.payment(),
            begin_balance: balance,
        };
        trace!("{}", period);
        periods.push(period);

        schedule.extend(rows.take(period_len as usize));
        let Some(last) = schedule.last() else {
            break;
        };
        if let Some(period) = periods.last_mut() {
            period.end_month = last.month;
        }
        months_elapsed = last.month;
        balance = last.end_balance;
        cumulative_interest = last.cumulative_interest;
        if balance <= 0. || months_elapsed >= inputs.term_months {
            break;
        }

        rate = arm.adjusted_rate(rate, initial_rate, periods.len() == 1);
    }

    let result = ArmResult { periods, schedule };
    debug!(
        "ARM: {} rate periods, initial payment ${:.2}, max payment ${:.2}, total interest ${:.2}",
        result.periods.len(),
        result.initial_payment(),
        result.max_payment(),
        result.total_interest()
    );
    Ok(result)
}
