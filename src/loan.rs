use log::{debug, trace};
use std::fmt;

use crate::error::{check_amount, MortgageError, MortgageResult};

/// Every monetary value is rounded to cents after each arithmetic step.
pub const CURRENCY_DEC_PLACES: i32 = 2;

/// A single lump-sum payment applied to principal in `month` (1-based).
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtraPayment {
    pub amount: f64,
    pub month: u32,
}

/// Terms of a fixed-rate loan as entered on a calculator form.
///
/// Rates are percentages (`7.0` means 7%). The upfront fee is financed into
/// the balance; the annual fee is charged monthly on the beginning balance.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoanInputs {
    pub principal: f64,
    pub annual_rate: f64,
    pub term_months: u32,
    pub upfront_fee_rate: Option<f64>,
    pub annual_fee_rate: Option<f64>,
    pub extra_monthly_payment: Option<f64>,
    pub one_time_extra_payment: Option<ExtraPayment>,
}

impl LoanInputs {
    pub fn new(principal: f64, annual_rate: f64, term_months: u32) -> Self {
        Self {
            principal,
            annual_rate,
            term_months,
            upfront_fee_rate: None,
            annual_fee_rate: None,
            extra_monthly_payment: None,
            one_time_extra_payment: None,
        }
    }

    pub fn with_fees(mut self, upfront_fee_rate: f64, annual_fee_rate: f64) -> Self {
        self.upfront_fee_rate = Some(upfront_fee_rate);
        self.annual_fee_rate = Some(annual_fee_rate);
        self
    }

    pub fn with_extra_monthly(mut self, amount: f64) -> Self {
        self.extra_monthly_payment = Some(amount);
        self
    }

    pub fn with_one_time_extra(mut self, amount: f64, month: u32) -> Self {
        self.one_time_extra_payment = Some(ExtraPayment { amount, month });
        self
    }

    /// Same loan with every extra payment removed.
    pub fn without_extras(&self) -> Self {
        Self {
            extra_monthly_payment: None,
            one_time_extra_payment: None,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> MortgageResult<()> {
        check_amount("principal", self.principal, 0., false)?;
        check_amount("annual_rate", self.annual_rate, 0., true)?;
        if self.term_months == 0 {
            return Err(MortgageError::invalid(
                "term_months",
                "must be at least one month",
            ));
        }
        if let Some(rate) = self.upfront_fee_rate {
            check_amount("upfront_fee_rate", rate, 0., true)?;
        }
        if let Some(rate) = self.annual_fee_rate {
            check_amount("annual_fee_rate", rate, 0., true)?;
        }
        if let Some(extra) = self.extra_monthly_payment {
            check_amount("extra_monthly_payment", extra, 0., true)?;
        }
        if let Some(extra) = self.one_time_extra_payment {
            check_amount("one_time_extra_payment", extra.amount, 0., true)?;
            if extra.month == 0 || extra.month > self.term_months {
                return Err(MortgageError::invalid(
                    "one_time_extra_payment",
                    format!(
                        "month {} is outside the loan term of {} months",
                        extra.month, self.term_months
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Principal plus any financed upfront fee.
    pub fn financed_principal(&self) -> f64 {
        let upfront = self.upfront_fee_rate.unwrap_or(0.);
        to_cents(self.principal * (1. + upfront / 100.))
    }

    pub fn monthly_rate(&self) -> f64 {
        monthly_rate(self.annual_rate)
    }
}

/// One month of an amortization table.
///
/// `principal` includes any extra payment applied that month (`extra` is the
/// part of it that came from extra payments). `fee` is the monthly insurance
/// premium and does not touch the balance.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmortizationRow {
    pub month: u32,
    pub begin_balance: f64,
    pub payment: f64,
    pub interest: f64,
    pub principal: f64,
    pub extra: f64,
    pub fee: f64,
    pub end_balance: f64,
    pub cumulative_interest: f64,
}

impl fmt::Display for AmortizationRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "month {}, begin balance ${:.2}, payment ${:.2}, interest ${:.2}, principal ${:.2}, ending balance ${:.2}",
            self.month,
            self.begin_balance,
            self.payment,
            self.interest,
            self.principal,
            self.end_balance
        )
    }
}

pub fn round(amt: f64, dec_places: i32) -> f64 {
    if amt == 0. {
        0.
    } else {
        (amt * 10_f64.powi(dec_places)).round() / 10_f64.powi(dec_places)
    }
}

pub(crate) fn to_cents(amt: f64) -> f64 {
    round(amt, CURRENCY_DEC_PLACES)
}

pub(crate) fn monthly_rate(annual_rate: f64) -> f64 {
    annual_rate / 12. / 100.
}

/// Level payment that retires `principal` over `term_months` at `annual_rate`
/// percent, compounded monthly. Not rounded.
pub fn compute_monthly_payment(
    principal: f64,
    annual_rate: f64,
    term_months: u32,
) -> MortgageResult<f64> {
    check_amount("principal", principal, 0., false)?;
    check_amount("annual_rate", annual_rate, 0., true)?;
    if term_months == 0 {
        return Err(MortgageError::invalid(
            "term_months",
            "must be at least one month",
        ));
    }
    Ok(annuity_payment(
        principal,
        monthly_rate(annual_rate),
        term_months,
    ))
}

// callers guarantee term_months > 0
pub(crate) fn annuity_payment(principal: f64, period_rate: f64, term_months: u32) -> f64 {
    if period_rate == 0. {
        return principal / term_months as f64;
    }
    let factor = (1. + period_rate).powf(term_months as f64);
    (principal * period_rate * factor) / (factor - 1.)
}

/// Inverse of [`annuity_payment`]: the principal a level payment supports.
pub(crate) fn annuity_principal(payment: f64, period_rate: f64, term_months: u32) -> f64 {
    if period_rate == 0. {
        return payment * term_months as f64;
    }
    let factor = (1. + period_rate).powf(term_months as f64);
    payment * (factor - 1.) / (period_rate * factor)
}

/// Lazily generated amortization table. Clone it before iterating to replay
/// the same rows.
#[derive(Clone, Debug)]
pub struct Schedule {
    monthly_rate: f64,
    payment: f64,
    last_month: u32,
    extra_monthly: f64,
    one_time: Option<ExtraPayment>,
    annual_fee_rate: f64,
    month: u32,
    balance: f64,
    cumulative_interest: f64,
}

impl Schedule {
    /// Picks up a loan after `months_elapsed` payments with `balance` still owed,
    /// re-amortizing it over the remaining term at `annual_rate`.
    pub(crate) fn resume(
        inputs: &LoanInputs,
        months_elapsed: u32,
        balance: f64,
        annual_rate: f64,
        cumulative_interest: f64,
    ) -> MortgageResult<Self> {
        let remaining = inputs.term_months.saturating_sub(months_elapsed);
        let payment = to_cents(compute_monthly_payment(balance, annual_rate, remaining)?);
        Ok(Self {
            monthly_rate: monthly_rate(annual_rate),
            payment,
            last_month: inputs.term_months,
            extra_monthly: to_cents(inputs.extra_monthly_payment.unwrap_or(0.)),
            one_time: inputs.one_time_extra_payment,
            annual_fee_rate: inputs.annual_fee_rate.unwrap_or(0.),
            month: months_elapsed,
            balance,
            cumulative_interest,
        })
    }

    /// Scheduled principal and interest payment, before extras.
    pub fn payment(&self) -> f64 {
        self.payment
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    fn extra_for(&self, month: u32) -> f64 {
        let one_time = match self.one_time {
            Some(extra) if extra.month == month => to_cents(extra.amount),
            _ => 0.,
        };
        self.extra_monthly + one_time
    }
}

impl Iterator for Schedule {
    type Item = AmortizationRow;

    fn next(&mut self) -> Option<AmortizationRow> {
        if self.balance <= 0. || self.month >= self.last_month {
            return None;
        }
        self.month += 1;

        let begin_balance = self.balance;
        let interest = to_cents(begin_balance * self.monthly_rate);
        let scheduled = to_cents(self.payment - interest).max(0.);
        let extra = self.extra_for(self.month);

        // the last payment absorbs the rounding remainder; extras never overpay
        let (principal, extra) =
            if self.month == self.last_month || scheduled + extra >= begin_balance {
                let scheduled = scheduled.min(begin_balance);
                (begin_balance, extra.min(to_cents(begin_balance - scheduled)))
            } else {
                (to_cents(scheduled + extra), extra)
            };

        let end_balance = to_cents(begin_balance - principal);
        self.cumulative_interest = to_cents(self.cumulative_interest + interest);
        self.balance = end_balance;

        let row = AmortizationRow {
            month: self.month,
            begin_balance,
            payment: to_cents(interest + principal),
            interest,
            principal,
            extra,
            fee: to_cents(begin_balance * self.annual_fee_rate / 100. / 12.),
            end_balance,
            cumulative_interest: self.cumulative_interest,
        };
        trace!("{}", row);
        Some(row)
    }
}

/// Amortization table for `inputs`, ending early if extra payments retire the
/// balance before the term.
pub fn generate_schedule(inputs: &LoanInputs) -> MortgageResult<Schedule> {
    inputs.validate()?;
    Schedule::resume(
        inputs,
        0,
        inputs.financed_principal(),
        inputs.annual_rate,
        0.,
    )
}

/// A loan together with its full amortization table.
#[derive(PartialEq, Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Loan {
    pub inputs: LoanInputs,
    pmt_amount: f64,
    scheduled_pmts: Vec<AmortizationRow>,
}

impl Loan {
    pub fn new(inputs: LoanInputs) -> MortgageResult<Self> {
        let schedule = generate_schedule(&inputs)?;
        let pmt_amount = schedule.payment();
        let scheduled_pmts: Vec<AmortizationRow> = schedule.collect();
        let loan = Self {
            inputs,
            pmt_amount,
            scheduled_pmts,
        };
        debug!(
            "loan of ${:.2} at {}% for {} months: payment ${:.2}, {} payments, total interest ${:.2}",
            loan.inputs.financed_principal(),
            loan.inputs.annual_rate,
            loan.inputs.term_months,
            loan.pmt_amount,
            loan.get_pmt_count(),
            loan.total_interest()
        );
        Ok(loan)
    }

    pub fn get_pmt_amount(&self) -> f64 {
        self.pmt_amount
    }

    pub fn get_pmt_count(&self) -> usize {
        self.scheduled_pmts.len()
    }

    pub fn get_pmt_detail(&self, pmt_number: usize) -> Option<&AmortizationRow> {
        pmt_number
            .checked_sub(1)
            .and_then(|idx| self.scheduled_pmts.get(idx))
    }

    pub fn get_pmt_info(&self, pmt_number: usize) -> String {
        match self.get_pmt_detail(pmt_number) {
            Some(pmt) => pmt.to_string(),
            None => "No payment information.".to_string(),
        }
    }

    pub fn schedule(&self) -> &[AmortizationRow] {
        &self.scheduled_pmts
    }

    pub fn total_interest(&self) -> f64 {
        self.scheduled_pmts
            .last()
            .map_or(0., |pmt| pmt.cumulative_interest)
    }

    pub fn total_principal(&self) -> f64 {
        to_cents(self.scheduled_pmts.iter().map(|pmt| pmt.principal).sum())
    }

    pub fn total_fees(&self) -> f64 {
        to_cents(self.scheduled_pmts.iter().map(|pmt| pmt.fee).sum())
    }

    pub fn total_paid(&self) -> f64 {
        to_cents(self.scheduled_pmts.iter().map(|pmt| pmt.payment).sum())
    }

    /// Month of the final payment.
    pub fn payoff_month(&self) -> u32 {
        self.scheduled_pmts.last().map_or(0, |pmt| pmt.month)
    }

    /// Scheduled payment plus the first month's insurance premium.
    pub fn monthly_outlay(&self) -> f64 {
        let fee = self.scheduled_pmts.first().map_or(0., |pmt| pmt.fee);
        to_cents(self.pmt_amount + fee)
    }

    pub fn show_amortization(&self) {
        for pmt in &self.scheduled_pmts {
            println!("{}", pmt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_monthly_payment, generate_schedule, round, Loan, LoanInputs};
    use crate::error::MortgageError;
    use approx::assert_abs_diff_eq;
    use test_log::test;

    #[test]
    fn test_compute_monthly_payment() {
        let pmt = compute_monthly_payment(300000., 7., 360).unwrap();
        assert_abs_diff_eq!(pmt, 1995.91, epsilon = 0.005);
        assert_eq!(round(pmt, 2), 1995.91);

        let pmt = compute_monthly_payment(200000., 7., 180).unwrap();
        assert_eq!(round(pmt, 2), 1797.66);

        // zero interest divides evenly
        assert_eq!(
            compute_monthly_payment(100000., 0., 12).unwrap(),
            100000. / 12.
        );
    }

    #[test]
    fn test_compute_monthly_payment_rejects_bad_input() {
        assert!(matches!(
            compute_monthly_payment(0., 5., 360),
            Err(MortgageError::InvalidInput { ref field, .. }) if field == "principal"
        ));
        assert!(matches!(
            compute_monthly_payment(-100., 5., 360),
            Err(MortgageError::InvalidInput { .. })
        ));
        assert!(matches!(
            compute_monthly_payment(100000., -0.5, 360),
            Err(MortgageError::InvalidInput { ref field, .. }) if field == "annual_rate"
        ));
        assert!(matches!(
            compute_monthly_payment(100000., 5., 0),
            Err(MortgageError::InvalidInput { ref field, .. }) if field == "term_months"
        ));
        assert!(compute_monthly_payment(f64::NAN, 5., 360).is_err());
    }

    #[test]
    fn test_monthly_loan() {
        let loan = Loan::new(LoanInputs::new(200000., 7., 180)).unwrap();

        assert_eq!(loan.get_pmt_amount(), 1797.66);
        assert_eq!(loan.get_pmt_count(), 180);
        assert_eq!(loan.get_pmt_info(1), "month 1, begin balance $200000.00, payment $1797.66, interest $1166.67, principal $630.99, ending balance $199369.01");
        assert_eq!(loan.get_pmt_info(2), "month 2, begin balance $199369.01, payment $1797.66, interest $1162.99, principal $634.67, ending balance $198734.34");
        assert_eq!(loan.get_pmt_info(180), "month 180, begin balance $1786.28, payment $1796.70, interest $10.42, principal $1786.28, ending balance $0.00");
        assert_eq!(loan.get_pmt_info(181), "No payment information.");
        assert_abs_diff_eq!(loan.total_interest(), 123577.84, epsilon = 1e-6);
    }

    #[test]
    fn test_thirty_year_schedule_ends_at_zero() {
        let loan = Loan::new(LoanInputs::new(300000., 7., 360)).unwrap();
        let last = loan.get_pmt_detail(360).unwrap();

        assert_eq!(loan.get_pmt_count(), 360);
        assert_eq!(last.end_balance, 0.);
        assert_abs_diff_eq!(last.principal, 1980.81, epsilon = 1e-6);
        assert_abs_diff_eq!(loan.total_principal(), 300000., epsilon = 1e-6);
        assert_abs_diff_eq!(loan.total_interest(), 418524.05, epsilon = 0.01);
    }

    #[test]
    fn test_rows_are_consistent() {
        let schedule: Vec<_> = generate_schedule(&LoanInputs::new(250000., 6.25, 240))
            .unwrap()
            .collect();

        for pair in schedule.windows(2) {
            assert_eq!(pair[0].end_balance, pair[1].begin_balance);
            assert_eq!(pair[0].month + 1, pair[1].month);
        }
        for row in &schedule {
            assert_abs_diff_eq!(row.end_balance, row.begin_balance - row.principal, epsilon = 1e-6);
            assert_abs_diff_eq!(row.interest, round(row.begin_balance * 6.25 / 1200., 2), epsilon = 1e-9);
            assert!(row.end_balance >= 0.);
        }
    }

    #[test]
    fn test_schedule_is_restartable() {
        let schedule = generate_schedule(&LoanInputs::new(150000., 5.5, 120)).unwrap();
        let first: Vec<_> = schedule.clone().collect();
        let second: Vec<_> = schedule.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_rate_schedule() {
        let loan = Loan::new(LoanInputs::new(100000., 0., 12)).unwrap();

        assert_eq!(loan.get_pmt_amount(), 8333.33);
        assert_eq!(loan.total_interest(), 0.);
        let last = loan.get_pmt_detail(12).unwrap();
        assert_abs_diff_eq!(last.principal, 8333.37, epsilon = 1e-6);
        assert_eq!(last.end_balance, 0.);
    }

    #[test]
    fn test_extra_monthly_payment_pays_off_early() {
        let loan = Loan::new(LoanInputs::new(300000., 7., 360).with_extra_monthly(200.)).unwrap();

        assert_eq!(loan.get_pmt_count(), 275);
        assert_eq!(loan.payoff_month(), 275);
        assert_abs_diff_eq!(loan.total_interest(), 301885.77, epsilon = 0.01);
        assert_eq!(loan.schedule().last().unwrap().end_balance, 0.);
        assert_eq!(loan.get_pmt_detail(1).unwrap().extra, 200.);
    }

    #[test]
    fn test_one_time_extra_payment() {
        let loan = Loan::new(LoanInputs::new(300000., 7., 360).with_one_time_extra(10000., 12))
            .unwrap();
        let month_12 = loan.get_pmt_detail(12).unwrap();

        assert_eq!(month_12.extra, 10000.);
        assert_abs_diff_eq!(month_12.principal, 10262.16, epsilon = 1e-6);
        assert_abs_diff_eq!(month_12.payment, 11995.91, epsilon = 1e-6);
        assert_eq!(loan.get_pmt_detail(11).unwrap().extra, 0.);
        assert_eq!(loan.get_pmt_count(), 326);
    }

    #[test]
    fn test_extra_payment_never_overpays() {
        let loan = Loan::new(LoanInputs::new(10000., 5., 12).with_one_time_extra(50000., 3)).unwrap();
        let last = loan.schedule().last().unwrap();

        assert_eq!(loan.get_pmt_count(), 3);
        assert_eq!(last.end_balance, 0.);
        assert_eq!(last.principal, last.begin_balance);
        assert!(last.extra < 50000.);
        assert_abs_diff_eq!(loan.total_principal(), 10000., epsilon = 1e-6);
    }

    #[test]
    fn test_financed_fees() {
        let inputs = LoanInputs::new(300000., 6.5, 360).with_fees(1.75, 0.55);
        let loan = Loan::new(inputs).unwrap();
        let first = loan.get_pmt_detail(1).unwrap();

        assert_eq!(loan.inputs.financed_principal(), 305250.);
        assert_eq!(loan.get_pmt_amount(), 1929.39);
        assert_eq!(first.begin_balance, 305250.);
        assert_abs_diff_eq!(first.fee, 139.91, epsilon = 1e-6);
        assert_abs_diff_eq!(loan.monthly_outlay(), 2069.30, epsilon = 1e-6);
        assert!(loan.total_fees() > 0.);
    }

    #[test]
    fn test_invalid_loan_inputs() {
        assert!(Loan::new(LoanInputs::new(100000., 5., 0)).is_err());
        assert!(Loan::new(LoanInputs::new(100000., 5., 360).with_extra_monthly(-1.)).is_err());
        assert!(Loan::new(LoanInputs::new(100000., 5., 360).with_fees(-1., 0.)).is_err());
        assert!(matches!(
            Loan::new(LoanInputs::new(100000., 5., 360).with_one_time_extra(500., 361)),
            Err(MortgageError::InvalidInput { ref field, .. }) if field == "one_time_extra_payment"
        ));
    }

    #[test]
    fn test_get_pmt_detail_bounds() {
        let loan = Loan::new(LoanInputs::new(50000., 4., 24)).unwrap();
        assert!(loan.get_pmt_detail(0).is_none());
        assert_eq!(loan.get_pmt_detail(1).unwrap().month, 1);
        assert_eq!(loan.get_pmt_detail(24).unwrap().month, 24);
        assert!(loan.get_pmt_detail(25).is_none());
    }

    mod properties {
        use super::super::{generate_schedule, Loan, LoanInputs};
        use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

        proptest! {
            #![proptest_config(proptest::test_runner::Config::with_cases(64))]

            #[test]
            fn prop_final_balance_is_zero(
                principal_dollars in 1_000u32..2_000_000,
                rate_bp in 0u32..1500,
                term_months in 1u32..481,
            ) {
                let inputs = LoanInputs::new(principal_dollars as f64, rate_bp as f64 / 100., term_months);
                let rows: Vec<_> = generate_schedule(&inputs).unwrap().collect();
                let last = rows.last().unwrap();

                prop_assert_eq!(last.end_balance, 0.);
                prop_assert!(rows.len() as u32 <= term_months);
                prop_assert!(rows.iter().all(|row| row.end_balance >= 0.));

                let principal_paid: f64 = rows.iter().map(|row| row.principal).sum();
                prop_assert!((principal_paid - principal_dollars as f64).abs() <= 0.01 * rows.len() as f64);
            }

            #[test]
            fn prop_extra_payment_shortens_loan(
                principal_dollars in 50_000u32..1_000_000,
                rate_bp in 100u32..1200,
                term_months in 120u32..481,
                extra_pct in 5u32..100,
            ) {
                let baseline = Loan::new(LoanInputs::new(principal_dollars as f64, rate_bp as f64 / 100., term_months)).unwrap();
                let extra = baseline.get_pmt_amount() * extra_pct as f64 / 100.;
                let modified = Loan::new(baseline.inputs.clone().with_extra_monthly(extra)).unwrap();

                prop_assert!(modified.total_interest() < baseline.total_interest());
                prop_assert!(modified.payoff_month() < baseline.payoff_month());
            }
        }
    }
}
