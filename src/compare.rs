use log::{debug, warn};
use std::fmt;

use crate::error::{check_amount, MortgageError, MortgageResult};
use crate::loan::{to_cents, Loan, LoanInputs};

/// Interest and payoff timing of a modified loan against its baseline.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparisonResult {
    pub baseline_total_interest: f64,
    pub modified_total_interest: f64,
    pub interest_saved: f64,
    pub baseline_payoff_month: u32,
    pub modified_payoff_month: u32,
    /// Negative when the modified loan runs longer than the baseline.
    pub months_saved: i64,
}

impl ComparisonResult {
    pub fn new(
        baseline_total_interest: f64,
        baseline_payoff_month: u32,
        modified_total_interest: f64,
        modified_payoff_month: u32,
    ) -> Self {
        Self {
            baseline_total_interest,
            modified_total_interest,
            interest_saved: to_cents(baseline_total_interest - modified_total_interest),
            baseline_payoff_month,
            modified_payoff_month,
            months_saved: baseline_payoff_month as i64 - modified_payoff_month as i64,
        }
    }

    pub fn from_loans(baseline: &Loan, modified: &Loan) -> Self {
        Self::new(
            baseline.total_interest(),
            baseline.payoff_month(),
            modified.total_interest(),
            modified.payoff_month(),
        )
    }
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "interest ${:.2} -> ${:.2} (saved ${:.2}), payoff month {} -> {} ({} months saved)",
            self.baseline_total_interest,
            self.modified_total_interest,
            self.interest_saved,
            self.baseline_payoff_month,
            self.modified_payoff_month,
            self.months_saved
        )
    }
}

/// Loan with its extra payments against the same loan without them.
pub fn compare_extra_payments(inputs: &LoanInputs) -> MortgageResult<ComparisonResult> {
    let baseline = Loan::new(inputs.without_extras())?;
    let modified = Loan::new(inputs.clone())?;
    let result = ComparisonResult::from_loans(&baseline, &modified);
    debug!("extra payments: {}", result);
    Ok(result)
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RefinanceComparison {
    pub current_payment: f64,
    pub new_payment: f64,
    pub monthly_savings: f64,
    pub closing_costs: f64,
    /// `None` when the new loan does not lower the monthly payment, so the
    /// closing costs are never recovered.
    pub break_even_months: Option<f64>,
    /// Interest saved net of closing costs.
    pub total_interest_saved: f64,
    pub comparison: ComparisonResult,
}

impl RefinanceComparison {
    /// First whole month by which the savings have covered the closing costs.
    pub fn break_even_month(&self) -> Option<u32> {
        self.break_even_months.map(|months| months.ceil() as u32)
    }

    pub fn breaks_even(&self) -> bool {
        self.break_even_months.is_some()
    }
}

/// `current` carries the remaining balance, rate and remaining term of the
/// existing loan; `new` the proposed refinance terms.
pub fn compare_refinance(
    current: &LoanInputs,
    new: &LoanInputs,
    closing_costs: f64,
) -> MortgageResult<RefinanceComparison> {
    check_amount("closing_costs", closing_costs, 0., true)?;
    let current_loan = Loan::new(current.clone())?;
    let new_loan = Loan::new(new.clone())?;

    let current_payment = current_loan.monthly_outlay();
    let new_payment = new_loan.monthly_outlay();
    let monthly_savings = to_cents(current_payment - new_payment);
    let break_even_months = if monthly_savings > 0. {
        Some(closing_costs / monthly_savings)
    } else {
        warn!(
            "refinance raises the payment from ${:.2} to ${:.2}; closing costs are never recovered",
            current_payment, new_payment
        );
        None
    };

    let comparison = ComparisonResult::from_loans(&current_loan, &new_loan);
    let result = RefinanceComparison {
        current_payment,
        new_payment,
        monthly_savings,
        closing_costs,
        break_even_months,
        total_interest_saved: to_cents(comparison.interest_saved - closing_costs),
        comparison,
    };
    debug!("refinance: {:?}", result);
    Ok(result)
}

/// Cash available from a cash-out refinance capped at `max_ltv` (a fraction,
/// e.g. 0.80) of the home value. Zero when the existing balance already
/// exceeds the cap.
pub fn max_cash_out(home_value: f64, max_ltv: f64, current_balance: f64) -> MortgageResult<f64> {
    check_amount("home_value", home_value, 0., false)?;
    check_amount("max_ltv", max_ltv, 0., false)?;
    if max_ltv > 1. {
        return Err(MortgageError::invalid(
            "max_ltv",
            format!("must be a fraction no greater than 1, got {max_ltv}"),
        ));
    }
    check_amount("current_balance", current_balance, 0., true)?;

    let cash_out = to_cents(home_value * max_ltv - current_balance);
    if cash_out <= 0. {
        warn!(
            "balance ${:.2} already exceeds {:.0}% of ${:.2}",
            current_balance,
            max_ltv * 100.,
            home_value
        );
        return Ok(0.);
    }
    Ok(cash_out)
}
