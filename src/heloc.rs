use log::{debug, warn};

use crate::error::{check_amount, MortgageError, MortgageResult};
use crate::loan::{monthly_rate, to_cents, Loan, LoanInputs};

/// A home equity line of credit: interest-only during the draw period, then
/// fully amortizing over the repayment period.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HelocInputs {
    pub home_value: f64,
    pub mortgage_balance: f64,
    /// Combined loan-to-value cap as a fraction, e.g. 0.85.
    pub max_cltv: f64,
    pub draw_amount: f64,
    pub annual_rate: f64,
    pub draw_period_months: u32,
    pub repayment_period_months: u32,
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HelocResult {
    pub available_credit: f64,
    /// The requested draw, capped at the available credit.
    pub approved_draw: f64,
    pub draw_period_payment: f64,
    pub repayment_payment: f64,
    pub draw_period_interest: f64,
    pub repayment_interest: f64,
    pub total_interest: f64,
    /// False when the requested draw exceeds the available credit.
    pub feasible: bool,
}

pub fn compute_heloc(inputs: &HelocInputs) -> MortgageResult<HelocResult> {
    check_amount("home_value", inputs.home_value, 0., false)?;
    check_amount("mortgage_balance", inputs.mortgage_balance, 0., true)?;
    check_amount("max_cltv", inputs.max_cltv, 0., false)?;
    if inputs.max_cltv > 1. {
        return Err(MortgageError::invalid(
            "max_cltv",
            format!("must be a fraction no greater than 1, got {}", inputs.max_cltv),
        ));
    }
    check_amount("draw_amount", inputs.draw_amount, 0., true)?;
    check_amount("annual_rate", inputs.annual_rate, 0., true)?;
    if inputs.repayment_period_months == 0 {
        return Err(MortgageError::invalid(
            "repayment_period_months",
            "must be at least one month",
        ));
    }

    let available_credit =
        to_cents(inputs.home_value * inputs.max_cltv - inputs.mortgage_balance).max(0.);
    let feasible = inputs.draw_amount <= available_credit;
    if !feasible {
        warn!(
            "requested draw of ${:.2} exceeds available credit of ${:.2}",
            inputs.draw_amount, available_credit
        );
    }
    let approved_draw = to_cents(inputs.draw_amount.min(available_credit));

    let draw_period_payment = to_cents(approved_draw * monthly_rate(inputs.annual_rate));
    let draw_period_interest = to_cents(draw_period_payment * inputs.draw_period_months as f64);

    let (repayment_payment, repayment_interest) = if approved_draw > 0. {
        let repayment = Loan::new(LoanInputs::new(
            approved_draw,
            inputs.annual_rate,
            inputs.repayment_period_months,
        ))?;
        (repayment.get_pmt_amount(), repayment.total_interest())
    } else {
        (0., 0.)
    };

    let result = HelocResult {
        available_credit,
        approved_draw,
        draw_period_payment,
        repayment_payment,
        draw_period_interest,
        repayment_interest,
        total_interest: to_cents(draw_period_interest + repayment_interest),
        feasible,
    };
    debug!("HELOC: {:?}", result);
    Ok(result)
}
