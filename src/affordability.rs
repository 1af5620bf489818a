//! Debt-to-income based affordability and loan qualification.
//!
//! Both calculators start from the same housing budget: the smaller of the
//! front-end limit (`income x front_end_ratio`) and what is left of the
//! back-end limit after existing debts (`income x back_end_ratio - debts`).
//! Ratios are fractions (0.28 for 28%); tax and insurance rates are annual
//! percentages of the home price.

use log::{debug, warn};
use std::fmt;

use crate::error::{check_amount, MortgageError, MortgageResult};
use crate::loan::{annuity_payment, annuity_principal, monthly_rate, to_cents};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LimitingRatio {
    FrontEnd,
    BackEnd,
}

impl fmt::Display for LimitingRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitingRatio::FrontEnd => write!(f, "front-end"),
            LimitingRatio::BackEnd => write!(f, "back-end"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AffordabilityInputs {
    pub gross_monthly_income: f64,
    pub monthly_debts: f64,
    pub front_end_ratio: f64,
    pub back_end_ratio: f64,
    pub down_payment: f64,
    pub annual_rate: f64,
    pub term_months: u32,
    pub property_tax_rate: f64,
    pub insurance_rate: f64,
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AffordabilityResult {
    pub max_home_price: f64,
    pub max_loan_amount: f64,
    pub max_housing_payment: f64,
    pub principal_and_interest: f64,
    pub monthly_taxes: f64,
    pub monthly_insurance: f64,
    /// `None` when infeasible.
    pub limiting_ratio: Option<LimitingRatio>,
    /// False when existing debts alone use up the back-end budget.
    pub feasible: bool,
}

impl AffordabilityResult {
    fn infeasible() -> Self {
        Self {
            max_home_price: 0.,
            max_loan_amount: 0.,
            max_housing_payment: 0.,
            principal_and_interest: 0.,
            monthly_taxes: 0.,
            monthly_insurance: 0.,
            limiting_ratio: None,
            feasible: false,
        }
    }
}

fn validate_ratios(front_end_ratio: f64, back_end_ratio: f64) -> MortgageResult<()> {
    for (field, ratio) in [
        ("front_end_ratio", front_end_ratio),
        ("back_end_ratio", back_end_ratio),
    ] {
        check_amount(field, ratio, 0., false)?;
        if ratio > 1. {
            return Err(MortgageError::invalid(
                field,
                format!("must be a fraction no greater than 1, got {ratio}"),
            ));
        }
    }
    Ok(())
}

fn validate_income(gross_monthly_income: f64, monthly_debts: f64) -> MortgageResult<()> {
    check_amount("gross_monthly_income", gross_monthly_income, 0., false)?;
    check_amount("monthly_debts", monthly_debts, 0., true)
}

fn validate_terms(annual_rate: f64, term_months: u32) -> MortgageResult<()> {
    check_amount("annual_rate", annual_rate, 0., true)?;
    if term_months == 0 {
        return Err(MortgageError::invalid(
            "term_months",
            "must be at least one month",
        ));
    }
    Ok(())
}

/// Monthly housing budget and the ratio that set it, or `None` when debts
/// leave nothing under the back-end limit.
fn housing_budget(
    gross_monthly_income: f64,
    monthly_debts: f64,
    front_end_ratio: f64,
    back_end_ratio: f64,
) -> Option<(f64, LimitingRatio)> {
    let front_end = gross_monthly_income * front_end_ratio;
    let back_end = gross_monthly_income * back_end_ratio - monthly_debts;
    if back_end <= 0. {
        return None;
    }
    if front_end <= back_end {
        Some((to_cents(front_end), LimitingRatio::FrontEnd))
    } else {
        Some((to_cents(back_end), LimitingRatio::BackEnd))
    }
}

/// `monthly_debts / gross_monthly_income`.
pub fn debt_to_income(gross_monthly_income: f64, monthly_debts: f64) -> MortgageResult<f64> {
    validate_income(gross_monthly_income, monthly_debts)?;
    Ok(monthly_debts / gross_monthly_income)
}

/// Highest home price whose principal, interest, taxes and insurance fit the
/// housing budget.
///
/// Taxes and insurance scale with the price, so with `f` the payment per
/// dollar borrowed and `t`, `i` the monthly tax and insurance per dollar of
/// price, the price solves `(price - down) f + price (t + i) = budget`.
pub fn compute_affordability(inputs: &AffordabilityInputs) -> MortgageResult<AffordabilityResult> {
    validate_income(inputs.gross_monthly_income, inputs.monthly_debts)?;
    validate_ratios(inputs.front_end_ratio, inputs.back_end_ratio)?;
    validate_terms(inputs.annual_rate, inputs.term_months)?;
    check_amount("down_payment", inputs.down_payment, 0., true)?;
    check_amount("property_tax_rate", inputs.property_tax_rate, 0., true)?;
    check_amount("insurance_rate", inputs.insurance_rate, 0., true)?;

    let Some((budget, limiting_ratio)) = housing_budget(
        inputs.gross_monthly_income,
        inputs.monthly_debts,
        inputs.front_end_ratio,
        inputs.back_end_ratio,
    ) else {
        warn!(
            "monthly debts of ${:.2} exceed the back-end budget on ${:.2} income",
            inputs.monthly_debts, inputs.gross_monthly_income
        );
        return Ok(AffordabilityResult::infeasible());
    };

    let payment_factor = annuity_payment(1., monthly_rate(inputs.annual_rate), inputs.term_months);
    let tax_factor = inputs.property_tax_rate / 100. / 12.;
    let insurance_factor = inputs.insurance_rate / 100. / 12.;

    let mut price = (budget + inputs.down_payment * payment_factor)
        / (payment_factor + tax_factor + insurance_factor);
    if price < inputs.down_payment {
        // the down payment covers the whole price; only taxes and insurance bind
        price = if tax_factor + insurance_factor > 0. {
            budget / (tax_factor + insurance_factor)
        } else {
            inputs.down_payment
        };
    }
    // round down so the payment never exceeds the budget
    let max_home_price = (price * 100.).floor() / 100.;
    let max_loan_amount = to_cents(max_home_price - inputs.down_payment).max(0.);

    let result = AffordabilityResult {
        max_home_price,
        max_loan_amount,
        max_housing_payment: budget,
        principal_and_interest: to_cents(max_loan_amount * payment_factor),
        monthly_taxes: to_cents(max_home_price * tax_factor),
        monthly_insurance: to_cents(max_home_price * insurance_factor),
        limiting_ratio: Some(limiting_ratio),
        feasible: true,
    };
    debug!(
        "affordability: home price ${:.2}, loan ${:.2}, {} ratio limits housing to ${:.2}",
        result.max_home_price, result.max_loan_amount, limiting_ratio, budget
    );
    Ok(result)
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QualificationInputs {
    pub gross_monthly_income: f64,
    pub monthly_debts: f64,
    pub front_end_ratio: f64,
    pub back_end_ratio: f64,
    pub annual_rate: f64,
    pub term_months: u32,
    /// Monthly taxes, insurance and HOA dues paid alongside the loan.
    pub monthly_escrow: f64,
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QualificationResult {
    pub max_housing_payment: f64,
    pub max_principal_and_interest: f64,
    pub max_loan_amount: f64,
    pub front_end_dti: f64,
    pub back_end_dti: f64,
    pub limiting_ratio: Option<LimitingRatio>,
    pub feasible: bool,
}

/// Largest loan whose payment plus escrow fits the housing budget.
pub fn compute_qualification(inputs: &QualificationInputs) -> MortgageResult<QualificationResult> {
    validate_income(inputs.gross_monthly_income, inputs.monthly_debts)?;
    validate_ratios(inputs.front_end_ratio, inputs.back_end_ratio)?;
    validate_terms(inputs.annual_rate, inputs.term_months)?;
    check_amount("monthly_escrow", inputs.monthly_escrow, 0., true)?;

    let budget = housing_budget(
        inputs.gross_monthly_income,
        inputs.monthly_debts,
        inputs.front_end_ratio,
        inputs.back_end_ratio,
    )
    .filter(|(budget, _)| *budget > inputs.monthly_escrow);

    let Some((budget, limiting_ratio)) = budget else {
        warn!(
            "no room for a loan payment: income ${:.2}, debts ${:.2}, escrow ${:.2}",
            inputs.gross_monthly_income, inputs.monthly_debts, inputs.monthly_escrow
        );
        return Ok(QualificationResult {
            max_housing_payment: 0.,
            max_principal_and_interest: 0.,
            max_loan_amount: 0.,
            front_end_dti: 0.,
            back_end_dti: inputs.monthly_debts / inputs.gross_monthly_income,
            limiting_ratio: None,
            feasible: false,
        });
    };

    let max_principal_and_interest = to_cents(budget - inputs.monthly_escrow);
    let max_loan_amount = to_cents(annuity_principal(
        max_principal_and_interest,
        monthly_rate(inputs.annual_rate),
        inputs.term_months,
    ));

    let result = QualificationResult {
        max_housing_payment: budget,
        max_principal_and_interest,
        max_loan_amount,
        front_end_dti: budget / inputs.gross_monthly_income,
        back_end_dti: (budget + inputs.monthly_debts) / inputs.gross_monthly_income,
        limiting_ratio: Some(limiting_ratio),
        feasible: true,
    };
    debug!("qualification: {:?}", result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::{
        compute_affordability, compute_qualification, debt_to_income, AffordabilityInputs,
        LimitingRatio, QualificationInputs,
    };
    use crate::error::MortgageError;
    use crate::loan::{compute_monthly_payment, round};
    use approx::assert_abs_diff_eq;
    use test_log::test;

    fn sample_inputs() -> AffordabilityInputs {
        AffordabilityInputs {
            gross_monthly_income: 10000.,
            monthly_debts: 500.,
            front_end_ratio: 0.28,
            back_end_ratio: 0.36,
            down_payment: 60000.,
            annual_rate: 7.,
            term_months: 360,
            property_tax_rate: 1.2,
            insurance_rate: 0.5,
        }
    }

    #[test]
    fn test_front_end_limited_affordability() {
        let result = compute_affordability(&sample_inputs()).unwrap();

        assert!(result.feasible);
        assert_eq!(result.limiting_ratio, Some(LimitingRatio::FrontEnd));
        assert_abs_diff_eq!(result.max_housing_payment, 2800., epsilon = 1e-6);
        assert_abs_diff_eq!(result.max_home_price, 396444.08, epsilon = 0.011);
        assert_abs_diff_eq!(result.max_loan_amount, 336444.08, epsilon = 0.011);

        let total = result.principal_and_interest + result.monthly_taxes + result.monthly_insurance;
        assert!(total <= result.max_housing_payment + 0.02, "{total}");
        assert_abs_diff_eq!(total, 2800., epsilon = 0.05);
    }

    #[test]
    fn test_back_end_limited_affordability() {
        let inputs = AffordabilityInputs {
            monthly_debts: 2000.,
            ..sample_inputs()
        };
        let result = compute_affordability(&inputs).unwrap();

        assert_eq!(result.limiting_ratio, Some(LimitingRatio::BackEnd));
        assert_abs_diff_eq!(result.max_housing_payment, 1600., epsilon = 1e-6);
        assert_abs_diff_eq!(result.max_home_price, 247739.51, epsilon = 0.011);
    }

    #[test]
    fn test_affordability_matches_payment_formula() {
        let result = compute_affordability(&sample_inputs()).unwrap();
        let pmt = compute_monthly_payment(result.max_loan_amount, 7., 360).unwrap();
        assert_abs_diff_eq!(round(pmt, 2), result.principal_and_interest, epsilon = 0.011);
    }

    #[test]
    fn test_debts_exceed_budget() {
        let inputs = AffordabilityInputs {
            monthly_debts: 4000.,
            ..sample_inputs()
        };
        let result = compute_affordability(&inputs).unwrap();

        assert!(!result.feasible);
        assert_eq!(result.max_home_price, 0.);
        assert_eq!(result.limiting_ratio, None);
    }

    #[test]
    fn test_zero_rate_affordability() {
        let inputs = AffordabilityInputs {
            annual_rate: 0.,
            ..sample_inputs()
        };
        let result = compute_affordability(&inputs).unwrap();
        assert_abs_diff_eq!(result.max_home_price, 707284.76, epsilon = 0.011);
    }

    #[test]
    fn test_large_down_payment_buys_outright() {
        let inputs = AffordabilityInputs {
            down_payment: 2_000_000.,
            ..sample_inputs()
        };
        let result = compute_affordability(&inputs).unwrap();

        assert_eq!(result.max_loan_amount, 0.);
        assert!(result.max_home_price < 2_000_000.);
        assert_abs_diff_eq!(
            result.monthly_taxes + result.monthly_insurance,
            2800.,
            epsilon = 0.02
        );
    }

    #[test]
    fn test_affordability_rejects_bad_ratios() {
        let inputs = AffordabilityInputs {
            front_end_ratio: 28.,
            ..sample_inputs()
        };
        assert!(matches!(
            compute_affordability(&inputs),
            Err(MortgageError::InvalidInput { ref field, .. }) if field == "front_end_ratio"
        ));
        let inputs = AffordabilityInputs {
            gross_monthly_income: 0.,
            ..sample_inputs()
        };
        assert!(compute_affordability(&inputs).is_err());
    }

    fn sample_qualification() -> QualificationInputs {
        QualificationInputs {
            gross_monthly_income: 10000.,
            monthly_debts: 500.,
            front_end_ratio: 0.28,
            back_end_ratio: 0.36,
            annual_rate: 7.,
            term_months: 360,
            monthly_escrow: 400.,
        }
    }

    #[test]
    fn test_qualification() {
        let result = compute_qualification(&sample_qualification()).unwrap();

        assert!(result.feasible);
        assert_abs_diff_eq!(result.max_principal_and_interest, 2400., epsilon = 1e-6);
        assert_abs_diff_eq!(result.max_loan_amount, 360738.16, epsilon = 0.011);
        assert_abs_diff_eq!(result.front_end_dti, 0.28, epsilon = 1e-9);
        assert_abs_diff_eq!(result.back_end_dti, 0.33, epsilon = 1e-9);

        let pmt = compute_monthly_payment(result.max_loan_amount, 7., 360).unwrap();
        assert_abs_diff_eq!(pmt, 2400., epsilon = 0.01);
    }

    #[test]
    fn test_qualification_zero_rate() {
        let inputs = QualificationInputs {
            annual_rate: 0.,
            term_months: 120,
            monthly_escrow: 1800.,
            ..sample_qualification()
        };
        let result = compute_qualification(&inputs).unwrap();
        assert_abs_diff_eq!(result.max_loan_amount, 120000., epsilon = 1e-6);
    }

    #[test]
    fn test_qualification_escrow_exhausts_budget() {
        let inputs = QualificationInputs {
            monthly_escrow: 3000.,
            ..sample_qualification()
        };
        let result = compute_qualification(&inputs).unwrap();
        assert!(!result.feasible);
        assert_eq!(result.max_loan_amount, 0.);
        assert_abs_diff_eq!(result.back_end_dti, 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_debt_to_income() {
        assert_abs_diff_eq!(debt_to_income(8000., 2000.).unwrap(), 0.25, epsilon = 1e-12);
        assert!(debt_to_income(0., 2000.).is_err());
        assert!(debt_to_income(8000., -1.).is_err());
    }
}
