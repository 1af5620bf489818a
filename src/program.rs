use log::{debug, warn};
use std::fmt;

use crate::error::{check_amount, MortgageResult};
use crate::loan::{generate_schedule, to_cents, LoanInputs};

/// 2024 baseline conforming loan limit; anything above it is a jumbo loan.
pub const CONFORMING_LOAN_LIMIT: f64 = 766_550.;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoanProgram {
    Conventional,
    Fha,
    Va,
    Usda,
    Jumbo,
}

impl fmt::Display for LoanProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoanProgram::Conventional => "conventional",
            LoanProgram::Fha => "FHA",
            LoanProgram::Va => "VA",
            LoanProgram::Usda => "USDA",
            LoanProgram::Jumbo => "jumbo",
        };
        write!(f, "{}", name)
    }
}

impl LoanProgram {
    /// (upfront, annual) insurance or guarantee fee rates, in percent.
    pub fn fee_rates(&self) -> (f64, f64) {
        match self {
            LoanProgram::Conventional => (0., 0.),
            LoanProgram::Fha => (1.75, 0.55),
            // first-use funding fee with less than 5% down
            LoanProgram::Va => (2.15, 0.),
            LoanProgram::Usda => (1.0, 0.35),
            LoanProgram::Jumbo => (0., 0.),
        }
    }

    /// Fills the program's fee rates into `inputs`.
    pub fn apply(&self, inputs: LoanInputs) -> LoanInputs {
        if *self == LoanProgram::Jumbo && inputs.principal <= CONFORMING_LOAN_LIMIT {
            warn!(
                "${:.2} is within the conforming limit of ${:.2}; jumbo terms may not apply",
                inputs.principal, CONFORMING_LOAN_LIMIT
            );
        }
        let (upfront, annual) = self.fee_rates();
        inputs.with_fees(upfront, annual)
    }
}

pub fn is_jumbo(loan_amount: f64) -> bool {
    loan_amount > CONFORMING_LOAN_LIMIT
}

/// Monthly PITI breakdown. Mortgage insurance is the first month's premium.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HousingPayment {
    pub principal_and_interest: f64,
    pub mortgage_insurance: f64,
    pub property_tax: f64,
    pub homeowners_insurance: f64,
    pub total: f64,
}

impl fmt::Display for HousingPayment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "principal & interest ${:.2}, mortgage insurance ${:.2}, property tax ${:.2}, homeowners insurance ${:.2}, total ${:.2}",
            self.principal_and_interest,
            self.mortgage_insurance,
            self.property_tax,
            self.homeowners_insurance,
            self.total
        )
    }
}

/// `tax_rate` and `insurance_rate` are annual percentages of `home_value`.
pub fn compute_housing_payment(
    inputs: &LoanInputs,
    home_value: f64,
    tax_rate: f64,
    insurance_rate: f64,
) -> MortgageResult<HousingPayment> {
    check_amount("home_value", home_value, 0., false)?;
    check_amount("tax_rate", tax_rate, 0., true)?;
    check_amount("insurance_rate", insurance_rate, 0., true)?;

    let mut schedule = generate_schedule(inputs)?;
    let principal_and_interest = schedule.payment();
    let mortgage_insurance = schedule.next().map_or(0., |row| row.fee);
    let property_tax = to_cents(home_value * tax_rate / 100. / 12.);
    let homeowners_insurance = to_cents(home_value * insurance_rate / 100. / 12.);

    let payment = HousingPayment {
        principal_and_interest,
        mortgage_insurance,
        property_tax,
        homeowners_insurance,
        total: to_cents(
            principal_and_interest + mortgage_insurance + property_tax + homeowners_insurance,
        ),
    };
    debug!("housing payment: {}", payment);
    Ok(payment)
}
