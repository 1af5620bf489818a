use log::{debug, trace};

use crate::error::{check_amount, MortgageError, MortgageResult};
use crate::loan::{to_cents, AmortizationRow, Loan, LoanInputs};

/// Rates are annual percentages; tax, insurance and maintenance apply to the
/// home's value at the start of each year.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RentVsBuyInputs {
    pub home_price: f64,
    pub down_payment: f64,
    pub annual_rate: f64,
    pub term_months: u32,
    pub property_tax_rate: f64,
    pub insurance_rate: f64,
    pub maintenance_rate: f64,
    pub appreciation_rate: f64,
    pub selling_cost_rate: f64,
    pub monthly_rent: f64,
    pub rent_increase_rate: f64,
    pub years: u32,
}

/// Cumulative position at the end of `year`.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RentVsBuyYear {
    pub year: u32,
    pub cumulative_rent: f64,
    pub cumulative_ownership_cost: f64,
    pub home_value: f64,
    pub loan_balance: f64,
    /// Sale proceeds after selling costs, less the loan balance.
    pub equity: f64,
    /// Down payment plus ownership costs, less equity.
    pub net_buying_cost: f64,
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RentVsBuyResult {
    pub yearly: Vec<RentVsBuyYear>,
    pub total_rent: f64,
    pub net_buying_cost: f64,
    /// Positive when buying is cheaper over the horizon.
    pub buying_advantage: f64,
    /// First year in which buying has cost less than renting.
    pub break_even_year: Option<u32>,
}

pub fn compute_rent_vs_buy(inputs: &RentVsBuyInputs) -> MortgageResult<RentVsBuyResult> {
    check_amount("home_price", inputs.home_price, 0., false)?;
    check_amount("down_payment", inputs.down_payment, 0., true)?;
    if inputs.down_payment > inputs.home_price {
        return Err(MortgageError::invalid(
            "down_payment",
            "cannot exceed the home price",
        ));
    }
    for (field, rate) in [
        ("property_tax_rate", inputs.property_tax_rate),
        ("insurance_rate", inputs.insurance_rate),
        ("maintenance_rate", inputs.maintenance_rate),
        ("selling_cost_rate", inputs.selling_cost_rate),
        ("monthly_rent", inputs.monthly_rent),
    ] {
        check_amount(field, rate, 0., true)?;
    }
    check_amount("appreciation_rate", inputs.appreciation_rate, -100., false)?;
    check_amount("rent_increase_rate", inputs.rent_increase_rate, -100., false)?;
    if inputs.years == 0 {
        return Err(MortgageError::invalid("years", "must be at least one year"));
    }

    let loan_amount = to_cents(inputs.home_price - inputs.down_payment);
    let rows: Vec<AmortizationRow> = if loan_amount > 0. {
        Loan::new(LoanInputs::new(
            loan_amount,
            inputs.annual_rate,
            inputs.term_months,
        ))?
        .schedule()
        .to_vec()
    } else {
        Vec::new()
    };

    let carrying_rate =
        (inputs.property_tax_rate + inputs.insurance_rate + inputs.maintenance_rate) / 100.;
    let mut yearly = Vec::with_capacity(inputs.years as usize);
    let mut home_value = inputs.home_price;
    let mut annual_rent = inputs.monthly_rent * 12.;
    let mut cumulative_rent = 0.;
    let mut cumulative_ownership_cost = 0.;
    let mut loan_balance = loan_amount;
    let mut break_even_year = None;

    for year in 1..=inputs.years {
        let first_month = (year - 1) * 12 + 1;
        let last_month = year * 12;
        let year_rows = rows
            .iter()
            .filter(|row| (first_month..=last_month).contains(&row.month));

        let mut mortgage_paid = 0.;
        for row in year_rows {
            mortgage_paid += row.payment;
            loan_balance = row.end_balance;
        }

        cumulative_rent = to_cents(cumulative_rent + annual_rent);
        cumulative_ownership_cost =
            to_cents(cumulative_ownership_cost + mortgage_paid + home_value * carrying_rate);
        home_value = to_cents(home_value * (1. + inputs.appreciation_rate / 100.));
        annual_rent *= 1. + inputs.rent_increase_rate / 100.;

        let equity =
            to_cents(home_value * (1. - inputs.selling_cost_rate / 100.) - loan_balance);
        let net_buying_cost =
            to_cents(inputs.down_payment + cumulative_ownership_cost - equity);
        if break_even_year.is_none() && net_buying_cost < cumulative_rent {
            break_even_year = Some(year);
        }

        let position = RentVsBuyYear {
            year,
            cumulative_rent,
            cumulative_ownership_cost,
            home_value,
            loan_balance,
            equity,
            net_buying_cost,
        };
        trace!("{:?}", position);
        yearly.push(position);
    }

    let net_buying_cost = yearly.last().map_or(0., |year| year.net_buying_cost);
    let result = RentVsBuyResult {
        total_rent: cumulative_rent,
        net_buying_cost,
        buying_advantage: to_cents(cumulative_rent - net_buying_cost),
        break_even_year,
        yearly,
    };
    debug!(
        "rent vs buy over {} years: rent ${:.2}, buy ${:.2}, break-even year {:?}",
        inputs.years, result.total_rent, result.net_buying_cost, result.break_even_year
    );
    Ok(result)
}
