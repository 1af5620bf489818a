//! Mortgage calculator engine.
//!
//! Payment, amortization and comparison math behind a family of mortgage
//! calculators: fixed-rate and FHA/VA/USDA/jumbo loans, adjustable-rate
//! mortgages, refinance and cash-out, HELOCs, extra and bi-weekly payments,
//! affordability, qualification and rent vs buy. Every function is pure and
//! rounds money to cents after each step.

pub mod affordability;
pub mod arm;
pub mod biweekly;
pub mod compare;
pub mod error;
pub mod heloc;
pub mod loan;
pub mod program;
pub mod rent_vs_buy;

pub use affordability::{
    compute_affordability, compute_qualification, debt_to_income, AffordabilityInputs,
    AffordabilityResult, LimitingRatio, QualificationInputs, QualificationResult,
};
pub use arm::{compute_arm_payment, ArmPaymentPeriod, ArmResult, ArmSchedule};
pub use biweekly::{compute_biweekly_schedule, BiWeeklyResult, LoanPayment, PmtSchedule};
pub use compare::{
    compare_extra_payments, compare_refinance, max_cash_out, ComparisonResult,
    RefinanceComparison,
};
pub use error::{MortgageError, MortgageResult};
pub use heloc::{compute_heloc, HelocInputs, HelocResult};
pub use loan::{
    compute_monthly_payment, generate_schedule, AmortizationRow, ExtraPayment, Loan, LoanInputs,
    Schedule,
};
pub use program::{compute_housing_payment, HousingPayment, LoanProgram};
pub use rent_vs_buy::{compute_rent_vs_buy, RentVsBuyInputs, RentVsBuyResult, RentVsBuyYear};

#[cfg(test)]
mod tests {
    use super::{AmortizationRow, ComparisonResult, Loan, LoanPayment, MortgageError};

    // verifies that types can cross threads and live in async UI state
    fn is_normal<T: Sized + Send + Sync + Unpin>() {}

    #[test]
    fn normal_types() {
        is_normal::<AmortizationRow>();
        is_normal::<Loan>();
        is_normal::<LoanPayment>();
        is_normal::<ComparisonResult>();
        is_normal::<MortgageError>();
    }
}
