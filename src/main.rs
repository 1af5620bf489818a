use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::error;
use mortgage::{
    compare_extra_payments, compare_refinance, compute_affordability, compute_arm_payment,
    compute_biweekly_schedule, compute_heloc, compute_housing_payment, compute_qualification,
    compute_rent_vs_buy, max_cash_out, AffordabilityInputs, ArmSchedule, HelocInputs, Loan,
    LoanInputs, LoanProgram, MortgageResult, QualificationInputs, RentVsBuyInputs,
};
use simple_logger::SimpleLogger;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliLoanProgram {
    Conventional,
    Fha,
    Va,
    Usda,
    Jumbo,
}

impl From<CliLoanProgram> for LoanProgram {
    fn from(value: CliLoanProgram) -> Self {
        match value {
            CliLoanProgram::Conventional => LoanProgram::Conventional,
            CliLoanProgram::Fha => LoanProgram::Fha,
            CliLoanProgram::Va => LoanProgram::Va,
            CliLoanProgram::Usda => LoanProgram::Usda,
            CliLoanProgram::Jumbo => LoanProgram::Jumbo,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mortgage", version, about = "Mortgage payment and amortization calculators")]
struct Cli {
    /// Log intermediate results (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct LoanArgs {
    /// Loan amount
    #[arg(long)]
    principal: f64,
    /// Annual interest rate in percent
    #[arg(long)]
    rate: f64,
    /// Term in months
    #[arg(long, default_value_t = 360)]
    term: u32,
    #[arg(long, value_enum, default_value_t = CliLoanProgram::Conventional)]
    program: CliLoanProgram,
    /// Extra principal paid every month
    #[arg(long)]
    extra_monthly: Option<f64>,
    /// One-time extra principal payment
    #[arg(long, requires = "extra_month")]
    extra_once: Option<f64>,
    /// Month the one-time extra payment is made
    #[arg(long, requires = "extra_once")]
    extra_month: Option<u32>,
}

impl LoanArgs {
    fn to_inputs(&self) -> LoanInputs {
        let mut inputs = LoanProgram::from(self.program)
            .apply(LoanInputs::new(self.principal, self.rate, self.term));
        if let Some(extra) = self.extra_monthly {
            inputs = inputs.with_extra_monthly(extra);
        }
        if let (Some(amount), Some(month)) = (self.extra_once, self.extra_month) {
            inputs = inputs.with_one_time_extra(amount, month);
        }
        inputs
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monthly payment, with a PITI breakdown when a home value is given
    Payment {
        #[command(flatten)]
        loan: LoanArgs,
        #[arg(long)]
        home_value: Option<f64>,
        /// Annual property tax, percent of home value
        #[arg(long, default_value_t = 1.1)]
        tax_rate: f64,
        /// Annual homeowners insurance, percent of home value
        #[arg(long, default_value_t = 0.35)]
        insurance_rate: f64,
    },
    /// Full amortization table
    Schedule {
        #[command(flatten)]
        loan: LoanArgs,
    },
    /// Adjustable-rate payment periods
    Arm {
        #[command(flatten)]
        loan: LoanArgs,
        #[arg(long, default_value_t = 60)]
        fixed_months: u32,
        #[arg(long, default_value_t = 12)]
        adjust_months: u32,
        #[arg(long, default_value_t = 2.)]
        initial_cap: f64,
        #[arg(long, default_value_t = 2.)]
        periodic_cap: f64,
        #[arg(long, default_value_t = 5.)]
        lifetime_cap: f64,
        /// Index rate in percent
        #[arg(long)]
        index: f64,
        /// Margin over the index in percent
        #[arg(long)]
        margin: f64,
    },
    /// Savings from the extra payments on a loan
    Extra {
        #[command(flatten)]
        loan: LoanArgs,
    },
    /// True bi-weekly payments against the monthly schedule
    Biweekly {
        #[command(flatten)]
        loan: LoanArgs,
        /// Loan closing date, YYYY-MM-DD
        #[arg(long)]
        loan_date: NaiveDate,
    },
    /// Refinance break-even and interest savings
    Refinance {
        #[arg(long)]
        balance: f64,
        #[arg(long)]
        current_rate: f64,
        /// Months left on the current loan
        #[arg(long)]
        remaining_term: u32,
        #[arg(long)]
        new_rate: f64,
        #[arg(long, default_value_t = 360)]
        new_term: u32,
        #[arg(long, default_value_t = 0.)]
        closing_costs: f64,
        /// Cash taken out on top of the current balance
        #[arg(long, default_value_t = 0.)]
        cash_out: f64,
    },
    /// Maximum cash-out under a loan-to-value cap
    CashOut {
        #[arg(long)]
        home_value: f64,
        #[arg(long)]
        balance: f64,
        #[arg(long, default_value_t = 0.8)]
        max_ltv: f64,
    },
    /// Highest home price the income supports
    Afford {
        #[arg(long)]
        income: f64,
        #[arg(long, default_value_t = 0.)]
        debts: f64,
        #[arg(long, default_value_t = 0.28)]
        front_end: f64,
        #[arg(long, default_value_t = 0.36)]
        back_end: f64,
        #[arg(long, default_value_t = 0.)]
        down_payment: f64,
        #[arg(long)]
        rate: f64,
        #[arg(long, default_value_t = 360)]
        term: u32,
        #[arg(long, default_value_t = 1.1)]
        tax_rate: f64,
        #[arg(long, default_value_t = 0.35)]
        insurance_rate: f64,
    },
    /// Largest loan the income qualifies for
    Qualify {
        #[arg(long)]
        income: f64,
        #[arg(long, default_value_t = 0.)]
        debts: f64,
        #[arg(long, default_value_t = 0.28)]
        front_end: f64,
        #[arg(long, default_value_t = 0.36)]
        back_end: f64,
        #[arg(long)]
        rate: f64,
        #[arg(long, default_value_t = 360)]
        term: u32,
        #[arg(long, default_value_t = 0.)]
        escrow: f64,
    },
    /// Home equity line of credit payments
    Heloc {
        #[arg(long)]
        home_value: f64,
        #[arg(long)]
        balance: f64,
        #[arg(long, default_value_t = 0.85)]
        max_cltv: f64,
        #[arg(long)]
        draw: f64,
        #[arg(long)]
        rate: f64,
        #[arg(long, default_value_t = 120)]
        draw_months: u32,
        #[arg(long, default_value_t = 240)]
        repayment_months: u32,
    },
    /// Cumulative cost of renting against buying
    RentVsBuy {
        #[arg(long)]
        home_price: f64,
        #[arg(long)]
        down_payment: f64,
        #[arg(long)]
        rate: f64,
        #[arg(long, default_value_t = 360)]
        term: u32,
        #[arg(long)]
        rent: f64,
        #[arg(long, default_value_t = 1.1)]
        tax_rate: f64,
        #[arg(long, default_value_t = 0.35)]
        insurance_rate: f64,
        #[arg(long, default_value_t = 1.)]
        maintenance_rate: f64,
        #[arg(long, default_value_t = 3.)]
        appreciation_rate: f64,
        #[arg(long, default_value_t = 6.)]
        selling_cost_rate: f64,
        #[arg(long, default_value_t = 3.)]
        rent_increase_rate: f64,
        #[arg(long, default_value_t = 10)]
        years: u32,
    },
}

fn run(command: Command) -> MortgageResult<()> {
    match command {
        Command::Payment {
            loan,
            home_value,
            tax_rate,
            insurance_rate,
        } => {
            let inputs = loan.to_inputs();
            let loan = Loan::new(inputs.clone())?;
            println!("monthly payment ${:.2}", loan.get_pmt_amount());
            if let Some(home_value) = home_value {
                let piti = compute_housing_payment(&inputs, home_value, tax_rate, insurance_rate)?;
                println!("{}", piti);
            }
        }
        Command::Schedule { loan } => {
            let loan = Loan::new(loan.to_inputs())?;
            loan.show_amortization();
            println!(
                "{} payments, total interest ${:.2}, total fees ${:.2}",
                loan.get_pmt_count(),
                loan.total_interest(),
                loan.total_fees()
            );
        }
        Command::Arm {
            loan,
            fixed_months,
            adjust_months,
            initial_cap,
            periodic_cap,
            lifetime_cap,
            index,
            margin,
        } => {
            let arm = ArmSchedule {
                fixed_period_months: fixed_months,
                adjustment_interval_months: adjust_months,
                initial_cap,
                periodic_cap,
                lifetime_cap,
                index_rate: index,
                margin,
            };
            let result = compute_arm_payment(&loan.to_inputs(), &arm)?;
            for period in &result.periods {
                println!("{}", period);
            }
            println!(
                "max payment ${:.2}, total interest ${:.2}",
                result.max_payment(),
                result.total_interest()
            );
        }
        Command::Extra { loan } => {
            println!("{}", compare_extra_payments(&loan.to_inputs())?);
        }
        Command::Biweekly { loan, loan_date } => {
            let result = compute_biweekly_schedule(&loan.to_inputs(), loan_date)?;
            println!(
                "bi-weekly payment ${:.2} ({:.2} monthly payments a year), paid off {} instead of {}",
                result.biweekly_payment,
                result.effective_annual_payments,
                result.payoff_date,
                result.baseline_payoff_date
            );
            println!("{}", result.comparison);
        }
        Command::Refinance {
            balance,
            current_rate,
            remaining_term,
            new_rate,
            new_term,
            closing_costs,
            cash_out,
        } => {
            let current = LoanInputs::new(balance, current_rate, remaining_term);
            let new = LoanInputs::new(balance + cash_out, new_rate, new_term);
            let result = compare_refinance(&current, &new, closing_costs)?;
            println!(
                "payment ${:.2} -> ${:.2} (saves ${:.2} a month)",
                result.current_payment, result.new_payment, result.monthly_savings
            );
            match result.break_even_month() {
                Some(month) => println!("breaks even in month {}", month),
                None => println!("this option does not break even"),
            }
            println!(
                "{}; net of closing costs ${:.2}",
                result.comparison, result.total_interest_saved
            );
        }
        Command::CashOut {
            home_value,
            balance,
            max_ltv,
        } => {
            println!(
                "maximum cash-out ${:.2}",
                max_cash_out(home_value, max_ltv, balance)?
            );
        }
        Command::Afford {
            income,
            debts,
            front_end,
            back_end,
            down_payment,
            rate,
            term,
            tax_rate,
            insurance_rate,
        } => {
            let result = compute_affordability(&AffordabilityInputs {
                gross_monthly_income: income,
                monthly_debts: debts,
                front_end_ratio: front_end,
                back_end_ratio: back_end,
                down_payment,
                annual_rate: rate,
                term_months: term,
                property_tax_rate: tax_rate,
                insurance_rate,
            })?;
            if result.feasible {
                println!(
                    "maximum home price ${:.2} (loan ${:.2}, housing payment ${:.2})",
                    result.max_home_price, result.max_loan_amount, result.max_housing_payment
                );
            } else {
                println!("existing debts leave no room for a housing payment");
            }
        }
        Command::Qualify {
            income,
            debts,
            front_end,
            back_end,
            rate,
            term,
            escrow,
        } => {
            let result = compute_qualification(&QualificationInputs {
                gross_monthly_income: income,
                monthly_debts: debts,
                front_end_ratio: front_end,
                back_end_ratio: back_end,
                annual_rate: rate,
                term_months: term,
                monthly_escrow: escrow,
            })?;
            if result.feasible {
                println!(
                    "maximum loan ${:.2} at ${:.2} a month (DTI {:.1}% / {:.1}%)",
                    result.max_loan_amount,
                    result.max_principal_and_interest,
                    result.front_end_dti * 100.,
                    result.back_end_dti * 100.
                );
            } else {
                println!("does not qualify: no room for a loan payment");
            }
        }
        Command::Heloc {
            home_value,
            balance,
            max_cltv,
            draw,
            rate,
            draw_months,
            repayment_months,
        } => {
            let result = compute_heloc(&HelocInputs {
                home_value,
                mortgage_balance: balance,
                max_cltv,
                draw_amount: draw,
                annual_rate: rate,
                draw_period_months: draw_months,
                repayment_period_months: repayment_months,
            })?;
            println!(
                "available credit ${:.2}, draw ${:.2}: ${:.2} a month interest-only, then ${:.2}; total interest ${:.2}",
                result.available_credit,
                result.approved_draw,
                result.draw_period_payment,
                result.repayment_payment,
                result.total_interest
            );
        }
        Command::RentVsBuy {
            home_price,
            down_payment,
            rate,
            term,
            rent,
            tax_rate,
            insurance_rate,
            maintenance_rate,
            appreciation_rate,
            selling_cost_rate,
            rent_increase_rate,
            years,
        } => {
            let result = compute_rent_vs_buy(&RentVsBuyInputs {
                home_price,
                down_payment,
                annual_rate: rate,
                term_months: term,
                property_tax_rate: tax_rate,
                insurance_rate,
                maintenance_rate,
                appreciation_rate,
                selling_cost_rate,
                monthly_rent: rent,
                rent_increase_rate,
                years,
            })?;
            for year in &result.yearly {
                println!(
                    "year {:>2}: rent ${:.2}, buy ${:.2}",
                    year.year, year.cumulative_rent, year.net_buying_cost
                );
            }
            match result.break_even_year {
                Some(year) => println!("buying is cheaper from year {}", year),
                None => println!("renting stays cheaper over {} years", years),
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    if let Err(e) = SimpleLogger::new().with_level(level).env().init() {
        eprintln!("could not start logger: {e}");
    }

    if let Err(e) = run(cli.command) {
        error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_loan_arguments() {
        let cli = Cli::parse_from([
            "mortgage",
            "schedule",
            "--principal",
            "300000",
            "--rate",
            "6.5",
            "--program",
            "fha",
            "--extra-once",
            "5000",
            "--extra-month",
            "12",
        ]);
        let Command::Schedule { loan } = cli.command else {
            panic!("expected schedule command");
        };
        let inputs = loan.to_inputs();
        assert_eq!(inputs.term_months, 360);
        assert_eq!(inputs.upfront_fee_rate, Some(1.75));
        assert_eq!(inputs.one_time_extra_payment.map(|extra| extra.month), Some(12));
    }

    #[test]
    fn parses_loan_date() {
        let cli = Cli::parse_from([
            "mortgage",
            "biweekly",
            "--principal",
            "300000",
            "--rate",
            "7",
            "--loan-date",
            "2024-01-01",
        ]);
        assert!(matches!(cli.command, Command::Biweekly { .. }));
    }
}
