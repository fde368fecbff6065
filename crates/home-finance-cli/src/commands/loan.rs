use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use home_finance_core::loan::amortization::{
    amortize, LoanTerms, PrepaymentEvent, PrepaymentStrategy, RepaymentMethod,
};
use home_finance_core::loan::composite::CompositeLoanInput;
use home_finance_core::loan::strategy::compare_strategies;

use crate::input;

/// Repayment method flag.
#[derive(Debug, Clone, ValueEnum)]
pub enum MethodArg {
    EqualInstallment,
    EqualPrincipal,
}

impl From<MethodArg> for RepaymentMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::EqualInstallment => RepaymentMethod::EqualInstallment,
            MethodArg::EqualPrincipal => RepaymentMethod::EqualPrincipal,
        }
    }
}

/// Prepayment strategy flag.
#[derive(Debug, Clone, ValueEnum)]
pub enum StrategyArg {
    ReducePayment,
    ReduceTerm,
}

impl From<StrategyArg> for PrepaymentStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::ReducePayment => PrepaymentStrategy::ReducePayment,
            StrategyArg::ReduceTerm => PrepaymentStrategy::ReduceTerm,
        }
    }
}

/// Arguments for single-loan amortization
#[derive(Args)]
pub struct AmortizeArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub term_months: Option<u32>,

    /// Annual rate as a decimal (e.g. 0.049 for 4.9%)
    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    /// Repayment method
    #[arg(long, default_value = "equal-installment")]
    pub method: MethodArg,

    /// Month of the lump-sum prepayment (1-based)
    #[arg(long)]
    pub prepay_month: Option<u32>,

    /// Lump-sum amount
    #[arg(long)]
    pub prepay_amount: Option<Decimal>,

    /// What to do with the schedule after the prepayment
    #[arg(long, default_value = "reduce-term")]
    pub prepay_strategy: StrategyArg,

    /// Include the full month-by-month schedule in the output
    #[arg(long)]
    pub schedule: bool,

    /// Path to a JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
struct AmortizeRequest {
    #[serde(flatten)]
    terms: LoanTerms,
    #[serde(default)]
    prepayment: Option<PrepaymentEvent>,
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: AmortizeRequest = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let prepayment = match (args.prepay_month, args.prepay_amount) {
            (Some(trigger_month), Some(lump_sum)) => Some(PrepaymentEvent {
                trigger_month,
                lump_sum,
                strategy: args.prepay_strategy.clone().into(),
            }),
            (None, None) => None,
            _ => return Err("--prepay-month and --prepay-amount must be given together".into()),
        };
        AmortizeRequest {
            terms: LoanTerms {
                principal: args
                    .principal
                    .ok_or("--principal is required (or provide --input)")?,
                term_months: args
                    .term_months
                    .ok_or("--term-months is required (or provide --input)")?,
                annual_rate: args
                    .annual_rate
                    .ok_or("--annual-rate is required (or provide --input)")?,
                method: args.method.clone().into(),
            },
            prepayment,
        }
    };

    let result = amortize(&request.terms, request.prepayment.as_ref());

    let mut value = serde_json::json!({
        "result": {
            "monthly_payment": result.schedule.first().map(|r| r.payment).unwrap_or_default(),
            "total_interest": result.total_interest,
            "total_payment": result.total_payment,
            "payoff_month": result.payoff_month,
            "applied_lump_sum": result.applied_lump_sum,
            "first_payment_after_prepay": result.first_payment_after_prepay,
            "periods": result.schedule.len(),
        }
    });
    if args.schedule {
        value["schedule"] = serde_json::to_value(&result.schedule)?;
    }
    Ok(value)
}

/// Arguments for prepayment strategy comparison
#[derive(Args)]
pub struct StrategiesArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub term_months: Option<u32>,

    /// Annual rate as a decimal
    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    /// Repayment method
    #[arg(long, default_value = "equal-installment")]
    pub method: MethodArg,

    /// Month of the lump-sum prepayment (1-based)
    #[arg(long)]
    pub prepay_month: Option<u32>,

    /// Lump-sum amount
    #[arg(long)]
    pub prepay_amount: Option<Decimal>,

    /// Path to a JSON or YAML input file with tranches and a prepayment
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
struct StrategiesRequest {
    tranches: Vec<LoanTerms>,
    prepayment: PrepaymentEvent,
}

pub fn run_strategies(args: StrategiesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: StrategiesRequest = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        StrategiesRequest {
            tranches: vec![LoanTerms {
                principal: args
                    .principal
                    .ok_or("--principal is required (or provide --input)")?,
                term_months: args
                    .term_months
                    .ok_or("--term-months is required (or provide --input)")?,
                annual_rate: args
                    .annual_rate
                    .ok_or("--annual-rate is required (or provide --input)")?,
                method: args.method.clone().into(),
            }],
            prepayment: PrepaymentEvent {
                trigger_month: args
                    .prepay_month
                    .ok_or("--prepay-month is required (or provide --input)")?,
                lump_sum: args
                    .prepay_amount
                    .ok_or("--prepay-amount is required (or provide --input)")?,
                // The comparator evaluates both strategies regardless.
                strategy: PrepaymentStrategy::ReduceTerm,
            },
        }
    };

    let composite = CompositeLoanInput {
        tranches: request.tranches,
        prepayment: None,
    };
    let comparison = compare_strategies(&composite, &request.prepayment)?;
    Ok(serde_json::to_value(&comparison)?)
}
