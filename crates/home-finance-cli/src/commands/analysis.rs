use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use home_finance_core::analysis::investment::{analyze_investment, AnalysisInput};
use home_finance_core::analysis::risk::{assess_risk, RiskInput};
use home_finance_core::analysis::stress::run_stress_tests;

use crate::input;

/// Arguments for the full buy-vs-rent analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to a JSON or YAML file with the full parameter set
    #[arg(long)]
    pub input: Option<String>,

    /// Omit the month-by-month schedule from the output
    #[arg(long)]
    pub summary_only: bool,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let analysis_input: AnalysisInput = read_parameters(args.input.as_deref())?;
    let output = analyze_investment(&analysis_input)?;
    let mut value = serde_json::to_value(&output)?;
    if args.summary_only {
        if let Some(result) = value.get_mut("result") {
            if let Some(map) = result.as_object_mut() {
                map.remove("schedule");
            }
        }
    }
    Ok(value)
}

/// Arguments for stress testing
#[derive(Args)]
pub struct StressArgs {
    /// Path to a JSON or YAML file with the full parameter set
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_stress(args: StressArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let analysis_input: AnalysisInput = read_parameters(args.input.as_deref())?;
    let output = run_stress_tests(&analysis_input)?;
    Ok(serde_json::to_value(&output)?)
}

/// Arguments for risk scoring
#[derive(Args)]
pub struct RiskArgs {
    /// Total monthly debt service (mortgage plus existing debt)
    #[arg(long)]
    pub monthly_debt: Option<Decimal>,

    /// Monthly household income
    #[arg(long)]
    pub monthly_income: Option<Decimal>,

    /// Rent-to-payment coverage ratio
    #[arg(long)]
    pub coverage: Option<Decimal>,

    /// Loan-to-value ratio
    #[arg(long)]
    pub ltv: Option<Decimal>,

    /// Count leverage across multiple properties
    #[arg(long)]
    pub multi_property: bool,

    /// Path to a JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_risk(args: RiskArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let risk_input: RiskInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        RiskInput {
            monthly_debt_service: args
                .monthly_debt
                .ok_or("--monthly-debt is required (or provide --input)")?,
            monthly_income: args
                .monthly_income
                .ok_or("--monthly-income is required (or provide --input)")?,
            coverage_ratio: args
                .coverage
                .ok_or("--coverage is required (or provide --input)")?,
            ltv: args.ltv.ok_or("--ltv is required (or provide --input)")?,
            multi_property_leverage: args.multi_property,
        }
    };

    let assessment = assess_risk(&risk_input);
    Ok(serde_json::json!({ "result": assessment }))
}

/// Read the shared analysis parameter set from a file or piped stdin.
fn read_parameters(path: Option<&str>) -> Result<AnalysisInput, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return input::file::read_input(path);
    }
    if let Some(data) = input::stdin::read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }
    Err("provide --input or pipe a JSON parameter set on stdin".into())
}
