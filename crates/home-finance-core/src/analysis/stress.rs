//! Stress testing: apply a fixed library of named, pure parameter
//! transforms to a baseline analysis and rerun the whole pipeline per
//! scenario. Transforms derive fresh parameter sets, so scenarios never
//! interfere with the baseline or with each other.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::HomeFinanceResult;

use super::investment::{analyze_investment, AnalysisInput};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The parameter transform a scenario applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioKind {
    /// Purchase price falls 10%.
    PriceDrop,
    /// Market rent falls 20%.
    RentDrop,
    /// Every tranche rate rises one percentage point.
    RateRise,
    /// Vacancy forced to 20%.
    VacancySpike,
    /// Forced sale at the given year.
    EarlySale(u32),
}

/// A named stress scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressScenario {
    pub name: String,
    pub kind: ScenarioKind,
}

impl StressScenario {
    /// Derive the scenario's parameter set from the baseline without
    /// touching it.
    pub fn apply(&self, base: &AnalysisInput) -> AnalysisInput {
        let mut params = base.clone();
        match self.kind {
            ScenarioKind::PriceDrop => {
                params.total_price = base.total_price * dec!(0.9);
            }
            ScenarioKind::RentDrop => {
                params.monthly_rent = base.monthly_rent * dec!(0.8);
            }
            ScenarioKind::RateRise => {
                params.market_rate = base.market_rate + dec!(0.01);
                params.subsidized_rate = base.subsidized_rate + dec!(0.01);
            }
            ScenarioKind::VacancySpike => {
                params.vacancy_rate = dec!(0.20);
            }
            ScenarioKind::EarlySale(year) => {
                params.holding_years = year;
            }
        }
        params
    }
}

/// Outcome of one scenario against the baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressOutcome {
    pub scenario_name: String,
    pub total_revenue: Money,
    /// Scenario revenue minus baseline revenue.
    pub revenue_delta: Money,
    pub comprehensive_return: Rate,
    pub monthly_payment: Money,
    pub coverage_ratio: Decimal,
    /// True when the scenario's total revenue is itself negative.
    pub is_negative: bool,
}

// ---------------------------------------------------------------------------
// Scenario library
// ---------------------------------------------------------------------------

/// The fixed scenario library. The early-sale year depends on the holding
/// period: sell at 5 when holding past 5 years, at 3 past 3, at 1 past 1.
pub fn standard_scenarios(holding_years: u32) -> Vec<StressScenario> {
    let mut scenarios = vec![
        StressScenario {
            name: "Price -10%".into(),
            kind: ScenarioKind::PriceDrop,
        },
        StressScenario {
            name: "Rent -20%".into(),
            kind: ScenarioKind::RentDrop,
        },
        StressScenario {
            name: "Rate +1%".into(),
            kind: ScenarioKind::RateRise,
        },
        StressScenario {
            name: "Vacancy 20%".into(),
            kind: ScenarioKind::VacancySpike,
        },
    ];

    let early_sale_year = if holding_years > 5 {
        Some(5)
    } else if holding_years > 3 {
        Some(3)
    } else if holding_years > 1 {
        Some(1)
    } else {
        None
    };
    if let Some(year) = early_sale_year {
        scenarios.push(StressScenario {
            name: format!("Sell at year {year}"),
            kind: ScenarioKind::EarlySale(year),
        });
    }

    scenarios
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Rerun the full pipeline under every standard scenario and diff each
/// outcome against the baseline.
pub fn run_stress_tests(
    input: &AnalysisInput,
) -> HomeFinanceResult<ComputationOutput<Vec<StressOutcome>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let baseline = analyze_investment(input)?;
    let baseline_revenue = baseline.result.opportunity.summary.total_revenue;

    let scenarios = standard_scenarios(input.holding_years);
    let mut outcomes = Vec::with_capacity(scenarios.len());

    for scenario in &scenarios {
        let params = scenario.apply(input);
        let analysis = analyze_investment(&params)?;
        for warning in &analysis.warnings {
            warnings.push(format!("{}: {}", scenario.name, warning));
        }

        let summary = &analysis.result.opportunity.summary;
        outcomes.push(StressOutcome {
            scenario_name: scenario.name.clone(),
            total_revenue: summary.total_revenue,
            revenue_delta: summary.total_revenue - baseline_revenue,
            comprehensive_return: summary.comprehensive_return,
            monthly_payment: analysis.result.monthly_payment,
            coverage_ratio: analysis.result.coverage_ratio,
            is_negative: summary.total_revenue < Decimal::ZERO,
        });
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Adverse Scenario Stress Testing",
        &serde_json::json!({
            "num_scenarios": outcomes.len(),
            "baseline_revenue": baseline_revenue.to_string(),
        }),
        warnings,
        elapsed,
        outcomes,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
