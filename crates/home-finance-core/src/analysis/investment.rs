//! The top-level buy-vs-rent analysis: split the loan, amortize, compare
//! prepayment strategies, simulate the alternative portfolio, score risk,
//! and assemble everything a presentation layer needs. Called once per
//! parameter change; every call re-derives from scratch.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::HomeFinanceError;
use crate::loan::amortization::{PeriodRecord, PrepaymentEvent, PrepaymentStrategy, RepaymentMethod};
use crate::loan::composite::{amortize_composite, split_loan, CompositeLoanInput, LoanProgram, LoanSplit};
use crate::loan::strategy::{compare_strategies, PrepaymentComparison};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::HomeFinanceResult;

use super::opportunity::{simulate_opportunity_cost, OpportunityInput, OpportunityOutcome};
use super::risk::{assess_risk, RiskAssessment, RiskInput};

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// A planned one-time prepayment, expressed in holding years.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepaymentPlan {
    /// Year of the lump sum; it lands in the last month of that year.
    pub year: u32,
    pub amount: Money,
    pub strategy: PrepaymentStrategy,
}

/// Full parameter set for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInput {
    pub total_price: Money,
    /// Down payment as a fraction of the price.
    pub down_payment_ratio: Rate,
    pub loan_term_years: u32,
    pub program: LoanProgram,
    pub market_rate: Rate,
    pub subsidized_rate: Rate,
    pub subsidized_quota: Money,
    pub method: RepaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepayment: Option<PrepaymentPlan>,
    pub holding_years: u32,
    pub monthly_rent: Money,
    pub vacancy_rate: Rate,
    pub appreciation_rate: Rate,
    pub alternative_return_rate: Rate,
    pub inflation_rate: Rate,
    /// Annual holding cost as a fraction of the property value.
    pub holding_cost_ratio: Rate,
    pub annual_maintenance: Money,
    pub transfer_tax_rate: Rate,
    pub agency_fee_ratio: Rate,
    pub renovation_cost: Money,
    pub monthly_income: Money,
    pub existing_monthly_debt: Money,
    pub existing_property_count: u32,
    pub investment_purchase: bool,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Upfront cash the purchase requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialCosts {
    pub down_payment: Money,
    pub transfer_tax: Money,
    pub agency_fee: Money,
    pub renovation: Money,
    pub total: Money,
}

/// One row of the first-year cash-flow table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyCashFlowRow {
    pub month: u32,
    pub rental_income: Money,
    pub mortgage_payment: Money,
    pub holding_cost: Money,
    pub net_cash_flow: Money,
}

/// Per-year aggregation of the merged schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyPaymentRow {
    pub year: u32,
    pub payment: Money,
    pub principal: Money,
    pub interest: Money,
    pub remaining_balance: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    House,
    Portfolio,
}

/// End-of-holding net-worth comparison between the two scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetComparison {
    pub house_net_worth: Money,
    pub portfolio_net_worth: Money,
    pub difference: Money,
    pub winner: Winner,
}

/// Everything the presentation layer consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub loan_amount: Money,
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub total_payment: Money,
    pub payoff_month: u32,
    pub schedule: Vec<PeriodRecord>,
    pub yearly_schedule: Vec<YearlyPaymentRow>,
    pub initial_costs: InitialCosts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepayment_comparison: Option<PrepaymentComparison>,
    pub opportunity: OpportunityOutcome,
    pub first_year_cash_flow: Vec<MonthlyCashFlowRow>,
    pub risk: RiskAssessment,
    pub asset_comparison: AssetComparison,
    pub dti: Rate,
    pub total_monthly_debt: Money,
    pub coverage_ratio: Decimal,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the full pipeline over one parameter set.
pub fn analyze_investment(
    input: &AnalysisInput,
) -> HomeFinanceResult<ComputationOutput<AnalysisOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_analysis(input)?;

    let down_payment = input.total_price * input.down_payment_ratio;
    let loan_amount = input.total_price - down_payment;
    let term_months = input.loan_term_years.saturating_mul(12);

    let transfer_tax = input.total_price * input.transfer_tax_rate;
    let agency_fee = input.total_price * input.agency_fee_ratio;
    let initial_costs = InitialCosts {
        down_payment,
        transfer_tax,
        agency_fee,
        renovation: input.renovation_cost,
        total: down_payment + transfer_tax + agency_fee + input.renovation_cost,
    };

    // -- Composite amortization --
    let tranches = split_loan(&LoanSplit {
        loan_amount,
        program: input.program,
        market_rate: input.market_rate,
        subsidized_rate: input.subsidized_rate,
        subsidized_quota: input.subsidized_quota,
        term_months,
        method: input.method,
    });
    let event = input.prepayment.as_ref().map(|p| PrepaymentEvent {
        trigger_month: p.year.saturating_mul(12),
        lump_sum: p.amount,
        strategy: p.strategy,
    });
    let composite_input = CompositeLoanInput {
        tranches,
        prepayment: event.clone(),
    };
    let composite = amortize_composite(&composite_input)?;
    warnings.extend(composite.warnings.iter().cloned());
    let loan = &composite.result;

    let monthly_payment = loan.schedule.first().map(|r| r.payment).unwrap_or_default();

    // -- Prepayment strategy comparison --
    let prepayment_comparison = match &event {
        Some(event) => {
            let comparison = compare_strategies(&composite_input, event)?;
            warnings.extend(comparison.warnings.iter().cloned());
            Some(comparison.result)
        }
        None => None,
    };

    // -- Opportunity-cost simulation --
    let opportunity_input = OpportunityInput {
        starting_capital: initial_costs.total,
        sunk_costs: initial_costs.total - down_payment,
        total_price: input.total_price,
        monthly_rent: input.monthly_rent,
        vacancy_rate: input.vacancy_rate,
        appreciation_rate: input.appreciation_rate,
        alternative_return_rate: input.alternative_return_rate,
        inflation_rate: input.inflation_rate,
        holding_cost_ratio: input.holding_cost_ratio,
        annual_maintenance: input.annual_maintenance,
        holding_years: input.holding_years,
        lump_sum_month: event.as_ref().map(|e| e.trigger_month),
        lump_sum: loan.applied_lump_sum,
    };
    let (opportunity, sim_warnings) = simulate_opportunity_cost(&opportunity_input, &loan.schedule);
    warnings.extend(sim_warnings);
    warnings.dedup();

    // -- First-year cash flow --
    let first_year_cash_flow = first_year_cash_flow(input, monthly_payment);

    // -- Risk --
    let coverage_ratio = if monthly_payment > Decimal::ZERO {
        input.monthly_rent / monthly_payment
    } else {
        Decimal::ZERO
    };
    let ltv = if input.total_price > Decimal::ZERO {
        loan_amount / input.total_price
    } else {
        Decimal::ZERO
    };
    let total_monthly_debt = monthly_payment + input.existing_monthly_debt;
    let risk = assess_risk(&RiskInput {
        monthly_debt_service: total_monthly_debt,
        monthly_income: input.monthly_income,
        coverage_ratio,
        ltv,
        multi_property_leverage: input.existing_property_count > 0 || input.investment_purchase,
    });

    // -- End-of-holding comparison --
    let (house_net_worth, portfolio_net_worth) = match opportunity.yearly.last() {
        Some(last) => (last.property_value - last.remaining_loan, last.portfolio_value),
        None => (input.total_price - loan_amount, initial_costs.total),
    };
    let asset_comparison = AssetComparison {
        house_net_worth,
        portfolio_net_worth,
        difference: house_net_worth - portfolio_net_worth,
        winner: if house_net_worth > portfolio_net_worth {
            Winner::House
        } else {
            Winner::Portfolio
        },
    };

    let output = AnalysisOutput {
        loan_amount,
        monthly_payment,
        total_interest: loan.total_interest,
        total_payment: loan.total_payment,
        payoff_month: loan.payoff_month,
        yearly_schedule: aggregate_yearly(&loan.schedule),
        schedule: loan.schedule.clone(),
        initial_costs,
        prepayment_comparison,
        opportunity,
        first_year_cash_flow,
        risk,
        asset_comparison,
        dti: if input.monthly_income > Decimal::ZERO {
            total_monthly_debt / input.monthly_income
        } else {
            Decimal::ZERO
        },
        total_monthly_debt,
        coverage_ratio,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Buy-vs-Rent Investment Analysis",
        &serde_json::json!({
            "total_price": input.total_price.to_string(),
            "down_payment_ratio": input.down_payment_ratio.to_string(),
            "loan_term_years": input.loan_term_years,
            "holding_years": input.holding_years,
            "program": input.program,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Fold the merged monthly schedule into per-year rows. The final partial
/// year (an early payoff) still gets a row.
pub fn aggregate_yearly(schedule: &[PeriodRecord]) -> Vec<YearlyPaymentRow> {
    let mut rows: Vec<YearlyPaymentRow> = Vec::new();
    let mut year_principal = Decimal::ZERO;
    let mut year_interest = Decimal::ZERO;

    for (i, record) in schedule.iter().enumerate() {
        year_principal += record.principal_component;
        year_interest += record.interest_component;

        if (i + 1) % 12 == 0 || i == schedule.len() - 1 {
            rows.push(YearlyPaymentRow {
                year: (i / 12 + 1) as u32,
                payment: year_principal + year_interest,
                principal: year_principal,
                interest: year_interest,
                remaining_balance: record.remaining_balance,
            });
            year_principal = Decimal::ZERO;
            year_interest = Decimal::ZERO;
        }
    }
    rows
}

fn first_year_cash_flow(input: &AnalysisInput, monthly_payment: Money) -> Vec<MonthlyCashFlowRow> {
    let twelve = dec!(12);
    let rental_income = input.monthly_rent * (Decimal::ONE - input.vacancy_rate);
    let holding_cost =
        input.total_price * input.holding_cost_ratio / twelve + input.annual_maintenance / twelve;

    (1..=12)
        .map(|month| MonthlyCashFlowRow {
            month,
            rental_income,
            mortgage_payment: monthly_payment,
            holding_cost,
            net_cash_flow: rental_income - monthly_payment - holding_cost,
        })
        .collect()
}

fn validate_analysis(input: &AnalysisInput) -> HomeFinanceResult<()> {
    if input.total_price < Decimal::ZERO {
        return Err(HomeFinanceError::InvalidInput {
            field: "total_price".into(),
            reason: "Price cannot be negative".into(),
        });
    }
    if input.down_payment_ratio < Decimal::ZERO || input.down_payment_ratio > Decimal::ONE {
        return Err(HomeFinanceError::InvalidInput {
            field: "down_payment_ratio".into(),
            reason: "Down payment ratio must be between 0 and 1".into(),
        });
    }
    if input.vacancy_rate < Decimal::ZERO || input.vacancy_rate > Decimal::ONE {
        return Err(HomeFinanceError::InvalidInput {
            field: "vacancy_rate".into(),
            reason: "Vacancy rate must be between 0 and 1".into(),
        });
    }
    if input.market_rate < Decimal::ZERO
        || input.subsidized_rate < Decimal::ZERO
        || input.alternative_return_rate < Decimal::ZERO
    {
        return Err(HomeFinanceError::InvalidInput {
            field: "rates".into(),
            reason: "Loan and alternative-return rates cannot be negative".into(),
        });
    }
    if input.inflation_rate <= dec!(-1) {
        return Err(HomeFinanceError::InvalidInput {
            field: "inflation_rate".into(),
            reason: "Inflation rate must be greater than -100%".into(),
        });
    }
    if input.loan_term_years == 0 {
        return Err(HomeFinanceError::InvalidInput {
            field: "loan_term_years".into(),
            reason: "Loan term must be at least one year".into(),
        });
    }
    if input.holding_years == 0 {
        return Err(HomeFinanceError::InvalidInput {
            field: "holding_years".into(),
            reason: "Holding period must be at least one year".into(),
        });
    }
    if input.monthly_rent < Decimal::ZERO
        || input.monthly_income < Decimal::ZERO
        || input.existing_monthly_debt < Decimal::ZERO
    {
        return Err(HomeFinanceError::InvalidInput {
            field: "cash_flows".into(),
            reason: "Rent, income, and existing debt cannot be negative".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
