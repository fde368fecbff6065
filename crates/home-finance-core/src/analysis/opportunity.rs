//! Opportunity-cost simulation: would renting and investing the same cash
//! beat buying?
//!
//! The alternative portfolio is seeded with every unit of upfront cash the
//! purchase requires, then fed the owner's net monthly outflow so both
//! scenarios stay out-of-pocket-equal. Nominal and inflation-adjusted series
//! run in parallel.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::loan::amortization::{compound, PeriodRecord};
use crate::types::{Money, Rate};

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Parameters for the rent-and-invest simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityInput {
    /// Down payment plus all acquisition costs; seeds the portfolio.
    pub starting_capital: Money,
    /// Acquisition costs other than the down payment (taxes, fees,
    /// renovation) — sunk, so they reduce the buyer's total revenue.
    pub sunk_costs: Money,
    pub total_price: Money,
    pub monthly_rent: Money,
    /// Fraction of the year the property earns no rent.
    pub vacancy_rate: Rate,
    /// Annual property appreciation (may be negative).
    pub appreciation_rate: Rate,
    /// Annual return assumption for the alternative portfolio.
    pub alternative_return_rate: Rate,
    pub inflation_rate: Rate,
    /// Annual holding cost as a fraction of the property value.
    pub holding_cost_ratio: Rate,
    pub annual_maintenance: Money,
    pub holding_years: u32,
    /// 1-based month in which the lump-sum prepayment leaves the buyer's
    /// pocket (the applied amount, post-clamping).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lump_sum_month: Option<u32>,
    pub lump_sum: Money,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One simulated year, nominal and inflation-adjusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyOutcome {
    pub year: u32,
    /// Net rent received to date (rent less holding and maintenance).
    pub cumulative_rent: Money,
    pub property_value: Money,
    pub real_property_value: Money,
    /// Buyer's running return: net rent + appreciation − interest paid.
    pub total_return: Money,
    pub remaining_loan: Money,
    pub interest_paid: Money,
    pub principal_paid: Money,
    pub portfolio_value: Money,
    pub real_portfolio_value: Money,
}

/// Summary metrics over the holding period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunitySummary {
    /// Appreciation + net rent − interest − sunk acquisition costs.
    pub total_revenue: Money,
    /// total_revenue over total cash invested, as a decimal fraction.
    pub comprehensive_return: Rate,
    /// Geometric annualization of the comprehensive return.
    pub annualized_return: Rate,
    /// First-year net rent less twelve payments, over total cash invested.
    pub cash_on_cash_return: Rate,
    pub projected_appreciation: Money,
    pub average_net_rent: Money,
    pub total_interest_in_holding: Money,
    /// First year whose running return turns positive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_even_year: Option<u32>,
}

/// Full simulation output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityOutcome {
    pub yearly: Vec<YearlyOutcome>,
    pub summary: OpportunitySummary,
}

// ---------------------------------------------------------------------------
// Fold state
// ---------------------------------------------------------------------------

/// Month-by-month simulation state. Owned exclusively by the simulator and
/// advanced only through `step`.
#[derive(Debug, Clone, Copy)]
struct SimulationState {
    portfolio_value: Money,
    cumulative_rent: Money,
    cumulative_interest: Money,
}

impl SimulationState {
    fn seeded(starting_capital: Money) -> Self {
        SimulationState {
            portfolio_value: starting_capital,
            cumulative_rent: Decimal::ZERO,
            cumulative_interest: Decimal::ZERO,
        }
    }

    /// Grow the portfolio one month, then feed it the owner's net outflow.
    fn step(
        self,
        monthly_rate: Rate,
        net_outflow: Money,
        interest_this_month: Money,
        net_rent_this_month: Money,
    ) -> Self {
        SimulationState {
            portfolio_value: self.portfolio_value * (Decimal::ONE + monthly_rate) + net_outflow,
            cumulative_rent: self.cumulative_rent + net_rent_this_month,
            cumulative_interest: self.cumulative_interest + interest_this_month,
        }
    }
}

// ---------------------------------------------------------------------------
// Decimal helpers
// ---------------------------------------------------------------------------

/// Compute the nth root of x using Newton's method (40 iterations).
fn nth_root(x: Decimal, n: u32) -> Decimal {
    if x == Decimal::ONE {
        return Decimal::ONE;
    }
    if x == Decimal::ZERO {
        return Decimal::ZERO;
    }
    if n == 0 {
        return Decimal::ONE;
    }
    if n == 1 {
        return x;
    }

    let n_dec = Decimal::from(n);
    let mut guess = Decimal::ONE;

    for _ in 0..40 {
        let mut g_n_minus_1 = Decimal::ONE;
        for _ in 0..n - 1 {
            g_n_minus_1 *= guess;
        }
        let g_n = g_n_minus_1 * guess;

        if g_n_minus_1.is_zero() {
            break;
        }

        let delta = (g_n - x) / (n_dec * g_n_minus_1);
        guess -= delta;

        if delta.abs() < dec!(0.0000000000001) {
            break;
        }
    }

    guess
}

/// Monthly rate equivalent to an annual rate: (1 + annual)^(1/12) − 1.
fn monthly_rate_of(annual: Rate) -> Rate {
    nth_root(Decimal::ONE + annual, 12) - Decimal::ONE
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Walk the holding period month by month alongside the merged mortgage
/// schedule. Returns the outcome plus non-fatal warnings.
pub fn simulate_opportunity_cost(
    input: &OpportunityInput,
    schedule: &[PeriodRecord],
) -> (OpportunityOutcome, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if input.holding_years == 0 {
        warnings.push("Holding period is zero; nothing to simulate".into());
        return (
            OpportunityOutcome {
                yearly: Vec::new(),
                summary: OpportunitySummary {
                    total_revenue: Decimal::ZERO,
                    comprehensive_return: Decimal::ZERO,
                    annualized_return: Decimal::ZERO,
                    cash_on_cash_return: Decimal::ZERO,
                    projected_appreciation: Decimal::ZERO,
                    average_net_rent: Decimal::ZERO,
                    total_interest_in_holding: Decimal::ZERO,
                    break_even_year: None,
                },
            },
            warnings,
        );
    }

    let monthly_alt_rate = monthly_rate_of(input.alternative_return_rate);
    let twelve = dec!(12);

    let mut state = SimulationState::seeded(input.starting_capital);
    let mut yearly: Vec<YearlyOutcome> = Vec::with_capacity(input.holding_years as usize);
    let mut remaining_loan = Decimal::ZERO;

    for year in 1..=input.holding_years {
        // Rent rides the same compounding curve as the property, priced off
        // the year-start value; holding cost is pro-rated off that value too.
        let appreciation_start = compound(input.appreciation_rate, year - 1);
        let property_value_start = input.total_price * appreciation_start;
        let annual_rent_effective = input.monthly_rent
            * twelve
            * appreciation_start
            * (Decimal::ONE - input.vacancy_rate);
        let annual_holding_cost = property_value_start * input.holding_cost_ratio;
        let net_annual_rent = annual_rent_effective - annual_holding_cost - input.annual_maintenance;

        let monthly_holding = annual_holding_cost / twelve;
        let monthly_maintenance = input.annual_maintenance / twelve;
        let monthly_rent_income = annual_rent_effective / twelve;
        let monthly_net_rent = net_annual_rent / twelve;

        let mut interest_this_year = Decimal::ZERO;
        let mut principal_this_year = Decimal::ZERO;

        for month in (year - 1) * 12 + 1..=year * 12 {
            let record = schedule.get(month as usize - 1);
            let payment = record.map(|r| r.payment).unwrap_or_default();
            let interest = record.map(|r| r.interest_component).unwrap_or_default();
            let principal = record.map(|r| r.principal_component).unwrap_or_default();
            if let Some(r) = record {
                remaining_loan = r.remaining_balance;
            }
            interest_this_year += interest;
            principal_this_year += principal;

            let lump = match input.lump_sum_month {
                Some(m) if m == month => input.lump_sum,
                _ => Decimal::ZERO,
            };

            // Outflow for owning this month; the renter invests the same
            // cash instead.
            let net_outflow =
                payment + monthly_holding + monthly_maintenance + lump - monthly_rent_income;
            state = state.step(monthly_alt_rate, net_outflow, interest, monthly_net_rent);
        }

        let property_value_end = input.total_price * compound(input.appreciation_rate, year);
        let total_return = state.cumulative_rent + (property_value_end - input.total_price)
            - state.cumulative_interest;

        let discount = Decimal::ONE / compound(input.inflation_rate, year);

        yearly.push(YearlyOutcome {
            year,
            cumulative_rent: state.cumulative_rent,
            property_value: property_value_end,
            real_property_value: property_value_end * discount,
            total_return,
            remaining_loan,
            interest_paid: interest_this_year,
            principal_paid: principal_this_year,
            portfolio_value: state.portfolio_value,
            real_portfolio_value: state.portfolio_value * discount,
        });
    }

    // -- Summary metrics --
    let final_property_value = yearly
        .last()
        .map(|y| y.property_value)
        .unwrap_or(input.total_price);
    let projected_appreciation = final_property_value - input.total_price;
    let total_investment = input.starting_capital + input.lump_sum;

    let total_revenue = projected_appreciation + state.cumulative_rent
        - state.cumulative_interest
        - input.sunk_costs;

    let comprehensive_return = if total_investment > Decimal::ZERO {
        total_revenue / total_investment
    } else {
        Decimal::ZERO
    };

    let growth_base = Decimal::ONE + comprehensive_return;
    let annualized_return = if growth_base > Decimal::ZERO {
        nth_root(growth_base, input.holding_years) - Decimal::ONE
    } else {
        warnings.push(
            "Comprehensive return at or below -100%; annualized return reported as -100%".into(),
        );
        dec!(-1)
    };

    let first_payment = schedule.first().map(|r| r.payment).unwrap_or_default();
    let first_year_net_rent = yearly
        .first()
        .map(|y| y.cumulative_rent)
        .unwrap_or_default();
    let cash_on_cash_return = if total_investment > Decimal::ZERO {
        (first_year_net_rent - first_payment * twelve) / total_investment
    } else {
        Decimal::ZERO
    };

    let summary = OpportunitySummary {
        total_revenue,
        comprehensive_return,
        annualized_return,
        cash_on_cash_return,
        projected_appreciation,
        average_net_rent: state.cumulative_rent / Decimal::from(input.holding_years),
        total_interest_in_holding: state.cumulative_interest,
        break_even_year: yearly
            .iter()
            .find(|y| y.total_return > Decimal::ZERO)
            .map(|y| y.year),
    };

    (OpportunityOutcome { yearly, summary }, warnings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
