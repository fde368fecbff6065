//! Composite loans: a list of independently amortized tranches sharing one
//! optional prepayment event, merged into a single schedule.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::HomeFinanceError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::HomeFinanceResult;

use super::amortization::{
    amortize, AmortizationResult, LoanTerms, PeriodRecord, PrepaymentEvent, RepaymentMethod,
};

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// A mortgage split into N tranches, each with its own rate, plus at most
/// one lump-sum prepayment shared across the whole loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeLoanInput {
    pub tranches: Vec<LoanTerms>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepayment: Option<PrepaymentEvent>,
}

/// Which funding program backs the mortgage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanProgram {
    /// Entirely at the market rate.
    Market,
    /// Entirely at the subsidized rate.
    Subsidized,
    /// Subsidized up to the quota, market rate for the remainder.
    Blended,
}

/// Parameters for splitting one logical mortgage into tranches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanSplit {
    pub loan_amount: Money,
    pub program: LoanProgram,
    pub market_rate: Rate,
    pub subsidized_rate: Rate,
    /// Maximum principal the subsidized program will fund.
    pub subsidized_quota: Money,
    pub term_months: u32,
    pub method: RepaymentMethod,
}

// ---------------------------------------------------------------------------
// Splitting and merging
// ---------------------------------------------------------------------------

/// Build the two-tranche split for a mortgage. The subsidized tranche
/// absorbs principal up to its quota, the market tranche the remainder; an
/// unused tranche has principal zero and amortizes to an empty schedule.
pub fn split_loan(split: &LoanSplit) -> Vec<LoanTerms> {
    let (market, subsidized) = match split.program {
        LoanProgram::Market => (split.loan_amount, Decimal::ZERO),
        LoanProgram::Subsidized => (Decimal::ZERO, split.loan_amount),
        LoanProgram::Blended => {
            let quota = split.subsidized_quota.max(Decimal::ZERO);
            let subsidized = split.loan_amount.min(quota);
            (split.loan_amount - subsidized, subsidized)
        }
    };
    vec![
        LoanTerms {
            principal: market,
            term_months: split.term_months,
            annual_rate: split.market_rate,
            method: split.method,
        },
        LoanTerms {
            principal: subsidized,
            term_months: split.term_months,
            annual_rate: split.subsidized_rate,
            method: split.method,
        },
    ]
}

/// Merge two schedules period-wise. The merged length is the maximum of the
/// two; a shorter schedule contributes zero past its own end, and the
/// prepayment flag is set if either source flags the month.
pub fn merge_schedules(a: &[PeriodRecord], b: &[PeriodRecord]) -> Vec<PeriodRecord> {
    let length = a.len().max(b.len());
    let mut merged = Vec::with_capacity(length);
    for i in 0..length {
        let left = a.get(i);
        let right = b.get(i);
        let field = |f: fn(&PeriodRecord) -> Money| {
            left.map(f).unwrap_or_default() + right.map(f).unwrap_or_default()
        };
        merged.push(PeriodRecord {
            month_index: (i + 1) as u32,
            payment: field(|r| r.payment),
            principal_component: field(|r| r.principal_component),
            interest_component: field(|r| r.interest_component),
            remaining_balance: field(|r| r.remaining_balance),
            is_prepayment_month: left.map(|r| r.is_prepayment_month).unwrap_or(false)
                || right.map(|r| r.is_prepayment_month).unwrap_or(false),
        });
    }
    merged
}

/// Pick the tranche the prepayment routes to: the nonzero-principal tranche
/// with the highest annual rate (pay down the most expensive debt first).
/// Ties go to the earliest tranche.
fn route_prepayment(tranches: &[LoanTerms]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, tranche) in tranches.iter().enumerate() {
        if tranche.principal <= Decimal::ZERO {
            continue;
        }
        match best {
            Some(b) if tranches[b].annual_rate >= tranche.annual_rate => {}
            _ => best = Some(i),
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Amortize every tranche independently, route the prepayment, and merge the
/// schedules into one combined amortization result.
pub fn amortize_composite(
    input: &CompositeLoanInput,
) -> HomeFinanceResult<ComputationOutput<AmortizationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_composite(input)?;

    let routed = route_prepayment(&input.tranches);
    if input.prepayment.is_some() && routed.is_none() {
        warnings.push("Prepayment ignored: every tranche has zero principal".into());
    }

    let results: Vec<AmortizationResult> = input
        .tranches
        .iter()
        .enumerate()
        .map(|(i, tranche)| {
            let event = match routed {
                Some(r) if r == i => input.prepayment.as_ref(),
                _ => None,
            };
            amortize(tranche, event)
        })
        .collect();

    for (i, result) in results.iter().enumerate() {
        if result.iteration_ceiling_hit {
            warnings.push(format!(
                "Tranche {}: balance did not reach zero within the iteration ceiling; schedule truncated at month {}",
                i, result.payoff_month
            ));
        }
    }

    let applied_lump_sum: Money = results.iter().map(|r| r.applied_lump_sum).sum();
    if let (Some(event), Some(_)) = (&input.prepayment, routed) {
        if applied_lump_sum.is_zero() && event.lump_sum > Decimal::ZERO {
            warnings.push(
                "Prepayment trigger month falls after loan payoff; no lump sum applied".into(),
            );
        } else if applied_lump_sum < event.lump_sum {
            warnings.push(format!(
                "Lump sum clamped to the remaining balance: applied {} of {}",
                applied_lump_sum, event.lump_sum
            ));
        }
    }

    let schedule = results
        .iter()
        .fold(Vec::new(), |acc, r| merge_schedules(&acc, &r.schedule));

    let first_payment_after_prepay = match &input.prepayment {
        Some(event) => schedule
            .get(event.trigger_month as usize)
            .or_else(|| schedule.last())
            .map(|r| r.payment)
            .unwrap_or(Decimal::ZERO),
        None => Decimal::ZERO,
    };

    let merged = AmortizationResult {
        total_interest: results.iter().map(|r| r.total_interest).sum(),
        total_payment: results.iter().map(|r| r.total_payment).sum(),
        payoff_month: results.iter().map(|r| r.payoff_month).max().unwrap_or(0),
        applied_lump_sum,
        first_payment_after_prepay,
        iteration_ceiling_hit: results.iter().any(|r| r.iteration_ceiling_hit),
        schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Composite Loan Amortization",
        &serde_json::json!({
            "num_tranches": input.tranches.len(),
            "total_principal": input.tranches.iter().map(|t| t.principal).sum::<Decimal>().to_string(),
            "has_prepayment": input.prepayment.is_some(),
        }),
        warnings,
        elapsed,
        merged,
    ))
}

fn validate_composite(input: &CompositeLoanInput) -> HomeFinanceResult<()> {
    if input.tranches.is_empty() {
        return Err(HomeFinanceError::InsufficientData(
            "At least one tranche required".into(),
        ));
    }
    for (i, tranche) in input.tranches.iter().enumerate() {
        if tranche.principal < Decimal::ZERO {
            return Err(HomeFinanceError::InvalidInput {
                field: format!("tranches[{i}].principal"),
                reason: "Principal cannot be negative".into(),
            });
        }
        if tranche.annual_rate < Decimal::ZERO {
            return Err(HomeFinanceError::InvalidInput {
                field: format!("tranches[{i}].annual_rate"),
                reason: "Annual rate cannot be negative".into(),
            });
        }
    }
    if let Some(event) = &input.prepayment {
        if event.trigger_month == 0 {
            return Err(HomeFinanceError::InvalidInput {
                field: "prepayment.trigger_month".into(),
                reason: "Trigger month is 1-based and must be at least 1".into(),
            });
        }
        if event.lump_sum < Decimal::ZERO {
            return Err(HomeFinanceError::InvalidInput {
                field: "prepayment.lump_sum".into(),
                reason: "Lump sum cannot be negative".into(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn blended_split() -> LoanSplit {
        LoanSplit {
            loan_amount: dec!(2_000_000),
            program: LoanProgram::Blended,
            market_rate: dec!(0.049),
            subsidized_rate: dec!(0.031),
            subsidized_quota: dec!(800_000),
            term_months: 360,
            method: RepaymentMethod::EqualInstallment,
        }
    }

    // -----------------------------------------------------------------------
    // 1. Blended split honors the quota
    // -----------------------------------------------------------------------
    #[test]
    fn test_split_honors_quota() {
        let tranches = split_loan(&blended_split());
        assert_eq!(tranches.len(), 2);
        assert_eq!(tranches[0].principal, dec!(1_200_000));
        assert_eq!(tranches[0].annual_rate, dec!(0.049));
        assert_eq!(tranches[1].principal, dec!(800_000));
        assert_eq!(tranches[1].annual_rate, dec!(0.031));
    }

    // -----------------------------------------------------------------------
    // 2. Single-program splits leave the other tranche empty
    // -----------------------------------------------------------------------
    #[test]
    fn test_split_single_program() {
        let mut split = blended_split();
        split.program = LoanProgram::Market;
        let tranches = split_loan(&split);
        assert_eq!(tranches[0].principal, dec!(2_000_000));
        assert_eq!(tranches[1].principal, Decimal::ZERO);

        split.program = LoanProgram::Subsidized;
        let tranches = split_loan(&split);
        assert_eq!(tranches[0].principal, Decimal::ZERO);
        assert_eq!(tranches[1].principal, dec!(2_000_000));
    }

    // -----------------------------------------------------------------------
    // 3. Small loans fit entirely inside the quota
    // -----------------------------------------------------------------------
    #[test]
    fn test_split_below_quota() {
        let mut split = blended_split();
        split.loan_amount = dec!(500_000);
        let tranches = split_loan(&split);
        assert_eq!(tranches[0].principal, Decimal::ZERO);
        assert_eq!(tranches[1].principal, dec!(500_000));
    }

    // -----------------------------------------------------------------------
    // 4. Merging with an all-zero schedule of equal length is identity
    // -----------------------------------------------------------------------
    #[test]
    fn test_merge_with_zero_schedule_is_identity() {
        let terms = LoanTerms {
            principal: dec!(500_000),
            term_months: 120,
            annual_rate: dec!(0.04),
            method: RepaymentMethod::EqualInstallment,
        };
        let base = amortize(&terms, None);
        let zeros: Vec<PeriodRecord> = base
            .schedule
            .iter()
            .map(|r| PeriodRecord {
                month_index: r.month_index,
                payment: Decimal::ZERO,
                principal_component: Decimal::ZERO,
                interest_component: Decimal::ZERO,
                remaining_balance: Decimal::ZERO,
                is_prepayment_month: false,
            })
            .collect();

        let merged = merge_schedules(&base.schedule, &zeros);
        assert_eq!(merged.len(), base.schedule.len());
        for (m, o) in merged.iter().zip(base.schedule.iter()) {
            assert_eq!(m.payment, o.payment);
            assert_eq!(m.principal_component, o.principal_component);
            assert_eq!(m.interest_component, o.interest_component);
            assert_eq!(m.remaining_balance, o.remaining_balance);
            assert_eq!(m.is_prepayment_month, o.is_prepayment_month);
        }
    }

    // -----------------------------------------------------------------------
    // 5. Merged length is the max; the shorter source contributes zero
    // -----------------------------------------------------------------------
    #[test]
    fn test_merge_uneven_lengths() {
        let long = amortize(
            &LoanTerms {
                principal: dec!(500_000),
                term_months: 240,
                annual_rate: dec!(0.05),
                method: RepaymentMethod::EqualInstallment,
            },
            None,
        );
        let short = amortize(
            &LoanTerms {
                principal: dec!(200_000),
                term_months: 120,
                annual_rate: dec!(0.03),
                method: RepaymentMethod::EqualInstallment,
            },
            None,
        );
        let merged = merge_schedules(&long.schedule, &short.schedule);
        assert_eq!(merged.len(), 240);
        // Past month 120 only the long tranche contributes.
        assert_eq!(merged[200].payment, long.schedule[200].payment);
        assert_eq!(merged[200].month_index, 201);
    }

    // -----------------------------------------------------------------------
    // 6. Composite totals equal the sum of tranche totals
    // -----------------------------------------------------------------------
    #[test]
    fn test_composite_totals() {
        let tranches = split_loan(&blended_split());
        let separate: Decimal = tranches.iter().map(|t| amortize(t, None).total_interest).sum();

        let input = CompositeLoanInput {
            tranches,
            prepayment: None,
        };
        let result = amortize_composite(&input).unwrap();
        assert_eq!(result.result.total_interest, separate);
        assert_eq!(result.result.payoff_month, 360);
    }

    // -----------------------------------------------------------------------
    // 7. Prepayment routes to the higher-rate nonzero tranche
    // -----------------------------------------------------------------------
    #[test]
    fn test_prepayment_routing() {
        let tranches = split_loan(&blended_split());
        let event = PrepaymentEvent {
            trigger_month: 24,
            lump_sum: dec!(100_000),
            strategy: crate::loan::amortization::PrepaymentStrategy::ReduceTerm,
        };
        let with_prepay = amortize_composite(&CompositeLoanInput {
            tranches: tranches.clone(),
            prepayment: Some(event.clone()),
        })
        .unwrap();

        // The market tranche alone, prepaid, pays off earlier than baseline.
        let market_prepaid = amortize(&tranches[0], Some(&event));
        let market_base = amortize(&tranches[0], None);
        assert!(market_prepaid.payoff_month < market_base.payoff_month);
        // The subsidized tranche still runs full term, so the merged payoff
        // stays at 360 while total interest drops.
        assert_eq!(with_prepay.result.payoff_month, 360);
        let base = amortize_composite(&CompositeLoanInput {
            tranches,
            prepayment: None,
        })
        .unwrap();
        assert!(with_prepay.result.total_interest < base.result.total_interest);
    }

    // -----------------------------------------------------------------------
    // 8. Routing skips zero-principal tranches
    // -----------------------------------------------------------------------
    #[test]
    fn test_routing_skips_empty_tranches() {
        let mut split = blended_split();
        split.loan_amount = dec!(500_000); // fits inside the quota
        let tranches = split_loan(&split);
        assert_eq!(route_prepayment(&tranches), Some(1));

        split.program = LoanProgram::Market;
        let tranches = split_loan(&split);
        assert_eq!(route_prepayment(&tranches), Some(0));
    }

    // -----------------------------------------------------------------------
    // 9. Validation errors
    // -----------------------------------------------------------------------
    #[test]
    fn test_validation() {
        assert!(amortize_composite(&CompositeLoanInput {
            tranches: vec![],
            prepayment: None,
        })
        .is_err());

        let negative_rate = CompositeLoanInput {
            tranches: vec![LoanTerms {
                principal: dec!(100_000),
                term_months: 120,
                annual_rate: dec!(-0.01),
                method: RepaymentMethod::EqualInstallment,
            }],
            prepayment: None,
        };
        assert!(amortize_composite(&negative_rate).is_err());
    }

    // -----------------------------------------------------------------------
    // 10. Clamped lump sum is surfaced as a warning
    // -----------------------------------------------------------------------
    #[test]
    fn test_clamp_warning() {
        let input = CompositeLoanInput {
            tranches: vec![LoanTerms {
                principal: dec!(100_000),
                term_months: 120,
                annual_rate: dec!(0.05),
                method: RepaymentMethod::EqualInstallment,
            }],
            prepayment: Some(PrepaymentEvent {
                trigger_month: 12,
                lump_sum: dec!(1_000_000),
                strategy: crate::loan::amortization::PrepaymentStrategy::ReduceTerm,
            }),
        };
        let result = amortize_composite(&input).unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("clamped")));
        assert!(result.result.applied_lump_sum < dec!(1_000_000));
    }
}
