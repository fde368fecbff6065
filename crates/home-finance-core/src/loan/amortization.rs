//! Single-loan amortization: monthly schedules for annuity and
//! straight-principal repayment, with optional one-time lump-sum prepayment
//! and the re-amortization that follows it. All math in
//! `rust_decimal::Decimal`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum balance threshold below which the loan is considered fully paid.
pub const BALANCE_EPSILON: Decimal = dec!(0.01);

/// Hard cap on the loan term (100 years).
pub const MAX_TERM_MONTHS: u32 = 1200;

/// Extra iterations allowed past the nominal term before the loop gives up.
const ITERATION_BUFFER: u32 = 360;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// How the loan is repaid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepaymentMethod {
    /// Constant payment (annuity): interest share shrinks over time.
    EqualInstallment,
    /// Constant principal: payment declines over time.
    EqualPrincipal,
}

/// What happens to the schedule after a lump-sum prepayment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrepaymentStrategy {
    /// Keep the term, recompute a lower steady-state payment.
    ReducePayment,
    /// Keep the payment (annuity) or the principal portion (straight
    /// principal); the loan pays off early as a natural consequence.
    ReduceTerm,
}

/// One tranche of a loan: its principal, term, rate, and repayment method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Outstanding principal at origination.
    pub principal: Money,
    /// Term in months; clamped to [1, 1200].
    pub term_months: u32,
    /// Annual rate as a decimal (0.05 = 5%).
    pub annual_rate: Rate,
    pub method: RepaymentMethod,
}

/// A one-time lump-sum prepayment. At most one per sub-loan lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepaymentEvent {
    /// 1-based month in which the lump sum is paid.
    pub trigger_month: u32,
    /// Cash applied to principal that month, on top of the scheduled payment.
    pub lump_sum: Money,
    pub strategy: PrepaymentStrategy,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One month of the schedule. Immutable once produced, ordered by month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodRecord {
    /// 1-based month index.
    pub month_index: u32,
    /// Scheduled payment for the month (excludes any lump sum).
    pub payment: Money,
    /// Principal retired this month, including any applied lump sum.
    pub principal_component: Money,
    /// Interest accrued this month.
    pub interest_component: Money,
    /// Balance after this month's payment. Never negative.
    pub remaining_balance: Money,
    /// True in the month a lump-sum prepayment was applied.
    pub is_prepayment_month: bool,
}

/// Full amortization of a single loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationResult {
    pub schedule: Vec<PeriodRecord>,
    pub total_interest: Money,
    /// Sum of scheduled payments (lump sums tracked separately).
    pub total_payment: Money,
    /// Month in which the balance reached zero.
    pub payoff_month: u32,
    /// Lump sum actually applied, after clamping to the remaining balance.
    pub applied_lump_sum: Money,
    /// Scheduled payment of the first month after the prepayment (zero when
    /// no prepayment was given).
    pub first_payment_after_prepay: Money,
    /// True when the balance failed to reach zero within the iteration
    /// ceiling; the reported payoff month is then a truncation point.
    pub iteration_ceiling_hit: bool,
}

impl AmortizationResult {
    /// Zero-loan result. Signals "no loan", not an error.
    pub fn empty() -> Self {
        AmortizationResult {
            schedule: Vec::new(),
            total_interest: Decimal::ZERO,
            total_payment: Decimal::ZERO,
            payoff_month: 0,
            applied_lump_sum: Decimal::ZERO,
            first_payment_after_prepay: Decimal::ZERO,
            iteration_ceiling_hit: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Decimal helpers
// ---------------------------------------------------------------------------

/// Compute (1 + r)^n via iterative multiplication (avoids Decimal::powd drift).
pub fn compound(rate: Rate, n: u32) -> Decimal {
    let mut result = Decimal::ONE;
    let factor = Decimal::ONE + rate;
    for _ in 0..n {
        result *= factor;
    }
    result
}

/// Steady-state payment fully retiring `principal` over `months` at
/// `monthly_rate`: `P·r·(1+r)^n / ((1+r)^n − 1)`. Zero-rate loans divide
/// linearly.
pub fn annuity_payment(principal: Money, monthly_rate: Rate, months: u32) -> Money {
    if months == 0 {
        return principal;
    }
    if monthly_rate <= Decimal::ZERO {
        return principal / Decimal::from(months);
    }
    let growth = compound(monthly_rate, months);
    principal * monthly_rate * growth / (growth - Decimal::ONE)
}

// ---------------------------------------------------------------------------
// Fold state
// ---------------------------------------------------------------------------

/// Per-period amortizer state. Each period consumes the previous state and
/// produces the next, so re-amortization after a prepayment is an explicit
/// state transition instead of a mutated loop variable.
#[derive(Debug, Clone, Copy)]
struct PeriodState {
    remaining: Money,
    /// Current steady-state payment (EqualInstallment only).
    level_payment: Money,
    /// Current per-period principal (EqualPrincipal only).
    fixed_principal: Money,
}

impl PeriodState {
    fn opening(principal: Money, monthly_rate: Rate, term_months: u32, method: RepaymentMethod) -> Self {
        match method {
            RepaymentMethod::EqualInstallment => PeriodState {
                remaining: principal,
                level_payment: annuity_payment(principal, monthly_rate, term_months),
                fixed_principal: Decimal::ZERO,
            },
            RepaymentMethod::EqualPrincipal => PeriodState {
                remaining: principal,
                level_payment: Decimal::ZERO,
                fixed_principal: principal / Decimal::from(term_months),
            },
        }
    }

    fn advanced(self, remaining: Money) -> Self {
        PeriodState { remaining, ..self }
    }

    fn reamortized(
        self,
        remaining: Money,
        monthly_rate: Rate,
        remaining_months: u32,
        strategy: PrepaymentStrategy,
        method: RepaymentMethod,
    ) -> Self {
        match strategy {
            PrepaymentStrategy::ReducePayment if remaining_months > 0 => match method {
                RepaymentMethod::EqualInstallment => PeriodState {
                    remaining,
                    level_payment: annuity_payment(remaining, monthly_rate, remaining_months),
                    ..self
                },
                RepaymentMethod::EqualPrincipal => PeriodState {
                    remaining,
                    fixed_principal: remaining / Decimal::from(remaining_months),
                    ..self
                },
            },
            // ReduceTerm (and ReducePayment with no months left): carry the
            // payment parameters forward unchanged.
            _ => PeriodState { remaining, ..self },
        }
    }
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Amortize a single loan month by month, applying at most one lump-sum
/// prepayment.
///
/// A non-positive principal or a zero term yields an empty result. A lump
/// sum exceeding the remaining balance is clamped so the loan lands exactly
/// on zero; the applied amount is reported in the result.
pub fn amortize(terms: &LoanTerms, prepayment: Option<&PrepaymentEvent>) -> AmortizationResult {
    if terms.principal <= Decimal::ZERO || terms.term_months == 0 {
        return AmortizationResult::empty();
    }

    let term_months = terms.term_months.min(MAX_TERM_MONTHS);
    let monthly_rate = if terms.annual_rate > Decimal::ZERO {
        terms.annual_rate / dec!(12)
    } else {
        Decimal::ZERO
    };

    let mut state = PeriodState::opening(terms.principal, monthly_rate, term_months, terms.method);

    let mut schedule: Vec<PeriodRecord> = Vec::with_capacity(term_months as usize);
    let mut total_interest = Decimal::ZERO;
    let mut total_payment = Decimal::ZERO;
    let mut applied_lump_sum = Decimal::ZERO;
    let mut payoff_month = term_months;
    let mut payoff_found = false;

    for month in 1..=term_months + ITERATION_BUFFER {
        if state.remaining <= BALANCE_EPSILON {
            payoff_month = month - 1;
            payoff_found = true;
            break;
        }

        let is_prepayment_month = prepayment
            .map_or(false, |p| p.trigger_month == month && p.lump_sum > Decimal::ZERO);

        let interest = state.remaining * monthly_rate;
        let (mut payment, mut principal_pay) = match terms.method {
            RepaymentMethod::EqualInstallment => {
                let mut payment = state.level_payment;
                // Final-period adjustment: never collect more than the
                // payoff amount.
                if state.remaining * (Decimal::ONE + monthly_rate) < payment {
                    payment = state.remaining * (Decimal::ONE + monthly_rate);
                }
                (payment, payment - interest)
            }
            RepaymentMethod::EqualPrincipal => {
                (state.fixed_principal + interest, state.fixed_principal)
            }
        };
        if principal_pay > state.remaining {
            principal_pay = state.remaining;
            payment = principal_pay + interest;
        }

        // Lump sum adds to this month's principal reduction, clamped so the
        // balance never goes below zero.
        let mut extra = if is_prepayment_month {
            prepayment.map(|p| p.lump_sum).unwrap_or_default()
        } else {
            Decimal::ZERO
        };
        let remaining = if principal_pay + extra >= state.remaining {
            extra = (state.remaining - principal_pay).max(Decimal::ZERO);
            Decimal::ZERO
        } else {
            state.remaining - principal_pay - extra
        };
        if is_prepayment_month {
            applied_lump_sum += extra;
        }

        schedule.push(PeriodRecord {
            month_index: month,
            payment,
            principal_component: principal_pay + extra,
            interest_component: interest,
            remaining_balance: remaining,
            is_prepayment_month,
        });

        total_interest += interest;
        total_payment += payment;

        state = if is_prepayment_month && remaining > Decimal::ZERO {
            let strategy = prepayment.map(|p| p.strategy).unwrap_or(PrepaymentStrategy::ReduceTerm);
            state.reamortized(
                remaining,
                monthly_rate,
                term_months.saturating_sub(month),
                strategy,
                terms.method,
            )
        } else {
            state.advanced(remaining)
        };
    }

    // The loop may spend its final allowed pass zeroing the balance; only
    // an unpaid residue counts as ceiling exhaustion.
    if !payoff_found && state.remaining <= BALANCE_EPSILON {
        payoff_month = schedule.len() as u32;
        payoff_found = true;
    }

    let first_payment_after_prepay = match prepayment {
        Some(p) => schedule
            .get(p.trigger_month as usize)
            .or_else(|| schedule.last())
            .map(|r| r.payment)
            .unwrap_or(Decimal::ZERO),
        None => Decimal::ZERO,
    };

    AmortizationResult {
        schedule,
        total_interest,
        total_payment,
        payoff_month,
        applied_lump_sum,
        first_payment_after_prepay,
        iteration_ceiling_hit: !payoff_found,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const TOL: Decimal = dec!(0.05);

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal, msg: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "{}: expected ~{}, got {} (diff = {})",
            msg,
            expected,
            actual,
            diff
        );
    }

    fn standard_terms() -> LoanTerms {
        LoanTerms {
            principal: dec!(1_000_000),
            term_months: 360,
            annual_rate: dec!(0.05),
            method: RepaymentMethod::EqualInstallment,
        }
    }

    // -----------------------------------------------------------------------
    // 1. Golden fixture: 1M @ 5% / 360m annuity
    // -----------------------------------------------------------------------
    #[test]
    fn test_golden_annuity_payment() {
        let result = amortize(&standard_terms(), None);
        assert_close(
            result.schedule[0].payment,
            dec!(5368.22),
            TOL,
            "30y 5% annuity payment",
        );
        assert_close(
            result.total_interest,
            dec!(932_559),
            dec!(10),
            "30y 5% total interest",
        );
        assert_eq!(result.payoff_month, 360);
        assert_eq!(result.schedule.len(), 360);
    }

    // -----------------------------------------------------------------------
    // 2. Zero-rate annuity: linear division, no interest
    // -----------------------------------------------------------------------
    #[test]
    fn test_zero_rate_is_linear() {
        let terms = LoanTerms {
            principal: dec!(360_000),
            term_months: 360,
            annual_rate: Decimal::ZERO,
            method: RepaymentMethod::EqualInstallment,
        };
        let result = amortize(&terms, None);
        for record in &result.schedule {
            assert_eq!(record.payment, dec!(1000), "zero-rate payment is P/n");
            assert_eq!(record.interest_component, Decimal::ZERO);
        }
        assert_eq!(result.total_interest, Decimal::ZERO);
        assert_eq!(result.payoff_month, 360);
    }

    // -----------------------------------------------------------------------
    // 3. Principal components sum to the original principal
    // -----------------------------------------------------------------------
    #[test]
    fn test_principal_conservation() {
        let result = amortize(&standard_terms(), None);
        let total_principal: Decimal = result
            .schedule
            .iter()
            .map(|r| r.principal_component)
            .sum();
        assert_close(
            total_principal,
            dec!(1_000_000),
            dec!(0.01),
            "sum of principal components",
        );
    }

    // -----------------------------------------------------------------------
    // 4. Balance is monotonically non-increasing and ends at zero
    // -----------------------------------------------------------------------
    #[test]
    fn test_balance_monotonic_to_zero() {
        let result = amortize(&standard_terms(), None);
        let mut prev = dec!(1_000_000);
        for record in &result.schedule {
            assert!(
                record.remaining_balance <= prev,
                "month {}: balance {} should not exceed previous {}",
                record.month_index,
                record.remaining_balance,
                prev
            );
            assert!(record.remaining_balance >= Decimal::ZERO);
            prev = record.remaining_balance;
        }
        let last = result.schedule.last().unwrap();
        assert!(last.remaining_balance <= BALANCE_EPSILON);
    }

    // -----------------------------------------------------------------------
    // 5. Equal principal: constant principal share, declining payments
    // -----------------------------------------------------------------------
    #[test]
    fn test_equal_principal_shape() {
        let terms = LoanTerms {
            principal: dec!(1_200_000),
            term_months: 240,
            annual_rate: dec!(0.04),
            method: RepaymentMethod::EqualPrincipal,
        };
        let result = amortize(&terms, None);
        let expected_principal = dec!(1_200_000) / dec!(240);
        for record in result.schedule.iter().take(result.schedule.len() - 1) {
            assert_close(
                record.principal_component,
                expected_principal,
                dec!(0.01),
                "fixed principal share",
            );
        }
        let first = result.schedule.first().unwrap().payment;
        let last = result.schedule.last().unwrap().payment;
        assert!(first > last, "declining payments: {first} vs {last}");
        assert_eq!(result.payoff_month, 240);
    }

    // -----------------------------------------------------------------------
    // 6. Empty results for degenerate loans
    // -----------------------------------------------------------------------
    #[test]
    fn test_empty_for_no_loan() {
        let zero_principal = LoanTerms {
            principal: Decimal::ZERO,
            term_months: 360,
            annual_rate: dec!(0.05),
            method: RepaymentMethod::EqualInstallment,
        };
        let result = amortize(&zero_principal, None);
        assert!(result.schedule.is_empty());
        assert_eq!(result.payoff_month, 0);

        let zero_term = LoanTerms {
            principal: dec!(100_000),
            term_months: 0,
            annual_rate: dec!(0.05),
            method: RepaymentMethod::EqualInstallment,
        };
        assert!(amortize(&zero_term, None).schedule.is_empty());

        let negative = LoanTerms {
            principal: dec!(-5),
            term_months: 12,
            annual_rate: dec!(0.05),
            method: RepaymentMethod::EqualInstallment,
        };
        assert!(amortize(&negative, None).schedule.is_empty());
    }

    // -----------------------------------------------------------------------
    // 7. ReduceTerm: earlier payoff, less interest, unchanged payment
    // -----------------------------------------------------------------------
    #[test]
    fn test_reduce_term_properties() {
        let terms = standard_terms();
        let baseline = amortize(&terms, None);
        let event = PrepaymentEvent {
            trigger_month: 60,
            lump_sum: dec!(200_000),
            strategy: PrepaymentStrategy::ReduceTerm,
        };
        let prepaid = amortize(&terms, Some(&event));

        assert!(prepaid.payoff_month < baseline.payoff_month);
        assert!(prepaid.total_interest < baseline.total_interest);
        assert_eq!(prepaid.applied_lump_sum, dec!(200_000));
        // Payment after the prepayment is the original annuity payment.
        assert_close(
            prepaid.first_payment_after_prepay,
            baseline.schedule[0].payment,
            dec!(0.01),
            "ReduceTerm keeps the payment",
        );
    }

    // -----------------------------------------------------------------------
    // 8. ReducePayment: same payoff, lower payment
    // -----------------------------------------------------------------------
    #[test]
    fn test_reduce_payment_properties() {
        let terms = standard_terms();
        let baseline = amortize(&terms, None);
        let event = PrepaymentEvent {
            trigger_month: 60,
            lump_sum: dec!(200_000),
            strategy: PrepaymentStrategy::ReducePayment,
        };
        let prepaid = amortize(&terms, Some(&event));

        assert_eq!(prepaid.payoff_month, baseline.payoff_month);
        assert!(
            prepaid.first_payment_after_prepay < baseline.schedule[0].payment,
            "new payment {} should be below original {}",
            prepaid.first_payment_after_prepay,
            baseline.schedule[0].payment
        );
        assert!(prepaid.total_interest < baseline.total_interest);
    }

    // -----------------------------------------------------------------------
    // 9. Overpaying lump sum is clamped and zeroes the loan
    // -----------------------------------------------------------------------
    #[test]
    fn test_lump_sum_overpay_clamped() {
        let terms = LoanTerms {
            principal: dec!(100_000),
            term_months: 120,
            annual_rate: dec!(0.06),
            method: RepaymentMethod::EqualInstallment,
        };
        let event = PrepaymentEvent {
            trigger_month: 12,
            lump_sum: dec!(500_000),
            strategy: PrepaymentStrategy::ReduceTerm,
        };
        let result = amortize(&terms, Some(&event));

        assert_eq!(result.payoff_month, 12);
        assert!(result.applied_lump_sum < dec!(500_000));
        let last = result.schedule.last().unwrap();
        assert!(last.is_prepayment_month);
        assert_eq!(last.remaining_balance, Decimal::ZERO);

        let total_principal: Decimal = result
            .schedule
            .iter()
            .map(|r| r.principal_component)
            .sum();
        assert_close(
            total_principal,
            dec!(100_000),
            dec!(0.01),
            "clamped prepayment conserves principal",
        );
    }

    // -----------------------------------------------------------------------
    // 10. Term is clamped to 100 years
    // -----------------------------------------------------------------------
    #[test]
    fn test_term_clamp() {
        let terms = LoanTerms {
            principal: dec!(100_000),
            term_months: 6000,
            annual_rate: dec!(0.03),
            method: RepaymentMethod::EqualInstallment,
        };
        let result = amortize(&terms, None);
        assert!(result.payoff_month <= MAX_TERM_MONTHS);
        assert!(!result.iteration_ceiling_hit);
    }

    // -----------------------------------------------------------------------
    // 11. Prepayment after natural payoff degenerates to baseline
    // -----------------------------------------------------------------------
    #[test]
    fn test_prepayment_past_payoff_is_baseline() {
        let terms = LoanTerms {
            principal: dec!(100_000),
            term_months: 60,
            annual_rate: dec!(0.05),
            method: RepaymentMethod::EqualInstallment,
        };
        let event = PrepaymentEvent {
            trigger_month: 120,
            lump_sum: dec!(50_000),
            strategy: PrepaymentStrategy::ReduceTerm,
        };
        let baseline = amortize(&terms, None);
        let result = amortize(&terms, Some(&event));

        assert_eq!(result.payoff_month, baseline.payoff_month);
        assert_eq!(result.total_interest, baseline.total_interest);
        assert_eq!(result.applied_lump_sum, Decimal::ZERO);
    }

    // -----------------------------------------------------------------------
    // 12. EqualPrincipal + ReduceTerm keeps the principal portion fixed
    // -----------------------------------------------------------------------
    #[test]
    fn test_equal_principal_reduce_term_keeps_principal_portion() {
        let terms = LoanTerms {
            principal: dec!(240_000),
            term_months: 240,
            annual_rate: dec!(0.04),
            method: RepaymentMethod::EqualPrincipal,
        };
        let event = PrepaymentEvent {
            trigger_month: 24,
            lump_sum: dec!(60_000),
            strategy: PrepaymentStrategy::ReduceTerm,
        };
        let result = amortize(&terms, Some(&event));
        let per_period = dec!(240_000) / dec!(240);

        // The month after the prepayment still retires the same principal.
        let after = &result.schedule[24];
        assert_close(
            after.principal_component,
            per_period,
            dec!(0.01),
            "principal portion after ReduceTerm",
        );
        assert!(result.payoff_month < 240);
    }
}
