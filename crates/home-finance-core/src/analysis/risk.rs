//! Affordability risk scoring: a deterministic weighted-band classifier
//! over DTI, rent coverage, LTV, and leverage breadth. Not a statistical
//! model.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Inputs to the risk scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskInput {
    /// Mortgage payment plus existing monthly debt service.
    pub monthly_debt_service: Money,
    pub monthly_income: Money,
    /// Monthly rent over monthly payment (zero when there is no payment).
    pub coverage_ratio: Decimal,
    /// Loan principal over purchase price.
    pub ltv: Rate,
    /// Additional properties held, or an explicit investment purchase.
    pub multi_property_leverage: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Scored assessment, 0 (safe) to 100 (overextended).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: Decimal,
    pub risk_level: RiskLevel,
    pub dti: Rate,
    /// 0-100 view of how thin the rent coverage is.
    pub cash_flow_risk: Decimal,
    /// 0-100 view of the leverage taken on.
    pub leverage_risk: Decimal,
}

// ---------------------------------------------------------------------------
// Core function
// ---------------------------------------------------------------------------

/// Score the borrower. Pure and infallible: every input combination maps to
/// a defined band.
pub fn assess_risk(input: &RiskInput) -> RiskAssessment {
    let dti = if input.monthly_income > Decimal::ZERO {
        input.monthly_debt_service / input.monthly_income
    } else {
        Decimal::ZERO
    };

    let mut score = dec!(30);

    if dti > dec!(0.6) {
        score += dec!(50);
    } else if dti > dec!(0.5) {
        score += dec!(40);
    } else if dti > dec!(0.4) {
        score += dec!(20);
    }

    if input.coverage_ratio < dec!(0.8) {
        score += dec!(20);
    } else if input.coverage_ratio < dec!(1.0) {
        score += dec!(10);
    }

    if input.ltv > dec!(0.7) {
        score += dec!(10);
    }

    if input.multi_property_leverage {
        score += dec!(10);
    }

    let risk_score = score.clamp(Decimal::ZERO, dec!(100));
    let risk_level = if risk_score > dec!(70) {
        RiskLevel::High
    } else if risk_score > dec!(40) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let cash_flow_risk = if input.coverage_ratio > Decimal::ZERO {
        (dec!(50) / input.coverage_ratio).min(dec!(100))
    } else {
        dec!(100)
    };
    let leverage_risk = (input.ltv * dec!(100)).min(dec!(100)).max(Decimal::ZERO);

    RiskAssessment {
        risk_score,
        risk_level,
        dti,
        cash_flow_risk,
        leverage_risk,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
