//! Business-rule configuration.
//!
//! [`PayrollRules`] gathers every threshold, rate and fixed amount the
//! bonus evaluators consult.  A run receives it by reference and never
//! mutates it.  Rules may be stored externally as a JSON file and loaded
//! with [`PayrollRules::from_json_file`]; missing sections fall back to
//! the clinic's standing rules from [`PayrollRules::default`].

use crate::error::{PayrollError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Complete rule set for a payroll run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayrollRules {
    pub fixed_pay: FixedPay,
    /// Team-bonus table keyed by formal-staff headcount.
    pub team_bonus: BTreeMap<u32, TeamBonusRule>,
    pub visit_tiers: VisitTierRules,
    pub charge_target: ChargeTargetRules,
    pub consumption: ConsumptionRules,
    pub dual_target: DualTargetRules,
    pub new_customer: NewCustomerRules,
}

/// Store-wide pay identical for every employee in a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedPay {
    pub base_salary: Decimal,
    pub meal_allowance: Decimal,
    pub overtime_pay: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamBonusRule {
    pub required_revenue: Decimal,
    /// Minimum `total_consumption / total_revenue`.
    pub required_consumption_ratio: Decimal,
    /// Paid in full to every formal-staff member; never divided.
    pub bonus_per_person: Decimal,
}

/// Visit-count incentive.  Tier 1 covers `tier1_start..=tier1_end`,
/// tier 2 every visit above `tier1_end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitTierRules {
    pub tier1_start: u32,
    pub tier1_end: u32,
    pub tier1_rate: Decimal,
    pub tier2_rate: Decimal,
}

/// One revenue step of the charge-target bonus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueTier {
    pub threshold: Decimal,
    pub bonus: Decimal,
}

/// How mask sales combine with the revenue tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChargeTargetMode {
    /// The mask quota gates the bonus; the highest revenue tier reached
    /// pays its value as a replacement, not a sum.
    Tiered,
    /// No quota gate.  Each mask sale earns `per_mask_bonus` up to
    /// `mask_bonus_cap`, added to the revenue-tier value, with the sum
    /// capped at `overall_cap`.
    Additive {
        per_mask_bonus: Decimal,
        mask_bonus_cap: Decimal,
        overall_cap: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeTargetRules {
    pub mode: ChargeTargetMode,
    pub mask_quota: u32,
    /// Ascending by threshold.
    pub revenue_tiers: Vec<RevenueTier>,
}

/// One personal-consumption step of the pooled consumption bonus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionTier {
    pub threshold: Decimal,
    /// Fraction of the store's total consumption paid out.
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRules {
    /// Ascending by threshold.
    pub tiers: Vec<ConsumptionTier>,
}

/// What the dual-target bonus checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DualTargetBasis {
    /// Charge-target and consumption evaluators must both pay out.
    EvaluatorOutcomes,
    /// Raw thresholds only: personal consumption and personal revenue
    /// against the lowest tier of each table, mask quota ignored.
    RawThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualTargetRules {
    pub basis: DualTargetBasis,
    pub bonus: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCustomerRules {
    pub min_visits: u32,
    /// Fractional form.
    pub min_rate: Decimal,
    pub bonus: Decimal,
}

impl Default for PayrollRules {
    fn default() -> Self {
        let ratio = Decimal::new(75, 2);
        let team_bonus: BTreeMap<u32, TeamBonusRule> = [
            (2, 500_000, 5_000),
            (3, 750_000, 5_600),
            (4, 1_000_000, 6_000),
            (5, 1_250_000, 6_250),
            (6, 1_500_000, 6_500),
        ]
        .into_iter()
        .map(|(headcount, revenue, bonus): (u32, i64, i64)| {
            (
                headcount,
                TeamBonusRule {
                    required_revenue: Decimal::from(revenue),
                    required_consumption_ratio: ratio,
                    bonus_per_person: Decimal::from(bonus),
                },
            )
        })
        .collect();

        Self {
            fixed_pay: FixedPay::default(),
            team_bonus,
            visit_tiers: VisitTierRules::default(),
            charge_target: ChargeTargetRules::default(),
            consumption: ConsumptionRules::default(),
            dual_target: DualTargetRules::default(),
            new_customer: NewCustomerRules::default(),
        }
    }
}

impl Default for FixedPay {
    fn default() -> Self {
        Self {
            base_salary: Decimal::from(25_590),
            meal_allowance: Decimal::from(3_000),
            overtime_pay: Decimal::new(24_614, 1),
        }
    }
}

impl Default for VisitTierRules {
    fn default() -> Self {
        Self {
            tier1_start: 111,
            tier1_end: 132,
            tier1_rate: Decimal::from(100),
            tier2_rate: Decimal::from(200),
        }
    }
}

impl Default for ChargeTargetRules {
    fn default() -> Self {
        Self {
            mode: ChargeTargetMode::Tiered,
            mask_quota: 7,
            revenue_tiers: vec![
                RevenueTier {
                    threshold: Decimal::from(250_000),
                    bonus: Decimal::from(2_000),
                },
                RevenueTier {
                    threshold: Decimal::from(300_000),
                    bonus: Decimal::from(7_000),
                },
            ],
        }
    }
}

impl ChargeTargetMode {
    /// The historical additive variant with its standing caps.
    pub fn additive() -> Self {
        Self::Additive {
            per_mask_bonus: Decimal::from(1_000),
            mask_bonus_cap: Decimal::from(7_000),
            overall_cap: Decimal::from(7_000),
        }
    }
}

impl Default for ConsumptionRules {
    fn default() -> Self {
        Self {
            tiers: vec![
                ConsumptionTier {
                    threshold: Decimal::from(180_000),
                    rate: Decimal::new(15, 3),
                },
                ConsumptionTier {
                    threshold: Decimal::from(200_000),
                    rate: Decimal::new(25, 3),
                },
            ],
        }
    }
}

impl Default for DualTargetRules {
    fn default() -> Self {
        Self {
            basis: DualTargetBasis::EvaluatorOutcomes,
            bonus: Decimal::from(2_000),
        }
    }
}

impl Default for NewCustomerRules {
    fn default() -> Self {
        Self {
            min_visits: 132,
            min_rate: Decimal::new(70, 2),
            bonus: Decimal::from(4_000),
        }
    }
}

impl PayrollRules {
    /// Load a rule set from a JSON file and validate it.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let rules: PayrollRules = serde_json::from_str(&data)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Reject tables the evaluators cannot interpret consistently.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(PayrollError::InvalidRules(msg));

        let fixed = &self.fixed_pay;
        if [fixed.base_salary, fixed.meal_allowance, fixed.overtime_pay]
            .iter()
            .any(|v| *v < Decimal::ZERO)
        {
            return fail("fixed pay components must be non-negative".into());
        }

        for (headcount, rule) in &self.team_bonus {
            if rule.required_revenue <= Decimal::ZERO {
                return fail(format!(
                    "team bonus for {headcount} staff needs a positive revenue requirement"
                ));
            }
            if rule.required_consumption_ratio < Decimal::ZERO
                || rule.bonus_per_person < Decimal::ZERO
            {
                return fail(format!("team bonus for {headcount} staff has a negative value"));
            }
        }

        let visits = &self.visit_tiers;
        if visits.tier1_end < visits.tier1_start {
            return fail(format!(
                "visit tier 1 ends at {} before it starts at {}",
                visits.tier1_end, visits.tier1_start
            ));
        }
        if visits.tier1_rate < Decimal::ZERO || visits.tier2_rate < Decimal::ZERO {
            return fail("visit tier rates must be non-negative".into());
        }

        let charge = &self.charge_target;
        if charge.revenue_tiers.is_empty() {
            return fail("charge target needs at least one revenue tier".into());
        }
        if !strictly_ascending(charge.revenue_tiers.iter().map(|t| t.threshold)) {
            return fail("charge target revenue tiers must be strictly ascending".into());
        }
        if let ChargeTargetMode::Additive {
            per_mask_bonus,
            mask_bonus_cap,
            overall_cap,
        } = &charge.mode
        {
            if *per_mask_bonus < Decimal::ZERO
                || *mask_bonus_cap < Decimal::ZERO
                || *overall_cap < Decimal::ZERO
            {
                return fail("additive charge target amounts must be non-negative".into());
            }
        }

        if self.consumption.tiers.is_empty() {
            return fail("consumption bonus needs at least one tier".into());
        }
        if !strictly_ascending(self.consumption.tiers.iter().map(|t| t.threshold)) {
            return fail("consumption tiers must be strictly ascending".into());
        }
        if self.consumption.tiers.iter().any(|t| t.rate < Decimal::ZERO) {
            return fail("consumption rates must be non-negative".into());
        }

        if self.dual_target.bonus < Decimal::ZERO || self.new_customer.bonus < Decimal::ZERO {
            return fail("fixed seasonal bonuses must be non-negative".into());
        }

        Ok(())
    }
}

fn strictly_ascending(values: impl Iterator<Item = Decimal>) -> bool {
    let values: Vec<Decimal> = values.collect();
    values.windows(2).all(|pair| pair[0] < pair[1])
}
