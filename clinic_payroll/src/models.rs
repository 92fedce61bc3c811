//! Data models for the clinic payroll engine.
//!
//! The `models` module defines the serialisable structs flowing through
//! a payroll run: the store-wide and per-employee metrics supplied by
//! the metrics provider, the per-evaluator [`BonusResult`], and the
//! final [`PayrollLineItem`] and [`PayrollSummary`] consumed by report
//! renderers.  All of them derive `Serialize` and `Deserialize` so they
//! can cross the HTTP API or be read from period files unchanged.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Store-wide facts for one reporting period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMetrics {
    /// Sum of the per-day revenue entries (new sales).
    pub total_revenue: Decimal,
    /// Sum of the per-day consumption entries (redeemed services).
    pub total_consumption: Decimal,
}

impl StoreMetrics {
    /// Consumption as a fraction of revenue, or `None` when the period
    /// has no revenue to compare against or the quotient does not fit
    /// in a `Decimal`.
    pub fn consumption_ratio(&self) -> Option<Decimal> {
        if self.total_revenue > Decimal::ZERO {
            self.total_consumption.checked_div(self.total_revenue)
        } else {
            None
        }
    }
}

/// Per-employee facts for one reporting period.
///
/// Every numeric field is required.  Callers normalise blank
/// spreadsheet cells before constructing this type; the engine treats
/// the values it receives as the real business figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeMetrics {
    /// Stable key used to look up mask-sale counts.  The CSV provider
    /// derives it from the employee's position in the roster sheet.
    pub identifier: String,
    pub name: String,
    pub personal_revenue: Decimal,
    pub personal_consumption: Decimal,
    /// Client visits attributed to the employee.
    pub visit_count: u32,
    /// Either a fraction (`0.7`) or a percentage (`70`).  Normalised by
    /// [`crate::bonus::normalize_rate`] before any comparison.
    pub new_customer_conversion_rate: Decimal,
    pub skill_bonus_accrued: Decimal,
    pub advanced_course_bonus_accrued: Decimal,
    pub product_sales_bonus_accrued: Decimal,
    /// Mask sales carried on the record itself.  The store-wide mapping
    /// in [`PayRunInput::mask_sales`] takes precedence when it has an
    /// entry for this identifier.
    #[serde(default)]
    pub mask_sale_count: Option<u32>,
}

/// Output of one bonus evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusResult {
    pub amount: Decimal,
    /// `amount > 0`; kept as a field so reports need not recompute it.
    pub qualified: bool,
    /// Human-readable explanation, populated for both outcomes.
    pub reason: String,
}

impl BonusResult {
    pub fn new(amount: Decimal, reason: impl Into<String>) -> Self {
        Self {
            amount,
            qualified: amount > Decimal::ZERO,
            reason: reason.into(),
        }
    }

    pub fn zero(reason: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, reason)
    }
}

/// The seven seasonal bonus evaluations for one employee, before any
/// formal-staff gating is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalBonuses {
    pub visit_count: BonusResult,
    pub charge_target: BonusResult,
    pub consumption: BonusResult,
    pub dual_target: BonusResult,
    pub advanced_course: BonusResult,
    pub product_sales: BonusResult,
    pub new_customer: BonusResult,
}

/// Final payroll result for a single employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollLineItem {
    pub identifier: String,
    pub name: String,
    pub formal_staff: bool,
    pub base_salary: Decimal,
    pub meal_allowance: Decimal,
    pub overtime_pay: Decimal,
    pub skill_bonus: Decimal,
    pub team_bonus: Decimal,
    pub visit_count_bonus: Decimal,
    pub charge_target_bonus: Decimal,
    pub consumption_bonus: Decimal,
    pub dual_target_bonus: Decimal,
    pub advanced_course_bonus: Decimal,
    pub product_sales_bonus: Decimal,
    pub new_customer_bonus: Decimal,
    pub total: Decimal,
    /// Evaluator outputs as computed, including those zeroed above by
    /// formal-staff gating.  Kept for audit.
    pub evaluations: SeasonalBonuses,
}

impl PayrollLineItem {
    /// Fixed pay plus skill and team bonus, `None` on overflow.
    pub fn base_pay_subtotal(&self) -> Option<Decimal> {
        checked_sum([
            self.base_salary,
            self.meal_allowance,
            self.overtime_pay,
            self.skill_bonus,
            self.team_bonus,
        ])
    }

    /// Sum of the seven seasonal components as paid, `None` on overflow.
    pub fn seasonal_subtotal(&self) -> Option<Decimal> {
        checked_sum([
            self.visit_count_bonus,
            self.charge_target_bonus,
            self.consumption_bonus,
            self.dual_target_bonus,
            self.advanced_course_bonus,
            self.product_sales_bonus,
            self.new_customer_bonus,
        ])
    }
}

/// Add up `values`, or `None` as soon as the running total overflows.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
}

/// Input to the payroll engine for one reporting period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayRunInput {
    pub store: StoreMetrics,
    /// The roster, in report order.
    pub employees: Vec<EmployeeMetrics>,
    /// Employee identifier to qualifying mask-sale count.
    #[serde(default)]
    pub mask_sales: HashMap<String, u32>,
    /// Identifiers of formal staff.
    #[serde(default)]
    pub formal_staff: BTreeSet<String>,
    /// Formal-staff headcount used for the team-bonus table.  Defaults
    /// to the size of `formal_staff` when omitted.
    #[serde(default)]
    pub team_headcount: Option<u32>,
}

/// Store-wide totals of a payroll run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollSummary {
    pub total_revenue: Decimal,
    pub total_consumption: Decimal,
    pub consumption_ratio: Option<Decimal>,
    /// Base salary, meal allowance, overtime, skill and team bonus
    /// summed over every employee.
    pub base_pay_total: Decimal,
    /// The seven seasonal components summed over every employee.
    pub seasonal_bonus_total: Decimal,
    pub grand_total: Decimal,
}

/// The aggregate result of a payroll run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayRunResult {
    /// Headcount the team bonus was evaluated for.
    pub team_headcount: u32,
    pub team_bonus: BonusResult,
    pub line_items: Vec<PayrollLineItem>,
    pub summary: PayrollSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumption_ratio_is_none_without_revenue() {
        let store = StoreMetrics {
            total_revenue: Decimal::ZERO,
            total_consumption: Decimal::from(5_000),
        };
        assert_eq!(store.consumption_ratio(), None);
    }

    #[test]
    fn consumption_ratio_is_none_when_the_quotient_overflows() {
        let store = StoreMetrics {
            total_revenue: Decimal::new(1, 28),
            total_consumption: Decimal::from(1_000_000_000),
        };
        assert_eq!(store.consumption_ratio(), None);
    }

    #[test]
    fn checked_sum_reports_overflow() {
        assert_eq!(checked_sum([Decimal::ONE, Decimal::TWO]), Some(Decimal::from(3)));
        assert_eq!(checked_sum([Decimal::MAX, Decimal::ONE]), None);
    }

    #[test]
    fn bonus_result_qualifies_only_above_zero() {
        assert!(BonusResult::new(Decimal::ONE, "ok").qualified);
        assert!(!BonusResult::zero("nothing").qualified);
    }
}
