//! Payroll computation engine.
//!
//! The `engine` module turns a [`PayRunInput`] into a [`PayRunResult`].
//! The roster is validated up front so that a bad record fails the run
//! before any line item exists.  The team bonus is evaluated once for
//! the store; the seasonal evaluators then run per employee, in
//! parallel via [`rayon`], and the results are gated on formal-staff
//! membership and summed.

use crate::bonus::{evaluate_seasonal, evaluate_team_bonus};
use crate::error::{PayrollError, Result};
use crate::models::{
    BonusResult, EmployeeMetrics, PayRunInput, PayRunResult, PayrollLineItem, PayrollSummary,
    SeasonalBonuses,
};
use crate::rules::{FixedPay, PayrollRules};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Runs a payroll for one reporting period.
pub fn run_payroll(input: &PayRunInput, rules: &PayrollRules) -> Result<PayRunResult> {
    validate_store(input)?;
    for employee in &input.employees {
        validate_employee(employee)?;
    }

    let formal_count = input.formal_staff.len() as u32;
    let headcount = input.team_headcount.unwrap_or(formal_count);
    if headcount != formal_count {
        warn!(
            headcount,
            formal_count, "team headcount differs from the number of formal staff"
        );
    }

    let team_bonus = evaluate_team_bonus(headcount, &input.store, &rules.team_bonus);
    if team_bonus.qualified {
        info!(headcount, amount = %team_bonus.amount, "team bonus reached");
    } else {
        warn!(headcount, reason = %team_bonus.reason, "team bonus not reached");
    }

    let line_items: Vec<PayrollLineItem> = input
        .employees
        .par_iter()
        .map(|employee| {
            let mask_sales = resolve_mask_sales(employee, &input.mask_sales);
            let evaluations = evaluate_seasonal(employee, mask_sales, &input.store, rules);
            let formal = input.formal_staff.contains(&employee.identifier);
            let item =
                build_line_item(employee, formal, &rules.fixed_pay, &team_bonus, evaluations)?;
            debug!(
                employee = %item.identifier,
                formal,
                total = %item.total,
                "employee payroll evaluated"
            );
            Ok(item)
        })
        .collect::<Result<_>>()?;

    let summary = summarize(input, &line_items)?;
    info!(
        employees = line_items.len(),
        grand_total = %summary.grand_total,
        "payroll run complete"
    );

    Ok(PayRunResult {
        team_headcount: headcount,
        team_bonus,
        line_items,
        summary,
    })
}

/// Mask sales for an employee: the store mapping first, then any count
/// carried on the record.  `None` means neither source knows the
/// identifier.
pub fn resolve_mask_sales(
    employee: &EmployeeMetrics,
    mask_sales: &HashMap<String, u32>,
) -> Option<u32> {
    mask_sales
        .get(&employee.identifier)
        .copied()
        .or(employee.mask_sale_count)
}

fn build_line_item(
    employee: &EmployeeMetrics,
    formal: bool,
    fixed: &FixedPay,
    team_bonus: &BonusResult,
    evaluations: SeasonalBonuses,
) -> Result<PayrollLineItem> {
    // Formal staff only; the two pass-through bonuses are paid to everyone.
    let gated = |result: &BonusResult| if formal { result.amount } else { Decimal::ZERO };

    let mut item = PayrollLineItem {
        identifier: employee.identifier.clone(),
        name: employee.name.clone(),
        formal_staff: formal,
        base_salary: fixed.base_salary,
        meal_allowance: fixed.meal_allowance,
        overtime_pay: fixed.overtime_pay,
        skill_bonus: employee.skill_bonus_accrued,
        team_bonus: gated(team_bonus),
        visit_count_bonus: gated(&evaluations.visit_count),
        charge_target_bonus: gated(&evaluations.charge_target),
        consumption_bonus: gated(&evaluations.consumption),
        dual_target_bonus: gated(&evaluations.dual_target),
        advanced_course_bonus: evaluations.advanced_course.amount,
        product_sales_bonus: evaluations.product_sales.amount,
        new_customer_bonus: gated(&evaluations.new_customer),
        total: Decimal::ZERO,
        evaluations,
    };
    let record = || format!("employee {}", item.identifier);
    let base = item
        .base_pay_subtotal()
        .ok_or_else(|| overflow(record(), "base pay subtotal"))?;
    let seasonal = item
        .seasonal_subtotal()
        .ok_or_else(|| overflow(record(), "seasonal subtotal"))?;
    let total = base
        .checked_add(seasonal)
        .ok_or_else(|| overflow(record(), "total"))?;
    item.total = total;
    Ok(item)
}

fn summarize(input: &PayRunInput, line_items: &[PayrollLineItem]) -> Result<PayrollSummary> {
    let mut base_pay_total = Decimal::ZERO;
    let mut seasonal_bonus_total = Decimal::ZERO;
    for item in line_items {
        // Each subtotal was already checked while building the item.
        base_pay_total = item
            .base_pay_subtotal()
            .and_then(|base| base_pay_total.checked_add(base))
            .ok_or_else(|| overflow("summary".into(), "base_pay_total"))?;
        seasonal_bonus_total = item
            .seasonal_subtotal()
            .and_then(|seasonal| seasonal_bonus_total.checked_add(seasonal))
            .ok_or_else(|| overflow("summary".into(), "seasonal_bonus_total"))?;
    }
    let grand_total = base_pay_total
        .checked_add(seasonal_bonus_total)
        .ok_or_else(|| overflow("summary".into(), "grand_total"))?;

    Ok(PayrollSummary {
        total_revenue: input.store.total_revenue,
        total_consumption: input.store.total_consumption,
        consumption_ratio: input.store.consumption_ratio(),
        base_pay_total,
        seasonal_bonus_total,
        grand_total,
    })
}

fn overflow(record: String, quantity: &'static str) -> PayrollError {
    PayrollError::Overflow { record, quantity }
}

fn validate_store(input: &PayRunInput) -> Result<()> {
    let store = &input.store;
    for (field, value) in [
        ("total_revenue", store.total_revenue),
        ("total_consumption", store.total_consumption),
    ] {
        if value < Decimal::ZERO {
            return Err(PayrollError::InvalidMetric {
                record: "store".into(),
                field,
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_employee(employee: &EmployeeMetrics) -> Result<()> {
    for (field, value) in [
        ("personal_revenue", employee.personal_revenue),
        ("personal_consumption", employee.personal_consumption),
        ("new_customer_conversion_rate", employee.new_customer_conversion_rate),
        ("skill_bonus_accrued", employee.skill_bonus_accrued),
        ("advanced_course_bonus_accrued", employee.advanced_course_bonus_accrued),
        ("product_sales_bonus_accrued", employee.product_sales_bonus_accrued),
    ] {
        if value < Decimal::ZERO {
            return Err(PayrollError::InvalidMetric {
                record: format!("employee {}", employee.identifier),
                field,
                value: value.to_string(),
            });
        }
    }
    Ok(())
}
