//! Plain-text rendering of a payroll run for the command line.

use crate::models::{BonusResult, PayRunResult, PayrollLineItem};
use rust_decimal::Decimal;
use std::fmt::{self, Write};

/// Render `result` as a fixed-width summary.
pub fn render_text(result: &PayRunResult) -> String {
    let mut out = String::new();
    write_report(&mut out, result).expect("write payroll report");
    out
}

fn write_report(out: &mut String, result: &PayRunResult) -> fmt::Result {
    let summary = &result.summary;

    writeln!(out, "Store revenue:       {}", summary.total_revenue)?;
    writeln!(out, "Store consumption:   {}", summary.total_consumption)?;
    if let Some(ratio) = summary.consumption_ratio {
        if let Some(percent) = ratio.checked_mul(Decimal::ONE_HUNDRED) {
            writeln!(out, "Consumption ratio:   {}%", percent.round_dp(1))?;
        }
    }
    writeln!(
        out,
        "Team bonus ({} staff): {} [{}]",
        result.team_headcount, result.team_bonus.amount, result.team_bonus.reason
    )?;

    for item in &result.line_items {
        write_item(out, item)?;
    }

    writeln!(out)?;
    writeln!(out, "Base pay total:      {}", summary.base_pay_total)?;
    writeln!(out, "Seasonal total:      {}", summary.seasonal_bonus_total)?;
    writeln!(out, "Grand total:         {}", summary.grand_total)
}

fn write_item(out: &mut String, item: &PayrollLineItem) -> fmt::Result {
    let staff = if item.formal_staff { "formal" } else { "general" };
    writeln!(out)?;
    writeln!(out, "[{}] {} ({staff})", item.identifier, item.name)?;
    writeln!(
        out,
        "  base {} + meal {} + overtime {} + skill {} + team {} = {}",
        item.base_salary,
        item.meal_allowance,
        item.overtime_pay,
        item.skill_bonus,
        item.team_bonus,
        subtotal(item.base_pay_subtotal())
    )?;

    let e = &item.evaluations;
    let rows: [(&str, &BonusResult, _); 7] = [
        ("visit count", &e.visit_count, item.visit_count_bonus),
        ("charge target", &e.charge_target, item.charge_target_bonus),
        ("consumption", &e.consumption, item.consumption_bonus),
        ("dual target", &e.dual_target, item.dual_target_bonus),
        ("advanced course", &e.advanced_course, item.advanced_course_bonus),
        ("product sales", &e.product_sales, item.product_sales_bonus),
        ("new customer", &e.new_customer, item.new_customer_bonus),
    ];
    for (label, evaluation, paid) in rows {
        writeln!(out, "  {label:<16} {:>10}  {}", paid.to_string(), evaluation.reason)?;
    }
    writeln!(out, "  seasonal subtotal {}", subtotal(item.seasonal_subtotal()))?;
    writeln!(out, "  total {}", item.total)
}

fn subtotal(value: Option<Decimal>) -> String {
    value.map_or_else(|| "overflow".to_string(), |v| v.to_string())
}
