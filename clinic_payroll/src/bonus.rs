//! Bonus rule evaluators.
//!
//! Each evaluator is a pure function from a handful of metrics and a
//! slice of [`PayrollRules`] to a [`BonusResult`].  None of them fail:
//! inputs outside the configured tables produce a zero amount and a
//! reason explaining why.  The only ordering constraint is the dual
//! target bonus, which reads the charge-target and consumption results.

use crate::models::{BonusResult, EmployeeMetrics, SeasonalBonuses, StoreMetrics};
use crate::rules::{
    ChargeTargetMode, ChargeTargetRules, ConsumptionRules, DualTargetBasis, NewCustomerRules,
    PayrollRules, RevenueTier, TeamBonusRule, VisitTierRules,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Bring a conversion rate to fractional form.  Values above one are
/// read as percentages (`70` is 70%); anything else is already a
/// fraction.
pub fn normalize_rate(raw: Decimal) -> Decimal {
    if raw > Decimal::ONE {
        raw / Decimal::ONE_HUNDRED
    } else {
        raw
    }
}

fn percent(fraction: Decimal) -> Decimal {
    (fraction * Decimal::ONE_HUNDRED).round_dp(1)
}

/// Team bonus for one formal-staff member.
///
/// Qualifies when store revenue reaches the rule's requirement and, for
/// a period with revenue, consumption is at least the required share of
/// it.  The amount is what each formal-staff member receives.
pub fn evaluate_team_bonus(
    headcount: u32,
    store: &StoreMetrics,
    table: &BTreeMap<u32, TeamBonusRule>,
) -> BonusResult {
    let Some(rule) = table.get(&headcount) else {
        return BonusResult::zero(format!("no team bonus rule for {headcount} formal staff"));
    };

    if store.total_revenue < rule.required_revenue {
        return BonusResult::zero(format!(
            "store revenue {} is {} short of the {} required for {headcount} formal staff",
            store.total_revenue,
            rule.required_revenue - store.total_revenue,
            rule.required_revenue
        ));
    }

    // No ratio means no revenue or a quotient too large to represent;
    // neither can fall short of the requirement.
    if let Some(ratio) = store.consumption_ratio() {
        if ratio < rule.required_consumption_ratio {
            return BonusResult::zero(format!(
                "consumption ratio {}% below the required {}%",
                percent(ratio),
                percent(rule.required_consumption_ratio)
            ));
        }
    }

    BonusResult::new(
        rule.bonus_per_person,
        format!(
            "store revenue {} and consumption {} meet the {headcount}-staff target; {} per formal staff member",
            store.total_revenue, store.total_consumption, rule.bonus_per_person
        ),
    )
}

/// Visit-count incentive.
///
/// Visits `tier1_start..=tier1_end` pay `tier1_rate` each and visits
/// past `tier1_end` pay `tier2_rate` each.  Nothing is paid below
/// `tier1_start`, so 110 visits earn nothing with the standing rules.
pub fn evaluate_visit_count(visit_count: u32, rules: &VisitTierRules) -> BonusResult {
    let tier1_top = visit_count.min(rules.tier1_end);
    let tier1_count = if tier1_top >= rules.tier1_start {
        tier1_top - rules.tier1_start + 1
    } else {
        0
    };
    let tier2_count = visit_count.saturating_sub(rules.tier1_end);

    if tier1_count == 0 && tier2_count == 0 {
        return BonusResult::zero(format!(
            "{visit_count} visits, incentive starts at visit {}",
            rules.tier1_start
        ));
    }

    let amount = Decimal::from(tier1_count) * rules.tier1_rate
        + Decimal::from(tier2_count) * rules.tier2_rate;

    let reason = if tier2_count > 0 {
        format!(
            "visits {}-{}: {tier1_count} x {} + visits {}-{visit_count}: {tier2_count} x {}",
            rules.tier1_start,
            rules.tier1_end,
            rules.tier1_rate,
            rules.tier1_end + 1,
            rules.tier2_rate
        )
    } else {
        format!(
            "visits {}-{visit_count}: {tier1_count} x {}",
            rules.tier1_start, rules.tier1_rate
        )
    };

    BonusResult::new(amount, reason)
}

fn highest_tier(revenue: Decimal, tiers: &[RevenueTier]) -> Option<&RevenueTier> {
    tiers.iter().rev().find(|tier| revenue >= tier.threshold)
}

fn lowest_revenue_threshold(rules: &ChargeTargetRules) -> Decimal {
    rules
        .revenue_tiers
        .first()
        .map(|tier| tier.threshold)
        .unwrap_or(Decimal::ZERO)
}

/// Charge-target bonus from personal revenue and mask sales.
///
/// `mask_sales` is `None` when the store mapping has no entry for the
/// employee; that counts as zero sales and is reported in the reason.
pub fn evaluate_charge_target(
    personal_revenue: Decimal,
    mask_sales: Option<u32>,
    rules: &ChargeTargetRules,
) -> BonusResult {
    let mask_count = mask_sales.unwrap_or(0);
    let mask_note = match mask_sales {
        Some(count) => format!("{count} mask sales"),
        None => "no mask sales recorded".to_string(),
    };
    let tier = highest_tier(personal_revenue, &rules.revenue_tiers);

    match &rules.mode {
        ChargeTargetMode::Tiered => {
            if mask_count < rules.mask_quota {
                return BonusResult::zero(format!(
                    "{mask_note}, quota is {}: {mask_count}/{}",
                    rules.mask_quota, rules.mask_quota
                ));
            }
            match tier {
                Some(tier) => BonusResult::new(
                    tier.bonus,
                    format!(
                        "revenue {personal_revenue} reached the {} tier with {mask_note}",
                        tier.threshold
                    ),
                ),
                None => BonusResult::zero(format!(
                    "revenue {personal_revenue} below the {} threshold",
                    lowest_revenue_threshold(rules)
                )),
            }
        }
        ChargeTargetMode::Additive {
            per_mask_bonus,
            mask_bonus_cap,
            overall_cap,
        } => {
            let revenue_part = tier.map(|t| t.bonus).unwrap_or(Decimal::ZERO);
            let mask_part = (Decimal::from(mask_count) * *per_mask_bonus).min(*mask_bonus_cap);
            let amount = (revenue_part + mask_part).min(*overall_cap);
            let revenue_note = match tier {
                Some(t) => format!("revenue tier {} pays {}", t.threshold, t.bonus),
                None => format!(
                    "revenue {personal_revenue} below the {} threshold",
                    lowest_revenue_threshold(rules)
                ),
            };
            BonusResult::new(
                amount,
                format!("{revenue_note}; {mask_note} pay {mask_part}; capped at {overall_cap}"),
            )
        }
    }
}

/// Pooled consumption bonus.
///
/// Personal consumption picks the tier; the payout is that tier's rate
/// applied to the store's total consumption, floored to a whole unit.
pub fn evaluate_consumption(
    personal_consumption: Decimal,
    total_consumption: Decimal,
    rules: &ConsumptionRules,
) -> BonusResult {
    let tier = rules
        .tiers
        .iter()
        .rev()
        .find(|tier| personal_consumption >= tier.threshold);

    match tier {
        Some(tier) => BonusResult::new(
            (total_consumption * tier.rate).floor(),
            format!(
                "consumption {personal_consumption} reached {}; {}% of store consumption {total_consumption}",
                tier.threshold,
                percent(tier.rate)
            ),
        ),
        None => BonusResult::zero(format!(
            "consumption {personal_consumption} below the {} threshold",
            rules
                .tiers
                .first()
                .map(|t| t.threshold)
                .unwrap_or(Decimal::ZERO)
        )),
    }
}

/// Dual-target bonus, paid when both the charge target and the
/// consumption target are met.
pub fn evaluate_dual_target(
    employee: &EmployeeMetrics,
    mask_sales: Option<u32>,
    charge: &BonusResult,
    consumption: &BonusResult,
    rules: &PayrollRules,
) -> BonusResult {
    let revenue_floor = lowest_revenue_threshold(&rules.charge_target);
    let consumption_floor = rules
        .consumption
        .tiers
        .first()
        .map(|t| t.threshold)
        .unwrap_or(Decimal::ZERO);

    let mut missing = Vec::new();
    match rules.dual_target.basis {
        DualTargetBasis::EvaluatorOutcomes => {
            if !charge.qualified {
                let mask_count = mask_sales.unwrap_or(0);
                if matches!(rules.charge_target.mode, ChargeTargetMode::Tiered)
                    && mask_count < rules.charge_target.mask_quota
                {
                    missing.push(format!(
                        "mask sales {mask_count}/{}",
                        rules.charge_target.mask_quota
                    ));
                } else if employee.personal_revenue < revenue_floor {
                    missing.push(format!(
                        "revenue {}/{revenue_floor}",
                        employee.personal_revenue
                    ));
                } else {
                    missing.push("charge target not met".to_string());
                }
            }
            if !consumption.qualified {
                missing.push(format!(
                    "consumption {}/{consumption_floor}",
                    employee.personal_consumption
                ));
            }
        }
        DualTargetBasis::RawThresholds => {
            if employee.personal_consumption < consumption_floor {
                missing.push(format!(
                    "consumption {}/{consumption_floor}",
                    employee.personal_consumption
                ));
            }
            if employee.personal_revenue < revenue_floor {
                missing.push(format!(
                    "revenue {}/{revenue_floor}",
                    employee.personal_revenue
                ));
            }
        }
    }

    if missing.is_empty() {
        BonusResult::new(rules.dual_target.bonus, "charge and consumption targets both met")
    } else {
        BonusResult::zero(format!("dual target not met: {}", missing.join(", ")))
    }
}

/// Advanced-course bonus: the provider's accrued value, unchanged.
pub fn evaluate_advanced_course(accrued: Decimal) -> BonusResult {
    BonusResult::new(accrued, "advanced course bonus accrued")
}

/// Product-sales bonus: the provider's accrued value, unchanged.
pub fn evaluate_product_sales(accrued: Decimal) -> BonusResult {
    BonusResult::new(accrued, "product sales bonus accrued")
}

/// New-customer conversion bonus.  A qualifying result is advisory:
/// attendance still has to be checked by hand before it is paid.
pub fn evaluate_new_customer(
    visit_count: u32,
    raw_rate: Decimal,
    rules: &NewCustomerRules,
) -> BonusResult {
    let rate = normalize_rate(raw_rate);
    let visits_ok = visit_count >= rules.min_visits;
    let rate_ok = rate >= rules.min_rate;

    if visits_ok && rate_ok {
        return BonusResult::new(
            rules.bonus,
            format!(
                "{visit_count} visits and {}% conversion met (attendance requires manual verification)",
                percent(rate)
            ),
        );
    }

    let mut missing = Vec::new();
    if !visits_ok {
        missing.push(format!("visits {visit_count}/{}", rules.min_visits));
    }
    if !rate_ok {
        missing.push(format!(
            "conversion {}%/{}%",
            percent(rate),
            percent(rules.min_rate)
        ));
    }
    BonusResult::zero(format!("not met: {}", missing.join(", ")))
}

/// Run all seven seasonal evaluators for one employee.
pub fn evaluate_seasonal(
    employee: &EmployeeMetrics,
    mask_sales: Option<u32>,
    store: &StoreMetrics,
    rules: &PayrollRules,
) -> SeasonalBonuses {
    let mut charge_target =
        evaluate_charge_target(employee.personal_revenue, mask_sales, &rules.charge_target);
    if mask_sales.is_none() {
        charge_target.reason = format!(
            "employee {}: {}",
            employee.identifier, charge_target.reason
        );
    }
    let consumption = evaluate_consumption(
        employee.personal_consumption,
        store.total_consumption,
        &rules.consumption,
    );
    let dual_target =
        evaluate_dual_target(employee, mask_sales, &charge_target, &consumption, rules);

    SeasonalBonuses {
        visit_count: evaluate_visit_count(employee.visit_count, &rules.visit_tiers),
        charge_target,
        consumption,
        dual_target,
        advanced_course: evaluate_advanced_course(employee.advanced_course_bonus_accrued),
        product_sales: evaluate_product_sales(employee.product_sales_bonus_accrued),
        new_customer: evaluate_new_customer(
            employee.visit_count,
            employee.new_customer_conversion_rate,
            &rules.new_customer,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn employee(revenue: i64, consumption: i64) -> EmployeeMetrics {
        EmployeeMetrics {
            identifier: "1".into(),
            name: "Test".into(),
            personal_revenue: d(revenue),
            personal_consumption: d(consumption),
            visit_count: 0,
            new_customer_conversion_rate: Decimal::ZERO,
            skill_bonus_accrued: Decimal::ZERO,
            advanced_course_bonus_accrued: Decimal::ZERO,
            product_sales_bonus_accrued: Decimal::ZERO,
            mask_sale_count: None,
        }
    }

    #[test]
    fn visit_bonus_tier_boundaries() {
        let rules = VisitTierRules::default();
        assert_eq!(evaluate_visit_count(0, &rules).amount, d(0));
        assert_eq!(evaluate_visit_count(110, &rules).amount, d(0));
        assert_eq!(evaluate_visit_count(111, &rules).amount, d(100));
        assert_eq!(evaluate_visit_count(132, &rules).amount, d(2_200));
        assert_eq!(evaluate_visit_count(133, &rules).amount, d(2_400));
        assert_eq!(evaluate_visit_count(134, &rules).amount, d(2_600));
    }

    #[test]
    fn visit_bonus_is_monotonic() {
        let rules = VisitTierRules::default();
        let amounts: Vec<Decimal> = (0..=300)
            .map(|visits| evaluate_visit_count(visits, &rules).amount)
            .collect();
        assert!(amounts.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn charge_target_requires_mask_quota() {
        let rules = ChargeTargetRules::default();
        let result = evaluate_charge_target(d(1_000_000), Some(6), &rules);
        assert_eq!(result.amount, d(0));
        assert!(!result.qualified);
        assert!(result.reason.contains("6/7"));

        let missing = evaluate_charge_target(d(1_000_000), None, &rules);
        assert_eq!(missing.amount, d(0));
        assert!(missing.reason.contains("no mask sales recorded"));
    }

    #[test]
    fn missing_mask_record_reason_names_the_employee() {
        let rules = PayrollRules::default();
        let store = StoreMetrics {
            total_revenue: d(1_000_000),
            total_consumption: d(800_000),
        };
        let mut emp = employee(320_000, 210_000);
        emp.identifier = "4".into();

        let missing = evaluate_seasonal(&emp, None, &store, &rules);
        assert_eq!(missing.charge_target.amount, d(0));
        assert!(missing
            .charge_target
            .reason
            .starts_with("employee 4: no mask sales recorded"));

        let recorded = evaluate_seasonal(&emp, Some(7), &store, &rules);
        assert!(!recorded.charge_target.reason.contains("employee 4"));
    }

    #[test]
    fn charge_target_tiers_replace_rather_than_add() {
        let rules = ChargeTargetRules::default();
        assert_eq!(evaluate_charge_target(d(249_999), Some(7), &rules).amount, d(0));
        assert_eq!(evaluate_charge_target(d(250_000), Some(7), &rules).amount, d(2_000));
        assert_eq!(evaluate_charge_target(d(299_999), Some(15), &rules).amount, d(2_000));
        assert_eq!(evaluate_charge_target(d(300_000), Some(7), &rules).amount, d(7_000));
        assert_eq!(evaluate_charge_target(d(350_000), Some(8), &rules).amount, d(7_000));
    }

    #[test]
    fn additive_charge_target_sums_and_caps() {
        let rules = ChargeTargetRules {
            mode: ChargeTargetMode::additive(),
            ..ChargeTargetRules::default()
        };
        // No quota gate: three masks alone earn 3000.
        assert_eq!(evaluate_charge_target(d(0), Some(3), &rules).amount, d(3_000));
        assert_eq!(evaluate_charge_target(d(250_000), Some(3), &rules).amount, d(5_000));
        assert_eq!(evaluate_charge_target(d(300_000), Some(9), &rules).amount, d(7_000));
        assert_eq!(evaluate_charge_target(d(100_000), None, &rules).amount, d(0));
    }

    #[test]
    fn consumption_bonus_pools_store_total() {
        let rules = ConsumptionRules::default();
        let total = d(1_000_000);
        assert_eq!(evaluate_consumption(d(200_000), total, &rules).amount, d(25_000));
        assert_eq!(evaluate_consumption(d(180_000), total, &rules).amount, d(15_000));
        assert_eq!(evaluate_consumption(d(179_999), total, &rules).amount, d(0));
    }

    #[test]
    fn consumption_bonus_floors_fractions() {
        let rules = ConsumptionRules::default();
        // 1,966,800 x 2.5% = 49,170; x 1.5% = 29,502
        assert_eq!(evaluate_consumption(d(220_000), d(1_966_800), &rules).amount, d(49_170));
        // 333,333 x 1.5% = 4,999.995
        assert_eq!(evaluate_consumption(d(190_000), d(333_333), &rules).amount, d(4_999));
    }

    #[test]
    fn dual_target_needs_both_evaluators() {
        let rules = PayrollRules::default();
        let total = d(1_000_000);
        let cases = [
            (300_000, 200_000, Some(7), 2_000),
            (300_000, 200_000, Some(6), 0),
            (249_999, 200_000, Some(7), 0),
            (300_000, 179_999, Some(7), 0),
            (100_000, 100_000, None, 0),
        ];

        for (revenue, consumption, masks, expected) in cases {
            let emp = employee(revenue, consumption);
            let charge = evaluate_charge_target(emp.personal_revenue, masks, &rules.charge_target);
            let cons = evaluate_consumption(emp.personal_consumption, total, &rules.consumption);
            let dual = evaluate_dual_target(&emp, masks, &charge, &cons, &rules);
            assert_eq!(dual.amount, d(expected), "case {revenue}/{consumption}/{masks:?}");
            assert_eq!(dual.qualified, charge.qualified && cons.qualified);
        }
    }

    #[test]
    fn dual_target_reason_lists_every_shortfall() {
        let rules = PayrollRules::default();
        let emp = employee(100_000, 100_000);
        let charge = evaluate_charge_target(emp.personal_revenue, Some(2), &rules.charge_target);
        let cons = evaluate_consumption(emp.personal_consumption, d(1), &rules.consumption);
        let dual = evaluate_dual_target(&emp, Some(2), &charge, &cons, &rules);
        assert!(dual.reason.contains("mask sales 2/7"));
        assert!(dual.reason.contains("consumption 100000/180000"));
    }

    #[test]
    fn raw_threshold_dual_target_ignores_mask_quota() {
        let mut rules = PayrollRules::default();
        rules.dual_target.basis = DualTargetBasis::RawThresholds;
        let emp = employee(280_000, 190_000);
        let charge = evaluate_charge_target(emp.personal_revenue, Some(0), &rules.charge_target);
        let cons = evaluate_consumption(emp.personal_consumption, d(0), &rules.consumption);
        assert!(!charge.qualified);
        let dual = evaluate_dual_target(&emp, Some(0), &charge, &cons, &rules);
        assert_eq!(dual.amount, d(2_000));
    }

    #[test]
    fn pass_through_bonuses_are_identity() {
        let accrued = Decimal::new(12_345, 1);
        assert_eq!(evaluate_advanced_course(accrued).amount, accrued);
        assert_eq!(evaluate_product_sales(accrued).amount, accrued);
        assert!(!evaluate_product_sales(Decimal::ZERO).qualified);
    }

    #[test]
    fn new_customer_rate_accepts_both_forms() {
        let rules = NewCustomerRules::default();
        let percent_form = evaluate_new_customer(132, d(70), &rules);
        let fraction_form = evaluate_new_customer(132, Decimal::new(70, 2), &rules);
        assert_eq!(percent_form.amount, d(4_000));
        assert_eq!(percent_form.amount, fraction_form.amount);
        assert!(percent_form.reason.contains("manual verification"));

        let short = evaluate_new_customer(131, Decimal::new(99, 2), &rules);
        assert_eq!(short.amount, d(0));
        assert!(short.reason.contains("visits 131/132"));
    }

    #[test]
    fn normalize_rate_treats_one_as_fraction() {
        assert_eq!(normalize_rate(Decimal::ONE), Decimal::ONE);
        assert_eq!(normalize_rate(d(85)), Decimal::new(85, 2));
        assert_eq!(normalize_rate(Decimal::new(5, 1)), Decimal::new(5, 1));
    }

    #[test]
    fn team_bonus_consumption_ratio_boundary() {
        let table = PayrollRules::default().team_bonus;
        let passing = StoreMetrics {
            total_revenue: d(1_000_000),
            total_consumption: d(750_000),
        };
        let failing = StoreMetrics {
            total_revenue: d(1_000_000),
            total_consumption: d(749_999),
        };
        assert_eq!(evaluate_team_bonus(4, &passing, &table).amount, d(6_000));
        assert_eq!(evaluate_team_bonus(4, &failing, &table).amount, d(0));
    }

    #[test]
    fn team_bonus_degrades_for_unknown_headcount_and_short_revenue() {
        let table = PayrollRules::default().team_bonus;
        let store = StoreMetrics {
            total_revenue: d(2_000_000),
            total_consumption: d(2_000_000),
        };
        let unknown = evaluate_team_bonus(7, &store, &table);
        assert_eq!(unknown.amount, d(0));
        assert!(unknown.reason.contains("no team bonus rule"));

        let empty = StoreMetrics {
            total_revenue: d(0),
            total_consumption: d(0),
        };
        let short = evaluate_team_bonus(2, &empty, &table);
        assert!(!short.qualified);
        assert!(short.reason.contains("short"));
    }
}
