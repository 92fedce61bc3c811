use clinic_payroll::engine::run_payroll;
use clinic_payroll::provider::{assemble_input, CsvPeriodProvider, StaticProvider};
use clinic_payroll::rules::{ChargeTargetMode, PayrollRules};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::fs;

fn d(value: i64) -> Decimal {
    Decimal::from(value)
}

fn write_period(dir: &std::path::Path) {
    fs::write(
        dir.join("daily.csv"),
        "date,revenue,consumption\n\
         0601,400000,300000\n\
         0602,350000,280000\n\
         0603,,\n\
         0604,250000,170000\n",
    )
    .expect("write daily");
    fs::write(
        dir.join("roster.csv"),
        "name,revenue,consumption,visits,new_customer_rate,advanced_course,skill_bonus,product_sales\n\
         Amy,310000,205000,134,72,800,1500,600\n\
         Bea,255000,185000,120,0.65,300,1200,0\n\
         Cat,120000,60000,95,,,400,250\n\
         ,0,,,,,,\n\
         Ghost,999999,999999,200,99,,,\n",
    )
    .expect("write roster");
    let mut sales = String::from("date,product,therapist\n");
    for _ in 0..7 {
        sales.push_str("0601,水光面膜3入,1\n");
    }
    for _ in 0..3 {
        sales.push_str("0602,水光面膜3入,2.0\n");
    }
    sales.push_str("0603,Toner,3\n");
    fs::write(dir.join("sales.csv"), sales).expect("write sales");
}

#[test]
fn csv_period_runs_end_to_end() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_period(dir.path());

    let provider = CsvPeriodProvider::new(dir.path());
    let formal = BTreeSet::from(["1".to_string(), "2".to_string()]);
    let input = assemble_input(&provider, formal, Some(2)).expect("period assembles");
    assert_eq!(input.employees.len(), 3, "scan stops before Ghost");

    let result = run_payroll(&input, &PayrollRules::default()).expect("payroll runs");

    // 1,000,000 revenue with 750,000 consumption: the 2-staff rule passes.
    assert_eq!(result.team_bonus.amount, d(5_000));

    let amy = &result.line_items[0];
    assert_eq!(amy.visit_count_bonus, d(2_600));
    assert_eq!(amy.charge_target_bonus, d(7_000));
    assert_eq!(amy.consumption_bonus, d(18_750));
    assert_eq!(amy.dual_target_bonus, d(2_000));
    assert_eq!(amy.new_customer_bonus, d(4_000));

    let bea = &result.line_items[1];
    assert_eq!(bea.visit_count_bonus, d(1_000));
    assert_eq!(bea.charge_target_bonus, d(0), "three masks miss the quota");
    assert_eq!(bea.consumption_bonus, d(11_250));
    assert_eq!(bea.dual_target_bonus, d(0));
    assert_eq!(bea.new_customer_bonus, d(0));

    let cat = &result.line_items[2];
    assert!(!cat.formal_staff);
    assert_eq!(cat.team_bonus, d(0));
    assert_eq!(cat.product_sales_bonus, d(250));
    assert_eq!(cat.seasonal_subtotal(), Some(d(250)));

    let totals: Decimal = result.line_items.iter().map(|i| i.total).sum();
    assert_eq!(result.summary.grand_total, totals);
    let seasonal: Decimal = result
        .line_items
        .iter()
        .map(|i| i.seasonal_subtotal().expect("subtotal fits"))
        .sum();
    assert_eq!(result.summary.seasonal_bonus_total, seasonal);
}

#[test]
fn additive_mode_pays_masks_without_quota() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_period(dir.path());

    let provider = CsvPeriodProvider::new(dir.path());
    let input = assemble_input(
        &provider,
        BTreeSet::from(["1".to_string(), "2".to_string()]),
        None,
    )
    .expect("period assembles");
    let snapshot = StaticProvider {
        store: input.store.clone(),
        employees: input.employees.clone(),
        mask_sales: input.mask_sales.clone(),
    };
    let input = assemble_input(&snapshot, input.formal_staff.clone(), None).expect("snapshot");

    let mut rules = PayrollRules::default();
    rules.charge_target.mode = ChargeTargetMode::additive();
    let result = run_payroll(&input, &rules).expect("payroll runs");

    // Bea: 255,000 revenue tier (2,000) + 3 masks (3,000).
    assert_eq!(result.line_items[1].charge_target_bonus, d(5_000));
    // Amy: 7,000 tier + 7,000 masks, capped at 7,000.
    assert_eq!(result.line_items[0].charge_target_bonus, d(7_000));
}
