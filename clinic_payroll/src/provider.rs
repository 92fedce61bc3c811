//! Metrics providers.
//!
//! A provider supplies the engine with clean numeric inputs for one
//! period: the store totals, the employee roster and the mask-sale
//! mapping.  The engine never reads files itself.
//!
//! [`CsvPeriodProvider`] reads a period directory exported from the
//! clinic's monthly workbook:
//!
//! * `daily.csv` with `date,revenue,consumption`, one row per day;
//! * `roster.csv` with `name,revenue,consumption,visits,new_customer_rate,advanced_course,skill_bonus,product_sales`;
//! * `sales.csv` with `date,product,therapist`, one row per item sold.

use crate::error::{PayrollError, Result};
use crate::models::{EmployeeMetrics, PayRunInput, StoreMetrics};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Product name counted towards the mask-sale quota.
pub const DEFAULT_MASK_PRODUCT: &str = "水光面膜3入";

/// Source of the numeric inputs for one reporting period.
pub trait MetricsProvider {
    fn store_metrics(&self) -> Result<StoreMetrics>;
    /// Employees in report order.
    fn roster(&self) -> Result<Vec<EmployeeMetrics>>;
    /// Employee identifier to qualifying mask-sale count.
    fn mask_sales(&self) -> Result<HashMap<String, u32>>;
}

/// Provider over values that are already in memory.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    pub store: StoreMetrics,
    pub employees: Vec<EmployeeMetrics>,
    pub mask_sales: HashMap<String, u32>,
}

impl MetricsProvider for StaticProvider {
    fn store_metrics(&self) -> Result<StoreMetrics> {
        Ok(self.store.clone())
    }

    fn roster(&self) -> Result<Vec<EmployeeMetrics>> {
        Ok(self.employees.clone())
    }

    fn mask_sales(&self) -> Result<HashMap<String, u32>> {
        Ok(self.mask_sales.clone())
    }
}

/// Collect everything a payroll run needs from `provider`.
pub fn assemble_input(
    provider: &dyn MetricsProvider,
    formal_staff: BTreeSet<String>,
    team_headcount: Option<u32>,
) -> Result<PayRunInput> {
    Ok(PayRunInput {
        store: provider.store_metrics()?,
        employees: provider.roster()?,
        mask_sales: provider.mask_sales()?,
        formal_staff,
        team_headcount,
    })
}

/// Read a complete [`PayRunInput`] from a JSON file.
pub fn load_period_input(path: &Path) -> Result<PayRunInput> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Provider over a directory of CSV exports.
#[derive(Debug, Clone)]
pub struct CsvPeriodProvider {
    dir: PathBuf,
    mask_product: String,
}

impl CsvPeriodProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            mask_product: DEFAULT_MASK_PRODUCT.to_string(),
        }
    }

    pub fn with_mask_product(mut self, product: impl Into<String>) -> Self {
        self.mask_product = product.into();
        self
    }

    fn open(&self, name: &str) -> Result<std::fs::File> {
        Ok(std::fs::File::open(self.dir.join(name))?)
    }
}

impl MetricsProvider for CsvPeriodProvider {
    fn store_metrics(&self) -> Result<StoreMetrics> {
        sum_daily_totals(self.open("daily.csv")?)
    }

    fn roster(&self) -> Result<Vec<EmployeeMetrics>> {
        scan_roster(self.open("roster.csv")?)
    }

    fn mask_sales(&self) -> Result<HashMap<String, u32>> {
        count_mask_sales(self.open("sales.csv")?, &self.mask_product)
    }
}

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn parse_decimal(record: &str, field: &'static str, cell: &str) -> Result<Decimal> {
    let cleaned = cell.replace(',', "");
    Decimal::from_str(cleaned.trim()).map_err(|_| PayrollError::InvalidMetric {
        record: record.to_string(),
        field,
        value: cell.to_string(),
    })
}

/// A blank cell becomes zero.
fn decimal_or_zero(record: &str, field: &'static str, cell: Option<&str>) -> Result<Decimal> {
    cell.map(|c| parse_decimal(record, field, c))
        .transpose()
        .map(|v| v.unwrap_or(Decimal::ZERO))
}

fn required_decimal(record: &str, field: &'static str, cell: Option<&str>) -> Result<Decimal> {
    match cell {
        Some(c) => parse_decimal(record, field, c),
        None => Err(PayrollError::MissingMetric {
            record: record.to_string(),
            field,
        }),
    }
}

/// Spreadsheets export counts as `132` or `132.0`; both are fine, a
/// fractional or negative count is not.
fn whole_count(record: &str, field: &'static str, value: Decimal) -> Result<u32> {
    if value.fract() != Decimal::ZERO {
        return Err(PayrollError::InvalidMetric {
            record: record.to_string(),
            field,
            value: value.to_string(),
        });
    }
    value.to_u32().ok_or_else(|| PayrollError::InvalidMetric {
        record: record.to_string(),
        field,
        value: value.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct DailyRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    revenue: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    consumption: Option<String>,
}

/// Sum the per-day revenue and consumption.  Blank daily cells count as
/// zero: a closed day has nothing to report.
pub fn sum_daily_totals<R: Read>(source: R) -> Result<StoreMetrics> {
    let mut total_revenue = Decimal::ZERO;
    let mut total_consumption = Decimal::ZERO;

    for (index, row) in reader(source).deserialize::<DailyRow>().enumerate() {
        let row = row?;
        let record = format!(
            "day {}",
            row.date.clone().unwrap_or_else(|| (index + 1).to_string())
        );
        let revenue = decimal_or_zero(&record, "revenue", row.revenue.as_deref())?;
        let consumption = decimal_or_zero(&record, "consumption", row.consumption.as_deref())?;
        debug!(%record, %revenue, %consumption, "daily totals");
        total_revenue += revenue;
        total_consumption += consumption;
    }

    info!(%total_revenue, %total_consumption, "store totals summed");
    Ok(StoreMetrics {
        total_revenue,
        total_consumption,
    })
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    revenue: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    consumption: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    visits: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    new_customer_rate: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    advanced_course: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    skill_bonus: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    product_sales: Option<String>,
}

/// Read the roster top to bottom.
///
/// Stopping rule: the scan ends at the first row whose revenue is blank
/// or zero.  A row with revenue but no name is skipped and the scan
/// continues.  Each employee's identifier is the 1-based position of
/// its row, which is how the daily sales sheets refer to therapists.
/// Blank rate and accrual cells are zero; blank consumption or visits
/// are an error.
pub fn scan_roster<R: Read>(source: R) -> Result<Vec<EmployeeMetrics>> {
    let mut employees = Vec::new();

    for (index, row) in reader(source).deserialize::<RosterRow>().enumerate() {
        let row = row?;
        let identifier = (index + 1).to_string();
        let record = format!("roster row {identifier}");

        let revenue = decimal_or_zero(&record, "revenue", row.revenue.as_deref())?;
        if revenue == Decimal::ZERO {
            debug!(%record, "blank or zero revenue, roster ends");
            break;
        }

        let Some(name) = row.name else {
            warn!(%record, %revenue, "revenue without a name, row skipped");
            continue;
        };
        let record = format!("employee {identifier} ({name})");

        let consumption = required_decimal(&record, "consumption", row.consumption.as_deref())?;
        let visits = required_decimal(&record, "visits", row.visits.as_deref())?;
        let visit_count = whole_count(&record, "visits", visits)?;

        employees.push(EmployeeMetrics {
            identifier,
            name,
            personal_revenue: revenue,
            personal_consumption: consumption,
            visit_count,
            new_customer_conversion_rate: decimal_or_zero(
                &record,
                "new_customer_rate",
                row.new_customer_rate.as_deref(),
            )?,
            skill_bonus_accrued: decimal_or_zero(
                &record,
                "skill_bonus",
                row.skill_bonus.as_deref(),
            )?,
            advanced_course_bonus_accrued: decimal_or_zero(
                &record,
                "advanced_course",
                row.advanced_course.as_deref(),
            )?,
            product_sales_bonus_accrued: decimal_or_zero(
                &record,
                "product_sales",
                row.product_sales.as_deref(),
            )?,
            mask_sale_count: None,
        });
    }

    info!(employees = employees.len(), "roster scanned");
    Ok(employees)
}

#[derive(Debug, Deserialize)]
struct SaleRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    product: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    therapist: Option<String>,
}

/// Therapist cells arrive as `3` or `3.0`; both name therapist `3`.
fn therapist_key(raw: &str) -> String {
    match Decimal::from_str(raw.trim()) {
        Ok(value) if value.fract() == Decimal::ZERO => value.trunc().normalize().to_string(),
        _ => raw.trim().to_string(),
    }
}

/// Count, per therapist, the sales whose product name contains
/// `mask_product`.
pub fn count_mask_sales<R: Read>(source: R, mask_product: &str) -> Result<HashMap<String, u32>> {
    let mut counts: HashMap<String, u32> = HashMap::new();

    for row in reader(source).deserialize::<SaleRow>() {
        let row = row?;
        let (Some(product), Some(therapist)) = (row.product, row.therapist) else {
            continue;
        };
        if product.contains(mask_product) {
            *counts.entry(therapist_key(&therapist)).or_insert(0) += 1;
        }
    }

    for (therapist, count) in &counts {
        debug!(%therapist, count, "mask sales counted");
    }
    Ok(counts)
}
