//! Sales/expense report written to the `FormulaReport` sheet.

use chrono::{Month, NaiveDate};
use serde_json::{json, Value};

use crate::sheets::Order;

use super::bucket::{aggregate, DataQuality, MoneyRecord, Period, TimeBuckets, YearMonth};

pub const REPORT_HEADER: [&str; 4] = ["Category", "Period", "Total Sales", "Total Expense"];

/// Running totals of one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SalesExpense {
  pub sales: f64,
  pub expense: f64,
}

impl MoneyRecord for Order {
  fn timestamp(&self) -> &str {
    &self.timestamp
  }

  fn describe(&self) -> String {
    format!("order {}", self.order_id)
  }
}

pub fn header_row() -> Vec<Value> {
  REPORT_HEADER.iter().map(|h| json!(h)).collect()
}

/// Sales and expense totals per year, per month of the current year and per
/// day of the current month.
#[derive(Debug, Clone)]
pub struct FormulaReport {
  period: Period,
  record_count: usize,
  pub buckets: TimeBuckets<SalesExpense>,
  pub quality: DataQuality,
}

impl FormulaReport {
  pub fn build(orders: &[Order], period: &Period) -> Self {
    let (buckets, quality) = aggregate(orders, period, |totals: &mut SalesExpense, order: &Order| {
      totals.sales += order.grand_total;
      totals.expense += order.internal_cost;
    });

    Self {
      period: *period,
      record_count: orders.len(),
      buckets,
      quality,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.record_count == 0
  }

  /// Sheet content, header first. A report built from no orders is the
  /// header row alone.
  pub fn to_rows(&self) -> Vec<Vec<Value>> {
    let mut rows = vec![header_row()];
    if self.is_empty() {
      return rows;
    }

    rows.push(section("YEARLY REPORT".to_string()));
    for (year, totals) in self.buckets.yearly.iter().rev() {
      rows.push(amount_row(json!(year), totals));
    }
    rows.push(Vec::new());

    rows.push(section(format!("MONTHLY REPORT ({})", self.period.year)));
    for month in 1..=12u32 {
      let key = YearMonth {
        year: self.period.year,
        month,
      };
      if let Some(totals) = self.buckets.monthly.get(&key) {
        rows.push(amount_row(json!(month_name(month)), totals));
      }
    }
    rows.push(Vec::new());

    rows.push(section(format!(
      "DAILY REPORT ({} {})",
      month_name(self.period.month),
      self.period.year
    )));
    for (date, totals) in &self.buckets.daily {
      rows.push(amount_row(json!(day_label(*date)), totals));
    }

    rows
  }
}

fn section(title: String) -> Vec<Value> {
  vec![json!(title), json!(""), json!(""), json!("")]
}

fn amount_row(period: Value, totals: &SalesExpense) -> Vec<Value> {
  vec![
    json!(""),
    period,
    json!(format!("{:.2}", totals.sales)),
    json!(format!("{:.2}", totals.expense)),
  ]
}

fn month_name(month: u32) -> &'static str {
  u8::try_from(month)
    .ok()
    .and_then(|m| Month::try_from(m).ok())
    .map(|m| m.name())
    .unwrap_or("")
}

/// `Mar 05, 2024`
fn day_label(date: NaiveDate) -> String {
  date.format("%b %d, %Y").to_string()
}
