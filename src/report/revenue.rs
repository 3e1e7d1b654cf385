//! Revenue summary grouped by team and by page.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::sheets::RevenueEntry;

use super::bucket::{aggregate, DataQuality, MoneyRecord, Period, YearMonth};

/// Dimension value to summed revenue.
pub type Totals = BTreeMap<String, f64>;

impl MoneyRecord for RevenueEntry {
  fn timestamp(&self) -> &str {
    &self.timestamp
  }

  fn describe(&self) -> String {
    format!("revenue entry {}/{}", self.team, self.page)
  }
}

#[derive(Debug, Default)]
struct ByDimension {
  team: Totals,
  page: Totals,
}

/// Revenue per time bucket, summed independently per team and per page.
///
/// Keys render as `YYYY`, `YYYY-MM` and `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueAggregate {
  pub yearly_by_team: BTreeMap<i32, Totals>,
  pub yearly_by_page: BTreeMap<i32, Totals>,
  pub monthly_by_team: BTreeMap<YearMonth, Totals>,
  pub monthly_by_page: BTreeMap<YearMonth, Totals>,
  pub daily_by_team: BTreeMap<NaiveDate, Totals>,
  pub daily_by_page: BTreeMap<NaiveDate, Totals>,
}

impl RevenueAggregate {
  pub fn build(entries: &[RevenueEntry], period: &Period) -> (Self, DataQuality) {
    let (buckets, quality) = aggregate(entries, period, |acc: &mut ByDimension, entry: &RevenueEntry| {
      *acc.team.entry(entry.team.clone()).or_default() += entry.revenue;
      *acc.page.entry(entry.page.clone()).or_default() += entry.revenue;
    });

    let mut summary = Self::default();
    for (year, dims) in buckets.yearly {
      summary.yearly_by_team.insert(year, dims.team);
      summary.yearly_by_page.insert(year, dims.page);
    }
    for (ym, dims) in buckets.monthly {
      summary.monthly_by_team.insert(ym, dims.team);
      summary.monthly_by_page.insert(ym, dims.page);
    }
    for (date, dims) in buckets.daily {
      summary.daily_by_team.insert(date, dims.team);
      summary.daily_by_page.insert(date, dims.page);
    }
    (summary, quality)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::report::bucket::default_offset;
  use chrono::{TimeZone, Utc};
  use serde_json::json;

  fn entry(timestamp: &str, team: &str, page: &str, revenue: f64) -> RevenueEntry {
    RevenueEntry {
      timestamp: timestamp.into(),
      team: team.into(),
      page: page.into(),
      revenue,
    }
  }

  fn march_2024() -> Period {
    Period::at(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap(), default_offset())
  }

  #[test]
  fn test_team_and_page_are_summed_independently() {
    let entries = vec![
      entry("2024-03-05T10:00:00Z", "A", "P1", 10.0),
      entry("2024-03-05T11:00:00Z", "B", "P1", 5.0),
    ];
    let (summary, quality) = RevenueAggregate::build(&entries, &march_2024());
    let march = YearMonth { year: 2024, month: 3 };
    let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

    assert_eq!(quality.skipped, 0);
    assert_eq!(summary.yearly_by_team[&2024]["A"], 10.0);
    assert_eq!(summary.yearly_by_team[&2024]["B"], 5.0);
    assert_eq!(summary.yearly_by_page[&2024]["P1"], 15.0);
    assert_eq!(summary.monthly_by_page[&march]["P1"], 15.0);
    assert_eq!(summary.daily_by_team[&day].len(), 2);
    assert_eq!(summary.daily_by_page[&day]["P1"], 15.0);
  }

  #[test]
  fn test_previous_month_is_not_in_daily_tier() {
    let entries = vec![entry("2024-02-10T10:00:00Z", "A", "P1", 4.0)];
    let (summary, _) = RevenueAggregate::build(&entries, &march_2024());

    assert_eq!(summary.monthly_by_team.len(), 1);
    assert!(summary.daily_by_team.is_empty());
    assert!(summary.daily_by_page.is_empty());
  }

  #[test]
  fn test_empty_input_serializes_six_empty_maps() {
    let (summary, _) = RevenueAggregate::build(&[], &march_2024());

    assert_eq!(
      serde_json::to_value(&summary).unwrap(),
      json!({
        "yearlyByTeam": {},
        "yearlyByPage": {},
        "monthlyByTeam": {},
        "monthlyByPage": {},
        "dailyByTeam": {},
        "dailyByPage": {},
      })
    );
  }

  #[test]
  fn test_bucket_keys_render_as_text() {
    let entries = vec![entry("2024-03-05T10:00:00Z", "A", "P1", 2.5)];
    let (summary, _) = RevenueAggregate::build(&entries, &march_2024());
    let value = serde_json::to_value(&summary).unwrap();

    assert_eq!(value["yearlyByTeam"]["2024"]["A"], 2.5);
    assert_eq!(value["monthlyByPage"]["2024-03"]["P1"], 2.5);
    assert_eq!(value["dailyByTeam"]["2024-03-05"]["A"], 2.5);
  }

  #[test]
  fn test_bad_timestamp_is_skipped() {
    let entries = vec![
      entry("not a date", "A", "P1", 99.0),
      entry("2024-03-05T10:00:00Z", "A", "P1", 1.0),
    ];
    let (summary, quality) = RevenueAggregate::build(&entries, &march_2024());

    assert_eq!(quality.skipped, 1);
    assert_eq!(summary.yearly_by_team[&2024]["A"], 1.0);
  }
}
