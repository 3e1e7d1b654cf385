//! Time bucketing shared by every report.
//!
//! A record lands in its year bucket always, in its month bucket only when it
//! falls in the current year, and in its day bucket only when it falls in the
//! current month of the current year. "Current" is evaluated once per request
//! in the reference timezone.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Serialize, Serializer};
use tracing::warn;

/// Reference timezone used when none is configured (Asia/Phnom_Penh, no DST).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

pub fn default_offset() -> FixedOffset {
  FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600).unwrap_or(Utc.fix())
}

/// A record with a timestamp that can be placed in time buckets.
pub trait MoneyRecord {
  /// Raw timestamp text as read from the sheet
  fn timestamp(&self) -> &str;

  /// Short identification for data-quality warnings
  fn describe(&self) -> String;
}

/// Calendar month of a specific year. Renders as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
  pub year: i32,
  pub month: u32,
}

impl fmt::Display for YearMonth {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{:02}", self.year, self.month)
  }
}

impl Serialize for YearMonth {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// Time granularity key for an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
  Year(i32),
  YearMonth(YearMonth),
  /// Renders as `YYYY-MM-DD`
  YearMonthDay(NaiveDate),
}

impl fmt::Display for BucketKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Year(year) => write!(f, "{}", year),
      Self::YearMonth(ym) => ym.fmt(f),
      Self::YearMonthDay(date) => write!(f, "{}", date.format("%Y-%m-%d")),
    }
  }
}

/// The request-time "now" a report is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
  pub year: i32,
  pub month: u32,
  offset: FixedOffset,
}

impl Period {
  /// Period containing `now`, seen from the reference timezone `offset`.
  pub fn at(now: DateTime<Utc>, offset: FixedOffset) -> Self {
    let local = now.with_timezone(&offset);
    Self {
      year: local.year(),
      month: local.month(),
      offset,
    }
  }

  pub fn current(offset: FixedOffset) -> Self {
    Self::at(Utc::now(), offset)
  }

  /// Parse an RFC 3339 timestamp and convert it to the reference timezone.
  pub fn localize(&self, timestamp: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(timestamp.trim())
      .ok()
      .map(|ts| ts.with_timezone(&self.offset))
  }

  /// Buckets a local date contributes to under the current-period policy.
  pub fn buckets_for(&self, date: NaiveDate) -> Vec<BucketKey> {
    let mut keys = vec![BucketKey::Year(date.year())];
    if date.year() == self.year {
      keys.push(BucketKey::YearMonth(YearMonth {
        year: date.year(),
        month: date.month(),
      }));
      if date.month() == self.month {
        keys.push(BucketKey::YearMonthDay(date));
      }
    }
    keys
  }
}

/// Non-fatal record problems seen while aggregating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataQuality {
  /// Records dropped because their timestamp did not parse
  pub skipped: usize,
}

/// Per-tier accumulators.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBuckets<V> {
  pub yearly: BTreeMap<i32, V>,
  pub monthly: BTreeMap<YearMonth, V>,
  pub daily: BTreeMap<NaiveDate, V>,
}

impl<V> Default for TimeBuckets<V> {
  fn default() -> Self {
    Self {
      yearly: BTreeMap::new(),
      monthly: BTreeMap::new(),
      daily: BTreeMap::new(),
    }
  }
}

impl<V: Default> TimeBuckets<V> {
  /// Accumulator for `key`, created empty on first use.
  pub fn slot(&mut self, key: BucketKey) -> &mut V {
    match key {
      BucketKey::Year(year) => self.yearly.entry(year).or_default(),
      BucketKey::YearMonth(ym) => self.monthly.entry(ym).or_default(),
      BucketKey::YearMonthDay(date) => self.daily.entry(date).or_default(),
    }
  }
}

/// Single pass over `records`, calling `apply` once per (bucket, record).
///
/// Records with an unparseable timestamp are skipped and counted.
pub fn aggregate<R, V, F>(records: &[R], period: &Period, mut apply: F) -> (TimeBuckets<V>, DataQuality)
where
  R: MoneyRecord,
  V: Default,
  F: FnMut(&mut V, &R),
{
  let mut buckets = TimeBuckets::default();
  let mut quality = DataQuality::default();

  for record in records {
    let Some(local) = period.localize(record.timestamp()) else {
      warn!(
        timestamp = record.timestamp(),
        record = %record.describe(),
        "Could not parse timestamp, skipping record"
      );
      quality.skipped += 1;
      continue;
    };

    for key in period.buckets_for(local.date_naive()) {
      apply(buckets.slot(key), record);
    }
  }

  if quality.skipped > 0 {
    warn!(skipped = quality.skipped, total = records.len(), "Records skipped during aggregation");
  }
  (buckets, quality)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  struct Stamp(&'static str);

  impl MoneyRecord for Stamp {
    fn timestamp(&self) -> &str {
      self.0
    }

    fn describe(&self) -> String {
      self.0.to_string()
    }
  }

  fn march_2024() -> Period {
    Period::at(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap(), default_offset())
  }

  #[test]
  fn test_bucket_key_rendering() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    assert_eq!(BucketKey::Year(2024).to_string(), "2024");
    assert_eq!(BucketKey::YearMonth(YearMonth { year: 2024, month: 3 }).to_string(), "2024-03");
    assert_eq!(BucketKey::YearMonthDay(date).to_string(), "2024-03-05");
  }

  #[test]
  fn test_period_uses_reference_timezone() {
    // 2024-12-31 20:00 UTC is already 2025-01-01 in UTC+7
    let period = Period::at(Utc.with_ymd_and_hms(2024, 12, 31, 20, 0, 0).unwrap(), default_offset());
    assert_eq!((period.year, period.month), (2025, 1));
  }

  #[test]
  fn test_localize_converts_to_reference_day() {
    let local = march_2024().localize("2024-03-04T18:30:00Z").unwrap();
    assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    assert!(march_2024().localize("05/03/2024 10:00").is_none());
    assert!(march_2024().localize("").is_none());
  }

  #[test]
  fn test_bucket_policy() {
    let period = march_2024();
    let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

    assert_eq!(period.buckets_for(d(2023, 3, 5)), vec![BucketKey::Year(2023)]);
    assert_eq!(
      period.buckets_for(d(2024, 2, 5)),
      vec![BucketKey::Year(2024), BucketKey::YearMonth(YearMonth { year: 2024, month: 2 })]
    );
    assert_eq!(period.buckets_for(d(2024, 3, 5)).len(), 3);
  }

  #[test]
  fn test_aggregate_skips_bad_timestamps() {
    let records = [
      Stamp("2024-03-05T10:00:00Z"),
      Stamp("Sat Oct 26 2024 14:30:00 GMT+0700"),
      Stamp("2023-01-01T00:00:00+07:00"),
    ];
    let (buckets, quality) = aggregate(&records, &march_2024(), |count: &mut u32, _| *count += 1);

    assert_eq!(quality.skipped, 1);
    assert_eq!(buckets.yearly.get(&2024), Some(&1));
    assert_eq!(buckets.yearly.get(&2023), Some(&1));
    assert_eq!(buckets.monthly.len(), 1);
    assert_eq!(buckets.daily.len(), 1);
  }
}
