//! Time-bucketed reports over order and revenue records.

pub mod bucket;
mod formula;
mod revenue;

pub use bucket::{default_offset, BucketKey, DataQuality, MoneyRecord, Period, TimeBuckets, YearMonth};
pub use formula::{header_row, FormulaReport, SalesExpense, REPORT_HEADER};
pub use revenue::{RevenueAggregate, Totals};
