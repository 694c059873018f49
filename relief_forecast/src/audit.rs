//! Data health audit
//!
//! Counts the two data-quality signals shown next to the forecast: usage rows
//! whose quantity was missing, and rows reporting negative stock.

use crate::data::{ForecastRecord, UsageRecord};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Data-quality counts over a set of rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthSummary {
    /// Number of rows audited
    pub rows: usize,
    /// Rows whose quantity was missing before cleaning
    pub null_quantity_count: usize,
    /// Rows with `stock_remaining < 0`
    pub negative_stock_count: usize,
    /// Rows with at least one of the issues above
    pub flagged_rows: usize,
}

impl HealthSummary {
    /// Whether no issue was found
    pub fn is_clean(&self) -> bool {
        self.flagged_rows == 0
    }

    /// Share of rows without any issue, in `[0, 1]`; `1.0` for no rows
    pub fn quality_score(&self) -> f64 {
        if self.rows == 0 {
            return 1.0;
        }
        1.0 - self.flagged_rows as f64 / self.rows as f64
    }
}

/// A row the health audit can inspect
pub trait Auditable {
    /// Whether the quantity was missing in the source data
    fn quantity_missing(&self) -> bool;

    /// Remaining stock, if known
    fn stock(&self) -> Option<f64>;
}

impl Auditable for UsageRecord {
    fn quantity_missing(&self) -> bool {
        self.quantity_used.is_none()
    }

    fn stock(&self) -> Option<f64> {
        self.stock_remaining
    }
}

impl Auditable for ForecastRecord {
    fn quantity_missing(&self) -> bool {
        self.quantity_was_null
    }

    fn stock(&self) -> Option<f64> {
        self.stock_remaining
    }
}

/// Audit any sequence of auditable rows
pub fn audit<'a, T, I>(records: I) -> HealthSummary
where
    T: Auditable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    records
        .into_iter()
        .fold(HealthSummary::default(), |mut summary, record| {
            let missing = record.quantity_missing();
            let negative = record.stock().map_or(false, |stock| stock < 0.0);

            summary.rows += 1;
            summary.null_quantity_count += usize::from(missing);
            summary.negative_stock_count += usize::from(negative);
            summary.flagged_rows += usize::from(missing || negative);
            summary
        })
}

/// Audit forecast rows; missing quantities are read from the tracked flag
pub fn audit_health(records: &[ForecastRecord]) -> HealthSummary {
    audit(records)
}

/// Audit raw usage rows before cleaning
pub fn audit_usage(records: &[UsageRecord]) -> HealthSummary {
    audit(records)
}

/// Audit a uniform random sample of at most `n` rows
pub fn sample_audit<T, R>(records: &[T], n: usize, rng: &mut R) -> HealthSummary
where
    T: Auditable,
    R: Rng + ?Sized,
{
    audit(records.choose_multiple(rng, n))
}
