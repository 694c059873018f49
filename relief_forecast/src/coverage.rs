//! Stock coverage and restock scenarios
//!
//! Works on the latest known status of each item: how many days the remaining
//! stock (plus any simulated shipment) lasts at the forecast demand.

use crate::data::ForecastRecord;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Days reported for an item with no forecast demand
pub const NO_DEMAND_DAYS: f64 = 999.0;

/// Items with fewer days of cover than this are critical
pub const DEFAULT_CRITICAL_DAYS: f64 = 7.0;

/// Most recent state of one item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemStatus {
    pub item_id: String,
    pub date: NaiveDate,
    pub stock_remaining: Option<f64>,
    pub forecast_next_7_days: f64,
}

impl ItemStatus {
    /// Days of cover after adding `restock` units; unknown stock counts as zero
    pub fn days_remaining(&self, restock: f64) -> f64 {
        days_remaining(
            self.stock_remaining.unwrap_or(0.0),
            self.forecast_next_7_days,
            restock,
        )
    }
}

/// Days until `stock + restock` is used up at `forecast` units per day
pub fn days_remaining(stock: f64, forecast: f64, restock: f64) -> f64 {
    if forecast > 0.0 {
        (stock + restock) / forecast
    } else {
        NO_DEMAND_DAYS
    }
}

/// Latest record of every item, sorted by item
///
/// When an item has several rows on its latest date, the one appearing last
/// in `records` wins.
pub fn latest_status(records: &[ForecastRecord]) -> Vec<ItemStatus> {
    let mut latest: BTreeMap<&str, &ForecastRecord> = BTreeMap::new();
    for record in records {
        latest
            .entry(record.item_id.as_str())
            .and_modify(|current| {
                if record.date >= current.date {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    latest
        .into_values()
        .map(|record| ItemStatus {
            item_id: record.item_id.clone(),
            date: record.date,
            stock_remaining: record.stock_remaining,
            forecast_next_7_days: record.forecast_next_7_days,
        })
        .collect()
}

/// Coverage KPIs for a restock scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    /// Number of distinct items tracked
    pub active_skus: usize,
    /// Items running out within `critical_days`, sorted
    ///
    /// Judged on each item's latest status only. An item whose older rows
    /// dipped below the threshold but whose latest row does not is not
    /// critical, unlike a count over every historical row.
    pub critical_items: Vec<String>,
    /// Simulated shipment added to every item's stock
    pub restock_units: f64,
    /// Threshold used to flag critical items
    pub critical_days: f64,
}

impl CoverageReport {
    /// Build the report from forecast rows
    pub fn build(records: &[ForecastRecord], restock_units: f64, critical_days: f64) -> Result<Self> {
        Self::from_statuses(&latest_status(records), restock_units, critical_days)
    }

    /// Build the report from already reduced item statuses
    pub fn from_statuses(
        statuses: &[ItemStatus],
        restock_units: f64,
        critical_days: f64,
    ) -> Result<Self> {
        if !restock_units.is_finite() || restock_units < 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "Restock units must be a non-negative number, got {}",
                restock_units
            )));
        }
        if !critical_days.is_finite() || critical_days <= 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "Critical days must be positive, got {}",
                critical_days
            )));
        }

        let critical_items = statuses
            .iter()
            .filter(|status| status.days_remaining(restock_units) < critical_days)
            .map(|status| status.item_id.clone())
            .collect();

        Ok(Self {
            active_skus: statuses.len(),
            critical_items,
            restock_units,
            critical_days,
        })
    }

    /// Number of critical items
    pub fn critical_count(&self) -> usize {
        self.critical_items.len()
    }

    /// Whether any item is critical
    pub fn has_risks(&self) -> bool {
        !self.critical_items.is_empty()
    }
}
