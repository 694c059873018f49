//! Inventory usage data handling
//!
//! Raw usage tables arrive as polars `DataFrame`s (uploaded CSVs or tables read
//! from a [`TableStore`](crate::store::TableStore)). Which columns hold the
//! date, item and quantity is decided by the caller through a
//! [`ColumnMapping`], so renamed schemas work without code changes.

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Name of the forecast column appended to every result table
pub const FORECAST_COLUMN: &str = "FORECAST_NEXT_7_DAYS";

/// Name of the column recording which quantities were missing before cleaning
pub const MISSING_FLAG_COLUMN: &str = "QUANTITY_MISSING";

/// Accepted date layouts, tried in order
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

/// Maps the logical usage fields onto the column names of a concrete table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// Column holding the calendar date of the record
    pub date: String,
    /// Column holding the item identifier
    pub item: String,
    /// Column holding the quantity used
    pub quantity: String,
    /// Column holding the remaining stock, if the table carries one
    pub stock: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date: "DATE".to_string(),
            item: "ITEM_NAME".to_string(),
            quantity: "QUANTITY_USED".to_string(),
            stock: Some("STOCK_REMAINING".to_string()),
        }
    }
}

impl ColumnMapping {
    /// Create a mapping for the three forecast columns, without a stock column
    pub fn new(date: &str, item: &str, quantity: &str) -> Self {
        Self {
            date: date.to_string(),
            item: item.to_string(),
            quantity: quantity.to_string(),
            stock: None,
        }
    }

    /// Set the stock column
    pub fn with_stock(mut self, stock: &str) -> Self {
        self.stock = Some(stock.to_string());
        self
    }

    /// Drop the stock column when `columns` does not contain it
    pub fn stock_if_present<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        let present = self
            .stock
            .as_deref()
            .map_or(false, |stock| columns.iter().any(|c| c.as_ref() == stock));
        if !present {
            self.stock = None;
        }
        self
    }

    /// Default column names, keeping a stock column only if `self` maps one
    ///
    /// Result tables are always published under these names.
    pub fn canonical(&self) -> Self {
        let mut canonical = Self::default();
        if self.stock.is_none() {
            canonical.stock = None;
        }
        canonical
    }
}

/// One row of raw usage history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub item_id: String,
    pub date: NaiveDate,
    /// `None` means no usage was reported
    pub quantity_used: Option<f64>,
    /// May legitimately be negative in raw data
    pub stock_remaining: Option<f64>,
}

impl UsageRecord {
    pub fn new(
        item_id: &str,
        date: NaiveDate,
        quantity_used: Option<f64>,
        stock_remaining: Option<f64>,
    ) -> Self {
        Self {
            item_id: item_id.to_string(),
            date,
            quantity_used,
            stock_remaining,
        }
    }
}

/// A usage row after cleaning, carrying its demand forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub item_id: String,
    pub date: NaiveDate,
    /// Quantity used, with missing values replaced by zero
    pub quantity_used: f64,
    pub stock_remaining: Option<f64>,
    /// Trailing mean of `quantity_used` within the item's history
    pub forecast_next_7_days: f64,
    /// Whether `quantity_used` was missing before cleaning
    pub quantity_was_null: bool,
}

impl ForecastRecord {
    /// Build a forecast record from a raw record and its computed forecast
    pub fn from_usage(record: &UsageRecord, forecast: f64) -> Self {
        Self {
            item_id: record.item_id.clone(),
            date: record.date,
            quantity_used: record.quantity_used.unwrap_or(0.0),
            stock_remaining: record.stock_remaining,
            forecast_next_7_days: forecast,
            quantity_was_null: record.quantity_used.is_none(),
        }
    }
}

/// Data loader for usage tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a usage table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<UsageTable> {
        Ok(UsageTable::new(Self::read_frame(path)?))
    }

    /// Create a usage table from an existing DataFrame
    pub fn from_dataframe(df: DataFrame) -> UsageTable {
        UsageTable::new(df)
    }

    /// Read a CSV file with a header row into a DataFrame
    pub(crate) fn read_frame<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(Some(100))
            .has_header(true)
            .finish()?;
        Ok(df)
    }
}

/// Raw usage table, before cleaning
#[derive(Debug, Clone)]
pub struct UsageTable {
    df: DataFrame,
}

impl UsageTable {
    /// Wrap a DataFrame as a usage table
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }

    /// Build a usage table from records, using the mapping's column names
    pub fn from_records(records: &[UsageRecord], mapping: &ColumnMapping) -> Result<Self> {
        let mut columns = vec![
            Series::new(
                mapping.date.as_str(),
                records
                    .iter()
                    .map(|r| r.date.format("%Y-%m-%d").to_string())
                    .collect::<Vec<String>>(),
            ),
            Series::new(
                mapping.item.as_str(),
                records
                    .iter()
                    .map(|r| r.item_id.clone())
                    .collect::<Vec<String>>(),
            ),
            Series::new(
                mapping.quantity.as_str(),
                records
                    .iter()
                    .map(|r| r.quantity_used)
                    .collect::<Vec<Option<f64>>>(),
            ),
        ];
        if let Some(stock) = &mapping.stock {
            columns.push(Series::new(
                stock.as_str(),
                records
                    .iter()
                    .map(|r| r.stock_remaining)
                    .collect::<Vec<Option<f64>>>(),
            ));
        }

        Ok(Self::new(DataFrame::new(columns)?))
    }

    /// Get the DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Column names of the underlying table
    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Missing-quantity flags recorded by an earlier forecast run
    ///
    /// All `false` when the table carries no [`MISSING_FLAG_COLUMN`].
    pub fn prior_missing_flags(&self) -> Result<Vec<bool>> {
        match self.df.column(MISSING_FLAG_COLUMN) {
            Ok(series) => flag_values(series),
            Err(_) => Ok(vec![false; self.df.height()]),
        }
    }

    /// Extract typed usage records, validating the mapped columns
    pub fn records(&self, mapping: &ColumnMapping) -> Result<Vec<UsageRecord>> {
        // Resolve every column before reading values so a missing column is
        // always reported as a schema error.
        let date_col = require_column(&self.df, &mapping.date)?;
        let item_col = require_column(&self.df, &mapping.item)?;
        let quantity_col = require_column(&self.df, &mapping.quantity)?;
        let stock_col = match &mapping.stock {
            Some(stock) => Some(require_column(&self.df, stock)?),
            None => None,
        };

        let dates = date_values(date_col)?;
        let items = item_values(item_col)?;
        let quantities = numeric_values(quantity_col)?;
        let stocks = match stock_col {
            Some(series) => numeric_values(series)?,
            None => vec![None; self.df.height()],
        };

        Ok(items
            .into_iter()
            .zip(dates)
            .zip(quantities)
            .zip(stocks)
            .map(
                |(((item_id, date), quantity_used), stock_remaining)| UsageRecord {
                    item_id,
                    date,
                    quantity_used,
                    stock_remaining,
                },
            )
            .collect())
    }
}

/// Cleaned table carrying the forecast column
#[derive(Debug, Clone)]
pub struct ForecastTable {
    df: DataFrame,
    mapping: ColumnMapping,
}

impl ForecastTable {
    /// Wrap a result DataFrame, checking that it carries a forecast column
    pub fn from_dataframe(df: DataFrame, mapping: ColumnMapping) -> Result<Self> {
        require_column(&df, FORECAST_COLUMN)?;
        Ok(Self { df, mapping })
    }

    /// Get the DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Consume the table, returning the DataFrame
    pub fn into_dataframe(self) -> DataFrame {
        self.df
    }

    /// Get the column mapping the table was produced with
    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Rename the mapped columns to their [`ColumnMapping::canonical`] names
    ///
    /// Fails with a schema error if a canonical name is already taken by
    /// another column.
    pub fn into_canonical(mut self) -> Result<Self> {
        let canonical = self.mapping.canonical();
        let mut renames = vec![
            (self.mapping.date.clone(), canonical.date.clone()),
            (self.mapping.item.clone(), canonical.item.clone()),
            (self.mapping.quantity.clone(), canonical.quantity.clone()),
        ];
        if let (Some(from), Some(to)) = (&self.mapping.stock, &canonical.stock) {
            renames.push((from.clone(), to.clone()));
        }
        renames.retain(|(from, to)| from != to);

        let names: Vec<String> = self
            .df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        for (from, to) in &renames {
            if names.contains(to) {
                return Err(ForecastError::SchemaError(format!(
                    "cannot publish column '{}' as '{}': the table already has a '{}' column",
                    from, to, to
                )));
            }
        }

        for (from, to) in &renames {
            self.df.rename(from, to)?;
        }
        self.mapping = canonical;
        Ok(self)
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Extract typed forecast records
    ///
    /// The missing-quantity signal is read from [`MISSING_FLAG_COLUMN`] when
    /// present; tables written by other tools fall back to null quantities.
    pub fn records(&self) -> Result<Vec<ForecastRecord>> {
        let mapping = &self.mapping;
        let table = UsageTable::new(self.df.clone());
        let usage = table.records(mapping)?;
        let forecasts = numeric_values(require_column(&self.df, FORECAST_COLUMN)?)?;
        let flags = table.prior_missing_flags()?;

        usage
            .iter()
            .zip(forecasts)
            .zip(flags)
            .enumerate()
            .map(|(row, ((record, forecast), flag))| -> Result<ForecastRecord> {
                let forecast = forecast.ok_or_else(|| {
                    ForecastError::DataError(format!(
                        "missing {} value at row {}",
                        FORECAST_COLUMN, row
                    ))
                })?;
                let mut out = ForecastRecord::from_usage(record, forecast);
                out.quantity_was_null |= flag;
                Ok(out)
            })
            .collect()
    }
}

/// Look up a column, failing with a schema error that lists what is available
fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    let names = df.get_column_names();
    if !names.contains(&name) {
        return Err(ForecastError::SchemaError(format!(
            "required column '{}' is missing (available: {})",
            name,
            names.join(", ")
        )));
    }
    Ok(df.column(name)?)
}

fn text_values(series: &Series) -> Result<Vec<Option<String>>> {
    let text = series.cast(&DataType::Utf8)?;
    let values = text
        .utf8()?
        .into_iter()
        .map(|value| value.map(|v| v.to_string()))
        .collect();
    Ok(values)
}

/// Read a numeric column, keeping nulls and rejecting anything non-numeric
fn numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let column = series.name();
    let dtype = series.dtype();

    if matches!(dtype, DataType::Null) {
        return Ok(vec![None; series.len()]);
    }

    let values: Vec<Option<f64>> = if dtype.is_numeric() {
        series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect()
    } else {
        text_values(series)?
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                None => Ok(None),
                Some(v) if v.trim().is_empty() => Ok(None),
                Some(v) => v
                    .trim()
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| ForecastError::TypeMismatch {
                        column: column.to_string(),
                        row,
                        value: v,
                    }),
            })
            .collect::<Result<_>>()?
    };

    if let Some((row, value)) = values
        .iter()
        .enumerate()
        .find_map(|(row, v)| v.filter(|x| !x.is_finite()).map(|x| (row, x)))
    {
        return Err(ForecastError::TypeMismatch {
            column: column.to_string(),
            row,
            value: value.to_string(),
        });
    }

    Ok(values)
}

fn item_values(series: &Series) -> Result<Vec<String>> {
    text_values(series)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
                ForecastError::DataError(format!(
                    "missing item identifier in column '{}' at row {}",
                    series.name(),
                    row
                ))
            })
        })
        .collect()
}

fn date_values(series: &Series) -> Result<Vec<NaiveDate>> {
    text_values(series)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| -> Result<NaiveDate> {
            let value = value.ok_or_else(|| {
                ForecastError::DataError(format!(
                    "missing date in column '{}' at row {}",
                    series.name(),
                    row
                ))
            })?;
            parse_date(&value).ok_or_else(|| ForecastError::TypeMismatch {
                column: series.name().to_string(),
                row,
                value,
            })
        })
        .collect()
}

fn flag_values(series: &Series) -> Result<Vec<bool>> {
    Ok(text_values(series)?
        .into_iter()
        .map(|value| {
            value
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        })
        .collect())
}

/// Parse a calendar date, ignoring any time-of-day suffix
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let head = value.get(..10).unwrap_or(value);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(head, fmt).ok())
}
