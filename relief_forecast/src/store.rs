//! Table storage for usage and forecast tables
//!
//! A [`TableStore`] holds named tables with overwrite semantics: writing a
//! table replaces all of its previous contents and drops any `SELECT` grants
//! on it, the way a drop-and-recreate would. Callers that publish a table to
//! readers must grant access again after every overwrite.

use crate::data::DataLoader;
use crate::error::{ForecastError, Result};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

const GRANTS_FILE: &str = "grants.json";

/// Storage for named tables
pub trait TableStore {
    /// Read a whole table
    fn read_table(&self, name: &str) -> Result<DataFrame>;

    /// Replace a table's contents, creating it if needed
    ///
    /// Grants on the table are dropped.
    fn overwrite_table(&mut self, name: &str, df: &mut DataFrame) -> Result<()>;

    /// Allow `role` to read `table`
    fn grant_select(&mut self, table: &str, role: &str) -> Result<()>;

    /// Roles allowed to read `table`
    fn grants(&self, table: &str) -> Result<Vec<String>>;

    /// Names of all stored tables, sorted
    fn table_names(&self) -> Result<Vec<String>>;
}

/// Normalise a table name: the last segment of a qualified name, uppercased
///
/// `relief_db.core.inventory_history` becomes `INVENTORY_HISTORY`.
pub fn normalize_table_name(name: &str) -> Result<String> {
    let last = name.trim().rsplit('.').next().unwrap_or_default();
    let normalized = last.to_ascii_uppercase();

    if normalized.is_empty()
        || !normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ForecastError::InvalidParameter(format!(
            "Invalid table name '{}'",
            name
        )));
    }

    Ok(normalized)
}

/// Upload a CSV file into `table`, replacing its contents
///
/// Column names are uppercased. Returns the number of rows written.
pub fn upload_csv<S, P>(store: &mut S, path: P, table: &str) -> Result<usize>
where
    S: TableStore + ?Sized,
    P: AsRef<Path>,
{
    let mut df = DataLoader::read_frame(path.as_ref())?;
    let upper: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.trim().to_ascii_uppercase())
        .collect();
    df.set_column_names(&upper)?;

    let rows = df.height();
    store.overwrite_table(table, &mut df)?;
    info!(
        table,
        rows,
        source = %path.as_ref().display(),
        "CSV uploaded"
    );
    Ok(rows)
}

/// In-memory table store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, DataFrame>,
    grants: HashMap<String, BTreeSet<String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemoryStore {
    fn read_table(&self, name: &str) -> Result<DataFrame> {
        let key = normalize_table_name(name)?;
        self.tables
            .get(&key)
            .cloned()
            .ok_or(ForecastError::TableNotFound(key))
    }

    fn overwrite_table(&mut self, name: &str, df: &mut DataFrame) -> Result<()> {
        let key = normalize_table_name(name)?;
        self.grants.remove(&key);
        self.tables.insert(key, df.clone());
        Ok(())
    }

    fn grant_select(&mut self, table: &str, role: &str) -> Result<()> {
        let key = normalize_table_name(table)?;
        if !self.tables.contains_key(&key) {
            return Err(ForecastError::TableNotFound(key));
        }
        self.grants
            .entry(key)
            .or_default()
            .insert(role.to_ascii_uppercase());
        Ok(())
    }

    fn grants(&self, table: &str) -> Result<Vec<String>> {
        let key = normalize_table_name(table)?;
        Ok(self
            .grants
            .get(&key)
            .map(|roles| roles.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Table store keeping one CSV file per table in a directory
///
/// Overwrites go through a temporary file in the same directory that is then
/// renamed over the old table, so readers never see a partial table.
#[derive(Debug, Clone)]
pub struct CsvDirectoryStore {
    root: PathBuf,
}

impl CsvDirectoryStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the CSV file backing `table`
    pub fn table_path(&self, table: &str) -> Result<PathBuf> {
        Ok(self.root.join(format!("{}.csv", normalize_table_name(table)?)))
    }

    fn load_grants(&self) -> Result<BTreeMap<String, BTreeSet<String>>> {
        let path = self.root.join(GRANTS_FILE);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save_grants(&self, grants: &BTreeMap<String, BTreeSet<String>>) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(serde_json::to_string_pretty(grants)?.as_bytes())?;
        tmp.persist(self.root.join(GRANTS_FILE))
            .map_err(|e| ForecastError::IoError(e.error))?;
        Ok(())
    }
}

impl TableStore for CsvDirectoryStore {
    fn read_table(&self, name: &str) -> Result<DataFrame> {
        let path = self.table_path(name)?;
        if !path.exists() {
            return Err(ForecastError::TableNotFound(normalize_table_name(name)?));
        }
        debug!(path = %path.display(), "reading table");
        DataLoader::read_frame(path)
    }

    fn overwrite_table(&mut self, name: &str, df: &mut DataFrame) -> Result<()> {
        let key = normalize_table_name(name)?;
        let path = self.table_path(&key)?;

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        CsvWriter::new(tmp.as_file_mut())
            .has_header(true)
            .finish(df)?;
        tmp.persist(&path)
            .map_err(|e| ForecastError::IoError(e.error))?;

        let mut grants = self.load_grants()?;
        if grants.remove(&key).is_some() {
            self.save_grants(&grants)?;
        }
        debug!(table = %key, rows = df.height(), "table overwritten");
        Ok(())
    }

    fn grant_select(&mut self, table: &str, role: &str) -> Result<()> {
        let key = normalize_table_name(table)?;
        if !self.table_path(&key)?.exists() {
            return Err(ForecastError::TableNotFound(key));
        }
        let mut grants = self.load_grants()?;
        grants
            .entry(key)
            .or_default()
            .insert(role.to_ascii_uppercase());
        self.save_grants(&grants)
    }

    fn grants(&self, table: &str) -> Result<Vec<String>> {
        let key = normalize_table_name(table)?;
        Ok(self
            .load_grants()?
            .remove(&key)
            .map(|roles| roles.into_iter().collect())
            .unwrap_or_default())
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("csv") {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
