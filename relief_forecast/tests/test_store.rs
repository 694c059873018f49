use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use relief_forecast::data::{ColumnMapping, UsageRecord, UsageTable};
use relief_forecast::audit::audit_health;
use relief_forecast::store::upload_csv;
use relief_forecast::{CsvDirectoryStore, ForecastError, ForecastProcedure, MemoryStore, TableStore};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn usage_table(quantities: &[Option<f64>]) -> UsageTable {
    let records: Vec<UsageRecord> = quantities
        .iter()
        .enumerate()
        .map(|(i, &qty)| {
            UsageRecord::new(
                "Antibiotics",
                NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap(),
                qty,
                Some(30.0 - i as f64 * 20.0),
            )
        })
        .collect();
    UsageTable::from_records(&records, &ColumnMapping::default()).unwrap()
}

fn seed<S: TableStore>(store: &mut S, table: &UsageTable) {
    let mut df = table.dataframe().clone();
    store.overwrite_table("INVENTORY_HISTORY", &mut df).unwrap();
}

#[test]
fn test_procedure_publishes_and_regrants() {
    let dir = tempdir().unwrap();
    let mut store = CsvDirectoryStore::open(dir.path()).unwrap();
    seed(&mut store, &usage_table(&[Some(10.0), None, Some(20.0)]));

    let procedure = ForecastProcedure::new(7, "forecast_results", "app_public").unwrap();
    let mapping = ColumnMapping::default();

    let first = procedure.run(&mut store, "RELIEF_DB.CORE.INVENTORY_HISTORY", &mapping).unwrap();
    assert_eq!(first.message, "Success: Forecast generated in FORECAST_RESULTS");
    assert_eq!(first.rows, 3);
    assert_eq!(first.health.null_quantity_count, 1);
    assert_eq!(first.health.negative_stock_count, 1);
    assert_eq!(store.grants("FORECAST_RESULTS").unwrap(), vec!["APP_PUBLIC".to_string()]);

    // A second run overwrites the table and grants again
    procedure.run(&mut store, "INVENTORY_HISTORY", &mapping).unwrap();
    assert_eq!(store.grants("FORECAST_RESULTS").unwrap(), vec!["APP_PUBLIC".to_string()]);

    let records = procedure.load_results(&store).unwrap().records().unwrap();
    let values: Vec<f64> = records.iter().map(|r| r.forecast_next_7_days).collect();
    assert_eq!(values, vec![10.0, 5.0, 10.0]);
    assert!(records[1].quantity_was_null);
    assert_eq!(
        store.table_names().unwrap(),
        vec!["FORECAST_RESULTS".to_string(), "INVENTORY_HISTORY".to_string()]
    );
}

#[test]
fn test_failed_run_keeps_previous_results() {
    let mut store = MemoryStore::new();
    seed(&mut store, &usage_table(&[Some(1.0), Some(3.0)]));

    let procedure = ForecastProcedure::new(7, "FORECAST_RESULTS", "APP_PUBLIC").unwrap();
    procedure
        .run(&mut store, "INVENTORY_HISTORY", &ColumnMapping::default())
        .unwrap();

    let renamed = ColumnMapping::new("DATE", "ITEM_NAME", "QTY_MISSING");
    let result = procedure.run(&mut store, "INVENTORY_HISTORY", &renamed);
    assert!(matches!(result, Err(ForecastError::SchemaError(_))));

    assert_eq!(store.read_table("FORECAST_RESULTS").unwrap().height(), 2);
    assert_eq!(store.grants("FORECAST_RESULTS").unwrap(), vec!["APP_PUBLIC".to_string()]);
}

#[test]
fn test_missing_input_table() {
    let mut store = MemoryStore::new();
    let procedure = ForecastProcedure::new(7, "FORECAST_RESULTS", "APP_PUBLIC").unwrap();
    let result = procedure.run(&mut store, "INVENTORY_HISTORY", &ColumnMapping::default());
    assert!(matches!(result, Err(ForecastError::TableNotFound(_))));
}

#[test]
fn test_upload_uppercases_columns() {
    let dir = tempdir().unwrap();
    let mut store = CsvDirectoryStore::open(dir.path()).unwrap();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,item_name,quantity_used,stock_remaining").unwrap();
    writeln!(file, "2024-01-01,Bandages,4,10").unwrap();
    writeln!(file, "2024-01-02,Bandages,6,4").unwrap();

    let rows = upload_csv(&mut store, file.path(), "inventory_history").unwrap();
    assert_eq!(rows, 2);

    let df = store.read_table("INVENTORY_HISTORY").unwrap();
    let names: Vec<&str> = df.get_column_names();
    assert_eq!(names, vec!["DATE", "ITEM_NAME", "QUANTITY_USED", "STOCK_REMAINING"]);
    assert!(store.table_path("inventory_history").unwrap().exists());
}

#[test]
fn test_overwrite_replaces_contents() {
    let dir = tempdir().unwrap();
    let mut store = CsvDirectoryStore::open(dir.path()).unwrap();

    seed(&mut store, &usage_table(&[Some(1.0), Some(2.0), Some(3.0)]));
    seed(&mut store, &usage_table(&[Some(1.0)]));

    assert_eq!(store.read_table("INVENTORY_HISTORY").unwrap().height(), 1);
    assert!(matches!(
        store.read_table("UNKNOWN"),
        Err(ForecastError::TableNotFound(_))
    ));
}

#[test]
fn test_custom_columns_are_published_under_default_names() {
    let mapping = ColumnMapping::new("DAY", "SKU", "USED").with_stock("LEFT");
    let records = vec![
        UsageRecord::new("Gauze", NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), Some(6.0), Some(-2.0)),
        UsageRecord::new("Gauze", NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(), None, Some(4.0)),
    ];
    let mut df = UsageTable::from_records(&records, &mapping)
        .unwrap()
        .dataframe()
        .clone();

    let dir = tempdir().unwrap();
    let mut store = CsvDirectoryStore::open(dir.path()).unwrap();
    store.overwrite_table("INVENTORY_HISTORY", &mut df).unwrap();

    let procedure = ForecastProcedure::new(7, "FORECAST_RESULTS", "APP_PUBLIC").unwrap();
    procedure.run(&mut store, "INVENTORY_HISTORY", &mapping).unwrap();

    let published = procedure.load_results(&store).unwrap();
    assert_eq!(published.mapping(), &ColumnMapping::default());
    let cleaned = published.records().unwrap();
    assert_eq!(cleaned[0].stock_remaining, Some(-2.0));
    assert_eq!(cleaned[1].forecast_next_7_days, 3.0);

    let health = audit_health(&cleaned);
    assert_eq!(health.null_quantity_count, 1);
    assert_eq!(health.negative_stock_count, 1);
}

#[test]
fn test_table_without_stock_column() {
    let mapping = ColumnMapping::new("DATE", "ITEM_NAME", "QUANTITY_USED");
    let records = vec![UsageRecord::new(
        "Paracetamol",
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        Some(8.0),
        None,
    )];
    let mut df = UsageTable::from_records(&records, &mapping)
        .unwrap()
        .dataframe()
        .clone();
    let mut store = MemoryStore::new();
    store.overwrite_table("INVENTORY_HISTORY", &mut df).unwrap();

    let procedure = ForecastProcedure::new(7, "FORECAST_RESULTS", "APP_PUBLIC").unwrap();
    procedure.run(&mut store, "INVENTORY_HISTORY", &mapping).unwrap();

    let published = procedure.load_results(&store).unwrap();
    assert_eq!(published.mapping().stock, None);
    assert_eq!(published.records().unwrap()[0].stock_remaining, None);
}

#[test]
fn test_rerun_over_results_keeps_missing_count() {
    let mut store = MemoryStore::new();
    seed(&mut store, &usage_table(&[None, Some(4.0), None]));

    let procedure = ForecastProcedure::new(7, "FORECAST_RESULTS", "APP_PUBLIC").unwrap();
    let mapping = ColumnMapping::default();
    let first = procedure.run(&mut store, "INVENTORY_HISTORY", &mapping).unwrap();
    let second = procedure.run(&mut store, "FORECAST_RESULTS", &mapping).unwrap();

    assert_eq!(first.health.null_quantity_count, 2);
    assert_eq!(second.health, first.health);
    let flagged = procedure
        .load_results(&store)
        .unwrap()
        .records()
        .unwrap()
        .iter()
        .filter(|r| r.quantity_was_null)
        .count();
    assert_eq!(flagged, 2);
}
