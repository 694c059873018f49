use assert_cmd::Command;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn aid_ops(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("aid_ops").unwrap();
    cmd.current_dir(workdir)
        .env("RUST_LOG", "error")
        .arg("--data-dir")
        .arg(workdir.join("data"));
    cmd
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

fn workdir_with_upload(csv: &str) -> TempDir {
    let dir = tempdir().unwrap();
    let file = dir.path().join("usage.csv");
    fs::write(&file, csv).unwrap();
    aid_ops(dir.path())
        .arg("upload")
        .arg(&file)
        .assert()
        .success();
    dir
}

#[test]
fn test_run_with_custom_columns_then_audit() {
    let dir = workdir_with_upload("day,sku,used\n2024-01-01,Bandages,10\n2024-01-02,Bandages,\n2024-01-03,Bandages,20\n");

    aid_ops(dir.path())
        .args(["run", "--date-col", "DAY", "--item-col", "SKU", "--qty-col", "USED", "--no-stock"])
        .assert()
        .success();

    let health = json_output(aid_ops(dir.path()).args(["--json", "audit"]));
    assert_eq!(health["rows"], 3);
    assert_eq!(health["null_quantity_count"], 1);
    assert_eq!(health["negative_stock_count"], 0);

    let coverage = json_output(aid_ops(dir.path()).args(["--json", "coverage"]));
    assert_eq!(coverage["active_skus"], 1);
}

#[test]
fn test_run_without_stock_column_in_upload() {
    let dir = workdir_with_upload("date,item_name,quantity_used\n2024-01-01,Insulin,4\n2024-01-02,Insulin,8\n");

    let outcome = json_output(aid_ops(dir.path()).args(["--json", "run"]));
    assert_eq!(outcome["rows"], 2);
    assert_eq!(outcome["message"], "Success: Forecast generated in FORECAST_RESULTS");

    let tables = json_output(aid_ops(dir.path()).args(["--json", "tables"]));
    assert_eq!(tables[0]["table"], "FORECAST_RESULTS");
    assert_eq!(tables[0]["grants"][0], "APP_PUBLIC");
}

#[test]
fn test_explicit_missing_stock_column_fails() {
    let dir = workdir_with_upload("date,item_name,quantity_used\n2024-01-01,Insulin,4\n");

    aid_ops(dir.path())
        .args(["run", "--stock-col", "LEFT"])
        .assert()
        .failure();
}
