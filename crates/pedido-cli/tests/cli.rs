use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ORDER: &str = "\
PEDIDO Nº 1042
Nome: Maria Silva Código do Cliente: 42
Local: São Paulo Data: 05/01/26
Cód. Descrição Quant. Valor
A1 Produto X 02 1.200,00
Condições de Pagamento A VISTA
";

fn pedido(dir: &Path) -> Command {
    let config = dir.join("config.json");
    if !config.exists() {
        let db = dir.join("pedido.db");
        fs::write(
            &config,
            serde_json::json!({ "store": { "database_path": db } }).to_string(),
        )
        .unwrap();
    }
    let mut cmd = Command::cargo_bin("pedido").unwrap();
    cmd.arg("--config").arg(&config);
    cmd
}

fn write_order(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_extract_dry_run_json() {
    let dir = TempDir::new().unwrap();
    let input = write_order(dir.path(), "pedido-1042.txt", ORDER);

    let output = pedido(dir.path())
        .args(["extract", "--dry-run"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["result"]["case_id"], "pedido-1042");
    assert_eq!(report["result"]["items"][0]["code"], "A1");
    assert_eq!(report["writes"]["rows_inserted"], 1);
    assert!(!dir.path().join("pedido.db").exists());
}

#[test]
fn test_extract_text_format() {
    let dir = TempDir::new().unwrap();
    let input = write_order(dir.path(), "p.txt", ORDER);

    pedido(dir.path())
        .args(["extract", "--dry-run", "--format", "text", "--case", "c-9"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Case: c-9"))
        .stdout(predicate::str::contains("Maria Silva"))
        .stdout(predicate::str::contains("Total: R$ 1.200,00"));
}

#[test]
fn test_extract_csv_item_columns() {
    let dir = TempDir::new().unwrap();
    let input = write_order(dir.path(), "p.txt", ORDER);

    let output = pedido(dir.path())
        .args(["extract", "--dry-run", "--format", "csv"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut lines = stdout.lines();
    assert_eq!(
        lines.next(),
        Some("type,key,value,confidence,code,description,qty,value_raw")
    );
    assert!(stdout.contains("field,name,Maria Silva,"));
    assert!(stdout
        .lines()
        .any(|l| l == "item,1,1200.00,,A1,Produto X,2,\"1.200,00\""));
}

#[test]
fn test_extract_then_show() {
    let dir = TempDir::new().unwrap();
    let input = write_order(dir.path(), "pedido-7.txt", ORDER);

    pedido(dir.path()).arg("extract").arg(&input).assert().success();
    assert!(dir.path().join("pedido.db").exists());

    let output = pedido(dir.path())
        .args(["show", "--case", "pedido-7", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stored: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let fields = stored["fields"].as_array().unwrap();
    assert!(fields
        .iter()
        .any(|f| f["key"] == "customer_code" && f["value"] == "42" && f["source"] == "ocr"));
    assert_eq!(stored["items"].as_array().unwrap().len(), 1);
}

#[test]
fn test_batch_writes_summary() {
    let dir = TempDir::new().unwrap();
    write_order(dir.path(), "a.txt", ORDER);
    write_order(dir.path(), "b.txt", "Nome: João Pereira");
    let summary = dir.path().join("summary.csv");
    let pattern = dir.path().join("*.txt");

    pedido(dir.path())
        .args(["batch", "--jobs", "2", "--summary"])
        .arg(&summary)
        .arg(pattern.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 successful"));

    let csv = fs::read_to_string(&summary).unwrap();
    assert!(csv.starts_with("filename,case_id,status"));
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    pedido(dir.path())
        .args(["extract", "--dry-run", "nope.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_config_set_and_get() {
    let dir = TempDir::new().unwrap();

    pedido(dir.path())
        .args(["config", "set", "store.writer_id", "scanner-2"])
        .assert()
        .success();

    pedido(dir.path())
        .args(["config", "get", "store.writer_id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"scanner-2\""));
}
