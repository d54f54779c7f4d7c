//! Command-line tests against the built binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const TABLE: &str = "codigo;ex;tipo;descricao;nacionalfederal;importadosfederal;estadual;municipal;vigenciainicio;vigenciafim;fonte\n\
                     01012100;;0;Cavalos;4,20;6,78;18,00;0,00;01/03/2024;;IBPT\n";

fn harvester() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ibptax-harvester"))
}

fn write_table(dir: &Path, name: &str) {
    fs::write(dir.join(name), TABLE).unwrap();
}

#[test]
fn test_process_command() {
    let dir = tempdir().unwrap();
    write_table(dir.path(), "IBPTaxSP25.2.csv");
    let out = dir.path().join("out");

    harvester()
        .arg("--output")
        .arg(&out)
        .arg("process")
        .arg(dir.path().join("IBPTaxSP25.2.csv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed"))
        .stdout(predicate::str::contains("1 records"));

    assert!(out.join("25.2.E/SP/NCM/01012100.json").exists());
    let log = fs::read_to_string(out.join("process.log")).unwrap();
    assert!(log.contains("Run started"));
    assert!(log.contains("Table processed"));
}

#[test]
fn test_run_with_local_selection() {
    let dir = tempdir().unwrap();
    write_table(dir.path(), "IBPTaxAC25.2.csv");
    write_table(dir.path(), "IBPTaxRJ25.2.csv");

    harvester()
        .arg("--output")
        .arg(dir.path())
        .args(["run", "--no-sync", "--select", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[0] IBPTaxAC25.2.csv"))
        .stdout(predicate::str::contains("[1] IBPTaxRJ25.2.csv"));

    assert!(dir.path().join("25.2.E/RJ/NCM/01012100.json").exists());
    assert!(!dir.path().join("25.2.E/AC").exists());
}

#[test]
fn test_run_with_invalid_selection_changes_nothing() {
    let dir = tempdir().unwrap();
    write_table(dir.path(), "IBPTaxAC25.2.csv");

    harvester()
        .arg("--output")
        .arg(dir.path())
        .args(["run", "--no-sync", "--select", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid selection"));

    assert!(!dir.path().join("25.2.E").exists());
    assert!(!dir.path().join("versao.json").exists());
}

#[test]
fn test_run_selects_first_table_with_index_zero() {
    let dir = tempdir().unwrap();
    write_table(dir.path(), "IBPTaxAC25.2.csv");
    write_table(dir.path(), "IBPTaxRJ25.2.csv");

    harvester()
        .arg("--output")
        .arg(dir.path())
        .args(["run", "--no-sync", "--select", "0"])
        .assert()
        .success();

    assert!(dir.path().join("25.2.E/AC/NCM/01012100.json").exists());
    assert!(!dir.path().join("25.2.E/RJ").exists());
}

#[test]
fn test_run_with_missing_input_completes() {
    let dir = tempdir().unwrap();

    harvester()
        .arg("--output")
        .arg(dir.path())
        .args(["run", "--no-sync", "--input"])
        .arg(dir.path().join("missing"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Cannot list local tables"))
        .stdout(predicate::str::contains("Processed"));

    let log = fs::read_to_string(dir.path().join("process.log")).unwrap();
    assert!(log.contains("ERROR"));
    assert!(log.contains("Cannot list local tables"));
    assert!(log.contains("Run finished"));
}

#[test]
fn test_run_with_unreachable_listing_falls_back_to_local() {
    let dir = tempdir().unwrap();
    write_table(dir.path(), "IBPTaxAC25.2.csv");

    harvester()
        .arg("--output")
        .arg(dir.path())
        .args(["run", "--listing-url", "http://127.0.0.1:1/tables", "--select", "A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[0] IBPTaxAC25.2.csv"));

    assert!(dir.path().join("25.2.E/AC/NCM/01012100.json").exists());
    let log = fs::read_to_string(dir.path().join("process.log")).unwrap();
    assert!(log.contains("Remote sync failed"));
}

#[test]
fn test_process_requires_files() {
    harvester().arg("process").assert().failure();
}
