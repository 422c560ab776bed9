#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

fn run(db_path: &std::path::Path, rows: &[&str], report: &str) -> String {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "actor, action, arg").unwrap();
    for row in rows {
        writeln!(csv, "{row}").unwrap();
    }

    let output = Command::new(cargo_bin!("orderflow"))
        .arg(csv.path())
        .arg("--db-path")
        .arg(db_path)
        .arg("--operator-id")
        .arg("1")
        .arg("--report")
        .arg(report)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: a confirmed top-up
    let stdout1 = run(
        &db_path,
        &["9, top_up, 100", "1, operator, topup_confirm_1_9"],
        "balances",
    );
    assert!(stdout1.contains("9,100.00"));

    // 2. Second run: another top-up; ids continue and the balance accumulates
    let stdout2 = run(
        &db_path,
        &["9, top_up, 50", "1, operator, topup_confirm_2_9"],
        "balances",
    );
    assert!(stdout2.contains("9,150.00"));

    // 3. A replayed confirmation of the first top-up is refused
    let stdout3 = run(&db_path, &["1, operator, topup_confirm_1_9"], "balances");
    assert!(stdout3.contains("9,150.00"));
}

#[test]
fn test_rocksdb_pending_manual_order_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let stdout1 = run(
        &db_path,
        &[
            "7, buy, Shopify",
            "7, variant, TURKEY",
            "7, quantity, 1",
            "7, confirm_manual,",
        ],
        "orders",
    );
    assert!(stdout1.contains("1,7,Shopify-TURKEY,1,8.00,manual_wallet,pending,"));

    let stdout2 = run(&db_path, &["1, operator, issue_7"], "orders");
    assert!(stdout2.contains("1,7,Shopify-TURKEY,1,8.00,manual_wallet,confirmed,"));
}
