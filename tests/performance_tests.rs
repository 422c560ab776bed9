use assert_cmd::cargo_bin;
use std::process::Command;

mod common;

#[test]
fn test_many_buyers_script() {
    let dir = tempfile::tempdir().unwrap();
    let script_path = dir.path().join("many_buyers.csv");
    common::generate_script(&script_path, 2_000).expect("Failed to generate script");

    let output = Command::new(cargo_bin!("orderflow"))
        .arg(&script_path)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success(), "Binary failed to process script");

    let stdout = String::from_utf8_lossy(&output.stdout);
    // header plus one confirmed order per buyer
    assert_eq!(stdout.lines().count(), 2_001);
    assert!(
        stdout
            .lines()
            .skip(1)
            .all(|line| line.contains(",Shopify-NETHERLANDS,1,12.00,automated_invoice,confirmed,"))
    );
}
