use std::process::{Command, Output};
use tempfile::TempDir;

fn run_memo(transaction: &str, memo: &str) -> Output {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tx.json");
    std::fs::write(&path, transaction).unwrap();

    Command::new(env!("CARGO_BIN_EXE_fwup"))
        .args(["memo", "--transaction"])
        .arg(&path)
        .args(["--memo", memo, "--account-id", "hedera-acc-1"])
        .output()
        .expect("failed to run fwup binary")
}

#[test]
fn memo_updates_transaction_and_prints_route() {
    let output = run_memo(r#"{"recipient": "0.0.1234", "amount": 150000000}"#, "  rent  ");

    assert!(output.status.success());
    let route: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(route["accountId"], "hedera-acc-1");
    assert_eq!(route["transaction"]["recipient"], "0.0.1234");
    assert_eq!(route["transaction"]["memo"], "rent");
}

#[test]
fn oversized_memo_fails() {
    let memo = "m".repeat(101);
    let output = run_memo(r#"{"recipient": "0.0.1234", "amount": 1}"#, &memo);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Hedera accepts at most 100"));
}

#[test]
fn identifier_prints_chunks() {
    let output = Command::new(env!("CARGO_BIN_EXE_fwup"))
        .args(["identifier", "8f1c0a9bd7e3", "--device-model", "blue"])
        .output()
        .expect("failed to run fwup binary");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "8F1C0A\n9BD7E3\n");
}

#[test]
fn identifier_accepts_non_ascii_hash() {
    let output = Command::new(env!("CARGO_BIN_EXE_fwup"))
        .args(["identifier", "aéééébcdé", "--device-model", "nanoX"])
        .output()
        .expect("failed to run fwup binary");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "AÉÉÉ...BCDÉ\n");
}
