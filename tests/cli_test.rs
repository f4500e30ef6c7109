use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("job-escrow"));
    cmd.arg("tests/fixtures/market.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "index,owner,provider,metadata,rate,balance,last_settled",
        ))
        // Job 0 was drained by its second settlement and closed
        .stdout(predicate::str::contains("0,alice,bob").not())
        .stdout(predicate::str::contains(
            "1,alice,bob,mistral,1000000000000,200,1700000010",
        ));

    Ok(())
}

#[test]
fn test_cli_balances_report() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("job-escrow"));
    cmd.arg("tests/fixtures/market.csv")
        .arg("--report")
        .arg("balances");

    cmd.assert().success().stdout(predicate::eq(
        "account,balance\nadmin,0\nalice,700\nbob,100\nkeeper,0\nvault,200\n",
    ));

    Ok(())
}

#[test]
fn test_cli_providers_report() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("job-escrow"));
    cmd.arg("tests/fixtures/market.csv")
        .arg("--report")
        .arg("providers");

    cmd.assert()
        .success()
        .stdout(predicate::eq("authority,cp\nbob,http://bob:8080\n"));

    Ok(())
}

#[test]
fn test_cli_custom_mint() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("job-escrow"));
    cmd.arg("tests/fixtures/market.csv")
        .arg("--mint")
        .arg("usdt")
        .arg("--report")
        .arg("balances");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("alice,700"));

    Ok(())
}

#[test]
fn test_cli_missing_input() {
    let mut cmd = Command::new(cargo_bin!("job-escrow"));
    cmd.arg("tests/fixtures/does_not_exist.csv");

    cmd.assert().failure();
}
