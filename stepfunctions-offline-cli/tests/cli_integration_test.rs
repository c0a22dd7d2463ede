//! Integration tests for the sfn-offline binary

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

const SERVERLESS_YML: &str = r#"
service: orders
custom:
  stepFunctionsLocal:
    accountId: 101010101010
    region: us-east-1
    TaskResourceMapping:
      Charge: arn:aws:lambda:us-east-1:101010101010:function:orders-dev-charge
stepFunctions:
  stateMachines:
    Orders:
      name: orders-flow
      definition:
        StartAt: Charge
        States:
          Charge:
            Type: Task
            Resource: !GetAtt charge.Arn
            End: true
"#;

const EMULATOR_LOG: &str = "\
Step Functions Local
2023-01-01 10:00:00.000 : arn:aws:states:us-east-1:101010101010:execution:MyMachine:exec1 : {\"Type\":\"ExecutionStarted\"}
2023-01-01 10:00:00.100 : arn:aws:states:us-east-1:101010101010:execution:MyMachine:exec1 : {\"Type\":\"TaskStateEntered\"}
2023-01-01 10:00:00.200 : arn:aws:states:us-east-1:101010101010:execution:MyMachine:exec1 : {\"Type\":\"ExecutionTimedOut\"}
";

fn sfn_offline() -> Command {
    let mut cmd = Command::cargo_bin("sfn-offline").unwrap();
    for key in [
        "STEP_FUNCTIONS_LOCAL_ACCOUNT_ID",
        "STEP_FUNCTIONS_LOCAL_REGION",
        "STEP_FUNCTIONS_LOCAL_PATH",
        "STEP_FUNCTIONS_LOCAL_EXTERNAL_INSTANCE",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn project_dir(serverless_yml: &str) -> Result<(TempDir, PathBuf)> {
    let temp = TempDir::new()?;
    let path = temp.path().join("serverless.yml");
    std::fs::write(&path, serverless_yml)?;
    Ok((temp, path))
}

#[test]
fn test_help_lists_commands() -> Result<()> {
    sfn_offline()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("rewrite"))
        .stdout(predicate::str::contains("translate"));
    Ok(())
}

#[test]
fn test_translate_file() -> Result<()> {
    let temp = TempDir::new()?;
    let log = temp.path().join("emulator.log");
    std::fs::write(&log, EMULATOR_LOG)?;

    let output = sfn_offline().arg("translate").arg(&log).assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).into_owned();

    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(serde_json::from_str)
        .collect::<std::result::Result<_, _>>()?;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["detail"]["status"], "RUNNING");
    assert_eq!(events[1]["detail"]["status"], "TIMED_OUT");
    assert_eq!(
        events[1]["detail"]["stateMachineArn"],
        "arn:aws:states:us-east-1:101010101010:stateMachine:MyMachine"
    );
    Ok(())
}

#[test]
fn test_translate_stdin() -> Result<()> {
    sfn_offline()
        .arg("translate")
        .write_stdin(EMULATOR_LOG)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"RUNNING\""))
        .stdout(predicate::str::contains("\"source\":\"aws.states\""));
    Ok(())
}

#[test]
fn test_translate_missing_file() -> Result<()> {
    sfn_offline()
        .args(["translate", "does-not-exist.log"])
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn test_rewrite_prints_rewritten_definition() -> Result<()> {
    let (_temp, path) = project_dir(SERVERLESS_YML)?;

    sfn_offline()
        .arg("--config")
        .arg(&path)
        .args(["rewrite", "--state-machine", "orders-flow"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "arn:aws:lambda:us-east-1:101010101010:function:orders-dev-charge",
        ));
    Ok(())
}

#[test]
fn test_rewrite_unknown_state_machine() -> Result<()> {
    let (_temp, path) = project_dir(SERVERLESS_YML)?;

    sfn_offline()
        .arg("--config")
        .arg(&path)
        .args(["rewrite", "--state-machine", "Nope"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("State machine 'Nope' not found"));
    Ok(())
}

#[test]
fn test_missing_account_id_is_reported() -> Result<()> {
    let (_temp, path) = project_dir("custom:\n  stepFunctionsLocal:\n    region: us-east-1\n")?;

    sfn_offline()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Step Functions Local: missing accountId",
        ));
    Ok(())
}

#[test]
fn test_config_flags_take_precedence() -> Result<()> {
    let (_temp, path) = project_dir(SERVERLESS_YML)?;

    sfn_offline()
        .arg("--config")
        .arg(&path)
        .args(["config", "--format", "json", "--region", "ap-southeast-2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"region\": \"ap-southeast-2\""));
    Ok(())
}

#[test]
fn test_install_reuses_existing_jar() -> Result<()> {
    let (temp, path) = project_dir(SERVERLESS_YML)?;
    let install_dir = temp.path().join("sfn");
    std::fs::create_dir_all(&install_dir)?;
    std::fs::write(install_dir.join("StepFunctionsLocal.jar"), "")?;

    sfn_offline()
        .arg("--config")
        .arg(&path)
        .arg("--path")
        .arg(&install_dir)
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("StepFunctionsLocal.jar"));
    Ok(())
}

#[test]
fn test_config_found_from_nested_directory() -> Result<()> {
    let (temp, _path) = project_dir(SERVERLESS_YML)?;
    let nested = temp.path().join("src").join("handlers");
    std::fs::create_dir_all(&nested)?;

    sfn_offline()
        .current_dir(&nested)
        .args(["config", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"account_id\": \"101010101010\""));
    Ok(())
}
