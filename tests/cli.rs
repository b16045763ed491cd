use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn aic(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("aic").unwrap();
    cmd.env_remove("AIC_ROOT")
        .env_remove("RUST_LOG")
        .arg("--path")
        .arg(root);
    cmd
}

fn index_json(root: &Path) -> anyhow::Result<Value> {
    let output = aic(root).args(["index", "-o", "json"]).assert().success();
    Ok(serde_json::from_slice(&output.get_output().stdout)?)
}

fn fixture(root: &Path) {
    write(root, "pkg1/mod1.py", "from ..pkg2 import mod2\n\ndef main():\n    return mod2.helper()\n");
    write(
        root,
        "pkg2/mod2.py",
        "def helper() -> int:\n    \"\"\"Return the answer.\"\"\"\n    return 42\n",
    );
}

#[test]
fn test_index_is_incremental() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    fixture(tmp.path());

    let first = index_json(tmp.path())?;
    assert_eq!(first.get("files_reindexed").and_then(Value::as_u64), Some(2));

    let second = index_json(tmp.path())?;
    assert_eq!(second.get("files_reindexed").and_then(Value::as_u64), Some(0));
    assert_eq!(second.get("files_scanned").and_then(Value::as_u64), Some(2));

    write(tmp.path(), "pkg2/mod2.py", "def helper() -> str:\n    return 'x'\n");
    let third = index_json(tmp.path())?;
    assert_eq!(third.get("files_reindexed").and_then(Value::as_u64), Some(1));

    assert!(tmp.path().join(".aic/graph.db").exists());
    Ok(())
}

#[test]
fn test_context_lists_dependencies() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    fixture(tmp.path());
    aic(tmp.path()).arg("index").assert().success();

    aic(tmp.path())
        .args(["context", "pkg1/mod1.py"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# Context for pkg1/mod1.py\n"))
        .stdout(predicate::str::contains("## Dependencies\n### pkg2/mod2.py\n"))
        .stdout(predicate::str::contains("def helper() -> int:"))
        .stdout(predicate::str::contains("\"\"\"Return the answer.\"\"\""))
        .stdout(predicate::str::contains("return 42").not());

    Ok(())
}

#[test]
fn test_context_for_unindexed_file() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    fixture(tmp.path());
    aic(tmp.path()).arg("index").assert().success();

    aic(tmp.path())
        .args(["context", "nope.py"])
        .assert()
        .success()
        .stdout("# Error: nope.py not indexed.\n");

    Ok(())
}

#[test]
fn test_status_reports_dirty_nodes() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    fixture(tmp.path());
    aic(tmp.path()).arg("index").assert().success();

    write(tmp.path(), "pkg2/mod2.py", "def helper(x):\n    return x\n");
    aic(tmp.path()).arg("index").assert().success();

    let output = aic(tmp.path()).args(["status", "-o", "json"]).assert().success();
    let status: Value = serde_json::from_slice(&output.get_output().stdout)?;

    assert_eq!(
        status.pointer("/stats/dirty_nodes").and_then(Value::as_u64),
        Some(1)
    );
    assert_eq!(
        status.get("dirty").and_then(Value::as_array).map(Vec::len),
        Some(1)
    );

    aic(tmp.path())
        .args(["dependents", "pkg2/mod2.py"])
        .assert()
        .success()
        .stdout("pkg1/mod1.py\n");

    Ok(())
}

#[test]
fn test_status_requires_index() -> anyhow::Result<()> {
    let tmp = tempdir()?;

    aic(tmp.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));

    Ok(())
}

#[test]
fn test_init_refuses_to_reinitialize() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    fixture(tmp.path());

    aic(tmp.path())
        .args(["init", "--no-index"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized aic"));
    assert!(tmp.path().join(".aic/config.toml").exists());

    aic(tmp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));

    aic(tmp.path())
        .args(["init", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reindexed 2 file(s)"));

    Ok(())
}
