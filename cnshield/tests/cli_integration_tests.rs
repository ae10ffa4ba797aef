// cnshield/tests/cli_integration_tests.rs
//! Command-line integration tests for the `cnshield` binary.
//!
//! Every test runs the binary with its own settings and rule files inside a
//! temporary directory so the user's configuration never leaks in.
//! `strip_ansi_escapes` keeps assertions independent of coloring.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use strip_ansi_escapes::strip as strip_ansi_escapes_fn;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    settings: PathBuf,
    rules: PathBuf,
}

impl Workspace {
    fn new(settings_yaml: &str) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let settings = dir.path().join("settings.yaml");
        fs::write(&settings, settings_yaml)?;
        let rules = dir.path().join("rules.yaml");
        Ok(Self { dir, settings, rules })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("cnshield").unwrap();
        for var in [
            "CNSHIELD_SETTINGS",
            "CNSHIELD_RULES",
            "CNSHIELD_VERIFIER_ENABLED",
            "CNSHIELD_VERIFIER_MODE",
            "CNSHIELD_VERIFIER_API_KEY",
            "CNSHIELD_HIGH_THRESHOLD",
            "CNSHIELD_LOW_THRESHOLD",
            "CNSHIELD_MAX_INPUT_CHARS",
        ] {
            cmd.env_remove(var);
        }
        cmd.env("RUST_LOG", "warn");
        cmd.arg("--settings").arg(&self.settings).arg("--rules").arg(&self.rules);
        cmd
    }
}

fn strip_ansi(s: &[u8]) -> String {
    String::from_utf8_lossy(&strip_ansi_escapes_fn(s)).to_string()
}

fn write_rule(path: &Path, yaml: &str) -> Result<()> {
    fs::write(path, yaml)?;
    Ok(())
}

const WORK_ID_RULE: &str = r#"
name: work_id
entity_type: WORK_ID
description: Staff numbers.
patterns:
  - name: gz
    regex: 'GZ-\d{6}'
    score: 0.5
context: [工号]
"#;

#[test]
fn anonymize_reads_stdin() -> Result<()> {
    let ws = Workspace::new("{}")?;
    let output = ws
        .cmd()
        .args(["anonymize", "--no-summary"])
        .write_stdin("联系电话13812345678，邮箱zhangsan@qq.com")
        .output()?;
    assert!(output.status.success());
    let stdout = strip_ansi(&output.stdout);
    assert_eq!(stdout.trim_end(), "联系电话138****5678，邮箱zha***@qq.com");
    Ok(())
}

#[test]
fn anonymize_writes_output_file() -> Result<()> {
    let ws = Workspace::new("anonymizer:\n  filler: \"#\"\n")?;
    let input = ws.path("input.txt");
    let output = ws.path("out.txt");
    fs::write(&input, "身份证号110101199003074514")?;

    ws.cmd()
        .args(["anonymize", "--quiet", "-e", "ID_CARD", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert_eq!(fs::read_to_string(&output)?, "身份证号1101##########4514");
    Ok(())
}

#[test]
fn anonymize_keeps_line_endings_as_they_were() -> Result<()> {
    let ws = Workspace::new("{}")?;
    let output = ws.path("out.txt");
    for (input, expected) in [
        ("电话13812345678", "电话138****5678"),
        ("电话13812345678\n", "电话138****5678\n"),
        ("第一行\r\n电话13812345678\r\n\r\n", "第一行\r\n电话138****5678\r\n\r\n"),
    ] {
        ws.cmd()
            .args(["anonymize", "--quiet", "--no-summary", "-o"])
            .arg(&output)
            .write_stdin(input)
            .assert()
            .success();
        assert_eq!(fs::read_to_string(&output)?, expected);

        ws.cmd()
            .args(["anonymize", "--quiet", "--no-summary"])
            .write_stdin(input)
            .assert()
            .success()
            .stdout(expected);
    }
    Ok(())
}

#[test]
fn analyze_table_never_shows_raw_values() -> Result<()> {
    let ws = Workspace::new("{}")?;
    let output = ws.cmd().args(["analyze", "--text", "电话13812345678"]).output()?;
    assert!(output.status.success());
    let stdout = strip_ansi(&output.stdout);
    assert!(stdout.contains("PHONE"), "{stdout}");
    assert!(stdout.contains("138****5678"), "{stdout}");
    assert!(!stdout.contains("13812345678"), "{stdout}");
    assert!(strip_ansi(&output.stderr).contains("1 finding(s)"));
    Ok(())
}

#[test]
fn analyze_json_report() -> Result<()> {
    let ws = Workspace::new("{}")?;
    let output = ws
        .cmd()
        .args(["analyze", "--json", "--quiet", "-e", "PHONE"])
        .write_stdin("电话13812345678，邮箱zhangsan@qq.com")
        .output()?;
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let results = report["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["entity_type"], "PHONE");
    assert_eq!(results[0]["start"], 2);
    assert_eq!(results[0]["end"], 13);
    assert_eq!(report["snapshot_version"], 1);
    Ok(())
}

#[test]
fn fail_over_threshold_sets_exit_code() -> Result<()> {
    let ws = Workspace::new("{}")?;
    ws.cmd()
        .args(["analyze", "--fail-over-threshold", "0", "--text", "电话13812345678"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceed the threshold"));
    ws.cmd()
        .args(["analyze", "--fail-over-threshold", "0", "--text", "今天天气不错"])
        .assert()
        .success();
    Ok(())
}

fn write_documents(ws: &Workspace) -> Result<PathBuf> {
    let docs = ws.path("docs");
    fs::create_dir_all(docs.join("sub"))?;
    fs::write(docs.join("a.txt"), "第一行\n客户电话13812345678\n")?;
    fs::write(docs.join("b.csv"), "姓名,邮箱\n张三,zhangsan@qq.com\n")?;
    fs::write(docs.join("skip.png"), [0x89u8, b'P', b'N', b'G'])?;
    fs::write(docs.join("sub").join("c.json"), r#"{"user": {"phone": "13912345678"}}"#)?;
    Ok(docs)
}

#[test]
fn analyze_file_scans_a_directory() -> Result<()> {
    let ws = Workspace::new("{}")?;
    let docs = write_documents(&ws)?;
    let output = ws
        .cmd()
        .args(["analyze", "--json", "--quiet", "-e", "PHONE,EMAIL", "--file"])
        .arg(&docs)
        .output()?;
    assert!(output.status.success(), "{}", strip_ansi(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["statistics"]["total_files"], 3);
    assert_eq!(report["statistics"]["total_findings"], 3);
    assert_eq!(report["statistics"]["by_entity_type"]["PHONE"], 2);
    assert!(report["risk_level"].is_string());

    let files = report["files"].as_array().unwrap();
    assert!(files[0]["path"].as_str().unwrap().ends_with("a.txt"));
    let text_hit = &files[0]["findings"][0];
    assert_eq!(text_hit["location"]["kind"], "text");
    assert_eq!(text_hit["location"]["line"], 2);
    assert_eq!(text_hit["masked"], "138****5678");
    assert_eq!(files[1]["findings"][0]["location"]["row"], 2);
    assert_eq!(files[2]["findings"][0]["location"]["pointer"], "/user/phone");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("13812345678"));

    let output = ws
        .cmd()
        .args(["analyze", "--json", "--quiet", "--no-recursive", "--file"])
        .arg(&docs)
        .output()?;
    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["statistics"]["total_files"], 2);
    Ok(())
}

#[test]
fn analyze_file_writes_a_risk_report() -> Result<()> {
    let ws = Workspace::new("{}")?;
    let docs = write_documents(&ws)?;
    let saved = ws.path("risk.json");
    let output = ws
        .cmd()
        .args(["analyze", "-e", "PHONE,EMAIL", "--file"])
        .arg(&docs)
        .arg("--report")
        .arg(&saved)
        .output()?;
    assert!(output.status.success());
    let stdout = strip_ansi(&output.stdout);
    assert!(stdout.contains("row 2, column 2"), "{stdout}");
    assert!(!stdout.contains("zhangsan@qq.com"), "{stdout}");
    let stderr = strip_ansi(&output.stderr);
    assert!(stderr.contains("3 finding(s) in 3 file(s)"), "{stderr}");

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&saved)?)?;
    assert_eq!(report["statistics"]["processed_files"], 3);
    assert!(report["risk_summaries"].as_array().is_some_and(|s| !s.is_empty()));

    ws.cmd()
        .args(["analyze", "--fail-over-threshold", "2", "--file"])
        .arg(&docs)
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceed the threshold"));
    Ok(())
}

#[test]
fn analyze_file_conflicts_with_text() -> Result<()> {
    let ws = Workspace::new("{}")?;
    ws.cmd()
        .args(["analyze", "--text", "电话13812345678", "--file", "docs"])
        .assert()
        .failure();
    ws.cmd().args(["analyze", "--text", "电话", "--report", "r.json"]).assert().failure();
    Ok(())
}

#[test]
fn oversized_input_is_an_error() -> Result<()> {
    let ws = Workspace::new("limits:\n  max_input_chars: 5\n")?;
    ws.cmd()
        .args(["analyze", "--text", "13812345678"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds the limit of 5"));
    Ok(())
}

#[test]
fn rule_lifecycle_is_persisted() -> Result<()> {
    let ws = Workspace::new("{}")?;
    let rule_file = ws.path("work_id.yaml");
    write_rule(&rule_file, WORK_ID_RULE)?;

    ws.cmd()
        .args(["rules", "add", "--file"])
        .arg(&rule_file)
        .assert()
        .success()
        .stderr(predicate::str::contains("Added rule 'work_id'"));
    assert!(fs::read_to_string(&ws.rules)?.contains("work_id"));

    let output = ws.cmd().args(["rules", "test", "work_id", "工号GZ-123456"]).output()?;
    assert!(output.status.success());
    let stdout = strip_ansi(&output.stdout);
    assert!(stdout.contains("GZ-123456"), "{stdout}");
    assert!(stdout.contains("0.60"), "{stdout}");

    ws.cmd()
        .args(["anonymize", "--quiet", "--text", "工号GZ-123456"])
        .assert()
        .success()
        .stdout(predicate::str::contains("工号*********"));

    ws.cmd().args(["rules", "disable", "work_id"]).assert().success();
    ws.cmd()
        .args(["anonymize", "--quiet", "--text", "工号GZ-123456"])
        .assert()
        .success()
        .stdout(predicate::str::contains("工号GZ-123456"));

    ws.cmd().args(["rules", "delete", "work_id"]).assert().success();
    ws.cmd()
        .args(["rules", "show", "work_id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
    Ok(())
}

#[test]
fn duplicate_and_builtin_protection() -> Result<()> {
    let ws = Workspace::new("{}")?;
    let rule_file = ws.path("work_id.yaml");
    write_rule(&rule_file, WORK_ID_RULE)?;

    ws.cmd().args(["rules", "add", "-f"]).arg(&rule_file).assert().success();
    ws.cmd()
        .args(["rules", "add", "-f"])
        .arg(&rule_file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    ws.cmd()
        .args(["rules", "delete", "cn_phone"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("builtin"));
    Ok(())
}

#[test]
fn builtin_rules_can_be_disabled() -> Result<()> {
    let ws = Workspace::new("{}")?;
    ws.cmd().args(["rules", "disable", "cn_phone"]).assert().success();

    let output = ws.cmd().args(["rules", "list"]).output()?;
    let stdout = strip_ansi(&output.stdout);
    let phone_row = stdout.lines().find(|l| l.contains("cn_phone")).unwrap();
    assert!(phone_row.contains("no"), "{phone_row}");

    ws.cmd()
        .args(["anonymize", "--quiet", "--text", "电话13812345678"])
        .assert()
        .success()
        .stdout(predicate::str::contains("13812345678"));
    Ok(())
}

#[test]
fn validate_regex_reports_errors() -> Result<()> {
    let ws = Workspace::new("{}")?;
    ws.cmd()
        .args(["rules", "validate-regex", r"(?<!\d)GZ-\d{6}"])
        .assert()
        .success()
        .stderr(predicate::str::contains("valid"));
    ws.cmd()
        .args(["rules", "validate-regex", "GZ-("])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to compile pattern"));
    Ok(())
}

#[test]
fn config_show_redacts_api_key() -> Result<()> {
    let ws = Workspace::new("scoring:\n  high_confidence_threshold: 0.8\n")?;
    let output = ws
        .cmd()
        .env("CNSHIELD_VERIFIER_API_KEY", "sk-test-secret")
        .args(["config", "show"])
        .output()?;
    assert!(output.status.success());
    let stdout = strip_ansi(&output.stdout);
    assert!(stdout.contains("high_confidence_threshold: 0.8"), "{stdout}");
    assert!(!stdout.contains("sk-test-secret"));
    assert!(stdout.contains("[REDACTED]"));
    Ok(())
}

#[test]
fn config_validate_rejects_inverted_thresholds() -> Result<()> {
    let ws = Workspace::new("{}")?;
    let bad = ws.path("bad.yaml");
    fs::write(&bad, "scoring:\n  high_confidence_threshold: 0.2\n  low_confidence_threshold: 0.5\n")?;
    ws.cmd()
        .args(["config", "validate"])
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid settings"));
    ws.cmd().args(["config", "validate"]).assert().success();
    Ok(())
}
