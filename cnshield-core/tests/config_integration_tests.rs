// cnshield-core/tests/config_integration_tests.rs
use anyhow::Result;
use std::io::Write;
use tempfile::NamedTempFile;

use cnshield_core::config::{EngineSettings, VerifierMode};
use cnshield_core::rules::{merge_rules, RuleSource, RuleStore};
use cnshield_core::{AnalyzeOptions, Analyzer, EntityType, RecognizerRegistry};

fn write_temp(content: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    Ok(file)
}

#[test]
fn test_load_builtin_rules() {
    let store = RuleStore::load_builtin_rules().unwrap();
    assert!(store.rules.len() >= 18);
    let phone = store.get("cn_phone").unwrap();
    assert_eq!(phone.entity_type, EntityType::Phone);
    assert_eq!(phone.source, RuleSource::Builtin);
    assert!(phone.enabled);
    assert!(phone.validator.is_some());
}

#[test]
fn test_load_rule_file() -> Result<()> {
    let file = write_temp(
        r#"
rules:
  - name: employee_no
    entity_type: employee-no
    description: Internal staff numbers.
    patterns:
      - name: gz
        regex: 'GZ-\d{6}'
        score: 0.5
    context: [工号]
"#,
    )?;
    let store = RuleStore::load_from_file(file.path())?;
    assert_eq!(store.rules.len(), 1);
    let rule = &store.rules[0];
    assert_eq!(rule.entity_type, EntityType::Custom("EMPLOYEE_NO".into()));
    assert!(rule.enabled);
    assert_eq!(rule.source, RuleSource::Custom);
    assert_eq!(rule.context, vec!["工号".to_string()]);
    Ok(())
}

#[test]
fn test_rule_file_with_bad_regex_is_rejected() -> Result<()> {
    let file = write_temp(
        r#"
rules:
  - name: broken
    entity_type: BROKEN
    patterns:
      - name: p
        regex: 'GZ-('
        score: 0.5
  - name: out_of_range
    entity_type: BROKEN
    patterns:
      - name: p
        regex: 'x'
        score: 1.5
"#,
    )?;
    let err = RuleStore::load_from_file(file.path()).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("broken"), "{message}");
    assert!(message.contains("out_of_range"), "{message}");
    Ok(())
}

#[test]
fn test_user_file_overrides_builtin() -> Result<()> {
    let file = write_temp(
        r#"
rules:
  - name: cn_postal_code
    entity_type: POSTAL_CODE
    enabled: false
    patterns:
      - name: postal_code_high
        regex: '(?<![0-9])\d{6}(?![0-9])'
        score: 0.4
"#,
    )?;
    let builtin = RuleStore::load_builtin_rules()?;
    let count = builtin.rules.len();
    let position = builtin.rules.iter().position(|r| r.name == "cn_postal_code").unwrap();

    let merged = merge_rules(builtin, Some(RuleStore::load_from_file(file.path())?));
    assert_eq!(merged.rules.len(), count);
    let postal = &merged.rules[position];
    assert_eq!(postal.name, "cn_postal_code");
    assert!(!postal.enabled);
    assert_eq!(postal.source, RuleSource::Builtin);
    Ok(())
}

#[test]
fn test_partial_settings_file() -> Result<()> {
    let file = write_temp(
        r##"
scoring:
  high_confidence_threshold: 0.8
verifier:
  enabled: true
  mode: mock
recognizers:
  enabled: [cn_phone, cn_email]
anonymizer:
  filler: "#"
"##,
    )?;
    let settings = EngineSettings::load_from_file(file.path())?;
    assert_eq!(settings.scoring.high_confidence_threshold, 0.8);
    assert_eq!(settings.scoring.low_confidence_threshold, 0.3);
    assert_eq!(settings.verifier.mode, VerifierMode::Mock);
    assert_eq!(settings.anonymizer.filler, '#');
    assert_eq!(settings.nlp, EngineSettings::default().nlp);
    Ok(())
}

#[test]
fn test_invalid_settings_file_names_the_problem() -> Result<()> {
    let file = write_temp(
        r#"
scoring:
  high_confidence_threshold: 0.2
  low_confidence_threshold: 0.6
"#,
    )?;
    let err = EngineSettings::load_from_file(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("Invalid settings"));

    let file = write_temp("verifier:\n  mode: telepathy\n")?;
    assert!(EngineSettings::load_from_file(file.path()).is_err());
    Ok(())
}

#[tokio::test]
async fn test_settings_file_drives_the_engine() -> Result<()> {
    let file = write_temp("recognizers:\n  enabled: [cn_phone]\nanonymizer:\n  filler: \"#\"\n")?;
    let settings = EngineSettings::load_from_file(file.path())?;
    let registry = RecognizerRegistry::new(settings)?;
    assert_eq!(registry.snapshot().recognizer_names(), vec!["cn_phone"]);

    let analyzer = Analyzer::new(std::sync::Arc::new(registry));
    let out = analyzer.anonymize("电话13812345678", &AnalyzeOptions::default()).await?;
    assert_eq!(out.text, "电话138####5678");
    Ok(())
}

#[test]
fn test_saved_rules_reload_into_a_new_registry() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("rules.yaml");

    let registry = RecognizerRegistry::new(EngineSettings::default())?;
    registry.set_rule_enabled("cn_wechat_id", false)?;
    registry.save_rules(&path)?;

    let saved = RuleStore::load_from_file(&path)?;
    assert_eq!(saved.rules.len(), 1);
    assert_eq!(saved.rules[0].name, "cn_wechat_id");

    let fresh = RecognizerRegistry::new(EngineSettings::default())?;
    fresh.load_rules(&path)?;
    assert!(!fresh.get_rule("cn_wechat_id").unwrap().enabled);
    assert!(!fresh.snapshot().recognizer_names().contains(&"cn_wechat_id"));
    Ok(())
}
