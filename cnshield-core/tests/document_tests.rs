// cnshield-core/tests/document_tests.rs
use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use cnshield_core::{
    AnalyzeOptions, Analyzer, DocumentConfig, DocumentScanner, EngineSettings, EntityType, Location,
    RecognizerRegistry, RiskLevel, ScanReport,
};

fn scanner() -> DocumentScanner {
    let registry = Arc::new(RecognizerRegistry::new(EngineSettings::default()).unwrap());
    DocumentScanner::new(Analyzer::new(registry)).with_options(AnalyzeOptions::entities([
        EntityType::Phone,
        EntityType::Email,
        EntityType::IdCard,
    ]))
}

fn write_tree(root: &Path) -> Result<()> {
    fs::write(root.join("a.txt"), "会议纪要\n\n请联系客户电话13812345678确认\n")?;
    fs::write(root.join("b.csv"), "字段,值\n身份证号,110101199003074514\n")?;
    fs::write(
        root.join("c.jsonl"),
        "{\"email\": \"li@163.com\"}\nnot json\n{\"tags\": [\"vip\"], \"mobile\": \"13912345678\"}\n",
    )?;
    fs::create_dir(root.join("nested"))?;
    fs::write(root.join("nested").join("d.md"), "# 联系方式\n手机：13712345678\n")?;
    fs::write(root.join("z.bin"), [0u8, 1, 2, 3])?;
    Ok(())
}

#[test_log::test(tokio::test)]
async fn directory_scan_maps_findings_to_their_source() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_tree(dir.path())?;

    let files = scanner().scan_path(dir.path()).await?;
    let names: Vec<_> = files
        .iter()
        .map(|f| Path::new(&f.path).file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.txt", "b.csv", "c.jsonl", "d.md"]);
    assert!(files.iter().all(|f| f.is_ok()), "{files:?}");

    let text = &files[0].findings;
    assert_eq!(text.len(), 1);
    assert_eq!(text[0].location, Location::Text { line: 3, column: 8, start: 13, end: 24 });

    let csv = &files[1].findings;
    assert_eq!(csv.len(), 1);
    assert_eq!(csv[0].entity_type, EntityType::IdCard);
    assert_eq!(csv[0].masked, "1101**********4514");
    assert_eq!(csv[0].location, Location::Cell { row: 2, column: 2, start: 0, end: 18 });

    let jsonl = &files[2].findings;
    let located: Vec<_> = jsonl.iter().map(|f| (f.entity_type.clone(), f.location.to_string())).collect();
    assert_eq!(
        located,
        vec![(EntityType::Email, "line 1 /email".to_string()), (EntityType::Phone, "line 3 /mobile".to_string())]
    );

    assert_eq!(files[3].findings.len(), 1);
    assert_eq!(files[3].file_type, "md");
    Ok(())
}

#[tokio::test]
async fn top_level_only_when_not_recursive() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_tree(dir.path())?;
    let config = DocumentConfig { recursive: false, ..DocumentConfig::default() };

    let files = scanner().with_config(config).scan_path(dir.path()).await?;
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|f| !f.path.contains("nested")));
    Ok(())
}

#[tokio::test]
async fn oversized_and_broken_files_do_not_stop_the_scan() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("big.log"), "x".repeat(64))?;
    fs::write(dir.path().join("broken.json"), "{\"phone\": ")?;
    fs::write(dir.path().join("ok.txt"), "电话13812345678")?;
    let config = DocumentConfig { max_file_bytes: 32, ..DocumentConfig::default() };

    let files = scanner().with_config(config).scan_path(dir.path()).await?;
    assert_eq!(files.len(), 3);
    assert!(files[0].error.as_deref().unwrap().contains("over the limit"));
    assert!(files[1].error.as_deref().unwrap().contains("invalid JSON"));
    assert!(files[2].is_ok());

    let report = ScanReport::from_files(files);
    assert_eq!(report.statistics.failed_files, 2);
    assert_eq!(report.statistics.processed_files, 1);
    assert_eq!(report.statistics.total_findings, 1);
    assert_eq!(report.statistics.avg_findings_per_file, 1.0);
    Ok(())
}

#[tokio::test]
async fn single_file_scan_and_risk_report() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_tree(dir.path())?;

    let single = scanner().scan_path(&dir.path().join("b.csv")).await?;
    assert_eq!(single.len(), 1);

    let report = ScanReport::from_files(scanner().scan_path(dir.path()).await?);
    assert!(report.risk_score >= 10);
    assert_eq!(report.risk_summaries[0].entity_type, EntityType::IdCard);
    assert_eq!(report.risk_summaries[0].level, RiskLevel::High);
    assert_eq!(report.statistics.by_entity_type["PHONE"], 3);
    assert_eq!(report.statistics.by_file_type["jsonl"], 1);

    let path = dir.path().join("report.json");
    report.save_json(&path)?;
    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(saved["statistics"]["total_files"], 4);
    assert!(!fs::read_to_string(&path)?.contains("110101199003074514"));
    Ok(())
}

#[tokio::test]
async fn missing_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(scanner().scan_path(&dir.path().join("absent")).await.is_err());
}
