// cnshield/src/commands/analyze.rs
//! The `analyze` and `anonymize` commands, including `analyze --file` document scans.
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::{debug, info};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use cnshield_core::{AnalysisStats, Analyzer, AnalyzeOptions, DocumentScanner, ScanReport};

use crate::cli::{AnalyzeCommand, AnonymizeCommand};
use crate::commands::{analyze_options, read_input, warn_msg, AppContext};
use crate::ui::tables;

fn stats_line(stats: &AnalysisStats, findings: usize) -> String {
    let mut line = format!("{} finding(s) in {} chars ({} ms)", findings, stats.input_chars, stats.elapsed_ms);
    if stats.sent_to_verifier > 0 {
        line.push_str(&format!(
            "; verifier: {} confirmed, {} rejected, {} failed, {} skipped",
            stats.verifier_confirmed, stats.verifier_rejected, stats.verifier_failed, stats.verifier_skipped
        ));
    }
    line
}

fn exceeds_threshold(ctx: &AppContext, findings: usize, threshold: Option<usize>) -> bool {
    match threshold {
        Some(threshold) if findings > threshold => {
            warn_msg(format!("{} findings exceed the threshold of {}.", findings, threshold), &ctx.theme);
            true
        }
        _ => false,
    }
}

pub async fn run_analyze(ctx: &AppContext, cmd: &AnalyzeCommand) -> Result<ExitCode> {
    let options = analyze_options(&cmd.input)?;
    if let Some(path) = &cmd.file {
        return run_scan(ctx, cmd, path, options).await;
    }
    let text = read_input(&cmd.input)?;
    let registry = ctx.registry()?;
    let snapshot = registry.snapshot();
    let analyzer = Analyzer::new(registry);

    info!("Starting analysis.");
    let report = analyzer.analyze(&text, &options).await.context("Analysis failed")?;
    debug!("Request {} used snapshot v{}.", report.request_id, report.snapshot_version);

    let stdout = io::stdout();
    let color = stdout.is_terminal();
    let mut out = stdout.lock();
    if cmd.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else if !report.results.is_empty() {
        let table = tables::results_table(
            &text,
            &report.results,
            snapshot.policy(),
            snapshot.settings.anonymizer.filler,
            &ctx.theme,
            color,
        );
        writeln!(out, "{table}")?;
    }

    if report.stats.statistical_skipped {
        warn_msg("The entity extraction model did not run; results are from regex recognizers only.", &ctx.theme);
    }
    ctx.info(stats_line(&report.stats, report.results.len()));

    if exceeds_threshold(ctx, report.results.len(), cmd.fail_over_threshold) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_scan(ctx: &AppContext, cmd: &AnalyzeCommand, path: &Path, options: AnalyzeOptions) -> Result<ExitCode> {
    let analyzer = Analyzer::new(ctx.registry()?);
    let mut scanner = DocumentScanner::new(analyzer).with_options(options);
    if cmd.no_recursive {
        let mut config = scanner.config().clone();
        config.recursive = false;
        scanner = scanner.with_config(config);
    }

    info!("Scanning documents under {}.", path.display());
    let files = scanner
        .scan_path(path)
        .await
        .with_context(|| format!("Failed to scan {}", path.display()))?;
    let report = ScanReport::from_files(files);

    if let Some(report_path) = &cmd.report {
        report
            .save_json(report_path)
            .with_context(|| format!("Failed to write report {}", report_path.display()))?;
        ctx.info(format!("Risk report written to {}", report_path.display()));
    }

    let stdout = io::stdout();
    let color = stdout.is_terminal();
    let mut out = stdout.lock();
    if cmd.json {
        writeln!(out, "{}", report.to_json()?)?;
    } else if report.statistics.total_findings > 0 {
        writeln!(out, "{}", tables::findings_table(&report.files, &ctx.theme, color))?;
        writeln!(out, "{}", tables::risk_table(&report.risk_summaries, &ctx.theme, color))?;
    }

    for failed in report.files.iter().filter(|f| !f.is_ok()) {
        warn_msg(
            format!("Could not scan {}: {}", failed.path, failed.error.as_deref().unwrap_or_default()),
            &ctx.theme,
        );
    }
    let stats = &report.statistics;
    ctx.info(format!(
        "{} finding(s) in {} file(s) ({} failed, {} ms); risk {} ({}/100)",
        stats.total_findings, stats.total_files, stats.failed_files, stats.elapsed_ms, report.risk_level, report.risk_score
    ));

    if exceeds_threshold(ctx, stats.total_findings, cmd.fail_over_threshold) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn run_anonymize(ctx: &AppContext, cmd: &AnonymizeCommand) -> Result<ExitCode> {
    let text = read_input(&cmd.input)?;
    let options = analyze_options(&cmd.input)?;
    let analyzer = Analyzer::new(ctx.registry()?);

    info!("Starting anonymization.");
    let masked = analyzer.anonymize(&text, &options).await.context("Anonymization failed")?;
    debug!(
        "Content masked. Original length: {}, masked length: {}",
        text.len(),
        masked.text.len()
    );

    // Masked text keeps the input's line endings byte for byte.
    let rendered = if cmd.json {
        format!("{}\n", serde_json::to_string_pretty(&masked)?)
    } else {
        masked.text.clone()
    };
    match &cmd.output {
        Some(path) => {
            ctx.info(format!("Writing masked content to file: {}", path.display()));
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write output file {}", path.display()))?;
        }
        None => {
            let mut out = io::stdout().lock();
            out.write_all(rendered.as_bytes())?;
            out.flush()?;
        }
    }

    if !cmd.no_summary && !ctx.quiet && !masked.masked_spans.is_empty() {
        let color = io::stderr().is_terminal();
        let summary = tables::masking_summary(&masked.masked_spans, &ctx.theme, color);
        writeln!(io::stderr(), "{summary}")?;
    }
    Ok(ExitCode::SUCCESS)
}
