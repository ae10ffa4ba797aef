// cnshield/src/ui/tables.rs
//! Table rendering for findings, document scans, rule listings and masking summaries.
//! License: MIT OR APACHE 2.0

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use owo_colors::AnsiColors;
use serde::Serialize;
use std::collections::BTreeMap;

use cnshield_core::{
    mask_value, CandidateSpan, FileReport, MaskedSpan, ResolvedResult, RiskLevel, RiskSummary, RuleDefinition,
    ScoringPolicy,
};

use crate::ui::theme::{color_for, ThemeEntry, ThemeMap};

/// The serde name of a unit enum value, e.g. `"id_card"`.
pub fn serde_label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn to_table_color(color: AnsiColors) -> Color {
    match color {
        AnsiColors::Black => Color::Black,
        AnsiColors::Red => Color::DarkRed,
        AnsiColors::Green => Color::DarkGreen,
        AnsiColors::Yellow => Color::DarkYellow,
        AnsiColors::Blue => Color::DarkBlue,
        AnsiColors::Magenta => Color::DarkMagenta,
        AnsiColors::Cyan => Color::DarkCyan,
        AnsiColors::White => Color::Grey,
        AnsiColors::BrightBlack => Color::DarkGrey,
        AnsiColors::BrightRed => Color::Red,
        AnsiColors::BrightGreen => Color::Green,
        AnsiColors::BrightYellow => Color::Yellow,
        AnsiColors::BrightBlue => Color::Blue,
        AnsiColors::BrightMagenta => Color::Magenta,
        AnsiColors::BrightCyan => Color::Cyan,
        _ => Color::White,
    }
}

struct Styler<'a> {
    theme: &'a ThemeMap,
    color: bool,
}

impl Styler<'_> {
    fn cell(&self, content: impl ToString, entry: ThemeEntry) -> Cell {
        let cell = Cell::new(content);
        if self.color {
            cell.fg(to_table_color(color_for(self.theme, entry)))
        } else {
            cell
        }
    }
}

fn new_table(header: Vec<&str>, styler: &Styler<'_>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.into_iter().map(|h| styler.cell(h, ThemeEntry::Header)).collect::<Vec<_>>());
    table
}

fn slice_chars(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}

/// Findings with their masked values; raw values are never printed.
pub fn results_table(
    text: &str,
    results: &[ResolvedResult],
    policy: &ScoringPolicy,
    filler: char,
    theme: &ThemeMap,
    color: bool,
) -> String {
    let styler = Styler { theme, color };
    let mut table = new_table(vec!["Type", "Span", "Score", "Verified", "Recognizer", "Value"], &styler);
    for r in results {
        let (high, _) = policy.thresholds_for(&r.entity_type);
        let score_entry = if r.score >= high { ThemeEntry::ScoreHigh } else { ThemeEntry::ScoreLow };
        let verified = match (&r.verified, &r.verification_reason) {
            (true, Some(reason)) => format!("yes ({reason})"),
            (true, None) => "yes".to_string(),
            (false, _) => "-".to_string(),
        };
        let masked = mask_value(&r.entity_type, &slice_chars(text, r.start, r.end), filler);
        table.add_row(vec![
            styler.cell(&r.entity_type, ThemeEntry::EntityType),
            Cell::new(format!("{}..{}", r.start, r.end)),
            styler.cell(format!("{:.2}", r.score), score_entry),
            styler.cell(verified, ThemeEntry::Verified),
            Cell::new(&r.recognizer),
            styler.cell(masked, ThemeEntry::Masked),
        ]);
    }
    table.to_string()
}

/// Document findings, one row per finding, located in their source file.
pub fn findings_table(files: &[FileReport], theme: &ThemeMap, color: bool) -> String {
    let styler = Styler { theme, color };
    let mut table = new_table(vec!["File", "Location", "Type", "Score", "Verified", "Value"], &styler);
    for file in files {
        for f in &file.findings {
            table.add_row(vec![
                Cell::new(&file.path),
                Cell::new(&f.location),
                styler.cell(&f.entity_type, ThemeEntry::EntityType),
                styler.cell(format!("{:.2}", f.score), ThemeEntry::ScoreHigh),
                styler.cell(if f.verified { "yes" } else { "-" }, ThemeEntry::Verified),
                styler.cell(&f.masked, ThemeEntry::Masked),
            ]);
        }
    }
    table.to_string()
}

pub fn risk_table(summaries: &[RiskSummary], theme: &ThemeMap, color: bool) -> String {
    let styler = Styler { theme, color };
    let mut table = new_table(vec!["Level", "Type", "Count", "Score", "Files"], &styler);
    for s in summaries {
        let entry = match s.level {
            RiskLevel::Critical | RiskLevel::High => ThemeEntry::Error,
            RiskLevel::Medium => ThemeEntry::Warn,
            RiskLevel::Low => ThemeEntry::Info,
        };
        table.add_row(vec![
            styler.cell(s.level, entry),
            styler.cell(&s.entity_type, ThemeEntry::EntityType),
            Cell::new(s.count),
            Cell::new(s.score),
            Cell::new(s.affected_files.len()),
        ]);
    }
    table.to_string()
}

/// Raw spans from `rules test`. The rule author supplied the text, so the
/// matched value is shown as is.
pub fn candidates_table(spans: &[CandidateSpan], theme: &ThemeMap, color: bool) -> String {
    let styler = Styler { theme, color };
    let mut table = new_table(
        vec!["Pattern", "Span", "Match", "Validation", "Raw", "Score", "Context"],
        &styler,
    );
    for s in spans {
        table.add_row(vec![
            Cell::new(s.pattern_name.as_deref().unwrap_or("-")),
            Cell::new(format!("{}..{}", s.start, s.end)),
            styler.cell(&s.text, ThemeEntry::Masked),
            Cell::new(s.validation.as_ref().map(serde_label).unwrap_or_else(|| "-".to_string())),
            Cell::new(format!("{:.2}", s.raw_score)),
            styler.cell(format!("{:.2}", s.score), ThemeEntry::ScoreHigh),
            Cell::new(s.matched_context_words.join(", ")),
        ]);
    }
    table.to_string()
}

pub fn rules_table(rules: &[RuleDefinition], theme: &ThemeMap, color: bool) -> String {
    let styler = Styler { theme, color };
    let mut table = new_table(vec!["Name", "Type", "Source", "Enabled", "Patterns", "Validator"], &styler);
    for rule in rules {
        let enabled = if rule.enabled {
            styler.cell("yes", ThemeEntry::Success)
        } else {
            styler.cell("no", ThemeEntry::Warn)
        };
        table.add_row(vec![
            Cell::new(&rule.name),
            styler.cell(&rule.entity_type, ThemeEntry::EntityType),
            Cell::new(serde_label(&rule.source)),
            enabled,
            Cell::new(rule.patterns.len()),
            Cell::new(rule.validator.as_ref().map(serde_label).unwrap_or_else(|| "-".to_string())),
        ]);
    }
    table.to_string()
}

/// Masked span counts per entity type.
pub fn masking_summary(spans: &[MaskedSpan], theme: &ThemeMap, color: bool) -> String {
    let styler = Styler { theme, color };
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for span in spans {
        *counts.entry(span.entity_type.to_string()).or_default() += 1;
    }
    let mut table = new_table(vec!["Type", "Masked"], &styler);
    for (entity_type, count) in counts {
        table.add_row(vec![styler.cell(entity_type, ThemeEntry::EntityType), Cell::new(count)]);
    }
    table.to_string()
}
