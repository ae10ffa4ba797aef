// cnshield/src/ui/output_format.rs
//! Prefixed, optionally colored status messages for stderr.
//! License: MIT OR APACHE 2.0

use anyhow::Result;
use owo_colors::OwoColorize;
use std::io::Write;

use crate::ui::theme::{color_for, ThemeEntry, ThemeMap};

fn print_message<W: Write>(
    writer: &mut W,
    prefix: &str,
    msg: &str,
    entry: ThemeEntry,
    theme: &ThemeMap,
    supports_color: bool,
) -> Result<()> {
    let line = format!("{prefix} {msg}");
    if supports_color {
        writeln!(writer, "{}", line.color(color_for(theme, entry)))?;
    } else {
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

pub fn print_info_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> Result<()> {
    print_message(writer, "[cnshield]", msg, ThemeEntry::Info, theme, supports_color)
}

pub fn print_success_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> Result<()> {
    print_message(writer, "[cnshield]", msg, ThemeEntry::Success, theme, supports_color)
}

pub fn print_warn_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> Result<()> {
    print_message(writer, "[cnshield] WARN:", msg, ThemeEntry::Warn, theme, supports_color)
}

pub fn print_error_message<W: Write>(writer: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> Result<()> {
    print_message(writer, "[cnshield] ERROR:", msg, ThemeEntry::Error, theme, supports_color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::theme::ThemeStyle;

    #[test]
    fn plain_output_has_no_escapes() {
        let theme = ThemeStyle::default_theme_map();
        let mut out = Vec::new();
        print_warn_message(&mut out, "slow verifier", &theme, false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[cnshield] WARN: slow verifier\n");

        let mut out = Vec::new();
        print_error_message(&mut out, "boom", &theme, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\u{1b}["));
        assert!(text.contains("[cnshield] ERROR: boom"));
    }
}
