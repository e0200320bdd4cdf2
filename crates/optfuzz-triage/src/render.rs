//! Text rendering of a [`Report`].
//!
//! Color is applied here and nowhere else.

use crate::classify::{Layout, Severity};
use crate::report::Report;
use colored::Colorize;
use std::io::{self, Write};

/// Whether severity labels carry ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Colored labels, emitted even when the output is a pipe or file.
    #[default]
    Ansi,
    /// Plain text.
    Plain,
}

fn label(severity: Severity, mode: ColorMode) -> String {
    let text = severity.label();
    match mode {
        ColorMode::Plain => text.to_string(),
        ColorMode::Ansi => match severity {
            Severity::Pass => text.green().bold().to_string(),
            Severity::Warn => text.yellow().bold().to_string(),
            Severity::Fail => text.red().bold().to_string(),
        },
    }
}

/// Write the report grouped pass, warn, fail.
///
/// # Errors
///
/// Propagates write errors from `out`.
pub fn render<W: Write>(report: &Report, out: &mut W, mode: ColorMode) -> io::Result<()> {
    if mode == ColorMode::Ansi {
        colored::control::set_override(true);
    }

    for severity in Severity::ALL {
        let tag = label(severity, mode);
        for (key, payloads) in report.entries(severity) {
            match report.layout() {
                Layout::Flat => {
                    for payload in payloads {
                        writeln!(out, "[{tag}] {payload}")?;
                    }
                }
                Layout::Keyed => {
                    let joined = payloads.iter().map(String::as_str).collect::<Vec<_>>();
                    writeln!(out, "[{tag}] {key}: {}", joined.join(", "))?;
                }
            }
        }
    }
    Ok(())
}
