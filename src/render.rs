//! Terminal rendering of model responses.
//!
//! Responses are markdown. When stdout is a terminal the common constructs
//! are styled; otherwise the text is printed as-is.

use crate::error::{Severity, TaiError};
use colored::Colorize;
use std::io::Write;
use tracing::warn;

/// Printed after the last fragment of every response.
pub const SEPARATOR: &str = "---";

pub struct MarkdownRenderer {
    styled: bool,
}

impl MarkdownRenderer {
    pub fn new(styled: bool) -> Self {
        Self { styled }
    }

    /// Style output only for an interactive stdout with `NO_COLOR` unset.
    pub fn for_stdout() -> Self {
        let styled = atty::is(atty::Stream::Stdout) && std::env::var_os("NO_COLOR").is_none();
        Self::new(styled)
    }

    pub fn render(&self, fragment: &str) -> String {
        if !self.styled {
            return fragment.to_string();
        }

        let mut lines = Vec::new();
        let mut in_code_block = false;

        for line in fragment.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") {
                in_code_block = !in_code_block;
                continue;
            }
            if in_code_block {
                lines.push(format!("    {}", line.dimmed()));
                continue;
            }

            if let Some(heading) = heading_text(trimmed) {
                lines.push(heading.bold().cyan().to_string());
            } else if let Some(item) = trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))
            {
                let indent = &line[..line.len() - trimmed.len()];
                lines.push(format!("{}• {}", indent, style_inline(item)));
            } else {
                lines.push(style_inline(line));
            }
        }

        lines.join("\n")
    }
}

/// Text of an ATX heading (`# Title`), if `line` is one.
fn heading_text(line: &str) -> Option<&str> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    line[level..].strip_prefix(' ').map(str::trim)
}

/// Style `**bold**` and `` `code` `` spans. Unclosed markers stay literal.
fn style_inline(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**") {
            if let Some(end) = after.find("**") {
                out.push_str(&after[..end].bold().to_string());
                rest = &after[end + 2..];
                continue;
            }
        }
        if let Some(after) = rest.strip_prefix('`') {
            if let Some(end) = after.find('`') {
                out.push_str(&after[..end].yellow().to_string());
                rest = &after[end + 1..];
                continue;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

/// Print each fragment, then the separator line.
///
/// Output failures do not fail the run; they are logged and skipped.
pub fn print_response<W: Write>(out: &mut W, renderer: &MarkdownRenderer, fragments: &[String]) {
    for fragment in fragments {
        let rendered = renderer.render(fragment);
        skip_best_effort(writeln!(out, "{}", rendered));
    }
    skip_best_effort(writeln!(out, "{}", SEPARATOR));
    skip_best_effort(out.flush());
}

pub(crate) fn skip_best_effort(result: std::io::Result<()>) {
    if let Err(e) = result {
        let err = TaiError::Render(e);
        debug_assert_eq!(err.severity(), Severity::BestEffort);
        warn!("{}", err);
    }
}
