use crate::Result;
use colored::{Color, Colorize};
use dialoguer::{theme::ColorfulTheme, Confirm};
use vmprune_core::{ImageOutcome, RunReport};
use vmprune_utils::{format_elapsed, format_name_list, format_outcome};

/// Table formatting utilities.
///
/// Widths are measured on the plain text; colour is applied after padding.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<(String, Option<Color>)>>,
    max_widths: Vec<usize>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        let max_widths = headers.iter().map(|h| h.chars().count()).collect();
        Self {
            headers,
            rows: Vec::new(),
            max_widths,
        }
    }

    pub fn add_colored_row(&mut self, row: Vec<(String, Option<Color>)>) {
        for (i, (cell, _)) in row.iter().enumerate() {
            if i < self.max_widths.len() {
                self.max_widths[i] = self.max_widths[i].max(cell.chars().count());
            }
        }
        self.rows.push(row);
    }

    pub fn print(&self) {
        self.print_separator('┌', '┬', '┐');
        self.print_header();
        self.print_separator('├', '┼', '┤');

        for row in &self.rows {
            self.print_row(row);
        }

        self.print_separator('└', '┴', '┘');
    }

    fn width(&self, column: usize) -> usize {
        self.max_widths.get(column).copied().unwrap_or(0)
    }

    fn print_separator(&self, left: char, middle: char, right: char) {
        print!("{}", left);
        for (i, &width) in self.max_widths.iter().enumerate() {
            print!("{}", "─".repeat(width + 2));
            if i + 1 < self.max_widths.len() {
                print!("{}", middle);
            }
        }
        println!("{}", right);
    }

    fn print_header(&self) {
        print!("│");
        for (i, header) in self.headers.iter().enumerate() {
            print!(" {} │", pad(header, self.width(i)).bold());
        }
        println!();
    }

    fn print_row(&self, row: &[(String, Option<Color>)]) {
        print!("│");
        for (i, (cell, color)) in row.iter().enumerate() {
            let padded = pad(cell, self.width(i));
            match color {
                Some(color) => print!(" {} │", padded.color(*color)),
                None => print!(" {} │", padded),
            }
        }
        println!();
    }
}

fn pad(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}

/// Print the retention decision before anything is touched
pub fn display_decision(to_delete: &[String], to_keep: &[String]) {
    println!("{} {}", "Delete:".bold(), format_name_list(to_delete));
    println!("{} {}", "Keep:  ".bold(), format_name_list(to_keep));
}

fn outcome_color(outcome: &ImageOutcome) -> Color {
    match outcome {
        ImageOutcome::Deleted => Color::Green,
        ImageOutcome::SkippedNoPool { .. } => Color::Yellow,
        _ => Color::Red,
    }
}

/// Display a finished run
pub fn display_report(report: &RunReport) {
    println!(
        "{} {} ({})",
        "Run".bold(),
        report.run_id,
        format_elapsed(report.started_at, report.finished_at)
    );
    println!("Pattern: {}  Keep: {}", report.pattern, report.keep_count);
    display_decision(&report.to_delete, &report.to_keep);

    if report.dry_run {
        print_info("Dry run, nothing was deleted.");
        return;
    }

    if report.results.is_empty() {
        print_info("Nothing to delete.");
        return;
    }

    let mut table = Table::new(vec![
        "Image".to_string(),
        "Outcome".to_string(),
        "Reason".to_string(),
    ]);
    for result in &report.results {
        table.add_colored_row(vec![
            (result.name.clone(), None),
            (
                format_outcome(&result.outcome),
                Some(outcome_color(&result.outcome)),
            ),
            (result.outcome.reason().unwrap_or("").to_string(), None),
        ]);
    }
    table.print();

    let summary = format!(
        "{} deleted, {} failed",
        report.deleted_count(),
        report.failed_count()
    );
    if report.has_failures() {
        print_warning(&summary);
    } else {
        print_success(&summary);
    }
}

/// Print a report as pretty JSON on stdout
pub fn print_json(report: &RunReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Interactive prompts
pub fn prompt_confirm(message: &str, default: bool) -> Result<bool> {
    let result = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(default)
        .interact()?;

    Ok(result)
}

/// Status messages
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths_ignore_colour() {
        let mut table = Table::new(vec!["Image".to_string(), "Outcome".to_string()]);
        table.add_colored_row(vec![
            ("img-1".to_string(), None),
            ("deletion failed".to_string(), Some(Color::Red)),
        ]);
        table.add_colored_row(vec![
            ("ubuntu-2204-10".to_string(), None),
            ("deleted".to_string(), Some(Color::Green)),
        ]);

        assert_eq!(table.max_widths, vec![14, 15]);
    }

    #[test]
    fn test_pad_counts_characters() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("läuft", 6).chars().count(), 6);
        assert_eq!(pad("too long", 3), "too long");
    }
}
