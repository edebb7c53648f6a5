//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use jsonui_test::RunReport;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No tests found.");
                return;
            }
            let mut table = new_table();
            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }
            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
    }
}

/// Print every result of a run followed by the totals
pub fn print_report(report: &RunReport, format: OutputFormat) {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
        return;
    }

    let mut table = new_table();
    table.set_header(vec!["Suite", "Case", "Result", "Duration", "Error"]);
    for suite in &report.suites {
        if suite.results.is_empty() {
            table.add_row(vec![
                Cell::new(&suite.suite_name),
                Cell::new("-"),
                Cell::new("filtered").fg(Color::DarkGrey),
                Cell::new("0 ms"),
                Cell::new("platform mismatch"),
            ]);
        }
        for result in &suite.results {
            let status = if result.skipped {
                Cell::new("skipped").fg(Color::Yellow)
            } else if result.passed {
                Cell::new("passed").fg(Color::Green)
            } else {
                Cell::new("failed").fg(Color::Red)
            };
            table.add_row(vec![
                Cell::new(&result.test_name),
                Cell::new(&result.case_name),
                status,
                Cell::new(format!("{} ms", result.duration_ms)),
                Cell::new(result.error.as_deref().unwrap_or("")),
            ]);
        }
    }
    println!("{table}");

    let totals = format!(
        "{} passed, {} failed, {} skipped ({} ms)",
        report.passed(),
        report.failed(),
        report.skipped(),
        report.total_duration_ms
    );
    if report.all_passed() {
        print_success(&totals);
    } else {
        print_error(&totals);
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✅".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "❌".red(), message.red());
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message.yellow());
}
