//! Build progress lines on stdout.

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use crate::build::BuildSummary;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

/// Banner printed before the first page.
pub fn header() {
    println!("\n{}nbsplice{} - Building pages", BOLD, RESET);
    println!("{}", "─".repeat(50));
}

/// Start a page line; finished by [`page_finished`].
pub fn page_started(docname: &str) {
    print!("  {} ... ", docname);
    io::stdout().flush().ok();
}

/// Close a page line.
pub fn page_finished(failed: usize, elapsed: Duration) {
    println!("{}", page_status(failed, elapsed));
}

fn page_status(failed: usize, elapsed: Duration) -> String {
    let ms = elapsed.as_secs_f64() * 1000.0;
    if failed > 0 {
        format!("{}{} directive(s) failed{} ({:.2}ms)", YELLOW, failed, RESET, ms)
    } else {
        format!("{}✓{} ({:.2}ms)", GREEN, RESET, ms)
    }
}

/// Totals line after the last page.
pub fn summary(summary: &BuildSummary, outdir: &Path) {
    println!("\n{}", summary_line(summary, outdir));
}

fn summary_line(summary: &BuildSummary, outdir: &Path) -> String {
    format!(
        "{}{} pages, {} directives, {} failed{} → {}",
        DIM,
        summary.pages,
        summary.directives,
        summary.failed,
        RESET,
        outdir.display()
    )
}
