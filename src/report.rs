use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::RenderError;
use crate::gpa::format_gpa;
use crate::grades;
use crate::models::{ClassRecord, GpaSummary, MarkingPeriod};

pub const PAGE_BREAK: &str = "\u{000C}";
const COLUMNS: [&str; 5] = ["Class Name", "Letter Grade", "Credits", "Course Type", "Grade GPA"];

/// Everything the renderer reads; borrowed from the roster, never mutated.
pub struct ReportInput<'a> {
    pub username: &'a str,
    pub periods: &'a [MarkingPeriod],
    pub gpa: GpaSummary,
    pub generated_at: DateTime<Utc>,
    pub rows_per_page: usize,
}

fn table_header(output: &mut String) {
    let _ = writeln!(output, "| {} |", COLUMNS.join(" | "));
    let _ = writeln!(output, "|{}", "---|".repeat(COLUMNS.len()));
}

fn table_row(output: &mut String, record: &ClassRecord) {
    let _ = writeln!(
        output,
        "| {} | {} | {} | {} | {:.2} |",
        record.name,
        record.grade,
        record.credits,
        record.track,
        grades::resolve(record.grade, record.track)
    );
}

/// Lays out page bodies: one or more pages per marking period, header on the first.
fn page_bodies(input: &ReportInput<'_>) -> Vec<String> {
    let rows_per_page = input.rows_per_page.max(1);
    let mut pages = Vec::new();

    for (index, period) in input.periods.iter().enumerate() {
        let mut page = String::new();
        if index == 0 {
            let _ = writeln!(page, "# GPA Report for {}", input.username);
            let _ = writeln!(page, "Generated {}", input.generated_at.date_naive());
            let _ = writeln!(page);
            let _ = writeln!(page, "- Weighted GPA: {}", format_gpa(input.gpa.weighted));
            let _ = writeln!(page, "- Unweighted GPA: {}", format_gpa(input.gpa.unweighted));
            let _ = writeln!(page);
        }
        let _ = writeln!(page, "## Marking Period {}", period.ordinal);
        let _ = writeln!(page);

        if period.classes.is_empty() {
            let _ = writeln!(page, "No classes recorded for this marking period.");
            pages.push(page);
            continue;
        }

        let mut chunks = period.classes.chunks(rows_per_page).peekable();
        while let Some(chunk) = chunks.next() {
            table_header(&mut page);
            for record in chunk {
                table_row(&mut page, record);
            }
            pages.push(std::mem::take(&mut page));
            if chunks.peek().is_some() {
                let _ = writeln!(page, "## Marking Period {} (continued)", period.ordinal);
                let _ = writeln!(page);
            }
        }
    }

    pages
}

pub fn build_report(input: &ReportInput<'_>) -> String {
    let bodies = page_bodies(input);
    let page_count = bodies.len();
    let stamp = input.generated_at.format("%Y-%m-%d %H:%M:%S UTC");

    let mut output = String::new();
    for (index, body) in bodies.into_iter().enumerate() {
        if index > 0 {
            let _ = writeln!(output, "{PAGE_BREAK}");
        }
        output.push_str(&body);
        let _ = writeln!(output);
        let _ = writeln!(output, "---");
        let _ = writeln!(output, "Generated by GPA Tracker on {stamp}");
        let _ = writeln!(output, "Page {} of {}", index + 1, page_count);
    }
    output
}

/// Writes the report under `dir` and returns its path as the document reference.
pub fn render_to_dir(input: &ReportInput<'_>, dir: &Path) -> Result<PathBuf, RenderError> {
    let file_name = format!(
        "{}-gpa-report-{}.md",
        input.username,
        input.generated_at.format("%Y%m%dT%H%M%S")
    );
    render_to_file(input, &dir.join(file_name))
}

pub fn render_to_file(input: &ReportInput<'_>, path: &Path) -> Result<PathBuf, RenderError> {
    let write_err = |source: std::io::Error| RenderError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, build_report(input)).map_err(write_err)?;

    info!(path = %path.display(), periods = input.periods.len(), "report rendered");
    Ok(path.to_path_buf())
}
