use std::fs;
use std::path::Path;

use anyhow::Context;

use super::outcome::SummaryRow;

pub const SUMMARY_REPORT_FILE: &str = "summary_report.csv";

/// Writes the batch summary as CSV: one header line, then one line per row
/// in the order given.
pub fn write_summary_report(path: &Path, rows: &[SummaryRow]) -> anyhow::Result<()> {
    let mut out = String::new();
    push_csv_line(&mut out, SummaryRow::HEADERS.iter().copied());
    for row in rows {
        let cells = row.cells();
        push_csv_line(&mut out, cells.iter().map(String::as_str));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, out).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn push_csv_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (idx, cell) in cells.enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&csv_cell(cell));
    }
    out.push_str("\r\n");
}

fn csv_cell(raw: &str) -> String {
    if raw.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
