//! Report rendering for classified records.
//!
//! Two formats: a human-readable aligned table and machine-parsable JSON.
//! Both end with (or carry) the processed/skipped accounting, which is the
//! caller's signal that a batch deadline dropped records.

use serde::Serialize;

use crate::pipeline::PipelineReport;

/// Render the report as an aligned text table plus a summary line.
pub fn format_text(report: &PipelineReport) -> String {
    let headers = ["Site Name", "Lifecycle", "IP", "Port", "Host", "Domain Status"];

    let rows: Vec<[String; 6]> = report
        .records
        .iter()
        .map(|r| {
            [
                r.name.clone(),
                r.lifecycle.to_string(),
                r.ip.clone().unwrap_or_else(|| "-".to_string()),
                r.port.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
                r.host.clone().unwrap_or_else(|| "-".to_string()),
                r.domain_status
                    .as_ref()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: &[String]| {
        let line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    };

    push_row(&headers.iter().map(|h| h.to_string()).collect::<Vec<_>>());
    push_row(&widths.iter().map(|w| "=".repeat(*w)).collect::<Vec<_>>());
    for row in &rows {
        push_row(&row.to_vec());
    }

    out.push('\n');
    out.push_str(&summary_line(report));
    out.push('\n');
    out
}

/// One-line accounting of the run.
pub fn summary_line(report: &PipelineReport) -> String {
    format!(
        "{} records classified ({} parsed, {} unparseable lines dropped, {} skipped by batch deadline)",
        report.records.len(),
        report.parsed,
        report.unparseable,
        report.skipped
    )
}

#[derive(Serialize)]
struct JsonReport<'a> {
    records: &'a [crate::record::Record],
    parsed: usize,
    unparseable: usize,
    skipped: usize,
}

/// Render the report as pretty-printed JSON.
pub fn format_json(report: &PipelineReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        records: &report.records,
        parsed: report.parsed,
        unparseable: report.unparseable,
        skipped: report.skipped,
    })
}
