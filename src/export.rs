use std::str::FromStr;

use crate::error::Error;
use crate::report::Report;

/// Target byte format for an exported report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    /// Flattened human-readable summary.
    Text,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            // "pdf" is a legacy alias for the flattened text summary.
            "text" | "pdf" => Ok(ExportFormat::Text),
            other => Err(Error::InvalidArgument(format!(
                "unsupported export format: {other} (expected json, csv, or text)"
            ))),
        }
    }
}

/// Serialize a report into the target format.
///
/// Returns `None` when the encoder fails; serialization problems are
/// recoverable and never propagate past this boundary.
pub fn export(report: &Report, format: ExportFormat) -> Option<Vec<u8>> {
    match format {
        ExportFormat::Json => serde_json::to_vec_pretty(report).ok(),
        ExportFormat::Csv => Some(to_csv(report).into_bytes()),
        ExportFormat::Text => Some(to_text(report).into_bytes()),
    }
}

/// Scalar metrics only; sequence and mapping fields are excluded from CSV.
fn to_csv(report: &Report) -> String {
    let mut out = String::from("Metric,Value\n");
    out.push_str(&format!("Total Analyses,{}\n", report.total_analyses));
    out.push_str(&format!("Unique Users,{}\n", report.unique_users));
    out.push_str(&format!(
        "Average Analysis Time,{}\n",
        report.average_analysis_time
    ));
    out
}

fn to_text(report: &Report) -> String {
    format!(
        "Analytics Report\n\
         Timeframe: {}\n\
         Generated: {}\n\
         Total Analyses: {}\n",
        report.timeframe,
        report.generated_at.to_rfc3339(),
        report.total_analyses
    )
}
