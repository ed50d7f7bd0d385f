//! On-disk per-recipient outcome report.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::campaign::RunSummary;
use crate::dispatch::DispatchResult;
use crate::error::CampaignError;

/// Report file name derived from the subject and the run start time, e.g.
/// `password_audit_20260823_141502.csv`.
pub fn file_name(subject: &str, started_at: DateTime<Utc>) -> String {
    let slug: String = subject
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let slug = slug.trim_matches('_');
    let stamp = started_at.format("%Y%m%d_%H%M%S");
    if slug.is_empty() {
        format!("campaign_{stamp}.csv")
    } else {
        format!("{slug}_{stamp}.csv")
    }
}

fn quote(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write one row per recipient plus a trailing summary comment.
pub fn write(
    path: impl AsRef<Path>,
    results: &[DispatchResult],
    summary: &RunSummary,
) -> Result<(), CampaignError> {
    let path = path.as_ref();
    let mut out = String::from("recipient,status,error\n");
    for result in results {
        let status = if result.succeeded { "sent" } else { "failed" };
        let error = result.error.as_deref().unwrap_or("");
        out.push_str(&format!(
            "{},{},{}\n",
            quote(&result.recipient),
            status,
            quote(error)
        ));
    }
    out.push_str(&format!(
        "# started {} finished {} succeeded {} failed {}\n",
        summary.started_at.to_rfc3339(),
        summary.finished_at.to_rfc3339(),
        summary.succeeded,
        summary.failed
    ));

    fs::write(path, out).map_err(|e| CampaignError::io(path, e))?;
    info!(path = %path.display(), rows = results.len(), "report_written");
    Ok(())
}
