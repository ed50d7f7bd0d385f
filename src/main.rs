//! Campaigner binary - runs one campaign from a JSON config file.
//!
//! Usage: `campaigner [campaign.json]`. SMTP settings come from the file the
//! config points at (default `smtp.json`). Fatal errors abort before anything
//! is sent; per-recipient failures show up only in the report and the logs.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use campaigner::{report, Campaign, CampaignConfig, SmtpMailer, SmtpSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "campaign.json".to_string());
    let config = CampaignConfig::load(&config_path)
        .with_context(|| format!("loading campaign config {config_path}"))?;

    let smtp_path = config
        .smtp_config
        .clone()
        .unwrap_or_else(|| PathBuf::from("smtp.json"));
    let smtp = SmtpSettings::load(&smtp_path)
        .with_context(|| format!("loading SMTP settings {}", smtp_path.display()))?;
    let mailer = SmtpMailer::connect(&smtp).context("building SMTP transport")?;

    tracing::info!(
        config = %config_path,
        smtp_host = %smtp.host,
        targets = %config.targets.display(),
        "campaigner_starting"
    );

    let report_name = config.report.clone();
    let campaign = Campaign::prepare(config).context("preparing campaign")?;

    // Periodic progress reporter; dispatch never blocks on it.
    let progress = campaign.progress();
    let reporter = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        interval.tick().await;
        loop {
            interval.tick().await;
            let snapshot = progress.snapshot();
            tracing::info!(
                sent = snapshot.sent,
                total = snapshot.total,
                elapsed_secs = snapshot.elapsed.as_secs(),
                rate_per_min = format!("{:.1}", snapshot.rate_per_minute()),
                "campaign_progress"
            );
            if snapshot.sent >= snapshot.total {
                break;
            }
        }
    });

    let outcome = campaign.run(&mailer).await;
    reporter.abort();

    let report_path = report_name.unwrap_or_else(|| {
        report::file_name(&campaign.config().mail.subject, outcome.summary.started_at)
    });
    report::write(&report_path, &outcome.results, &outcome.summary)
        .context("writing report")?;

    tracing::info!(
        succeeded = outcome.summary.succeeded,
        failed = outcome.summary.failed,
        report = %report_path,
        "campaigner_finished"
    );

    Ok(())
}
