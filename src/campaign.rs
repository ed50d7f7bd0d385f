//! Campaign orchestration.
//!
//! The run is pure sequencing: load targets, assign URLs, parse the template,
//! render every message, dispatch, summarize. Each phase must complete before
//! the next starts; the downstream components rely on that ordering.

use std::fs;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::CampaignConfig;
use crate::dispatch::{self, mailer::Mailer, DispatchResult, Progress};
use crate::error::CampaignError;
use crate::roster::Roster;
use crate::template::{render_all, Field, Persona, Template};

/// Overall outcome of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Per-recipient results plus the run summary.
#[derive(Debug)]
pub struct CampaignOutcome {
    pub results: Vec<DispatchResult>,
    pub summary: RunSummary,
}

/// One execution of the engine over a fixed roster and template.
pub struct Campaign {
    config: CampaignConfig,
    roster: Roster,
    template: Template,
    signature: Option<String>,
    progress: Arc<Progress>,
}

impl Campaign {
    /// Load and validate everything the run needs. All fatal conditions
    /// (bad config, unreadable targets or template, empty roster) surface
    /// here, before anything is sent.
    pub fn prepare(config: CampaignConfig) -> Result<Self, CampaignError> {
        let roster = Roster::load(&config.targets)?;
        let template = Template::load(&config.template)?;
        let signature = config
            .mail
            .signature
            .as_ref()
            .map(|path| fs::read_to_string(path).map_err(|e| CampaignError::io(path, e)))
            .transpose()?;

        let mut campaign = Self::from_parts(config, roster, template)?;
        campaign.signature = signature;
        Ok(campaign)
    }

    /// Assemble a campaign from already-loaded parts. URL assignment happens
    /// here, exactly once.
    pub fn from_parts(
        config: CampaignConfig,
        mut roster: Roster,
        template: Template,
    ) -> Result<Self, CampaignError> {
        config.validate()?;
        if roster.is_empty() {
            return Err(CampaignError::Input("recipient list is empty".into()));
        }
        roster.assign_urls(&config.url)?;

        // Referenced persona fields the config leaves blank render as empty
        // strings; flag them before anything goes out.
        for field in template.fields() {
            let unset = match field {
                Field::AttackerName => config.attacker_name.is_empty(),
                Field::Custom => config.custom.is_empty(),
                Field::Name | Field::Url => false,
            };
            if unset {
                warn!(field = %field, "template_field_unset_in_config");
            }
        }

        let progress = Arc::new(Progress::new(roster.len()));
        Ok(Self {
            config,
            roster,
            template,
            signature: None,
            progress,
        })
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Shared progress counters, for an external reporter.
    pub fn progress(&self) -> Arc<Progress> {
        Arc::clone(&self.progress)
    }

    /// Render every message and dispatch the lot. Individual send failures
    /// end up in the results, never here.
    pub async fn run(&self, mailer: &dyn Mailer) -> CampaignOutcome {
        let started_at = Utc::now();
        info!(
            recipients = self.roster.len(),
            subject = %self.config.mail.subject,
            bulk = self.config.dispatch.bulk,
            "campaign_started"
        );

        let persona = Persona {
            attacker_name: &self.config.attacker_name,
            custom: &self.config.custom,
        };
        let messages = render_all(
            &self.template,
            &self.roster,
            persona,
            self.signature.as_deref(),
        );

        let results = dispatch::run(
            mailer,
            &messages,
            &self.config.mail,
            &self.config.dispatch,
            &self.progress,
        )
        .await;

        let succeeded = results.iter().filter(|r| r.succeeded).count();
        let failed = results.len() - succeeded;
        let finished_at = Utc::now();

        info!(
            succeeded = succeeded,
            failed = failed,
            elapsed_secs = (finished_at - started_at).num_seconds(),
            "campaign_completed"
        );

        CampaignOutcome {
            results,
            summary: RunSummary {
                started_at,
                finished_at,
                succeeded,
                failed,
            },
        }
    }
}
