//! Error taxonomy for the campaign engine.
//!
//! Everything in [`CampaignError`] is fatal and surfaces before dispatch
//! starts. Per-recipient send failures are not errors at this level; they are
//! captured in each recipient's `DispatchResult` and the run continues.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal, pre-dispatch errors. Once dispatch has started, nothing aborts the
/// campaign.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// Invalid campaign configuration (bad URL policy, token length out of
    /// range, zero batch size, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// Unusable input: empty or unreadable target list.
    #[error("input error: {0}")]
    Input(String),

    /// Template source could not be parsed. No message can be produced
    /// without a valid template, so this aborts the run.
    #[error("template error: {0}")]
    Template(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CampaignError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }
}
