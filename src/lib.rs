//! Campaigner - paced bulk-email campaign engine.
//!
//! Given a target list, a message template, and delivery parameters, the
//! engine renders one personalized message per recipient and submits all of
//! them through an SMTP endpoint under a configurable pacing policy, keeping
//! a per-recipient account of outcomes. Built for authorized
//! phishing-simulation and awareness exercises.
//!
//! ## Pipeline
//!
//! ```text
//! targets.csv → Roster → assign URLs → Template render → paced dispatch → report
//! ```

pub mod campaign;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod report;
pub mod roster;
pub mod template;
pub mod token;

// Re-export commonly used types
pub use campaign::{Campaign, CampaignOutcome, RunSummary};
pub use config::{
    CampaignConfig, DispatchPolicy, MailSettings, Priority, SmtpSettings, TlsMode, UrlMode,
    UrlPolicy,
};
pub use dispatch::mailer::{Mailer, MemoryMailer, OutboundEmail, SmtpMailer, TransportError};
pub use dispatch::{DispatchResult, Progress, ProgressSnapshot};
pub use error::CampaignError;
pub use roster::{Recipient, Roster};
pub use template::{Persona, RenderedMessage, Template};
