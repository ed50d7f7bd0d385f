//! Paced dispatch of rendered messages.
//!
//! A single control flow drives every send in order. Pacing is the whole
//! point: the external submission endpoint is the bottleneck, so there are no
//! concurrent senders. The scheduler blocks on `tokio::time::sleep` between
//! messages (or batches) and nowhere else. It finishes once every message has
//! produced exactly one [`DispatchResult`], success or failure.

pub mod mailer;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{DispatchPolicy, MailSettings};
use crate::template::RenderedMessage;

use self::mailer::{Mailer, OutboundEmail};

/// Outcome of one send attempt. Appended in dispatch order; the aggregate is
/// the campaign's per-recipient report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub recipient: String,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Live progress counters. The scheduler is the only writer; any number of
/// observers may take snapshots without blocking dispatch.
#[derive(Debug)]
pub struct Progress {
    total: usize,
    sent: AtomicUsize,
    started: Instant,
}

/// Point-in-time view of a [`Progress`].
#[derive(Debug, Clone, Copy)]
pub struct ProgressSnapshot {
    pub sent: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Attempts per minute since dispatch started.
    pub fn rate_per_minute(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.sent as f64 / secs * 60.0
    }
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            sent: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    fn record_attempt(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            total: self.total,
            elapsed: self.started.elapsed(),
        }
    }
}

async fn send_one(
    mailer: &dyn Mailer,
    message: &RenderedMessage,
    mail: &MailSettings,
    progress: &Progress,
) -> DispatchResult {
    let outbound = OutboundEmail {
        to_name: &message.display_name,
        to_address: &message.to,
        from_name: &mail.from_name,
        from_address: &mail.from_address,
        subject: &mail.subject,
        body: &message.body,
        priority: mail.priority,
    };

    let outcome = mailer.send(&outbound).await;
    progress.record_attempt();
    let snapshot = progress.snapshot();

    match outcome {
        Ok(()) => {
            info!(
                to = %message.to,
                sent = snapshot.sent,
                total = snapshot.total,
                "dispatch_sent"
            );
            DispatchResult {
                recipient: message.to.clone(),
                succeeded: true,
                error: None,
            }
        }
        Err(e) => {
            warn!(
                to = %message.to,
                sent = snapshot.sent,
                total = snapshot.total,
                error = %e,
                "dispatch_send_failed"
            );
            DispatchResult {
                recipient: message.to.clone(),
                succeeded: false,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Send every message under the pacing policy.
///
/// Non-bulk mode waits the inter-message delay between consecutive sends.
/// Bulk mode sends consecutive batches of `batch_size` back to back, waiting
/// the inter-batch delay between them. Each message is attempted exactly
/// once; a failure is recorded and the run continues.
pub async fn run(
    mailer: &dyn Mailer,
    messages: &[RenderedMessage],
    mail: &MailSettings,
    policy: &DispatchPolicy,
    progress: &Progress,
) -> Vec<DispatchResult> {
    let mut results = Vec::with_capacity(messages.len());

    if policy.bulk {
        let batch_size = policy.batch_size.max(1);
        for (idx, batch) in messages.chunks(batch_size).enumerate() {
            if idx > 0 {
                sleep(policy.batch_delay()).await;
            }
            for message in batch {
                results.push(send_one(mailer, message, mail, progress).await);
            }
        }
    } else {
        for (idx, message) in messages.iter().enumerate() {
            if idx > 0 {
                sleep(policy.message_delay()).await;
            }
            results.push(send_one(mailer, message, mail, progress).await);
        }
    }

    info!(
        total = results.len(),
        failed = results.iter().filter(|r| !r.succeeded).count(),
        "dispatch_completed"
    );
    results
}
