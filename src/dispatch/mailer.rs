//! Mail submission capability.
//!
//! The scheduler talks to the outside world only through the [`Mailer`]
//! trait: one production implementation over an SMTP session ([`SmtpMailer`])
//! and one in-memory implementation ([`MemoryMailer`]) for tests and dry
//! runs.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::{Priority, SmtpSettings, TlsMode};

/// One message handed to the transport.
#[derive(Debug, Clone, Copy)]
pub struct OutboundEmail<'a> {
    pub to_name: &'a str,
    pub to_address: &'a str,
    pub from_name: &'a str,
    pub from_address: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
    pub priority: Priority,
}

/// Per-message transport failures. These are recorded in the recipient's
/// dispatch result; they never abort the campaign.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not assemble message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp failure: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("recipient rejected: {0}")]
    Rejected(String),
}

/// Mail submission collaborator.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutboundEmail<'_>) -> Result<(), TransportError>;
}

/// `X-Priority` header derived from the configured message priority.
#[derive(Debug, Clone, PartialEq, Eq)]
struct XPriority(Priority);

impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        match s.trim() {
            "1 (Highest)" => Ok(Self(Priority::High)),
            "5 (Lowest)" => Ok(Self(Priority::Low)),
            other => Err(format!("invalid X-Priority value: {other}").into()),
        }
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.header_value().to_string())
    }
}

fn mailbox(name: &str, address: &str) -> Result<Mailbox, TransportError> {
    let address: Address = address.parse()?;
    let name = if name.is_empty() { None } else { Some(name.to_string()) };
    Ok(Mailbox::new(name, address))
}

fn assemble(mail: &OutboundEmail<'_>) -> Result<Message, TransportError> {
    let message = Message::builder()
        .from(mailbox(mail.from_name, mail.from_address)?)
        .to(mailbox(mail.to_name, mail.to_address)?)
        .subject(mail.subject)
        .header(XPriority(mail.priority))
        .header(ContentType::TEXT_HTML)
        .body(mail.body.to_string())?;
    Ok(message)
}

/// Production mailer over a pooled SMTP session. The session is established
/// once and reused for every send in the run; a failed send does not tear the
/// run down and there is no automatic reconnect.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn connect(settings: &SmtpSettings) -> Result<Self, TransportError> {
        let builder = match settings.tls {
            TlsMode::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            }
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?,
            TlsMode::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            }
        };

        let mut builder = builder.port(settings.port);
        if !settings.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }

        Ok(Self { transport: builder.build() })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutboundEmail<'_>) -> Result<(), TransportError> {
        let message = assemble(mail)?;
        self.transport.send(message).await?;
        Ok(())
    }
}

/// A message captured by [`MemoryMailer`].
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Submission instant, on the tokio clock so paced tests can assert gaps.
    pub sent_at: tokio::time::Instant,
}

/// In-memory mailer. Records every accepted message and rejects a
/// configurable set of addresses.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<SentMail>>,
    reject: HashSet<String>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer that fails every send to one of `addresses`.
    pub fn rejecting<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sent: Mutex::new(Vec::new()),
            reject: addresses.into_iter().map(Into::into).collect(),
        }
    }

    /// Everything accepted so far, in submission order.
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: &OutboundEmail<'_>) -> Result<(), TransportError> {
        if self.reject.contains(mail.to_address) {
            return Err(TransportError::Rejected(mail.to_address.to_string()));
        }
        self.sent.lock().expect("mailer lock poisoned").push(SentMail {
            to: mail.to_address.to_string(),
            subject: mail.subject.to_string(),
            body: mail.body.to_string(),
            sent_at: tokio::time::Instant::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outbound<'a>(to: &'a str) -> OutboundEmail<'a> {
        OutboundEmail {
            to_name: "Target",
            to_address: to,
            from_name: "IT Support",
            from_address: "it@example.com",
            subject: "Audit",
            body: "<p>hello</p>",
            priority: Priority::Low,
        }
    }

    #[tokio::test]
    async fn test_memory_mailer_records_sends() {
        let mailer = MemoryMailer::new();
        mailer.send(&outbound("a@x.com")).await.unwrap();
        mailer.send(&outbound("b@x.com")).await.unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "a@x.com");
        assert_eq!(sent[1].to, "b@x.com");
    }

    #[tokio::test]
    async fn test_memory_mailer_rejects_configured_addresses() {
        let mailer = MemoryMailer::rejecting(["bad@x.com"]);
        assert!(mailer.send(&outbound("bad@x.com")).await.is_err());
        mailer.send(&outbound("good@x.com")).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }

    #[test]
    fn test_assemble_builds_message() {
        let message = assemble(&outbound("a@x.com")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("a@x.com"));
        assert!(raw.contains("Subject: Audit"));
        assert!(raw.contains("X-Priority: 5 (Lowest)"));
    }

    #[test]
    fn test_assemble_rejects_bad_address() {
        let mut mail = outbound("not-an-address");
        mail.to_address = "not an address";
        assert!(matches!(assemble(&mail), Err(TransportError::Address(_))));
    }
}
