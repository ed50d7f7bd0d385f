//! Recipient roster and URL assignment.
//!
//! The roster is built once from the target list, keeps its input order, and
//! is the sole owner of recipient state. URL assignment happens exactly once
//! per run; after that the roster is only read.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::config::{UrlMode, UrlPolicy, CHANGE_MARKER};
use crate::error::CampaignError;
use crate::token;

/// A single target: a named address plus its assigned URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub name: String,
    pub address: String,
    /// Empty until `Roster::assign_urls` runs under a policy with a base link.
    pub url: String,
}

/// Ordered, in-memory collection of recipients.
#[derive(Debug, Default)]
pub struct Roster {
    recipients: Vec<Recipient>,
}

impl Roster {
    /// Build a roster from ordered `(name, address)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let recipients = pairs
            .into_iter()
            .map(|(name, address)| Recipient {
                name: name.into(),
                address: address.into(),
                url: String::new(),
            })
            .collect();
        Self { recipients }
    }

    /// Load targets from a two-column `name,address` text file.
    ///
    /// An empty or unreadable file is fatal: the engine needs at least one
    /// recipient to produce a meaningful report.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CampaignError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| CampaignError::io(path, e))?;

        let mut recipients = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            // First two columns are name and address; extra columns in an
            // export are ignored.
            let mut columns = line.split(',');
            let name = columns.next().unwrap_or_default();
            let address = columns.next().ok_or_else(|| {
                CampaignError::Input(format!(
                    "{}:{}: expected `name,address`",
                    path.display(),
                    idx + 1
                ))
            })?;
            recipients.push(Recipient {
                name: name.trim().to_string(),
                address: address.trim().to_string(),
                url: String::new(),
            });
        }

        if recipients.is_empty() {
            return Err(CampaignError::Input(format!(
                "no targets in {}",
                path.display()
            )));
        }

        info!(count = recipients.len(), path = %path.display(), "targets_loaded");
        Ok(Self { recipients })
    }

    /// Assign a URL to every recipient under the given policy.
    ///
    /// Single mode copies the base link verbatim. Generated mode replaces the
    /// `<CHANGE>` marker with a fresh token per recipient; anything after the
    /// marker is dropped, matching the original tool. An empty base link
    /// leaves all URLs empty.
    pub fn assign_urls(&mut self, policy: &UrlPolicy) -> Result<(), CampaignError> {
        if policy.base_link.is_empty() {
            return Ok(());
        }

        match policy.mode {
            UrlMode::Single => {
                for recipient in &mut self.recipients {
                    recipient.url = policy.base_link.clone();
                }
            }
            UrlMode::Generated => {
                let (prefix, suffix) =
                    policy.base_link.split_once(CHANGE_MARKER).ok_or_else(|| {
                        CampaignError::Config(format!(
                            "generated URL mode requires {CHANGE_MARKER} in baseLink"
                        ))
                    })?;
                if !suffix.is_empty() {
                    warn!(suffix = suffix, "url_suffix_after_marker_dropped");
                }
                for recipient in &mut self.recipients {
                    let tok = token::generate(policy.token_length)?;
                    recipient.url = format!("{prefix}{tok}");
                }
            }
        }

        info!(count = self.recipients.len(), mode = ?policy.mode, "urls_assigned");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Recipient> {
        self.recipients.iter()
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a Recipient;
    type IntoIter = std::slice::Iter<'a, Recipient>;

    fn into_iter(self) -> Self::IntoIter {
        self.recipients.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn sample_roster() -> Roster {
        Roster::from_pairs([("Alice", "a@x.com"), ("Bob", "b@x.com"), ("Carol", "c@x.com")])
    }

    #[test]
    fn test_single_mode_same_url_for_all() {
        let mut roster = sample_roster();
        let policy = UrlPolicy {
            mode: UrlMode::Single,
            base_link: "http://t/1".into(),
            token_length: 8,
        };

        roster.assign_urls(&policy).unwrap();

        assert_eq!(roster.len(), 3);
        for recipient in &roster {
            assert_eq!(recipient.url, "http://t/1");
        }
    }

    #[test]
    fn test_generated_mode_prefix_and_length() {
        let mut roster = sample_roster();
        let policy = UrlPolicy {
            mode: UrlMode::Generated,
            base_link: "http://t/?id=<CHANGE>".into(),
            token_length: 4,
        };

        roster.assign_urls(&policy).unwrap();

        for recipient in &roster {
            assert!(recipient.url.starts_with("http://t/?id="));
            assert_eq!(recipient.url.len(), "http://t/?id=".len() + 4);
            let tok = &recipient.url["http://t/?id=".len()..];
            assert!(tok.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_generated_mode_tokens_distinct() {
        let mut roster = Roster::from_pairs(
            (0..32).map(|i| (format!("User {i}"), format!("u{i}@x.com"))),
        );
        let policy = UrlPolicy {
            mode: UrlMode::Generated,
            base_link: "http://t/?id=<CHANGE>".into(),
            token_length: 12,
        };

        roster.assign_urls(&policy).unwrap();

        let urls: HashSet<&str> = roster.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls.len(), 32);
    }

    #[test]
    fn test_generated_mode_drops_suffix_after_marker() {
        let mut roster = sample_roster();
        let policy = UrlPolicy {
            mode: UrlMode::Generated,
            base_link: "http://t/?id=<CHANGE>&src=mail".into(),
            token_length: 6,
        };

        roster.assign_urls(&policy).unwrap();

        for recipient in &roster {
            assert!(!recipient.url.contains("&src=mail"));
            assert_eq!(recipient.url.len(), "http://t/?id=".len() + 6);
        }
    }

    #[test]
    fn test_empty_base_link_leaves_urls_empty() {
        let mut roster = sample_roster();
        roster.assign_urls(&UrlPolicy::default()).unwrap();
        assert!(roster.iter().all(|r| r.url.is_empty()));
    }

    #[test]
    fn test_assignment_preserves_order_and_size() {
        let mut roster = sample_roster();
        let policy = UrlPolicy {
            mode: UrlMode::Single,
            base_link: "http://t/1".into(),
            token_length: 8,
        };
        roster.assign_urls(&policy).unwrap();

        let names: Vec<&str> = roster.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn test_load_ignores_extra_columns() {
        let dir = std::env::temp_dir();
        let path = dir.join("campaigner_wide_targets.csv");
        fs::write(&path, "Alice,a@x.com,https://old/link,extra\n").unwrap();

        let roster = Roster::load(&path).unwrap();
        let recipient = roster.iter().next().unwrap();
        assert_eq!(recipient.name, "Alice");
        assert_eq!(recipient.address, "a@x.com");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_empty_file() {
        let dir = std::env::temp_dir();
        let path = dir.join("campaigner_empty_targets.csv");
        fs::write(&path, "\n\n").unwrap();
        assert!(matches!(Roster::load(&path), Err(CampaignError::Input(_))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_parses_pairs_in_order() {
        let dir = std::env::temp_dir();
        let path = dir.join("campaigner_targets.csv");
        fs::write(&path, "Alice,a@x.com\nBob, b@x.com\n").unwrap();

        let roster = Roster::load(&path).unwrap();
        let pairs: Vec<(&str, &str)> = roster
            .iter()
            .map(|r| (r.name.as_str(), r.address.as_str()))
            .collect();
        assert_eq!(pairs, [("Alice", "a@x.com"), ("Bob", "b@x.com")]);
        let _ = fs::remove_file(&path);
    }
}
