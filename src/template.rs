//! Message template parsing and per-recipient rendering.
//!
//! Templates are plain text or HTML with single-brace placeholders:
//! `{Name}`, `{URL}`, `{AttackerName}`, `{Custom}`. Parsing happens once, up
//! front, so a broken template aborts the run before anything is sent.
//! Rendering itself cannot fail per recipient; an empty substitution value is
//! logged and rendered as an empty string rather than dropping the message.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::CampaignError;
use crate::roster::{Recipient, Roster};

/// Substitution points a template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Url,
    AttackerName,
    Custom,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Name" => Some(Field::Name),
            "URL" => Some(Field::Url),
            "AttackerName" => Some(Field::AttackerName),
            "Custom" => Some(Field::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Name => "Name",
            Field::Url => "URL",
            Field::AttackerName => "AttackerName",
            Field::Custom => "Custom",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// Campaign-wide values substituted into every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Persona<'a> {
    pub attacker_name: &'a str,
    pub custom: &'a str,
}

/// One message ready for dispatch, paired one-to-one with a recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub to: String,
    pub display_name: String,
    pub body: String,
}

/// A parsed message template.
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template source.
    ///
    /// `{Word}` with an unknown alphanumeric name is a parse error (it is
    /// almost certainly a typo for one of the four fields), and so is an
    /// unterminated placeholder such as `{URL` — shipping the mangled
    /// literal to every recipient is exactly what fail-fast is for. Braces
    /// that do not start a field name at all, such as CSS blocks in an HTML
    /// body, pass through as literal text.
    pub fn parse(source: &str) -> Result<Self, CampaignError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            let (before, after_open) = rest.split_at(open);
            literal.push_str(before);
            let after_open = &after_open[1..];

            let candidate = after_open
                .find('}')
                .map(|close| (&after_open[..close], &after_open[close + 1..]));

            match candidate {
                Some((name, tail)) if name.chars().all(|c| c.is_ascii_alphanumeric()) => {
                    match Field::from_name(name) {
                        Some(field) => {
                            if !literal.is_empty() {
                                segments.push(Segment::Literal(std::mem::take(&mut literal)));
                            }
                            segments.push(Segment::Field(field));
                        }
                        None if name.is_empty() => {
                            literal.push_str("{}");
                        }
                        None => {
                            return Err(CampaignError::Template(format!(
                                "unknown placeholder {{{name}}}"
                            )));
                        }
                    }
                    rest = tail;
                }
                _ => {
                    // An opening brace with no matching close. If what
                    // follows is a field name, this is a broken placeholder,
                    // not incidental text.
                    let run: String = after_open
                        .chars()
                        .take_while(|c| c.is_ascii_alphanumeric())
                        .collect();
                    if Field::from_name(&run).is_some() {
                        return Err(CampaignError::Template(format!(
                            "unterminated placeholder {{{run}"
                        )));
                    }
                    literal.push('{');
                    rest = after_open;
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Read and parse a template file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CampaignError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| CampaignError::io(path, e))?;
        Self::parse(&source)
    }

    /// Render one body for a recipient.
    pub fn render(&self, recipient: &Recipient, persona: Persona<'_>) -> String {
        let mut body = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => body.push_str(text),
                Segment::Field(field) => {
                    let value = match field {
                        Field::Name => recipient.name.as_str(),
                        Field::Url => recipient.url.as_str(),
                        Field::AttackerName => persona.attacker_name,
                        Field::Custom => persona.custom,
                    };
                    if value.is_empty() {
                        warn!(
                            recipient = %recipient.address,
                            field = %field,
                            "empty_substitution_value"
                        );
                    }
                    body.push_str(value);
                }
            }
        }
        body
    }

    /// Fields the template actually references.
    pub fn fields(&self) -> Vec<Field> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Field(f) => Some(*f),
                Segment::Literal(_) => None,
            })
            .collect()
    }
}

/// Render one message per recipient, in roster order.
///
/// The optional signature is appended verbatim to every body. Output order
/// matching roster order is what pairs each body with its address downstream.
pub fn render_all(
    template: &Template,
    roster: &Roster,
    persona: Persona<'_>,
    signature: Option<&str>,
) -> Vec<RenderedMessage> {
    roster
        .iter()
        .map(|recipient| {
            let mut body = template.render(recipient, persona);
            if let Some(signature) = signature {
                body.push_str(signature);
            }
            RenderedMessage {
                to: recipient.address.clone(),
                display_name: recipient.name.clone(),
                body,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{UrlMode, UrlPolicy};

    fn recipient(name: &str, address: &str, url: &str) -> Recipient {
        Recipient {
            name: name.into(),
            address: address.into(),
            url: url.into(),
        }
    }

    #[test]
    fn test_render_substitutes_all_fields() {
        let template =
            Template::parse("Hi {Name}, {Custom}. Visit {URL}. -- {AttackerName}").unwrap();
        let body = template.render(
            &recipient("Alice", "a@x.com", "http://t/1"),
            Persona { attacker_name: "IT Support", custom: "act now" },
        );
        assert_eq!(body, "Hi Alice, act now. Visit http://t/1. -- IT Support");
    }

    #[test]
    fn test_render_all_personalizes_each_body() {
        let template = Template::parse("Hi {Name}, visit {URL}").unwrap();
        let mut roster = Roster::from_pairs([("Alice", "a@x.com"), ("Bob", "b@x.com")]);
        roster
            .assign_urls(&UrlPolicy {
                mode: UrlMode::Single,
                base_link: "http://t/1".into(),
                token_length: 8,
            })
            .unwrap();

        let messages = render_all(&template, &roster, Persona::default(), None);

        let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(
            bodies,
            ["Hi Alice, visit http://t/1", "Hi Bob, visit http://t/1"]
        );
        let to: Vec<&str> = messages.iter().map(|m| m.to.as_str()).collect();
        assert_eq!(to, ["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_render_order_matches_roster_order() {
        let template = Template::parse("{Name}").unwrap();
        let roster = Roster::from_pairs([("C", "c@x"), ("A", "a@x"), ("B", "b@x")]);

        let messages = render_all(&template, &roster, Persona::default(), None);

        let order: Vec<&str> = messages.iter().map(|m| m.display_name.as_str()).collect();
        assert_eq!(order, ["C", "A", "B"]);
        assert_eq!(messages.len(), roster.len());
    }

    #[test]
    fn test_parse_rejects_unknown_placeholder() {
        assert!(matches!(
            Template::parse("Hello {Nmae}"),
            Err(CampaignError::Template(_))
        ));
    }

    #[test]
    fn test_parse_keeps_non_placeholder_braces() {
        let template =
            Template::parse("<style>a { color: red }</style>{Name}").unwrap();
        let body = template.render(
            &recipient("Alice", "a@x.com", ""),
            Persona::default(),
        );
        assert_eq!(body, "<style>a { color: red }</style>Alice");
    }

    #[test]
    fn test_parse_rejects_unterminated_field_placeholder() {
        assert!(matches!(
            Template::parse("Dear {Name, visit {URL}"),
            Err(CampaignError::Template(_))
        ));
        assert!(Template::parse("go to {URL").is_err());
    }

    #[test]
    fn test_parse_keeps_brace_not_starting_a_field() {
        let template = Template::parse("brace { and {Name}").unwrap();
        let body = template.render(&recipient("Bob", "b@x.com", ""), Persona::default());
        assert_eq!(body, "brace { and Bob");
    }

    #[test]
    fn test_empty_field_renders_empty() {
        let template = Template::parse("go to {URL}!").unwrap();
        let body = template.render(&recipient("Bob", "b@x.com", ""), Persona::default());
        assert_eq!(body, "go to !");
    }

    #[test]
    fn test_signature_appended_to_every_body() {
        let template = Template::parse("Hi {Name}").unwrap();
        let roster = Roster::from_pairs([("A", "a@x"), ("B", "b@x")]);

        let messages = render_all(&template, &roster, Persona::default(), Some("<p>sig</p>"));

        assert!(messages.iter().all(|m| m.body.ends_with("<p>sig</p>")));
    }

    #[test]
    fn test_fields_reports_references() {
        let template = Template::parse("{Name} {URL}").unwrap();
        assert_eq!(template.fields(), [Field::Name, Field::Url]);
    }
}
