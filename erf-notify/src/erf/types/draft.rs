//! Composed email awaiting preview or send

use serde::{Deserialize, Serialize};

/// Body content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    #[default]
    Text,
    Html,
}

impl std::fmt::Display for BodyFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodyFormat::Text => write!(f, "text"),
            BodyFormat::Html => write!(f, "html"),
        }
    }
}

/// Recipient of a draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "address", rename_all = "snake_case")]
pub enum Recipient {
    /// Resolved email address
    Address(String),
    /// No address could be found for the requester; never sent
    Unresolved,
}

impl Recipient {
    pub fn address(&self) -> Option<&str> {
        match self {
            Recipient::Address(a) => Some(a),
            Recipient::Unresolved => None,
        }
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recipient::Address(a) => write!(f, "{}", a),
            Recipient::Unresolved => write!(f, "(unresolved)"),
        }
    }
}

/// One email built from exactly one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Draft {
    pub requester: String,
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
    pub format: BodyFormat,
    pub item_count: usize,
}

impl Draft {
    /// First `max_chars` characters of the body, with an ellipsis when cut
    pub fn body_excerpt(&self, max_chars: usize) -> String {
        if self.body.chars().count() <= max_chars {
            return self.body.clone();
        }
        let mut cut: String = self.body.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    }

    /// Copy of this draft addressed to a demo recipient, with a banner
    /// naming the requester and the address it would really go to.
    pub fn as_demo(&self, test_recipient: &str) -> Draft {
        let resolved = self
            .recipient
            .address()
            .unwrap_or("Email not found")
            .to_string();

        let subject = format!(
            "[DEMO] ERF Status for {} - {} Items",
            self.requester, self.item_count
        );

        let body = match self.format {
            BodyFormat::Text => format!(
                "THIS IS A DEMO EMAIL\n\
                 ============================================================\n\n\
                 Original Recipient: {}\n\
                 Resolved Email: {}\n\
                 Items: {}\n\
                 Demo sent to: {}\n\n\
                 {}\n\n\
                 ============================================================\n\
                 END OF DEMO EMAIL - Original would go to: {}\n",
                self.requester, resolved, self.item_count, test_recipient, self.body, resolved
            ),
            BodyFormat::Html => format!(
                "<div style=\"border: 2px dashed #f39c12; padding: 10px; margin-bottom: 20px;\">\
                 <h3>THIS IS A DEMO EMAIL</h3>\
                 <p>Original Recipient: {}<br>Resolved Email: {}<br>Items: {}<br>Demo sent to: {}</p>\
                 </div>\n{}\n<p><em>END OF DEMO EMAIL - Original would go to: {}</em></p>\n",
                self.requester, resolved, self.item_count, test_recipient, self.body, resolved
            ),
        };

        Draft {
            requester: self.requester.clone(),
            recipient: Recipient::Address(test_recipient.to_string()),
            subject,
            body,
            format: self.format,
            item_count: self.item_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(body: &str) -> Draft {
        Draft {
            requester: "JSMITH".to_string(),
            recipient: Recipient::Address("john.smith@example.com".to_string()),
            subject: "ERF Status Update - 2 Items".to_string(),
            body: body.to_string(),
            format: BodyFormat::Text,
            item_count: 2,
        }
    }

    #[test]
    fn test_body_excerpt() {
        let d = draft("abcdef");
        assert_eq!(d.body_excerpt(10), "abcdef");
        assert_eq!(d.body_excerpt(3), "abc...");
    }

    #[test]
    fn test_as_demo_redirects() {
        let d = draft("items here");
        let demo = d.as_demo("manager@example.com");
        assert_eq!(
            demo.recipient,
            Recipient::Address("manager@example.com".to_string())
        );
        assert_eq!(demo.subject, "[DEMO] ERF Status for JSMITH - 2 Items");
        assert!(demo.body.contains("items here"));
        assert!(demo.body.contains("Original would go to: john.smith@example.com"));
    }

    #[test]
    fn test_as_demo_unresolved() {
        let mut d = draft("x");
        d.recipient = Recipient::Unresolved;
        let demo = d.as_demo("manager@example.com");
        assert!(demo.body.contains("Resolved Email: Email not found"));
    }
}
