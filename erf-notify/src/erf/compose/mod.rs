//! Email composition
//!
//! Turns one requester group into one [`Draft`]. Subject, body, per-item
//! line and per-status summary line are each a [`Renderer`]; configured
//! templates are parsed once up front, tests can pass closures instead.

pub mod format;

use chrono::NaiveDateTime;

use crate::config::TemplateConfig;
use crate::erf::{BodyFormat, Draft, Group, Recipient, Value};
use crate::error::ConfigError;
use format::{Context, FormatTemplate, RenderError, evaluate, parse_template};

/// Renders a context into text
pub trait Renderer {
    fn render(&self, ctx: &Context) -> Result<String, RenderError>;
}

impl Renderer for FormatTemplate {
    fn render(&self, ctx: &Context) -> Result<String, RenderError> {
        evaluate(self, ctx)
    }
}

impl<F> Renderer for F
where
    F: Fn(&Context) -> Result<String, RenderError>,
{
    fn render(&self, ctx: &Context) -> Result<String, RenderError> {
        self(ctx)
    }
}

/// The four renderers a composer needs
pub struct Renderers {
    pub subject: Box<dyn Renderer>,
    pub body: Box<dyn Renderer>,
    pub item: Box<dyn Renderer>,
    pub summary_line: Box<dyn Renderer>,
}

impl Renderers {
    /// Parse the configured templates
    pub fn from_config(templates: &TemplateConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            subject: Box::new(parse("subject", &templates.subject)?),
            body: Box::new(parse("body", templates.body_source())?),
            item: Box::new(parse("item", templates.item_source())?),
            summary_line: Box::new(parse("summary_line", &templates.summary_line)?),
        })
    }
}

fn parse(name: &str, source: &str) -> Result<FormatTemplate, ConfigError> {
    parse_template(source).map_err(|source| ConfigError::Template {
        name: name.to_string(),
        source,
    })
}

pub struct Composer {
    renderers: Renderers,
    format: BodyFormat,
    item_separator: String,
    target_statuses: Vec<String>,
    generated_at: NaiveDateTime,
}

impl Composer {
    pub fn new(
        renderers: Renderers,
        format: BodyFormat,
        target_statuses: Vec<String>,
        generated_at: NaiveDateTime,
    ) -> Self {
        Self {
            renderers,
            format,
            item_separator: "\n".to_string(),
            target_statuses,
            generated_at,
        }
    }

    /// Build from configuration, failing on any template parse error
    pub fn from_config(
        templates: &TemplateConfig,
        target_statuses: &[String],
        generated_at: NaiveDateTime,
    ) -> Result<Self, ConfigError> {
        let renderers = Renderers::from_config(templates)?;
        Ok(Self::new(
            renderers,
            templates.format,
            target_statuses.to_vec(),
            generated_at,
        )
        .with_item_separator(&templates.item_separator))
    }

    pub fn with_item_separator(mut self, separator: &str) -> Self {
        self.item_separator = separator.to_string();
        self
    }

    /// Compose the draft for one group
    pub fn compose(&self, group: &Group, recipient: Recipient) -> Result<Draft, RenderError> {
        let mut items = Vec::with_capacity(group.len());
        for (i, record) in group.records.iter().enumerate() {
            let mut ctx: Context = record.fields().into_iter().collect();
            ctx.insert("index", i + 1);
            self.escape(&mut ctx);
            items.push(self.renderers.item.render(&ctx)?);
        }

        let mut summary = Vec::new();
        for status in &self.target_statuses {
            let count = group.count_status(status);
            if count == 0 {
                continue;
            }
            let mut ctx = Context::new()
                .with("status", status.as_str())
                .with("count", count);
            self.escape(&mut ctx);
            summary.push(self.renderers.summary_line.render(&ctx)?);
        }

        let mut ctx = Context::new()
            .with("requester", group.requester.as_str())
            .with("recipient", recipient.address().unwrap_or_default())
            .with("item_count", group.len())
            .with("generated_at", Value::DateTime(self.generated_at));
        // The subject header is plain text in both formats
        let subject = self.renderers.subject.render(&ctx)?;

        self.escape(&mut ctx);
        // Already rendered (and escaped) pieces go in after escaping
        ctx.insert("items", items.join(&self.item_separator));
        ctx.insert("summary", summary.join("\n"));
        let body = self.renderers.body.render(&ctx)?;

        log::debug!(
            "Composed draft for {} ({} items, {})",
            group.requester,
            group.len(),
            self.format
        );

        Ok(Draft {
            requester: group.requester.clone(),
            recipient,
            subject: subject.trim().to_string(),
            body,
            format: self.format,
            item_count: group.len(),
        })
    }

    fn escape(&self, ctx: &mut Context) {
        if self.format == BodyFormat::Html {
            ctx.map_strings(html_escape);
        }
    }
}

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erf::test_support::record;
    use chrono::NaiveDate;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 11)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    fn targets() -> Vec<String> {
        vec!["On order".to_string(), "Received".to_string()]
    }

    fn group() -> Group {
        Group {
            requester: "JSMITH".to_string(),
            records: vec![
                record(2, "JSMITH", "On order", "Pump"),
                record(5, "jsmith", "Received", "Valve"),
                record(9, "JSMITH", "On order", "Gasket"),
            ],
        }
    }

    fn composer(format: BodyFormat) -> Composer {
        let templates = TemplateConfig {
            format,
            ..TemplateConfig::default()
        };
        Composer::from_config(&templates, &targets(), generated_at()).unwrap()
    }

    #[test]
    fn test_every_record_rendered_once_in_order() {
        let draft = composer(BodyFormat::Text)
            .compose(&group(), Recipient::Address("j@example.com".to_string()))
            .unwrap();

        for item in ["Pump", "Valve", "Gasket"] {
            assert_eq!(draft.body.matches(item).count(), 1, "{}", item);
        }
        let pump = draft.body.find("Pump").unwrap();
        let valve = draft.body.find("Valve").unwrap();
        let gasket = draft.body.find("Gasket").unwrap();
        assert!(pump < valve && valve < gasket);

        assert_eq!(draft.subject, "ERF Status Update - 3 Items");
        assert_eq!(draft.item_count, 3);
        assert!(draft.body.contains("Hello JSMITH,"));
        assert!(draft.body.contains("• Items On order: 2"));
        assert!(draft.body.contains("• Items Received: 1"));
        assert!(draft.body.contains("1. ERF ERF-2"));
        assert!(draft.body.contains("3. ERF ERF-9"));
        assert!(draft.body.contains("generated on 2025-09-11 08:30:00"));
    }

    #[test]
    fn test_summary_skips_absent_statuses() {
        let g = Group {
            requester: "A".to_string(),
            records: vec![record(2, "A", "Received", "Valve")],
        };
        let draft = composer(BodyFormat::Text)
            .compose(&g, Recipient::Unresolved)
            .unwrap();
        assert!(!draft.body.contains("Items On order"));
        assert_eq!(draft.recipient, Recipient::Unresolved);
    }

    #[test]
    fn test_html_escapes_record_values() {
        let mut g = group();
        g.records[0].item = Some("<Pump & Co>".to_string());
        let draft = composer(BodyFormat::Html)
            .compose(&g, Recipient::Address("j@example.com".to_string()))
            .unwrap();

        assert_eq!(draft.format, BodyFormat::Html);
        assert!(draft.body.contains("&lt;Pump &amp; Co&gt;"));
        assert!(!draft.body.contains("<Pump"));
        // Received rows are highlighted green, others amber
        assert_eq!(draft.body.matches("#D4EDDA").count(), 1);
        assert_eq!(draft.body.matches("#FFF3CD").count(), 2);
        assert!(draft.body.contains("<tbody>"));
    }

    #[test]
    fn test_html_highlight_ignores_status_case() {
        let g = Group {
            requester: "A".to_string(),
            records: vec![
                record(2, "A", "RECEIVED", "Pump"),
                record(3, "A", "on order", "Valve"),
            ],
        };
        let draft = composer(BodyFormat::Html)
            .compose(&g, Recipient::Address("a@example.com".to_string()))
            .unwrap();

        assert_eq!(draft.body.matches("#D4EDDA").count(), 1);
        assert_eq!(draft.body.matches("#FFF3CD").count(), 1);
    }

    fn boxed<F>(f: F) -> Box<dyn Renderer>
    where
        F: Fn(&Context) -> Result<String, RenderError> + 'static,
    {
        Box::new(f)
    }

    #[test]
    fn test_closure_renderers() {
        let renderers = Renderers {
            subject: boxed(|ctx| Ok(format!("{} items", ctx.get("item_count")))),
            body: boxed(|ctx| Ok(ctx.get("items").to_string())),
            item: boxed(|ctx| Ok(format!("{}:{}", ctx.get("index"), ctx.get("item")))),
            summary_line: boxed(|_| Ok(String::new())),
        };
        let draft = Composer::new(renderers, BodyFormat::Text, targets(), generated_at())
            .with_item_separator(";")
            .compose(&group(), Recipient::Unresolved)
            .unwrap();

        assert_eq!(draft.subject, "3 items");
        assert_eq!(draft.body, "1:Pump;2:Valve;3:Gasket");
    }

    #[test]
    fn test_render_error_propagates() {
        let renderers = Renderers {
            subject: boxed(|_| Ok("s".to_string())),
            body: boxed(|_| Ok("b".to_string())),
            item: boxed(|_| {
                Err(RenderError {
                    message: "boom".to_string(),
                })
            }),
            summary_line: boxed(|_| Ok(String::new())),
        };
        let composer = Composer::new(renderers, BodyFormat::Text, targets(), generated_at());
        let err = composer.compose(&group(), Recipient::Unresolved).unwrap_err();
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_bad_template_is_config_error() {
        let templates = TemplateConfig {
            subject: "ERF ${item_count".to_string(),
            ..TemplateConfig::default()
        };
        let err = Composer::from_config(&templates, &targets(), generated_at()).err();
        match err {
            Some(ConfigError::Template { name, .. }) => assert_eq!(name, "subject"),
            other => panic!("expected template error, got {:?}", other),
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&#39;");
    }
}
