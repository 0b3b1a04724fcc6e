//! Preview / confirm / send gate
//!
//! Drafts always go through preview first. Nothing reaches the mail client
//! until a [`Confirmer`] has said yes, and drafts without an address never
//! do.

use std::fmt;

use anyhow::{Result, bail};
use colored::*;
use is_terminal::IsTerminal;
use serde::Serialize;

use super::mailer::MailClient;
use crate::erf::{Draft, Recipient};
use crate::error::GateError;

/// Phrase that must be typed to send to real requesters
pub const LIVE_PHRASE: &str = "SEND LIVE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Show drafts, send nothing
    Preview,
    /// Send to the resolved requesters
    Send,
    /// Send re-wrapped drafts to test recipients
    Demo,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Preview => write!(f, "preview"),
            Mode::Send => write!(f, "live"),
            Mode::Demo => write!(f, "demo"),
        }
    }
}

/// What the user is asked to approve
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmRequest {
    pub mode: Mode,
    /// Messages that will be handed to the mail client
    pub to_send: usize,
    /// Drafts skipped for lack of an address
    pub unresolved: usize,
    /// Demo only
    pub test_recipients: Vec<String>,
}

impl fmt::Display for ConfirmRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Mode::Demo => write!(
                f,
                "Send {} demo emails to {}?",
                self.to_send,
                self.test_recipients.join(", ")
            ),
            _ => write!(
                f,
                "Send {} emails to resolved addresses ({} unresolved will be skipped)?",
                self.to_send, self.unresolved
            ),
        }
    }
}

/// Decides whether a previewed batch may be sent
pub trait Confirmer {
    fn confirm(&mut self, request: &ConfirmRequest) -> Result<bool>;
}

/// Confirms without asking (`--yes`)
pub struct AutoConfirm;

impl Confirmer for AutoConfirm {
    fn confirm(&mut self, request: &ConfirmRequest) -> Result<bool> {
        log::info!("Confirmed by --yes: {}", request);
        Ok(true)
    }
}

/// Asks on the terminal: y/n for demo sends, the typed phrase for live ones
pub struct PromptConfirm;

impl Confirmer for PromptConfirm {
    fn confirm(&mut self, request: &ConfirmRequest) -> Result<bool> {
        if !std::io::stdin().is_terminal() {
            bail!("Confirmation needs an interactive terminal; pass --yes to send without asking");
        }

        match request.mode {
            Mode::Send => {
                eprintln!();
                eprintln!("{}", "FINAL CONFIRMATION".yellow().bold());
                eprintln!("{}", request);
                let typed: String = dialoguer::Input::new()
                    .with_prompt(format!("Type '{}' to confirm", LIVE_PHRASE))
                    .allow_empty(true)
                    .interact_text()?;
                Ok(typed.trim() == LIVE_PHRASE)
            }
            _ => Ok(dialoguer::Confirm::new()
                .with_prompt(request.to_string())
                .default(false)
                .interact()?),
        }
    }
}

/// Outcome of one dispatch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchReport {
    /// Drafts shown as "would send"
    pub previewed: usize,
    pub sent: usize,
    pub failed: usize,
    pub unresolved: usize,
    pub declined: bool,
    /// (recipient, error) per failed message
    pub failures: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Pending,
    Previewed,
    Confirmed,
    Declined,
    Dispatched,
}

pub struct DispatchGate {
    mode: Mode,
    drafts: Vec<Draft>,
    /// Messages the mail client will receive
    outgoing: Vec<Draft>,
    test_recipients: Vec<String>,
    state: GateState,
    report: DispatchReport,
}

impl DispatchGate {
    pub fn new(mode: Mode, drafts: Vec<Draft>) -> Self {
        let unresolved = drafts
            .iter()
            .filter(|d| d.recipient == Recipient::Unresolved)
            .count();
        let outgoing = match mode {
            Mode::Send => drafts
                .iter()
                .filter(|d| d.recipient != Recipient::Unresolved)
                .cloned()
                .collect(),
            _ => Vec::new(),
        };

        Self {
            mode,
            drafts,
            outgoing,
            test_recipients: Vec::new(),
            state: GateState::Pending,
            report: DispatchReport {
                unresolved,
                ..DispatchReport::default()
            },
        }
    }

    /// Demo gate: the first `limit` drafts, each re-wrapped for every test
    /// recipient. Unresolved drafts are included so the banner shows it.
    pub fn demo(drafts: Vec<Draft>, limit: usize, test_recipients: Vec<String>) -> Self {
        let mut gate = Self::new(Mode::Demo, drafts);
        gate.outgoing = gate
            .drafts
            .iter()
            .take(limit)
            .flat_map(|d| test_recipients.iter().map(move |to| d.as_demo(to)))
            .collect();
        gate.test_recipients = test_recipients;
        gate
    }

    /// Messages that would be sent after confirmation
    pub fn outgoing(&self) -> &[Draft] {
        &self.outgoing
    }

    /// Log every draft and count it as "would send"
    pub fn preview(&mut self) -> &DispatchReport {
        for draft in &self.drafts {
            match &draft.recipient {
                Recipient::Address(to) => {
                    log::debug!("Would send '{}' to {}", draft.subject, to)
                }
                Recipient::Unresolved => {
                    log::debug!("No address for {}, not sendable", draft.requester)
                }
            }
        }
        self.report.previewed = self.drafts.len() - self.report.unresolved;
        if self.state == GateState::Pending {
            self.state = GateState::Previewed;
        }
        &self.report
    }

    /// Ask `confirmer` for permission to send. Preview mode never asks.
    pub fn confirm(&mut self, confirmer: &mut dyn Confirmer) -> Result<bool> {
        match self.state {
            GateState::Pending => return Err(GateError::NotPreviewed.into()),
            GateState::Dispatched => return Err(GateError::AlreadyDispatched.into()),
            _ => {}
        }
        if self.mode == Mode::Preview {
            return Err(GateError::PreviewOnly.into());
        }

        let request = ConfirmRequest {
            mode: self.mode,
            to_send: self.outgoing.len(),
            unresolved: self.report.unresolved,
            test_recipients: self.test_recipients.clone(),
        };

        if confirmer.confirm(&request)? {
            self.state = GateState::Confirmed;
            Ok(true)
        } else {
            log::info!("Sending cancelled");
            self.state = GateState::Declined;
            self.report.declined = true;
            Ok(false)
        }
    }

    /// Send every outgoing message. One failure does not stop the rest.
    pub fn send(&mut self, client: &mut dyn MailClient) -> Result<&DispatchReport, GateError> {
        match (self.mode, self.state) {
            (Mode::Preview, _) => return Err(GateError::PreviewOnly),
            (_, GateState::Dispatched) => return Err(GateError::AlreadyDispatched),
            (_, GateState::Confirmed) => {}
            _ => return Err(GateError::NotConfirmed),
        }

        let total = self.outgoing.len();
        for (i, draft) in self.outgoing.iter().enumerate() {
            let Some(to) = draft.recipient.address() else {
                continue;
            };
            log::info!("Sending {}/{} to {} ({})", i + 1, total, to, draft.requester);
            match client.send(to, &draft.subject, &draft.body, draft.format) {
                Ok(()) => self.report.sent += 1,
                Err(e) => {
                    log::error!("Failed to send to {}: {}", e.recipient(), e);
                    self.report.failed += 1;
                    self.report.failures.push((to.to_string(), e.to_string()));
                }
            }
        }

        self.state = GateState::Dispatched;
        Ok(&self.report)
    }

    /// Final report (consumes the gate)
    pub fn into_report(self) -> DispatchReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::mailer::test_support::RecordingMailer;
    use crate::erf::BodyFormat;

    /// Answers from a script, recording what it was asked
    struct Scripted {
        answer: bool,
        asked: Vec<ConfirmRequest>,
    }

    impl Scripted {
        fn new(answer: bool) -> Self {
            Self {
                answer,
                asked: Vec::new(),
            }
        }
    }

    impl Confirmer for Scripted {
        fn confirm(&mut self, request: &ConfirmRequest) -> Result<bool> {
            self.asked.push(request.clone());
            Ok(self.answer)
        }
    }

    fn draft(requester: &str, to: Option<&str>) -> Draft {
        Draft {
            requester: requester.to_string(),
            recipient: match to {
                Some(a) => Recipient::Address(a.to_string()),
                None => Recipient::Unresolved,
            },
            subject: format!("ERF Status Update - 1 Items ({})", requester),
            body: format!("Hello {}", requester),
            format: BodyFormat::Text,
            item_count: 1,
        }
    }

    fn drafts() -> Vec<Draft> {
        vec![
            draft("ALICE", Some("alice@example.com")),
            draft("BOB", None),
            draft("CAROL", Some("carol@example.com")),
        ]
    }

    #[test]
    fn test_preview_never_sends() {
        let mut gate = DispatchGate::new(Mode::Preview, drafts());
        let report = gate.preview().clone();
        assert_eq!(report.previewed, 2);
        assert_eq!(report.unresolved, 1);

        let mut mailer = RecordingMailer::default();
        assert_eq!(gate.send(&mut mailer).unwrap_err(), GateError::PreviewOnly);
        assert!(gate.confirm(&mut Scripted::new(true)).is_err());
        assert!(mailer.sent.is_empty());
    }

    #[test]
    fn test_send_requires_preview_and_confirmation() {
        let mut gate = DispatchGate::new(Mode::Send, drafts());
        let mut mailer = RecordingMailer::default();

        let err = gate.confirm(&mut Scripted::new(true)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<GateError>(),
            Some(&GateError::NotPreviewed)
        );

        gate.preview();
        assert_eq!(gate.send(&mut mailer).unwrap_err(), GateError::NotConfirmed);
        assert!(mailer.sent.is_empty());
    }

    #[test]
    fn test_send_once_per_resolved_draft() {
        let mut gate = DispatchGate::new(Mode::Send, drafts());
        let mut mailer = RecordingMailer::default();
        let mut confirmer = Scripted::new(true);

        gate.preview();
        assert!(gate.confirm(&mut confirmer).unwrap());
        let report = gate.send(&mut mailer).unwrap().clone();

        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.unresolved, 1);
        let to: Vec<&str> = mailer.sent.iter().map(|s| s.to.as_str()).collect();
        assert_eq!(to, vec!["alice@example.com", "carol@example.com"]);

        assert_eq!(confirmer.asked[0].to_send, 2);
        assert_eq!(confirmer.asked[0].unresolved, 1);

        // Second send is refused
        assert_eq!(
            gate.send(&mut mailer).unwrap_err(),
            GateError::AlreadyDispatched
        );
        assert_eq!(mailer.sent.len(), 2);
    }

    #[test]
    fn test_declined_sends_nothing() {
        let mut gate = DispatchGate::new(Mode::Send, drafts());
        let mut mailer = RecordingMailer::default();

        gate.preview();
        assert!(!gate.confirm(&mut Scripted::new(false)).unwrap());
        assert_eq!(gate.send(&mut mailer).unwrap_err(), GateError::NotConfirmed);
        assert!(mailer.sent.is_empty());
        assert!(gate.into_report().declined);
    }

    #[test]
    fn test_failure_does_not_stop_later_drafts() {
        let mut gate = DispatchGate::new(Mode::Send, drafts());
        let mut mailer = RecordingMailer {
            fail_for: vec!["alice@example.com".to_string()],
            ..RecordingMailer::default()
        };

        gate.preview();
        gate.confirm(&mut AutoConfirm).unwrap();
        let report = gate.send(&mut mailer).unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].0, "alice@example.com");
        assert_eq!(mailer.sent[0].to, "carol@example.com");
    }

    #[test]
    fn test_demo_rewraps_for_test_recipients() {
        let tests = vec!["qa1@example.com".to_string(), "qa2@example.com".to_string()];
        let mut gate = DispatchGate::demo(drafts(), 2, tests.clone());
        let mut mailer = RecordingMailer::default();
        let mut confirmer = Scripted::new(true);

        assert_eq!(gate.outgoing().len(), 4);
        gate.preview();
        gate.confirm(&mut confirmer).unwrap();
        let report = gate.send(&mut mailer).unwrap();

        assert_eq!(report.sent, 4);
        assert_eq!(confirmer.asked[0].test_recipients, tests);
        assert!(mailer.sent.iter().all(|s| s.to.starts_with("qa")));
        assert_eq!(mailer.sent[0].subject, "[DEMO] ERF Status for ALICE - 1 Items");
        // Unresolved BOB is shown to the testers, never to a real address
        assert!(mailer.sent[2].body.contains("Email not found"));
    }

    #[test]
    fn test_confirm_request_display() {
        let request = ConfirmRequest {
            mode: Mode::Send,
            to_send: 3,
            unresolved: 1,
            test_recipients: Vec::new(),
        };
        assert_eq!(
            request.to_string(),
            "Send 3 emails to resolved addresses (1 unresolved will be skipped)?"
        );
    }
}
