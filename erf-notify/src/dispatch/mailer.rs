//! Mail client capability and its lettre-backed implementations

use std::path::PathBuf;

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, FileTransport, Message, SmtpTransport, Transport};

use crate::config::{MailConfig, TransportKind};
use crate::erf::BodyFormat;
use crate::error::DispatchError;

/// Something that can deliver one email
pub trait MailClient {
    fn send(
        &mut self,
        to: &str,
        subject: &str,
        body: &str,
        format: BodyFormat,
    ) -> Result<(), DispatchError>;
}

impl<M: MailClient + ?Sized> MailClient for Box<M> {
    fn send(
        &mut self,
        to: &str,
        subject: &str,
        body: &str,
        format: BodyFormat,
    ) -> Result<(), DispatchError> {
        (**self).send(to, subject, body, format)
    }
}

impl<M: MailClient + ?Sized> MailClient for &mut M {
    fn send(
        &mut self,
        to: &str,
        subject: &str,
        body: &str,
        format: BodyFormat,
    ) -> Result<(), DispatchError> {
        (**self).send(to, subject, body, format)
    }
}

/// Build the configured mail client
pub fn from_config(config: &MailConfig) -> Result<Box<dyn MailClient>, DispatchError> {
    match config.transport {
        TransportKind::Smtp => Ok(Box::new(SmtpMailer::new(config)?)),
        TransportKind::Pickup => Ok(Box::new(PickupMailer::new(config)?)),
    }
}

fn sender(config: &MailConfig) -> Result<Mailbox, DispatchError> {
    let address: Address = config
        .from
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| DispatchError::InvalidSender {
            sender: config.from.clone(),
            reason: e.to_string(),
        })?;
    Ok(Mailbox::new(config.from_name.clone(), address))
}

fn build_message(
    from: &Mailbox,
    to: &str,
    subject: &str,
    body: &str,
    format: BodyFormat,
) -> Result<Message, DispatchError> {
    let to_address: Address =
        to.trim()
            .parse()
            .map_err(|e: lettre::address::AddressError| DispatchError::InvalidRecipient {
                recipient: to.to_string(),
                reason: e.to_string(),
            })?;

    let content_type = match format {
        BodyFormat::Text => ContentType::TEXT_PLAIN,
        BodyFormat::Html => ContentType::TEXT_HTML,
    };

    Message::builder()
        .from(from.clone())
        .to(Mailbox::new(None, to_address))
        .subject(subject)
        .header(content_type)
        .body(body.to_string())
        .map_err(|e| DispatchError::Build {
            recipient: to.to_string(),
            reason: e.to_string(),
        })
}

/// Sends through an SMTP relay
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, DispatchError> {
        let from = sender(config)?;
        let host = config.smtp_host.as_str();
        let relay_err = |e: lettre::transport::smtp::Error| DispatchError::Transport {
            recipient: host.to_string(),
            reason: format!("SMTP relay error: {}", e),
        };

        let builder = if matches!(host, "localhost" | "127.0.0.1") {
            // Local relays usually speak plain SMTP
            SmtpTransport::builder_dangerous(host)
        } else if config.smtp_port == 465 {
            SmtpTransport::relay(host).map_err(relay_err)?
        } else {
            SmtpTransport::starttls_relay(host).map_err(relay_err)?
        };

        let mut builder = builder.port(config.smtp_port);
        if let Some(username) = &config.smtp_username {
            let password = config.smtp_password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        log::debug!("SMTP transport: {}:{}", host, config.smtp_port);
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

impl MailClient for SmtpMailer {
    fn send(
        &mut self,
        to: &str,
        subject: &str,
        body: &str,
        format: BodyFormat,
    ) -> Result<(), DispatchError> {
        let email = build_message(&self.from, to, subject, body, format)?;
        self.transport
            .send(&email)
            .map_err(|e| DispatchError::Transport {
                recipient: to.to_string(),
                reason: format!("SMTP send failed: {}", e),
            })?;
        log::info!("Email sent to {}", to);
        Ok(())
    }
}

/// Writes each message as an `.eml` file into a pickup directory, where a
/// desktop mail client or relay collects it
pub struct PickupMailer {
    transport: FileTransport,
    from: Mailbox,
    dir: PathBuf,
}

impl PickupMailer {
    pub fn new(config: &MailConfig) -> Result<Self, DispatchError> {
        let from = sender(config)?;
        let dir = config.pickup_dir.clone();
        std::fs::create_dir_all(&dir).map_err(|e| DispatchError::Transport {
            recipient: dir.display().to_string(),
            reason: format!("cannot create pickup directory: {}", e),
        })?;
        Ok(Self {
            transport: FileTransport::new(&dir),
            from,
            dir,
        })
    }
}

impl MailClient for PickupMailer {
    fn send(
        &mut self,
        to: &str,
        subject: &str,
        body: &str,
        format: BodyFormat,
    ) -> Result<(), DispatchError> {
        let email = build_message(&self.from, to, subject, body, format)?;
        let id = self
            .transport
            .send(&email)
            .map_err(|e| DispatchError::Transport {
                recipient: to.to_string(),
                reason: e.to_string(),
            })?;
        log::info!("Email for {} written to {}/{}.eml", to, self.dir.display(), id);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// One recorded `send` call
    #[derive(Debug, Clone, PartialEq)]
    pub struct Sent {
        pub to: String,
        pub subject: String,
        pub body: String,
        pub format: BodyFormat,
    }

    /// Records every call; fails for addresses listed in `fail_for`
    #[derive(Debug, Default)]
    pub struct RecordingMailer {
        pub sent: Vec<Sent>,
        pub fail_for: Vec<String>,
    }

    impl MailClient for RecordingMailer {
        fn send(
            &mut self,
            to: &str,
            subject: &str,
            body: &str,
            format: BodyFormat,
        ) -> Result<(), DispatchError> {
            if self.fail_for.iter().any(|f| f == to) {
                return Err(DispatchError::Transport {
                    recipient: to.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            self.sent.push(Sent {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
                format,
            });
            Ok(())
        }
    }
}
