//! Getting drafts out the door

pub mod gate;
pub mod mailer;

pub use gate::{
    AutoConfirm, ConfirmRequest, Confirmer, DispatchGate, DispatchReport, LIVE_PHRASE, Mode,
    PromptConfirm,
};
pub use mailer::{MailClient, PickupMailer, SmtpMailer};
