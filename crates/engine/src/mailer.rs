//! Outgoing mail seam.
//!
//! The engine composes messages (verification, welcome) and hands them to a
//! [`Mailer`]. Delivery is up to the implementation; [`LogMailer`] only
//! records them through `tracing`.

use std::fmt::Debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub trait Mailer: Debug + Send + Sync {
    fn send(&self, mail: Mail);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: Mail) {
        tracing::info!(to = %mail.to, subject = %mail.subject, "outgoing mail");
        tracing::debug!(body = %mail.body, "outgoing mail body");
    }
}

pub(crate) fn verification_mail(to: &str, username: &str, link: &str) -> Mail {
    Mail {
        to: to.to_string(),
        subject: "Confirm your MoneyMap email".to_string(),
        body: format!(
            "Hi {username},\n\nconfirm your email address by opening:\n{link}\n\nThe link expires in 24 hours."
        ),
    }
}

pub(crate) fn welcome_mail(to: &str, username: &str) -> Mail {
    Mail {
        to: to.to_string(),
        subject: "Welcome to MoneyMap".to_string(),
        body: format!("Hi {username},\n\nyour email is verified. Welcome aboard!"),
    }
}
