// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound mail dispatch.
//!
//! The handler talks to a [`Mailer`] rather than to the SMTP client
//! directly, so tests can substitute a capturing mock. The production
//! implementation connects to the configured relay per send, mirroring
//! a dial-and-send transport: no pooling, no queueing, no retries.

use crate::config::SmtpConfig;
use mail_send::mail_builder::MessageBuilder;
use mail_send::SmtpClientBuilder;
use std::future::Future;
use thiserror::Error;

/// A single relayed form submission, ready for dispatch.
#[derive(Debug, Clone)]
pub struct OutboundMail {
    /// Recipient address or identifier from the request path
    pub to: String,
    /// Submitter's address, set as Reply-To
    pub reply_to: String,
    pub subject: String,
    pub body: String,
}

/// Mail dispatch error.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] mail_send::Error),

    #[error("mail rejected: {0}")]
    Rejected(String),
}

/// Send-one-message contract.
pub trait Mailer: Send + Sync {
    /// Dispatch a single message. A failed send is terminal for the
    /// originating request; no retry semantics exist here.
    fn send(&self, mail: OutboundMail) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// SMTP mailer backed by `mail-send`.
///
/// Authenticates with the configured credentials and uses STARTTLS
/// unless `implicit_tls` is set. The transport timeout is explicit and
/// configurable rather than left to library defaults.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutboundMail) -> Result<(), MailError> {
        let message = MessageBuilder::new()
            .from(self.config.sender.as_str())
            .to(mail.to.as_str())
            .reply_to(mail.reply_to.as_str())
            .subject(mail.subject.as_str())
            .text_body(mail.body.as_str());

        SmtpClientBuilder::new(self.config.host.clone(), self.config.port)
            .implicit_tls(self.config.implicit_tls)
            .credentials((self.config.username.clone(), self.config.password.clone()))
            .timeout(self.config.timeout())
            .connect()
            .await?
            .send(message)
            .await?;

        Ok(())
    }
}
