// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! form2mail
//!
//! A minimal form-to-email relay. A POST to `/{recipient}` with the
//! form fields `message`, `name`, `email`, and `phone` is relayed as a
//! plaintext email to the named recipient, subject to:
//!
//! - A recipient allow-list (unlisted targets are rejected 401)
//! - A naive per-IP rate limit (excess submissions are rejected 429)
//!
//! Accepted submissions are recorded as events in a [`tracker::RateTracker`];
//! a background task purges events older than the retention window every
//! purge interval. Reads never filter by age, so the effective limit
//! window is up to (window + purge interval) wide.

pub mod config;
pub mod handlers;
pub mod mailer;
pub mod tracker;

pub use config::Config;
pub use handlers::AppState;
pub use mailer::{MailError, Mailer, OutboundMail, SmtpMailer};
pub use tracker::RateTracker;
