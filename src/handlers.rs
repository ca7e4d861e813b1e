// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the form2mail relay.
//!
//! A single POST route accepts a form submission whose final path segment
//! names the recipient. Checks run in the original handler order: client
//! address, rate limit, recipient allow-list, body shape, then dispatch.
//! Callers get a bare status code; detail goes to the log only.

use crate::config::Config;
use crate::mailer::{Mailer, OutboundMail};
use crate::tracker::RateTracker;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Form fields a submission must carry.
const REQUIRED_FIELDS: [&str; 4] = ["message", "name", "email", "phone"];

/// Shared application state, injected into every handler.
pub struct AppState<M> {
    pub tracker: Arc<RateTracker>,
    pub mailer: M,
    pub config: Config,
}

/// Build the application router.
///
/// Only POST is served, on every path; any other method is rejected by
/// the routing layer.
pub fn router<M: Mailer + 'static>(state: Arc<AppState<M>>) -> Router {
    Router::new()
        .route("/*path", post(submit::<M>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Relay one form submission as an email.
pub async fn submit<M: Mailer>(
    State(state): State<Arc<AppState<M>>>,
    Path(path): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let address = client_address(&headers, connect_info.map(|ConnectInfo(a)| a));
    debug!(%address, %path, "Processing submission");

    // Rate limit first: counting the prospective event, the total for this
    // address must not exceed the configured threshold.
    let sent = state.tracker.count_for(&address).await;
    if sent >= state.config.rate_limit.max_per_hour as usize {
        warn!(%address, sent, "Rate limiting submission");
        return StatusCode::TOO_MANY_REQUESTS.into_response();
    }

    // Recipient comes from the final path segment and must be allow-listed.
    let recipient = match recipient_from_path(&path) {
        Some(r) => r,
        None => {
            warn!(%address, %path, "No recipient in path");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    if !state.config.is_valid_recipient(&recipient) {
        warn!(%address, %recipient, "Recipient not on allow-list");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    // Body must be a form-encoded submission.
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(';').next().unwrap_or(s).trim().to_lowercase());
    if content_type.as_deref() != Some("application/x-www-form-urlencoded") {
        warn!(%address, ?content_type, "Unsupported content type");
        return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
    }

    let form = parse_form(&body);
    for field in REQUIRED_FIELDS {
        if !form.contains_key(field) {
            warn!(%address, field, "Submission is missing a required field");
            return StatusCode::BAD_REQUEST.into_response();
        }
    }

    let reply_to = form["email"].clone();
    let mail = OutboundMail {
        to: recipient.clone(),
        reply_to,
        subject: format!("New message from: {}", state.config.site_name),
        body: format!(
            "{}\n\n-- \n{}\n{}\n{}\n",
            form["message"], form["name"], form["email"], form["phone"]
        ),
    };

    // The mail send happens outside any tracker lock.
    if let Err(err) = state.mailer.send(mail).await {
        warn!(%address, %recipient, error = %err, "Mail dispatch failed");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    // Only a successful send counts against the sender's quota.
    state.tracker.record(&address).await;
    info!(%address, %recipient, "Submission relayed");

    (
        StatusCode::OK,
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
    )
        .into_response()
}

/// Resolve the client address: `X-Forwarded-For` (first hop), then
/// `X-Real-Ip`, then the socket peer.
fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    peer.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Extract the recipient identifier from the matched wildcard path:
/// the final segment, whitespace-trimmed and lowercased.
fn recipient_from_path(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?.trim().to_lowercase();
    if segment.is_empty() {
        None
    } else {
        Some(segment)
    }
}

/// Decode a form-encoded body. The first occurrence of a key wins,
/// matching how the original read form values.
fn parse_form(body: &[u8]) -> HashMap<String, String> {
    let mut form = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        form.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_address_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        let peer: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        assert_eq!(client_address(&headers, Some(peer)), "203.0.113.7");
    }

    #[test]
    fn client_address_falls_back_to_peer() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "192.0.2.4:1234".parse().unwrap();

        assert_eq!(client_address(&headers, Some(peer)), "192.0.2.4");
        assert_eq!(client_address(&headers, None), "unknown");
    }

    #[test]
    fn recipient_is_final_segment_normalized() {
        assert_eq!(recipient_from_path("Contact"), Some("contact".to_string()));
        assert_eq!(
            recipient_from_path("forms/v1/SALES"),
            Some("sales".to_string())
        );
        assert_eq!(recipient_from_path("contact/"), None);
        assert_eq!(recipient_from_path(""), None);
    }

    #[test]
    fn parse_form_keeps_first_value() {
        let form = parse_form(b"name=Alice&name=Bob&email=a%40example.com");
        assert_eq!(form["name"], "Alice");
        assert_eq!(form["email"], "a@example.com");
    }
}
