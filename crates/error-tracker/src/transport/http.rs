// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP sink: POSTs each event as JSON to the configured endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use error_tracker_core::EventPayload;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tokio::sync::Notify;
use tracing::debug;

use super::Transport;
use crate::error::{TrackerError, TransportError};
use crate::sanitizer::Sanitizer;

/// Default timeout for a single delivery attempt.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = concat!("error-tracker-rust/", env!("CARGO_PKG_VERSION"));

/// Builder for [`HttpTransport`].
pub struct HttpTransportBuilder {
	endpoint: String,
	timeout: Duration,
	headers: Vec<(String, String)>,
	sanitizer: Sanitizer,
}

impl HttpTransportBuilder {
	/// Sets the per-request timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	/// Adds a header sent with every request (e.g. an API key).
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	/// Sets the sanitizer applied to every payload before it is sent.
	pub fn sanitizer(mut self, sanitizer: Sanitizer) -> Self {
		self.sanitizer = sanitizer;
		self
	}

	pub fn build(self) -> Result<HttpTransport, TrackerError> {
		let mut headers = HeaderMap::new();
		for (name, value) in &self.headers {
			let invalid = || TrackerError::InvalidConfig {
				key: format!("header {name}"),
				value: value.clone(),
			};
			let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
			let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
			headers.insert(name, value);
		}

		let client = Client::builder()
			.user_agent(USER_AGENT)
			.timeout(self.timeout)
			.default_headers(headers)
			.build()?;

		Ok(HttpTransport {
			endpoint: self.endpoint,
			client,
			sanitizer: self.sanitizer,
			in_flight: AtomicUsize::new(0),
			idle: Notify::new(),
		})
	}
}

/// Delivers events with a bounded-time HTTP POST.
///
/// Any non-success status or timeout is a delivery failure. Payloads are
/// sanitized again right before they are serialized.
pub struct HttpTransport {
	endpoint: String,
	client: Client,
	sanitizer: Sanitizer,
	in_flight: AtomicUsize,
	idle: Notify,
}

impl HttpTransport {
	pub fn builder(endpoint: impl Into<String>) -> HttpTransportBuilder {
		HttpTransportBuilder {
			endpoint: endpoint.into(),
			timeout: DEFAULT_HTTP_TIMEOUT,
			headers: Vec::new(),
			sanitizer: Sanitizer::default(),
		}
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	/// Number of requests currently in flight.
	pub fn in_flight(&self) -> usize {
		self.in_flight.load(Ordering::SeqCst)
	}

	async fn post(&self, payload: &EventPayload) -> Result<(), TransportError> {
		let body = self.sanitizer.sanitize(payload.body());

		debug!(endpoint = %self.endpoint, event_id = %payload.event_id(), "Sending event");

		let response = self
			.client
			.post(&self.endpoint)
			.json(&body)
			.send()
			.await
			.map_err(|e| {
				if e.is_timeout() {
					TransportError::Timeout
				} else {
					TransportError::RequestFailed(e)
				}
			})?;

		let status = response.status();
		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();
			return Err(TransportError::ServerError {
				status: status.as_u16(),
				message,
			});
		}

		Ok(())
	}
}

#[async_trait]
impl Transport for HttpTransport {
	fn name(&self) -> &str {
		"http"
	}

	async fn send(&self, payload: &EventPayload) -> Result<(), TransportError> {
		let _guard = InFlightGuard::enter(self);
		self.post(payload).await
	}

	async fn flush(&self, timeout: Duration) -> bool {
		let settled = async {
			loop {
				let notified = self.idle.notified();
				tokio::pin!(notified);
				notified.as_mut().enable();

				if self.in_flight.load(Ordering::SeqCst) == 0 {
					return;
				}
				notified.await;
			}
		};

		tokio::time::timeout(timeout, settled).await.is_ok()
	}
}

struct InFlightGuard<'a> {
	transport: &'a HttpTransport,
}

impl<'a> InFlightGuard<'a> {
	fn enter(transport: &'a HttpTransport) -> Self {
		transport.in_flight.fetch_add(1, Ordering::SeqCst);
		Self { transport }
	}
}

impl Drop for InFlightGuard<'_> {
	fn drop(&mut self) {
		if self.transport.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
			self.transport.idle.notify_waiters();
		}
	}
}
