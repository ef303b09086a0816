// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery of sanitized events.
//!
//! A [`Transport`] delivers one event per call and reports success or
//! failure. The tracker picks one at construction time: an explicit override
//! first, then the console sink for the `console://` DSN, then HTTP.

mod console;
mod http;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use error_tracker_core::EventPayload;
use futures::FutureExt;

use crate::error::TransportError;

pub use console::ConsoleTransport;
pub use http::{HttpTransport, HttpTransportBuilder, DEFAULT_HTTP_TIMEOUT};

/// Reserved DSN that selects the console sink.
pub const CONSOLE_DSN: &str = "console://";

/// Capability to deliver events somewhere.
#[async_trait]
pub trait Transport: Send + Sync {
	/// Short name used in logs.
	fn name(&self) -> &str;

	/// Delivers a single sanitized event.
	async fn send(&self, payload: &EventPayload) -> Result<(), TransportError>;

	/// Waits up to `timeout` for in-flight sends to settle.
	///
	/// Returns `true` when nothing is left in flight. Transports without
	/// internal buffering keep the default, which reports success at once.
	async fn flush(&self, _timeout: Duration) -> bool {
		true
	}
}

/// Shared handle to a transport.
pub type SharedTransport = Arc<dyn Transport>;

/// Sends `payload`, turning a panic inside the transport into an error.
pub(crate) async fn deliver(
	transport: &dyn Transport,
	payload: &EventPayload,
) -> Result<(), TransportError> {
	match AssertUnwindSafe(transport.send(payload)).catch_unwind().await {
		Ok(result) => result,
		Err(_) => Err(TransportError::Panicked),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use error_tracker_core::{ErrorEvent, SdkInfo, Severity};

	struct PanickingTransport;

	#[async_trait]
	impl Transport for PanickingTransport {
		fn name(&self) -> &str {
			"panicking"
		}

		async fn send(&self, _payload: &EventPayload) -> Result<(), TransportError> {
			panic!("boom");
		}
	}

	struct RejectingTransport;

	#[async_trait]
	impl Transport for RejectingTransport {
		fn name(&self) -> &str {
			"rejecting"
		}

		async fn send(&self, _payload: &EventPayload) -> Result<(), TransportError> {
			Err(TransportError::Rejected("no".to_string()))
		}
	}

	fn payload() -> EventPayload {
		let event = ErrorEvent::new(
			Severity::Error,
			"rust",
			SdkInfo {
				name: "test".to_string(),
				version: "0".to_string(),
			},
		);
		EventPayload::from_event(&event).unwrap()
	}

	#[tokio::test]
	async fn panic_in_send_becomes_error() {
		let result = deliver(&PanickingTransport, &payload()).await;
		assert!(matches!(result, Err(TransportError::Panicked)));
	}

	#[tokio::test]
	async fn reported_failure_is_passed_through() {
		let result = deliver(&RejectingTransport, &payload()).await;
		assert!(matches!(result, Err(TransportError::Rejected(_))));
	}

	#[tokio::test]
	async fn default_flush_reports_success() {
		assert!(RejectingTransport.flush(Duration::from_millis(1)).await);
	}
}
