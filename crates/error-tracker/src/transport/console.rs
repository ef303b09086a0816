// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Console sink for local development.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use error_tracker_core::EventPayload;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::Transport;
use crate::error::TransportError;

/// Writes a readable summary of each event and always reports success.
pub struct ConsoleTransport {
	writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleTransport {
	/// Writes to stdout.
	pub fn new() -> Self {
		Self::with_writer(io::stdout())
	}

	pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
		Self {
			writer: Mutex::new(Box::new(writer)),
		}
	}

	fn write_event(&self, payload: &EventPayload) -> Result<(), TransportError> {
		let summary = serde_json::to_string_pretty(&EventSummary::from_payload(payload))?;
		let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
		writeln!(writer, "[ErrorTracker] {summary}")?;
		writer.flush()?;
		Ok(())
	}
}

impl Default for ConsoleTransport {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Transport for ConsoleTransport {
	fn name(&self) -> &str {
		"console"
	}

	async fn send(&self, payload: &EventPayload) -> Result<(), TransportError> {
		if let Err(e) = self.write_event(payload) {
			warn!(event_id = %payload.event_id(), error = %e, "Failed to write event to console");
		}
		Ok(())
	}
}

#[derive(Serialize)]
struct EventSummary<'a> {
	event_id: String,
	timestamp: Option<&'a Value>,
	level: Option<&'a Value>,
	message: Option<&'a Value>,
	exception: Option<ExceptionSummary<'a>>,
	breadcrumbs: usize,
}

#[derive(Serialize)]
struct ExceptionSummary<'a> {
	#[serde(rename = "type")]
	ty: Option<&'a Value>,
	value: Option<&'a Value>,
}

impl<'a> EventSummary<'a> {
	fn from_payload(payload: &'a EventPayload) -> Self {
		// Most recent exception is last.
		let exception = payload
			.get("exception")
			.and_then(|list| list.get("values"))
			.and_then(Value::as_array)
			.and_then(|values| values.last())
			.map(|exc| ExceptionSummary {
				ty: exc.get("type"),
				value: exc.get("value"),
			});

		Self {
			event_id: payload.event_id().to_string(),
			timestamp: payload.get("timestamp"),
			level: payload.get("level"),
			message: payload.get("message"),
			exception,
			breadcrumbs: payload
				.get("breadcrumbs")
				.and_then(Value::as_array)
				.map_or(0, Vec::len),
		}
	}
}
