// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The error event: the unit of delivery.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;
use uuid::Uuid;

use crate::breadcrumb::Breadcrumb;
use crate::context::{Contexts, Request, User};
use crate::error::CoreError;

/// Unique identifier of an event, rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(#[serde(with = "uuid::serde::simple")] pub Uuid);

impl EventId {
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}
}

impl Default for EventId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for EventId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.simple())
	}
}

impl FromStr for EventId {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Severity of a captured event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	Fatal,
	Error,
	Warning,
	Info,
	Debug,
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Fatal => write!(f, "fatal"),
			Self::Error => write!(f, "error"),
			Self::Warning => write!(f, "warning"),
			Self::Info => write!(f, "info"),
			Self::Debug => write!(f, "debug"),
		}
	}
}

impl FromStr for Severity {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"fatal" => Ok(Self::Fatal),
			"error" => Ok(Self::Error),
			"warning" => Ok(Self::Warning),
			"info" => Ok(Self::Info),
			"debug" => Ok(Self::Debug),
			_ => Err(CoreError::InvalidSeverity(s.to_string())),
		}
	}
}

/// A single stack frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub function: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub module: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub filename: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub lineno: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub colno: Option<u32>,
	#[serde(default)]
	pub in_app: bool,
}

/// Ordered frames, innermost (the capture site) first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stacktrace {
	pub frames: Vec<Frame>,
}

impl Stacktrace {
	pub fn is_empty(&self) -> bool {
		self.frames.is_empty()
	}
}

/// How an exception reached the SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mechanism {
	#[serde(rename = "type")]
	pub kind: String,
	pub handled: bool,
}

impl Mechanism {
	/// An error the application caught and reported explicitly.
	pub fn handled() -> Self {
		Self {
			kind: "generic".to_string(),
			handled: true,
		}
	}

	/// An error that escaped the application (reported by an integration).
	pub fn unhandled(kind: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			handled: false,
		}
	}
}

/// A typed exception with optional stack and mechanism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exception {
	#[serde(rename = "type")]
	pub ty: String,
	pub value: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stacktrace: Option<Stacktrace>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mechanism: Option<Mechanism>,
}

impl Exception {
	pub fn new(ty: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			ty: ty.into(),
			value: value.into(),
			stacktrace: None,
			mechanism: None,
		}
	}
}

/// Exceptions of one event, most recent last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExceptionList {
	pub values: Vec<Exception>,
}

/// SDK identification sent with every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkInfo {
	pub name: String,
	pub version: String,
}

/// One captured exception or message plus its contextual snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
	pub event_id: EventId,
	/// Seconds since the Unix epoch.
	pub timestamp: f64,
	pub level: Severity,
	pub platform: String,
	pub environment: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub release: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub server_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exception: Option<ExceptionList>,
	#[serde(default)]
	pub breadcrumbs: Vec<Breadcrumb>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user: Option<User>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub request: Option<Request>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tags: Option<HashMap<String, String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub extra: Option<serde_json::Map<String, serde_json::Value>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fingerprint: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub contexts: Option<Contexts>,
	pub sdk: SdkInfo,
}

impl ErrorEvent {
	/// Creates a bare event stamped with a fresh id and the current time.
	pub fn new(level: Severity, platform: impl Into<String>, sdk: SdkInfo) -> Self {
		Self {
			event_id: EventId::new(),
			timestamp: now_timestamp(),
			level,
			platform: platform.into(),
			environment: "production".to_string(),
			release: None,
			server_name: None,
			message: None,
			exception: None,
			breadcrumbs: Vec::new(),
			user: None,
			request: None,
			tags: None,
			extra: None,
			fingerprint: None,
			contexts: None,
			sdk,
		}
	}

	/// The most recent (outermost) exception of the event, if any.
	pub fn primary_exception(&self) -> Option<&Exception> {
		self.exception.as_ref().and_then(|list| list.values.last())
	}
}

/// An event in its final wire form, as handed to transports and the retry
/// queue.
///
/// Redaction may put placeholders where the typed model expects structures,
/// so the body stays JSON instead of being parsed back into an
/// [`ErrorEvent`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
	event_id: EventId,
	body: serde_json::Value,
}

impl EventPayload {
	pub fn new(event_id: EventId, body: serde_json::Value) -> Self {
		Self { event_id, body }
	}

	/// Wire form of `event` without any redaction.
	pub fn from_event(event: &ErrorEvent) -> serde_json::Result<Self> {
		Ok(Self::new(event.event_id, serde_json::to_value(event)?))
	}

	pub fn event_id(&self) -> EventId {
		self.event_id
	}

	pub fn body(&self) -> &serde_json::Value {
		&self.body
	}

	pub fn into_body(self) -> serde_json::Value {
		self.body
	}

	/// Top-level field of the body, if present.
	pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
		self.body.get(key)
	}
}

impl Index<&str> for EventPayload {
	type Output = serde_json::Value;

	/// Same as indexing the body: missing fields yield `Value::Null`.
	fn index(&self, key: &str) -> &Self::Output {
		&self.body[key]
	}
}

impl Serialize for EventPayload {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.body.serialize(serializer)
	}
}

/// Current time as fractional seconds since the Unix epoch.
pub fn now_timestamp() -> f64 {
	Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn sdk() -> SdkInfo {
		SdkInfo {
			name: "test-sdk".to_string(),
			version: "0.0.0".to_string(),
		}
	}

	#[test]
	fn event_id_renders_as_simple_hex() {
		let id = EventId::new();
		let rendered = id.to_string();
		assert_eq!(rendered.len(), 32);
		assert!(rendered.chars().all(|c| c.is_ascii_hexdigit()));
	}

	#[test]
	fn event_id_serializes_like_display() {
		let id = EventId::new();
		let value = serde_json::to_value(id).unwrap();
		assert_eq!(value, serde_json::Value::String(id.to_string()));
	}

	#[test]
	fn event_ids_are_unique() {
		assert_ne!(EventId::new(), EventId::new());
	}

	#[test]
	fn bare_event_omits_absent_fields() {
		let event = ErrorEvent::new(Severity::Info, "rust", sdk());
		let value = serde_json::to_value(&event).unwrap();

		assert_eq!(value["level"], "info");
		assert_eq!(value["platform"], "rust");
		assert_eq!(value["breadcrumbs"], serde_json::json!([]));
		for absent in ["message", "exception", "user", "request", "tags", "extra"] {
			assert!(value.get(absent).is_none(), "{absent} should be omitted");
		}
	}

	#[test]
	fn exception_list_uses_type_key() {
		let mut exc = Exception::new("ParseError", "unexpected token");
		exc.mechanism = Some(Mechanism::handled());
		let value = serde_json::to_value(ExceptionList { values: vec![exc] }).unwrap();

		assert_eq!(value["values"][0]["type"], "ParseError");
		assert_eq!(value["values"][0]["mechanism"]["type"], "generic");
		assert_eq!(value["values"][0]["mechanism"]["handled"], true);
	}

	#[test]
	fn primary_exception_is_most_recent() {
		let mut event = ErrorEvent::new(Severity::Error, "rust", sdk());
		event.exception = Some(ExceptionList {
			values: vec![Exception::new("Io", "disk"), Exception::new("Load", "config")],
		});
		assert_eq!(event.primary_exception().unwrap().ty, "Load");
	}

	#[test]
	fn timestamp_is_fractional_seconds() {
		let ts = now_timestamp();
		assert!(ts > 1_600_000_000.0);
	}

	#[test]
	fn payload_keeps_id_and_serializes_as_body() {
		let mut event = ErrorEvent::new(Severity::Warning, "rust", sdk());
		event.message = Some("disk almost full".to_string());

		let payload = EventPayload::from_event(&event).unwrap();
		assert_eq!(payload.event_id(), event.event_id);
		assert_eq!(payload["message"], "disk almost full");
		assert!(payload["missing"].is_null());
		assert!(payload.get("missing").is_none());

		let wire = serde_json::to_value(&payload).unwrap();
		assert_eq!(&wire, payload.body());
		assert_eq!(wire["event_id"], event.event_id.to_string());
	}

	#[test]
	fn payload_body_may_diverge_from_typed_model() {
		let body = serde_json::json!({"request": {"cookies": "[Sanitized]"}});
		let payload = EventPayload::new(EventId::new(), body.clone());
		assert_eq!(payload.into_body(), body);
	}

	proptest! {
		#[test]
		fn event_id_roundtrip(uuid_bytes in any::<[u8; 16]>()) {
			let id = EventId(Uuid::from_bytes(uuid_bytes));
			let parsed: EventId = id.to_string().parse().unwrap();
			prop_assert_eq!(id, parsed);
		}

		#[test]
		fn severity_roundtrip(level in prop_oneof![
			Just(Severity::Fatal),
			Just(Severity::Error),
			Just(Severity::Warning),
			Just(Severity::Info),
			Just(Severity::Debug),
		]) {
			let parsed: Severity = level.to_string().parse().unwrap();
			prop_assert_eq!(level, parsed);
		}
	}
}
