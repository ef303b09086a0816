// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Recursive redaction of sensitive fields in structured payloads.
//!
//! A key is sensitive when it contains (case-insensitively) any entry of the
//! sensitive-key set. The value under a sensitive key is replaced with a
//! placeholder of the same JSON type; everything else is copied. Input values
//! are never modified; a new value is returned.

use error_tracker_core::{ErrorEvent, EventPayload};
use serde_json::{Map, Value};

/// Placeholder for redacted strings and non-scalar values.
pub const SANITIZED: &str = "[Sanitized]";

/// Marker substituted for structures nested deeper than the depth limit.
pub const MAX_DEPTH_REACHED: &str = "[Max Depth Reached]";

/// Default recursion limit.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Key fragments that are always treated as sensitive.
pub const DEFAULT_SENSITIVE_KEYS: &[&str] = &[
	"password",
	"passwd",
	"secret",
	"api_key",
	"apikey",
	"access_token",
	"auth_token",
	"token",
	"credit_card",
	"card_number",
	"cvv",
	"ssn",
	"social_security_number",
	"email",
	"phone",
	"phone_number",
];

/// Sanitizes `value` with the default keys plus `extra_keys`.
pub fn sanitize(value: &Value, extra_keys: &[&str], max_depth: usize) -> Value {
	Sanitizer::new(extra_keys.iter().copied(), max_depth).sanitize(value)
}

/// A configured redactor. Cheap to clone and safe to share between threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitizer {
	/// Lowercased key fragments.
	keys: Vec<String>,
	max_depth: usize,
}

impl Default for Sanitizer {
	fn default() -> Self {
		Self::new(std::iter::empty::<&str>(), DEFAULT_MAX_DEPTH)
	}
}

impl Sanitizer {
	/// Creates a sanitizer whose key set is the defaults merged with `extra_keys`.
	pub fn new<I, S>(extra_keys: I, max_depth: usize) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut keys: Vec<String> = DEFAULT_SENSITIVE_KEYS
			.iter()
			.map(|k| k.to_string())
			.collect();

		for key in extra_keys {
			let key = key.as_ref().trim().to_lowercase();
			if !key.is_empty() && !keys.contains(&key) {
				keys.push(key);
			}
		}

		Self { keys, max_depth }
	}

	/// The effective lowercased key set.
	pub fn keys(&self) -> &[String] {
		&self.keys
	}

	pub fn max_depth(&self) -> usize {
		self.max_depth
	}

	/// Returns true if `key` contains any sensitive fragment.
	pub fn is_sensitive_key(&self, key: &str) -> bool {
		let lower = key.to_lowercase();
		self.keys.iter().any(|k| lower.contains(k.as_str()))
	}

	/// Returns a deeply sanitized copy of `value`.
	pub fn sanitize(&self, value: &Value) -> Value {
		self.sanitize_at(value, 0)
	}

	/// Returns the sanitized wire form of `event`.
	///
	/// The result is exactly what leaves the process. It is not parsed back
	/// into an [`ErrorEvent`], so placeholders and depth markers may replace
	/// any field without losing the event.
	pub fn sanitize_event(&self, event: &ErrorEvent) -> serde_json::Result<EventPayload> {
		let body = serde_json::to_value(event)?;
		Ok(EventPayload::new(event.event_id, self.sanitize(&body)))
	}

	fn sanitize_at(&self, value: &Value, depth: usize) -> Value {
		if depth >= self.max_depth {
			return Value::String(MAX_DEPTH_REACHED.to_string());
		}

		match value {
			Value::Array(items) => Value::Array(
				items
					.iter()
					.map(|item| self.sanitize_at(item, depth + 1))
					.collect(),
			),
			Value::Object(map) => {
				let mut out = Map::with_capacity(map.len());
				for (key, value) in map {
					let sanitized = if self.is_sensitive_key(key) {
						placeholder(value)
					} else if value.is_object() || value.is_array() {
						self.sanitize_at(value, depth + 1)
					} else {
						value.clone()
					};
					out.insert(key.clone(), sanitized);
				}
				Value::Object(out)
			}
			scalar => scalar.clone(),
		}
	}
}

/// Type-preserving replacement for a sensitive value.
fn placeholder(value: &Value) -> Value {
	match value {
		Value::String(_) => Value::String(SANITIZED.to_string()),
		Value::Number(_) => Value::from(0),
		Value::Bool(_) => Value::Bool(false),
		_ => Value::String(SANITIZED.to_string()),
	}
}
