// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Context types attached to events (user, request, os, runtime).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The user affected by an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	/// IP address (sensitive - not displayed by default)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ip_address: Option<String>,
	/// Additional attributes, flattened into the user object on the wire.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
	pub fn with_id(id: impl Into<String>) -> Self {
		Self {
			id: Some(id.into()),
			..Default::default()
		}
	}
}

/// HTTP request being handled when the event happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub headers: Option<HashMap<String, String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub query_string: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<serde_json::Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cookies: Option<HashMap<String, String>>,
}

/// Operating system the SDK runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsContext {
	/// "linux", "macos", "windows"
	pub name: String,
	pub arch: String,
}

impl OsContext {
	pub fn current() -> Self {
		Self {
			name: std::env::consts::OS.to_string(),
			arch: std::env::consts::ARCH.to_string(),
		}
	}
}

/// Language runtime information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeContext {
	/// Always "rustc" for this SDK.
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
}

/// Platform contexts carried by every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contexts {
	pub os: OsContext,
	pub runtime: RuntimeContext,
}

impl Contexts {
	/// Contexts describing the current process.
	pub fn current() -> Self {
		Self {
			os: OsContext::current(),
			runtime: RuntimeContext {
				name: "rustc".to_string(),
				version: option_env!("CARGO_PKG_RUST_VERSION")
					.filter(|v| !v.is_empty())
					.map(str::to_string),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn user_extra_is_flattened() {
		let mut user = User::with_id("42");
		user.extra.insert("plan".to_string(), json!("enterprise"));

		let value = serde_json::to_value(&user).unwrap();
		assert_eq!(value, json!({"id": "42", "plan": "enterprise"}));
	}

	#[test]
	fn user_roundtrips_unknown_fields_into_extra() {
		let user: User = serde_json::from_value(json!({
			"id": "1",
			"email": "a@example.com",
			"team": "core"
		}))
		.unwrap();

		assert_eq!(user.id.as_deref(), Some("1"));
		assert_eq!(user.email.as_deref(), Some("a@example.com"));
		assert_eq!(user.extra.get("team"), Some(&json!("core")));
	}

	#[test]
	fn current_contexts_describe_this_process() {
		let contexts = Contexts::current();
		assert_eq!(contexts.os.name, std::env::consts::OS);
		assert_eq!(contexts.runtime.name, "rustc");
	}
}
