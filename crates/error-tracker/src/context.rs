// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session-scoped context attached to every captured event.

use std::collections::HashMap;

use error_tracker_core::{Request, Severity, User};
use serde_json::{Map, Value};

/// Snapshot of the context, used when building an event.
///
/// Empty tag and extra maps are reported as `None` so events stay free of
/// noise fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextData {
	pub user: Option<User>,
	pub request: Option<Request>,
	pub tags: Option<HashMap<String, String>>,
	pub extra: Option<Map<String, Value>>,
	pub level: Option<Severity>,
	pub fingerprint: Option<Vec<String>>,
}

/// Mutable session state: user, request, tags, extra, level and fingerprint.
///
/// Setters take ownership of their arguments and getters hand out clones, so
/// nothing the caller holds can change the stored state afterwards.
#[derive(Debug, Clone, Default)]
pub struct ContextManager {
	user: Option<User>,
	request: Option<Request>,
	tags: HashMap<String, String>,
	extra: Map<String, Value>,
	level: Option<Severity>,
	fingerprint: Vec<String>,
}

impl ContextManager {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets or clears the user.
	pub fn set_user(&mut self, user: Option<User>) {
		self.user = user;
	}

	pub fn user(&self) -> Option<User> {
		self.user.clone()
	}

	/// Sets or clears the request being handled.
	pub fn set_request(&mut self, request: Option<Request>) {
		self.request = request;
	}

	pub fn request(&self) -> Option<Request> {
		self.request.clone()
	}

	pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.tags.insert(key.into(), value.into());
	}

	/// Merges `tags` into the existing tags, overwriting duplicates.
	pub fn set_tags<I, K, V>(&mut self, tags: I)
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		for (key, value) in tags {
			self.tags.insert(key.into(), value.into());
		}
	}

	pub fn remove_tag(&mut self, key: &str) -> Option<String> {
		self.tags.remove(key)
	}

	pub fn tags(&self) -> HashMap<String, String> {
		self.tags.clone()
	}

	pub fn set_extra(&mut self, key: impl Into<String>, value: Value) {
		self.extra.insert(key.into(), value);
	}

	/// Merges `extras` into the existing extra data, overwriting duplicates.
	pub fn set_extras<I, K>(&mut self, extras: I)
	where
		I: IntoIterator<Item = (K, Value)>,
		K: Into<String>,
	{
		for (key, value) in extras {
			self.extra.insert(key.into(), value);
		}
	}

	pub fn extras(&self) -> Map<String, Value> {
		self.extra.clone()
	}

	/// Sets a level that overrides the level of captured events.
	pub fn set_level(&mut self, level: Option<Severity>) {
		self.level = level;
	}

	pub fn level(&self) -> Option<Severity> {
		self.level
	}

	pub fn set_fingerprint(&mut self, fingerprint: Vec<String>) {
		self.fingerprint = fingerprint;
	}

	pub fn fingerprint(&self) -> Vec<String> {
		self.fingerprint.clone()
	}

	/// Builds a snapshot for event construction.
	pub fn context_data(&self) -> ContextData {
		ContextData {
			user: self.user.clone(),
			request: self.request.clone(),
			tags: (!self.tags.is_empty()).then(|| self.tags.clone()),
			extra: (!self.extra.is_empty()).then(|| self.extra.clone()),
			level: self.level,
			fingerprint: (!self.fingerprint.is_empty()).then(|| self.fingerprint.clone()),
		}
	}

	/// Resets every field to its empty state.
	pub fn clear(&mut self) {
		self.user = None;
		self.request = None;
		self.tags.clear();
		self.extra.clear();
		self.level = None;
		self.fingerprint.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn empty_context_snapshot_has_no_fields() {
		let ctx = ContextManager::new();
		assert_eq!(ctx.context_data(), ContextData::default());
	}

	#[test]
	fn empty_maps_surface_as_absent() {
		let mut ctx = ContextManager::new();
		ctx.set_user(Some(User::with_id("1")));

		let data = ctx.context_data();
		assert!(data.user.is_some());
		assert!(data.tags.is_none());
		assert!(data.extra.is_none());
		assert!(data.fingerprint.is_none());
	}

	#[test]
	fn set_user_then_clear_removes_user() {
		let mut ctx = ContextManager::new();
		ctx.set_user(Some(User::with_id("1")));
		ctx.clear();
		assert!(ctx.context_data().user.is_none());
	}

	#[test]
	fn clear_resets_everything() {
		let mut ctx = ContextManager::new();
		ctx.set_user(Some(User::with_id("1")));
		ctx.set_request(Some(Request {
			url: Some("https://example.com".to_string()),
			..Default::default()
		}));
		ctx.set_tag("env", "test");
		ctx.set_extra("attempt", json!(3));
		ctx.set_level(Some(Severity::Warning));
		ctx.set_fingerprint(vec!["checkout".to_string()]);

		ctx.clear();

		assert_eq!(ctx.context_data(), ContextData::default());
	}

	#[test]
	fn getters_return_independent_copies() {
		let mut ctx = ContextManager::new();
		ctx.set_tag("region", "eu");

		let mut tags = ctx.tags();
		tags.insert("region".to_string(), "us".to_string());

		assert_eq!(ctx.tags().get("region").map(String::as_str), Some("eu"));
	}

	#[test]
	fn setter_input_is_detached_from_state() {
		let mut ctx = ContextManager::new();
		let mut user = User::with_id("1");
		ctx.set_user(Some(user.clone()));
		user.id = Some("2".to_string());

		assert_eq!(ctx.user().unwrap().id.as_deref(), Some("1"));
	}

	#[test]
	fn set_tags_and_extras_merge() {
		let mut ctx = ContextManager::new();
		ctx.set_tag("a", "1");
		ctx.set_tags([("b", "2"), ("a", "3")]);
		ctx.set_extras([("x", json!(true))]);
		ctx.set_extra("y", json!({"nested": 1}));

		let data = ctx.context_data();
		let tags = data.tags.unwrap();
		assert_eq!(tags.len(), 2);
		assert_eq!(tags["a"], "3");
		assert_eq!(data.extra.unwrap().len(), 2);
	}

	#[test]
	fn remove_tag_returns_previous_value() {
		let mut ctx = ContextManager::new();
		ctx.set_tag("k", "v");
		assert_eq!(ctx.remove_tag("k").as_deref(), Some("v"));
		assert!(ctx.context_data().tags.is_none());
	}
}
