// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The tracker: builds events from context, runs hooks, sanitizes and
//! delivers them, and hands failures to the retry worker.

use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use error_tracker_core::{
	Breadcrumb, Contexts, ErrorEvent, EventId, EventPayload, Exception, ExceptionList, Request,
	SdkInfo, Severity, User,
};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::breadcrumbs::BreadcrumbManager;
use crate::config::{TrackerBuilder, TrackerConfig};
use crate::context::{ContextData, ContextManager};
use crate::exception::exceptions_from_error;
use crate::hooks::HookOutcome;
use crate::queue::QueueManager;
use crate::retry::{QueueStats, RetryWorker};
use crate::sanitizer::Sanitizer;
use crate::transport::{deliver, SharedTransport};

/// SDK name reported with every event.
pub const SDK_NAME: &str = "error-tracker-rust";
/// SDK version reported with every event.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Platform reported with every event.
pub const PLATFORM: &str = "rust";
/// Default wait used by [`Tracker::flush_default`].
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_millis(2000);

/// Where a single capture call ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
	/// Tracking is disabled; nothing was built.
	Disabled,
	/// Dropped by sampling before an event was built.
	SampledOut,
	/// `before_send` dropped the event.
	FilteredByHook,
	/// The transport accepted the event on the first attempt.
	Delivered(EventId),
	/// The first attempt failed; the event is in the retry queue.
	Queued(EventId),
	/// The event could not be prepared or queued and was dropped.
	Discarded,
}

impl CaptureOutcome {
	/// The event id, for outcomes where an event was built and kept.
	pub fn event_id(&self) -> Option<EventId> {
		match self {
			Self::Delivered(id) | Self::Queued(id) => Some(*id),
			_ => None,
		}
	}
}

/// Error tracker for a single application.
///
/// Capture calls never fail; delivery problems are retried in the
/// background and otherwise only logged. Context and breadcrumbs belong to
/// this instance and are changed through `&mut self`, so callers sharing a
/// tracker across tasks must serialize access themselves.
pub struct Tracker {
	config: TrackerConfig,
	transport: SharedTransport,
	sanitizer: Sanitizer,
	context: ContextManager,
	breadcrumbs: BreadcrumbManager,
	retry_tx: mpsc::UnboundedSender<EventPayload>,
	stats_rx: watch::Receiver<QueueStats>,
	pending_worker: Option<RetryWorker>,
	worker: Option<JoinHandle<()>>,
}

impl Tracker {
	/// Creates a new builder for configuring the tracker.
	pub fn builder() -> TrackerBuilder {
		TrackerBuilder::new()
	}

	pub(crate) fn new(config: TrackerConfig, transport: SharedTransport) -> Self {
		let (retry_tx, retry_rx) = mpsc::unbounded_channel();
		let (stats_tx, stats_rx) = watch::channel(QueueStats::default());
		let worker = RetryWorker::new(
			QueueManager::new(config.max_queue_size, config.max_retries),
			transport.clone(),
			retry_rx,
			stats_tx,
			config.max_backoff,
		);

		Self {
			sanitizer: config.sanitizer(),
			breadcrumbs: BreadcrumbManager::new(config.max_breadcrumbs),
			context: ContextManager::new(),
			config,
			transport,
			retry_tx,
			stats_rx,
			pending_worker: Some(worker),
			worker: None,
		}
	}

	/// Starts the background retry worker on the current tokio runtime.
	///
	/// Idempotent. Events that failed before this call are picked up once
	/// the worker starts. Outside a runtime this logs a warning and leaves
	/// the tracker uninitialized.
	pub fn init(&mut self) {
		if self.worker.is_some() {
			return;
		}

		let handle = match Handle::try_current() {
			Ok(handle) => handle,
			Err(e) => {
				warn!(error = %e, "Cannot start retry worker outside a tokio runtime");
				return;
			}
		};

		if let Some(worker) = self.pending_worker.take() {
			self.worker = Some(handle.spawn(worker.run()));
			info!(
				transport = self.transport.name(),
				environment = %self.config.environment,
				"Error tracker initialized"
			);
		}
	}

	pub fn is_initialized(&self) -> bool {
		self.worker.is_some()
	}

	pub fn config(&self) -> &TrackerConfig {
		&self.config
	}

	pub fn transport_name(&self) -> &str {
		self.transport.name()
	}

	/// Captures an error and its `source()` chain.
	pub async fn capture_exception<E>(&self, error: &E, level: Severity) -> CaptureOutcome
	where
		E: Error + ?Sized,
	{
		self.capture(level, |event| {
			event.exception = Some(ExceptionList {
				values: exceptions_from_error(error),
			});
		})
		.await
	}

	/// Captures a prebuilt exception list, root cause first.
	pub async fn capture_exceptions(
		&self,
		exceptions: Vec<Exception>,
		level: Severity,
	) -> CaptureOutcome {
		self.capture(level, |event| {
			event.exception = Some(ExceptionList { values: exceptions });
		})
		.await
	}

	/// Captures a plain message.
	pub async fn capture_message(&self, message: impl Into<String>, level: Severity) -> CaptureOutcome {
		let message = message.into();
		self.capture(level, |event| event.message = Some(message)).await
	}

	/// Records a breadcrumb after passing it through `before_breadcrumb`.
	///
	/// The timestamp is stamped on insertion.
	pub fn add_breadcrumb(&mut self, breadcrumb: Breadcrumb) {
		let breadcrumb = match &self.config.before_breadcrumb {
			Some(hook) => match run_hook(|| hook(breadcrumb), "before_breadcrumb") {
				HookOutcome::Keep(breadcrumb) => breadcrumb,
				HookOutcome::Drop => {
					debug!("Breadcrumb dropped by before_breadcrumb");
					return;
				}
			},
			None => breadcrumb,
		};

		self.breadcrumbs.add(breadcrumb);
	}

	pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
		self.breadcrumbs.get_all()
	}

	pub fn clear_breadcrumbs(&mut self) {
		self.breadcrumbs.clear();
	}

	pub fn set_user(&mut self, user: Option<User>) {
		self.context.set_user(user);
	}

	pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.context.set_tag(key, value);
	}

	pub fn set_tags<K, V>(&mut self, tags: impl IntoIterator<Item = (K, V)>)
	where
		K: Into<String>,
		V: Into<String>,
	{
		self.context.set_tags(tags);
	}

	pub fn set_extra(&mut self, key: impl Into<String>, value: Value) {
		self.context.set_extra(key, value);
	}

	pub fn set_extras<K>(&mut self, extras: impl IntoIterator<Item = (K, Value)>)
	where
		K: Into<String>,
	{
		self.context.set_extras(extras);
	}

	pub fn set_request(&mut self, request: Option<Request>) {
		self.context.set_request(request);
	}

	/// Overrides the level of every subsequent capture while set.
	pub fn set_level(&mut self, level: Option<Severity>) {
		self.context.set_level(level);
	}

	/// Grouping fingerprint attached to subsequent events. Empty clears it.
	pub fn set_fingerprint<S: Into<String>>(&mut self, fingerprint: impl IntoIterator<Item = S>) {
		self.context
			.set_fingerprint(fingerprint.into_iter().map(Into::into).collect());
	}

	/// Clears user, request, tags, extras, level, fingerprint and breadcrumbs.
	pub fn clear_context(&mut self) {
		self.context.clear();
		self.breadcrumbs.clear();
	}

	/// Snapshot of the current context; empty collections are `None`.
	pub fn context_data(&self) -> ContextData {
		self.context.context_data()
	}

	/// Current retry queue statistics.
	pub fn queue_stats(&self) -> QueueStats {
		*self.stats_rx.borrow()
	}

	/// Receiver that observes every retry queue change.
	pub fn subscribe_queue_stats(&self) -> watch::Receiver<QueueStats> {
		self.stats_rx.clone()
	}

	/// Waits for the transport's in-flight sends, up to `timeout`.
	///
	/// This does not wait for the retry queue to drain.
	pub async fn flush(&self, timeout: Duration) -> bool {
		self.transport.flush(timeout).await
	}

	/// [`flush`](Self::flush) with [`DEFAULT_FLUSH_TIMEOUT`].
	pub async fn flush_default(&self) -> bool {
		self.flush(DEFAULT_FLUSH_TIMEOUT).await
	}

	async fn capture(&self, level: Severity, fill: impl FnOnce(&mut ErrorEvent)) -> CaptureOutcome {
		if !self.config.enabled {
			return CaptureOutcome::Disabled;
		}

		if !self.sampled() {
			debug!(sample_rate = self.config.sample_rate, "Event dropped by sampling");
			return CaptureOutcome::SampledOut;
		}

		let mut event = self.build_event(level);
		fill(&mut event);
		self.send_event(event).await
	}

	fn sampled(&self) -> bool {
		fastrand::f64() < self.config.sample_rate
	}

	fn build_event(&self, level: Severity) -> ErrorEvent {
		let context = self.context.context_data();

		let mut event = ErrorEvent::new(
			context.level.unwrap_or(level),
			PLATFORM,
			SdkInfo {
				name: SDK_NAME.to_string(),
				version: SDK_VERSION.to_string(),
			},
		);
		event.environment = self.config.environment.clone();
		event.release = self.config.release.clone();
		event.server_name = Some(self.config.server_name.clone());
		event.breadcrumbs = self.breadcrumbs.get_all();
		event.user = context.user;
		event.request = context.request;
		event.tags = context.tags;
		event.extra = context.extra;
		event.fingerprint = context.fingerprint;
		event.contexts = Some(Contexts::current());
		event
	}

	async fn send_event(&self, event: ErrorEvent) -> CaptureOutcome {
		let event = match &self.config.before_send {
			Some(hook) => match run_hook(|| hook(event), "before_send") {
				HookOutcome::Keep(event) => event,
				HookOutcome::Drop => {
					debug!("Event dropped by before_send");
					return CaptureOutcome::FilteredByHook;
				}
			},
			None => event,
		};

		let event_id = event.event_id;
		let payload = match self.sanitizer.sanitize_event(&event) {
			Ok(payload) => payload,
			Err(e) => {
				warn!(event_id = %event_id, error = %e, "Failed to serialize event, discarding");
				return CaptureOutcome::Discarded;
			}
		};

		match deliver(self.transport.as_ref(), &payload).await {
			Ok(()) => {
				debug!(event_id = %event_id, transport = self.transport.name(), "Event delivered");
				CaptureOutcome::Delivered(event_id)
			}
			Err(e) => {
				warn!(event_id = %event_id, error = %e, "Failed to send event, queueing for retry");
				if self.retry_tx.send(payload).is_err() {
					warn!(event_id = %event_id, "Retry worker is gone, discarding event");
					return CaptureOutcome::Discarded;
				}
				CaptureOutcome::Queued(event_id)
			}
		}
	}
}

impl Drop for Tracker {
	fn drop(&mut self) {
		if let Some(worker) = self.worker.take() {
			worker.abort();
		}
	}
}

/// Runs an embedder hook; a panicking hook drops the value.
fn run_hook<T>(hook: impl FnOnce() -> HookOutcome<T>, name: &str) -> HookOutcome<T> {
	match catch_unwind(AssertUnwindSafe(hook)) {
		Ok(outcome) => outcome,
		Err(_) => {
			warn!(hook = name, "Hook panicked, dropping value");
			HookOutcome::Drop
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::TransportError;
	use crate::transport::Transport;
	use async_trait::async_trait;
	use error_tracker_core::{BreadcrumbLevel, BreadcrumbType};
	use serde_json::json;
	use std::sync::{Arc, Mutex};

	#[derive(Default)]
	struct RecordingTransport {
		payloads: Mutex<Vec<EventPayload>>,
	}

	impl RecordingTransport {
		fn payloads(&self) -> Vec<EventPayload> {
			self.payloads.lock().unwrap().clone()
		}

		/// Payloads read back into the typed model.
		fn events(&self) -> Vec<ErrorEvent> {
			self.payloads()
				.into_iter()
				.map(|payload| serde_json::from_value(payload.into_body()).unwrap())
				.collect()
		}
	}

	#[async_trait]
	impl Transport for RecordingTransport {
		fn name(&self) -> &str {
			"recording"
		}

		async fn send(&self, payload: &EventPayload) -> Result<(), TransportError> {
			self.payloads.lock().unwrap().push(payload.clone());
			Ok(())
		}
	}

	fn tracker_with(transport: Arc<RecordingTransport>) -> TrackerBuilder {
		Tracker::builder()
			.dsn("https://errors.example.com/api/events")
			.server_name("test-host")
			.transport(transport)
	}

	fn crumb(message: &str) -> Breadcrumb {
		Breadcrumb::new(BreadcrumbType::Navigation, BreadcrumbLevel::Info).with_message(message)
	}

	#[tokio::test]
	async fn message_event_is_enriched() {
		let transport = Arc::new(RecordingTransport::default());
		let mut tracker = tracker_with(transport.clone())
			.environment("staging")
			.release("1.2.3")
			.build()
			.unwrap();

		tracker.set_user(Some(User::with_id("42")));
		tracker.set_tag("region", "eu");
		tracker.set_extra("cart_items", json!(3));
		tracker.add_breadcrumb(crumb("/checkout"));

		let outcome = tracker.capture_message("payment failed", Severity::Warning).await;
		assert!(matches!(outcome, CaptureOutcome::Delivered(_)));

		let events = transport.events();
		assert_eq!(events.len(), 1);
		let event = &events[0];
		assert_eq!(outcome.event_id(), Some(event.event_id));
		assert_eq!(event.message.as_deref(), Some("payment failed"));
		assert_eq!(event.level, Severity::Warning);
		assert_eq!(event.platform, "rust");
		assert_eq!(event.environment, "staging");
		assert_eq!(event.release.as_deref(), Some("1.2.3"));
		assert_eq!(event.server_name.as_deref(), Some("test-host"));
		assert_eq!(event.sdk.name, "error-tracker-rust");
		assert_eq!(event.user.as_ref().unwrap().id.as_deref(), Some("42"));
		assert_eq!(event.tags.as_ref().unwrap()["region"], "eu");
		assert_eq!(event.extra.as_ref().unwrap()["cart_items"], 3);
		assert_eq!(event.breadcrumbs.len(), 1);
		assert!(event.contexts.is_some());
	}

	#[tokio::test]
	async fn empty_context_leaves_fields_absent() {
		let transport = Arc::new(RecordingTransport::default());
		let tracker = tracker_with(transport.clone()).build().unwrap();

		tracker.capture_message("hello", Severity::Info).await;

		let event = &transport.events()[0];
		assert!(event.tags.is_none());
		assert!(event.extra.is_none());
		assert!(event.user.is_none());
		assert!(event.fingerprint.is_none());
		assert!(event.breadcrumbs.is_empty());
	}

	#[tokio::test]
	async fn exception_chain_is_captured() {
		let transport = Arc::new(RecordingTransport::default());
		let tracker = tracker_with(transport.clone()).build().unwrap();

		let error = "x1".parse::<i64>().unwrap_err();
		tracker.capture_exception(&error, Severity::Error).await;

		let event = &transport.events()[0];
		let exception = event.primary_exception().unwrap();
		assert_eq!(exception.ty, "ParseIntError");
		assert_eq!(exception.value, "invalid digit found in string");
		assert!(exception.mechanism.as_ref().unwrap().handled);
		assert_eq!(event.level, Severity::Error);
	}

	#[tokio::test]
	async fn context_level_and_fingerprint_apply() {
		let transport = Arc::new(RecordingTransport::default());
		let mut tracker = tracker_with(transport.clone()).build().unwrap();

		tracker.set_level(Some(Severity::Fatal));
		tracker.set_fingerprint(["checkout", "timeout"]);
		tracker.capture_message("slow", Severity::Info).await;

		let event = &transport.events()[0];
		assert_eq!(event.level, Severity::Fatal);
		assert_eq!(
			event.fingerprint.as_deref(),
			Some(&["checkout".to_string(), "timeout".to_string()][..])
		);
	}

	#[tokio::test]
	async fn sensitive_fields_are_sanitized_before_send() {
		let transport = Arc::new(RecordingTransport::default());
		let mut tracker = tracker_with(transport.clone()).build().unwrap();

		tracker.set_extra("api_token", json!("t-123"));
		tracker.set_extra("attempts", json!(2));
		tracker.capture_message("login", Severity::Info).await;

		let extra = transport.events()[0].extra.clone().unwrap();
		assert_eq!(extra["api_token"], "[Sanitized]");
		assert_eq!(extra["attempts"], 2);
	}

	#[tokio::test]
	async fn caller_key_matching_request_cookies_redacts_without_losing_event() {
		let transport = Arc::new(RecordingTransport::default());
		let mut tracker = tracker_with(transport.clone())
			.sensitive_keys(["cookie"])
			.build()
			.unwrap();

		tracker.set_request(Some(Request {
			url: Some("https://shop.example.com/cart".to_string()),
			cookies: Some([("sid".to_string(), "abc".to_string())].into_iter().collect()),
			..Default::default()
		}));
		let outcome = tracker.capture_message("cart failed", Severity::Error).await;

		assert!(matches!(outcome, CaptureOutcome::Delivered(_)));
		let payload = &transport.payloads()[0];
		assert_eq!(outcome.event_id(), Some(payload.event_id()));
		assert_eq!(payload["request"]["cookies"], "[Sanitized]");
		assert_eq!(payload["request"]["url"], "https://shop.example.com/cart");
		assert_eq!(payload["message"], "cart failed");
	}

	#[tokio::test]
	async fn caller_key_matching_breadcrumb_data_redacts_without_losing_event() {
		let transport = Arc::new(RecordingTransport::default());
		let mut tracker = tracker_with(transport.clone())
			.sensitive_keys(["data"])
			.build()
			.unwrap();

		let mut data = serde_json::Map::new();
		data.insert("path".to_string(), json!("/cart"));
		tracker.add_breadcrumb(crumb("/cart").with_data(data));
		let outcome = tracker.capture_message("cart failed", Severity::Error).await;

		assert!(matches!(outcome, CaptureOutcome::Delivered(_)));
		let payload = &transport.payloads()[0];
		assert_eq!(payload["breadcrumbs"][0]["data"], "[Sanitized]");
		assert_eq!(payload["breadcrumbs"][0]["message"], "/cart");
	}

	#[tokio::test]
	async fn shallow_depth_limit_still_delivers() {
		let transport = Arc::new(RecordingTransport::default());
		let mut tracker = tracker_with(transport.clone()).max_depth(2).build().unwrap();

		tracker.set_tag("region", "eu");
		let error = "x1".parse::<i64>().unwrap_err();
		let outcome = tracker.capture_exception(&error, Severity::Error).await;

		assert!(matches!(outcome, CaptureOutcome::Delivered(_)));
		let payload = &transport.payloads()[0];
		assert_eq!(payload["tags"]["region"], "eu");
		assert_eq!(payload["exception"]["values"], "[Max Depth Reached]");
		assert_eq!(payload["level"], "error");
	}

	#[tokio::test]
	async fn before_send_sees_and_rewrites_event() {
		let transport = Arc::new(RecordingTransport::default());
		let tracker = tracker_with(transport.clone())
			.before_send(|mut event| {
				event.message = event.message.map(|m| format!("[edited] {m}"));
				HookOutcome::Keep(event)
			})
			.build()
			.unwrap();

		tracker.capture_message("original", Severity::Info).await;

		assert_eq!(transport.events()[0].message.as_deref(), Some("[edited] original"));
	}

	#[tokio::test]
	async fn panicking_before_send_drops_event() {
		let transport = Arc::new(RecordingTransport::default());
		let tracker = tracker_with(transport.clone())
			.before_send(|_| panic!("hook bug"))
			.build()
			.unwrap();

		let outcome = tracker.capture_message("x", Severity::Info).await;

		assert_eq!(outcome, CaptureOutcome::FilteredByHook);
		assert!(transport.events().is_empty());
	}

	#[test]
	fn disabled_tracker_sends_nothing() {
		let transport = Arc::new(RecordingTransport::default());
		let tracker = tracker_with(transport.clone()).enabled(false).build().unwrap();

		let outcome = tokio_test::block_on(tracker.capture_message("x", Severity::Info));

		assert_eq!(outcome, CaptureOutcome::Disabled);
		assert!(transport.events().is_empty());
	}

	#[test]
	fn before_breadcrumb_can_rewrite_or_drop() {
		let transport = Arc::new(RecordingTransport::default());
		let mut tracker = tracker_with(transport)
			.before_breadcrumb(|crumb| {
				if crumb.message.as_deref() == Some("secret") {
					HookOutcome::Drop
				} else {
					HookOutcome::Keep(crumb.with_category("ui"))
				}
			})
			.build()
			.unwrap();

		tracker.add_breadcrumb(crumb("secret"));
		tracker.add_breadcrumb(crumb("/home"));

		let crumbs = tracker.breadcrumbs();
		assert_eq!(crumbs.len(), 1);
		assert_eq!(crumbs[0].message.as_deref(), Some("/home"));
		assert_eq!(crumbs[0].category.as_deref(), Some("ui"));
	}

	#[test]
	fn clear_context_also_clears_breadcrumbs() {
		let transport = Arc::new(RecordingTransport::default());
		let mut tracker = tracker_with(transport).build().unwrap();

		tracker.set_user(Some(User::with_id("1")));
		tracker.add_breadcrumb(crumb("/a"));
		tracker.clear_context();

		assert!(tracker.context_data().user.is_none());
		assert!(tracker.breadcrumbs().is_empty());
	}

	#[test]
	fn init_outside_runtime_is_a_no_op() {
		let transport = Arc::new(RecordingTransport::default());
		let mut tracker = tracker_with(transport).build().unwrap();

		tracker.init();
		assert!(!tracker.is_initialized());
	}

	#[tokio::test]
	async fn init_is_idempotent() {
		let transport = Arc::new(RecordingTransport::default());
		let mut tracker = tracker_with(transport).build().unwrap();

		tracker.init();
		tracker.init();
		assert!(tracker.is_initialized());
	}

	#[tokio::test]
	async fn flush_delegates_to_transport() {
		let transport = Arc::new(RecordingTransport::default());
		let tracker = tracker_with(transport).build().unwrap();

		assert!(tracker.flush(Duration::from_millis(10)).await);
		assert!(tracker.flush_default().await);
	}
}
