// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracker configuration and its builder.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use error_tracker_core::{Breadcrumb, ErrorEvent};
use reqwest::Url;
use tracing::debug;

use crate::breadcrumbs::DEFAULT_MAX_BREADCRUMBS;
use crate::error::{Result, TrackerError};
use crate::hooks::{BeforeBreadcrumb, BeforeSend, HookOutcome};
use crate::queue::{DEFAULT_MAX_QUEUE_SIZE, DEFAULT_MAX_RETRIES};
use crate::sanitizer::{Sanitizer, DEFAULT_MAX_DEPTH};
use crate::tracker::Tracker;
use crate::transport::{
	ConsoleTransport, HttpTransport, SharedTransport, CONSOLE_DSN, DEFAULT_HTTP_TIMEOUT,
};

const DEFAULT_ENVIRONMENT: &str = "production";
const UNKNOWN_SERVER: &str = "unknown";

pub const ENV_DSN: &str = "ERROR_TRACKER_DSN";
pub const ENV_ENVIRONMENT: &str = "ERROR_TRACKER_ENVIRONMENT";
pub const ENV_RELEASE: &str = "ERROR_TRACKER_RELEASE";
pub const ENV_SERVER_NAME: &str = "ERROR_TRACKER_SERVER_NAME";
pub const ENV_SAMPLE_RATE: &str = "ERROR_TRACKER_SAMPLE_RATE";
pub const ENV_MAX_BREADCRUMBS: &str = "ERROR_TRACKER_MAX_BREADCRUMBS";
pub const ENV_MAX_QUEUE_SIZE: &str = "ERROR_TRACKER_MAX_QUEUE_SIZE";
pub const ENV_ENABLED: &str = "ERROR_TRACKER_ENABLED";

/// Resolved, immutable tracker settings.
#[derive(Clone)]
pub struct TrackerConfig {
	pub dsn: String,
	pub environment: String,
	pub release: Option<String>,
	pub server_name: String,
	pub max_breadcrumbs: usize,
	pub max_queue_size: usize,
	pub max_retries: u32,
	/// Fraction of captures kept, in `[0, 1]`.
	pub sample_rate: f64,
	pub enabled: bool,
	/// Caller extensions; always merged with the built-in sensitive keys.
	pub sensitive_keys: Vec<String>,
	pub max_depth: usize,
	pub http_timeout: Duration,
	/// Upper bound on the retry wait. `None` leaves `2^retries` uncapped.
	pub max_backoff: Option<Duration>,
	pub before_send: Option<BeforeSend>,
	pub before_breadcrumb: Option<BeforeBreadcrumb>,
}

impl TrackerConfig {
	pub fn is_console(&self) -> bool {
		self.dsn.trim() == CONSOLE_DSN
	}

	pub fn sanitizer(&self) -> Sanitizer {
		Sanitizer::new(&self.sensitive_keys, self.max_depth)
	}
}

impl fmt::Debug for TrackerConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TrackerConfig")
			.field("dsn", &self.dsn)
			.field("environment", &self.environment)
			.field("release", &self.release)
			.field("server_name", &self.server_name)
			.field("max_breadcrumbs", &self.max_breadcrumbs)
			.field("max_queue_size", &self.max_queue_size)
			.field("max_retries", &self.max_retries)
			.field("sample_rate", &self.sample_rate)
			.field("enabled", &self.enabled)
			.field("sensitive_keys", &self.sensitive_keys)
			.field("max_depth", &self.max_depth)
			.field("http_timeout", &self.http_timeout)
			.field("max_backoff", &self.max_backoff)
			.field("before_send", &self.before_send.is_some())
			.field("before_breadcrumb", &self.before_breadcrumb.is_some())
			.finish()
	}
}

/// Builder for constructing a [`Tracker`].
///
/// ```no_run
/// # use error_tracker::Tracker;
/// let tracker = Tracker::builder()
///     .dsn("https://errors.example.com/api/events")
///     .environment("staging")
///     .release("1.4.2")
///     .sample_rate(0.5)
///     .build()?;
/// # Ok::<(), error_tracker::TrackerError>(())
/// ```
pub struct TrackerBuilder {
	dsn: Option<String>,
	environment: Option<String>,
	release: Option<String>,
	server_name: Option<String>,
	max_breadcrumbs: usize,
	max_queue_size: usize,
	max_retries: u32,
	sample_rate: f64,
	enabled: bool,
	sensitive_keys: Vec<String>,
	max_depth: usize,
	http_timeout: Duration,
	max_backoff: Option<Duration>,
	http_headers: Vec<(String, String)>,
	transport: Option<SharedTransport>,
	before_send: Option<BeforeSend>,
	before_breadcrumb: Option<BeforeBreadcrumb>,
}

impl TrackerBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			dsn: None,
			environment: None,
			release: None,
			server_name: None,
			max_breadcrumbs: DEFAULT_MAX_BREADCRUMBS,
			max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
			max_retries: DEFAULT_MAX_RETRIES,
			sample_rate: 1.0,
			enabled: true,
			sensitive_keys: Vec::new(),
			max_depth: DEFAULT_MAX_DEPTH,
			http_timeout: DEFAULT_HTTP_TIMEOUT,
			max_backoff: None,
			http_headers: Vec::new(),
			transport: None,
			before_send: None,
			before_breadcrumb: None,
		}
	}

	/// Seeds a builder from `ERROR_TRACKER_*` environment variables.
	///
	/// Unset variables keep their defaults; values that fail to parse are
	/// reported as [`TrackerError::InvalidConfig`].
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
		let mut builder = Self::new();

		if let Some(dsn) = lookup(ENV_DSN) {
			builder = builder.dsn(dsn);
		}
		if let Some(environment) = lookup(ENV_ENVIRONMENT) {
			builder = builder.environment(environment);
		}
		if let Some(release) = lookup(ENV_RELEASE) {
			builder = builder.release(release);
		}
		if let Some(server_name) = lookup(ENV_SERVER_NAME) {
			builder = builder.server_name(server_name);
		}
		if let Some(rate) = parse_var::<f64>(&lookup, ENV_SAMPLE_RATE)? {
			builder = builder.sample_rate(rate);
		}
		if let Some(max) = parse_var::<usize>(&lookup, ENV_MAX_BREADCRUMBS)? {
			builder = builder.max_breadcrumbs(max);
		}
		if let Some(max) = parse_var::<usize>(&lookup, ENV_MAX_QUEUE_SIZE)? {
			builder = builder.max_queue_size(max);
		}
		if let Some(raw) = lookup(ENV_ENABLED) {
			builder = builder.enabled(parse_bool(ENV_ENABLED, &raw)?);
		}

		Ok(builder)
	}

	/// Sets the endpoint. `console://` selects the console sink.
	pub fn dsn(mut self, dsn: impl Into<String>) -> Self {
		self.dsn = Some(dsn.into());
		self
	}

	/// Example: `production`, `staging`, `development`
	pub fn environment(mut self, environment: impl Into<String>) -> Self {
		self.environment = Some(environment.into());
		self
	}

	pub fn release(mut self, release: impl Into<String>) -> Self {
		self.release = Some(release.into());
		self
	}

	/// Overrides the host name reported with each event.
	pub fn server_name(mut self, name: impl Into<String>) -> Self {
		self.server_name = Some(name.into());
		self
	}

	pub fn max_breadcrumbs(mut self, max: usize) -> Self {
		self.max_breadcrumbs = max;
		self
	}

	pub fn max_queue_size(mut self, max: usize) -> Self {
		self.max_queue_size = max;
		self
	}

	pub fn max_retries(mut self, max: u32) -> Self {
		self.max_retries = max;
		self
	}

	/// Sets the sample rate, clamped to `[0.0, 1.0]`. NaN counts as 0.
	pub fn sample_rate(mut self, rate: f64) -> Self {
		self.sample_rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
		self
	}

	/// Disabled trackers accept every call and send nothing.
	pub fn enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;
		self
	}

	/// Adds key substrings to redact on top of the built-in list.
	pub fn sensitive_keys<I, S>(mut self, keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.sensitive_keys.extend(keys.into_iter().map(Into::into));
		self
	}

	pub fn max_depth(mut self, depth: usize) -> Self {
		self.max_depth = depth;
		self
	}

	/// Per-request timeout for the HTTP sink.
	pub fn http_timeout(mut self, timeout: Duration) -> Self {
		self.http_timeout = timeout;
		self
	}

	/// Adds a header sent with every HTTP request.
	pub fn http_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.http_headers.push((name.into(), value.into()));
		self
	}

	/// Caps the wait between retry attempts.
	pub fn max_backoff(mut self, cap: Duration) -> Self {
		self.max_backoff = Some(cap);
		self
	}

	/// Uses `transport` instead of the sink implied by the DSN.
	pub fn transport(mut self, transport: SharedTransport) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn before_send<F>(mut self, hook: F) -> Self
	where
		F: Fn(ErrorEvent) -> HookOutcome<ErrorEvent> + Send + Sync + 'static,
	{
		self.before_send = Some(Arc::new(hook));
		self
	}

	pub fn before_breadcrumb<F>(mut self, hook: F) -> Self
	where
		F: Fn(Breadcrumb) -> HookOutcome<Breadcrumb> + Send + Sync + 'static,
	{
		self.before_breadcrumb = Some(Arc::new(hook));
		self
	}

	/// Validates the settings and builds the tracker.
	///
	/// Transport selection: an explicit override, then the console sink for
	/// `console://`, then HTTP to the DSN.
	pub fn build(self) -> Result<Tracker> {
		let dsn = self
			.dsn
			.map(|dsn| dsn.trim().to_string())
			.filter(|dsn| !dsn.is_empty())
			.ok_or(TrackerError::MissingDsn)?;

		let config = TrackerConfig {
			dsn,
			environment: self
				.environment
				.unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
			release: self.release,
			server_name: self.server_name.unwrap_or_else(default_server_name),
			max_breadcrumbs: self.max_breadcrumbs,
			max_queue_size: self.max_queue_size,
			max_retries: self.max_retries,
			sample_rate: self.sample_rate,
			enabled: self.enabled,
			sensitive_keys: self.sensitive_keys,
			max_depth: self.max_depth,
			http_timeout: self.http_timeout,
			max_backoff: self.max_backoff,
			before_send: self.before_send,
			before_breadcrumb: self.before_breadcrumb,
		};

		let transport: SharedTransport = match self.transport {
			Some(transport) => transport,
			None if config.is_console() => Arc::new(ConsoleTransport::new()),
			None => {
				validate_http_dsn(&config.dsn)?;
				Arc::new(
					self.http_headers
						.into_iter()
						.fold(HttpTransport::builder(&config.dsn), |builder, (name, value)| {
							builder.header(name, value)
						})
						.timeout(config.http_timeout)
						.sanitizer(config.sanitizer())
						.build()?,
				)
			}
		};

		debug!(
			transport = transport.name(),
			environment = %config.environment,
			sample_rate = config.sample_rate,
			"Built error tracker"
		);

		Ok(Tracker::new(config, transport))
	}
}

impl Default for TrackerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn default_server_name() -> String {
	hostname::get()
		.ok()
		.and_then(|name| name.into_string().ok())
		.unwrap_or_else(|| UNKNOWN_SERVER.to_string())
}

fn validate_http_dsn(dsn: &str) -> Result<()> {
	let invalid = |reason: String| TrackerError::InvalidDsn {
		dsn: dsn.to_string(),
		reason,
	};

	let url = Url::parse(dsn).map_err(|e| invalid(e.to_string()))?;
	match url.scheme() {
		"http" | "https" => Ok(()),
		other => Err(invalid(format!("unsupported scheme '{other}'"))),
	}
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
	lookup(key)
		.map(|raw| {
			raw.trim().parse::<T>().map_err(|_| TrackerError::InvalidConfig {
				key: key.to_string(),
				value: raw,
			})
		})
		.transpose()
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
	match raw.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(TrackerError::InvalidConfig {
			key: key.to_string(),
			value: raw.to_string(),
		}),
	}
}
