// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error tracking SDK.
//!
//! The [`Tracker`] captures errors and messages, enriches them with the
//! current user, request, tags, extras and breadcrumbs, runs embedder hooks,
//! strips sensitive fields and hands the result to a [`Transport`]. Failed
//! deliveries go to a bounded retry queue drained in the background with
//! exponential backoff. Capture calls never fail.
//!
//! # Example
//!
//! ```no_run
//! use error_tracker::{Breadcrumb, BreadcrumbLevel, BreadcrumbType, Severity, Tracker, User};
//!
//! # async fn run() -> Result<(), error_tracker::TrackerError> {
//! let mut tracker = Tracker::builder()
//!     .dsn("https://errors.example.com/api/events")
//!     .release(env!("CARGO_PKG_VERSION"))
//!     .build()?;
//! tracker.init();
//!
//! tracker.set_user(Some(User::with_id("42")));
//! tracker.add_breadcrumb(
//!     Breadcrumb::new(BreadcrumbType::Navigation, BreadcrumbLevel::Info).with_message("/checkout"),
//! );
//!
//! if let Err(e) = "abc".parse::<u32>() {
//!     tracker.capture_exception(&e, Severity::Error).await;
//! }
//! tracker.flush_default().await;
//! # Ok(())
//! # }
//! ```

mod backtrace;
mod breadcrumbs;
mod config;
mod context;
mod error;
mod exception;
mod hooks;
mod queue;
mod retry;
mod sanitizer;
mod tracker;
pub mod transport;

pub use backtrace::{capture_stacktrace, parse_backtrace};
pub use breadcrumbs::{BreadcrumbManager, DEFAULT_MAX_BREADCRUMBS};
pub use config::{
	TrackerBuilder, TrackerConfig, ENV_DSN, ENV_ENABLED, ENV_ENVIRONMENT, ENV_MAX_BREADCRUMBS,
	ENV_MAX_QUEUE_SIZE, ENV_RELEASE, ENV_SAMPLE_RATE, ENV_SERVER_NAME,
};
pub use context::{ContextData, ContextManager};
pub use error::{Result, TrackerError, TransportError};
pub use exception::exceptions_from_error;
pub use hooks::{BeforeBreadcrumb, BeforeSend, HookOutcome};
pub use queue::{QueueItem, QueueItemId, QueueManager, DEFAULT_MAX_QUEUE_SIZE, DEFAULT_MAX_RETRIES};
pub use retry::{backoff_delay, QueueStats};
pub use sanitizer::{
	sanitize, Sanitizer, DEFAULT_MAX_DEPTH, DEFAULT_SENSITIVE_KEYS, MAX_DEPTH_REACHED, SANITIZED,
};
pub use tracker::{CaptureOutcome, Tracker, DEFAULT_FLUSH_TIMEOUT, PLATFORM, SDK_NAME, SDK_VERSION};
pub use transport::{
	ConsoleTransport, HttpTransport, HttpTransportBuilder, SharedTransport, Transport, CONSOLE_DSN,
};

pub use error_tracker_core::{
	Breadcrumb, BreadcrumbLevel, BreadcrumbType, Contexts, ErrorEvent, EventId, EventPayload,
	Exception, ExceptionList, Frame, Mechanism, OsContext, Request, RuntimeContext, SdkInfo,
	Severity, Stacktrace, User,
};
