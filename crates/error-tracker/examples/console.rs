// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: Capture events with the console sink.
//!
//! Run with:
//!   cargo run --example console -p error-tracker
//!
//! Set `ERROR_TRACKER_DSN` to an HTTP endpoint to send events there instead.

use std::fmt;

use error_tracker::{
	Breadcrumb, BreadcrumbLevel, BreadcrumbType, HookOutcome, Request, Severity, Tracker,
	TrackerBuilder, User, CONSOLE_DSN, ENV_DSN,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct CheckoutError {
	source: std::num::ParseIntError,
}

impl fmt::Display for CheckoutError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "checkout failed: bad quantity")
	}
}

impl std::error::Error for CheckoutError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(&self.source)
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error_tracker=debug")),
		)
		.init();

	let mut builder = TrackerBuilder::from_env()?;
	if std::env::var(ENV_DSN).is_err() {
		builder = builder.dsn(CONSOLE_DSN);
	}

	let mut tracker: Tracker = builder
		.environment("development")
		.release("0.1.0-example")
		.before_breadcrumb(|crumb| {
			if crumb.category.as_deref() == Some("healthcheck") {
				HookOutcome::Drop
			} else {
				HookOutcome::Keep(crumb)
			}
		})
		.build()?;
	tracker.init();

	println!("Transport: {}", tracker.transport_name());

	tracker.set_user(Some(User {
		id: Some("user_example_123".to_string()),
		email: Some("example@example.com".to_string()),
		username: Some("example_user".to_string()),
		..Default::default()
	}));
	tracker.set_tag("example", "true");
	tracker.set_extra("cart", json!({ "items": 3, "coupon_token": "SAVE10" }));
	tracker.set_request(Some(Request {
		url: Some("https://shop.example.com/checkout".to_string()),
		method: Some("POST".to_string()),
		..Default::default()
	}));

	tracker.add_breadcrumb(
		Breadcrumb::new(BreadcrumbType::Navigation, BreadcrumbLevel::Info)
			.with_category("router")
			.with_message("/cart -> /checkout"),
	);
	tracker.add_breadcrumb(
		Breadcrumb::new(BreadcrumbType::Http, BreadcrumbLevel::Debug)
			.with_category("healthcheck")
			.with_message("GET /health"),
	);

	let outcome = tracker.capture_message("boot ok", Severity::Info).await;
	println!("Message: {outcome:?}");

	if let Err(source) = "three".parse::<u32>() {
		let error = CheckoutError { source };
		let outcome = tracker.capture_exception(&error, Severity::Error).await;
		println!("Exception: {outcome:?}");
	}

	tracker.clear_context();
	let flushed = tracker.flush_default().await;
	println!("Flushed: {flushed}");

	Ok(())
}
