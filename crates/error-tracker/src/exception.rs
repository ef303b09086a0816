// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Conversion of Rust errors into wire exceptions.

use std::any::type_name;
use std::error::Error;

use error_tracker_core::{Exception, Mechanism, Stacktrace};

use crate::backtrace::capture_stacktrace;

/// Builds the exception list for `error` and its `source()` chain.
///
/// The root cause comes first and `error` itself last. Only the outermost
/// exception carries the call-site stacktrace and the mechanism.
pub fn exceptions_from_error<E>(error: &E) -> Vec<Exception>
where
	E: Error + ?Sized,
{
	exceptions_with_stacktrace(error, capture_stacktrace())
}

pub(crate) fn exceptions_with_stacktrace<E>(error: &E, stacktrace: Stacktrace) -> Vec<Exception>
where
	E: Error + ?Sized,
{
	let mut outermost = Exception::new(
		static_type_name::<E>().unwrap_or_else(|| debug_type_name(error)),
		error.to_string(),
	);
	outermost.mechanism = Some(Mechanism::handled());
	if !stacktrace.is_empty() {
		outermost.stacktrace = Some(stacktrace);
	}

	let mut chain = Vec::new();
	let mut source = error.source();
	while let Some(cause) = source {
		chain.push(Exception::new(debug_type_name(cause), cause.to_string()));
		source = cause.source();
	}

	chain.reverse();
	chain.push(outermost);
	chain
}

/// Short name of `E`, or `None` for trait objects.
fn static_type_name<E: ?Sized>() -> Option<String> {
	let full = type_name::<E>();
	if full.starts_with("dyn ") || full.starts_with('&') {
		return None;
	}
	Some(short_type_name(full).to_string())
}

/// "std::num::ParseIntError" -> "ParseIntError", generics dropped.
fn short_type_name(full: &str) -> &str {
	let base = full.split('<').next().unwrap_or(full);
	base.rsplit("::").next().unwrap_or(base)
}

/// Leading identifier of the `Debug` rendering, e.g. `ParseIntError { .. }`.
fn debug_type_name(error: &(impl Error + ?Sized)) -> String {
	let rendered = format!("{error:?}");
	let ident: String = rendered
		.chars()
		.take_while(|c| c.is_alphanumeric() || *c == '_')
		.collect();

	match ident.chars().next() {
		Some(first) if first.is_alphabetic() => ident,
		_ => "Error".to_string(),
	}
}
