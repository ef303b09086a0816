// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backtrace capture and parsing into stack frames.

use std::backtrace::Backtrace;

use error_tracker_core::{Frame, Stacktrace};
use rustc_demangle::demangle;

/// Capture a backtrace at the call site, dropping the SDK's own frames.
pub fn capture_stacktrace() -> Stacktrace {
	let backtrace = Backtrace::force_capture();
	let mut stacktrace = parse_backtrace(&backtrace.to_string());

	let sdk_frames = stacktrace
		.frames
		.iter()
		.take_while(|frame| frame.function.as_deref().is_some_and(is_capture_machinery))
		.count();
	stacktrace.frames.drain(..sdk_frames);

	stacktrace
}

/// Parse rendered backtrace text into frames, innermost first.
///
/// Expects the std format: a numbered function line (`  3: path::to::fn`)
/// optionally followed by an `at file:line:col` location line.
pub fn parse_backtrace(rendered: &str) -> Stacktrace {
	let mut frames: Vec<Frame> = Vec::new();

	for line in rendered.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		if let Some(location) = line.strip_prefix("at ") {
			if let Some(frame) = frames.last_mut() {
				apply_location(frame, location);
			}
			continue;
		}

		if let Some(function) = strip_frame_number(line) {
			frames.push(function_frame(function));
		}
	}

	Stacktrace { frames }
}

/// Returns the text after a `N:` prefix, if the line has one.
fn strip_frame_number(line: &str) -> Option<&str> {
	let (number, rest) = line.split_once(':')?;
	number.trim().parse::<u32>().ok()?;
	let rest = rest.trim();
	(!rest.is_empty()).then_some(rest)
}

fn function_frame(raw: &str) -> Frame {
	let function = strip_hash(&format!("{:#}", demangle(raw))).to_string();

	// "my_app::handlers::process" -> "my_app::handlers"
	let module = function
		.rfind("::")
		.filter(|_| !function.starts_with('<'))
		.map(|idx| function[..idx].to_string());

	Frame {
		in_app: is_in_app_frame(&function),
		function: Some(function),
		module,
		..Default::default()
	}
}

/// Fills file/line/column from `path/to/file.rs:12:5`.
fn apply_location(frame: &mut Frame, location: &str) {
	let mut parts = location.rsplitn(3, ':');
	let col = parts.next();
	let line = parts.next();
	let file = parts.next();

	match (file, line, col) {
		(Some(file), Some(line), Some(col)) => {
			frame.filename = Some(file.to_string());
			frame.lineno = line.parse().ok();
			frame.colno = col.parse().ok();
		}
		_ => frame.filename = Some(location.to_string()),
	}
}

/// Drops a trailing `::h0123456789abcdef` symbol hash.
fn strip_hash(function: &str) -> &str {
	match function.rsplit_once("::h") {
		Some((head, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => {
			head
		}
		_ => function,
	}
}

/// Frames belonging to backtrace capture or to this SDK.
fn is_capture_machinery(function: &str) -> bool {
	const PREFIXES: &[&str] = &[
		"std::backtrace",
		"<std::backtrace",
		"std::backtrace_rs",
		"error_tracker::",
		"<error_tracker::",
	];

	PREFIXES.iter().any(|prefix| function.starts_with(prefix))
}

/// Determine if a frame is from application code rather than std or runtimes.
fn is_in_app_frame(function: &str) -> bool {
	const SYSTEM_PREFIXES: &[&str] = &[
		"std::",
		"core::",
		"alloc::",
		"<std::",
		"<core::",
		"<alloc::",
		"tokio::",
		"<tokio::",
		"futures::",
		"<futures::",
		"futures_util::",
		"<futures_util::",
		"async_trait::",
		"tracing::",
		"<tracing::",
		"error_tracker::",
		"<error_tracker::",
		"rust_begin_unwind",
		"__rust_",
		"_start",
		"__libc_start",
	];

	const SYSTEM_CONTAINS: &[&str] = &["::panicking::", "::rt::", "::sys_common::"];

	if SYSTEM_PREFIXES.iter().any(|prefix| function.starts_with(prefix)) {
		return false;
	}

	!SYSTEM_CONTAINS.iter().any(|needle| function.contains(needle))
}
