// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Embedder hooks that can rewrite or drop events and breadcrumbs.

use std::sync::Arc;

use error_tracker_core::{Breadcrumb, ErrorEvent};

/// What a hook decided to do with a value.
///
/// `Drop` is the only way to discard; any `Keep` value, altered or not,
/// replaces the original.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome<T> {
	Keep(T),
	Drop,
}

/// Runs on every event before it is sanitized and sent.
pub type BeforeSend = Arc<dyn Fn(ErrorEvent) -> HookOutcome<ErrorEvent> + Send + Sync>;

/// Runs on every breadcrumb before it is stored.
pub type BeforeBreadcrumb = Arc<dyn Fn(Breadcrumb) -> HookOutcome<Breadcrumb> + Send + Sync>;
