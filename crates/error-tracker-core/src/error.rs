// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the core event model.

use thiserror::Error;

/// Errors raised while parsing or converting core types.
#[derive(Debug, Error)]
pub enum CoreError {
	#[error("invalid severity: {0}")]
	InvalidSeverity(String),

	#[error("invalid breadcrumb type: {0}")]
	InvalidBreadcrumbType(String),

	#[error("invalid breadcrumb level: {0}")]
	InvalidBreadcrumbLevel(String),

	#[error("invalid event id: {0}")]
	InvalidEventId(#[from] uuid::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
