// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the tracker SDK.

use thiserror::Error;

/// Result type alias for tracker construction.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors that can occur while configuring a tracker.
///
/// Capture operations never return these; only construction fails loudly.
#[derive(Debug, Error)]
pub enum TrackerError {
	/// No endpoint identifier was configured.
	#[error("DSN is required")]
	MissingDsn,

	/// The endpoint identifier is not a usable URL.
	#[error("invalid DSN {dsn:?}: {reason}")]
	InvalidDsn {
		/// The rejected DSN.
		dsn: String,
		/// Why it was rejected.
		reason: String,
	},

	/// A configuration value could not be parsed.
	#[error("invalid configuration value for {key}: {value:?}")]
	InvalidConfig {
		/// Environment variable or option name.
		key: String,
		/// The offending value.
		value: String,
	},

	/// Failed to build the HTTP client.
	#[error("failed to build HTTP client: {0}")]
	HttpClient(#[from] reqwest::Error),

	/// Failed to serialize an event.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Errors reported by a transport for a single delivery attempt.
///
/// Every variant is treated the same by the tracker: the event goes to the
/// retry queue.
#[derive(Debug, Error)]
pub enum TransportError {
	/// HTTP request failed before a response was received.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Endpoint answered with a non-success status.
	#[error("server error (status {status}): {message}")]
	ServerError {
		/// HTTP status code.
		status: u16,
		/// Response body, if any.
		message: String,
	},

	/// The attempt did not finish in time.
	#[error("delivery timed out")]
	Timeout,

	/// Failed to serialize the event.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// Writing to a local sink failed.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// The transport panicked while sending.
	#[error("transport panicked during send")]
	Panicked,

	/// A custom transport refused the event.
	#[error("delivery rejected: {0}")]
	Rejected(String),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn invalid_dsn_message_names_the_dsn() {
		let err = TrackerError::InvalidDsn {
			dsn: "ftp://x".to_string(),
			reason: "unsupported scheme".to_string(),
		};
		assert_eq!(err.to_string(), "invalid DSN \"ftp://x\": unsupported scheme");
	}

	#[test]
	fn server_error_message_includes_status() {
		let err = TransportError::ServerError {
			status: 503,
			message: "unavailable".to_string(),
		};
		assert_eq!(err.to_string(), "server error (status 503): unavailable");
	}
}
