// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Breadcrumb types (the diagnostic trail leading up to an event).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A record of something that happened before an event was captured.
///
/// Breadcrumbs are built without a timestamp; the breadcrumb buffer stamps
/// them at insertion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
	#[serde(rename = "type")]
	pub kind: BreadcrumbType,
	pub level: BreadcrumbLevel,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<serde_json::Map<String, serde_json::Value>>,
	/// Seconds since the Unix epoch, set on insertion.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<f64>,
}

impl Breadcrumb {
	pub fn new(kind: BreadcrumbType, level: BreadcrumbLevel) -> Self {
		Self {
			kind,
			level,
			message: None,
			category: None,
			data: None,
			timestamp: None,
		}
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}

	pub fn with_category(mut self, category: impl Into<String>) -> Self {
		self.category = Some(category.into());
		self
	}

	pub fn with_data(mut self, data: serde_json::Map<String, serde_json::Value>) -> Self {
		self.data = Some(data);
		self
	}
}

impl Default for Breadcrumb {
	fn default() -> Self {
		Self::new(BreadcrumbType::Custom, BreadcrumbLevel::Info)
	}
}

/// What kind of occurrence a breadcrumb records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreadcrumbType {
	Navigation,
	User,
	Http,
	Console,
	Custom,
}

impl fmt::Display for BreadcrumbType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Navigation => write!(f, "navigation"),
			Self::User => write!(f, "user"),
			Self::Http => write!(f, "http"),
			Self::Console => write!(f, "console"),
			Self::Custom => write!(f, "custom"),
		}
	}
}

impl FromStr for BreadcrumbType {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"navigation" => Ok(Self::Navigation),
			"user" => Ok(Self::User),
			"http" => Ok(Self::Http),
			"console" => Ok(Self::Console),
			"custom" => Ok(Self::Custom),
			_ => Err(CoreError::InvalidBreadcrumbType(s.to_string())),
		}
	}
}

/// Severity level of a breadcrumb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreadcrumbLevel {
	Debug,
	Info,
	Warning,
	Error,
	Fatal,
}

impl fmt::Display for BreadcrumbLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Debug => write!(f, "debug"),
			Self::Info => write!(f, "info"),
			Self::Warning => write!(f, "warning"),
			Self::Error => write!(f, "error"),
			Self::Fatal => write!(f, "fatal"),
		}
	}
}

impl FromStr for BreadcrumbLevel {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"debug" => Ok(Self::Debug),
			"info" => Ok(Self::Info),
			"warning" => Ok(Self::Warning),
			"error" => Ok(Self::Error),
			"fatal" => Ok(Self::Fatal),
			_ => Err(CoreError::InvalidBreadcrumbLevel(s.to_string())),
		}
	}
}
