// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the error tracker SDK.
//!
//! This crate holds the data model that crosses the wire: the [`ErrorEvent`]
//! with its exceptions, breadcrumbs and context snapshots. It carries no
//! delivery logic; the `error-tracker` crate builds, filters, sanitizes and
//! delivers these types.
//!
//! # Overview
//!
//! - [`ErrorEvent`] is the unit of delivery, identified by an [`EventId`]
//! - [`EventPayload`] is an event's sanitized wire form
//! - [`Exception`] values are grouped in an [`ExceptionList`], most recent last
//! - [`Breadcrumb`] entries record the trail leading up to an event
//! - [`User`], [`Request`] and [`Contexts`] describe where the event happened

pub mod breadcrumb;
pub mod context;
pub mod error;
pub mod event;

pub use breadcrumb::{Breadcrumb, BreadcrumbLevel, BreadcrumbType};
pub use context::{Contexts, OsContext, Request, RuntimeContext, User};
pub use error::{CoreError, Result};
pub use event::{
	now_timestamp, ErrorEvent, EventId, EventPayload, Exception, ExceptionList, Frame, Mechanism,
	SdkInfo, Severity, Stacktrace,
};
