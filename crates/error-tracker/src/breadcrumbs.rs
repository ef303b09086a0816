// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded buffer of recent breadcrumbs.

use std::collections::VecDeque;

use error_tracker_core::{now_timestamp, Breadcrumb};

/// Default number of breadcrumbs to keep.
pub const DEFAULT_MAX_BREADCRUMBS: usize = 100;

/// Keeps the most recent `max_breadcrumbs` entries in insertion order.
#[derive(Debug, Clone)]
pub struct BreadcrumbManager {
	max_breadcrumbs: usize,
	breadcrumbs: VecDeque<Breadcrumb>,
}

impl Default for BreadcrumbManager {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_BREADCRUMBS)
	}
}

impl BreadcrumbManager {
	pub fn new(max_breadcrumbs: usize) -> Self {
		Self {
			max_breadcrumbs,
			breadcrumbs: VecDeque::with_capacity(max_breadcrumbs.min(DEFAULT_MAX_BREADCRUMBS)),
		}
	}

	/// Stamps `breadcrumb` with the current time and appends it, evicting the
	/// oldest entries when over capacity.
	pub fn add(&mut self, mut breadcrumb: Breadcrumb) {
		breadcrumb.timestamp = Some(now_timestamp());
		self.breadcrumbs.push_back(breadcrumb);

		while self.breadcrumbs.len() > self.max_breadcrumbs {
			self.breadcrumbs.pop_front();
		}
	}

	/// Copy of the buffer, oldest first.
	pub fn get_all(&self) -> Vec<Breadcrumb> {
		self.breadcrumbs.iter().cloned().collect()
	}

	pub fn clear(&mut self) {
		self.breadcrumbs.clear();
	}

	pub fn count(&self) -> usize {
		self.breadcrumbs.len()
	}

	pub fn max_breadcrumbs(&self) -> usize {
		self.max_breadcrumbs
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use error_tracker_core::{BreadcrumbLevel, BreadcrumbType};
	use proptest::prelude::*;

	fn crumb(n: usize) -> Breadcrumb {
		Breadcrumb::new(BreadcrumbType::Custom, BreadcrumbLevel::Info).with_message(format!("step {n}"))
	}

	#[test]
	fn add_stamps_timestamp() {
		let mut manager = BreadcrumbManager::new(10);
		manager.add(crumb(0));

		let all = manager.get_all();
		assert_eq!(all.len(), 1);
		assert!(all[0].timestamp.is_some());
	}

	#[test]
	fn add_overrides_preset_timestamp() {
		let mut manager = BreadcrumbManager::new(10);
		let mut preset = crumb(0);
		preset.timestamp = Some(1.0);
		manager.add(preset);

		assert!(manager.get_all()[0].timestamp.unwrap() > 1.0);
	}

	#[test]
	fn keeps_most_recent_entries() {
		let mut manager = BreadcrumbManager::new(5);
		for i in 0..10 {
			manager.add(crumb(i));
		}

		let all = manager.get_all();
		assert_eq!(manager.count(), 5);
		assert_eq!(all[0].message.as_deref(), Some("step 5"));
		assert_eq!(all[4].message.as_deref(), Some("step 9"));
	}

	#[test]
	fn zero_capacity_keeps_nothing() {
		let mut manager = BreadcrumbManager::new(0);
		manager.add(crumb(0));
		assert_eq!(manager.count(), 0);
	}

	#[test]
	fn clear_empties_buffer() {
		let mut manager = BreadcrumbManager::new(5);
		manager.add(crumb(0));
		manager.clear();
		assert_eq!(manager.count(), 0);
		assert!(manager.get_all().is_empty());
	}

	#[test]
	fn get_all_is_a_copy() {
		let mut manager = BreadcrumbManager::new(5);
		manager.add(crumb(0));

		let mut copy = manager.get_all();
		copy.clear();

		assert_eq!(manager.count(), 1);
	}

	proptest! {
		#[test]
		fn retains_tail_in_order(max in 0usize..20, total in 0usize..60) {
			let mut manager = BreadcrumbManager::new(max);
			for i in 0..total {
				manager.add(crumb(i));
			}

			let kept: Vec<String> = manager
				.get_all()
				.into_iter()
				.map(|b| b.message.unwrap())
				.collect();
			let expected: Vec<String> = (total.saturating_sub(max)..total)
				.map(|i| format!("step {i}"))
				.collect();
			prop_assert_eq!(kept, expected);
		}
	}
}
