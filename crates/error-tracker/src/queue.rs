// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded FIFO of events waiting for redelivery.
//!
//! The queue lives in memory only; its contents are lost when the process
//! exits.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use error_tracker_core::EventPayload;
use tracing::warn;

/// Default queue capacity.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;
/// Default retry budget per item.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Identity of a queued item, unique within one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueItemId(u64);

/// An already-sanitized event awaiting redelivery.
#[derive(Debug, Clone)]
pub struct QueueItem {
	pub id: QueueItemId,
	pub payload: Arc<EventPayload>,
	pub enqueued_at: DateTime<Utc>,
	pub retries: u32,
}

/// FIFO with drop-oldest overflow and per-item retry accounting.
#[derive(Debug)]
pub struct QueueManager {
	max_queue_size: usize,
	max_retries: u32,
	next_id: u64,
	items: VecDeque<QueueItem>,
}

impl Default for QueueManager {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_QUEUE_SIZE, DEFAULT_MAX_RETRIES)
	}
}

impl QueueManager {
	pub fn new(max_queue_size: usize, max_retries: u32) -> Self {
		Self {
			max_queue_size,
			max_retries,
			next_id: 0,
			items: VecDeque::new(),
		}
	}

	/// Appends `payload` with a zero retry count, dropping the oldest items
	/// if the queue is over capacity. Returns the new item's id.
	pub fn add(&mut self, payload: EventPayload) -> QueueItemId {
		let id = QueueItemId(self.next_id);
		self.next_id += 1;

		self.items.push_back(QueueItem {
			id,
			payload: Arc::new(payload),
			enqueued_at: Utc::now(),
			retries: 0,
		});

		while self.items.len() > self.max_queue_size {
			if let Some(dropped) = self.items.pop_front() {
				warn!(
					event_id = %dropped.payload.event_id(),
					retries = dropped.retries,
					"Dropped queued event due to queue overflow"
				);
			}
		}

		id
	}

	/// Peeks at the head without removing it.
	pub fn get_next(&self) -> Option<&QueueItem> {
		self.items.front()
	}

	pub fn get(&self, id: QueueItemId) -> Option<&QueueItem> {
		self.items.iter().find(|item| item.id == id)
	}

	/// Removes the item with `id`, returning it if it was still queued.
	pub fn remove(&mut self, id: QueueItemId) -> Option<QueueItem> {
		let index = self.items.iter().position(|item| item.id == id)?;
		self.items.remove(index)
	}

	/// Counts a failed attempt for `id`.
	///
	/// Returns `false` and removes the item once its count exceeds the retry
	/// budget; returns `true` while it may be retried. Unknown ids report
	/// `false`.
	pub fn increment_retry(&mut self, id: QueueItemId) -> bool {
		let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
			return false;
		};

		item.retries += 1;
		if item.retries > self.max_retries {
			self.remove(id);
			return false;
		}

		true
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn clear(&mut self) {
		self.items.clear();
	}

	pub fn max_retries(&self) -> u32 {
		self.max_retries
	}
}
