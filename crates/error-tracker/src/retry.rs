// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background drain of the retry queue.
//!
//! A single task owns the [`QueueManager`]. Failed events arrive over an
//! unbounded channel; the task retries the head of the queue one attempt at
//! a time, waiting `2^retries` seconds before each attempt.

use std::sync::Arc;
use std::time::Duration;

use error_tracker_core::EventPayload;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::queue::QueueManager;
use crate::transport::{deliver, SharedTransport};

/// Snapshot of the retry queue, published after every queue mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
	/// Number of queued events.
	pub len: usize,
	/// Failed attempts recorded for the head item.
	pub head_retries: Option<u32>,
}

/// Wait before the next attempt on an item that has failed `retries` times.
pub fn backoff_delay(retries: u32, cap: Option<Duration>) -> Duration {
	let delay = Duration::from_secs(2u64.checked_pow(retries).unwrap_or(u64::MAX));
	match cap {
		Some(cap) => delay.min(cap),
		None => delay,
	}
}

pub(crate) struct RetryWorker {
	queue: QueueManager,
	transport: SharedTransport,
	events: mpsc::UnboundedReceiver<EventPayload>,
	stats: watch::Sender<QueueStats>,
	max_backoff: Option<Duration>,
}

impl RetryWorker {
	pub(crate) fn new(
		queue: QueueManager,
		transport: SharedTransport,
		events: mpsc::UnboundedReceiver<EventPayload>,
		stats: watch::Sender<QueueStats>,
		max_backoff: Option<Duration>,
	) -> Self {
		Self {
			queue,
			transport,
			events,
			stats,
			max_backoff,
		}
	}

	/// Runs until the sending side is dropped.
	pub(crate) async fn run(mut self) {
		debug!(transport = self.transport.name(), "Retry worker started");

		loop {
			let Some(head) = self.queue.get_next() else {
				match self.events.recv().await {
					Some(payload) => {
						self.enqueue(payload);
						continue;
					}
					None => break,
				}
			};

			let id = head.id;
			let delay = backoff_delay(head.retries, self.max_backoff);

			let sleep = tokio::time::sleep(delay);
			tokio::pin!(sleep);
			loop {
				tokio::select! {
					_ = &mut sleep => break,
					received = self.events.recv() => match received {
						Some(payload) => self.enqueue(payload),
						None => {
							debug!(queue_len = self.queue.len(), "Retry worker stopped");
							return;
						}
					},
				}
			}

			// Evicted while waiting.
			let Some(item) = self.queue.get(id) else {
				continue;
			};
			let payload = Arc::clone(&item.payload);

			match deliver(self.transport.as_ref(), &payload).await {
				Ok(()) => {
					self.queue.remove(id);
					debug!(event_id = %payload.event_id(), "Queued event delivered");
				}
				Err(e) => {
					if self.queue.increment_retry(id) {
						debug!(
							event_id = %payload.event_id(),
							retries = self.queue.get(id).map(|item| item.retries),
							error = %e,
							"Retry attempt failed"
						);
					} else {
						warn!(
							event_id = %payload.event_id(),
							max_retries = self.queue.max_retries(),
							error = %e,
							"Dropping event after exhausting retries"
						);
					}
				}
			}
			self.publish();
		}

		debug!("Retry worker stopped");
	}

	fn enqueue(&mut self, payload: EventPayload) {
		self.queue.add(payload);
		self.publish();
	}

	fn publish(&self) {
		let stats = QueueStats {
			len: self.queue.len(),
			head_retries: self.queue.get_next().map(|item| item.retries),
		};
		self.stats.send_replace(stats);
	}
}
