// ABOUTME: Observational progress notifications emitted while a plan compiles
// ABOUTME: Sends a count every N completed meals plus one when the last meal finishes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// Completed-meal count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileProgress {
    /// Meals finished so far
    pub completed: usize,
    /// Meals in the plan
    pub total: usize,
}

/// Channel end that receives progress
pub type ProgressSender = mpsc::UnboundedSender<CompileProgress>;

/// Counts completed meals across concurrent days
#[derive(Debug)]
pub struct ProgressTracker {
    completed: AtomicUsize,
    total: usize,
    interval: usize,
    sender: Option<ProgressSender>,
}

impl ProgressTracker {
    /// Create a tracker; without a sender it only counts
    #[must_use]
    pub fn new(total: usize, interval: usize, sender: Option<ProgressSender>) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
            interval: interval.max(1),
            sender,
        }
    }

    /// Record one finished meal
    pub fn meal_completed(&self) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if completed % self.interval != 0 && completed != self.total {
            return;
        }
        debug!(completed, total = self.total, "compile progress");
        if let Some(sender) = &self.sender {
            // Receiver may have gone away; progress is best effort
            let _ = sender.send(CompileProgress {
                completed,
                total: self.total,
            });
        }
    }

    /// Meals finished so far
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifies_on_interval_and_completion() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let tracker = ProgressTracker::new(12, 5, Some(sender));
        for _ in 0..12 {
            tracker.meal_completed();
        }
        drop(tracker);

        let mut seen = Vec::new();
        while let Ok(progress) = receiver.try_recv() {
            seen.push(progress.completed);
        }
        assert_eq!(seen, [5, 10, 12]);
    }

    #[test]
    fn test_counts_without_sender() {
        let tracker = ProgressTracker::new(3, 5, None);
        tracker.meal_completed();
        tracker.meal_completed();
        assert_eq!(tracker.completed(), 2);
    }
}
