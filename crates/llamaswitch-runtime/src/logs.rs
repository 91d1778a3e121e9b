//! Bounded ring buffer of captured server output.

use std::collections::VecDeque;
use std::sync::RwLock;

/// Ring buffer storing recent output lines of one session.
///
/// Appends come from the output reader tasks, snapshots from HTTP handlers.
/// Locks are only held to push or clone, never across an await.
#[derive(Debug)]
pub struct LogRingBuffer {
    capacity: usize,
    lines: RwLock<VecDeque<String>>,
}

impl LogRingBuffer {
    /// Create an empty buffer keeping at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            lines: RwLock::new(VecDeque::with_capacity(capacity.min(4096))),
        }
    }

    /// Add a line, evicting the oldest one if at capacity.
    pub fn append(&self, line: impl Into<String>) {
        let mut lines = self.lines.write().unwrap_or_else(|e| e.into_inner());
        if lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    /// All lines, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.lines
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lines.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.lines.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
