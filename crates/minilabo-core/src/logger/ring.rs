//! Fixed-capacity circular log store

use super::entry::LogEntry;

/// Circular buffer of log entries
///
/// Holds at most `capacity` entries. Once full, every push overwrites the
/// oldest entry, which sits at `head`.
#[derive(Debug, Clone)]
pub struct LogRing {
    slots: Vec<LogEntry>,
    capacity: usize,
    head: usize,
    wrapped: bool,
    total: u64,
}

impl LogRing {
    /// Create an empty ring. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            head: 0,
            wrapped: false,
            total: 0,
        }
    }

    /// Forget every entry
    pub fn reset(&mut self) {
        self.slots.clear();
        self.head = 0;
        self.wrapped = false;
        self.total = 0;
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.slots.len() < self.capacity {
            self.slots.push(entry);
        } else {
            self.slots[self.head] = entry;
        }
        self.head = (self.head + 1) % self.capacity;
        if self.head == 0 {
            self.wrapped = true;
        }
        self.total += 1;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index the next entry will be written to
    pub fn head(&self) -> usize {
        self.head
    }

    /// Whether the ring has filled up at least once
    pub fn has_wrapped(&self) -> bool {
        self.wrapped
    }

    /// Number of valid entries
    pub fn len(&self) -> usize {
        if self.wrapped {
            self.capacity
        } else {
            self.head
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries pushed since the last reset, including overwritten ones
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Up to `n` most recent entries, oldest first
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &LogEntry> + '_ {
        let n = n.min(self.len());
        let start = (self.head + self.capacity - n) % self.capacity;
        (0..n).map(move |i| &self.slots[(start + i) % self.capacity])
    }

    /// Every valid entry, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.tail(self.len())
    }

    /// Entries pushed after `mark` (a previous [`total`](Self::total)) that
    /// are still in the ring, oldest first
    pub fn since(&self, mark: u64) -> impl Iterator<Item = &LogEntry> + '_ {
        let fresh = self.total.saturating_sub(mark);
        let n = usize::try_from(fresh).unwrap_or(usize::MAX);
        self.tail(n)
    }
}
