//! Deadline queue for session-level timers.
//!
//! A min-heap keyed on `(due, seq)`: earlier deadlines pop first, and tasks
//! sharing a deadline pop in the order they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use guildhall_core::GameTime;

/// Work the session defers to a later tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduledTask {
    /// Complete the scripted finale.
    Finale,
    /// Periodic save.
    Autosave,
}

#[derive(Debug)]
struct Entry {
    due: GameTime,
    seq: u64,
    task: ScheduledTask,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// BinaryHeap is a max-heap: reverse so the earliest deadline is on top.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending timers.
#[derive(Debug, Default)]
pub struct Schedule {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl Schedule {
    /// Empty schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once `due` is reached.
    pub fn schedule(&mut self, due: GameTime, task: ScheduledTask) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { due, seq, task });
    }

    /// Drop every pending instance of `task`.
    pub fn cancel(&mut self, task: ScheduledTask) {
        self.heap.retain(|e| e.task != task);
    }

    /// Whether `task` is pending.
    #[must_use]
    pub fn is_scheduled(&self, task: ScheduledTask) -> bool {
        self.heap.iter().any(|e| e.task == task)
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_due(&self) -> Option<GameTime> {
        self.heap.peek().map(|e| e.due)
    }

    /// Remove and return every task due at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: GameTime) -> Vec<(GameTime, ScheduledTask)> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|e| e.due <= now) {
            if let Some(entry) = self.heap.pop() {
                due.push((entry.due, entry.task));
            }
        }
        due
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_then_insertion_order() {
        let mut s = Schedule::new();
        s.schedule(GameTime(300), ScheduledTask::Autosave);
        s.schedule(GameTime(100), ScheduledTask::Finale);
        s.schedule(GameTime(100), ScheduledTask::Autosave);
        assert_eq!(s.next_due(), Some(GameTime(100)));
        assert!(s.pop_due(GameTime(99)).is_empty());
        assert_eq!(
            s.pop_due(GameTime(100)),
            vec![
                (GameTime(100), ScheduledTask::Finale),
                (GameTime(100), ScheduledTask::Autosave)
            ]
        );
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn cancel_removes_only_that_task() {
        let mut s = Schedule::new();
        s.schedule(GameTime(10), ScheduledTask::Autosave);
        s.schedule(GameTime(20), ScheduledTask::Finale);
        s.cancel(ScheduledTask::Autosave);
        assert!(!s.is_scheduled(ScheduledTask::Autosave));
        assert!(s.is_scheduled(ScheduledTask::Finale));
        s.clear();
        assert!(s.is_empty());
    }
}
