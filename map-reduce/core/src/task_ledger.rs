// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use serde::Serialize;
use std::time::{Duration, Instant};

/// Lifecycle of a single map or reduce task.
///
/// The lease timestamp only exists while the task is `Assigned`, so it can never
/// be read for a task that is idle or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Assigned { since: Instant },
    Done,
}

impl TaskState {
    pub fn is_done(&self) -> bool {
        matches!(self, TaskState::Done)
    }

    fn is_expired(&self, now: Instant, lease: Duration) -> bool {
        match self {
            TaskState::Assigned { since } => now.saturating_duration_since(*since) >= lease,
            _ => false,
        }
    }
}

/// Result of applying a completion report to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The task moved to `Done`
    Completed,
    /// The task was already `Done`; nothing changed
    AlreadyDone,
    /// A reduce report arrived before the document's pages were all mapped
    NotReady,
    /// No such task in this job
    Unknown,
}

/// Idle/assigned/done counts for one phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseCounts {
    pub idle: usize,
    pub assigned: usize,
    pub done: usize,
}

impl PhaseCounts {
    fn record(&mut self, state: &TaskState) {
        match state {
            TaskState::Idle => self.idle += 1,
            TaskState::Assigned { .. } => self.assigned += 1,
            TaskState::Done => self.done += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.idle + self.assigned + self.done
    }
}

/// Point-in-time view of the whole ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerProgress {
    pub map: PhaseCounts,
    pub reduce: PhaseCounts,
    pub expired_leases: u64,
}

/// In-memory record of every map task (one per page) and reduce task (one per
/// document).
///
/// Map tasks are addressed by `(document index, page index)` and reduce tasks by
/// document index, both 0-based and stable for the life of the job. The ledger
/// is not synchronized itself; the coordinator owns it behind a single lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLedger {
    map_tasks: Vec<Vec<TaskState>>,
    reduce_tasks: Vec<TaskState>,
    expired_leases: u64,
}

impl TaskLedger {
    /// Build a ledger with every task idle. `page_counts[d]` is the number of
    /// pages of document `d`.
    pub fn new(page_counts: &[u32]) -> Self {
        Self {
            map_tasks: page_counts
                .iter()
                .map(|&pages| vec![TaskState::Idle; pages as usize])
                .collect(),
            reduce_tasks: vec![TaskState::Idle; page_counts.len()],
            expired_leases: 0,
        }
    }

    pub fn document_count(&self) -> usize {
        self.reduce_tasks.len()
    }

    pub fn page_count(&self, doc: usize) -> Option<usize> {
        self.map_tasks.get(doc).map(Vec::len)
    }

    pub fn map_state(&self, doc: usize, page: usize) -> Option<TaskState> {
        self.map_tasks.get(doc)?.get(page).copied()
    }

    pub fn reduce_state(&self, doc: usize) -> Option<TaskState> {
        self.reduce_tasks.get(doc).copied()
    }

    /// Hand out the first idle map task in document order, then page order.
    pub fn next_idle_map_task(&mut self, now: Instant) -> Option<(usize, usize)> {
        for (doc, pages) in self.map_tasks.iter_mut().enumerate() {
            for (page, state) in pages.iter_mut().enumerate() {
                if *state == TaskState::Idle {
                    *state = TaskState::Assigned { since: now };
                    return Some((doc, page));
                }
            }
        }
        None
    }

    /// Hand out the first idle reduce task whose document has every page done.
    pub fn next_idle_reduce_task(&mut self, now: Instant) -> Option<usize> {
        for doc in 0..self.reduce_tasks.len() {
            if self.reduce_tasks[doc] == TaskState::Idle && self.is_document_mapped(doc) {
                self.reduce_tasks[doc] = TaskState::Assigned { since: now };
                return Some(doc);
            }
        }
        None
    }

    /// Mark a map task done. Accepted from any state, including `Idle` after
    /// its lease was reaped: the work was performed either way.
    pub fn mark_map_done(&mut self, doc: usize, page: usize) -> MarkOutcome {
        match self.map_tasks.get_mut(doc).and_then(|pages| pages.get_mut(page)) {
            None => MarkOutcome::Unknown,
            Some(TaskState::Done) => MarkOutcome::AlreadyDone,
            Some(state) => {
                *state = TaskState::Done;
                MarkOutcome::Completed
            }
        }
    }

    pub fn mark_reduce_done(&mut self, doc: usize) -> MarkOutcome {
        match self.reduce_tasks.get(doc).copied() {
            None => MarkOutcome::Unknown,
            Some(TaskState::Done) => MarkOutcome::AlreadyDone,
            Some(_) if !self.is_document_mapped(doc) => MarkOutcome::NotReady,
            Some(_) => {
                self.reduce_tasks[doc] = TaskState::Done;
                MarkOutcome::Completed
            }
        }
    }

    /// Return every task whose lease has run out to `Idle`. Returns how many
    /// tasks were reclaimed.
    pub fn reap_expired(&mut self, now: Instant, lease: Duration) -> usize {
        let mut reaped = 0;
        let states = self
            .map_tasks
            .iter_mut()
            .flatten()
            .chain(self.reduce_tasks.iter_mut());
        for state in states {
            if state.is_expired(now, lease) {
                *state = TaskState::Idle;
                reaped += 1;
            }
        }
        self.expired_leases += reaped as u64;
        reaped
    }

    pub fn is_document_mapped(&self, doc: usize) -> bool {
        self.map_tasks
            .get(doc)
            .is_some_and(|pages| pages.iter().all(TaskState::is_done))
    }

    pub fn is_map_phase_complete(&self) -> bool {
        self.map_tasks.iter().flatten().all(TaskState::is_done)
    }

    pub fn is_reduce_phase_complete(&self) -> bool {
        self.is_map_phase_complete() && self.reduce_tasks.iter().all(TaskState::is_done)
    }

    pub fn progress(&self) -> LedgerProgress {
        let mut progress = LedgerProgress {
            expired_leases: self.expired_leases,
            ..LedgerProgress::default()
        };
        for state in self.map_tasks.iter().flatten() {
            progress.map.record(state);
        }
        for state in &self.reduce_tasks {
            progress.reduce.record(state);
        }
        progress
    }
}
