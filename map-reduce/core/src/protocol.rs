// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Request/response envelope exchanged between workers and the coordinator.
//!
//! Page numbers are 1-based everywhere in the envelope.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Completion of a previously assigned task, piggybacked on the next poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionReport {
    MapDone { doc_id: String, page: u32 },
    ReduceDone { doc_id: String },
}

impl fmt::Display for CompletionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionReport::MapDone { doc_id, page } => {
                write!(f, "map done ({} page {})", doc_id, page)
            }
            CompletionReport::ReduceDone { doc_id } => write!(f, "reduce done ({})", doc_id),
        }
    }
}

/// A worker's poll
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRequest {
    pub report: Option<CompletionReport>,
}

impl PollRequest {
    pub fn empty() -> Self {
        Self { report: None }
    }

    pub fn with_report(report: CompletionReport) -> Self {
        Self {
            report: Some(report),
        }
    }
}

/// The coordinator's answer to a poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    /// Nothing to hand out right now, but the job is not finished
    Wait,
    /// Transform one page of one document
    Map { doc_id: String, page: u32 },
    /// Assemble one document from its page outputs
    Reduce { doc_id: String },
    /// No more work will ever be produced
    Exit,
}

impl Assignment {
    /// The report a worker sends once this assignment has been executed
    pub fn completion_report(&self) -> Option<CompletionReport> {
        match self {
            Assignment::Map { doc_id, page } => Some(CompletionReport::MapDone {
                doc_id: doc_id.clone(),
                page: *page,
            }),
            Assignment::Reduce { doc_id } => Some(CompletionReport::ReduceDone {
                doc_id: doc_id.clone(),
            }),
            Assignment::Wait | Assignment::Exit => None,
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assignment::Wait => write!(f, "wait"),
            Assignment::Map { doc_id, page } => write!(f, "map ({} page {})", doc_id, page),
            Assignment::Reduce { doc_id } => write!(f, "reduce ({})", doc_id),
            Assignment::Exit => write!(f, "exit"),
        }
    }
}
