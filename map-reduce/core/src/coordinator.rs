// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::collaborators::PageCounter;
use crate::error::{ConfigError, CoordinatorError};
use crate::output_layout::OutputLayout;
use crate::protocol::{Assignment, CompletionReport, PollRequest};
use crate::task_ledger::{LedgerProgress, MarkOutcome, TaskLedger};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One input document and its page count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub pages: u32,
}

struct JobState {
    ledger: TaskLedger,
    map_phase_logged: bool,
    reduce_phase_logged: bool,
}

/// Task-assignment and completion-tracking engine.
///
/// Workers only ever poll; every poll runs start to finish under one lock, so
/// two workers can never observe the same task as idle. Expired leases are
/// reclaimed lazily at the start of each poll instead of by a timer.
pub struct Coordinator {
    documents: Vec<Document>,
    index: HashMap<String, usize>,
    lease: Duration,
    state: Mutex<JobState>,
}

impl Coordinator {
    /// Build the job, asking `counter` for each document's page count exactly once
    pub async fn discover(
        doc_ids: Vec<String>,
        counter: &dyn PageCounter,
        lease: Duration,
    ) -> Result<Self, CoordinatorError> {
        check_document_ids(&doc_ids)?;

        let mut documents = Vec::with_capacity(doc_ids.len());
        for doc_id in doc_ids {
            let pages = counter
                .page_count(&doc_id)
                .await
                .map_err(|source| CoordinatorError::PageCount {
                    doc_id: doc_id.clone(),
                    source,
                })?;
            info!(doc_id = %doc_id, pages, "document registered");
            documents.push((doc_id, pages));
        }

        Ok(Self::from_page_counts(documents, lease)?)
    }

    /// Build the job from already known `(document id, page count)` pairs
    pub fn from_page_counts(
        documents: Vec<(String, u32)>,
        lease: Duration,
    ) -> Result<Self, ConfigError> {
        if lease.is_zero() {
            return Err(ConfigError::ZeroLease);
        }
        let ids: Vec<String> = documents.iter().map(|(id, _)| id.clone()).collect();
        check_document_ids(&ids)?;

        let documents: Vec<Document> = documents
            .into_iter()
            .map(|(id, pages)| Document { id, pages })
            .collect();
        if let Some(empty) = documents.iter().find(|doc| doc.pages == 0) {
            return Err(ConfigError::EmptyDocument {
                doc_id: empty.id.clone(),
            });
        }

        let page_counts: Vec<u32> = documents.iter().map(|doc| doc.pages).collect();
        let index = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| (doc.id.clone(), i))
            .collect();

        info!(
            documents = documents.len(),
            map_tasks = page_counts.iter().map(|&p| p as usize).sum::<usize>(),
            lease_ms = lease.as_millis() as u64,
            "job created"
        );

        Ok(Self {
            documents,
            index,
            lease,
            state: Mutex::new(JobState {
                ledger: TaskLedger::new(&page_counts),
                map_phase_logged: false,
                reduce_phase_logged: false,
            }),
        })
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn lease(&self) -> Duration {
        self.lease
    }

    pub fn poll(&self, request: PollRequest) -> Assignment {
        self.poll_at(request, Instant::now())
    }

    /// Handle one poll as of `now`: apply the piggybacked report, reclaim
    /// expired leases, then hand out the next unit of work.
    pub fn poll_at(&self, request: PollRequest, now: Instant) -> Assignment {
        let mut state = self.lock();

        if let Some(report) = &request.report {
            self.apply_report(&mut state.ledger, report);
        }

        let reaped = state.ledger.reap_expired(now, self.lease);
        if reaped > 0 {
            warn!(
                reaped,
                lease_ms = self.lease.as_millis() as u64,
                "leases expired, tasks returned to idle"
            );
        }

        Self::log_phase_changes(&mut state);

        if !state.ledger.is_map_phase_complete() {
            return match state.ledger.next_idle_map_task(now) {
                Some((doc, page)) => {
                    let assignment = Assignment::Map {
                        doc_id: self.documents[doc].id.clone(),
                        page: page as u32 + 1,
                    };
                    debug!(%assignment, "assigned");
                    assignment
                }
                None => Assignment::Wait,
            };
        }

        if !state.ledger.is_reduce_phase_complete() {
            return match state.ledger.next_idle_reduce_task(now) {
                Some(doc) => {
                    let assignment = Assignment::Reduce {
                        doc_id: self.documents[doc].id.clone(),
                    };
                    debug!(%assignment, "assigned");
                    assignment
                }
                None => Assignment::Wait,
            };
        }

        Assignment::Exit
    }

    /// True once every reduce task is done
    pub fn job_done(&self) -> bool {
        self.lock().ledger.is_reduce_phase_complete()
    }

    pub fn progress(&self) -> LedgerProgress {
        self.lock().ledger.progress()
    }

    /// Copy of the ledger as it stands
    pub fn ledger_snapshot(&self) -> TaskLedger {
        self.lock().ledger.clone()
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        // Ledger mutations are single assignments, so a poisoned lock still
        // guards a consistent ledger.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_report(&self, ledger: &mut TaskLedger, report: &CompletionReport) {
        let (doc_id, outcome) = match report {
            CompletionReport::MapDone { doc_id, page } => {
                let Some(&doc) = self.index.get(doc_id) else {
                    warn!(%report, "report for unknown document ignored");
                    return;
                };
                if *page == 0 {
                    warn!(%report, "report with page 0 ignored, pages are 1-based");
                    return;
                }
                (doc_id, ledger.mark_map_done(doc, *page as usize - 1))
            }
            CompletionReport::ReduceDone { doc_id } => {
                let Some(&doc) = self.index.get(doc_id) else {
                    warn!(%report, "report for unknown document ignored");
                    return;
                };
                (doc_id, ledger.mark_reduce_done(doc))
            }
        };

        match outcome {
            MarkOutcome::Completed => debug!(%report, "task done"),
            MarkOutcome::AlreadyDone => debug!(%report, "duplicate report ignored"),
            MarkOutcome::NotReady => {
                warn!(%report, doc_id = %doc_id, "reduce reported before all pages were done, ignored")
            }
            MarkOutcome::Unknown => warn!(%report, "report for unknown page ignored"),
        }
    }

    fn log_phase_changes(state: &mut JobState) {
        if !state.map_phase_logged && state.ledger.is_map_phase_complete() {
            state.map_phase_logged = true;
            info!("map phase complete");
        }
        if !state.reduce_phase_logged && state.ledger.is_reduce_phase_complete() {
            state.reduce_phase_logged = true;
            info!("reduce phase complete");
        }
    }
}

fn check_document_ids(doc_ids: &[String]) -> Result<(), ConfigError> {
    if doc_ids.is_empty() {
        return Err(ConfigError::NoDocuments);
    }

    let mut output_names: HashMap<String, &String> = HashMap::new();
    for doc_id in doc_ids {
        let name = OutputLayout::output_name(doc_id);
        if let Some(first) = output_names.insert(name.clone(), doc_id) {
            if first == doc_id {
                return Err(ConfigError::DuplicateDocument(doc_id.clone()));
            }
            return Err(ConfigError::OutputNameCollision {
                first: first.clone(),
                second: doc_id.clone(),
                name,
            });
        }
    }
    Ok(())
}
