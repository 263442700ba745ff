// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::collaborators::Collaborators;
use crate::config::WorkerConfig;
use crate::coordinator_client::CoordinatorClient;
use crate::error::{CollaboratorError, WorkerError};
use crate::output_layout::OutputLayout;
use crate::protocol::{Assignment, CompletionReport, PollRequest};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Where the worker is in its poll/execute/report cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    /// Poll with no report attached
    Requesting,
    /// Run the assignment through the external collaborators
    Executing(Assignment),
    /// Poll carrying the completion report of the last assignment
    Reporting(CompletionReport),
    Terminated,
}

/// What a worker did over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub maps_done: u32,
    pub reduces_done: u32,
    /// Assignments dropped because a collaborator failed
    pub abandoned: u32,
    pub transport_failures: u32,
}

/// Long-lived polling client.
///
/// A failed task is never reported: the worker drops it and polls again, and the
/// coordinator hands it out anew once its lease expires. A report whose poll
/// fails in transit is kept and resent, since reports are idempotent.
pub struct Worker<C> {
    id: String,
    client: C,
    collaborators: Collaborators,
    layout: OutputLayout,
    config: WorkerConfig,
    cancel: CancellationToken,
}

impl<C: CoordinatorClient> Worker<C> {
    pub fn new(
        id: impl Into<String>,
        client: C,
        collaborators: Collaborators,
        layout: OutputLayout,
        config: WorkerConfig,
    ) -> Self {
        Self {
            id: id.into(),
            client,
            collaborators,
            layout,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelling the token makes the worker stop polling at the next step
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(self) -> Result<WorkerSummary, WorkerError> {
        let span = info_span!("worker", id = %self.id);
        self.run_loop().instrument(span).await
    }

    async fn run_loop(&self) -> Result<WorkerSummary, WorkerError> {
        info!("worker started");
        let mut summary = WorkerSummary::default();
        let mut failures = 0u32;
        let mut state = WorkerState::Requesting;

        loop {
            state = match state {
                WorkerState::Terminated => break,
                WorkerState::Requesting => {
                    self.poll(None, &mut failures, &mut summary).await?
                }
                WorkerState::Reporting(report) => {
                    self.poll(Some(report), &mut failures, &mut summary).await?
                }
                WorkerState::Executing(assignment) => {
                    self.execute(assignment, &mut summary).await
                }
            };
        }

        info!(
            maps = summary.maps_done,
            reduces = summary.reduces_done,
            abandoned = summary.abandoned,
            transport_failures = summary.transport_failures,
            "worker finished, goodbye"
        );
        Ok(summary)
    }

    async fn poll(
        &self,
        report: Option<CompletionReport>,
        failures: &mut u32,
        summary: &mut WorkerSummary,
    ) -> Result<WorkerState, WorkerError> {
        if self.cancel.is_cancelled() {
            if let Some(report) = report {
                warn!(%report, "stopping with an undelivered report");
            }
            return Ok(WorkerState::Terminated);
        }

        let request = PollRequest {
            report: report.clone(),
        };
        match self.client.poll(request).await {
            Ok(assignment) => {
                *failures = 0;
                if let Some(report) = &report {
                    debug!(%report, "report delivered");
                }
                Ok(match assignment {
                    Assignment::Wait => {
                        debug!("no work available, waiting");
                        self.pause(self.config.wait_interval()).await;
                        WorkerState::Requesting
                    }
                    Assignment::Exit => {
                        info!("coordinator has no more work");
                        WorkerState::Terminated
                    }
                    assignment => WorkerState::Executing(assignment),
                })
            }
            Err(err) => {
                *failures += 1;
                summary.transport_failures += 1;
                if self.config.give_up_after > 0 && *failures >= self.config.give_up_after {
                    return Err(WorkerError::CoordinatorLost {
                        attempts: *failures,
                        last: err,
                    });
                }

                let backoff = self.config.retry_backoff(*failures);
                warn!(
                    error = %err,
                    failures = *failures,
                    backoff_ms = backoff.as_millis() as u64,
                    "poll failed, retrying"
                );
                self.pause(backoff).await;
                Ok(match report {
                    Some(report) => WorkerState::Reporting(report),
                    None => WorkerState::Requesting,
                })
            }
        }
    }

    async fn execute(&self, assignment: Assignment, summary: &mut WorkerSummary) -> WorkerState {
        info!(%assignment, "executing");
        match self.run_assignment(&assignment).await {
            Ok(()) => {
                match &assignment {
                    Assignment::Map { .. } => summary.maps_done += 1,
                    Assignment::Reduce { .. } => summary.reduces_done += 1,
                    Assignment::Wait | Assignment::Exit => {}
                }
                match assignment.completion_report() {
                    Some(report) => WorkerState::Reporting(report),
                    None => WorkerState::Requesting,
                }
            }
            Err(err) => {
                summary.abandoned += 1;
                warn!(%assignment, error = %err, "task failed, abandoning it to lease expiry");
                WorkerState::Requesting
            }
        }
    }

    async fn run_assignment(&self, assignment: &Assignment) -> Result<(), CollaboratorError> {
        match assignment {
            Assignment::Map { doc_id, page } => {
                let content = self.collaborators.extractor.page_text(doc_id, *page).await?;
                let result = self.collaborators.transform.transform(*page, content).await?;
                self.layout.write_page_output(doc_id, *page, &result).await?;
                Ok(())
            }
            Assignment::Reduce { doc_id } => self.collaborators.assembler.assemble(doc_id).await,
            Assignment::Wait | Assignment::Exit => Ok(()),
        }
    }

    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }
}
