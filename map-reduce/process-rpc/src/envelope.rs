// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Conversions between the protocol types and their protobuf messages.
//!
//! Protobuf has no optional scalars here, so "absent" is the zero value: an
//! empty document id or page 0. Decoding rejects messages whose kind requires a
//! field that is absent.

use crate::rpc::proto;
use page_map_reduce_core::protocol::{Assignment, CompletionReport, PollRequest};
use proto::{AssignmentKind, ReportKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("unknown report kind {0}")]
    UnknownReportKind(i32),

    #[error("unknown assignment kind {0}")]
    UnknownAssignmentKind(i32),

    #[error("{0} is missing a document id")]
    MissingDocId(&'static str),

    #[error("{0} is missing a page number")]
    MissingPage(&'static str),
}

pub fn encode_request(request: &PollRequest) -> proto::PollRequest {
    match &request.report {
        None => proto::PollRequest {
            report_kind: ReportKind::None as i32,
            report_doc_id: String::new(),
            report_page: 0,
        },
        Some(CompletionReport::MapDone { doc_id, page }) => proto::PollRequest {
            report_kind: ReportKind::MapDone as i32,
            report_doc_id: doc_id.clone(),
            report_page: *page,
        },
        Some(CompletionReport::ReduceDone { doc_id }) => proto::PollRequest {
            report_kind: ReportKind::ReduceDone as i32,
            report_doc_id: doc_id.clone(),
            report_page: 0,
        },
    }
}

pub fn decode_request(request: proto::PollRequest) -> Result<PollRequest, EnvelopeError> {
    let kind = ReportKind::try_from(request.report_kind)
        .map_err(|_| EnvelopeError::UnknownReportKind(request.report_kind))?;

    let report = match kind {
        ReportKind::None => None,
        ReportKind::MapDone => {
            let doc_id = required_doc_id(request.report_doc_id, "map report")?;
            if request.report_page == 0 {
                return Err(EnvelopeError::MissingPage("map report"));
            }
            Some(CompletionReport::MapDone {
                doc_id,
                page: request.report_page,
            })
        }
        ReportKind::ReduceDone => Some(CompletionReport::ReduceDone {
            doc_id: required_doc_id(request.report_doc_id, "reduce report")?,
        }),
    };
    Ok(PollRequest { report })
}

pub fn encode_assignment(assignment: &Assignment) -> proto::PollResponse {
    let (kind, doc_id, page) = match assignment {
        Assignment::Wait => (AssignmentKind::Wait, String::new(), 0),
        Assignment::Map { doc_id, page } => (AssignmentKind::Map, doc_id.clone(), *page),
        Assignment::Reduce { doc_id } => (AssignmentKind::Reduce, doc_id.clone(), 0),
        Assignment::Exit => (AssignmentKind::Exit, String::new(), 0),
    };
    proto::PollResponse {
        assignment: kind as i32,
        doc_id,
        page,
    }
}

pub fn decode_assignment(response: proto::PollResponse) -> Result<Assignment, EnvelopeError> {
    let kind = AssignmentKind::try_from(response.assignment)
        .map_err(|_| EnvelopeError::UnknownAssignmentKind(response.assignment))?;

    match kind {
        AssignmentKind::Wait => Ok(Assignment::Wait),
        AssignmentKind::Exit => Ok(Assignment::Exit),
        AssignmentKind::Map => {
            let doc_id = required_doc_id(response.doc_id, "map assignment")?;
            if response.page == 0 {
                return Err(EnvelopeError::MissingPage("map assignment"));
            }
            Ok(Assignment::Map {
                doc_id,
                page: response.page,
            })
        }
        AssignmentKind::Reduce => Ok(Assignment::Reduce {
            doc_id: required_doc_id(response.doc_id, "reduce assignment")?,
        }),
    }
}

fn required_doc_id(doc_id: String, what: &'static str) -> Result<String, EnvelopeError> {
    if doc_id.is_empty() {
        Err(EnvelopeError::MissingDocId(what))
    } else {
        Ok(doc_id)
    }
}
