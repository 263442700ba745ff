// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types shared by the coordinator and the worker.
//!
//! Late or duplicate completion reports have no variant here: the ledger
//! treats them as no-ops.

use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration errors. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no input documents were given")]
    NoDocuments,

    #[error("document '{0}' is listed more than once")]
    DuplicateDocument(String),

    #[error("documents '{first}' and '{second}' map to the same output name '{name}'")]
    OutputNameCollision {
        first: String,
        second: String,
        name: String,
    },

    #[error("document '{doc_id}' has no pages")]
    EmptyDocument { doc_id: String },

    #[error("lease duration must be greater than zero")]
    ZeroLease,

    #[error("invalid coordinator address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to reach the coordinator or to complete an RPC.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("failed to connect to coordinator at '{addr}': {reason}")]
    Connect { addr: String, reason: String },

    #[error("poll call failed: {0}")]
    Call(String),

    #[error("malformed response from coordinator: {0}")]
    Malformed(String),
}

/// Failure of one of the external functions a worker delegates to.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("page {page} out of range for '{doc_id}' (1..={pages})")]
    PageOutOfRange { doc_id: String, page: u32, pages: u32 },

    #[error("failed to read '{doc_id}': {source}")]
    Read {
        doc_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("page transform failed for page {page}: {reason}")]
    Transform { page: u32, reason: String },

    #[error("no page outputs found in '{dir}' for '{doc_id}'")]
    NoPageOutputs { dir: PathBuf, doc_id: String },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while building a coordinator.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("page count discovery failed for '{doc_id}': {source}")]
    PageCount {
        doc_id: String,
        #[source]
        source: CollaboratorError,
    },
}

/// Terminal worker failures. Everything else is retried or abandoned.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("coordinator unreachable after {attempts} consecutive failed polls: {last}")]
    CoordinatorLost { attempts: u32, last: TransportError },
}
