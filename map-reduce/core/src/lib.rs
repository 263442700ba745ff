// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Core of a two-phase, per-page map-reduce job.
//!
//! The map phase transforms every page of every document into one intermediate
//! artifact; the reduce phase assembles each document from its artifacts. A
//! single [`coordinator::Coordinator`] tracks every task in a lease-based
//! [`task_ledger::TaskLedger`], and any number of stateless
//! [`worker::Worker`]s poll it for work over a [`coordinator_client::CoordinatorClient`].

pub mod collaborators;
pub mod config;
pub mod coordinator;
pub mod coordinator_client;
pub mod error;
pub mod output_layout;
pub mod protocol;
pub mod task_ledger;
pub mod worker;
