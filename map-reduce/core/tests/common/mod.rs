// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(dead_code)]

use async_trait::async_trait;
use page_map_reduce_core::collaborators::{
    Collaborators, DocumentAssembler, PageCounter, PageExtractor, PageTransform,
};
use page_map_reduce_core::config::WorkerConfig;
use page_map_reduce_core::coordinator_client::CoordinatorClient;
use page_map_reduce_core::error::{CollaboratorError, TransportError};
use page_map_reduce_core::output_layout::OutputLayout;
use page_map_reduce_core::protocol::{Assignment, PollRequest};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Documents held in memory, one string per page
#[derive(Default)]
pub struct FakePages {
    docs: HashMap<String, Vec<String>>,
    pub count_calls: AtomicUsize,
}

impl FakePages {
    pub fn new(docs: &[(&str, &[&str])]) -> Self {
        Self {
            docs: docs
                .iter()
                .map(|(id, pages)| (id.to_string(), pages.iter().map(|p| p.to_string()).collect()))
                .collect(),
            count_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageCounter for FakePages {
    async fn page_count(&self, doc_id: &str) -> Result<u32, CollaboratorError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.docs
            .get(doc_id)
            .map(|pages| pages.len() as u32)
            .ok_or_else(|| CollaboratorError::Read {
                doc_id: doc_id.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such document"),
            })
    }
}

#[async_trait]
impl PageExtractor for FakePages {
    async fn page_text(&self, doc_id: &str, page: u32) -> Result<String, CollaboratorError> {
        let pages = self.docs.get(doc_id).ok_or_else(|| CollaboratorError::Read {
            doc_id: doc_id.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such document"),
        })?;
        pages
            .get((page as usize).wrapping_sub(1))
            .cloned()
            .ok_or(CollaboratorError::PageOutOfRange {
                doc_id: doc_id.to_string(),
                page,
                pages: pages.len() as u32,
            })
    }
}

pub struct UppercaseTransform;

#[async_trait]
impl PageTransform for UppercaseTransform {
    async fn transform(&self, _page: u32, content: String) -> Result<String, CollaboratorError> {
        Ok(content.to_uppercase())
    }
}

/// Fails the first time each listed page is transformed
pub struct FailOnceTransform {
    pages: Mutex<HashSet<u32>>,
}

impl FailOnceTransform {
    pub fn new(pages: &[u32]) -> Self {
        Self {
            pages: Mutex::new(pages.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl PageTransform for FailOnceTransform {
    async fn transform(&self, page: u32, content: String) -> Result<String, CollaboratorError> {
        if self.pages.lock().unwrap().remove(&page) {
            return Err(CollaboratorError::Transform {
                page,
                reason: "injected failure".to_string(),
            });
        }
        Ok(content.to_uppercase())
    }
}

/// Joins a document's page outputs in page order
pub struct JoiningAssembler {
    layout: OutputLayout,
}

impl JoiningAssembler {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl DocumentAssembler for JoiningAssembler {
    async fn assemble(&self, doc_id: &str) -> Result<(), CollaboratorError> {
        let mut joined = String::new();
        for output in self.layout.collect_page_outputs(doc_id).await? {
            let text = tokio::fs::read_to_string(&output.path)
                .await
                .map_err(|source| CollaboratorError::Io {
                    path: output.path.clone(),
                    source,
                })?;
            joined.push_str(&text);
        }
        let path = self.layout.assembled_output_path(doc_id);
        tokio::fs::write(&path, joined)
            .await
            .map_err(|source| CollaboratorError::Io { path, source })
    }
}

pub fn collaborators(
    pages: Arc<FakePages>,
    transform: Arc<dyn PageTransform>,
    layout: &OutputLayout,
) -> Collaborators {
    Collaborators::new(
        pages,
        transform,
        Arc::new(JoiningAssembler::new(layout.clone())),
    )
}

pub fn fast_worker_config(output_dir: &Path) -> WorkerConfig {
    WorkerConfig {
        output_dir: output_dir.to_path_buf(),
        wait_interval_ms: 5,
        retry_base_ms: 1,
        retry_max_ms: 5,
        ..WorkerConfig::default()
    }
}

/// Wraps another client, records every request, and fails the listed call
/// numbers (0-based) with a transport error
pub struct FlakyClient<C> {
    inner: C,
    fail_calls: HashSet<usize>,
    calls: AtomicUsize,
    pub requests: Mutex<Vec<(PollRequest, bool)>>,
}

impl<C> FlakyClient<C> {
    pub fn new(inner: C, fail_calls: &[usize]) -> Self {
        Self {
            inner,
            fail_calls: fail_calls.iter().copied().collect(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl<C: CoordinatorClient> CoordinatorClient for FlakyClient<C> {
    async fn poll(&self, request: PollRequest) -> Result<Assignment, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail_calls.contains(&call);
        self.requests.lock().unwrap().push((request.clone(), !fail));
        if fail {
            return Err(TransportError::Call("injected transport failure".to_string()));
        }
        self.inner.poll(request).await
    }
}

/// A coordinator that is never reachable
pub struct DeadClient;

#[async_trait]
impl CoordinatorClient for DeadClient {
    async fn poll(&self, _request: PollRequest) -> Result<Assignment, TransportError> {
        Err(TransportError::Connect {
            addr: "127.0.0.1:1".to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// A coordinator that only ever says wait
pub struct WaitingClient;

#[async_trait]
impl CoordinatorClient for WaitingClient {
    async fn poll(&self, _request: PollRequest) -> Result<Assignment, TransportError> {
        Ok(Assignment::Wait)
    }
}
