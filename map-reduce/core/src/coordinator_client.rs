// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::coordinator::Coordinator;
use crate::error::TransportError;
use crate::protocol::{Assignment, PollRequest};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for reaching the coordinator from a worker
/// Abstracts the transport (in-process, gRPC, ...)
#[async_trait]
pub trait CoordinatorClient: Send + Sync {
    async fn poll(&self, request: PollRequest) -> Result<Assignment, TransportError>;
}

/// Calls a coordinator living in the same process
#[derive(Clone)]
pub struct LocalCoordinatorClient {
    coordinator: Arc<Coordinator>,
}

impl LocalCoordinatorClient {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl CoordinatorClient for LocalCoordinatorClient {
    async fn poll(&self, request: PollRequest) -> Result<Assignment, TransportError> {
        Ok(self.coordinator.poll(request))
    }
}

#[async_trait]
impl<C: CoordinatorClient + ?Sized> CoordinatorClient for Arc<C> {
    async fn poll(&self, request: PollRequest) -> Result<Assignment, TransportError> {
        (**self).poll(request).await
    }
}
