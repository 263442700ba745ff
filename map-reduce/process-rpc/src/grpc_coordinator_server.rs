// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use page_map_reduce_core::coordinator::Coordinator;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

use crate::envelope::{decode_request, encode_assignment};
use crate::rpc::proto;
use proto::coordinator_service_server::{CoordinatorService, CoordinatorServiceServer};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind coordinator to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("coordinator server failed: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("coordinator server task panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// gRPC front of a [`Coordinator`]
pub struct GrpcCoordinatorServer {
    coordinator: Arc<Coordinator>,
}

impl GrpcCoordinatorServer {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }
}

#[tonic::async_trait]
impl CoordinatorService for GrpcCoordinatorServer {
    async fn poll(
        &self,
        request: Request<proto::PollRequest>,
    ) -> Result<Response<proto::PollResponse>, Status> {
        let remote = request.remote_addr();
        let request = decode_request(request.into_inner()).map_err(|e| {
            warn!(?remote, error = %e, "rejected malformed poll");
            Status::invalid_argument(e.to_string())
        })?;

        let assignment = self.coordinator.poll(request);
        debug!(?remote, %assignment, "poll answered");
        Ok(Response::new(encode_assignment(&assignment)))
    }
}

/// A running coordinator server. Dropping the handle stops the server.
pub struct CoordinatorServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl CoordinatorServerHandle {
    /// The bound address; differs from the requested one when port 0 was asked for
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting polls and wait for in-flight ones to finish
    pub async fn shutdown(self) -> Result<(), ServerError> {
        let _ = self.shutdown_tx.send(());
        self.task.await??;
        info!(addr = %self.local_addr, "coordinator server stopped");
        Ok(())
    }
}

/// Bind `addr` and serve `coordinator` on it in a background task
pub async fn start_coordinator_server(
    coordinator: Arc<Coordinator>,
    addr: SocketAddr,
) -> Result<CoordinatorServerHandle, ServerError> {
    // Bind first so address errors surface here rather than in the task
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ServerError::Bind { addr, source })?;
    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let service = CoordinatorServiceServer::new(GrpcCoordinatorServer::new(coordinator));

    let task = tokio::spawn(async move {
        Server::builder()
            .add_service(service)
            .serve_with_incoming_shutdown(incoming, async {
                shutdown_rx.await.ok();
            })
            .await
    });

    info!(addr = %local_addr, "coordinator listening");
    Ok(CoordinatorServerHandle {
        local_addr,
        shutdown_tx,
        task,
    })
}
