// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_trait::async_trait;
use page_map_reduce_core::coordinator_client::CoordinatorClient;
use page_map_reduce_core::error::TransportError;
use page_map_reduce_core::protocol::{Assignment, PollRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info, warn};

use crate::envelope::{decode_assignment, encode_request};
use crate::rpc::proto::coordinator_service_client::CoordinatorServiceClient;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// gRPC client for a remote coordinator.
///
/// The channel is dialled on first use and dropped after a failed call, so the
/// next poll dials again.
#[derive(Clone)]
pub struct GrpcCoordinatorClient {
    server_addr: String,
    client: Arc<Mutex<Option<CoordinatorServiceClient<Channel>>>>,
}

impl GrpcCoordinatorClient {
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            client: Arc::new(Mutex::new(None)),
        }
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    /// Dial the coordinator, retrying up to `attempts` times `retry_delay` apart
    pub async fn connect(&self, attempts: u32, retry_delay: Duration) -> Result<(), TransportError> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.get_client().await {
                Ok(_) => {
                    info!(addr = %self.server_addr, attempt, "connected to coordinator");
                    return Ok(());
                }
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    debug!(addr = %self.server_addr, attempt, error = %e, "coordinator not reachable yet");
                    tokio::time::sleep(retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn get_client(&self) -> Result<CoordinatorServiceClient<Channel>, TransportError> {
        let mut client_guard = self.client.lock().await;

        if let Some(client) = client_guard.as_ref() {
            return Ok(client.clone());
        }

        let connect_error = |reason: String| TransportError::Connect {
            addr: self.server_addr.clone(),
            reason,
        };
        let endpoint = Endpoint::from_shared(format!("http://{}", self.server_addr))
            .map_err(|e| connect_error(e.to_string()))?
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(CALL_TIMEOUT);
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| connect_error(e.to_string()))?;

        let client = CoordinatorServiceClient::new(channel);
        *client_guard = Some(client.clone());
        Ok(client)
    }

    async fn reset(&self) {
        *self.client.lock().await = None;
    }
}

#[async_trait]
impl CoordinatorClient for GrpcCoordinatorClient {
    async fn poll(&self, request: PollRequest) -> Result<Assignment, TransportError> {
        let mut client = self.get_client().await?;

        let response = match client.poll(tonic::Request::new(encode_request(&request))).await {
            Ok(response) => response.into_inner(),
            Err(status) => {
                warn!(addr = %self.server_addr, code = ?status.code(), message = status.message(), "poll failed");
                self.reset().await;
                return Err(TransportError::Call(format!(
                    "{:?}: {}",
                    status.code(),
                    status.message()
                )));
            }
        };

        decode_assignment(response).map_err(|e| TransportError::Malformed(e.to_string()))
    }
}
