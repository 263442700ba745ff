// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! gRPC binding of the page map-reduce poll protocol.

pub mod envelope;
pub mod grpc_coordinator_client;
pub mod grpc_coordinator_server;
pub mod logging;

pub mod rpc {
    pub mod proto {
        include!("../.generated/pagemr.rs");
    }
}

pub use grpc_coordinator_client::GrpcCoordinatorClient;
pub use grpc_coordinator_server::{start_coordinator_server, CoordinatorServerHandle, ServerError};
