// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:1234";
pub const DEFAULT_COORDINATOR_ADDR: &str = "mr-master:1234";

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Address the RPC server binds to
    pub listen_addr: String,
    /// Input documents, in job order
    pub documents: Vec<String>,
    /// How long an assigned task may stay unreported before it is handed out again
    pub lease_ms: u64,
    /// Interval between progress log lines while the job runs
    pub progress_interval_ms: u64,
    /// How long to keep answering polls with Exit after the job is done
    pub exit_grace_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            documents: Vec::new(),
            lease_ms: 10_000,
            progress_interval_ms: 1_000,
            exit_grace_ms: 3_000,
        }
    }
}

impl CoordinatorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_json(path.as_ref())
    }

    pub fn lease(&self) -> Duration {
        Duration::from_millis(self.lease_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    pub fn exit_grace(&self) -> Duration {
        Duration::from_millis(self.exit_grace_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.documents.is_empty() {
            return Err(ConfigError::NoDocuments);
        }
        if self.lease_ms == 0 {
            return Err(ConfigError::ZeroLease);
        }
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidAddress {
                addr: self.listen_addr.clone(),
                reason: "expected <ip>:<port>".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WorkerConfig {
    /// `host:port` of the coordinator
    pub coordinator_addr: String,
    /// Shared directory for page outputs and assembled documents
    pub output_dir: PathBuf,
    /// Sleep between polls while the coordinator answers Wait
    pub wait_interval_ms: u64,
    /// First backoff after a failed poll; doubles on every consecutive failure
    pub retry_base_ms: u64,
    /// Upper bound for the transport backoff
    pub retry_max_ms: u64,
    /// Connection attempts at startup before the coordinator is declared unreachable
    pub connect_attempts: u32,
    /// Consecutive failed polls after which the worker stops (0 = never)
    pub give_up_after: u32,
    /// External program (and arguments) used as the page transform
    pub transform_command: Option<Vec<String>>,
    /// Time limit for one page transform
    pub transform_timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            coordinator_addr: DEFAULT_COORDINATOR_ADDR.to_string(),
            output_dir: PathBuf::from("."),
            wait_interval_ms: 500,
            retry_base_ms: 100,
            retry_max_ms: 5_000,
            connect_attempts: 50,
            give_up_after: 0,
            transform_command: None,
            transform_timeout_ms: 60_000,
        }
    }
}

impl WorkerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_json(path.as_ref())
    }

    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }

    pub fn transform_timeout(&self) -> Duration {
        Duration::from_millis(self.transform_timeout_ms)
    }

    /// Capped exponential backoff for the `failures`-th consecutive failed poll
    pub fn retry_backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        let delay = self.retry_base_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.retry_max_ms))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let addr = self.coordinator_addr.as_str();
        match addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
            _ => Err(ConfigError::InvalidAddress {
                addr: addr.to_string(),
                reason: "expected <host>:<port>".to_string(),
            }),
        }
    }
}
