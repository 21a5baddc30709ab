//! Trait definitions for the cloud collaborators.
//!
//! The decision engine only ever sees fully materialized listings; these
//! traits are the seams through which the execution driver fetches them
//! and writes tags back. Mock implementations live in [`crate::testing`].

use crate::secure_string::SecureString;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tp_core::{ComputeListings, StorageListings};

/// Errors that can occur in connectors.
#[derive(Error, Debug, Clone)]
pub enum ConnectorError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Shared connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Connector name/identifier.
    pub name: String,
    /// Base URL for the service endpoint.
    pub base_url: String,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum retries for retryable failures.
    pub max_retries: u32,
    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Authentication configuration for a connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication (local endpoints, tests).
    None,
    /// Static API key in a configurable header.
    ApiKey {
        key: SecureString,
        header_name: String,
    },
    /// Bearer token.
    BearerToken { token: SecureString },
}

/// Fetches one region's compute listings (instances, volumes, snapshots,
/// images).
#[async_trait]
pub trait ComputeSource: Send + Sync {
    async fn fetch_compute(&self) -> ConnectorResult<ComputeListings>;
}

/// Fetches one region's storage-service listings (EFS / FSx family).
#[async_trait]
pub trait StorageSource: Send + Sync {
    async fn fetch_storage(&self) -> ConnectorResult<StorageListings>;
}

/// Writes a single tag to a single resource.
///
/// One call per WRITE plan entry; calls are independent of each other and
/// safe to retry (the next plan sees an applied write as already tagged).
#[async_trait]
pub trait TagSink: Send + Sync {
    async fn write_tag(&self, resource_id: &str, key: &str, value: &str) -> ConnectorResult<()>;
}

/// Lists available regions, used when no explicit region list is
/// configured.
#[async_trait]
pub trait RegionSource: Send + Sync {
    async fn list_regions(&self) -> ConnectorResult<Vec<String>>;
}
