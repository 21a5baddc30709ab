//! # tp-aws
//!
//! AWS collaborators for the tag propagator: description sources for EC2,
//! EFS, and FSx, tag-write sinks, and region discovery.
//!
//! Connectors map provider responses into the listing types `tp-core`
//! consumes; the decision engine itself never touches the network.

pub mod ec2;
pub mod efs;
pub mod fsx;
pub mod http;
pub mod regions;
pub mod secure_string;
pub mod testing;
pub mod traits;

pub use ec2::{Ec2Config, Ec2Connector};
pub use efs::{EfsConfig, EfsConnector};
pub use fsx::{FsxConfig, FsxConnector};
pub use http::HttpClient;
pub use regions::{default_regions, resolve_regions, DEFAULT_REGIONS};
pub use secure_string::SecureString;
pub use testing::{
    MockComputeSource, MockStorageSource, RecordedWrite, RecordingTagSink, StaticRegionSource,
};
pub use traits::{
    AuthConfig, ComputeSource, ConnectorConfig, ConnectorError, ConnectorResult, RegionSource,
    StorageSource, TagSink,
};
