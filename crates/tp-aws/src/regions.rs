//! Region resolution.
//!
//! The propagator ships a default region list; an empty configured list
//! falls back to dynamic discovery through a [`RegionSource`].

use crate::traits::{ConnectorResult, RegionSource};
use tp_core::RegionSelection;

/// Default target regions when no explicit list is configured.
pub const DEFAULT_REGIONS: [&str; 17] = [
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ap-south-1",
    "ap-northeast-3",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "ca-central-1",
    "eu-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-north-1",
    "sa-east-1",
];

/// Returns the default region list as owned strings.
pub fn default_regions() -> Vec<String> {
    DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect()
}

/// Resolves a region selection into a concrete region list.
pub async fn resolve_regions(
    selection: &RegionSelection,
    source: &dyn RegionSource,
) -> ConnectorResult<Vec<String>> {
    match selection {
        RegionSelection::Explicit(regions) => Ok(regions.clone()),
        RegionSelection::Discover => source.list_regions().await,
    }
}
