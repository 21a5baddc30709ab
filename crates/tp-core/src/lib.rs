//! # tp-core
//!
//! Tag propagation decision engine.
//!
//! Given already-fetched resource listings for one region, this crate
//! builds the ownership graphs (instance → volumes → snapshots, instance
//! → images → backing snapshots; storage service → sub-resources),
//! computes the tag every discovered resource should carry, decides
//! whether a write is needed, and classifies orphaned snapshots and
//! images whose originating instance no longer exists.
//!
//! Everything here is pure, synchronous transformation: no network, no
//! retries, no shared state between runs. The execution driver owns
//! region iteration and the actual tag-write calls.

pub mod config;
pub mod graph;
pub mod normalize;
pub mod orphan;
pub mod planner;
pub mod resource;

pub use config::{ImageCorrelation, PropagationConfig, RegionSelection};
pub use graph::{ComputeGraph, Forest, GraphIssue, Node, StorageGraph, Tree};
pub use normalize::{normalize, NormalizationError, TagKey, TagKeyConstraints};
pub use orphan::OrphanClassifier;
pub use planner::{plan, PlanAction, PlanIter, TagPlanEntry, TagValuePolicy};
pub use resource::{
    ComputeListings, ImageListing, InstanceListing, InstanceState, ResourceKind, SnapshotListing,
    StorageListing, StorageListings, TagMap, VolumeListing,
};
