//! Configuration for the propagation engine.
//!
//! Region selection and the image-provenance correlation rule are modeled
//! as enumerated configuration rather than core logic.

use crate::normalize::TagKeyConstraints;
use crate::planner::TagValuePolicy;
use serde::{Deserialize, Serialize};

/// How the set of target regions is determined.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegionSelection {
    /// Use the given region list as-is.
    Explicit(Vec<String>),
    /// Discover regions via the provider API.
    Discover,
}

impl RegionSelection {
    /// An empty explicit list means "discover".
    pub fn from_list(regions: Vec<String>) -> Self {
        if regions.is_empty() {
            RegionSelection::Discover
        } else {
            RegionSelection::Explicit(regions)
        }
    }
}

/// How an image is correlated to its source instance when direct
/// provenance is unavailable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageCorrelation {
    /// Only the recorded source-instance field links images to instances.
    SourceField,
    /// Fall back to matching the instance id as a substring of the image
    /// (or snapshot) name/description.
    #[default]
    DescriptionFallback,
}

/// Bundled engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Tag-key constraints of the target platform.
    #[serde(default)]
    pub constraints: TagKeyConstraints,
    /// Tag value policy.
    #[serde(default)]
    pub policy: TagValuePolicy,
    /// Image-provenance correlation rule.
    #[serde(default)]
    pub correlation: ImageCorrelation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_discovers() {
        assert_eq!(RegionSelection::from_list(vec![]), RegionSelection::Discover);
    }

    #[test]
    fn test_explicit_list_used_as_given() {
        let sel = RegionSelection::from_list(vec!["eu-west-3".to_string()]);
        assert_eq!(
            sel,
            RegionSelection::Explicit(vec!["eu-west-3".to_string()])
        );
    }

    #[test]
    fn test_default_correlation_is_description_fallback() {
        assert_eq!(
            ImageCorrelation::default(),
            ImageCorrelation::DescriptionFallback
        );
    }
}
