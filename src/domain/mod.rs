//! Domain logic - versions, features and releases, independent of git operations

pub mod feature;
pub mod release;
pub mod version;

pub use feature::{Feature, FeatureAction, FeatureStatus, ReleaseRequest};
pub use release::{candidate_branch, is_candidate_branch_of, Release, ReleaseStatus, ReleaseType};
pub use version::{IncreasePolicy, Increment, Stability, Version};
