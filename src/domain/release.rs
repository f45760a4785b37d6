use crate::domain::{Feature, Version};
use crate::error::Result;
use std::fmt;

/// Whether a release is a candidate cut or a stable release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseType {
    Candidate,
    Stable,
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseType::Candidate => f.write_str("candidate"),
            ReleaseType::Stable => f.write_str("stable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStatus {
    New,
    Started,
    Closed,
}

/// A release being cut from a set of features
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    pub version: Version,
    pub branch: String,
    pub features: Vec<Feature>,
    pub metadata: Option<String>,
    pub status: ReleaseStatus,
    pub tag: Option<String>,
    release_type: ReleaseType,
}

impl Release {
    pub fn new(version: Version, branch: impl Into<String>, release_type: ReleaseType) -> Self {
        Release {
            version,
            branch: branch.into(),
            features: Vec::new(),
            metadata: None,
            status: ReleaseStatus::New,
            tag: None,
            release_type,
        }
    }

    /// A candidate release on the candidate branch of its major.minor.patch
    pub fn candidate(version: Version) -> Self {
        let branch = candidate_branch(&version);
        Release::new(version, branch, ReleaseType::Candidate)
    }

    /// A stable release cut directly on the base branch
    pub fn stable(version: Version, base_branch: impl Into<String>) -> Self {
        Release::new(version, base_branch, ReleaseType::Stable)
    }

    pub fn release_type(&self) -> ReleaseType {
        self.release_type
    }

    pub fn is_stable(&self) -> bool {
        self.release_type == ReleaseType::Stable
    }

    /// Tag name: the version with the release metadata appended when present
    pub fn tag_name(&self) -> Result<String> {
        match self.metadata.as_deref() {
            Some(metadata) if !metadata.is_empty() => {
                Ok(self.version.with_metadata(metadata)?.to_string())
            }
            _ => Ok(self.version.to_string()),
        }
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }
}

/// Branch shared by every release candidate of a version, e.g. `1.0.1-RC`
pub fn candidate_branch(version: &Version) -> String {
    format!("{}.{}.{}-RC", version.major(), version.minor(), version.patch())
}

/// Whether `branch` is a release candidate branch of `version`'s major.minor.patch.
///
/// Matches the shared `1.0.1-RC` branch as well as numbered names such as
/// `1.0.1-RC2` or `v1.0.1-rc3`.
pub fn is_candidate_branch_of(branch: &str, version: &Version) -> bool {
    let name = branch.strip_prefix('v').unwrap_or(branch);
    name.to_ascii_uppercase().starts_with(&candidate_branch(version))
}
