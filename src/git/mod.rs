//! Git backend abstraction layer
//!
//! This module provides a trait-based abstraction over the places a release
//! workflow can run against: a hosting provider reached through its API, or a
//! local repository driven with `git` subprocesses.
//!
//! # Overview
//!
//! The primary abstraction is the [GitBackend] trait. Each variant implements
//! the primitive inspection and mutation operations; the lifecycle rules that
//! do not depend on the variant (label gating, version computation, cleanup)
//! are provided methods on the trait so every variant shares one contract.
//!
//! - [local::LocalBackend]: git subprocesses against a working directory
//! - [hosted::HostedBackend]: any [hosting::HostingApi] (GitHub, GitLab, Bitbucket)
//! - [memory::InMemoryHost]: an in-process [hosting::HostingApi] for tests and dry runs
//!
//! # Usage
//!
//! Most code should depend on `&dyn GitBackend` and obtain the variant from
//! [registry::open_backend].
//!
//! ```rust
//! # use release_flow::git::GitBackend;
//! # use release_flow::domain::Increment;
//! # fn example(backend: &dyn GitBackend) -> release_flow::Result<()> {
//! let ready = backend.get_features_by_label("RELEASE-CANDIDATE")?;
//! let next = backend.get_release_candidate_version(Increment::Patch)?;
//! println!("{} features ready for {}", ready.len(), next);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod hosted;
pub mod hosting;
pub mod local;
pub mod memory;
pub mod registry;

pub use command::GitCli;
pub use hosted::HostedBackend;
pub use hosting::HostingApi;
pub use local::LocalBackend;
pub use memory::InMemoryHost;
pub use registry::{open_backend, BackendKind};

use crate::domain::{
    is_candidate_branch_of, Feature, FeatureAction, IncreasePolicy, Increment, Release,
    ReleaseStatus, Stability, Version,
};
use crate::error::{FlowError, Result};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Settings shared by every backend variant
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSettings {
    /// Trunk branch features start from and stable releases land on
    pub master_branch: String,
    pub feature_prefix: String,
    pub candidate_label: String,
    pub stable_label: String,
    /// Version used when nothing in the repository parses as one
    pub default_version: Version,
    pub policy: IncreasePolicy,
}

impl Default for FlowSettings {
    fn default() -> Self {
        FlowSettings {
            master_branch: "master".to_string(),
            feature_prefix: "feature-".to_string(),
            candidate_label: "RELEASE-CANDIDATE".to_string(),
            stable_label: "RELEASE-STABLE".to_string(),
            default_version: Version::stable(1, 0, 0),
            policy: IncreasePolicy::default(),
        }
    }
}

/// Release workflow operations over a repository
///
/// ## Ownership
///
/// Features and releases are passed by value and returned updated, so callers
/// always hold the current state of an entity. Backends keep no entity state
/// of their own.
///
/// ## Error Handling
///
/// Variant failures (subprocess exits, API errors) surface as
/// [FlowError::BackendOperationFailed]; lifecycle guards surface as
/// [FlowError::InvalidState] or [FlowError::AlreadyExists]. Nothing is retried.
pub trait GitBackend {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    fn settings(&self) -> &FlowSettings;

    /// Names of all branches
    fn list_branches(&self) -> Result<Vec<String>>;

    /// Names of all tags
    fn list_tags(&self) -> Result<Vec<String>>;

    /// Inspect the repository and build the current state of feature `name`
    ///
    /// A missing branch yields a NEW feature. An existing branch yields a
    /// STARTED feature with its head commit, elevated by the labels of its
    /// release request when one is open.
    fn build_feature(&self, name: &str) -> Result<Feature>;

    /// Create the feature branch from the head of the base branch
    fn start_feature(&self, feature: Feature) -> Result<Feature>;

    /// Delete the feature branch
    fn close_feature(&self, feature: Feature) -> Result<Feature>;

    fn get_feature_labels(&self, feature: &Feature) -> Result<BTreeSet<String>>;

    fn add_label_to_feature(&self, feature: Feature, label: &str) -> Result<Feature>;

    fn remove_labels_from_feature(&self, feature: Feature) -> Result<Feature>;

    /// Open a release request for the feature unless it already has one
    fn open_release_request(&self, feature: Feature) -> Result<Feature>;

    /// Create the release branch from the head of the base branch
    fn start_release_candidate(&self, release: Release) -> Result<Release>;

    /// Check whether `feature` merges cleanly into the release target
    ///
    /// Fails with [FlowError::NoChanges] when the feature has nothing to add.
    fn is_feature_ready_for_release(&self, feature: &Feature, release: &Release)
        -> Result<bool>;

    /// Merge `feature` into the release target and record it on the release
    fn push_feature_into_release(&self, release: Release, feature: Feature) -> Result<Release>;

    /// Tag the head of the release branch with the release tag name
    fn create_release_tag(&self, release: Release) -> Result<Release>;

    /// Delete a release branch
    fn delete_release_branch(&self, branch: &str) -> Result<()>;

    /// Features whose branch starts with the configured prefix
    fn get_features_list(&self) -> Result<Vec<Feature>> {
        let prefix = self.settings().feature_prefix.clone();
        self.list_branches()?
            .iter()
            .filter(|branch| branch.starts_with(&prefix))
            .map(|branch| self.build_feature(branch))
            .collect()
    }

    fn get_features_by_label(&self, label: &str) -> Result<Vec<Feature>> {
        let features: Vec<Feature> = self
            .get_features_list()?
            .into_iter()
            .filter(|feature| feature.has_label(label))
            .collect();
        debug!(backend = self.name(), label, count = features.len(), "features by label");
        Ok(features)
    }

    fn mark_feature_ready_for_release_candidate(&self, feature: Feature) -> Result<Feature> {
        feature.ensure(FeatureAction::MarkReleaseCandidate)?;
        let label = self.settings().candidate_label.clone();

        let feature = self.open_release_request(feature)?;
        let feature = self.add_label_to_feature(feature, &label)?;
        info!(feature = %feature.name, label = %label, "feature ready for release candidate");
        feature.transition(FeatureAction::MarkReleaseCandidate)
    }

    fn mark_feature_ready_for_release_stable(&self, feature: Feature) -> Result<Feature> {
        feature.ensure(FeatureAction::MarkReleaseStable)?;
        if feature.release_request.is_none() {
            return Err(FlowError::state(format!(
                "feature '{}' has no release request",
                feature.name
            )));
        }
        let label = self.settings().stable_label.clone();

        let feature = self.add_label_to_feature(feature, &label)?;
        info!(feature = %feature.name, label = %label, "feature ready for stable release");
        feature.transition(FeatureAction::MarkReleaseStable)
    }

    /// Strip the release labels and move the feature back to STARTED
    fn mark_feature_as_new(&self, feature: Feature) -> Result<Feature> {
        feature.ensure(FeatureAction::MarkAsNew)?;
        let feature = self.remove_labels_from_feature(feature)?;
        feature.transition(FeatureAction::MarkAsNew)
    }

    /// Highest version among tag and branch names, or the default version
    fn get_latest_version(&self) -> Result<Version> {
        let mut names = self.list_tags()?;
        names.extend(self.list_branches()?);

        Ok(highest_version(&names, |_| true)
            .map(|(version, _)| version)
            .unwrap_or_else(|| self.settings().default_version.clone()))
    }

    /// Next release candidate: bump a stable latest version, then move to RC
    fn get_release_candidate_version(&self, bump: Increment) -> Result<Version> {
        if bump.stability().is_some() {
            return Err(FlowError::transition(format!(
                "release candidate bump must be major, minor or patch, not {}",
                bump
            )));
        }

        let policy = self.settings().policy;
        let latest = self.get_latest_version()?;
        let base = if latest.is_stable() {
            latest.increase_with(bump, "", policy)?
        } else {
            latest
        };
        base.increase_with(Increment::Rc, "", policy)
    }

    fn get_release_stable_version(&self) -> Result<Version> {
        self.get_latest_version()?
            .increase_with(Increment::Stable, "", self.settings().policy)
    }

    fn push_feature_into_release_candidate(
        &self,
        release: Release,
        feature: Feature,
    ) -> Result<Release> {
        if release.is_stable() {
            return Err(FlowError::state(format!(
                "release {} is not a release candidate",
                release.version
            )));
        }
        self.push_feature_into_release(release, feature)
    }

    fn push_feature_into_release_stable(
        &self,
        release: Release,
        feature: Feature,
    ) -> Result<Release> {
        if !release.is_stable() {
            return Err(FlowError::state(format!(
                "release {} is not a stable release",
                release.version
            )));
        }
        self.push_feature_into_release(release, feature)
    }

    /// Delete the release's own candidate branch
    fn remove_release_candidate(&self, release: &Release) -> Result<()> {
        if release.is_stable() {
            return Err(FlowError::state(format!(
                "stable release {} has no candidate branch",
                release.version
            )));
        }
        info!(branch = %release.branch, "removing release candidate branch");
        self.delete_release_branch(&release.branch)
    }

    /// Delete every release candidate branch of the release's major.minor.patch
    fn remove_release_candidates(&self, release: &Release) -> Result<Vec<String>> {
        let master = self.settings().master_branch.clone();
        let doomed: Vec<String> = self
            .list_branches()?
            .into_iter()
            .filter(|branch| *branch != master)
            .filter(|branch| is_candidate_branch_of(branch, &release.version))
            .collect();

        for branch in &doomed {
            info!(branch = %branch, "removing release candidate branch");
            self.delete_release_branch(branch)?;
        }
        Ok(doomed)
    }

    /// Close every feature of the release, then remove its candidate branches
    fn cleanup_release(&self, mut release: Release) -> Result<Release> {
        let features = std::mem::take(&mut release.features);
        for feature in features {
            let closed = self.close_feature(feature)?;
            release.features.push(closed);
        }

        self.remove_release_candidates(&release)?;
        release.status = ReleaseStatus::Closed;
        Ok(release)
    }

    fn get_latest_release_stable_tag(&self) -> Result<String> {
        let tags = self.list_tags()?;
        Ok(highest_version(&tags, |v| v.is_stable())
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| self.settings().default_version.to_string()))
    }

    fn get_latest_release_candidate_tag(&self) -> Result<String> {
        let tags = self.list_tags()?;
        Ok(highest_version(&tags, |v| v.stability() == Stability::Rc)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| self.settings().default_version.to_string()))
    }
}

/// Highest parseable version among `names` accepted by `keep`, with the name it came from.
///
/// Names that do not parse as versions are skipped.
pub fn highest_version<'a>(
    names: &'a [String],
    keep: impl Fn(&Version) -> bool,
) -> Option<(Version, &'a str)> {
    names
        .iter()
        .filter_map(|name| {
            Version::parse(name)
                .ok()
                .filter(|version| keep(version))
                .map(|version| (version, name.as_str()))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
}
