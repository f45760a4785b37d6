//! Release workflow orchestration
//!
//! Drives the feature lifecycle and the two release cuts on top of any
//! [GitBackend]. The CLI in `main.rs` is a thin layer over [ReleaseFlow] so the
//! workflow can be called programmatically without depending on clap.
//!
//! A release cut runs in phases:
//! 1. Gather the features carrying the release label
//! 2. Compute the next version and ask for confirmation
//! 3. Create the release branch (candidates only), replacing the branch left
//!    by the previous candidate of the same version
//! 4. Probe every feature; any unmergeable feature aborts the cut
//! 5. Merge, run hooks, tag
//! 6. Stable releases then close their features and candidate branches

use crate::config::HooksConfig;
use crate::domain::{Feature, Increment, Release, ReleaseStatus, Version};
use crate::error::{FlowError, Result};
use crate::git::GitBackend;
use crate::hooks::{HookContext, HookExecutor, HookType};
use crate::warning::WorkflowWarning;
use chrono::Utc;
use std::path::PathBuf;
use tracing::{info, warn};

/// Format of the metadata suffix on release candidate tags
pub const CANDIDATE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Result of a release cut
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome {
    /// The user declined the confirmation
    Cancelled,
    Released {
        release: Release,
        warnings: Vec<WorkflowWarning>,
    },
}

pub struct ReleaseFlow<'a> {
    backend: &'a dyn GitBackend,
    hooks: HooksConfig,
    /// Directory hook scripts run in and relative script paths resolve against
    workdir: PathBuf,
}

impl<'a> ReleaseFlow<'a> {
    pub fn new(backend: &'a dyn GitBackend, hooks: HooksConfig) -> Self {
        ReleaseFlow {
            backend,
            hooks,
            workdir: PathBuf::from("."),
        }
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn backend(&self) -> &'a dyn GitBackend {
        self.backend
    }

    /// Branch name for a feature, adding the configured prefix when missing
    pub fn feature_name(&self, name: &str) -> String {
        let prefix = &self.backend.settings().feature_prefix;
        if name.starts_with(prefix.as_str()) {
            name.to_string()
        } else {
            format!("{}{}", prefix, name)
        }
    }

    fn feature(&self, name: &str) -> Result<Feature> {
        self.backend.build_feature(&self.feature_name(name))
    }

    pub fn features(&self) -> Result<Vec<Feature>> {
        self.backend.get_features_list()
    }

    pub fn start_feature(&self, name: &str) -> Result<Feature> {
        let feature = self.feature(name)?;
        self.backend.start_feature(feature)
    }

    pub fn close_feature(&self, name: &str) -> Result<Feature> {
        let feature = self.feature(name)?;
        self.backend.close_feature(feature)
    }

    pub fn mark_ready_for_candidate(&self, name: &str) -> Result<Feature> {
        let feature = self.feature(name)?;
        self.backend.mark_feature_ready_for_release_candidate(feature)
    }

    pub fn mark_ready_for_stable(&self, name: &str) -> Result<Feature> {
        let feature = self.feature(name)?;
        self.backend.mark_feature_ready_for_release_stable(feature)
    }

    pub fn mark_as_new(&self, name: &str) -> Result<Feature> {
        let feature = self.feature(name)?;
        self.backend.mark_feature_as_new(feature)
    }

    /// Cut the next release candidate from the features labelled for it.
    ///
    /// `confirm` receives the computed version and the gathered features;
    /// returning `false` cancels before anything is created.
    pub fn release_candidate<F>(&self, bump: Increment, confirm: F) -> Result<ReleaseOutcome>
    where
        F: FnOnce(&Version, &[Feature]) -> bool,
    {
        let label = self.backend.settings().candidate_label.clone();
        let features = self.backend.get_features_by_label(&label)?;
        if features.is_empty() {
            return Err(FlowError::NoFeaturesReady(label));
        }

        let version = self.backend.get_release_candidate_version(bump)?;
        if !confirm(&version, &features) {
            info!(version = %version, "release candidate cancelled");
            return Ok(ReleaseOutcome::Cancelled);
        }

        let release = Release::candidate(version);
        if self.backend.list_branches()?.contains(&release.branch) {
            // The previous candidate stays reachable through its tag
            info!(branch = %release.branch, "replacing previous release candidate branch");
            self.backend.delete_release_branch(&release.branch)?;
        }
        let release = self.backend.start_release_candidate(release)?;
        let (ready, mut warnings) = self.probe(&release, features)?;
        if ready.is_empty() {
            self.rollback(&release);
            return Err(FlowError::NoFeaturesReady(label));
        }

        let mut release = release;
        for feature in ready {
            release = self
                .backend
                .push_feature_into_release_candidate(release.clone(), feature)
                .map_err(|e| self.fail(&release, e))?;
        }

        release.metadata = Some(Utc::now().format(CANDIDATE_TIMESTAMP_FORMAT).to_string());
        self.hook(HookType::PreReleaseTag, &release, &mut warnings)
            .map_err(|e| self.fail(&release, e))?;
        let release = self.backend.create_release_tag(release)?;
        self.hook(HookType::PostReleaseTag, &release, &mut warnings)?;

        info!(version = %release.version, features = release.features.len(), "release candidate created");
        Ok(ReleaseOutcome::Released { release, warnings })
    }

    /// Release the features labelled stable onto the base branch, then clean up.
    pub fn release_stable<F>(&self, confirm: F) -> Result<ReleaseOutcome>
    where
        F: FnOnce(&Version, &[Feature]) -> bool,
    {
        let settings = self.backend.settings();
        let label = settings.stable_label.clone();
        let features = self.backend.get_features_by_label(&label)?;
        if features.is_empty() {
            return Err(FlowError::NoFeaturesReady(label));
        }

        let version = self.backend.get_release_stable_version()?;
        if !confirm(&version, &features) {
            info!(version = %version, "stable release cancelled");
            return Ok(ReleaseOutcome::Cancelled);
        }

        let mut release = Release::stable(version, settings.master_branch.clone());
        release.status = ReleaseStatus::Started;

        let (ready, mut warnings) = self.probe(&release, features)?;
        if ready.is_empty() {
            return Err(FlowError::NoFeaturesReady(label));
        }

        // Features merged before a failure stay on the base branch, untagged
        for feature in ready {
            release = self
                .backend
                .push_feature_into_release_stable(release.clone(), feature)
                .map_err(|e| self.fail(&release, e))?;
        }

        self.hook(HookType::PreReleaseTag, &release, &mut warnings)
            .map_err(|e| self.fail(&release, e))?;
        let release = self.backend.create_release_tag(release)?;
        self.hook(HookType::PostReleaseTag, &release, &mut warnings)?;

        let release = self.backend.cleanup_release(release)?;
        self.hook(HookType::PostCleanup, &release, &mut warnings)?;

        info!(version = %release.version, features = release.features.len(), "stable release created");
        Ok(ReleaseOutcome::Released { release, warnings })
    }

    /// Check every feature against the release target.
    ///
    /// Features without changes become warnings. The first feature that cannot
    /// be merged aborts the release.
    fn probe(
        &self,
        release: &Release,
        features: Vec<Feature>,
    ) -> Result<(Vec<Feature>, Vec<WorkflowWarning>)> {
        let mut ready = Vec::new();
        let mut warnings = Vec::new();

        for feature in features {
            match self.backend.is_feature_ready_for_release(&feature, release) {
                Ok(true) => ready.push(feature),
                Ok(false) => {
                    let reason = format!(
                        "feature '{}' cannot be merged into '{}'",
                        feature.name, release.branch
                    );
                    return Err(self.fail(release, FlowError::aborted(&release.version, reason)));
                }
                Err(FlowError::NoChanges { feature, target }) => {
                    warn!(feature = %feature, target = %target, "feature has no changes, skipping");
                    warnings.push(WorkflowWarning::NoChanges { feature, target });
                }
                Err(e) => return Err(self.fail(release, e)),
            }
        }

        Ok((ready, warnings))
    }

    fn hook(
        &self,
        hook_type: HookType,
        release: &Release,
        warnings: &mut Vec<WorkflowWarning>,
    ) -> Result<()> {
        let context = HookContext::for_release(hook_type, release);
        let failure = HookExecutor::run(&self.hooks, hook_type, &context, &self.workdir)?;
        if let Some(reason) = failure {
            warnings.push(WorkflowWarning::HookFailed {
                hook: hook_type.name().to_string(),
                reason,
            });
        }
        Ok(())
    }

    /// Roll back a candidate branch and turn `error` into the failure to report.
    ///
    /// Merge conflicts become [FlowError::ReleaseAborted] for both release types.
    fn fail(&self, release: &Release, error: FlowError) -> FlowError {
        self.rollback(release);
        match error {
            FlowError::MergeConflict { .. } => {
                FlowError::aborted(&release.version, error.to_string())
            }
            other => other,
        }
    }

    fn rollback(&self, release: &Release) {
        if release.is_stable() {
            return;
        }
        match self.backend.remove_release_candidate(release) {
            Ok(()) => info!(branch = %release.branch, "release candidate rolled back"),
            Err(e) => warn!(branch = %release.branch, error = %e, "failed to roll back release candidate"),
        }
    }
}
