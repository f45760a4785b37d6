//! Backend variant driving a hosting provider API
//!
//! Features are branches, release requests are pull requests and labels are
//! pull request labels. Every operation is a call on a [HostingApi].

use crate::domain::feature::release_request_title;
use crate::domain::{
    Feature, FeatureAction, FeatureStatus, Release, ReleaseRequest, ReleaseStatus,
};
use crate::error::{FlowError, Result};
use crate::git::hosting::{HostingApi, MergeOutcome, NewPullRequest, PullRequestRecord};
use crate::git::{FlowSettings, GitBackend};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub struct HostedBackend<A: HostingApi> {
    api: A,
    settings: FlowSettings,
}

impl<A: HostingApi> HostedBackend<A> {
    pub fn new(api: A, settings: FlowSettings) -> Self {
        HostedBackend { api, settings }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn branch_head(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .api
            .branches()?
            .into_iter()
            .find(|branch| branch.name == name)
            .map(|branch| branch.commit))
    }

    fn master_head(&self) -> Result<String> {
        let master = &self.settings.master_branch;
        self.branch_head(master)?
            .ok_or_else(|| FlowError::backend(format!("base branch '{}' not found", master)))
    }

    /// Pull request number of the feature, looked up when not cached
    fn pull_request_number(&self, feature: &Feature) -> Result<Option<u64>> {
        if let Some(number) = feature.release_request.as_ref().and_then(|rr| rr.number) {
            return Ok(Some(number));
        }
        Ok(self
            .api
            .find_open_pull_request(&feature.name)?
            .map(|pr| pr.number))
    }

    /// Bullet list of the commits the feature adds on top of the base branch
    fn change_summary(&self, feature: &str) -> Result<String> {
        let commits = self.api.compare(&self.settings.master_branch, feature)?;
        Ok(commits
            .iter()
            .map(|commit| format!("- {}", commit.message.lines().next().unwrap_or("")))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

fn to_release_request(pr: PullRequestRecord) -> ReleaseRequest {
    ReleaseRequest {
        number: Some(pr.number),
        name: pr.title,
        url: Some(pr.url),
        description: pr.description,
        is_mergeable: pr.mergeable,
        source_branch: pr.source_branch,
        target_branch: pr.target_branch,
        commit: pr.head_commit,
    }
}

impl<A: HostingApi> GitBackend for HostedBackend<A> {
    fn name(&self) -> &'static str {
        "hosted"
    }

    fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        Ok(self.api.branches()?.into_iter().map(|b| b.name).collect())
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        Ok(self.api.tags()?.into_iter().map(|t| t.name).collect())
    }

    fn build_feature(&self, name: &str) -> Result<Feature> {
        let mut feature = Feature::new(name);
        let head = match self.branch_head(name)? {
            Some(head) => head,
            None => return Ok(feature),
        };

        feature.status = FeatureStatus::Started;
        feature.commit = Some(head);

        if let Some(pr) = self.api.find_open_pull_request(name)? {
            feature.labels = self.api.pull_request_labels(pr.number)?.into_iter().collect();
            feature.release_request = Some(to_release_request(pr));
        }

        Ok(feature.apply_labels(&self.settings.candidate_label, &self.settings.stable_label))
    }

    fn start_feature(&self, feature: Feature) -> Result<Feature> {
        feature.ensure(FeatureAction::Start)?;
        if self.branch_head(&feature.name)?.is_some() {
            return Err(FlowError::exists(format!("branch '{}'", feature.name)));
        }

        let head = self.master_head()?;
        self.api.create_branch(&feature.name, &head)?;
        info!(provider = self.api.provider(), feature = %feature.name, "feature started");

        let mut feature = feature.transition(FeatureAction::Start)?;
        feature.commit = Some(head);
        Ok(feature)
    }

    fn close_feature(&self, feature: Feature) -> Result<Feature> {
        feature.ensure(FeatureAction::Close)?;
        self.api.delete_branch(&feature.name)?;
        info!(provider = self.api.provider(), feature = %feature.name, "feature closed");
        feature.transition(FeatureAction::Close)
    }

    fn get_feature_labels(&self, feature: &Feature) -> Result<BTreeSet<String>> {
        match self.pull_request_number(feature)? {
            Some(number) => Ok(self.api.pull_request_labels(number)?.into_iter().collect()),
            None => Ok(BTreeSet::new()),
        }
    }

    fn add_label_to_feature(&self, mut feature: Feature, label: &str) -> Result<Feature> {
        let number = self.pull_request_number(&feature)?.ok_or_else(|| {
            FlowError::state(format!("feature '{}' has no release request", feature.name))
        })?;

        self.api.add_pull_request_label(number, label)?;
        feature.labels.insert(label.to_string());
        Ok(feature)
    }

    fn remove_labels_from_feature(&self, mut feature: Feature) -> Result<Feature> {
        if let Some(number) = self.pull_request_number(&feature)? {
            self.api.clear_pull_request_labels(number)?;
        }
        feature.labels.clear();
        Ok(feature)
    }

    fn open_release_request(&self, mut feature: Feature) -> Result<Feature> {
        if feature.release_request.is_some() {
            return Ok(feature);
        }

        let pr = match self.api.find_open_pull_request(&feature.name)? {
            Some(pr) => pr,
            None => {
                let request = NewPullRequest {
                    title: release_request_title(&feature.name),
                    description: self.change_summary(&feature.name)?,
                    source_branch: feature.name.clone(),
                    target_branch: self.settings.master_branch.clone(),
                };
                let pr = self.api.create_pull_request(&request)?;
                info!(feature = %feature.name, number = pr.number, url = %pr.url, "release request opened");
                pr
            }
        };

        feature.release_request = Some(to_release_request(pr));
        Ok(feature)
    }

    fn start_release_candidate(&self, mut release: Release) -> Result<Release> {
        if self.branch_head(&release.branch)?.is_some() {
            return Err(FlowError::exists(format!("release branch '{}'", release.branch)));
        }

        let head = self.master_head()?;
        self.api.create_branch(&release.branch, &head)?;
        info!(branch = %release.branch, "release branch created");

        release.status = ReleaseStatus::Started;
        Ok(release)
    }

    fn is_feature_ready_for_release(&self, feature: &Feature, release: &Release) -> Result<bool> {
        if self.api.compare(&release.branch, &feature.name)?.is_empty() {
            return Err(FlowError::no_changes(&feature.name, &release.branch));
        }

        let pr = match self.api.find_open_pull_request(&feature.name)? {
            Some(pr) => Some(to_release_request(pr)),
            None => feature.release_request.clone(),
        };
        let pr = pr.ok_or_else(|| {
            FlowError::state(format!("feature '{}' has no release request", feature.name))
        })?;

        debug!(feature = %feature.name, mergeable = ?pr.is_mergeable, "mergeability");
        Ok(pr.is_mergeable == Some(true))
    }

    fn push_feature_into_release(&self, mut release: Release, feature: Feature) -> Result<Release> {
        let outcome = if release.is_stable() {
            let number = self.pull_request_number(&feature)?.ok_or_else(|| {
                FlowError::state(format!("feature '{}' has no release request", feature.name))
            })?;
            self.api.merge_pull_request(number)?
        } else {
            let message = format!("Merge branch '{}' into {}", feature.name, release.branch);
            self.api.merge_branch(&release.branch, &feature.name, &message)?
        };

        match outcome {
            MergeOutcome::Merged { commit } => {
                info!(feature = %feature.name, branch = %release.branch, commit = %commit, "feature merged");
            }
            MergeOutcome::UpToDate => {
                warn!(feature = %feature.name, branch = %release.branch, "nothing to merge");
            }
            MergeOutcome::Conflict => {
                return Err(FlowError::conflict(&feature.name, &release.branch));
            }
        }

        release.features.push(feature);
        Ok(release)
    }

    fn create_release_tag(&self, mut release: Release) -> Result<Release> {
        let tag = release.tag_name()?;
        let head = self.branch_head(&release.branch)?.ok_or_else(|| {
            FlowError::backend(format!("release branch '{}' not found", release.branch))
        })?;

        let mut description = format!("Release {}", release.version);
        for name in release.feature_names() {
            description.push_str(&format!("\n- {}", name));
        }

        self.api.create_release(&tag, &head, &description)?;
        info!(tag = %tag, commit = %head, "release tagged");
        release.tag = Some(tag);
        Ok(release)
    }

    fn delete_release_branch(&self, branch: &str) -> Result<()> {
        self.api.delete_branch(branch)
    }
}
