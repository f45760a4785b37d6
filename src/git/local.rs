//! Backend variant driving a local repository with `git` subprocesses
//!
//! A local repository has no pull requests, so labels are stored as tags
//! named `{label}--{feature}` pointing at the feature branch, and a release
//! request is synthesized for any feature carrying at least one label tag.
//! When a remote is configured every mutation is mirrored with `git push`.

use crate::domain::feature::{label_from_tag, label_tag, release_request_title};
use crate::domain::{
    Feature, FeatureAction, FeatureStatus, Release, ReleaseRequest, ReleaseStatus,
};
use crate::error::{FlowError, Result};
use crate::git::command::GitCli;
use crate::git::{FlowSettings, GitBackend};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub struct LocalBackend {
    git: GitCli,
    settings: FlowSettings,
    remote: Option<String>,
}

impl LocalBackend {
    pub fn new(git: GitCli, settings: FlowSettings) -> Self {
        LocalBackend {
            git,
            settings,
            remote: None,
        }
    }

    /// Open the repository at `workdir`, failing when it is not a git repository
    pub fn open(workdir: impl Into<PathBuf>, settings: FlowSettings) -> Result<Self> {
        Ok(LocalBackend::new(GitCli::open(workdir)?, settings))
    }

    /// Mirror every mutation to `remote`
    pub fn with_remote(mut self, remote: Option<String>) -> Self {
        self.remote = remote;
        self
    }

    pub fn git(&self) -> &GitCli {
        &self.git
    }

    fn branch_head(&self, name: &str) -> Result<Option<String>> {
        let reference = format!("refs/heads/{}", name);
        let head = self
            .git
            .run_or(&["rev-parse", "--verify", "--quiet", &reference], "")?;
        Ok(if head.is_empty() { None } else { Some(head) })
    }

    fn master_head(&self) -> Result<String> {
        let master = &self.settings.master_branch;
        self.branch_head(master)?
            .ok_or_else(|| FlowError::backend(format!("base branch '{}' not found", master)))
    }

    /// Branch checked out now, or the detached commit
    fn current_ref(&self) -> Result<String> {
        let branch = self.git.run_or(&["symbolic-ref", "--quiet", "--short", "HEAD"], "")?;
        if branch.is_empty() {
            self.git.run(&["rev-parse", "HEAD"])
        } else {
            Ok(branch)
        }
    }

    fn ensure_clean(&self) -> Result<()> {
        let status = self
            .git
            .run(&["status", "--porcelain", "--untracked-files=no"])?;
        if status.is_empty() {
            Ok(())
        } else {
            Err(FlowError::backend(format!(
                "working tree of {} has uncommitted changes",
                self.git.workdir().display()
            )))
        }
    }

    /// Move off `branch` before deleting it
    fn leave_branch(&self, branch: &str) -> Result<()> {
        if self.current_ref()? == branch {
            self.git
                .run(&["checkout", "--quiet", &self.settings.master_branch])?;
        }
        Ok(())
    }

    fn label_tags(&self, feature: &str) -> Result<Vec<(String, String)>> {
        let labels = [
            self.settings.candidate_label.as_str(),
            self.settings.stable_label.as_str(),
        ];
        Ok(self
            .list_tags()?
            .into_iter()
            .filter_map(|tag| {
                label_from_tag(&tag, feature, &labels)
                    .map(|label| label.to_string())
                    .map(|label| (tag, label))
            })
            .collect())
    }

    fn tag_exists(&self, tag: &str) -> Result<bool> {
        let reference = format!("refs/tags/{}", tag);
        self.git.succeeds(&["rev-parse", "--verify", "--quiet", &reference])
    }

    fn delete_label_tags(&self, feature: &str) -> Result<()> {
        for (tag, _) in self.label_tags(feature)? {
            self.git.run(&["tag", "-d", &tag])?;
            self.mirror(&["--delete", &format!("refs/tags/{}", tag)])?;
        }
        Ok(())
    }

    fn has_unmerged_paths(&self) -> Result<bool> {
        Ok(!self.git.run(&["ls-files", "-u"])?.is_empty())
    }

    /// Number of commits `feature` has that `target` lacks
    fn commits_ahead(&self, target: &str, feature: &str) -> Result<u64> {
        let range = format!("{}..{}", target, feature);
        let count = self.git.run(&["rev-list", "--count", &range])?;
        count
            .parse()
            .map_err(|_| FlowError::backend(format!("unexpected rev-list output: {}", count)))
    }

    fn change_summary(&self, feature: &str) -> Result<String> {
        let range = format!("{}..{}", self.settings.master_branch, feature);
        Ok(self
            .git
            .lines(&["log", "--reverse", "--format=%s", &range])?
            .iter()
            .map(|subject| format!("- {}", subject))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn synthesize_release_request(&self, feature: &str, head: &str) -> Result<ReleaseRequest> {
        Ok(ReleaseRequest {
            number: None,
            name: release_request_title(feature),
            url: None,
            description: self.change_summary(feature)?,
            is_mergeable: None,
            source_branch: feature.to_string(),
            target_branch: self.settings.master_branch.clone(),
            commit: head.to_string(),
        })
    }

    fn mirror(&self, args: &[&str]) -> Result<()> {
        if let Some(remote) = &self.remote {
            let mut push = vec!["push", "--quiet", remote.as_str()];
            push.extend_from_slice(args);
            self.git.run(&push)?;
        }
        Ok(())
    }
}

impl GitBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        self.git
            .lines(&["for-each-ref", "--format=%(refname:lstrip=2)", "refs/heads"])
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        self.git
            .lines(&["for-each-ref", "--format=%(refname:lstrip=2)", "refs/tags"])
    }

    fn build_feature(&self, name: &str) -> Result<Feature> {
        let mut feature = Feature::new(name);
        let head = match self.branch_head(name)? {
            Some(head) => head,
            None => return Ok(feature),
        };

        feature.status = FeatureStatus::Started;
        feature.labels = self.get_feature_labels(&feature)?;
        if !feature.labels.is_empty() {
            feature.release_request = Some(self.synthesize_release_request(name, &head)?);
        }
        feature.commit = Some(head);

        Ok(feature.apply_labels(&self.settings.candidate_label, &self.settings.stable_label))
    }

    fn start_feature(&self, feature: Feature) -> Result<Feature> {
        feature.ensure(FeatureAction::Start)?;
        if self.branch_head(&feature.name)?.is_some() {
            return Err(FlowError::exists(format!("branch '{}'", feature.name)));
        }

        let head = self.master_head()?;
        self.git.run(&["branch", &feature.name, &head])?;
        self.mirror(&[&feature.name])?;
        info!(feature = %feature.name, "feature started");

        let mut feature = feature.transition(FeatureAction::Start)?;
        feature.commit = Some(head);
        Ok(feature)
    }

    fn close_feature(&self, feature: Feature) -> Result<Feature> {
        feature.ensure(FeatureAction::Close)?;
        self.leave_branch(&feature.name)?;
        self.git.run(&["branch", "-D", &feature.name])?;
        self.mirror(&["--delete", &format!("refs/heads/{}", feature.name)])?;
        info!(feature = %feature.name, "feature closed");
        self.delete_label_tags(&feature.name)?;
        feature.transition(FeatureAction::Close)
    }

    fn get_feature_labels(&self, feature: &Feature) -> Result<BTreeSet<String>> {
        Ok(self
            .label_tags(&feature.name)?
            .into_iter()
            .map(|(_, label)| label)
            .collect())
    }

    fn add_label_to_feature(&self, mut feature: Feature, label: &str) -> Result<Feature> {
        let tag = label_tag(label, &feature.name);
        if self.tag_exists(&tag)? {
            debug!(tag = %tag, "label already present");
        } else {
            self.git.run(&["tag", &tag, &feature.name])?;
            self.mirror(&[&format!("refs/tags/{}", tag)])?;
        }
        feature.labels.insert(label.to_string());
        Ok(feature)
    }

    fn remove_labels_from_feature(&self, mut feature: Feature) -> Result<Feature> {
        self.delete_label_tags(&feature.name)?;
        feature.labels.clear();
        feature.release_request = None;
        Ok(feature)
    }

    fn open_release_request(&self, mut feature: Feature) -> Result<Feature> {
        if feature.release_request.is_some() {
            return Ok(feature);
        }
        let head = self.branch_head(&feature.name)?.ok_or_else(|| {
            FlowError::state(format!("feature branch '{}' does not exist", feature.name))
        })?;
        feature.release_request = Some(self.synthesize_release_request(&feature.name, &head)?);
        Ok(feature)
    }

    fn start_release_candidate(&self, mut release: Release) -> Result<Release> {
        if self.branch_head(&release.branch)?.is_some() {
            return Err(FlowError::exists(format!("release branch '{}'", release.branch)));
        }

        let head = self.master_head()?;
        self.git.run(&["branch", &release.branch, &head])?;
        self.mirror(&[&release.branch])?;
        info!(branch = %release.branch, "release branch created");

        release.status = ReleaseStatus::Started;
        Ok(release)
    }

    /// Trial merge on the release branch, rolled back whatever the result
    fn is_feature_ready_for_release(&self, feature: &Feature, release: &Release) -> Result<bool> {
        if self.commits_ahead(&release.branch, &feature.name)? == 0 {
            return Err(FlowError::no_changes(&feature.name, &release.branch));
        }
        self.ensure_clean()?;

        let original = self.current_ref()?;
        self.git.run(&["checkout", "--quiet", &release.branch])?;
        let before = self.git.run(&["rev-parse", "HEAD"])?;

        let message = format!("Probe merge of '{}' into {}", feature.name, release.branch);
        let merge = self
            .git
            .output(&["merge", "--no-ff", "--no-edit", "-m", &message, &feature.name])?;

        let ready = if merge.success {
            Ok(true)
        } else if self.has_unmerged_paths()? {
            self.git.run(&["merge", "--abort"])?;
            Err(FlowError::conflict(&feature.name, &release.branch))
        } else {
            Err(FlowError::backend(format!(
                "git merge {} failed: {}",
                feature.name,
                merge.stderr.trim()
            )))
        };

        self.git.run(&["reset", "--hard", "--quiet", &before])?;
        self.git.run(&["checkout", "--quiet", &original])?;
        debug!(feature = %feature.name, branch = %release.branch, ok = ready.is_ok(), "probe merge");
        ready
    }

    fn push_feature_into_release(&self, mut release: Release, feature: Feature) -> Result<Release> {
        if self.commits_ahead(&release.branch, &feature.name)? == 0 {
            warn!(feature = %feature.name, branch = %release.branch, "nothing to merge");
            release.features.push(feature);
            return Ok(release);
        }
        self.ensure_clean()?;

        let original = self.current_ref()?;
        self.git.run(&["checkout", "--quiet", &release.branch])?;

        let message = format!("Merge branch '{}' into {}", feature.name, release.branch);
        let merge = self
            .git
            .output(&["merge", "--no-ff", "--no-edit", "-m", &message, &feature.name])?;

        if !merge.success {
            let conflicted = self.has_unmerged_paths()?;
            if conflicted {
                self.git.run(&["merge", "--abort"])?;
            }
            self.git.run(&["checkout", "--quiet", &original])?;
            return Err(if conflicted {
                FlowError::conflict(&feature.name, &release.branch)
            } else {
                FlowError::backend(format!(
                    "git merge {} failed: {}",
                    feature.name,
                    merge.stderr.trim()
                ))
            });
        }

        self.git.run(&["checkout", "--quiet", &original])?;
        self.mirror(&[&release.branch])?;
        info!(feature = %feature.name, branch = %release.branch, "feature merged");

        release.features.push(feature);
        Ok(release)
    }

    fn create_release_tag(&self, mut release: Release) -> Result<Release> {
        let tag = release.tag_name()?;
        if self.tag_exists(&tag)? {
            return Err(FlowError::exists(format!("tag '{}'", tag)));
        }

        let mut message = format!("Release {}", release.version);
        for name in release.feature_names() {
            message.push_str(&format!("\n- {}", name));
        }

        self.git
            .run(&["tag", "-a", &tag, "-m", &message, &release.branch])?;
        self.mirror(&[&format!("refs/tags/{}", tag)])?;
        info!(tag = %tag, branch = %release.branch, "release tagged");

        release.tag = Some(tag);
        Ok(release)
    }

    fn delete_release_branch(&self, branch: &str) -> Result<()> {
        self.leave_branch(branch)?;
        self.git.run(&["branch", "-D", branch])?;
        self.mirror(&["--delete", &format!("refs/heads/{}", branch)])
    }
}
