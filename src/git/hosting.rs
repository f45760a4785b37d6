//! Hosting provider capability used by [HostedBackend](super::HostedBackend)
//!
//! The trait mirrors the REST operations GitHub, GitLab and Bitbucket expose
//! for branches, tags, pull requests, labels and releases. Wire formats stay
//! behind implementations of the trait.

use crate::error::Result;

/// Identity of a hosted repository
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostingCredentials {
    pub username: String,
    pub repository: String,
    pub token: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRecord {
    pub name: String,
    pub commit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub name: String,
    pub commit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
}

/// An open pull/merge request as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRecord {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub description: String,
    /// `None` while the provider has not computed mergeability
    pub mergeable: Option<bool>,
    pub source_branch: String,
    pub target_branch: String,
    pub head_commit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub description: String,
    pub source_branch: String,
    pub target_branch: String,
}

/// Result of a merge performed by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged { commit: String },
    UpToDate,
    Conflict,
}

/// Operations a hosting provider offers for the release workflow
pub trait HostingApi {
    /// Provider name used in logs and messages
    fn provider(&self) -> &str;

    fn branches(&self) -> Result<Vec<BranchRecord>>;

    fn tags(&self) -> Result<Vec<TagRecord>>;

    fn create_branch(&self, name: &str, commit: &str) -> Result<BranchRecord>;

    fn delete_branch(&self, name: &str) -> Result<()>;

    /// Commits reachable from `head` but not from `base`, oldest first
    fn compare(&self, base: &str, head: &str) -> Result<Vec<CommitRecord>>;

    fn find_open_pull_request(&self, source_branch: &str) -> Result<Option<PullRequestRecord>>;

    fn create_pull_request(&self, request: &NewPullRequest) -> Result<PullRequestRecord>;

    fn pull_request_labels(&self, number: u64) -> Result<Vec<String>>;

    fn add_pull_request_label(&self, number: u64, label: &str) -> Result<()>;

    fn clear_pull_request_labels(&self, number: u64) -> Result<()>;

    fn merge_pull_request(&self, number: u64) -> Result<MergeOutcome>;

    /// Merge branch `head` into branch `base`
    fn merge_branch(&self, base: &str, head: &str, message: &str) -> Result<MergeOutcome>;

    /// Publish a release (and its tag) at `commit`
    fn create_release(&self, tag: &str, commit: &str, description: &str) -> Result<()>;
}

impl<T: HostingApi + ?Sized> HostingApi for Box<T> {
    fn provider(&self) -> &str {
        (**self).provider()
    }

    fn branches(&self) -> Result<Vec<BranchRecord>> {
        (**self).branches()
    }

    fn tags(&self) -> Result<Vec<TagRecord>> {
        (**self).tags()
    }

    fn create_branch(&self, name: &str, commit: &str) -> Result<BranchRecord> {
        (**self).create_branch(name, commit)
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        (**self).delete_branch(name)
    }

    fn compare(&self, base: &str, head: &str) -> Result<Vec<CommitRecord>> {
        (**self).compare(base, head)
    }

    fn find_open_pull_request(&self, source_branch: &str) -> Result<Option<PullRequestRecord>> {
        (**self).find_open_pull_request(source_branch)
    }

    fn create_pull_request(&self, request: &NewPullRequest) -> Result<PullRequestRecord> {
        (**self).create_pull_request(request)
    }

    fn pull_request_labels(&self, number: u64) -> Result<Vec<String>> {
        (**self).pull_request_labels(number)
    }

    fn add_pull_request_label(&self, number: u64, label: &str) -> Result<()> {
        (**self).add_pull_request_label(number, label)
    }

    fn clear_pull_request_labels(&self, number: u64) -> Result<()> {
        (**self).clear_pull_request_labels(number)
    }

    fn merge_pull_request(&self, number: u64) -> Result<MergeOutcome> {
        (**self).merge_pull_request(number)
    }

    fn merge_branch(&self, base: &str, head: &str, message: &str) -> Result<MergeOutcome> {
        (**self).merge_branch(base, head, message)
    }

    fn create_release(&self, tag: &str, commit: &str, description: &str) -> Result<()> {
        (**self).create_release(tag, commit, description)
    }
}
