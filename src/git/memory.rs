use crate::error::{FlowError, Result};
use crate::git::hosting::{
    BranchRecord, CommitRecord, HostingApi, MergeOutcome, NewPullRequest, PullRequestRecord,
    TagRecord,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct PullState {
    record: PullRequestRecord,
    labels: Vec<String>,
    open: bool,
}

#[derive(Debug, Default)]
struct HostState {
    commits: HashMap<String, CommitRecord>,
    /// Branch name -> commit shas, oldest first
    branches: BTreeMap<String, Vec<String>>,
    tags: BTreeMap<String, String>,
    pulls: Vec<PullState>,
    conflicting: BTreeSet<String>,
    releases: Vec<(String, String, String)>,
    next_commit: u64,
}

impl HostState {
    fn new_commit(&mut self, message: &str) -> String {
        self.next_commit += 1;
        let sha = format!("{:040x}", self.next_commit);
        self.commits.insert(
            sha.clone(),
            CommitRecord {
                sha: sha.clone(),
                message: message.to_string(),
            },
        );
        sha
    }

    fn history(&self, branch: &str) -> Result<&Vec<String>> {
        self.branches
            .get(branch)
            .ok_or_else(|| FlowError::backend(format!("branch not found: {}", branch)))
    }

    fn head(&self, branch: &str) -> Result<String> {
        self.history(branch)?
            .last()
            .cloned()
            .ok_or_else(|| FlowError::backend(format!("branch {} has no commits", branch)))
    }

    fn missing(&self, base: &str, head: &str) -> Result<Vec<String>> {
        let known: HashSet<&String> = self.history(base)?.iter().collect();
        Ok(self
            .history(head)?
            .iter()
            .filter(|sha| !known.contains(sha))
            .cloned()
            .collect())
    }

    fn merge(&mut self, base: &str, head: &str, message: &str) -> Result<MergeOutcome> {
        let missing = self.missing(base, head)?;
        if missing.is_empty() {
            return Ok(MergeOutcome::UpToDate);
        }
        if self.conflicting.contains(head) {
            return Ok(MergeOutcome::Conflict);
        }

        let merge_commit = self.new_commit(message);
        let history = self
            .branches
            .get_mut(base)
            .ok_or_else(|| FlowError::backend(format!("branch not found: {}", base)))?;
        history.extend(missing);
        history.push(merge_commit.clone());

        Ok(MergeOutcome::Merged {
            commit: merge_commit,
        })
    }

    fn pull_mut(&mut self, number: u64) -> Result<&mut PullState> {
        self.pulls
            .iter_mut()
            .find(|pull| pull.record.number == number)
            .ok_or_else(|| FlowError::backend(format!("pull request #{} not found", number)))
    }

    fn with_mergeable(&self, pull: &PullState) -> PullRequestRecord {
        let mut record = pull.record.clone();
        record.mergeable = Some(!self.conflicting.contains(&record.source_branch));
        if let Ok(head) = self.head(&record.source_branch) {
            record.head_commit = head;
        }
        record
    }
}

/// In-process hosting provider for tests and dry runs
///
/// Branch histories are lists of synthetic commits; merges append the missing
/// commits plus a merge commit. Branches marked with
/// [mark_conflicting](InMemoryHost::mark_conflicting) fail every merge.
pub struct InMemoryHost {
    repository: String,
    state: Mutex<HostState>,
}

impl InMemoryHost {
    /// Create an empty host
    pub fn new(repository: impl Into<String>) -> Self {
        InMemoryHost {
            repository: repository.into(),
            state: Mutex::new(HostState::default()),
        }
    }

    /// Create a host whose `branch` holds a single initial commit
    pub fn with_branch(repository: impl Into<String>, branch: &str) -> Self {
        let host = InMemoryHost::new(repository);
        {
            let mut state = host.state();
            let sha = state.new_commit("Initial commit");
            state.branches.insert(branch.to_string(), vec![sha]);
        }
        host
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a commit on top of `branch`
    pub fn commit(&self, branch: &str, message: &str) -> Result<String> {
        let mut state = self.state();
        state.history(branch)?;
        let sha = state.new_commit(message);
        if let Some(history) = state.branches.get_mut(branch) {
            history.push(sha.clone());
        }
        Ok(sha)
    }

    /// Add a tag pointing to a commit
    pub fn add_tag(&self, name: impl Into<String>, commit: impl Into<String>) {
        self.state().tags.insert(name.into(), commit.into());
    }

    /// Make every merge of `branch` report a conflict
    pub fn mark_conflicting(&self, branch: impl Into<String>) {
        self.state().conflicting.insert(branch.into());
    }

    pub fn branch_names(&self) -> Vec<String> {
        self.state().branches.keys().cloned().collect()
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.state().tags.keys().cloned().collect()
    }

    pub fn branch_head(&self, branch: &str) -> Option<String> {
        self.state().head(branch).ok()
    }

    /// Commit messages of `branch`, oldest first
    pub fn messages(&self, branch: &str) -> Vec<String> {
        let state = self.state();
        match state.branches.get(branch) {
            Some(history) => history
                .iter()
                .filter_map(|sha| state.commits.get(sha))
                .map(|commit| commit.message.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Published releases as `(tag, commit, description)`
    pub fn releases(&self) -> Vec<(String, String, String)> {
        self.state().releases.clone()
    }

    pub fn pull_requests(&self) -> Vec<PullRequestRecord> {
        let state = self.state();
        state.pulls.iter().map(|pull| state.with_mergeable(pull)).collect()
    }
}

impl HostingApi for InMemoryHost {
    fn provider(&self) -> &str {
        "memory"
    }

    fn branches(&self) -> Result<Vec<BranchRecord>> {
        let state = self.state();
        state
            .branches
            .keys()
            .map(|name| {
                Ok(BranchRecord {
                    name: name.clone(),
                    commit: state.head(name)?,
                })
            })
            .collect()
    }

    fn tags(&self) -> Result<Vec<TagRecord>> {
        Ok(self
            .state()
            .tags
            .iter()
            .map(|(name, commit)| TagRecord {
                name: name.clone(),
                commit: commit.clone(),
            })
            .collect())
    }

    fn create_branch(&self, name: &str, commit: &str) -> Result<BranchRecord> {
        let mut state = self.state();
        if state.branches.contains_key(name) {
            return Err(FlowError::backend(format!("reference already exists: {}", name)));
        }

        let history: Vec<String> = state
            .branches
            .values()
            .find_map(|history| {
                history
                    .iter()
                    .position(|sha| sha == commit)
                    .map(|index| history[..=index].to_vec())
            })
            .ok_or_else(|| FlowError::backend(format!("commit not found: {}", commit)))?;

        state.branches.insert(name.to_string(), history);
        Ok(BranchRecord {
            name: name.to_string(),
            commit: commit.to_string(),
        })
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        if state.branches.remove(name).is_none() {
            return Err(FlowError::backend(format!("reference does not exist: {}", name)));
        }
        for pull in state
            .pulls
            .iter_mut()
            .filter(|pull| pull.record.source_branch == name)
        {
            pull.open = false;
        }
        Ok(())
    }

    fn compare(&self, base: &str, head: &str) -> Result<Vec<CommitRecord>> {
        let state = self.state();
        Ok(state
            .missing(base, head)?
            .iter()
            .filter_map(|sha| state.commits.get(sha).cloned())
            .collect())
    }

    fn find_open_pull_request(&self, source_branch: &str) -> Result<Option<PullRequestRecord>> {
        let state = self.state();
        Ok(state
            .pulls
            .iter()
            .find(|pull| pull.open && pull.record.source_branch == source_branch)
            .map(|pull| state.with_mergeable(pull)))
    }

    fn create_pull_request(&self, request: &NewPullRequest) -> Result<PullRequestRecord> {
        let mut state = self.state();
        if state
            .pulls
            .iter()
            .any(|pull| pull.open && pull.record.source_branch == request.source_branch)
        {
            return Err(FlowError::backend(format!(
                "a pull request already exists for {}",
                request.source_branch
            )));
        }
        state.history(&request.target_branch)?;
        let head_commit = state.head(&request.source_branch)?;

        let number = state.pulls.len() as u64 + 1;
        let record = PullRequestRecord {
            number,
            title: request.title.clone(),
            url: format!("memory://{}/pull/{}", self.repository, number),
            description: request.description.clone(),
            mergeable: None,
            source_branch: request.source_branch.clone(),
            target_branch: request.target_branch.clone(),
            head_commit,
        };
        let pull = PullState {
            record,
            labels: Vec::new(),
            open: true,
        };
        let created = state.with_mergeable(&pull);
        state.pulls.push(pull);
        Ok(created)
    }

    fn pull_request_labels(&self, number: u64) -> Result<Vec<String>> {
        Ok(self.state().pull_mut(number)?.labels.clone())
    }

    fn add_pull_request_label(&self, number: u64, label: &str) -> Result<()> {
        let mut state = self.state();
        let pull = state.pull_mut(number)?;
        if !pull.labels.iter().any(|l| l == label) {
            pull.labels.push(label.to_string());
        }
        Ok(())
    }

    fn clear_pull_request_labels(&self, number: u64) -> Result<()> {
        self.state().pull_mut(number)?.labels.clear();
        Ok(())
    }

    fn merge_pull_request(&self, number: u64) -> Result<MergeOutcome> {
        let mut state = self.state();
        let pull = state.pull_mut(number)?;
        if !pull.open {
            return Err(FlowError::backend(format!("pull request #{} is closed", number)));
        }
        let (source, target) = (
            pull.record.source_branch.clone(),
            pull.record.target_branch.clone(),
        );

        let message = format!("Merge pull request #{} from {}", number, source);
        let outcome = state.merge(&target, &source, &message)?;
        if outcome != MergeOutcome::Conflict {
            state.pull_mut(number)?.open = false;
        }
        Ok(outcome)
    }

    fn merge_branch(&self, base: &str, head: &str, message: &str) -> Result<MergeOutcome> {
        self.state().merge(base, head, message)
    }

    fn create_release(&self, tag: &str, commit: &str, description: &str) -> Result<()> {
        let mut state = self.state();
        if state.tags.contains_key(tag) {
            return Err(FlowError::backend(format!("tag already exists: {}", tag)));
        }
        if !state.commits.contains_key(commit) {
            return Err(FlowError::backend(format!("commit not found: {}", commit)));
        }
        state.tags.insert(tag.to_string(), commit.to_string());
        state
            .releases
            .push((tag.to_string(), commit.to_string(), description.to_string()));
        Ok(())
    }
}
