//! Fixture repositories built with git2 for the integration tests.

#![allow(dead_code)]

use git2::build::CheckoutBuilder;
use git2::{BranchType, Oid, Repository, RepositoryInitOptions, Signature};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub struct Fixture {
    pub dir: TempDir,
    pub repo: Repository,
}

impl Fixture {
    /// Repository on `master` holding one commit with README.md
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Could not create temp dir");

        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("master");
        let repo = Repository::init_opts(dir.path(), &opts).expect("Could not init git repo");

        {
            let mut config = repo.config().expect("Could not get config");
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
            config.set_bool("commit.gpgsign", false).unwrap();
            config.set_bool("tag.gpgsign", false).unwrap();
        }

        fs::write(dir.path().join("README.md"), "Initial content\n").unwrap();
        {
            let mut index = repo.index().unwrap();
            index.add_path(Path::new("README.md")).unwrap();
            index.write().unwrap();
            let tree_id = index.write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            let sig = repo.signature().unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
                .unwrap();
        }

        Fixture { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn signature(&self) -> Signature<'static> {
        Signature::now("Test User", "test@example.com").unwrap()
    }

    pub fn head_of(&self, branch: &str) -> Oid {
        self.repo
            .find_branch(branch, BranchType::Local)
            .unwrap()
            .get()
            .peel_to_commit()
            .unwrap()
            .id()
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.repo.find_branch(branch, BranchType::Local).is_ok()
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.repo
            .tag_names(None)
            .unwrap()
            .iter()
            .flatten()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn current_branch(&self) -> String {
        self.repo.head().unwrap().shorthand().unwrap().to_string()
    }

    /// Create `name` pointing at the head of `from`
    pub fn branch(&self, name: &str, from: &str) {
        let commit = self.repo.find_commit(self.head_of(from)).unwrap();
        self.repo.branch(name, &commit, false).unwrap();
    }

    pub fn tag(&self, name: &str, branch: &str) {
        let object = self.repo.find_object(self.head_of(branch), None).unwrap();
        self.repo.tag_lightweight(name, &object, false).unwrap();
    }

    /// Commit a top-level file on `branch` without checking it out
    pub fn commit_file(&self, branch: &str, file: &str, content: &str, message: &str) -> Oid {
        let parent = self.repo.find_commit(self.head_of(branch)).unwrap();
        let blob = self.repo.blob(content.as_bytes()).unwrap();

        let mut builder = self.repo.treebuilder(Some(&parent.tree().unwrap())).unwrap();
        builder.insert(file, blob, 0o100644).unwrap();
        let tree = self.repo.find_tree(builder.write().unwrap()).unwrap();

        let sig = self.signature();
        let reference = format!("refs/heads/{}", branch);
        let oid = self
            .repo
            .commit(Some(&reference), &sig, &sig, message, &tree, &[&parent])
            .unwrap();

        // Keep index and worktree in step when the checked-out branch moved
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().force()))
            .unwrap();
        oid
    }

    /// Bare repository registered as remote `name`
    pub fn add_bare_remote(&self, name: &str) -> TempDir {
        let dir = TempDir::new().expect("Could not create temp dir");
        Repository::init_bare(dir.path()).expect("Could not init bare repo");
        self.repo
            .remote(name, dir.path().to_str().unwrap())
            .expect("Could not add remote");
        dir
    }

    /// Content of `file` at the head of `branch`
    pub fn file_on_branch(&self, branch: &str, file: &str) -> String {
        let commit = self.repo.find_commit(self.head_of(branch)).unwrap();
        let entry = commit.tree().unwrap().get_path(Path::new(file)).unwrap();
        let blob = self.repo.find_blob(entry.id()).unwrap();
        let content = String::from_utf8_lossy(blob.content()).to_string();
        content
    }

    /// Whether `file` exists in the tree at the head of `branch`
    pub fn branch_has_file(&self, branch: &str, file: &str) -> bool {
        let commit = self.repo.find_commit(self.head_of(branch)).unwrap();
        let tree = commit.tree().unwrap();
        let found = tree.get_name(file).is_some();
        found
    }
}

/// Full reference names of the repository at `path`
pub fn reference_names(path: &Path) -> Vec<String> {
    let repo = Repository::open_bare(path).expect("Could not open bare repo");
    let mut names: Vec<String> = repo
        .references()
        .unwrap()
        .flatten()
        .filter_map(|reference| reference.name().map(|name| name.to_string()))
        .collect();
    names.sort();
    names
}
