use crate::config::HooksConfig;
use crate::domain::{Release, ReleaseType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Points in the release workflow where a hook may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookType {
    PreReleaseTag,
    PostReleaseTag,
    PostCleanup,
}

impl HookType {
    pub fn name(&self) -> &'static str {
        match self {
            HookType::PreReleaseTag => "pre-release-tag",
            HookType::PostReleaseTag => "post-release-tag",
            HookType::PostCleanup => "post-cleanup",
        }
    }

    /// Whether a failing script aborts the workflow
    pub fn is_blocking(&self) -> bool {
        matches!(self, HookType::PreReleaseTag)
    }

    /// Script configured for this hook, if any
    pub fn script<'a>(&self, hooks: &'a HooksConfig) -> Option<&'a str> {
        let script = match self {
            HookType::PreReleaseTag => hooks.pre_release_tag.as_deref(),
            HookType::PostReleaseTag => hooks.post_release_tag.as_deref(),
            HookType::PostCleanup => hooks.post_cleanup.as_deref(),
        };
        script.filter(|s| !s.trim().is_empty())
    }
}

/// Context information passed to a hook
#[derive(Debug, Clone)]
pub struct HookContext {
    pub hook_type: HookType,
    pub release_type: ReleaseType,
    pub version: String,
    /// Release branch, or the base branch for stable releases
    pub branch: String,
    /// Set once the release has been tagged
    pub tag: Option<String>,
    pub features: Vec<String>,
}

impl HookContext {
    pub fn for_release(hook_type: HookType, release: &Release) -> Self {
        HookContext {
            hook_type,
            release_type: release.release_type(),
            version: release.version.to_string(),
            branch: release.branch.clone(),
            tag: release.tag.clone(),
            features: release.feature_names(),
        }
    }

    /// Maps context fields to RELEASEFLOW_* environment variables
    pub fn to_env_vars(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();

        env.insert("RELEASEFLOW_HOOK".to_string(), self.hook_type.name().to_string());
        env.insert(
            "RELEASEFLOW_RELEASE_TYPE".to_string(),
            self.release_type.to_string(),
        );
        env.insert("RELEASEFLOW_VERSION".to_string(), self.version.clone());
        env.insert("RELEASEFLOW_BRANCH".to_string(), self.branch.clone());
        env.insert(
            "RELEASEFLOW_FEATURE_COUNT".to_string(),
            self.features.len().to_string(),
        );
        env.insert("RELEASEFLOW_FEATURES".to_string(), self.features.join(","));

        if let Some(ref tag) = self.tag {
            env.insert("RELEASEFLOW_TAG".to_string(), tag.clone());
        }

        env
    }
}
