use std::fmt;

/// Non-fatal issues met while cutting a release.
/// They are reported to the user alongside the release outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowWarning {
    /// Feature has no commits missing from the release target and was skipped
    NoChanges { feature: String, target: String },
    /// A post-release hook failed after the release was tagged
    HookFailed { hook: String, reason: String },
}

impl fmt::Display for WorkflowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowWarning::NoChanges { feature, target } => {
                write!(
                    f,
                    "Feature '{}' has no changes for '{}' and was skipped",
                    feature, target
                )
            }
            WorkflowWarning::HookFailed { hook, reason } => {
                let first_line = reason.lines().next().unwrap_or(reason.as_str());
                write!(f, "Hook '{}' failed: {}", hook, first_line)
            }
        }
    }
}
