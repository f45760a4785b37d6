use thiserror::Error;

/// Unified error type for release-flow operations
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Invalid version format: {0}")]
    InvalidVersionFormat(String),

    #[error("Unknown stability: {0}")]
    UnknownStability(String),

    #[error("Invalid version transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Merge conflict: feature '{feature}' cannot be merged into '{target}'")]
    MergeConflict { feature: String, target: String },

    #[error("No changes: feature '{feature}' has nothing new for '{target}'")]
    NoChanges { feature: String, target: String },

    #[error("No features ready: nothing is labelled '{0}'")]
    NoFeaturesReady(String),

    #[error("Release {version} aborted: {reason}")]
    ReleaseAborted { version: String, reason: String },

    #[error("Backend operation failed: {0}")]
    BackendOperationFailed(String),

    #[error("Unknown backend: '{0}' (expected local, github, gitlab or bitbucket)")]
    UnknownBackend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hook error: {0}")]
    Hook(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in release-flow
pub type Result<T> = std::result::Result<T, FlowError>;

impl FlowError {
    /// Create a version format error with context
    pub fn invalid_version(msg: impl Into<String>) -> Self {
        FlowError::InvalidVersionFormat(msg.into())
    }

    /// Create an unknown stability error with context
    pub fn unknown_stability(msg: impl Into<String>) -> Self {
        FlowError::UnknownStability(msg.into())
    }

    /// Create a version transition error with context
    pub fn transition(msg: impl Into<String>) -> Self {
        FlowError::InvalidTransition(msg.into())
    }

    /// Create a lifecycle guard error with context
    pub fn state(msg: impl Into<String>) -> Self {
        FlowError::InvalidState(msg.into())
    }

    /// Create an already-exists error with context
    pub fn exists(msg: impl Into<String>) -> Self {
        FlowError::AlreadyExists(msg.into())
    }

    /// Create a backend error with context
    pub fn backend(msg: impl Into<String>) -> Self {
        FlowError::BackendOperationFailed(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        FlowError::Config(msg.into())
    }

    /// Create a hook error with context
    pub fn hook(msg: impl Into<String>) -> Self {
        FlowError::Hook(msg.into())
    }

    pub fn conflict(feature: impl Into<String>, target: impl Into<String>) -> Self {
        FlowError::MergeConflict {
            feature: feature.into(),
            target: target.into(),
        }
    }

    pub fn no_changes(feature: impl Into<String>, target: impl Into<String>) -> Self {
        FlowError::NoChanges {
            feature: feature.into(),
            target: target.into(),
        }
    }

    pub fn aborted(version: impl ToString, reason: impl Into<String>) -> Self {
        FlowError::ReleaseAborted {
            version: version.to_string(),
            reason: reason.into(),
        }
    }
}
