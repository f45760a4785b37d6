//! User scripts run at key release points:
//! - pre-release-tag: before the release tag is created (failure aborts)
//! - post-release-tag: after the release tag exists
//! - post-cleanup: after a stable release closed its features

pub mod executor;
pub mod lifecycle;

pub use executor::HookExecutor;
pub use lifecycle::{HookContext, HookType};
