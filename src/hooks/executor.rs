use crate::config::HooksConfig;
use crate::error::{FlowError, Result};
use crate::hooks::{HookContext, HookType};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// Executes release-flow hook scripts
pub struct HookExecutor;

impl HookExecutor {
    /// Execute a hook script with the given context
    ///
    /// The script is executed with environment variables set from the context.
    /// If the script exits with code 0, the hook succeeds. Any non-zero exit code
    /// is treated as a failure.
    ///
    /// # Arguments
    /// * `script_path` - Path to the hook script (must be executable)
    /// * `workdir` - Directory the script runs in
    /// * `context` - Hook context with environment variables
    ///
    /// # Returns
    /// * `Ok(())` if hook succeeds (exit code 0)
    /// * `Err` if script not found, not executable, or returns non-zero exit code
    pub fn execute(script_path: &Path, workdir: &Path, context: &HookContext) -> Result<()> {
        let script = script_path.display();

        if !script_path.exists() {
            return Err(FlowError::hook(format!("Hook script not found: {}", script)));
        }

        if !script_path.is_file() {
            return Err(FlowError::hook(format!("Hook path is not a file: {}", script)));
        }

        let program = script_path.canonicalize()?;
        let mut cmd = Command::new(program);
        cmd.current_dir(workdir);
        cmd.envs(context.to_env_vars());

        let output = cmd
            .output()
            .map_err(|e| FlowError::hook(format!("Failed to execute hook {}: {}", script, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(FlowError::hook(format!(
                "Hook {} failed with exit code {}\nStdout: {}\nStderr: {}",
                script,
                output.status.code().unwrap_or(-1),
                stdout,
                stderr
            )));
        }

        info!(hook = context.hook_type.name(), script = %script, "hook executed");
        Ok(())
    }

    /// Try to execute a hook, logging errors but not failing
    ///
    /// Used once the release tag exists, where a hook failure must not
    /// retroactively fail the release. Returns the failure message, if any.
    pub fn execute_permissive(
        script_path: &Path,
        workdir: &Path,
        context: &HookContext,
    ) -> Option<String> {
        match Self::execute(script_path, workdir, context) {
            Ok(()) => None,
            Err(e) => {
                warn!(hook = context.hook_type.name(), error = %e, "hook failed");
                Some(e.to_string())
            }
        }
    }

    /// Run the configured script for `hook_type`, if any.
    ///
    /// Relative script paths resolve against `workdir`. Blocking hooks
    /// propagate failures; the others return them as messages.
    pub fn run(
        hooks: &HooksConfig,
        hook_type: HookType,
        context: &HookContext,
        workdir: &Path,
    ) -> Result<Option<String>> {
        let Some(script) = hook_type.script(hooks) else {
            return Ok(None);
        };
        let script = resolve_script(script, workdir);

        if hook_type.is_blocking() {
            Self::execute(&script, workdir, context).map(|()| None)
        } else {
            Ok(Self::execute_permissive(&script, workdir, context))
        }
    }
}

/// Absolute scripts are kept, relative ones are taken from `workdir`
pub fn resolve_script(script: &str, workdir: &Path) -> PathBuf {
    let path = Path::new(script.trim());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workdir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Release, Version};

    fn context(hook_type: HookType) -> HookContext {
        let release = Release::candidate(Version::parse("1.0.1-RC1").unwrap());
        HookContext::for_release(hook_type, &release)
    }

    #[test]
    fn test_nonexistent_hook_fails() {
        let result = HookExecutor::execute(
            Path::new("/nonexistent/path/to/hook.sh"),
            Path::new("."),
            &context(HookType::PreReleaseTag),
        );
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Hook script not found"));
    }

    #[test]
    fn test_hook_directory_fails() {
        let result = HookExecutor::execute(
            Path::new("/tmp"),
            Path::new("."),
            &context(HookType::PostReleaseTag),
        );
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a file"));
    }

    #[test]
    fn test_run_without_script_is_noop() {
        let hooks = HooksConfig::default();
        let result = HookExecutor::run(
            &hooks,
            HookType::PreReleaseTag,
            &context(HookType::PreReleaseTag),
            Path::new("."),
        );
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_run_blocking_hook_propagates_failure() {
        let hooks = HooksConfig {
            pre_release_tag: Some("/nonexistent/pre.sh".to_string()),
            post_release_tag: Some("/nonexistent/post.sh".to_string()),
            post_cleanup: None,
        };

        let workdir = Path::new(".");
        let pre = HookExecutor::run(
            &hooks,
            HookType::PreReleaseTag,
            &context(HookType::PreReleaseTag),
            workdir,
        );
        assert!(matches!(pre, Err(FlowError::Hook(_))));

        let post = HookExecutor::run(
            &hooks,
            HookType::PostReleaseTag,
            &context(HookType::PostReleaseTag),
            workdir,
        )
        .unwrap()
        .unwrap();
        assert!(post.contains("Hook script not found"));
    }

    #[cfg(unix)]
    #[test]
    fn test_hook_receives_environment() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let script = dir.path().join("hook.sh");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$RELEASEFLOW_VERSION $RELEASEFLOW_BRANCH\" > {}\n",
                out.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        HookExecutor::execute(&script, dir.path(), &context(HookType::PreReleaseTag)).unwrap();
        let written = std::fs::read_to_string(out).unwrap();
        assert_eq!(written.trim(), "1.0.1-RC1 1.0.1-RC");
    }

    #[test]
    fn test_resolve_script() {
        let workdir = Path::new("/srv/repo");
        assert_eq!(
            resolve_script("scripts/pre.sh", workdir),
            PathBuf::from("/srv/repo/scripts/pre.sh")
        );
        assert_eq!(
            resolve_script("/opt/hooks/pre.sh", workdir),
            PathBuf::from("/opt/hooks/pre.sh")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_hook_runs_from_workdir() {
        use std::os::unix::fs::PermissionsExt;

        let repo = tempfile::tempdir().unwrap();
        std::fs::create_dir(repo.path().join("scripts")).unwrap();
        let script = repo.path().join("scripts").join("pre.sh");
        std::fs::write(&script, "#!/bin/sh\npwd > hook-ran.txt\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let hooks = HooksConfig {
            pre_release_tag: Some("scripts/pre.sh".to_string()),
            ..HooksConfig::default()
        };
        let result = HookExecutor::run(
            &hooks,
            HookType::PreReleaseTag,
            &context(HookType::PreReleaseTag),
            repo.path(),
        );
        assert!(matches!(result, Ok(None)), "got {:?}", result);
        assert!(repo.path().join("hook-ran.txt").exists());
    }
}
