use crate::config::Config;
use crate::error::{FlowError, Result};
use crate::git::hosting::{HostingApi, HostingCredentials};
use crate::git::{GitBackend, HostedBackend, LocalBackend};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Backend variants selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Github,
    Gitlab,
    Bitbucket,
}

impl BackendKind {
    pub fn is_hosted(self) -> bool {
        !matches!(self, BackendKind::Local)
    }
}

impl FromStr for BackendKind {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "git" => Ok(BackendKind::Local),
            "github" => Ok(BackendKind::Github),
            "gitlab" => Ok(BackendKind::Gitlab),
            "bitbucket" => Ok(BackendKind::Bitbucket),
            _ => Err(FlowError::UnknownBackend(s.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Local => "local",
            BackendKind::Github => "github",
            BackendKind::Gitlab => "gitlab",
            BackendKind::Bitbucket => "bitbucket",
        };
        f.write_str(name)
    }
}

/// Builds the hosting client for a hosted backend from the configured credentials
pub type HostingConnector<'a> =
    &'a dyn Fn(BackendKind, HostingCredentials) -> Result<Box<dyn HostingApi>>;

/// Select the backend named by `config.backend`.
///
/// The local backend opens the repository at `workdir`. Hosted kinds hand
/// `config.credentials` to `connect` and drive the client it returns; without
/// a connector they fail, since no HTTP client ships with this crate.
pub fn open_backend(
    config: &Config,
    workdir: &Path,
    connect: Option<HostingConnector>,
) -> Result<Box<dyn GitBackend>> {
    let kind: BackendKind = config.backend.parse()?;
    let settings = config.settings()?;
    debug!(backend = %kind, workdir = %workdir.display(), "opening backend");

    match kind {
        BackendKind::Local => Ok(Box::new(
            LocalBackend::open(workdir, settings)?.with_remote(config.repository.remote.clone()),
        )),
        hosted => {
            let connect = connect.ok_or_else(|| {
                FlowError::backend(format!(
                    "no {} API client configured; use backend = \"local\" or supply a hosting client",
                    hosted
                ))
            })?;
            let credentials = config.hosting_credentials()?;
            debug!(backend = %hosted, repository = %credentials.repository, "connecting to host");
            let api = connect(hosted, credentials)?;
            Ok(Box::new(HostedBackend::new(api, settings)))
        }
    }
}
