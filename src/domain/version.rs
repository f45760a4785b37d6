//! Semantic version value type with stability levels
//!
//! Versions render as `MAJOR.MINOR.PATCH[-STABILITYN][+METADATA]`, for example
//! `1.2.3`, `1.2.4-RC2` or `2.0.0-BETA1+20261017`. Stability is ordered
//! alpha < beta < rc < stable and drives the increase rules.

use crate::error::{FlowError, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

const VERSION_PATTERN: &str = r"(?i)^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:[-._]?(alpha|beta|rc|stable)[.-]?(\d+))?(?:\+([0-9a-z.\-]+))?$";

fn version_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(VERSION_PATTERN))
        .as_ref()
        .map_err(|e| FlowError::invalid_version(format!("version pattern: {}", e)))
}

/// Pre-release maturity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stability {
    Alpha,
    Beta,
    Rc,
    Stable,
}

impl Stability {
    /// Numeric rank used for ordering (alpha = 0 ... stable = 3)
    pub fn rank(self) -> u8 {
        match self {
            Stability::Alpha => 0,
            Stability::Beta => 1,
            Stability::Rc => 2,
            Stability::Stable => 3,
        }
    }

    /// Suffix token used in the canonical string form
    pub fn token(self) -> &'static str {
        match self {
            Stability::Alpha => "ALPHA",
            Stability::Beta => "BETA",
            Stability::Rc => "RC",
            Stability::Stable => "",
        }
    }

    pub fn is_pre_release(self) -> bool {
        self != Stability::Stable
    }
}

impl FromStr for Stability {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "alpha" => Ok(Stability::Alpha),
            "beta" => Ok(Stability::Beta),
            "rc" => Ok(Stability::Rc),
            "stable" => Ok(Stability::Stable),
            _ => Err(FlowError::unknown_stability(s)),
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stability::Alpha => "alpha",
            Stability::Beta => "beta",
            Stability::Rc => "rc",
            Stability::Stable => "stable",
        };
        f.write_str(name)
    }
}

/// Kind of increase applied by [`Version::increase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    Major,
    Minor,
    Patch,
    Alpha,
    Beta,
    Rc,
    Stable,
}

impl Increment {
    /// Target stability for stability increases, `None` for number bumps
    pub fn stability(self) -> Option<Stability> {
        match self {
            Increment::Alpha => Some(Stability::Alpha),
            Increment::Beta => Some(Stability::Beta),
            Increment::Rc => Some(Stability::Rc),
            Increment::Stable => Some(Stability::Stable),
            Increment::Major | Increment::Minor | Increment::Patch => None,
        }
    }
}

impl FromStr for Increment {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "major" => Ok(Increment::Major),
            "minor" => Ok(Increment::Minor),
            "patch" => Ok(Increment::Patch),
            "alpha" => Ok(Increment::Alpha),
            "beta" => Ok(Increment::Beta),
            "rc" => Ok(Increment::Rc),
            "stable" => Ok(Increment::Stable),
            _ => Err(FlowError::unknown_stability(s)),
        }
    }
}

impl fmt::Display for Increment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Increment::Major => "major",
            Increment::Minor => "minor",
            Increment::Patch => "patch",
            Increment::Alpha => "alpha",
            Increment::Beta => "beta",
            Increment::Rc => "rc",
            Increment::Stable => "stable",
        };
        f.write_str(name)
    }
}

/// Rules that differ between release policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncreasePolicy {
    /// Reject a patch increase on a pre-release whose major is above zero
    pub strict_patch: bool,
}

impl Default for IncreasePolicy {
    fn default() -> Self {
        IncreasePolicy { strict_patch: true }
    }
}

/// Immutable semantic version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
    stability: Stability,
    stability_version: u32,
    metadata: String,
}

impl Version {
    /// Create a version from explicit fields, re-validating the invariants
    pub fn new(
        major: u32,
        minor: u32,
        patch: u32,
        stability: Stability,
        stability_version: u32,
        metadata: impl Into<String>,
    ) -> Result<Self> {
        let metadata = metadata.into();

        if stability == Stability::Stable && stability_version != 0 {
            return Err(FlowError::invalid_version(format!(
                "stable version {}.{}.{} cannot carry stability version {}",
                major, minor, patch, stability_version
            )));
        }

        if !is_valid_metadata(&metadata) {
            return Err(FlowError::invalid_version(format!(
                "invalid metadata '{}'",
                metadata
            )));
        }

        Ok(Version {
            major,
            minor,
            patch,
            stability,
            stability_version,
            metadata,
        })
    }

    /// Create a stable version without metadata
    pub fn stable(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
            stability: Stability::Stable,
            stability_version: 0,
            metadata: String::new(),
        }
    }

    /// Parse a version string such as `v1.2.3-RC1+2017-07-12`
    pub fn parse(input: &str) -> Result<Self> {
        let captures = version_pattern()?
            .captures(input)
            .ok_or_else(|| FlowError::invalid_version(format!("'{}'", input)))?;

        let number = |index: usize| -> Result<u32> {
            match captures.get(index) {
                Some(m) => m.as_str().parse::<u32>().map_err(|_| {
                    FlowError::invalid_version(format!(
                        "'{}': component '{}' out of range",
                        input,
                        m.as_str()
                    ))
                }),
                None => Ok(0),
            }
        };

        let stability = match captures.get(4) {
            Some(m) => m.as_str().parse::<Stability>()?,
            None => Stability::Stable,
        };
        let metadata = captures.get(6).map(|m| m.as_str()).unwrap_or("");

        Version::new(
            number(1)?,
            number(2)?,
            number(3)?,
            stability,
            number(5)?,
            metadata,
        )
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn patch(&self) -> u32 {
        self.patch
    }

    pub fn stability(&self) -> Stability {
        self.stability
    }

    pub fn stability_version(&self) -> u32 {
        self.stability_version
    }

    pub fn metadata(&self) -> &str {
        &self.metadata
    }

    pub fn is_stable(&self) -> bool {
        self.stability == Stability::Stable
    }

    pub fn is_pre_release(&self) -> bool {
        self.stability.is_pre_release()
    }

    /// Whether both versions share major.minor.patch
    pub fn same_release(&self, other: &Version) -> bool {
        (self.major, self.minor, self.patch) == (other.major, other.minor, other.patch)
    }

    /// Copy of this version with its metadata replaced
    pub fn with_metadata(&self, metadata: impl Into<String>) -> Result<Self> {
        Version::new(
            self.major,
            self.minor,
            self.patch,
            self.stability,
            self.stability_version,
            metadata,
        )
    }

    /// Apply an increase with the default (strict) policy
    pub fn increase(&self, kind: Increment, metadata: &str) -> Result<Self> {
        self.increase_with(kind, metadata, IncreasePolicy::default())
    }

    /// Apply an increase and return the resulting version
    ///
    /// - `major`, `minor`, `patch` bump the number and land on a stable version.
    /// - `alpha`, `beta`, `rc` continue the same stability line, move up to a
    ///   higher stability, or open a new minor line when moving down from a
    ///   pre-release. From a stable version they open the pre-release line of
    ///   the same number.
    /// - `stable` promotes a pre-release, or bumps the minor of a stable version.
    pub fn increase_with(
        &self,
        kind: Increment,
        metadata: &str,
        policy: IncreasePolicy,
    ) -> Result<Self> {
        match kind {
            Increment::Major => Version::new(
                bump(self.major, self, kind)?,
                0,
                0,
                Stability::Stable,
                0,
                metadata,
            ),
            Increment::Minor => Version::new(
                self.major,
                bump(self.minor, self, kind)?,
                0,
                Stability::Stable,
                0,
                metadata,
            ),
            Increment::Patch => {
                if policy.strict_patch && self.major > 0 && self.is_pre_release() {
                    return Err(FlowError::transition(format!(
                        "patch increase is not allowed on pre-release {}",
                        self
                    )));
                }
                Version::new(
                    self.major,
                    self.minor,
                    bump(self.patch, self, kind)?,
                    Stability::Stable,
                    0,
                    metadata,
                )
            }
            Increment::Stable => {
                if !metadata.is_empty() {
                    return Err(FlowError::transition(format!(
                        "stable increase of {} cannot carry metadata '{}'",
                        self, metadata
                    )));
                }
                if self.is_pre_release() {
                    Ok(Version::stable(self.major, self.minor, self.patch))
                } else {
                    Ok(Version::stable(self.major, bump(self.minor, self, kind)?, 0))
                }
            }
            Increment::Alpha | Increment::Beta | Increment::Rc => {
                let target = kind
                    .stability()
                    .ok_or_else(|| FlowError::unknown_stability(kind.to_string()))?;

                match target.cmp(&self.stability) {
                    Ordering::Equal => Version::new(
                        self.major,
                        self.minor,
                        self.patch,
                        target,
                        bump(self.stability_version, self, kind)?,
                        metadata,
                    ),
                    Ordering::Greater => {
                        Version::new(self.major, self.minor, self.patch, target, 1, metadata)
                    }
                    Ordering::Less if self.is_stable() => {
                        Version::new(self.major, self.minor, self.patch, target, 1, metadata)
                    }
                    Ordering::Less => Version::new(
                        self.major,
                        bump(self.minor, self, kind)?,
                        0,
                        target,
                        1,
                        metadata,
                    ),
                }
            }
        }
    }
}

fn bump(value: u32, version: &Version, kind: Increment) -> Result<u32> {
    value
        .checked_add(1)
        .ok_or_else(|| FlowError::transition(format!("{} increase overflows {}", kind, version)))
}

fn is_valid_metadata(metadata: &str) -> bool {
    metadata
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

impl FromStr for Version {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (
            self.major,
            self.minor,
            self.patch,
            self.stability,
            self.stability_version,
        )
            .cmp(&(
                other.major,
                other.minor,
                other.patch,
                other.stability,
                other.stability_version,
            ))
            .then_with(|| self.metadata.cmp(&other.metadata))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.is_pre_release() {
            write!(f, "-{}{}", self.stability.token(), self.stability_version)?;
        }
        if !self.metadata.is_empty() {
            write!(f, "+{}", self.metadata)?;
        }
        Ok(())
    }
}
