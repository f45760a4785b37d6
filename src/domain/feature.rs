use crate::error::{FlowError, Result};
use std::collections::BTreeSet;
use std::fmt;

/// Lifecycle state of a feature branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureStatus {
    New,
    Started,
    Closed,
    ReleaseCandidate,
    ReleaseStable,
}

/// Actions that move a feature through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureAction {
    Start,
    MarkReleaseCandidate,
    MarkReleaseStable,
    Close,
    MarkAsNew,
}

impl FeatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureStatus::New => "NEW",
            FeatureStatus::Started => "STARTED",
            FeatureStatus::Closed => "CLOSED",
            FeatureStatus::ReleaseCandidate => "RELEASE_CANDIDATE",
            FeatureStatus::ReleaseStable => "RELEASE_STABLE",
        }
    }

    /// Status reached by applying `action`, or `None` when the move is illegal
    pub fn after(self, action: FeatureAction) -> Option<FeatureStatus> {
        use FeatureAction as A;
        use FeatureStatus as S;

        match (self, action) {
            (S::New, A::Start) => Some(S::Started),
            (S::Started | S::ReleaseCandidate, A::MarkReleaseCandidate) => {
                Some(S::ReleaseCandidate)
            }
            (S::ReleaseCandidate | S::ReleaseStable, A::MarkReleaseStable) => {
                Some(S::ReleaseStable)
            }
            (S::Started | S::ReleaseCandidate | S::ReleaseStable, A::Close) => Some(S::Closed),
            (S::ReleaseCandidate | S::ReleaseStable, A::MarkAsNew) => Some(S::Started),
            _ => None,
        }
    }

    pub fn can_transition(self, action: FeatureAction) -> bool {
        self.after(action).is_some()
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FeatureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureAction::Start => "start",
            FeatureAction::MarkReleaseCandidate => "mark ready for release candidate",
            FeatureAction::MarkReleaseStable => "mark ready for stable release",
            FeatureAction::Close => "close",
            FeatureAction::MarkAsNew => "mark as new",
        };
        f.write_str(name)
    }
}

/// A merge/pull request from a feature branch into the base branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    /// Provider number; local repositories have none
    pub number: Option<u64>,
    pub name: String,
    pub url: Option<String>,
    pub description: String,
    pub is_mergeable: Option<bool>,
    pub source_branch: String,
    pub target_branch: String,
    pub commit: String,
}

/// A unit of development work, mapped 1:1 to a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    pub status: FeatureStatus,
    pub commit: Option<String>,
    pub labels: BTreeSet<String>,
    pub release_request: Option<ReleaseRequest>,
}

impl Feature {
    /// A feature whose branch does not exist yet
    pub fn new(name: impl Into<String>) -> Self {
        Feature {
            name: name.into(),
            status: FeatureStatus::New,
            commit: None,
            labels: BTreeSet::new(),
            release_request: None,
        }
    }

    /// Move to the status reached by `action`, failing with `InvalidState`
    pub fn transition(mut self, action: FeatureAction) -> Result<Self> {
        self.status = self.status.after(action).ok_or_else(|| {
            FlowError::state(format!(
                "cannot {} feature '{}' in status {}",
                action, self.name, self.status
            ))
        })?;
        Ok(self)
    }

    /// Fail with `InvalidState` unless `action` is allowed
    pub fn ensure(&self, action: FeatureAction) -> Result<()> {
        if self.status.can_transition(action) {
            Ok(())
        } else {
            Err(FlowError::state(format!(
                "cannot {} feature '{}' in status {}",
                action, self.name, self.status
            )))
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Elevate the status from the labels carried by the release request.
    ///
    /// The candidate label is applied first and the stable label second, so a
    /// feature carrying both ends up RELEASE_STABLE.
    pub fn apply_labels(mut self, candidate_label: &str, stable_label: &str) -> Self {
        if self.has_label(candidate_label) {
            self.status = FeatureStatus::ReleaseCandidate;
        }
        if self.has_label(stable_label) {
            self.status = FeatureStatus::ReleaseStable;
        }
        self
    }
}

/// Release request title derived from a branch name (`feature-user-login` -> `Feature user login`)
pub fn release_request_title(branch: &str) -> String {
    let spaced: String = branch
        .chars()
        .map(|c| if matches!(c, '-' | '_' | '/') { ' ' } else { c })
        .collect();
    let trimmed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => branch.to_string(),
    }
}

/// Tag name that carries `label` for `feature` in repositories without release requests
pub fn label_tag(label: &str, feature: &str) -> String {
    format!("{}--{}", label, feature)
}

/// Which of `labels` the tag `tag` carries for `feature`, if any
pub fn label_from_tag<'a>(tag: &str, feature: &str, labels: &[&'a str]) -> Option<&'a str> {
    labels
        .iter()
        .copied()
        .find(|label| label_tag(label, feature) == tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_feature_defaults() {
        let feature = Feature::new("feature-x");
        assert_eq!(feature.status, FeatureStatus::New);
        assert!(feature.commit.is_none());
        assert!(feature.labels.is_empty());
        assert!(feature.release_request.is_none());
    }

    #[test]
    fn test_transition_table() {
        use FeatureAction as A;
        use FeatureStatus as S;

        assert_eq!(S::New.after(A::Start), Some(S::Started));
        assert_eq!(S::Started.after(A::MarkReleaseCandidate), Some(S::ReleaseCandidate));
        assert_eq!(S::ReleaseCandidate.after(A::MarkReleaseStable), Some(S::ReleaseStable));
        assert_eq!(S::ReleaseStable.after(A::MarkAsNew), Some(S::Started));
        assert_eq!(S::ReleaseCandidate.after(A::Close), Some(S::Closed));

        assert_eq!(S::Started.after(A::Start), None);
        assert_eq!(S::New.after(A::Close), None);
        assert_eq!(S::Started.after(A::MarkReleaseStable), None);
        assert_eq!(S::Started.after(A::MarkAsNew), None);
        assert_eq!(S::Closed.after(A::MarkReleaseCandidate), None);
    }

    #[test]
    fn test_transition_rejects_illegal_move() {
        let mut feature = Feature::new("feature-x");
        feature.status = FeatureStatus::Started;
        let err = feature.transition(FeatureAction::Start).unwrap_err();
        assert!(matches!(err, FlowError::InvalidState(_)));
        assert!(err.to_string().contains("STARTED"));
    }

    #[test]
    fn test_apply_labels_stable_wins() {
        let mut feature = Feature::new("feature-x");
        feature.status = FeatureStatus::Started;
        feature.labels.insert("RELEASE-CANDIDATE".to_string());
        feature.labels.insert("RELEASE-STABLE".to_string());

        let feature = feature.apply_labels("RELEASE-CANDIDATE", "RELEASE-STABLE");
        assert_eq!(feature.status, FeatureStatus::ReleaseStable);
    }

    #[test]
    fn test_apply_labels_candidate_only() {
        let mut feature = Feature::new("feature-x");
        feature.status = FeatureStatus::Started;
        feature.labels.insert("RELEASE-CANDIDATE".to_string());

        let feature = feature.apply_labels("RELEASE-CANDIDATE", "RELEASE-STABLE");
        assert_eq!(feature.status, FeatureStatus::ReleaseCandidate);
    }

    #[test]
    fn test_release_request_title() {
        assert_eq!(release_request_title("feature-user-login"), "Feature user login");
        assert_eq!(release_request_title("feature/x"), "Feature x");
        assert_eq!(release_request_title("--"), "--");
    }

    #[test]
    fn test_label_tags() {
        let tag = label_tag("RELEASE-CANDIDATE", "feature-x");
        assert_eq!(tag, "RELEASE-CANDIDATE--feature-x");
        let labels = ["RELEASE-CANDIDATE", "RELEASE-STABLE"];
        assert_eq!(label_from_tag(&tag, "feature-x", &labels), Some("RELEASE-CANDIDATE"));
        assert_eq!(label_from_tag(&tag, "feature-y", &labels), None);
        assert_eq!(label_from_tag("--feature-x", "feature-x", &labels), None);
        assert_eq!(label_from_tag("OTHER--feature-x", "feature-x", &labels), None);
    }

    #[test]
    fn test_label_tag_of_longer_feature_name_is_not_matched() {
        let labels = ["RELEASE-CANDIDATE", "RELEASE-STABLE"];
        let tag = label_tag("RELEASE-CANDIDATE", "feature-a--feature-x");
        assert_eq!(label_from_tag(&tag, "feature-x", &labels), None);
        assert_eq!(
            label_from_tag(&tag, "feature-a--feature-x", &labels),
            Some("RELEASE-CANDIDATE")
        );
    }
}
