// tests/local_backend_test.rs
mod common;

use common::{reference_names, Fixture};
use release_flow::config::HooksConfig;
use release_flow::domain::{Feature, FeatureStatus, Increment, Release, Version};
use release_flow::git::{FlowSettings, GitBackend, LocalBackend};
use release_flow::workflow::{ReleaseFlow, ReleaseOutcome};
use release_flow::warning::WorkflowWarning;
use release_flow::FlowError;

fn backend(fixture: &Fixture) -> LocalBackend {
    LocalBackend::open(fixture.path(), FlowSettings::default()).expect("Could not open backend")
}

fn ready_for_candidate(flow: &ReleaseFlow, fixture: &Fixture, name: &str, file: &str) {
    flow.start_feature(name).unwrap();
    let branch = flow.feature_name(name);
    fixture.commit_file(&branch, file, &format!("{} content\n", name), &format!("add {}", file));
    flow.mark_ready_for_candidate(name).unwrap();
}

#[test]
fn test_start_feature_creates_branch_from_master() {
    let fixture = Fixture::new();
    let backend = backend(&fixture);
    let flow = ReleaseFlow::new(&backend, HooksConfig::default());

    let feature = flow.start_feature("x").unwrap();
    assert_eq!(feature.name, "feature-x");
    assert_eq!(feature.status, FeatureStatus::Started);
    assert_eq!(feature.commit, Some(fixture.head_of("master").to_string()));
    assert!(fixture.has_branch("feature-x"));

    let err = flow.start_feature("x").unwrap_err();
    assert!(matches!(err, FlowError::InvalidState(_)));
}

#[test]
fn test_close_unknown_feature_fails() {
    let fixture = Fixture::new();
    let backend = backend(&fixture);
    let flow = ReleaseFlow::new(&backend, HooksConfig::default());

    let err = flow.close_feature("missing").unwrap_err();
    assert!(matches!(err, FlowError::InvalidState(_)));
}

#[test]
fn test_labels_are_stored_as_tags() {
    let fixture = Fixture::new();
    let backend = backend(&fixture);
    let flow = ReleaseFlow::new(&backend, HooksConfig::default());
    ready_for_candidate(&flow, &fixture, "x", "x.txt");

    assert!(fixture
        .tag_names()
        .contains(&"RELEASE-CANDIDATE--feature-x".to_string()));

    let feature = backend.build_feature("feature-x").unwrap();
    assert_eq!(feature.status, FeatureStatus::ReleaseCandidate);
    let rr = feature.release_request.expect("release request synthesized from labels");
    assert_eq!(rr.name, "Feature x");
    assert_eq!(rr.description, "- add x.txt");
    assert!(rr.url.is_none());

    let feature = flow.mark_as_new("x").unwrap();
    assert_eq!(feature.status, FeatureStatus::Started);
    assert!(fixture.tag_names().is_empty());
    assert!(backend.build_feature("feature-x").unwrap().release_request.is_none());
}

#[test]
fn test_latest_version_over_tags_and_branches() {
    let fixture = Fixture::new();
    let backend = backend(&fixture);
    assert_eq!(backend.get_latest_version().unwrap(), Version::stable(1, 0, 0));

    fixture.tag("1.2.0", "master");
    fixture.tag("v1.3.0-RC2", "master");
    fixture.branch("1.3.0-RC3", "master");
    fixture.branch("feature-zeta", "master");

    assert_eq!(
        backend.get_latest_version().unwrap(),
        Version::parse("1.3.0-RC3").unwrap()
    );
    assert_eq!(backend.get_latest_release_stable_tag().unwrap(), "1.2.0");
    assert_eq!(backend.get_latest_release_candidate_tag().unwrap(), "v1.3.0-RC2");
    assert_eq!(
        backend.get_release_candidate_version(Increment::Patch).unwrap(),
        Version::parse("1.3.0-RC4").unwrap()
    );
}

#[test]
fn test_release_candidate_end_to_end() {
    let fixture = Fixture::new();
    let backend = backend(&fixture);
    let flow = ReleaseFlow::new(&backend, HooksConfig::default());
    ready_for_candidate(&flow, &fixture, "x", "x.txt");

    let ready = backend.get_features_by_label("RELEASE-CANDIDATE").unwrap();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].name, "feature-x");

    let outcome = flow.release_candidate(Increment::Patch, |_, _| true).unwrap();
    let ReleaseOutcome::Released { release, warnings } = outcome else {
        panic!("expected a release");
    };

    assert!(warnings.is_empty());
    assert_eq!(release.branch, "1.0.1-RC");
    let tag = release.tag.clone().unwrap();
    assert!(tag.starts_with("1.0.1-RC1+"), "unexpected tag {}", tag);
    assert!(fixture.tag_names().contains(&tag));
    assert!(fixture.branch_has_file("1.0.1-RC", "x.txt"));
    assert!(!fixture.branch_has_file("master", "x.txt"));
    assert_eq!(fixture.current_branch(), "master");

    // The next cut continues the candidate series
    assert_eq!(
        backend.get_release_candidate_version(Increment::Patch).unwrap(),
        Version::parse("1.0.1-RC2").unwrap()
    );
}

#[test]
fn test_conflicting_feature_rolls_back_release_branch() {
    let fixture = Fixture::new();
    let backend = backend(&fixture);
    let flow = ReleaseFlow::new(&backend, HooksConfig::default());

    ready_for_candidate(&flow, &fixture, "x", "x.txt");
    ready_for_candidate(&flow, &fixture, "y", "README.md");
    fixture.commit_file("master", "README.md", "master rewrite\n", "rewrite readme");

    let err = flow.release_candidate(Increment::Patch, |_, _| true).unwrap_err();
    assert!(matches!(err, FlowError::ReleaseAborted { .. }), "got {:?}", err);
    assert!(err.to_string().contains("feature-y"));

    assert!(!fixture.has_branch("1.0.1-RC"));
    assert_eq!(fixture.current_branch(), "master");
    assert!(!fixture.tag_names().iter().any(|t| t.starts_with("1.0.1")));
    assert!(backend.git().run(&["status", "--porcelain"]).unwrap().is_empty());
}

#[test]
fn test_feature_without_changes_is_skipped() {
    let fixture = Fixture::new();
    let backend = backend(&fixture);
    let flow = ReleaseFlow::new(&backend, HooksConfig::default());

    ready_for_candidate(&flow, &fixture, "x", "x.txt");
    flow.start_feature("empty").unwrap();
    flow.mark_ready_for_candidate("empty").unwrap();

    let outcome = flow.release_candidate(Increment::Patch, |_, _| true).unwrap();
    let ReleaseOutcome::Released { release, warnings } = outcome else {
        panic!("expected a release");
    };
    assert_eq!(release.feature_names(), vec!["feature-x".to_string()]);
    assert_eq!(
        warnings,
        vec![WorkflowWarning::NoChanges {
            feature: "feature-empty".to_string(),
            target: "1.0.1-RC".to_string(),
        }]
    );
}

#[test]
fn test_only_empty_features_removes_release_branch() {
    let fixture = Fixture::new();
    let backend = backend(&fixture);
    let flow = ReleaseFlow::new(&backend, HooksConfig::default());

    flow.start_feature("empty").unwrap();
    flow.mark_ready_for_candidate("empty").unwrap();

    let err = flow.release_candidate(Increment::Patch, |_, _| true).unwrap_err();
    assert!(matches!(err, FlowError::NoFeaturesReady(_)));
    assert!(!fixture.has_branch("1.0.1-RC"));
}

#[test]
fn test_stable_release_cleans_up() {
    let fixture = Fixture::new();
    let backend = backend(&fixture);
    let flow = ReleaseFlow::new(&backend, HooksConfig::default());

    ready_for_candidate(&flow, &fixture, "x", "x.txt");
    ready_for_candidate(&flow, &fixture, "y", "y.txt");
    flow.release_candidate(Increment::Patch, |_, _| true).unwrap();

    flow.mark_ready_for_stable("x").unwrap();
    flow.mark_ready_for_stable("y").unwrap();

    let outcome = flow.release_stable(|version, features| {
        assert_eq!(version.to_string(), "1.0.1");
        assert_eq!(features.len(), 2);
        true
    });
    let ReleaseOutcome::Released { release, .. } = outcome.unwrap() else {
        panic!("expected a release");
    };

    assert_eq!(release.tag.as_deref(), Some("1.0.1"));
    assert!(release
        .features
        .iter()
        .all(|f| f.status == FeatureStatus::Closed));

    assert!(fixture.branch_has_file("master", "x.txt"));
    assert!(fixture.branch_has_file("master", "y.txt"));
    assert!(!fixture.has_branch("feature-x"));
    assert!(!fixture.has_branch("feature-y"));
    assert!(!fixture.has_branch("1.0.1-RC"));

    let tags = fixture.tag_names();
    assert!(tags.contains(&"1.0.1".to_string()));
    assert!(!tags.iter().any(|t| t.contains("--feature-")));
    assert_eq!(backend.get_latest_version().unwrap(), Version::stable(1, 0, 1));
}

#[test]
fn test_start_feature_on_existing_branch_fails() {
    let fixture = Fixture::new();
    fixture.branch("feature-x", "master");
    let backend = backend(&fixture);

    let err = backend.start_feature(Feature::new("feature-x")).unwrap_err();
    assert!(matches!(err, FlowError::AlreadyExists(_)), "got {:?}", err);
}

#[test]
fn test_next_candidate_replaces_candidate_branch() {
    let fixture = Fixture::new();
    let backend = backend(&fixture);
    let flow = ReleaseFlow::new(&backend, HooksConfig::default());
    ready_for_candidate(&flow, &fixture, "x", "x.txt");
    flow.release_candidate(Increment::Patch, |_, _| true).unwrap();

    ready_for_candidate(&flow, &fixture, "y", "y.txt");
    let outcome = flow.release_candidate(Increment::Patch, |_, _| true).unwrap();
    let ReleaseOutcome::Released { release, .. } = outcome else {
        panic!("expected a release");
    };

    assert_eq!(release.version, Version::parse("1.0.1-RC2").unwrap());
    assert_eq!(release.branch, "1.0.1-RC");
    assert!(fixture.branch_has_file("1.0.1-RC", "x.txt"));
    assert!(fixture.branch_has_file("1.0.1-RC", "y.txt"));

    let candidate_tags: Vec<String> = fixture
        .tag_names()
        .into_iter()
        .filter(|t| t.starts_with("1.0.1-RC"))
        .collect();
    assert_eq!(candidate_tags.len(), 2);
}

#[test]
fn test_release_tag_is_not_overwritten() {
    let fixture = Fixture::new();
    fixture.tag("1.0.1", "master");
    let backend = backend(&fixture);

    let release = Release::stable(Version::stable(1, 0, 1), "master");
    let err = backend.create_release_tag(release).unwrap_err();
    assert!(matches!(err, FlowError::AlreadyExists(_)), "got {:?}", err);
}

#[test]
fn test_label_of_longer_feature_name_is_ignored() {
    let fixture = Fixture::new();
    let backend = backend(&fixture);
    let flow = ReleaseFlow::new(&backend, HooksConfig::default());

    flow.start_feature("x").unwrap();
    ready_for_candidate(&flow, &fixture, "a--feature-x", "a.txt");

    let feature = backend.build_feature("feature-x").unwrap();
    assert_eq!(feature.status, FeatureStatus::Started);
    assert!(feature.labels.is_empty());
    assert!(feature.release_request.is_none());
}

#[test]
fn test_mutations_are_mirrored_to_remote() {
    let fixture = Fixture::new();
    let remote = fixture.add_bare_remote("origin");
    let backend = backend(&fixture).with_remote(Some("origin".to_string()));
    let flow = ReleaseFlow::new(&backend, HooksConfig::default());
    ready_for_candidate(&flow, &fixture, "x", "x.txt");

    let outcome = flow.release_candidate(Increment::Patch, |_, _| true).unwrap();
    let ReleaseOutcome::Released { release, .. } = outcome else {
        panic!("expected a release");
    };

    let refs = reference_names(remote.path());
    assert!(refs.contains(&"refs/heads/feature-x".to_string()), "{:?}", refs);
    assert!(refs.contains(&"refs/heads/1.0.1-RC".to_string()), "{:?}", refs);
    assert!(refs.contains(&"refs/tags/RELEASE-CANDIDATE--feature-x".to_string()));
    assert!(refs.contains(&format!("refs/tags/{}", release.tag.unwrap())));

    flow.mark_as_new("x").unwrap();
    let refs = reference_names(remote.path());
    assert!(!refs.iter().any(|r| r.contains("RELEASE-CANDIDATE--")));
}

#[test]
fn test_stable_conflict_between_features_aborts() {
    let fixture = Fixture::new();
    let backend = backend(&fixture);
    let flow = ReleaseFlow::new(&backend, HooksConfig::default());

    // Each rewrite merges cleanly on its own; together they conflict
    ready_for_candidate(&flow, &fixture, "a", "README.md");
    ready_for_candidate(&flow, &fixture, "b", "README.md");
    flow.mark_ready_for_stable("a").unwrap();
    flow.mark_ready_for_stable("b").unwrap();

    let err = flow.release_stable(|_, _| true).unwrap_err();
    assert!(matches!(err, FlowError::ReleaseAborted { .. }), "got {:?}", err);
    assert!(err.to_string().contains("feature-b"));

    // feature-a already landed on the base branch, nothing was tagged
    assert_eq!(fixture.file_on_branch("master", "README.md"), "a content\n");
    assert!(!fixture.tag_names().contains(&"1.0.1".to_string()));
    assert!(fixture.has_branch("feature-b"));
    assert_eq!(fixture.current_branch(), "master");
    assert!(backend.git().run(&["status", "--porcelain"]).unwrap().is_empty());
}
