//! Pure formatting functions for UI output.
//!
//! This module contains all display/formatting logic separated from user interaction.
//! The `format_*` functions return plain text and are testable; the `display_*`
//! functions style and print it.

use console::style;

use crate::domain::{Feature, Release, ReleaseType, Version};
use crate::warning::WorkflowWarning;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

pub fn display_warning(warning: &WorkflowWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow().bold(), warning);
}

/// First seven characters of a commit id
pub fn short_commit(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// One line describing a feature: name, status, head commit and labels
pub fn format_feature_row(feature: &Feature, name_width: usize) -> String {
    let commit = feature.commit.as_deref().map(short_commit).unwrap_or("-");
    let mut row = format!(
        "{:<width$}  {:<17}  {}",
        feature.name,
        feature.status.as_str(),
        commit,
        width = name_width
    );

    if !feature.labels.is_empty() {
        let labels: Vec<&str> = feature.labels.iter().map(String::as_str).collect();
        row.push_str(&format!("  [{}]", labels.join(", ")));
    }
    if let Some(url) = feature.release_request.as_ref().and_then(|rr| rr.url.as_deref()) {
        row.push_str(&format!("  {}", url));
    }
    row
}

/// Display every feature branch with its state.
pub fn display_features(features: &[Feature]) {
    if features.is_empty() {
        display_status("No feature branches found");
        return;
    }

    println!("\n{}", style("Features:").bold());
    let width = features.iter().map(|f| f.name.len()).max().unwrap_or(0);
    for feature in features {
        println!("  {}", format_feature_row(feature, width));
    }
}

/// Summary shown before a release is cut
pub fn format_release_plan(release_type: ReleaseType, version: &Version, features: &[Feature]) -> String {
    let mut plan = match release_type {
        ReleaseType::Candidate => format!("Release candidate {}", version),
        ReleaseType::Stable => format!("Stable release {}", version),
    };
    plan.push_str(&format!(" with {} feature(s):", features.len()));
    for feature in features {
        plan.push_str(&format!("\n  - {}", feature.name));
    }
    plan
}

pub fn display_release_plan(release_type: ReleaseType, version: &Version, features: &[Feature]) {
    println!("\n{}", style(format_release_plan(release_type, version, features)).bold());
}

/// Display the result of a finished release.
pub fn display_release(release: &Release) {
    let tag = release.tag.as_deref().unwrap_or("(untagged)");
    display_success(&format!(
        "Released {} on branch '{}' with tag {}",
        release.version,
        release.branch,
        style(tag).cyan()
    ));
    for feature in &release.features {
        println!("    {} ({})", feature.name, feature.status);
    }
}

pub fn display_version(label: &str, value: &str) {
    println!("{:<10} {}", format!("{}:", label), style(value).cyan());
}
