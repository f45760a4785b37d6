//! User interface module - interaction (prompts) and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - Interactive prompts and user input handling

use std::io::{self, Write};

use anyhow::Result;

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_error, display_features, display_release, display_release_plan, display_status,
    display_success, display_version, display_warning,
};

use crate::domain::{Feature, ReleaseType, Version};

/// Prompts user to confirm an action with a yes/no prompt.
///
/// Displays the given prompt and accepts "y" or "yes" (case-insensitive) as confirmation.
/// Default is "no" if user presses Enter.
///
/// # Arguments
/// * `prompt` - The prompt message to display (without the "(y/N): " suffix)
///
/// # Returns
/// * `Ok(true)` - If user entered "y" or "yes"
/// * `Ok(false)` - Otherwise (including Enter, or "n"/"no")
/// * `Err` - If input error occurs
pub fn confirm_action(prompt: &str) -> Result<bool> {
    print!("\n{} (y/N): ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(is_yes(&input))
}

fn is_yes(input: &str) -> bool {
    let response = input.trim().to_lowercase();
    response == "y" || response == "yes"
}

/// Shows the release plan and asks whether to cut it.
///
/// With `assume_yes` the plan is shown and accepted without prompting.
/// Input errors count as a refusal.
pub fn confirm_release(
    release_type: ReleaseType,
    version: &Version,
    features: &[Feature],
    assume_yes: bool,
) -> bool {
    display_release_plan(release_type, version, features);
    if assume_yes {
        return true;
    }
    match confirm_action("Proceed?") {
        Ok(answer) => answer,
        Err(e) => {
            display_error(&format!("Cannot read confirmation: {}", e));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }

    #[test]
    fn test_confirm_release_assume_yes() {
        let version = Version::parse("1.1.0").unwrap();
        assert!(confirm_release(
            ReleaseType::Stable,
            &version,
            &[Feature::new("feature-x")],
            true
        ));
    }
}
