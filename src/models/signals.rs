// file: src/models/signals.rs
// description: derived engineering-signal record keyed by (username, repo)
// reference: internal data structures

use serde::{Deserialize, Serialize};

/// Diagnostic blob persisted alongside the signals as JSON text: how many
/// paths the tree listing produced, and the first 50 in original order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalDiagnostics {
    pub total_paths: usize,
    pub sample_paths: Vec<String>,
}

/// One row of the `repo_signals` table, 1:1 with a repository. Entirely
/// derived from the file tree; recomputed and overwritten on each run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoSignals {
    pub username: String,
    pub repo: String,

    pub has_tests: bool,
    pub has_github_actions: bool,
    pub has_ci_config: bool,
    pub has_lint_config: bool,
    pub has_precommit: bool,
    pub has_dockerfile: bool,
    pub has_docker_compose: bool,
    pub has_makefile: bool,
    pub has_code_of_conduct: bool,
    pub has_contributing: bool,
    pub has_license: bool,
    pub has_security_policy: bool,
    pub has_issue_templates: bool,
    pub has_pr_templates: bool,
    pub has_changelog: bool,
    pub has_docs: bool,

    pub detected_test_framework: String,
    pub detected_ci: String,

    pub organization_score: f64,
    pub coding_standards_score: f64,
    pub automation_score: f64,

    /// Sorted label set joined with ", "; empty when nothing matched.
    pub tech_stack: String,

    pub diagnostics: SignalDiagnostics,
}

impl RepoSignals {
    pub fn diagnostics_json(&self) -> String {
        serde_json::to_string(&self.diagnostics).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn parse_diagnostics(raw: &str) -> SignalDiagnostics {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_round_trip() {
        let signals = RepoSignals {
            username: "alice".to_string(),
            repo: "widget".to_string(),
            diagnostics: SignalDiagnostics {
                total_paths: 3,
                sample_paths: vec!["a".to_string(), "b".to_string()],
            },
            ..Default::default()
        };

        let raw = signals.diagnostics_json();
        let parsed = RepoSignals::parse_diagnostics(&raw);
        assert_eq!(parsed, signals.diagnostics);
    }

    #[test]
    fn test_parse_diagnostics_tolerates_garbage() {
        let parsed = RepoSignals::parse_diagnostics("not json");
        assert_eq!(parsed.total_paths, 0);
        assert!(parsed.sample_paths.is_empty());
    }
}
