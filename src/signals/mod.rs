// file: src/signals/mod.rs
// description: signal detection and scoring module exports
// reference: internal module structure

pub mod classifier;
pub mod score;

pub use classifier::{classify_paths, PathIndicators, SAMPLE_PATH_LIMIT};
pub use score::{automation_score, coding_standards_score, organization_score};

use crate::models::RepoSignals;

/// Run the classifier and the score aggregator over one tree listing and
/// assemble the persisted record for (username, repo).
pub fn detect_signals(username: &str, repo: &str, paths: &[String]) -> RepoSignals {
    let ind = classify_paths(paths);

    RepoSignals {
        username: username.to_string(),
        repo: repo.to_string(),
        has_tests: ind.has_tests,
        has_github_actions: ind.has_github_actions,
        has_ci_config: ind.has_ci_config,
        has_lint_config: ind.has_lint_config,
        has_precommit: ind.has_precommit,
        has_dockerfile: ind.has_dockerfile,
        has_docker_compose: ind.has_docker_compose,
        has_makefile: ind.has_makefile,
        has_code_of_conduct: ind.has_code_of_conduct,
        has_contributing: ind.has_contributing,
        has_license: ind.has_license,
        has_security_policy: ind.has_security_policy,
        has_issue_templates: ind.has_issue_templates,
        has_pr_templates: ind.has_pr_templates,
        has_changelog: ind.has_changelog,
        has_docs: ind.has_docs,
        detected_test_framework: ind.detected_test_framework.clone(),
        detected_ci: ind.detected_ci.clone(),
        organization_score: organization_score(&ind),
        coding_standards_score: coding_standards_score(&ind),
        automation_score: automation_score(&ind),
        tech_stack: ind.tech_stack.clone(),
        diagnostics: ind.diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_signals_assembles_record() {
        let paths: Vec<String> = ["tests/test_foo.py", ".github/workflows/ci.yml", "README.md"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let signals = detect_signals("alice", "widget", &paths);

        assert_eq!(signals.username, "alice");
        assert_eq!(signals.repo, "widget");
        assert!(signals.has_tests);
        assert_eq!(signals.detected_ci, "github_actions");
        assert_eq!(signals.coding_standards_score, 50.0);
        assert_eq!(signals.diagnostics.total_paths, 3);
    }
}
