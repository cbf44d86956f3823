// file: src/signals/score.rs
// description: composite 0-100 scores aggregated from boolean indicators
// reference: fixed-denominator weighted scoring

use crate::signals::classifier::PathIndicators;

/// `round(100 * matched / total, 1)` with the denominator fixed per category.
fn percentage(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = (matched as f64 / total as f64) * 100.0;
    (raw * 10.0).round() / 10.0
}

fn count_true(items: &[bool]) -> usize {
    items.iter().filter(|b| **b).count()
}

/// Nine governance/documentation items, including README presence.
pub fn organization_score(ind: &PathIndicators) -> f64 {
    let items = [
        ind.has_code_of_conduct,
        ind.has_contributing,
        ind.has_license,
        ind.has_security_policy,
        ind.has_issue_templates,
        ind.has_pr_templates,
        ind.has_changelog,
        ind.has_docs,
        ind.readme_present,
    ];
    percentage(count_true(&items), items.len())
}

/// Four code-quality items.
pub fn coding_standards_score(ind: &PathIndicators) -> f64 {
    let items = [
        ind.has_tests,
        ind.has_lint_config,
        ind.has_precommit,
        ind.has_ci_config,
    ];
    percentage(count_true(&items), items.len())
}

/// Five automation items.
pub fn automation_score(ind: &PathIndicators) -> f64 {
    let items = [
        ind.has_github_actions,
        ind.has_ci_config,
        ind.has_precommit,
        ind.has_dockerfile,
        ind.has_docker_compose,
    ];
    percentage(count_true(&items), items.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::classifier::classify_paths;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_tree_scores_zero() {
        let ind = classify_paths(&[]);
        assert_eq!(organization_score(&ind), 0.0);
        assert_eq!(coding_standards_score(&ind), 0.0);
        assert_eq!(automation_score(&ind), 0.0);
    }

    #[test]
    fn test_license_and_readme_only() {
        let ind = classify_paths(&paths(&[
            "tests/test_foo.py",
            ".github/workflows/ci.yml",
            "Dockerfile",
            "README.md",
            "LICENSE",
        ]));
        // license + readme out of nine
        assert_eq!(organization_score(&ind), 22.2);
    }

    #[test]
    fn test_half_coding_standards() {
        let ind = classify_paths(&paths(&[
            "pyproject.toml",
            "app/main.py",
            "tests/test_app.py",
            "ruff.toml",
        ]));
        assert_eq!(coding_standards_score(&ind), 50.0);
    }

    #[test]
    fn test_all_scores_within_bounds() {
        let ind = classify_paths(&paths(&[
            "tests/test_a.py",
            ".github/workflows/ci.yml",
            ".pre-commit-config.yaml",
            "Dockerfile",
            "docker-compose.yml",
            "ruff.toml",
            "README.md",
            "LICENSE",
            "CHANGELOG.md",
            "docs/guide.md",
            "CONTRIBUTING.md",
            "CODE_OF_CONDUCT.md",
            "SECURITY.md",
            ".github/ISSUE_TEMPLATE/bug.md",
            ".github/PULL_REQUEST_TEMPLATE.md",
        ]));

        for score in [
            organization_score(&ind),
            coding_standards_score(&ind),
            automation_score(&ind),
        ] {
            assert!((0.0..=100.0).contains(&score));
        }
        assert_eq!(organization_score(&ind), 100.0);
        assert_eq!(automation_score(&ind), 100.0);
    }

    #[test]
    fn test_rounding_to_one_decimal() {
        assert_eq!(percentage(1, 9), 11.1);
        assert_eq!(percentage(2, 9), 22.2);
        assert_eq!(percentage(4, 9), 44.4);
        assert_eq!(percentage(5, 9), 55.6);
        assert_eq!(percentage(3, 4), 75.0);
        assert_eq!(percentage(0, 5), 0.0);
        assert_eq!(percentage(5, 5), 100.0);
    }
}
