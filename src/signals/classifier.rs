// file: src/signals/classifier.rs
// description: pure path-based detection of engineering signals and tech stack
// reference: table-driven classification over repository tree listings

use crate::models::SignalDiagnostics;
use std::collections::BTreeSet;

/// At most this many paths are kept in the diagnostic sample, original order.
pub const SAMPLE_PATH_LIMIT: usize = 50;

const TEST_DIR_PREFIXES: &[&str] = &["test/", "tests/", "__tests__/", "spec/"];
const TEST_FILE_SUFFIXES: &[&str] = &[
    "_test.py", ".spec.ts", ".test.ts", ".test.js", ".test.py", "_spec.rb", ".spec.rb",
];

const CI_PREFIXES: &[&str] = &[".circleci/", ".gitlab-ci", "azure-pipelines", "jenkinsfile"];

const LINT_FILES: &[&str] = &[
    ".ruff.toml",
    "ruff.toml",
    "pyproject.toml",
    ".flake8",
    "setup.cfg",
    ".pylintrc",
    ".eslintrc",
    ".eslintrc.json",
    ".eslintrc.js",
    ".eslintrc.cjs",
    ".eslintrc.yaml",
    ".prettierrc",
    ".prettierrc.json",
    ".prettierrc.js",
    ".prettierrc.yaml",
    ".stylelintrc",
    ".editorconfig",
    ".clang-format",
];

const CODE_OF_CONDUCT_FILES: &[&str] = &[
    "code_of_conduct.md",
    "code-of-conduct.md",
    ".github/code_of_conduct.md",
];
const CONTRIBUTING_FILES: &[&str] = &[
    "contributing.md",
    "contributing.rst",
    ".github/contributing.md",
];
const SECURITY_FILES: &[&str] = &[".github/security.md", "security.md", "security.rst"];

const CHANGELOG_PREFIXES: &[&str] = &["changelog", "changes", "history"];
const DOCS_PREFIXES: &[&str] = &["docs/", "documentation/"];

/// Test framework detection, priority order; each entry is (label, suffixes).
const TEST_FRAMEWORK_RULES: &[(&str, &[&str])] = &[
    ("pytest", &["pytest.ini", "conftest.py"]),
    ("jest", &["jest.config.js", "jest.config.ts", "jest.config.json"]),
    ("vitest", &["vitest.config.ts", "vitest.config.js"]),
    ("mocha", &["mocha.opts", ".mocharc.json", ".mocharc.js"]),
    ("rspec", &["spec_helper.rb", "test_helper.rb"]),
];

/// One tech-stack category: first matching category claims the path, then its
/// framework sub-rules are tried in order and at most one may also fire.
struct StackRule {
    label: &'static str,
    matches: fn(&str) -> bool,
    frameworks: &'static [(&'static str, &'static str)],
}

fn is_python(p: &str) -> bool {
    p.ends_with(".py")
        || p.ends_with("requirements.txt")
        || p.ends_with("pyproject.toml")
        || p.ends_with("setup.py")
        || p.contains("/python")
}

fn is_typescript(p: &str) -> bool {
    p.ends_with(".ts") || p.ends_with(".tsx") || p.ends_with("tsconfig.json")
}

fn is_javascript(p: &str) -> bool {
    p.ends_with(".js") || p.ends_with(".jsx") || p.ends_with("package.json")
}

fn is_java(p: &str) -> bool {
    p.ends_with(".java")
        || p.ends_with("pom.xml")
        || p.ends_with("build.gradle")
        || p.ends_with("build.gradle.kts")
}

fn is_kotlin(p: &str) -> bool {
    p.ends_with(".kt") || p.ends_with(".kts")
}

fn is_scala(p: &str) -> bool {
    p.ends_with(".scala") || p.ends_with("build.sbt")
}

fn is_go(p: &str) -> bool {
    p.ends_with(".go") || p.ends_with("go.mod") || p.ends_with("go.sum")
}

fn is_rust(p: &str) -> bool {
    p.ends_with(".rs") || p.ends_with("cargo.toml")
}

fn is_cpp(p: &str) -> bool {
    p.ends_with(".cpp") || p.ends_with(".cc") || p.ends_with(".cxx") || p.ends_with("cmakelists.txt")
}

fn is_c(p: &str) -> bool {
    p.ends_with(".c")
}

fn is_csharp(p: &str) -> bool {
    p.ends_with(".cs") || p.ends_with(".csproj")
}

fn is_php(p: &str) -> bool {
    p.ends_with(".php") || p.ends_with("composer.json")
}

fn is_swift(p: &str) -> bool {
    p.ends_with(".swift") || p.ends_with("podfile")
}

fn is_sql(p: &str) -> bool {
    p.ends_with(".sql") || p.contains("/migrations/") || p.contains("/schema/")
}

fn is_dbt(p: &str) -> bool {
    p.contains("dbt_project.yml")
}

fn is_power_bi(p: &str) -> bool {
    p.ends_with(".pbix") || p.ends_with(".pbit")
}

fn is_tableau(p: &str) -> bool {
    p.ends_with(".twb")
        || p.ends_with(".twbx")
        || p.ends_with(".hyper")
        || p.ends_with(".tds")
        || p.ends_with(".tdsx")
}

fn is_terraform(p: &str) -> bool {
    p.ends_with(".tf")
}

fn is_cloudformation(p: &str) -> bool {
    p.contains("cloudformation") || (p.ends_with(".yaml") && p.contains("aws"))
}

fn is_bicep(p: &str) -> bool {
    p.contains("bicep")
}

fn is_cdk(p: &str) -> bool {
    p.contains("cdk")
}

fn is_langgraph(p: &str) -> bool {
    p.contains("langgraph")
}

fn is_langchain(p: &str) -> bool {
    p.contains("langchain")
}

fn is_openai(p: &str) -> bool {
    p.contains("openai")
}

fn is_docker(p: &str) -> bool {
    p.contains("dockerfile")
}

fn is_docker_compose(p: &str) -> bool {
    p.contains("docker-compose")
}

fn is_serverless(p: &str) -> bool {
    p.contains("serverless.yml")
}

fn is_github_actions(p: &str) -> bool {
    p.contains(".github/workflows")
}

/// Priority order is load-bearing: a path belongs to the first category whose
/// predicate fires, even when later categories would also match.
static STACK_RULES: &[StackRule] = &[
    StackRule {
        label: "Python",
        matches: is_python,
        frameworks: &[
            ("fastapi", "FastAPI"),
            ("flask", "Flask"),
            ("django", "Django"),
            ("streamlit", "Streamlit"),
        ],
    },
    StackRule {
        label: "TypeScript",
        matches: is_typescript,
        frameworks: &[("react", "React"), ("next", "Next.js"), ("node", "Node.js")],
    },
    StackRule {
        label: "JavaScript",
        matches: is_javascript,
        frameworks: &[
            ("react", "React"),
            ("vue", "Vue"),
            ("angular", "Angular"),
            ("node", "Node.js"),
        ],
    },
    StackRule {
        label: "Java",
        matches: is_java,
        frameworks: &[("spring", "Spring")],
    },
    StackRule { label: "Kotlin", matches: is_kotlin, frameworks: &[] },
    StackRule { label: "Scala", matches: is_scala, frameworks: &[] },
    StackRule { label: "Go", matches: is_go, frameworks: &[] },
    StackRule { label: "Rust", matches: is_rust, frameworks: &[] },
    StackRule { label: "C++", matches: is_cpp, frameworks: &[] },
    StackRule { label: "C", matches: is_c, frameworks: &[] },
    StackRule {
        label: "C#",
        matches: is_csharp,
        frameworks: &[("dotnet", ".NET")],
    },
    StackRule {
        label: "PHP",
        matches: is_php,
        frameworks: &[("laravel", "Laravel")],
    },
    StackRule { label: "Swift", matches: is_swift, frameworks: &[] },
    StackRule { label: "SQL", matches: is_sql, frameworks: &[] },
    StackRule { label: "dbt", matches: is_dbt, frameworks: &[] },
    StackRule { label: "Power BI", matches: is_power_bi, frameworks: &[] },
    StackRule { label: "Tableau", matches: is_tableau, frameworks: &[] },
    StackRule { label: "Terraform", matches: is_terraform, frameworks: &[] },
    StackRule { label: "CloudFormation", matches: is_cloudformation, frameworks: &[] },
    StackRule { label: "Azure Bicep", matches: is_bicep, frameworks: &[] },
    StackRule { label: "AWS CDK", matches: is_cdk, frameworks: &[] },
    StackRule { label: "LangGraph", matches: is_langgraph, frameworks: &[] },
    StackRule { label: "LangChain", matches: is_langchain, frameworks: &[] },
    StackRule { label: "OpenAI", matches: is_openai, frameworks: &[] },
    StackRule { label: "Docker", matches: is_docker, frameworks: &[] },
    StackRule { label: "Docker Compose", matches: is_docker_compose, frameworks: &[] },
    StackRule { label: "Serverless", matches: is_serverless, frameworks: &[] },
    StackRule { label: "GitHub Actions", matches: is_github_actions, frameworks: &[] },
];

/// Everything the classifier can say about one tree listing. `readme_present`
/// feeds the organization score only and is not persisted on its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathIndicators {
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
    pub readme_present: bool,

    pub detected_test_framework: String,
    pub detected_ci: String,
    pub tech_stack: String,

    pub diagnostics: SignalDiagnostics,
}

/// Classify a repository tree listing. Pure and total: no I/O, no ordering
/// sensitivity beyond the diagnostic sample, and an empty listing yields
/// all-false indicators with empty categorical fields.
pub fn classify_paths(paths: &[String]) -> PathIndicators {
    let lower: Vec<String> = paths.iter().map(|p| p.to_lowercase()).collect();

    let any_prefix =
        |prefixes: &[&str]| lower.iter().any(|p| prefixes.iter().any(|pre| p.starts_with(pre)));
    let any_suffix =
        |suffixes: &[&str]| lower.iter().any(|p| suffixes.iter().any(|suf| p.ends_with(suf)));
    let any_exact = |names: &[&str]| lower.iter().any(|p| names.iter().any(|n| p == n));

    let has_tests = any_prefix(TEST_DIR_PREFIXES) || any_suffix(TEST_FILE_SUFFIXES);
    let has_github_actions = lower.iter().any(|p| p.starts_with(".github/workflows/"));
    let has_ci_config = has_github_actions || any_prefix(CI_PREFIXES);

    let has_lint_config = any_exact(LINT_FILES);
    let has_precommit = lower.iter().any(|p| p == ".pre-commit-config.yaml");
    let has_dockerfile = lower.iter().any(|p| p.ends_with("dockerfile") || p == "dockerfile");
    let has_docker_compose = lower
        .iter()
        .any(|p| p.ends_with("docker-compose.yml") || p.ends_with("docker-compose.yaml"));
    let has_makefile = lower.iter().any(|p| p == "makefile");

    let has_code_of_conduct = any_exact(CODE_OF_CONDUCT_FILES);
    let has_contributing = any_exact(CONTRIBUTING_FILES);
    let has_license = lower
        .iter()
        .any(|p| p.starts_with("license") || p.starts_with("licence"));
    let has_security_policy = any_exact(SECURITY_FILES);
    // covers both the root-level template file and nested template directories
    let has_issue_templates = lower.iter().any(|p| p.contains(".github/issue_template"));
    let has_pr_templates = lower
        .iter()
        .any(|p| p.contains(".github/pull_request_template"));
    let has_changelog = any_prefix(CHANGELOG_PREFIXES);
    let has_docs = any_prefix(DOCS_PREFIXES);
    let readme_present = lower.iter().any(|p| p.starts_with("readme"));

    let detected_test_framework = TEST_FRAMEWORK_RULES
        .iter()
        .find(|(_, suffixes)| any_suffix(suffixes))
        .map(|(label, _)| (*label).to_string())
        .unwrap_or_default();

    let detected_ci = detect_ci(&lower, has_github_actions);
    let tech_stack = detect_tech_stack(&lower);

    PathIndicators {
        has_tests,
        has_github_actions,
        has_ci_config,
        has_lint_config,
        has_precommit,
        has_dockerfile,
        has_docker_compose,
        has_makefile,
        has_code_of_conduct,
        has_contributing,
        has_license,
        has_security_policy,
        has_issue_templates,
        has_pr_templates,
        has_changelog,
        has_docs,
        readme_present,
        detected_test_framework,
        detected_ci,
        tech_stack,
        diagnostics: SignalDiagnostics {
            total_paths: paths.len(),
            sample_paths: paths.iter().take(SAMPLE_PATH_LIMIT).cloned().collect(),
        },
    }
}

fn detect_ci(lower: &[String], has_github_actions: bool) -> String {
    // Note the asymmetry with the has_ci_config prefixes: azure/jenkins/travis
    // labels match anywhere in the path.
    let label = if has_github_actions {
        "github_actions"
    } else if lower.iter().any(|p| p.starts_with(".circleci/")) {
        "circleci"
    } else if lower.iter().any(|p| p.starts_with(".gitlab-ci")) {
        "gitlab_ci"
    } else if lower.iter().any(|p| p.contains("azure-pipelines")) {
        "azure_pipelines"
    } else if lower.iter().any(|p| p.contains("jenkinsfile")) {
        "jenkins"
    } else if lower.iter().any(|p| p.contains("travis.yml")) {
        "travis"
    } else {
        ""
    };
    label.to_string()
}

fn detect_tech_stack(lower: &[String]) -> String {
    let mut labels: BTreeSet<&'static str> = BTreeSet::new();

    for path in lower {
        for rule in STACK_RULES {
            if (rule.matches)(path) {
                labels.insert(rule.label);
                for (needle, framework) in rule.frameworks {
                    if path.contains(needle) {
                        labels.insert(framework);
                        break;
                    }
                }
                break;
            }
        }
    }

    labels.into_iter().collect::<Vec<_>>().join(", ")
}
