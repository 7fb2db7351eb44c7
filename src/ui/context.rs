//! Terminal detection for choosing spinners or plain lines

use console::Term;

/// Environment variables set by common CI providers
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TEAMCITY_VERSION",
    "TF_BUILD",
];

/// Whether output should be decorated for a human at a terminal
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    pub fn detect() -> Self {
        // Spinners draw on stderr while listings go to stdout, so both must be terminals
        let attended = Term::stdout().is_term() && Term::stderr().is_term();
        let in_ci = CI_VARS.iter().any(|var| std::env::var_os(var).is_some());
        Self {
            interactive: attended && !in_ci,
        }
    }

    /// Plain output regardless of the terminal, for tests and pipes
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Spinners, glyphs and colors
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}
