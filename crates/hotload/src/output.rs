//! Colored terminal output utilities.

use console::{Style, Term};

/// Width of banner rules and label column.
const RULE_WIDTH: usize = 64;
const LABEL_WIDTH: usize = 20;

/// Terminal output formatter writing to stderr.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    cyan: Style,
    bold: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan: Style::new().cyan(),
            bold: Style::new().bold(),
        }
    }

    pub(crate) fn info(&self, msg: &str) {
        self.line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        self.line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        self.line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.red.apply_to(msg).to_string());
    }

    /// Print a bold title between two rules.
    pub(crate) fn heading(&self, title: &str) {
        self.rule();
        self.line(&self.bold.apply_to(title).to_string());
        self.rule();
    }

    /// Print a URL clients can copy (cyan), under an aligned label.
    pub(crate) fn address(&self, label: &str, url: &str) {
        self.line(&format!("  {label:<LABEL_WIDTH$}{}", self.cyan.apply_to(url)));
    }

    /// Print a plain labelled value.
    pub(crate) fn field(&self, label: &str, value: &str) {
        self.line(&format!("  {label:<LABEL_WIDTH$}{value}"));
    }

    pub(crate) fn rule(&self) {
        self.line(&"-".repeat(RULE_WIDTH));
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }
}
