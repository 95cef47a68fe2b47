//! Colored terminal output on stderr.

use std::fmt::Display;

use console::{Style, Term};

/// Message severity, mapped to a color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tone {
    Plain,
    Good,
    Caution,
    Bad,
    Title,
}

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
}

impl Output {
    /// Create a formatter writing to stderr.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        self.write(Tone::Plain, msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        self.write(Tone::Good, msg);
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        self.write(Tone::Caution, msg);
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        self.write(Tone::Bad, msg);
    }

    /// Print a section title (cyan bold).
    pub(crate) fn title(&self, msg: &str) {
        self.write(Tone::Title, msg);
    }

    /// Print an indented `label: value` line with aligned values.
    pub(crate) fn field(&self, label: &str, value: impl Display) {
        self.write(Tone::Plain, &field_line(label, value));
    }

    fn write(&self, tone: Tone, msg: &str) {
        let line = match tone {
            Tone::Plain => msg.to_owned(),
            Tone::Good => Style::new().green().apply_to(msg).to_string(),
            Tone::Caution => Style::new().yellow().apply_to(msg).to_string(),
            Tone::Bad => Style::new().red().apply_to(msg).to_string(),
            Tone::Title => Style::new().cyan().bold().apply_to(msg).to_string(),
        };
        let _ = self.term.write_line(&line);
    }
}

/// Width the labels of [`Output::field`] are padded to.
const LABEL_WIDTH: usize = 10;

fn field_line(label: &str, value: impl Display) -> String {
    let label = format!("{label}:");
    format!("  {label:<LABEL_WIDTH$}{value}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_field_line_aligns_values() {
        assert_eq!(field_line("added", 3), "  added:    3");
        assert_eq!(field_line("deleted", 0), "  deleted:  0");
    }
}
