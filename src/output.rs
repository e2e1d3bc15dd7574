use std::io::IsTerminal;

use anstyle::{AnsiColor, Effects};

/// Terminal styling helpers, only emitting escape codes when stderr is a terminal.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    color: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self::new()
    }
}

impl Style {
    #[must_use]
    pub fn new() -> Self {
        Self {
            color: std::io::stderr().is_terminal(),
        }
    }

    /// Never emit escape codes
    #[must_use]
    pub fn plain() -> Self {
        Self { color: false }
    }

    fn paint(self, style: anstyle::Style, s: &str) -> String {
        if self.color {
            format!("{style}{s}{style:#}")
        } else {
            s.to_string()
        }
    }

    fn fg(self, color: AnsiColor, s: &str) -> String {
        self.paint(anstyle::Style::new().fg_color(Some(color.into())), s)
    }

    #[must_use]
    pub fn bold(self, s: &str) -> String {
        self.paint(anstyle::Style::new().effects(Effects::BOLD), s)
    }

    #[must_use]
    pub fn dim(self, s: &str) -> String {
        self.paint(anstyle::Style::new().effects(Effects::DIMMED), s)
    }

    #[must_use]
    pub fn green(self, s: &str) -> String {
        self.fg(AnsiColor::Green, s)
    }

    #[must_use]
    pub fn red(self, s: &str) -> String {
        self.fg(AnsiColor::Red, s)
    }

    #[must_use]
    pub fn yellow(self, s: &str) -> String {
        self.fg(AnsiColor::Yellow, s)
    }
}
