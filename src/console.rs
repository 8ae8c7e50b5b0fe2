//! Console output formatting with ANSI color support.
//!
//! Provides styled terminal output with automatic TTY detection
//! and respect for the NO_COLOR environment variable.

use crate::resolver::SiteHealth;
use crate::sites::{SiteReachability, Title};
use std::io::{self, IsTerminal};

/// ANSI style codes for terminal formatting.
#[derive(Debug, Clone, Copy)]
pub enum Style {
    Bold,
    Dim,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    Gray,
}

impl Style {
    /// Returns the ANSI escape code for this style.
    fn code(self) -> &'static str {
        match self {
            Style::Bold => "1",
            Style::Dim => "2",
            Style::Red => "31",
            Style::Green => "32",
            Style::Yellow => "33",
            Style::Blue => "34",
            Style::Magenta => "35",
            Style::Cyan => "36",
            Style::Gray => "90",
        }
    }
}

const RESET: &str = "\x1b[0m";

/// Console output handler with color support detection.
#[derive(Debug)]
pub struct Console {
    colors_enabled: bool,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    /// Creates a new Console instance, detecting color support.
    ///
    /// Colors are disabled if:
    /// - The `NO_COLOR` environment variable is set
    /// - stdout is not a terminal (TTY)
    pub fn new() -> Self {
        let colors_enabled = std::env::var("NO_COLOR").is_err() && io::stdout().is_terminal();

        Self { colors_enabled }
    }

    /// Creates a Console with colors explicitly enabled or disabled.
    pub fn with_colors(enabled: bool) -> Self {
        Self {
            colors_enabled: enabled,
        }
    }

    /// Applies ANSI styles to text if colors are enabled.
    pub fn style(&self, text: &str, styles: &[Style]) -> String {
        if !self.colors_enabled || styles.is_empty() {
            return text.to_string();
        }

        let codes: Vec<&str> = styles.iter().map(|s| s.code()).collect();
        format!("\x1b[{}m{}{}", codes.join(";"), text, RESET)
    }

    /// Creates a colored label like `[INFO]`.
    pub fn label(&self, label: &str, color: Style) -> String {
        let styled = self.style(label, &[color, Style::Bold]);
        format!("[{}]", styled)
    }

    /// Prints an info message with blue `[INFO]` label.
    pub fn info(&self, message: &str) {
        println!("{} {}", self.label("INFO", Style::Blue), message);
    }

    /// Prints a success message with green `[OK]` label.
    pub fn success(&self, message: &str) {
        println!("{} {}", self.label("OK", Style::Green), message);
    }

    /// Prints a warning message with yellow `[WARN]` label.
    pub fn warning(&self, message: &str) {
        println!("{} {}", self.label("WARN", Style::Yellow), message);
    }

    /// Prints an error message with red `[ERROR]` label.
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", self.label("ERROR", Style::Red), message);
    }

    /// Prints a section header in magenta bold.
    pub fn section(&self, message: &str) {
        println!();
        println!("{}", self.style(message, &[Style::Magenta, Style::Bold]));
    }

    /// Returns text styled as muted (dim gray).
    pub fn muted(&self, text: &str) -> String {
        self.style(text, &[Style::Gray, Style::Dim])
    }

    /// Formats a count with styling.
    pub fn count(&self, n: usize) -> String {
        self.style(&n.to_string(), &[Style::Green, Style::Bold])
    }

    /// Prints a title with its latest chapter.
    pub fn title(&self, title: &Title) {
        println!("{}", self.format_title(title));
    }

    /// Formats a title as a name line followed by indented chapter and URL
    /// lines.
    pub fn format_title(&self, title: &Title) -> String {
        let name = if title.title.is_empty() {
            title.canonical_url.as_str()
        } else {
            title.title.as_str()
        };

        let mut chapter = self.style(&title.chapter_label, &[Style::Cyan]);
        if !title.chapter_relative_date.is_empty() {
            chapter.push(' ');
            chapter.push_str(&self.muted(&title.chapter_relative_date));
        }

        format!(
            "{} {}\n    {}\n    {}",
            self.style(name, &[Style::Bold]),
            self.muted(&format!("({})", title.source_id)),
            chapter,
            self.muted(&title.canonical_url)
        )
    }

    /// Prints one line of a site health report.
    pub fn health(&self, health: &SiteHealth) {
        let reachability = match health.reachability {
            SiteReachability::Reachable => {
                self.style(&health.reachability.to_string(), &[Style::Green])
            }
            SiteReachability::Offline => self.style(&health.reachability.to_string(), &[Style::Red]),
            SiteReachability::NeedsCookies => {
                self.style(&health.reachability.to_string(), &[Style::Yellow])
            }
        };
        println!(
            "{:<24} {:<20} {}",
            health.site.name(),
            health.login.to_string(),
            reachability
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::SiteType;

    #[test]
    fn test_style_disabled() {
        let console = Console::with_colors(false);
        assert_eq!(console.style("hello", &[Style::Red]), "hello");
    }

    #[test]
    fn test_style_enabled() {
        let console = Console::with_colors(true);
        let styled = console.style("hello", &[Style::Red]);
        assert!(styled.contains("\x1b[31m"));
        assert!(styled.contains("hello"));
        assert!(styled.contains(RESET));
    }

    #[test]
    fn test_multiple_styles() {
        let console = Console::with_colors(true);
        let styled = console.style("hello", &[Style::Bold, Style::Red]);
        assert!(styled.contains("1;31"));
    }

    #[test]
    fn test_label() {
        let console = Console::with_colors(false);
        assert_eq!(console.label("INFO", Style::Blue), "[INFO]");
    }

    #[test]
    fn test_format_title() {
        let console = Console::with_colors(false);
        let mut title = Title::new("https://mangatx.com/manga/solo/", SiteType::MangaTx);
        title.title = "Solo".to_string();
        title.chapter_label = "Vol.02 | Chapter 45".to_string();
        title.chapter_relative_date = "3 days ago".to_string();

        assert_eq!(
            console.format_title(&title),
            "Solo (mangatx.com)\n    Vol.02 | Chapter 45 3 days ago\n    https://mangatx.com/manga/solo/"
        );
    }

    #[test]
    fn test_format_title_without_name() {
        let console = Console::with_colors(false);
        let title = Title::new("https://skscans.com/manga/x/", SiteType::SleepingKnightScans);

        let formatted = console.format_title(&title);
        assert!(formatted.starts_with("https://skscans.com/manga/x/ (skscans.com)"));
        assert!(formatted.contains("    Unknown\n"));
    }
}
