//! Known root log dialects.
//!
//! mock drives a different package manager front end depending on the target
//! release. Each front end prints its own banner for the `builddep` command,
//! its own "already installed" notice and its own transaction table markers.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static DNF4_ALREADY_INSTALLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Package (\S+) is already installed\.").expect("valid dnf4 regex")
});

#[allow(clippy::expect_used)]
static DNF5_ALREADY_INSTALLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^Package "([^"]+)" is already installed\."#).expect("valid dnf5 regex")
});

/// A package manager front end whose `builddep` output can be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogDialect {
    /// dnf 4 (`/usr/bin/dnf` or `/usr/bin/dnf-3`)
    Dnf4,
    /// dnf 5 (`/usr/bin/dnf5`)
    Dnf5,
}

impl LogDialect {
    /// Every dialect, in matching order.
    pub const ALL: [LogDialect; 2] = [LogDialect::Dnf5, LogDialect::Dnf4];

    /// Find the dialect whose `builddep` banner is on this line.
    #[must_use]
    pub fn detect(line: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dialect| dialect.is_builddep_start(line))
    }

    /// Executables mock invokes for this dialect.
    fn executables(self) -> &'static [&'static str] {
        match self {
            Self::Dnf4 => &["/usr/bin/dnf", "/usr/bin/dnf-3"],
            Self::Dnf5 => &["/usr/bin/dnf5", "/usr/bin/dnf-5"],
        }
    }

    /// Check whether the line starts a `builddep` command of this dialect.
    #[must_use]
    pub fn is_builddep_start(self, line: &str) -> bool {
        line.contains("Executing command: [")
            && self
                .executables()
                .iter()
                .any(|exe| line.contains(&format!("['{exe}', 'builddep'")))
    }

    /// Return the `name-version-release.arch` of an "already installed" notice.
    #[must_use]
    pub fn already_installed<'a>(self, text: &'a str) -> Option<&'a str> {
        let regex = match self {
            Self::Dnf4 => &*DNF4_ALREADY_INSTALLED,
            Self::Dnf5 => &*DNF5_ALREADY_INSTALLED,
        };
        regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Check whether the line opens the table of directly requested packages.
    #[must_use]
    pub fn is_table_start(self, text: &str) -> bool {
        text == "Installing:"
    }

    /// Check whether the line closes the table of directly requested packages.
    #[must_use]
    pub fn is_table_end(self, text: &str) -> bool {
        let summary = match self {
            Self::Dnf4 => "Transaction Summary",
            Self::Dnf5 => "Transaction Summary:",
        };
        text.starts_with("Installing dependencies:")
            || text.starts_with("Installing weak dependencies:")
            || text.starts_with(summary)
    }

    /// Check whether the line ends the whole `builddep` command.
    #[must_use]
    pub fn is_command_end(self, text: &str) -> bool {
        text.starts_with("Nothing to do.")
            || text.starts_with("Child return code was:")
            || text.starts_with("Executing command:")
    }
}

impl fmt::Display for LogDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dnf4 => write!(f, "dnf4"),
            Self::Dnf5 => write!(f, "dnf5"),
        }
    }
}
