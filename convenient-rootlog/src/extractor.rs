// Build dependency extractor - recovers builddep results from mock root logs
// Line oriented state machine, one pass, never fails on unexpected content

use crate::dialect::LogDialect;
use crate::nevra::{is_arch, is_package_name, name_from_nevra};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// mock prefixes every line it logs with `LEVEL file.py:line:`
#[allow(clippy::expect_used)]
static MOCK_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:DEBUG|INFO|WARNING|ERROR|CRITICAL)\s+[\w.-]+\.py:\d+:").expect("valid mock prefix regex")
});

/// Configuration for root log extraction
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Count packages reported as "already installed" as build dependencies
    pub include_already_installed: bool,
    /// Scan every `builddep` command instead of stopping after the first one
    pub all_sections: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            include_already_installed: true,
            all_sections: true,
        }
    }
}

/// Ordered set of package names, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildDeps {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl BuildDeps {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name. Returns `false` if it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.seen.contains(&name) {
            return false;
        }
        let _ = self.seen.insert(name.clone());
        self.names.push(name);
        true
    }

    /// Check whether a name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    /// Number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check whether no names were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over the names in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Names in discovery order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    /// Consume the set, returning names in discovery order.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.names
    }
}

impl<S: Into<String>> FromIterator<S> for BuildDeps {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut deps = Self::new();
        for name in iter {
            let _ = deps.insert(name);
        }
        deps
    }
}

impl<'a> IntoIterator for &'a BuildDeps {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

/// Result of scanning one root log
#[derive(Debug, Clone, Default)]
pub struct RootLogExtraction {
    /// Direct build dependencies
    pub deps: BuildDeps,
    /// Dialect of each `builddep` command found, in log order
    pub sections: Vec<LogDialect>,
    /// Lines inside a transaction table that could not be parsed
    pub skipped_lines: usize,
    /// Set when the log ended inside a `builddep` command
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Outside of any `builddep` command
    Scanning,
    /// Inside a `builddep` command, before its transaction table
    Preamble(LogDialect),
    /// Inside the "Installing:" table
    Table(LogDialect),
    /// First section done and only one was requested
    Finished,
}

/// Extracts direct build dependencies from root log content
#[derive(Debug, Clone, Default)]
pub struct RootLogExtractor {
    config: ExtractionConfig,
}

impl RootLogExtractor {
    /// Create an extractor with the given configuration.
    #[must_use]
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Scan a root log.
    #[must_use]
    pub fn extract(&self, root_log: &str) -> RootLogExtraction {
        let mut extraction = RootLogExtraction::default();
        let mut state = State::Scanning;
        // dnf wraps long names onto their own line, the columns follow on the next one
        let mut pending_name: Option<String> = None;

        for line in root_log.lines() {
            let text = strip_mock_prefix(line);

            state = match state {
                State::Finished => break,
                State::Scanning => self.scan(line, &mut extraction),
                State::Preamble(dialect) => {
                    if dialect.is_command_end(text) {
                        self.close_section(line, &mut extraction)
                    } else if dialect.is_table_start(text) {
                        State::Table(dialect)
                    } else {
                        if self.config.include_already_installed
                            && let Some(nevra) = dialect.already_installed(text)
                        {
                            match name_from_nevra(nevra) {
                                Some(name) => {
                                    let _ = extraction.deps.insert(name);
                                }
                                None => extraction.skipped_lines += 1,
                            }
                        }
                        State::Preamble(dialect)
                    }
                }
                State::Table(dialect) => {
                    if dialect.is_table_end(text) {
                        pending_name = None;
                        self.finish_section()
                    } else if dialect.is_command_end(text) {
                        pending_name = None;
                        self.close_section(line, &mut extraction)
                    } else {
                        parse_table_row(text, &mut pending_name, &mut extraction);
                        State::Table(dialect)
                    }
                }
            };
        }

        extraction.truncated = matches!(state, State::Preamble(_) | State::Table(_));
        if extraction.truncated {
            debug!("Root log ended inside a builddep command, keeping partial result");
        }

        extraction
    }

    /// Look for the start of a `builddep` command.
    fn scan(&self, line: &str, extraction: &mut RootLogExtraction) -> State {
        match LogDialect::detect(line) {
            Some(dialect) => {
                trace!("Found {} builddep command", dialect);
                extraction.sections.push(dialect);
                State::Preamble(dialect)
            }
            None => State::Scanning,
        }
    }

    /// The command ended without a table; the same line may start the next one.
    fn close_section(&self, line: &str, extraction: &mut RootLogExtraction) -> State {
        if self.config.all_sections {
            self.scan(line, extraction)
        } else {
            State::Finished
        }
    }

    fn finish_section(&self) -> State {
        if self.config.all_sections {
            State::Scanning
        } else {
            State::Finished
        }
    }
}

/// Remove the mock logger prefix and surrounding whitespace.
fn strip_mock_prefix(line: &str) -> &str {
    match MOCK_PREFIX.find(line) {
        Some(m) => line[m.end()..].trim(),
        None => line.trim(),
    }
}

/// Parse one row of the "Installing:" table.
///
/// Rows are `name arch version repository size`; a name too long for its
/// column sits alone on a line with the remaining columns on the next.
fn parse_table_row(text: &str, pending_name: &mut Option<String>, extraction: &mut RootLogExtraction) {
    let columns: Vec<&str> = text.split_whitespace().collect();

    match columns.as_slice() {
        [] => {}
        [name] if is_package_name(name) && !name.ends_with(':') => {
            *pending_name = Some((*name).to_string());
        }
        [arch, _, ..] if is_arch(arch) => match pending_name.take() {
            Some(name) => {
                let _ = extraction.deps.insert(name);
            }
            None => {
                trace!("Skipping orphaned table continuation: {}", text);
                extraction.skipped_lines += 1;
            }
        },
        [name, arch, _, ..] if is_arch(arch) && is_package_name(name) => {
            *pending_name = None;
            let _ = extraction.deps.insert(*name);
        }
        _ => {
            trace!("Skipping unparseable table line: {}", text);
            extraction.skipped_lines += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dnf4_log(table: &str) -> String {
        format!(
            "DEBUG util.py:542:  Executing command: ['/usr/bin/dnf', 'builddep', '--installroot', '/var/lib/mock/root/'] with env {{}}\n\
             DEBUG util.py:446:  Dependencies resolved.\n\
             DEBUG util.py:446:  Installing:\n\
             {table}\
             DEBUG util.py:446:  Transaction Summary\n"
        )
    }

    #[test]
    fn test_strip_mock_prefix() {
        assert_eq!(strip_mock_prefix("DEBUG util.py:446:   gcc  x86_64"), "gcc  x86_64");
        assert_eq!(strip_mock_prefix("INFO buildroot.py:491:  Installing:"), "Installing:");
        assert_eq!(strip_mock_prefix("   gcc  x86_64  "), "gcc  x86_64");
    }

    #[test]
    fn test_table_row() {
        let log = dnf4_log("DEBUG util.py:446:   gcc   x86_64   13.2.1-4.fc39   build   34 M\n");
        let extraction = RootLogExtractor::default().extract(&log);
        assert_eq!(extraction.deps.as_slice(), ["gcc"]);
        assert_eq!(extraction.skipped_lines, 0);
    }

    #[test]
    fn test_wrapped_table_row() {
        let log = dnf4_log(
            "DEBUG util.py:446:   gstreamer1-plugins-bad-free-devel\n\
             DEBUG util.py:446:                     x86_64  1.22.9-1.fc39   build   210 k\n",
        );
        let extraction = RootLogExtractor::default().extract(&log);
        assert_eq!(extraction.deps.as_slice(), ["gstreamer1-plugins-bad-free-devel"]);
    }

    #[test]
    fn test_orphaned_continuation_is_skipped() {
        let log = dnf4_log("DEBUG util.py:446:            x86_64  1.0-1.fc39   build   1 k\n");
        let extraction = RootLogExtractor::default().extract(&log);
        assert!(extraction.deps.is_empty());
        assert_eq!(extraction.skipped_lines, 1);
    }

    #[test]
    fn test_garbage_rows_are_skipped() {
        let log = dnf4_log(
            "DEBUG util.py:446:   ???? garbage here\n\
             DEBUG util.py:446:   zlib-devel   x86_64   1.2.13-4.fc39   build   45 k\n",
        );
        let extraction = RootLogExtractor::default().extract(&log);
        assert_eq!(extraction.deps.as_slice(), ["zlib-devel"]);
        assert_eq!(extraction.skipped_lines, 1);
    }

    #[test]
    fn test_already_installed_can_be_excluded() {
        let log = "DEBUG util.py:542:  Executing command: ['/usr/bin/dnf', 'builddep', 'x.src.rpm']\n\
                   DEBUG util.py:446:  Package make-1:4.4.1-2.fc39.x86_64 is already installed.\n\
                   DEBUG util.py:446:  Installing:\n\
                   DEBUG util.py:446:   gcc   x86_64   13.2.1-4.fc39   build   34 M\n\
                   DEBUG util.py:446:  Transaction Summary\n";

        let all = RootLogExtractor::default().extract(log);
        assert_eq!(all.deps.as_slice(), ["make", "gcc"]);

        let table_only = RootLogExtractor::new(ExtractionConfig {
            include_already_installed: false,
            ..Default::default()
        })
        .extract(log);
        assert_eq!(table_only.deps.as_slice(), ["gcc"]);
    }

    #[test]
    fn test_first_section_only() {
        let log = "Executing command: ['/usr/bin/dnf', 'builddep', 'a.src.rpm']\n\
                   Installing:\n\
                    gcc  x86_64  13.2.1-4.fc39  build  34 M\n\
                   Transaction Summary\n\
                   Executing command: ['/usr/bin/dnf', 'builddep', 'b.src.rpm']\n\
                   Installing:\n\
                    cmake  x86_64  3.27.7-1.fc39  build  8 M\n\
                   Transaction Summary\n";

        let all = RootLogExtractor::default().extract(log);
        assert_eq!(all.deps.as_slice(), ["gcc", "cmake"]);
        assert_eq!(all.sections.len(), 2);

        let first = RootLogExtractor::new(ExtractionConfig {
            all_sections: false,
            ..Default::default()
        })
        .extract(log);
        assert_eq!(first.deps.as_slice(), ["gcc"]);
    }

    #[test]
    fn test_nothing_to_do() {
        let log = "Executing command: ['/usr/bin/dnf', 'builddep', 'a.src.rpm']\n\
                   Package make-1:4.4.1-2.fc39.x86_64 is already installed.\n\
                   Dependencies resolved.\n\
                   Nothing to do.\n\
                   Complete!\n";

        let extraction = RootLogExtractor::default().extract(log);
        assert_eq!(extraction.deps.as_slice(), ["make"]);
        assert!(!extraction.truncated);
    }

    #[test]
    fn test_build_deps_collapse_duplicates() {
        let deps: BuildDeps = ["gcc", "make", "gcc"].into_iter().collect();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps.into_vec(), vec!["gcc", "make"]);
    }
}
