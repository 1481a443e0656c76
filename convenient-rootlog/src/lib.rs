//! Build dependency extraction from mock `root.log` files.
//!
//! Koji keeps the mock `root.log` of every build. The log records the
//! `builddep` transaction that prepared the buildroot, which tells exactly
//! which packages a source package pulled in directly at build time:
//!
//! - packages dnf reported as already installed in the base buildroot
//! - packages listed in the "Installing:" table of the transaction
//!
//! Packages listed under "Installing dependencies:" are transitive and are
//! not reported.
//!
//! # Example
//!
//! ```
//! use convenient_rootlog::extract_build_deps;
//!
//! let log = "\
//! DEBUG util.py:542:  Executing command: ['/usr/bin/dnf', 'builddep', 'foo-1.0-1.fc39.src.rpm']
//! DEBUG util.py:446:  Package make-1:4.4.1-2.fc39.x86_64 is already installed.
//! DEBUG util.py:446:  Dependencies resolved.
//! DEBUG util.py:446:  Installing:
//! DEBUG util.py:446:   gcc        x86_64   13.2.1-4.fc39   build   34 M
//! DEBUG util.py:446:  Installing dependencies:
//! DEBUG util.py:446:   cpp        x86_64   13.2.1-4.fc39   build   11 M
//! ";
//!
//! let deps = extract_build_deps(log);
//! assert_eq!(deps.as_slice(), ["make", "gcc"]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

pub mod dialect;
pub mod extractor;
pub mod nevra;

pub use dialect::LogDialect;
pub use extractor::{BuildDeps, ExtractionConfig, RootLogExtraction, RootLogExtractor};

/// Error types for root log extraction.
#[derive(Debug, thiserror::Error)]
pub enum LogFormatError {
    /// The log is not text
    #[error("Root log is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
}

/// Extract the direct build dependencies from root log text.
///
/// Never fails: lines that cannot be parsed are skipped and a log without
/// any `builddep` transaction yields an empty set.
#[must_use]
pub fn extract_build_deps(root_log: &str) -> BuildDeps {
    RootLogExtractor::default().extract(root_log).deps
}

/// Extract the direct build dependencies from raw root log bytes.
///
/// # Errors
///
/// Returns `LogFormatError::NotUtf8` if the bytes are not UTF-8 text.
pub fn extract_build_deps_from_bytes(root_log: &[u8]) -> Result<BuildDeps, LogFormatError> {
    let text = std::str::from_utf8(root_log)?;
    Ok(extract_build_deps(text))
}
