//! Root log extraction against captured mock logs
//!
//! The fixtures mirror real koji `root.log` files for the dnf4 and dnf5
//! front ends, plus a truncated download and a log without any builddep run.

use convenient_rootlog::{
    extract_build_deps, extract_build_deps_from_bytes, LogDialect, RootLogExtractor,
};
use tracing_test::traced_test;

const DNF4_LOG: &str = include_str!("fixtures/dnf4_root.log");
const DNF5_LOG: &str = include_str!("fixtures/dnf5_root.log");
const TRUNCATED_LOG: &str = include_str!("fixtures/truncated_root.log");
const NO_BUILDDEP_LOG: &str = include_str!("fixtures/no_builddep_root.log");

#[traced_test]
#[test]
fn test_dnf4_log_strips_arch_and_version() {
    let deps = extract_build_deps(DNF4_LOG);

    assert!(deps.contains("gstreamer1-vaapi"));
    assert!(deps.iter().all(|name| !name.contains("x86_64")));
    assert!(deps.iter().all(|name| !name.contains("1.22.9")));
}

#[traced_test]
#[test]
fn test_dnf4_log_full_result() {
    let deps = extract_build_deps(DNF4_LOG);

    assert_eq!(
        deps.as_slice(),
        [
            "make",
            "python3-devel",
            "desktop-file-utils",
            "gcc",
            "gstreamer1-devel",
            "gstreamer1-plugins-bad-free-devel",
            "gstreamer1-vaapi",
            "meson",
            "python3-gobject",
        ]
    );
}

#[test]
fn test_dnf4_log_ignores_transitive_and_base_install() {
    let deps = extract_build_deps(DNF4_LOG);

    // "Installing dependencies:" and "Installing weak dependencies:"
    assert!(!deps.contains("cpp"));
    assert!(!deps.contains("gstreamer1"));
    assert!(!deps.contains("gstreamer1-plugins-ugly-free"));
    // the @build group install precedes the builddep command
    assert!(!deps.contains("bash"));
    assert!(!deps.contains("rpm-build"));
}

#[test]
fn test_dnf4_log_report() {
    let extraction = RootLogExtractor::default().extract(DNF4_LOG);

    assert_eq!(extraction.sections, vec![LogDialect::Dnf4]);
    assert_eq!(extraction.skipped_lines, 0);
    assert!(!extraction.truncated);
}

#[test]
fn test_dnf5_log() {
    let extraction = RootLogExtractor::default().extract(DNF5_LOG);

    assert_eq!(extraction.sections, vec![LogDialect::Dnf5]);
    assert_eq!(
        extraction.deps.as_slice(),
        ["gcc-c++", "make", "cmake", "doxygen", "ninja-build"]
    );
    assert!(!extraction.deps.contains("cmake-data"));
}

#[test]
fn test_truncated_log_keeps_partial_result() {
    let extraction = RootLogExtractor::default().extract(TRUNCATED_LOG);

    assert!(extraction.truncated);
    assert_eq!(extraction.deps.as_slice(), ["gcc", "lz4-devel", "xz-devel"]);
}

#[test]
fn test_log_without_builddep_is_empty() {
    let extraction = RootLogExtractor::default().extract(NO_BUILDDEP_LOG);

    assert!(extraction.deps.is_empty());
    assert!(extraction.sections.is_empty());
    assert!(!extraction.truncated);
}

#[test]
fn test_extraction_is_deterministic() {
    let first = extract_build_deps(DNF4_LOG);
    let second = extract_build_deps(DNF4_LOG);
    assert_eq!(first, second);
}

#[test]
fn test_concatenated_logs_merge_in_order() {
    let combined = format!("{DNF5_LOG}{DNF4_LOG}");
    let extraction = RootLogExtractor::default().extract(&combined);

    assert_eq!(extraction.sections, vec![LogDialect::Dnf5, LogDialect::Dnf4]);
    // "make" appears in both logs and is reported once, at its first position
    let names = extraction.deps.as_slice();
    assert_eq!(names.iter().filter(|name| *name == "make").count(), 1);
    assert_eq!(names[1], "make");
    assert_eq!(names.len(), 5 + 8);
}

#[test]
fn test_bytes_entry_point() {
    let deps = extract_build_deps_from_bytes(DNF5_LOG.as_bytes()).unwrap();
    assert!(deps.contains("ninja-build"));

    let mut broken = DNF5_LOG.as_bytes().to_vec();
    broken.push(0xff);
    assert!(extract_build_deps_from_bytes(&broken).is_err());
}
