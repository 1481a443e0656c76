//! Package identifier helpers.
//!
//! Root logs refer to packages either by bare name (table rows) or by a full
//! `name-[epoch:]version-release.arch` identifier ("already installed" lines).

/// Extract the package name from a `name-[epoch:]version-release.arch` string.
///
/// The name itself may contain dashes, so the identifier is split from the
/// right: the last two dash-separated fields are version and release.
///
/// Returns `None` when the string does not carry a version and release.
///
/// ```
/// use convenient_rootlog::nevra::name_from_nevra;
///
/// assert_eq!(name_from_nevra("make-1:4.4.1-2.fc39.x86_64"), Some("make"));
/// assert_eq!(name_from_nevra("gstreamer1-vaapi-1.22.9-1.fc39.x86_64"), Some("gstreamer1-vaapi"));
/// assert_eq!(name_from_nevra("make"), None);
/// ```
#[must_use]
pub fn name_from_nevra(nevra: &str) -> Option<&str> {
    let mut parts = nevra.rsplitn(3, '-');
    let _release = parts.next()?;
    let _version = parts.next()?;
    let name = parts.next()?;

    if name.is_empty() { None } else { Some(name) }
}

/// Check whether a token is a plausible RPM package name.
pub(crate) fn is_package_name(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-'))
}

/// Architectures that appear in the arch column of dnf transaction tables.
const KNOWN_ARCHES: &[&str] = &[
    "noarch", "x86_64", "i386", "i486", "i586", "i686", "aarch64", "armv7hl", "armv7hnl",
    "ppc64le", "ppc64", "s390x", "riscv64", "src",
];

/// Check whether a token is an architecture column value.
pub(crate) fn is_arch(token: &str) -> bool {
    KNOWN_ARCHES.contains(&token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_with_epoch() {
        assert_eq!(name_from_nevra("perl-interpreter-4:5.38.2-502.fc39.x86_64"), Some("perl-interpreter"));
    }

    #[test]
    fn test_name_without_release() {
        assert_eq!(name_from_nevra("bash-5.2"), None);
        assert_eq!(name_from_nevra("-1.0-1"), None);
    }

    #[test]
    fn test_package_name_tokens() {
        assert!(is_package_name("gcc-c++"));
        assert!(is_package_name("python3.12-devel"));
        assert!(is_package_name("libstdc++"));
        assert!(!is_package_name("===="));
        assert!(!is_package_name(""));
        assert!(!is_package_name("(x86-64)"));
    }

    #[test]
    fn test_arch_tokens() {
        assert!(is_arch("x86_64"));
        assert!(is_arch("noarch"));
        assert!(!is_arch("build"));
        assert!(!is_arch("X86_64"));
    }
}
