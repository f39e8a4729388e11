//! Version-string parsing and validation.
//!
//! Versioned paths embed their version directly in the filename (e.g.
//! `/characters/hero.1.2.3.obj`), so most of what this module does is regex
//! extraction rather than anything `semver` itself provides. The validity
//! check deliberately only requires the string to *begin* with `N.N.N` —
//! trailing pre-release or build metadata, or even unrelated trailing text,
//! is accepted, matching how version strings are embedded inside longer
//! filenames.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::VersionedError;

static VERSION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)").unwrap());

static VERSION_IN_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.((0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*))(\.[^.]*)?").unwrap()
});

/// Whether `version` begins with a valid `N.N.N` triple.
#[must_use]
pub fn is_valid(version: &str) -> bool {
    VERSION_PREFIX.is_match(version)
}

/// Find the first `N.N.N` version embedded in `path` and return it.
pub fn extract(path: &str) -> Result<String, VersionedError> {
    VERSION_IN_PATH
        .captures(path)
        .map(|captures| captures[1].to_string())
        .ok_or_else(|| VersionedError::NoVersionInPath(path.to_string()))
}

/// Split `path` around its embedded version into `(key, version)`, such that
/// re-inserting `version` between the two halves of `key` (with a `.`
/// separator) reproduces a path `extract` would recognize.
pub fn parse(path: &str) -> Result<(String, String), VersionedError> {
    let version = extract(path)?;
    let position = path
        .rfind(version.as_str())
        .expect("extracted version must occur in the path it was extracted from");
    let prefix = path[..position].trim_end_matches('.');
    let suffix = &path[position + version.len()..];
    Ok((format!("{prefix}{suffix}"), version))
}

/// Fill in missing components of a (possibly partial) version number with
/// zero, and drop any pre-release or build metadata: `normalize("3")` is
/// `"3.0.0"`, `normalize("3.4")` is `"3.4.0"`.
pub fn normalize(version: &str) -> String {
    let core = version.split(['-', '+']).next().unwrap_or(version);
    let mut parts = core.split('.');
    let major: u64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor: u64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let patch: u64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    format!("{major}.{minor}.{patch}")
}

/// Parse a full `N.N.N` version string into a [`semver::Version`], rejecting
/// anything with trailing garbage (unlike [`is_valid`], which only checks
/// the prefix).
pub fn parse_exact(version: &str) -> Result<semver::Version, VersionedError> {
    semver::Version::parse(version)
        .map_err(|_| VersionedError::InvalidVersion(version.to_string()))
}

/// Whether `version` satisfies the version requirement `spec` (e.g. `">=3.4.0"`).
pub fn matches_spec(version: &str, spec: &str) -> Result<bool, VersionedError> {
    let req = semver::VersionReq::parse(spec)
        .map_err(|_| VersionedError::InvalidVersionSpec(spec.to_string()))?;
    let version = parse_exact(version)?;
    Ok(req.matches(&version))
}

/// `version` if it already satisfies `>= min_version`, otherwise
/// `min_version` itself (normalized to a full `N.N.N`).
pub fn apply_min_version(version: &str, min_version: &str) -> Result<String, VersionedError> {
    if matches_spec(version, &format!(">={min_version}"))? {
        Ok(version.to_string())
    } else {
        Ok(normalize(min_version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_valid_accepts_a_trailing_suffix() {
        assert!(is_valid("1.2.3"));
        assert!(is_valid("1.2.3-beta"));
        assert!(!is_valid("v1.2.3"));
        assert!(!is_valid("1.2"));
    }

    #[test]
    fn extract_finds_the_embedded_version() {
        assert_eq!(extract("/characters/hero.1.2.3.obj").unwrap(), "1.2.3");
        assert_eq!(extract("/characters/hero.1.2.3.linux.obj").unwrap(), "1.2.3");
        assert!(extract("/characters/hero.obj").is_err());
    }

    #[test]
    fn parse_splits_key_and_version() {
        let (key, version) = parse("/characters/hero.1.2.3.obj").unwrap();
        assert_eq!(key, "/characters/hero.obj");
        assert_eq!(version, "1.2.3");
    }

    #[test]
    fn normalize_fills_missing_components() {
        assert_eq!(normalize("3"), "3.0.0");
        assert_eq!(normalize("3.4"), "3.4.0");
        assert_eq!(normalize("3.4.13"), "3.4.13");
    }

    #[test]
    fn apply_min_version_only_lifts_when_below_the_floor() {
        assert_eq!(apply_min_version("3.4.5", "3").unwrap(), "3.4.5");
        assert_eq!(apply_min_version("3.4.5", "4").unwrap(), "4.0.0");
        assert_eq!(apply_min_version("3.4.5", "3.7").unwrap(), "3.7.0");
        assert_eq!(apply_min_version("3.4.5", "3.4.13").unwrap(), "3.4.13");
    }
}
