use crate::resolver::version::compare_versions;

/// Packages shipped with the R distribution itself. These never appear as
/// resolvable dependencies; repositories do not serve them.
pub const BASE_R_PACKAGES: [&str; 14] = [
    "base",
    "compiler",
    "datasets",
    "graphics",
    "grDevices",
    "grid",
    "methods",
    "parallel",
    "splines",
    "stats",
    "stats4",
    "tcltk",
    "tools",
    "utils",
];

/// Interpreter versions the resolver is willing to propose, oldest first.
pub const SUPPORTED_R_VERSIONS: [&str; 18] = [
    "3.6.0", "3.6.3", "4.0.0", "4.0.2", "4.0.5", "4.1.0", "4.1.2", "4.1.3", "4.2.0", "4.2.1",
    "4.2.2", "4.2.3", "4.3.0", "4.3.1", "4.3.2", "4.3.3", "4.4.0", "4.4.1",
];

/// Each Bioconductor release is built against exactly one R series.
pub const BIOCONDUCTOR_R_MATRIX: [(&str, &str); 8] = [
    ("3.12", "4.0"),
    ("3.13", "4.1"),
    ("3.14", "4.1"),
    ("3.15", "4.2"),
    ("3.16", "4.2"),
    ("3.17", "4.3"),
    ("3.18", "4.3"),
    ("3.19", "4.4"),
];

/// Base package names are matched case-insensitively; DESCRIPTION files are
/// inconsistent about casing.
pub fn is_base_package(name: &str) -> bool {
    BASE_R_PACKAGES.iter().any(|base| base.eq_ignore_ascii_case(name))
}

pub fn bioconductor_r_series(release: &str) -> Option<&'static str> {
    BIOCONDUCTOR_R_MATRIX
        .iter()
        .find(|(known, _)| *known == release)
        .map(|(_, series)| *series)
}

pub fn latest_bioconductor_release() -> Option<&'static str> {
    BIOCONDUCTOR_R_MATRIX
        .iter()
        .map(|(release, _)| *release)
        .max_by(|a, b| compare_versions(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn base_packages_match_case_insensitively() {
        assert!(is_base_package("methods"));
        assert!(is_base_package("grDevices"));
        assert!(is_base_package("GRDEVICES"));
        assert!(!is_base_package("rlang"));
    }

    #[test]
    fn latest_release_is_table_maximum() {
        assert_eq!(latest_bioconductor_release(), Some("3.19"));
    }

    #[test]
    fn release_lookup() {
        assert_eq!(bioconductor_r_series("3.17"), Some("4.3"));
        assert_eq!(bioconductor_r_series("9.99"), None);
    }

    #[test]
    fn compare_is_consistent_with_supported_order() {
        for pair in SUPPORTED_R_VERSIONS.windows(2) {
            assert_eq!(compare_versions(pair[0], pair[1]), Ordering::Less);
        }
    }
}
