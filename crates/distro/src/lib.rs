//! # distro
//!
//! Linux distribution family classification.
//!
//! A static table maps base family identifiers to the downstream variants
//! known to share their package-management lineage. Anything the table does
//! not know is classified through the `ID_LIKE` field of os-release.
//!
//! ## Example
//!
//! ```
//! use distro::FamilyResolver;
//!
//! let resolver = FamilyResolver::with_id_like(Vec::<String>::new());
//! assert_eq!(resolver.family_of("manjaro"), "arch");
//! assert!(resolver.is_in_family("ubuntu", "debian"));
//! assert_eq!(resolver.family_of("plan9"), "plan9");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod os_release;

pub use os_release::OsRelease;

/// Base families and their known variants.
///
/// A variant appears in exactly one family and is never a family key itself.
pub const FAMILIES: &[(&str, &[&str])] = &[
    (
        "debian",
        &[
            "ubuntu",
            "linuxmint",
            "pop",
            "elementary",
            "zorin",
            "kali",
            "raspbian",
            "deepin",
            "mx",
            "parrot",
            "neon",
            "devuan",
            "pureos",
        ],
    ),
    (
        "rhel",
        &[
            "fedora",
            "centos",
            "rocky",
            "almalinux",
            "ol",
            "amzn",
            "nobara",
            "ultramarine",
            "scientific",
        ],
    ),
    (
        "arch",
        &[
            "manjaro",
            "endeavouros",
            "garuda",
            "artix",
            "arcolinux",
            "cachyos",
            "instantos",
            "archcraft",
        ],
    ),
    (
        "suse",
        &[
            "opensuse",
            "opensuse-leap",
            "opensuse-tumbleweed",
            "sles",
            "sled",
        ],
    ),
    ("alpine", &["postmarketos"]),
    ("gentoo", &["funtoo", "calculate"]),
    ("void", &[]),
];

/// Whether `id` is one of the base family keys.
#[must_use]
pub fn is_family_key(id: &str) -> bool {
    FAMILIES.iter().any(|(family, _)| *family == id)
}

/// The family that lists `id` as a variant, if any.
#[must_use]
pub fn family_listing(id: &str) -> Option<&'static str> {
    FAMILIES
        .iter()
        .find(|(_, variants)| variants.contains(&id))
        .map(|(family, _)| *family)
}

/// Classifies distribution identifiers.
///
/// Carries the host's `ID_LIKE` tokens so that lookups can be tested without
/// touching the real os-release file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyResolver {
    id_like: Vec<String>,
}

impl FamilyResolver {
    /// Resolver backed by the host's os-release (read now, not cached).
    #[must_use]
    pub fn system() -> Self {
        let id_like = OsRelease::load().map(|r| r.id_like).unwrap_or_default();
        Self { id_like }
    }

    /// Resolver with explicit `ID_LIKE` tokens.
    pub fn with_id_like<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id_like: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// The `ID_LIKE` tokens this resolver consults.
    #[must_use]
    pub fn id_like(&self) -> &[String] {
        &self.id_like
    }

    /// Resolve `id` to its family.
    ///
    /// 1. `id` itself if it is a family key;
    /// 2. the family listing `id` as a variant;
    /// 3. the first `ID_LIKE` token that is a family key;
    /// 4. `id` unchanged.
    #[must_use]
    pub fn family_of(&self, id: &str) -> String {
        if is_family_key(id) {
            return id.to_string();
        }
        if let Some(family) = family_listing(id) {
            return family.to_string();
        }
        if let Some(token) = self.id_like.iter().find(|t| is_family_key(t)) {
            return token.clone();
        }
        id.to_string()
    }

    /// Whether `id` belongs to `family`.
    #[must_use]
    pub fn is_in_family(&self, id: &str, family: &str) -> bool {
        if id == family {
            return true;
        }
        let listed = FAMILIES
            .iter()
            .any(|(key, variants)| *key == family && variants.contains(&id));
        listed || self.id_like.iter().any(|t| t == family)
    }
}

/// Resolve `id` to its family using the host's os-release.
#[must_use]
pub fn family_of(id: &str) -> String {
    FamilyResolver::system().family_of(id)
}

/// Whether `id` belongs to `family`, using the host's os-release.
#[must_use]
pub fn is_in_family(id: &str, family: &str) -> bool {
    FamilyResolver::system().is_in_family(id, family)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn bare() -> FamilyResolver {
        FamilyResolver::with_id_like(Vec::<String>::new())
    }

    #[test]
    fn test_every_variant_round_trips() {
        let resolver = bare();
        for (family, variants) in FAMILIES {
            for variant in *variants {
                assert_eq!(resolver.family_of(variant), *family, "variant {variant}");
                assert!(resolver.is_in_family(variant, family), "variant {variant}");
            }
        }
    }

    #[test]
    fn test_variants_are_unique_and_not_keys() {
        let mut seen = HashSet::new();
        for (_, variants) in FAMILIES {
            for variant in *variants {
                assert!(seen.insert(*variant), "{variant} listed twice");
                assert!(!is_family_key(variant), "{variant} is also a family key");
            }
        }
    }

    #[test]
    fn test_family_key_is_its_own_family() {
        let resolver = FamilyResolver::with_id_like(["debian"]);
        assert_eq!(resolver.family_of("arch"), "arch");
        assert!(resolver.is_in_family("arch", "arch"));
    }

    #[test]
    fn test_unknown_without_id_like_is_identity() {
        let resolver = bare();
        assert_eq!(resolver.family_of("plan9"), "plan9");
        assert_eq!(resolver.family_of(""), "");
    }

    #[test]
    fn test_unknown_uses_first_family_token_of_id_like() {
        let resolver = FamilyResolver::with_id_like(["ubuntu", "debian"]);
        assert_eq!(resolver.family_of("tuxedo"), "debian");
    }

    #[test]
    fn test_id_like_without_family_key_is_identity() {
        let resolver = FamilyResolver::with_id_like(["ubuntu"]);
        assert_eq!(resolver.family_of("tuxedo"), "tuxedo");
    }

    #[test]
    fn test_is_in_family_via_id_like() {
        let resolver = FamilyResolver::with_id_like(["arch"]);
        assert!(resolver.is_in_family("steamos", "arch"));
        assert!(!resolver.is_in_family("steamos", "debian"));
    }

    #[test]
    fn test_is_in_family_rejects_other_family_variant() {
        let resolver = bare();
        assert!(!resolver.is_in_family("ubuntu", "arch"));
        assert!(!resolver.is_in_family("fedora", "debian"));
    }

    #[test]
    fn test_family_listing() {
        assert_eq!(family_listing("rocky"), Some("rhel"));
        assert_eq!(family_listing("rhel"), None);
    }

    #[test]
    fn test_system_resolver_does_not_panic() {
        let _ = family_of("ubuntu");
        assert!(is_in_family("ubuntu", "debian"));
    }
}
