//! Default package-manager selection.
//!
//! A pure function of the available set and the host identity:
//!
//! 1. the distro id, then each `ID_LIKE` token, through a fixed association
//!    table;
//! 2. a platform preference list (Arch and RHEL families, macOS, Windows);
//! 3. the lexicographically first available provider.
//!
//! Only available providers are ever returned.

use crate::detect::SystemIdentity;

/// Distribution id to its native package manager.
pub const DISTRO_DEFAULTS: &[(&str, &str)] = &[
    ("debian", "apt"),
    ("ubuntu", "apt"),
    ("linuxmint", "apt"),
    ("pop", "apt"),
    ("elementary", "apt"),
    ("zorin", "apt"),
    ("kali", "apt"),
    ("raspbian", "apt"),
    ("neon", "apt"),
    ("devuan", "apt"),
    ("fedora", "dnf"),
    ("rhel", "dnf"),
    ("centos", "dnf"),
    ("rocky", "dnf"),
    ("almalinux", "dnf"),
    ("ol", "dnf"),
    ("amzn", "dnf"),
    ("nobara", "dnf"),
    ("suse", "zypper"),
    ("sles", "zypper"),
    ("sled", "zypper"),
    ("alpine", "apk"),
    ("postmarketos", "apk"),
    ("void", "xbps"),
    ("gentoo", "emerge"),
    ("funtoo", "emerge"),
];

/// Arch family: AUR helpers first, then pacman.
pub const ARCH_PREFERENCE: &[&str] = &["yay", "paru", "pikaur", "trizen", "pacman"];

/// RHEL family: older releases ship only yum.
pub const RHEL_PREFERENCE: &[&str] = &["dnf", "yum"];

/// macOS preference.
pub const MACOS_PREFERENCE: &[&str] = &["brew", "port"];

/// Windows preference.
pub const WINDOWS_PREFERENCE: &[&str] = &["winget", "scoop", "choco"];

/// Native package manager associated with a distro id.
#[must_use]
pub fn distro_default(id: &str) -> Option<&'static str> {
    if id.starts_with("opensuse") {
        return Some("zypper");
    }
    DISTRO_DEFAULTS
        .iter()
        .find(|(distro, _)| *distro == id)
        .map(|(_, manager)| *manager)
}

/// Platform preference list for a host.
#[must_use]
pub fn platform_preference(identity: &SystemIdentity) -> &'static [&'static str] {
    match identity.os.as_str() {
        "darwin" => MACOS_PREFERENCE,
        "windows" => WINDOWS_PREFERENCE,
        "linux"
            if identity.family == "arch"
                || identity.resolver().is_in_family(&identity.distro, "arch") =>
        {
            ARCH_PREFERENCE
        }
        "linux"
            if identity.family == "rhel"
                || identity.resolver().is_in_family(&identity.distro, "rhel") =>
        {
            RHEL_PREFERENCE
        }
        _ => &[],
    }
}

/// Choose the default provider among `available` names.
pub fn select_default<S: AsRef<str>>(
    available: &[S],
    identity: &SystemIdentity,
) -> Option<String> {
    let is_available = |name: &str| available.iter().any(|a| a.as_ref() == name);

    let ids = std::iter::once(identity.distro.as_str())
        .chain(identity.id_like.iter().map(String::as_str));
    for id in ids {
        if let Some(manager) = distro_default(id)
            && is_available(manager)
        {
            log::debug!("default '{manager}' from distro id '{id}'");
            return Some(manager.to_string());
        }
    }

    if let Some(manager) = platform_preference(identity)
        .iter()
        .find(|name| is_available(name))
    {
        log::debug!("default '{manager}' from platform preference");
        return Some((*manager).to_string());
    }

    let fallback = available
        .iter()
        .map(|a| a.as_ref())
        .min()
        .map(str::to_string);
    if let Some(manager) = &fallback {
        log::debug!("default '{manager}' by name order");
    }
    fallback
}
