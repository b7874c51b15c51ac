//! Provider availability detection.
//!
//! A provider is available when, in order:
//!
//! 1. one of its declared systems matches this host (OS name, exact distro
//!    id, or a family the distro belongs to);
//! 2. its binary resolves on the enhanced search path;
//! 3. every required file exists.
//!
//! The checks short-circuit. A miss is logged at debug level and the
//! provider is left out; it is never an error.

use crate::registry::Registry;
use crate::types::Provider;
use cmdrun::{CommandExecutor, CommandSpec, SearchPath};
use distro::{FamilyResolver, OsRelease};
use serde::Serialize;
use std::path::PathBuf;

/// Canonical OS name for `name`, folding aliases.
#[must_use]
pub fn normalize_os(name: &str) -> &str {
    match name {
        "macos" | "osx" | "mac" | "darwin" => "darwin",
        "win" | "win32" | "windows" => "windows",
        other => other,
    }
}

/// Who this host is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemIdentity {
    /// `linux`, `darwin`, `windows` or another `std::env::consts::OS` value.
    pub os: String,
    /// os-release `ID` on Linux, otherwise the OS name.
    pub distro: String,
    /// Base family of `distro`.
    pub family: String,
    /// OS or distribution version, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Release codename (`jammy`), if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codename: Option<String>,
    /// Machine architecture (`x86_64`, `aarch64`, ...).
    pub arch: String,
    /// os-release `ID_LIKE` tokens.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub id_like: Vec<String>,
}

impl SystemIdentity {
    /// Identity of the running host, from compile-time constants and
    /// os-release.
    #[must_use]
    pub fn current() -> Self {
        let os = normalize_os(std::env::consts::OS);
        let arch = std::env::consts::ARCH;
        if os == "linux" {
            let release = OsRelease::load().unwrap_or_default();
            Self::from_os_release(&release, arch)
        } else {
            Self::new(os, os, Vec::<String>::new(), arch)
        }
    }

    /// Like [`current`](Self::current), also asking the OS for its version
    /// where os-release does not exist.
    pub fn current_with(executor: &dyn CommandExecutor) -> Self {
        let mut identity = Self::current();
        if identity.version.is_none() {
            identity.version = query_version(&identity.os, executor);
        }
        identity
    }

    /// Build a Linux identity from parsed os-release data.
    #[must_use]
    pub fn from_os_release(release: &OsRelease, arch: &str) -> Self {
        let id = if release.id.is_empty() {
            "linux"
        } else {
            release.id.as_str()
        };
        let mut identity = Self::new("linux", id, release.id_like.clone(), arch);
        identity.version = release.version_id.clone();
        identity.codename = release.version_codename.clone();
        identity
    }

    /// Build an identity from explicit parts.
    pub fn new<I, S>(os: &str, distro: &str, id_like: I, arch: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id_like: Vec<String> = id_like.into_iter().map(Into::into).collect();
        let family = FamilyResolver::with_id_like(id_like.clone()).family_of(distro);
        Self {
            os: normalize_os(os).to_string(),
            distro: distro.to_string(),
            family,
            version: None,
            codename: None,
            arch: arch.to_string(),
            id_like,
        }
    }

    /// Family resolver seeded with this host's `ID_LIKE`.
    #[must_use]
    pub fn resolver(&self) -> FamilyResolver {
        FamilyResolver::with_id_like(self.id_like.clone())
    }

    /// Whether a declared system token applies to this host.
    #[must_use]
    pub fn matches(&self, token: &str) -> bool {
        let lowered = token.trim().to_ascii_lowercase();
        let token = normalize_os(&lowered);
        token == self.os
            || token == self.distro
            || (self.os == "linux" && self.resolver().is_in_family(&self.distro, token))
    }
}

fn query_version(os: &str, executor: &dyn CommandExecutor) -> Option<String> {
    let spec = match os {
        "darwin" => CommandSpec::new("sw_vers").arg("-productVersion"),
        "windows" => CommandSpec::new("cmd").args(["/C", "ver"]),
        _ => return None,
    };
    match executor.execute(&spec.capture(true)) {
        Ok(out) if !out.stdout_trimmed().is_empty() => Some(out.stdout_trimmed().to_string()),
        Ok(_) => None,
        Err(e) => {
            log::debug!("cannot determine {os} version: {e}");
            None
        }
    }
}

/// Why a provider was left out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectionMiss {
    /// No declared system matches this host.
    #[error("not supported on {system} (supports {})", .supported.join(", "))]
    Incompatible {
        /// This host, as `os/distro`.
        system: String,
        /// The provider's declared systems.
        supported: Vec<String>,
    },

    /// The binary is not on the search path.
    #[error("'{0}' not found on PATH")]
    BinaryNotFound(String),

    /// A required file does not exist.
    #[error("required file {} is missing", .0.display())]
    MissingFile(PathBuf),
}

/// Evaluates providers against one host.
#[derive(Debug, Clone)]
pub struct Detector<'a> {
    identity: &'a SystemIdentity,
    search_path: &'a SearchPath,
    home: Option<PathBuf>,
}

impl<'a> Detector<'a> {
    /// Detector for `identity`, resolving binaries on `search_path`.
    #[must_use]
    pub fn new(identity: &'a SystemIdentity, search_path: &'a SearchPath) -> Self {
        Self {
            identity,
            search_path,
            home: dirs::home_dir(),
        }
    }

    /// Expand `~` in required files against `home` instead of the real one.
    #[must_use]
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Check 1: declared systems.
    pub fn check_compatible(&self, provider: &Provider) -> Result<(), DetectionMiss> {
        let systems = &provider.detection.distributions;
        if systems.is_empty() || systems.iter().any(|s| self.identity.matches(s)) {
            return Ok(());
        }
        Err(DetectionMiss::Incompatible {
            system: format!("{}/{}", self.identity.os, self.identity.distro),
            supported: systems.clone(),
        })
    }

    fn expand(&self, file: &str) -> PathBuf {
        let home = self
            .home
            .as_ref()
            .map(|h| h.to_string_lossy().into_owned());
        PathBuf::from(shellexpand::tilde_with_context(file, || home).into_owned())
    }

    /// Run all three checks, returning the resolved binary.
    pub fn check(&self, provider: &Provider) -> Result<PathBuf, DetectionMiss> {
        self.check_compatible(provider)?;

        let binary = self
            .search_path
            .resolve(&provider.detection.binary)
            .ok_or_else(|| DetectionMiss::BinaryNotFound(provider.detection.binary.clone()))?;

        for file in &provider.detection.files {
            let path = self.expand(file);
            if !path.exists() {
                return Err(DetectionMiss::MissingFile(path));
            }
        }

        Ok(binary)
    }

    /// Providers that pass every check, with `binary_path` set, sorted by name.
    #[must_use]
    pub fn available(&self, registry: &Registry) -> Vec<Provider> {
        registry
            .iter()
            .filter_map(|provider| match self.check(provider) {
                Ok(binary) => {
                    log::debug!("provider '{}' available at {}", provider.name, binary.display());
                    let mut found = provider.clone();
                    found.binary_path = Some(binary);
                    Some(found)
                }
                Err(miss) => {
                    log::debug!("provider '{}' skipped: {miss}", provider.name);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Detection;
    use std::fs;
    use tempfile::TempDir;

    fn provider(name: &str, binary: &str, systems: &[&str]) -> Provider {
        Provider {
            name: name.to_string(),
            detection: Detection {
                binary: binary.to_string(),
                files: Vec::new(),
                distributions: systems.iter().map(ToString::to_string).collect(),
            },
            ..Provider::default()
        }
    }

    /// A directory of fake executables.
    fn bin_dir(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            let path = dir.path().join(name);
            fs::write(&path, "#!/bin/sh\n").unwrap();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            }
        }
        dir
    }

    fn arch_host() -> SystemIdentity {
        SystemIdentity::new("linux", "arch", Vec::<String>::new(), "x86_64")
    }

    #[test]
    fn test_normalize_os_aliases() {
        assert_eq!(normalize_os("macos"), "darwin");
        assert_eq!(normalize_os("osx"), "darwin");
        assert_eq!(normalize_os("windows"), "windows");
        assert_eq!(normalize_os("freebsd"), "freebsd");
    }

    #[test]
    fn test_identity_from_os_release() {
        let release = OsRelease::parse(
            "ID=pop\nID_LIKE=\"ubuntu debian\"\nVERSION_ID=\"22.04\"\nVERSION_CODENAME=jammy\n",
        );
        let identity = SystemIdentity::from_os_release(&release, "x86_64");
        assert_eq!(identity.os, "linux");
        assert_eq!(identity.distro, "pop");
        assert_eq!(identity.family, "debian");
        assert_eq!(identity.version.as_deref(), Some("22.04"));
        assert_eq!(identity.codename.as_deref(), Some("jammy"));
    }

    #[test]
    fn test_matches_tokens() {
        let ubuntu = SystemIdentity::new("linux", "ubuntu", ["debian"], "x86_64");
        assert!(ubuntu.matches("linux"));
        assert!(ubuntu.matches("ubuntu"));
        assert!(ubuntu.matches("debian"));
        assert!(ubuntu.matches("Debian"));
        assert!(!ubuntu.matches("arch"));
        assert!(!ubuntu.matches("darwin"));

        let mac = SystemIdentity::new("macos", "darwin", Vec::<String>::new(), "aarch64");
        assert!(mac.matches("darwin"));
        assert!(mac.matches("macos"));
        assert!(!mac.matches("linux"));
    }

    #[test]
    fn test_current_with_queries_macos_version() {
        let exec = cmdrun::RecordingExecutor::new();
        exec.respond("sw_vers", "14.4.1\n");
        let version = query_version("darwin", &exec);
        assert_eq!(version.as_deref(), Some("14.4.1"));
        assert!(query_version("linux", &exec).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_pacman_and_yay_on_arch() {
        let bins = bin_dir(&["pacman", "yay"]);
        let search_path = SearchPath::from_dirs(vec![bins.path().to_path_buf()]);
        let registry: Registry = [
            provider("pacman", "pacman", &["arch"]),
            provider("yay", "yay", &["arch"]),
            provider("apt", "apt-get", &["debian"]),
        ]
        .into_iter()
        .collect();
        let identity = arch_host();

        let available = Detector::new(&identity, &search_path).available(&registry);

        let names: Vec<&str> = available.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["pacman", "yay"]);
        assert!(available.iter().all(|p| p.binary_path.is_some()));
    }

    #[test]
    fn test_missing_binary_is_excluded() {
        let bins = bin_dir(&[]);
        let search_path = SearchPath::from_dirs(vec![bins.path().to_path_buf()]);
        let identity = arch_host();
        let detector = Detector::new(&identity, &search_path);

        let miss = detector
            .check(&provider("pacman", "pacman", &["arch"]))
            .unwrap_err();
        assert_eq!(miss, DetectionMiss::BinaryNotFound("pacman".to_string()));
    }

    #[test]
    fn test_incompatible_short_circuits_before_binary() {
        let search_path = SearchPath::from_dirs(Vec::new());
        let identity = arch_host();
        let detector = Detector::new(&identity, &search_path);

        let miss = detector
            .check(&provider("apt", "apt-get", &["debian"]))
            .unwrap_err();
        assert!(matches!(miss, DetectionMiss::Incompatible { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_required_file_with_tilde() {
        let bins = bin_dir(&["brew"]);
        let home = TempDir::new().unwrap();
        let search_path = SearchPath::from_dirs(vec![bins.path().to_path_buf()]);
        let identity = SystemIdentity::new("darwin", "darwin", Vec::<String>::new(), "aarch64");
        let detector = Detector::new(&identity, &search_path).with_home(Some(home.path().to_path_buf()));

        let mut brew = provider("brew", "brew", &["darwin"]);
        brew.detection.files = vec!["~/.brewrc".to_string()];

        let miss = detector.check(&brew).unwrap_err();
        assert_eq!(miss, DetectionMiss::MissingFile(home.path().join(".brewrc")));

        fs::write(home.path().join(".brewrc"), "").unwrap();
        assert!(detector.check(&brew).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_system_list_matches_anything() {
        let bins = bin_dir(&["nix"]);
        let search_path = SearchPath::from_dirs(vec![bins.path().to_path_buf()]);
        let identity = arch_host();
        let detector = Detector::new(&identity, &search_path);
        assert!(detector.check(&provider("nix", "nix", &[])).is_ok());
    }
}
