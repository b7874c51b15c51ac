//! Per-run snapshot of the host and its package managers.

use crate::default::select_default;
use crate::detect::{Detector, SystemIdentity};
use crate::registry::Registry;
use crate::types::PackageManagerInfo;
use cmdrun::SearchPath;
use serde::Serialize;
use std::collections::BTreeMap;

/// System identity plus every detected package manager and the default.
///
/// Built fresh for each detection pass and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct OsInfo {
    /// Who this host is.
    #[serde(flatten)]
    pub identity: SystemIdentity,
    /// Detected managers by name.
    pub managers: BTreeMap<String, PackageManagerInfo>,
    /// Chosen default manager, if any is available.
    pub default: Option<String>,
}

impl OsInfo {
    /// Detect available providers and pick a default.
    #[must_use]
    pub fn detect(registry: &Registry, identity: SystemIdentity, search_path: &SearchPath) -> Self {
        let detector = Detector::new(&identity, search_path);
        let managers: BTreeMap<String, PackageManagerInfo> = detector
            .available(registry)
            .iter()
            .filter_map(|provider| provider.to_manager_info())
            .map(|info| (info.name.clone(), info))
            .collect();

        let names: Vec<&str> = managers.keys().map(String::as_str).collect();
        let default = select_default(&names, &identity);
        log::info!(
            "{} on {}: {} package managers, default {}",
            identity.distro,
            identity.arch,
            managers.len(),
            default.as_deref().unwrap_or("none")
        );

        Self {
            identity,
            managers,
            default,
        }
    }

    /// A detected manager by name.
    #[must_use]
    pub fn manager(&self, name: &str) -> Option<&PackageManagerInfo> {
        self.managers.get(name)
    }

    /// The default manager.
    #[must_use]
    pub fn default_manager(&self) -> Option<&PackageManagerInfo> {
        self.default.as_deref().and_then(|name| self.manager(name))
    }

    /// Whether `name` was detected.
    #[must_use]
    pub fn is_available(&self, name: &str) -> bool {
        self.managers.contains_key(name)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::types::{Commands, Detection, Provider};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn provider(name: &str, systems: &[&str]) -> Provider {
        Provider {
            name: name.to_string(),
            elevated: name == "pacman",
            detection: Detection {
                binary: name.to_string(),
                files: Vec::new(),
                distributions: systems.iter().map(ToString::to_string).collect(),
            },
            commands: Commands {
                install: Some("-S --noconfirm".to_string()),
                ..Commands::default()
            },
            ..Provider::default()
        }
    }

    #[test]
    fn test_detect_arch_host() {
        let bins = TempDir::new().unwrap();
        for name in ["pacman", "yay"] {
            let path = bins.path().join(name);
            fs::write(&path, "#!/bin/sh\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        let search_path = SearchPath::from_dirs(vec![bins.path().to_path_buf()]);
        let registry: Registry = [
            provider("pacman", &["arch"]),
            provider("yay", &["arch"]),
            provider("paru", &["arch"]),
            provider("apt", &["debian"]),
        ]
        .into_iter()
        .collect();
        let identity = SystemIdentity::new("linux", "arch", Vec::<String>::new(), "x86_64");

        let info = OsInfo::detect(&registry, identity, &search_path);

        assert_eq!(info.managers.keys().collect::<Vec<_>>(), vec!["pacman", "yay"]);
        assert_eq!(info.default.as_deref(), Some("yay"));
        assert!(!info.is_available("paru"));

        let pacman = info.manager("pacman").unwrap();
        assert!(pacman.elevated);
        assert_eq!(
            pacman.install.as_ref().unwrap()[0],
            bins.path().join("pacman").display().to_string()
        );
        assert_eq!(info.default_manager().unwrap().name, "yay");
    }

    #[test]
    fn test_detect_nothing_available() {
        let search_path = SearchPath::from_dirs(Vec::new());
        let registry: Registry = [provider("apt", &["debian"])].into_iter().collect();
        let identity = SystemIdentity::new("linux", "debian", Vec::<String>::new(), "x86_64");

        let info = OsInfo::detect(&registry, identity, &search_path);

        assert!(info.managers.is_empty());
        assert!(info.default.is_none());
        assert!(info.default_manager().is_none());
    }

    #[test]
    fn test_serializes_flat_identity() {
        let registry = Registry::new();
        let identity = SystemIdentity::new("linux", "alpine", Vec::<String>::new(), "aarch64");
        let info = OsInfo::detect(&registry, identity, &SearchPath::from_dirs(Vec::new()));

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["distro"], "alpine");
        assert_eq!(json["family"], "alpine");
        assert!(json["default"].is_null());
    }
}
