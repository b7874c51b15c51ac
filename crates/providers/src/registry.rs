//! Name-keyed provider registry.

use crate::error::Result;
use crate::loader::{self, LoadOptions};
use crate::types::Provider;
use cmdrun::SearchPath;
use std::collections::BTreeMap;

/// All known provider definitions, keyed by name.
///
/// The registry is an owned value: build it once per process with
/// [`Registry::initialize`] and pass it by reference.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    providers: BTreeMap<String, Provider>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load built-in and filesystem definitions.
    ///
    /// A no-op once the registry holds anything. Fails if a user definition
    /// is malformed or if no providers exist after loading; the registry is
    /// left empty then, and a later call loads again.
    pub fn initialize(&mut self, options: &LoadOptions) -> Result<()> {
        if !self.is_empty() {
            log::trace!("registry already initialized ({} providers)", self.len());
            return Ok(());
        }
        *self = loader::load(options)?;
        Ok(())
    }

    /// Insert a definition, replacing any existing one with the same name.
    ///
    /// Returns the replaced definition.
    pub fn insert(&mut self, provider: Provider) -> Option<Provider> {
        let previous = self.providers.insert(provider.name.clone(), provider);
        if let Some(prev) = &previous {
            log::debug!("provider '{}' overridden", prev.name);
        }
        previous
    }

    /// The stored definition, without live resolution.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Provider> {
        self.providers.get(name)
    }

    /// A copy of the definition with its binary resolved on `search_path`.
    ///
    /// Resolution happens on every call; nothing is cached.
    #[must_use]
    pub fn get_provider(&self, name: &str, search_path: &SearchPath) -> Option<Provider> {
        let mut provider = self.providers.get(name)?.clone();
        provider.binary_path = search_path.resolve(&provider.detection.binary);
        Some(provider)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Definitions, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &Provider> {
        self.providers.values()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl FromIterator<Provider> for Registry {
    fn from_iter<I: IntoIterator<Item = Provider>>(iter: I) -> Self {
        let mut registry = Self::new();
        for provider in iter {
            registry.insert(provider);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Detection, Provider};
    use std::collections::BTreeMap;

    fn provider(name: &str, binary: &str) -> Provider {
        Provider {
            name: name.to_string(),
            detection: Detection {
                binary: binary.to_string(),
                ..Detection::default()
            },
            ..Provider::default()
        }
    }

    #[test]
    fn test_insert_replaces_in_full() {
        let mut registry = Registry::new();
        let mut builtin = provider("apt", "apt-get");
        builtin.elevated = true;
        builtin.core_packages =
            BTreeMap::from([("build".to_string(), vec!["build-essential".to_string()])]);
        registry.insert(builtin);

        let replaced = registry.insert(provider("apt", "apt"));

        assert!(replaced.is_some());
        let stored = registry.get("apt").unwrap();
        assert_eq!(stored.detection.binary, "apt");
        assert!(!stored.elevated);
        assert!(stored.core_packages.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_are_sorted() {
        let registry: Registry = [provider("zypper", "zypper"), provider("apk", "apk")]
            .into_iter()
            .collect();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["apk", "zypper"]);
    }

    #[test]
    fn test_get_provider_resolves_live() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry: Registry = [provider("fake", "fake-pm")].into_iter().collect();
        let search_path = SearchPath::from_dirs(vec![dir.path().to_path_buf()]);

        assert!(registry.get_provider("fake", &search_path).unwrap().binary_path.is_none());

        let binary = dir.path().join("fake-pm");
        std::fs::write(&binary, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        #[cfg(unix)]
        assert!(registry.get_provider("fake", &search_path).unwrap().binary_path.is_some());
        assert!(registry.get("fake").unwrap().binary_path.is_none());
        assert!(registry.get_provider("missing", &search_path).is_none());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut registry: Registry = [provider("only", "only")].into_iter().collect();
        registry.initialize(&LoadOptions::builtin_only()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("apt").is_none());
    }

    #[test]
    fn test_failed_initialize_leaves_registry_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.toml"), "name = [").unwrap();
        let options = LoadOptions {
            builtin: true,
            search_dirs: vec![dir.path().to_path_buf()],
        };

        let mut registry = Registry::new();
        assert!(registry.initialize(&options).is_err());
        assert!(registry.is_empty());
        // Retrying reports the same problem instead of succeeding silently.
        assert!(registry.initialize(&options).is_err());

        std::fs::remove_file(dir.path().join("bad.toml")).unwrap();
        registry.initialize(&options).unwrap();
        assert!(registry.get("apt").is_some());
    }

    #[test]
    fn test_initialize_user_file_replaces_builtin() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("brew.toml"),
            "name = \"brew\"\n[detection]\nbinary = \"brew\"\n[commands]\ninstall = \"install --quiet\"\n",
        )
        .unwrap();

        let mut registry = Registry::new();
        registry
            .initialize(&LoadOptions {
                builtin: true,
                search_dirs: vec![dir.path().to_path_buf()],
            })
            .unwrap();

        let brew = registry.get("brew").unwrap();
        assert_eq!(brew.commands.install.as_deref(), Some("install --quiet"));
        assert!(brew.commands.update.is_none());
        assert!(brew.install.is_empty());
        assert!(brew.environment.is_empty());
        assert!(brew.detection.distributions.is_empty());
    }
}

