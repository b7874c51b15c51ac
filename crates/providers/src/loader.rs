//! Loading provider definitions.
//!
//! Built-in definitions are compiled into the binary. Filesystem definitions
//! are read from an ordered list of directories; later directories override
//! earlier ones, and any filesystem definition overrides a built-in of the
//! same name in full.

use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::types::Provider;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Built-in definitions: (file name, contents).
pub const BUILTIN: &[(&str, &str)] = &[
    ("apk.toml", include_str!("builtin/apk.toml")),
    ("apt.toml", include_str!("builtin/apt.toml")),
    ("brew.toml", include_str!("builtin/brew.toml")),
    ("choco.toml", include_str!("builtin/choco.toml")),
    ("dnf.toml", include_str!("builtin/dnf.toml")),
    ("emerge.toml", include_str!("builtin/emerge.toml")),
    ("flatpak.toml", include_str!("builtin/flatpak.toml")),
    ("pacman.toml", include_str!("builtin/pacman.toml")),
    ("paru.toml", include_str!("builtin/paru.toml")),
    ("port.toml", include_str!("builtin/port.toml")),
    ("scoop.toml", include_str!("builtin/scoop.toml")),
    ("snap.toml", include_str!("builtin/snap.toml")),
    ("winget.toml", include_str!("builtin/winget.toml")),
    ("xbps.toml", include_str!("builtin/xbps.toml")),
    ("yay.toml", include_str!("builtin/yay.toml")),
    ("yum.toml", include_str!("builtin/yum.toml")),
    ("zypper.toml", include_str!("builtin/zypper.toml")),
];

/// Sub-directory name used in every search location.
const PROVIDERS_DIR: &str = "providers";

/// Where and what to load.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Load the compiled-in definitions first.
    pub builtin: bool,
    /// Directories to scan, lowest precedence first.
    pub search_dirs: Vec<PathBuf>,
}

impl LoadOptions {
    /// Built-ins plus the standard search locations, then `extra_dirs`.
    #[must_use]
    pub fn standard(config_dir: Option<&Path>, extra_dirs: &[PathBuf]) -> Self {
        let mut search_dirs = default_search_dirs(config_dir);
        search_dirs.extend(extra_dirs.iter().cloned());
        Self {
            builtin: true,
            search_dirs,
        }
    }

    /// Only the compiled-in definitions.
    #[must_use]
    pub fn builtin_only() -> Self {
        Self {
            builtin: true,
            search_dirs: Vec::new(),
        }
    }

    /// Only these directories.
    #[must_use]
    pub fn dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            builtin: false,
            search_dirs,
        }
    }
}

/// Standard search locations, lowest precedence first.
///
/// 1. `./providers`
/// 2. `<executable dir>/providers`
/// 3. platform shared-data directories
/// 4. `<config dir>/providers`
#[must_use]
pub fn default_search_dirs(config_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.join(PROVIDERS_DIR));
    }
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir.join(PROVIDERS_DIR));
    }
    dirs.extend(shared_data_dirs());
    if let Some(config) = config_dir {
        dirs.push(config.join(PROVIDERS_DIR));
    }

    dirs
}

#[cfg(target_os = "macos")]
fn shared_data_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/local/share/outfit/providers"),
        PathBuf::from("/opt/homebrew/share/outfit/providers"),
        PathBuf::from("/Library/Application Support/outfit/providers"),
    ]
}

#[cfg(windows)]
fn shared_data_dirs() -> Vec<PathBuf> {
    std::env::var_os("PROGRAMDATA")
        .map(|data| vec![PathBuf::from(data).join("outfit").join(PROVIDERS_DIR)])
        .unwrap_or_default()
}

#[cfg(all(unix, not(target_os = "macos")))]
fn shared_data_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/share/outfit/providers"),
        PathBuf::from("/usr/local/share/outfit/providers"),
    ]
}

/// Parse the compiled-in definitions. Malformed entries are logged and skipped.
#[must_use]
pub fn builtin_providers() -> Vec<Provider> {
    BUILTIN
        .iter()
        .filter_map(|(file, content)| {
            match parse_definition(Path::new(file), content) {
                Ok(provider) => Some(provider),
                Err(e) => {
                    log::warn!("skipping built-in provider {file}: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Parse one definition; the format follows the file extension.
pub fn parse_definition(path: &Path, content: &str) -> Result<Provider> {
    let parse_err = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    let provider: Provider = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?,
        _ => toml::from_str(content).map_err(|e| parse_err(e.to_string()))?,
    };
    provider.validate()?;
    Ok(provider)
}

fn is_definition(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("toml" | "json")
    )
}

/// Read every definition in `dir`, in file-name order.
///
/// A missing directory yields nothing; a malformed file is an error.
pub fn load_dir(dir: &Path) -> Result<Vec<Provider>> {
    if !dir.is_dir() {
        log::trace!("provider dir {} not present", dir.display());
        return Ok(Vec::new());
    }

    let mut providers = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::io(path, e.into())
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_definition(path) {
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let provider = parse_definition(path, &content)?;
        log::debug!("loaded provider '{}' from {}", provider.name, path.display());
        providers.push(provider);
    }
    Ok(providers)
}

/// Build a registry according to `options`.
///
/// Nothing is returned on failure, so a caller's registry never holds a
/// partial load.
pub(crate) fn load(options: &LoadOptions) -> Result<Registry> {
    let mut registry = Registry::new();
    if options.builtin {
        for provider in builtin_providers() {
            registry.insert(provider);
        }
        log::debug!("{} built-in providers", registry.len());
    }

    for dir in &options.search_dirs {
        for provider in load_dir(dir)? {
            registry.insert(provider);
        }
    }

    if registry.is_empty() {
        return Err(Error::NoProviders {
            searched: options.search_dirs.clone(),
        });
    }
    log::info!("{} providers registered", registry.len());
    Ok(registry)
}
