//! Enhanced PATH assembly.
//!
//! Freshly installed tooling usually lands in a directory the caller's shell
//! has not picked up yet (`~/.cargo/bin`, `/opt/homebrew/bin`, ...). The
//! [`SearchPath`] layers well-known install locations in precedence order,
//! followed by the inherited `PATH`:
//!
//! | Layer            | Examples                                       |
//! |------------------|------------------------------------------------|
//! | System           | `/usr/local/bin`, `/usr/bin`, `/bin`, `/sbin`  |
//! | UserLocal        | `~/.local/bin`, `~/bin`                        |
//! | LanguageUser     | `~/.cargo/bin`, `~/go/bin`, `~/.bun/bin`       |
//! | LanguageSystem   | `/usr/local/go/bin`, `/usr/local/cargo/bin`    |
//! | ThirdParty       | Homebrew, Linuxbrew, Nix, Snap, Flatpak, Scoop |
//!
//! Entries are existence-checked, symlink-resolved and de-duplicated on
//! every lookup, not once at startup.

use std::collections::HashSet;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// A group of well-known binary directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathLayer {
    /// Core system binary directories.
    System,
    /// The user's local bin directories.
    UserLocal,
    /// Per-user language toolchain directories.
    LanguageUser,
    /// System-wide language toolchain directories.
    LanguageSystem,
    /// Third-party package manager installation directories.
    ThirdParty,
}

impl PathLayer {
    /// All layers, highest precedence first.
    pub const ALL: [PathLayer; 5] = [
        PathLayer::System,
        PathLayer::UserLocal,
        PathLayer::LanguageUser,
        PathLayer::LanguageSystem,
        PathLayer::ThirdParty,
    ];

    /// Candidate directories for this layer. Nothing is checked for existence.
    #[must_use]
    pub fn candidates(self, home: Option<&Path>) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = absolute_candidates(self)
            .iter()
            .map(PathBuf::from)
            .collect();
        if let Some(home) = home {
            out.extend(home_candidates(self).iter().map(|rel| home.join(rel)));
        }
        #[cfg(windows)]
        out.extend(windows_env_candidates(self));
        out
    }
}

#[cfg(not(windows))]
fn absolute_candidates(layer: PathLayer) -> &'static [&'static str] {
    match layer {
        PathLayer::System => &[
            "/usr/local/bin",
            "/usr/bin",
            "/bin",
            "/usr/local/sbin",
            "/usr/sbin",
            "/sbin",
        ],
        PathLayer::UserLocal => &[],
        PathLayer::LanguageUser => &[],
        PathLayer::LanguageSystem => &["/usr/local/go/bin", "/usr/local/cargo/bin", "/opt/node/bin"],
        PathLayer::ThirdParty => &[
            "/opt/homebrew/bin",
            "/opt/homebrew/sbin",
            "/home/linuxbrew/.linuxbrew/bin",
            "/opt/local/bin",
            "/nix/var/nix/profiles/default/bin",
            "/run/current-system/sw/bin",
            "/snap/bin",
            "/var/lib/flatpak/exports/bin",
        ],
    }
}

#[cfg(windows)]
fn absolute_candidates(layer: PathLayer) -> &'static [&'static str] {
    match layer {
        PathLayer::System => &[r"C:\Windows\System32", r"C:\Windows"],
        PathLayer::ThirdParty => &[r"C:\ProgramData\chocolatey\bin"],
        _ => &[],
    }
}

#[cfg(not(windows))]
fn home_candidates(layer: PathLayer) -> &'static [&'static str] {
    match layer {
        PathLayer::System => &[],
        PathLayer::UserLocal => &[".local/bin", "bin"],
        PathLayer::LanguageUser => &[
            ".cargo/bin",
            "go/bin",
            ".npm-global/bin",
            ".local/share/pnpm",
            ".bun/bin",
            ".deno/bin",
            ".volta/bin",
            ".pyenv/shims",
        ],
        PathLayer::LanguageSystem => &[],
        PathLayer::ThirdParty => &[".linuxbrew/bin", ".nix-profile/bin", ".local/share/flatpak/exports/bin"],
    }
}

#[cfg(windows)]
fn home_candidates(layer: PathLayer) -> &'static [&'static str] {
    match layer {
        PathLayer::LanguageUser => &[r".cargo\bin", r"go\bin"],
        PathLayer::ThirdParty => &[r"scoop\shims"],
        _ => &[],
    }
}

#[cfg(windows)]
fn windows_env_candidates(layer: PathLayer) -> Vec<PathBuf> {
    let from_env = |var: &str, rel: &str| env::var_os(var).map(|base| PathBuf::from(base).join(rel));
    match layer {
        PathLayer::UserLocal => from_env("LOCALAPPDATA", r"Microsoft\WindowsApps")
            .into_iter()
            .collect(),
        PathLayer::LanguageUser => from_env("APPDATA", "npm").into_iter().collect(),
        PathLayer::ThirdParty => from_env("ProgramData", r"chocolatey\bin")
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

/// The effective search path for binaries and child processes.
///
/// Candidates are fixed at construction; which of them exist is decided on
/// every query, so a directory created by an install step is searched from
/// then on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    candidates: Vec<PathBuf>,
    layered: bool,
}

impl SearchPath {
    /// Build from the current user's home directory and inherited `PATH`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::build(dirs::home_dir().as_deref(), env::var_os("PATH"))
    }

    /// Build from an explicit home directory and inherited `PATH` value.
    #[must_use]
    pub fn build(home: Option<&Path>, inherited: Option<OsString>) -> Self {
        let mut candidates: Vec<PathBuf> = PathLayer::ALL
            .iter()
            .flat_map(|layer| layer.candidates(home))
            .collect();
        if let Some(inherited) = inherited {
            candidates.extend(env::split_paths(&inherited));
        }

        let mut seen = HashSet::new();
        candidates.retain(|c| !c.as_os_str().is_empty() && seen.insert(c.clone()));

        Self {
            candidates,
            layered: true,
        }
    }

    /// Use exactly these directories, in order, with no layering or filtering.
    #[must_use]
    pub fn from_dirs(dirs: Vec<PathBuf>) -> Self {
        Self {
            candidates: dirs,
            layered: false,
        }
    }

    /// Directories in precedence order, as they exist right now.
    #[must_use]
    pub fn dirs(&self) -> Vec<PathBuf> {
        if !self.layered {
            return self.candidates.clone();
        }
        let mut seen = HashSet::new();
        let dirs: Vec<PathBuf> = self
            .candidates
            .iter()
            .filter(|candidate| candidate.is_dir())
            .map(|candidate| candidate.canonicalize().unwrap_or_else(|_| candidate.clone()))
            .filter(|resolved| seen.insert(resolved.clone()))
            .collect();
        log::trace!("search path: {dirs:?}");
        dirs
    }

    /// The search path as a `PATH` value.
    #[must_use]
    pub fn to_os_string(&self) -> OsString {
        // join_paths only fails on entries containing the separator; skip those
        let dirs = self.dirs();
        env::join_paths(&dirs).unwrap_or_else(|_| {
            let usable = dirs
                .iter()
                .filter(|d| env::join_paths([d.as_path()]).is_ok());
            env::join_paths(usable).unwrap_or_default()
        })
    }

    /// Resolve a binary name (or path) against this search path.
    #[must_use]
    pub fn resolve(&self, binary: &str) -> Option<PathBuf> {
        if binary.is_empty() {
            return None;
        }
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        which::which_in(binary, Some(self.to_os_string()), cwd).ok()
    }
}
