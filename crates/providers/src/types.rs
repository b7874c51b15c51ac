//! Provider definitions and their resolved projection.

use crate::error::{Error, Result};
use actions::ActionStep;
use cmdrun::CommandSpec;
use distro::FamilyResolver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Definition records
// ============================================================================

/// A package-manager provider, as read from a definition file.
///
/// `name` is the registry key. A later definition with the same name
/// replaces an earlier one in full.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Provider {
    /// Unique name, e.g. `apt`.
    pub name: String,
    /// One-line description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Package commands need elevation.
    pub elevated: bool,
    /// How to tell whether the provider is usable.
    pub detection: Detection,
    /// Subcommand words for package operations.
    pub commands: Commands,
    /// Third-party repository support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    /// Named package groups (category -> packages).
    #[serde(alias = "corePackages")]
    pub core_packages: BTreeMap<String, Vec<String>>,
    /// Steps that install the provider itself.
    #[serde(skip_serializing_if = "StepList::is_empty")]
    pub install: StepList,
    /// Steps that remove the provider itself.
    #[serde(skip_serializing_if = "StepList::is_empty")]
    pub remove: StepList,
    /// Package that provides this tool, installable through the default
    /// manager when there are no install steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Environment for every command this provider runs.
    pub environment: BTreeMap<String, String>,
    /// Machine architecture (as reported by the OS) to the name this
    /// provider's repositories use, e.g. `x86_64 = "amd64"`.
    pub arch: BTreeMap<String, String>,
    /// Per-distribution overrides, keyed by distro id or family.
    pub alternatives: BTreeMap<String, Alternative>,
    /// Where the binary was found. Set only by detection.
    #[serde(skip)]
    pub binary_path: Option<PathBuf>,
}

/// Detection descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Detection {
    /// Executable that must be on the search path.
    pub binary: String,
    /// Files that must exist (`~` allowed).
    pub files: Vec<String>,
    /// OS names, distro ids or family keys this provider works on.
    /// Empty means any system.
    #[serde(alias = "systems")]
    pub distributions: Vec<String>,
}

/// Subcommand words for each package operation, e.g. `install -y`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Commands {
    /// Install packages.
    pub install: Option<String>,
    /// Refresh package metadata.
    pub update: Option<String>,
    /// Remove packages.
    pub remove: Option<String>,
    /// List installed packages.
    pub list: Option<String>,
    /// Search available packages.
    pub search: Option<String>,
    /// Clean caches.
    pub clean: Option<String>,
}

/// Repository descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Repository {
    /// Path templates for repository artifacts.
    pub paths: RepositoryPaths,
    /// Steps that add a repository.
    pub add: StepList,
    /// Steps that remove a repository.
    pub remove: StepList,
}

/// Path templates, rendered with `{{Name}}` and friends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryPaths {
    /// Where the source entry is written.
    pub sources: Option<String>,
    /// Where the signing key is installed.
    pub keys: Option<String>,
    /// Extra configuration location.
    pub config: Option<String>,
}

/// An ordered step sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepList {
    /// The steps.
    pub steps: Vec<ActionStep>,
}

impl StepList {
    /// No steps declared.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Per-distribution alternative package sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Alternative {
    /// Replaces the provider's core packages on this distribution.
    #[serde(alias = "corePackages")]
    pub core_packages: BTreeMap<String, Vec<String>>,
}

impl Provider {
    /// Check the definition without touching the system.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Error::Invalid {
            name: self.name.clone(),
            message,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("'name' is required".to_string()));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(invalid("'name' must not contain whitespace".to_string()));
        }
        if self.detection.binary.trim().is_empty() {
            return Err(invalid("'detection.binary' is required".to_string()));
        }

        let sequences = [
            ("install", self.install.steps.as_slice()),
            ("remove", self.remove.steps.as_slice()),
        ];
        for (label, steps) in sequences {
            actions::validate(steps).map_err(|e| invalid(format!("{label}: {e}")))?;
        }

        if let Some(repo) = &self.repository {
            for (label, steps) in [("repository.add", &repo.add), ("repository.remove", &repo.remove)] {
                actions::validate(&steps.steps).map_err(|e| invalid(format!("{label}: {e}")))?;
            }
            let paths = [&repo.paths.sources, &repo.paths.keys, &repo.paths.config];
            for path in paths.into_iter().flatten() {
                actions::template::check(path).map_err(|e| invalid(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Core package groups for a distribution.
    ///
    /// An alternative keyed by the exact distro id wins, then one keyed by
    /// its family, then the provider's own groups.
    #[must_use]
    pub fn core_packages_for(
        &self,
        distro: &str,
        resolver: &FamilyResolver,
    ) -> &BTreeMap<String, Vec<String>> {
        if let Some(alt) = self.alternatives.get(distro) {
            return &alt.core_packages;
        }
        let family = resolver.family_of(distro);
        self.alternatives
            .get(&family)
            .map_or(&self.core_packages, |alt| &alt.core_packages)
    }

    /// The architecture name this provider uses for `machine_arch`.
    #[must_use]
    pub fn arch_name<'a>(&'a self, machine_arch: &'a str) -> &'a str {
        self.arch
            .get(machine_arch)
            .map_or(machine_arch, String::as_str)
    }

    /// Subcommand words for an operation.
    #[must_use]
    pub fn command_words(&self, kind: CommandKind) -> Option<Vec<String>> {
        let words = match kind {
            CommandKind::Install => &self.commands.install,
            CommandKind::Update => &self.commands.update,
            CommandKind::Remove => &self.commands.remove,
            CommandKind::List => &self.commands.list,
            CommandKind::Search => &self.commands.search,
            CommandKind::Clean => &self.commands.clean,
        };
        words
            .as_deref()
            .map(|w| w.split_whitespace().map(str::to_string).collect())
    }

    /// Ready-to-invoke projection, once detection has set `binary_path`.
    #[must_use]
    pub fn to_manager_info(&self) -> Option<PackageManagerInfo> {
        let binary = self.binary_path.clone()?;
        let argv = |kind| {
            self.command_words(kind).map(|words| {
                let mut argv = vec![binary.to_string_lossy().into_owned()];
                argv.extend(words);
                argv
            })
        };

        Some(PackageManagerInfo {
            name: self.name.clone(),
            install: argv(CommandKind::Install),
            update: argv(CommandKind::Update),
            remove: argv(CommandKind::Remove),
            list: argv(CommandKind::List),
            search: argv(CommandKind::Search),
            clean: argv(CommandKind::Clean),
            elevated: self.elevated,
            environment: self.environment.clone(),
            binary,
        })
    }
}

// ============================================================================
// Resolved projection
// ============================================================================

/// Package operations a provider may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Install packages.
    Install,
    /// Refresh metadata.
    Update,
    /// Remove packages.
    Remove,
    /// List installed packages.
    List,
    /// Search packages.
    Search,
    /// Clean caches.
    Clean,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::List => "list",
            Self::Search => "search",
            Self::Clean => "clean",
        };
        f.write_str(name)
    }
}

/// A detected provider with fully composed argument vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageManagerInfo {
    /// Provider name.
    pub name: String,
    /// Resolved executable.
    pub binary: PathBuf,
    /// `[binary, words...]` for install.
    pub install: Option<Vec<String>>,
    /// `[binary, words...]` for update.
    pub update: Option<Vec<String>>,
    /// `[binary, words...]` for remove.
    pub remove: Option<Vec<String>>,
    /// `[binary, words...]` for list.
    pub list: Option<Vec<String>>,
    /// `[binary, words...]` for search.
    pub search: Option<Vec<String>>,
    /// `[binary, words...]` for clean.
    pub clean: Option<Vec<String>>,
    /// Commands run elevated.
    pub elevated: bool,
    /// Environment overrides.
    pub environment: BTreeMap<String, String>,
}

impl PackageManagerInfo {
    /// Argument vector for an operation, if supported.
    #[must_use]
    pub fn argv(&self, kind: CommandKind) -> Option<&[String]> {
        match kind {
            CommandKind::Install => self.install.as_deref(),
            CommandKind::Update => self.update.as_deref(),
            CommandKind::Remove => self.remove.as_deref(),
            CommandKind::List => self.list.as_deref(),
            CommandKind::Search => self.search.as_deref(),
            CommandKind::Clean => self.clean.as_deref(),
        }
    }

    /// A command for `kind` with `extra` arguments appended.
    #[must_use]
    pub fn command(&self, kind: CommandKind, extra: &[String]) -> Option<CommandSpec> {
        let (program, words) = self.argv(kind)?.split_first()?;
        Some(
            CommandSpec::new(program.as_str())
                .args(words.iter().chain(extra).map(String::as_str))
                .envs(self.environment.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .elevated(self.elevated),
        )
    }
}
