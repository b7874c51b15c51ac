//! # providers
//!
//! Package-manager providers: loading definitions into a [`Registry`],
//! deciding which are usable on this host, choosing a default, and running
//! provisioning operations through them.
//!
//! ## Definitions
//!
//! A provider is a TOML (or JSON) record naming a binary, the systems it
//! supports, the subcommand words for each package operation, and optional
//! step sequences for repositories and for installing the tool itself.
//! Seventeen definitions are compiled in; files under the search
//! directories override them by name.
//!
//! ## Example
//!
//! ```no_run
//! use actions::HttpFetcher;
//! use cmdrun::{RunSettings, Runner};
//! use providers::{LoadOptions, OsInfo, Provisioner, Registry, SystemIdentity};
//!
//! let mut registry = Registry::new();
//! registry.initialize(&LoadOptions::standard(None, &[])).unwrap();
//!
//! let runner = Runner::new(RunSettings::default());
//! let identity = SystemIdentity::current_with(&runner);
//! let os_info = OsInfo::detect(&registry, identity, runner.search_path());
//! println!("default: {:?}", os_info.default);
//!
//! let fetcher = HttpFetcher::new();
//! let provisioner = Provisioner::new(&registry, &os_info, runner.search_path(), &runner, &fetcher);
//! provisioner.install_packages(None, &["git".to_string()]).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod default;
pub mod detect;
pub mod error;
pub mod loader;
pub mod osinfo;
pub mod provision;
pub mod registry;
pub mod types;

pub use default::select_default;
pub use detect::{DetectionMiss, Detector, SystemIdentity, normalize_os};
pub use error::{Error, ErrorCategory, Result};
pub use loader::{LoadOptions, builtin_providers, default_search_dirs};
pub use osinfo::OsInfo;
pub use provision::{BatchReport, Provisioner, RepositorySpec, SetupOutcome};
pub use registry::Registry;
pub use types::{CommandKind, PackageManagerInfo, Provider};
