//! High-level provisioning operations.
//!
//! A [`Provisioner`] turns intents (install these packages, add this
//! repository, set up that package manager) into provider commands and step
//! sequences. Single operations propagate the first error; the `*_each`
//! and `*_isolated` helpers run independent items separately and report
//! per item.

use crate::default::select_default;
use crate::detect::Detector;
use crate::error::{Error, Result};
use crate::osinfo::OsInfo;
use crate::registry::Registry;
use crate::types::{CommandKind, PackageManagerInfo, Provider, Repository};
use actions::{ActionStep, ExecContext, ExecuteSummary, Fetcher, ProgressCallback, TemplateContext};
use cmdrun::{CommandExecutor, CommandOutput, SearchPath};
use std::path::PathBuf;

/// Component used when a repository request names none.
pub const DEFAULT_COMPONENT: &str = "main";

// ============================================================================
// Requests and reports
// ============================================================================

/// A third-party repository to add or remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositorySpec {
    /// Repository name; becomes `{{Name}}` and usually a file name.
    pub name: String,
    /// Repository URL (`{{URL}}`).
    pub url: Option<String>,
    /// Signing key URL (`{{KeyURL}}`).
    pub key_url: Option<String>,
    /// Release channel (`{{Channel}}`); defaults to the host codename.
    pub channel: Option<String>,
    /// Component (`{{Component}}`); defaults to [`DEFAULT_COMPONENT`].
    pub component: Option<String>,
    /// Architecture override (`{{Arch}}`); defaults to the provider's name
    /// for the host architecture.
    pub arch: Option<String>,
}

impl RepositorySpec {
    /// A request for `name` with everything else defaulted.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the repository URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the signing key URL.
    #[must_use]
    pub fn key_url(mut self, key_url: impl Into<String>) -> Self {
        self.key_url = Some(key_url.into());
        self
    }

    /// Set the release channel.
    #[must_use]
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Set the component.
    #[must_use]
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Override the architecture.
    #[must_use]
    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    fn check(&self) -> Result<()> {
        let invalid = |message: &str| Error::InvalidRepository {
            name: self.name.clone(),
            message: message.to_string(),
        };
        if self.name.is_empty() {
            return Err(invalid("name is required"));
        }
        if self.name.starts_with('.')
            || self
                .name
                .chars()
                .any(|c| c.is_whitespace() || c == '/' || c == '\\')
        {
            return Err(invalid("name must be a plain file name"));
        }
        Ok(())
    }
}

/// What [`Provisioner::setup`] or [`Provisioner::teardown`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    /// Already in the requested state; nothing ran.
    Unchanged,
    /// The provider's own step sequence ran.
    Steps(ExecuteSummary),
    /// The provider's package was installed or removed through another
    /// manager.
    Package {
        /// Manager used.
        manager: String,
        /// Package name.
        package: String,
    },
}

/// Per-item results of a batch operation.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Items that succeeded, in order.
    pub succeeded: Vec<String>,
    /// Items that failed, with their errors, in order.
    pub failed: Vec<(String, Error)>,
}

impl BatchReport {
    /// Whether every item succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record<T>(&mut self, item: &str, result: Result<T>) {
        match result {
            Ok(_) => self.succeeded.push(item.to_string()),
            Err(e) => {
                log::warn!("{item}: {e}");
                self.failed.push((item.to_string(), e));
            }
        }
    }
}

// ============================================================================
// Provisioner
// ============================================================================

/// Runs provisioning operations against one detected host.
pub struct Provisioner<'a> {
    registry: &'a Registry,
    os_info: &'a OsInfo,
    search_path: &'a SearchPath,
    executor: &'a dyn CommandExecutor,
    fetcher: &'a dyn Fetcher,
    dry_run: bool,
    temp_dir: PathBuf,
}

impl<'a> Provisioner<'a> {
    /// Create a provisioner. Dry-run is off.
    pub fn new(
        registry: &'a Registry,
        os_info: &'a OsInfo,
        search_path: &'a SearchPath,
        executor: &'a dyn CommandExecutor,
        fetcher: &'a dyn Fetcher,
    ) -> Self {
        Self {
            registry,
            os_info,
            search_path,
            executor,
            fetcher,
            dry_run: false,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Log commands and steps instead of running them.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Directory for downloaded keys (`{{TempKeyPath}}`).
    #[must_use]
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    fn definition(&self, name: &str) -> Result<&'a Provider> {
        self.registry
            .get(name)
            .ok_or_else(|| Error::UnknownProvider(name.to_string()))
    }

    fn detector(&self) -> Detector<'a> {
        Detector::new(&self.os_info.identity, self.search_path)
    }

    /// Resolve a package manager: `name`, or the default when `None`.
    ///
    /// A registered provider that detection missed earlier is checked again,
    /// so a manager installed during this run is usable.
    pub fn manager(&self, name: Option<&str>) -> Result<PackageManagerInfo> {
        let Some(name) = name else {
            return self
                .os_info
                .default_manager()
                .cloned()
                .ok_or(Error::NoDefault);
        };

        if let Some(info) = self.os_info.manager(name) {
            return Ok(info.clone());
        }
        let provider = self.definition(name)?;
        let binary = self
            .detector()
            .check(provider)
            .map_err(|reason| Error::NotAvailable {
                name: name.to_string(),
                reason,
            })?;

        log::debug!("provider '{name}' became available at {}", binary.display());
        let mut found = provider.clone();
        found.binary_path = Some(binary);
        found.to_manager_info().ok_or_else(|| Error::UnknownProvider(name.to_string()))
    }

    fn run(
        &self,
        info: &PackageManagerInfo,
        kind: CommandKind,
        extra: &[String],
        capture: bool,
    ) -> Result<CommandOutput> {
        let spec = info
            .command(kind, extra)
            .ok_or_else(|| Error::Unsupported {
                name: info.name.clone(),
                operation: kind.to_string(),
            })?
            .capture(capture);

        if self.dry_run {
            log::info!("[dry-run] {}", spec.display());
            return Ok(CommandOutput::default());
        }
        log::info!("{} {kind}: {}", info.name, spec.display());
        Ok(self.executor.execute(&spec)?)
    }

    fn exec_context(&self, provider: &Provider) -> ExecContext<'a> {
        ExecContext::new(self.executor, self.fetcher)
            .env(provider.environment.clone())
            .dry_run(self.dry_run)
    }

    // ------------------------------------------------------------------------
    // Packages
    // ------------------------------------------------------------------------

    /// Install packages in one command. An empty list does nothing.
    pub fn install_packages(&self, manager: Option<&str>, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            log::debug!("no packages to install");
            return Ok(());
        }
        let info = self.manager(manager)?;
        self.run(&info, CommandKind::Install, packages, false)?;
        Ok(())
    }

    /// Remove packages in one command. An empty list does nothing.
    pub fn remove_packages(&self, manager: Option<&str>, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            log::debug!("no packages to remove");
            return Ok(());
        }
        let info = self.manager(manager)?;
        self.run(&info, CommandKind::Remove, packages, false)?;
        Ok(())
    }

    /// Install each package with its own command, continuing past failures.
    ///
    /// Fails only when the manager itself cannot be resolved.
    pub fn install_packages_isolated(
        &self,
        manager: Option<&str>,
        packages: &[String],
    ) -> Result<BatchReport> {
        let info = self.manager(manager)?;
        let mut report = BatchReport::default();
        for package in packages {
            let result = self.run(&info, CommandKind::Install, std::slice::from_ref(package), false);
            report.record(package, result);
        }
        Ok(report)
    }

    /// Refresh package metadata.
    pub fn update(&self, manager: Option<&str>) -> Result<()> {
        let info = self.manager(manager)?;
        self.run(&info, CommandKind::Update, &[], false)?;
        Ok(())
    }

    /// Clean package caches.
    pub fn clean(&self, manager: Option<&str>) -> Result<()> {
        let info = self.manager(manager)?;
        self.run(&info, CommandKind::Clean, &[], false)?;
        Ok(())
    }

    /// Search available packages; returns the manager's output.
    pub fn search(&self, manager: Option<&str>, query: &str) -> Result<String> {
        let info = self.manager(manager)?;
        let out = self.run(&info, CommandKind::Search, &[query.to_string()], true)?;
        Ok(out.stdout)
    }

    /// List installed packages; returns the manager's output.
    pub fn list(&self, manager: Option<&str>) -> Result<String> {
        let info = self.manager(manager)?;
        let out = self.run(&info, CommandKind::List, &[], true)?;
        Ok(out.stdout)
    }

    /// Core packages of `groups` for this host, without installing.
    ///
    /// An empty `groups` means every group. Duplicates are dropped.
    pub fn core_packages(&self, manager: Option<&str>, groups: &[String]) -> Result<Vec<String>> {
        let info = self.manager(manager)?;
        let provider = self.definition(&info.name)?;
        let identity = &self.os_info.identity;
        let available = provider.core_packages_for(&identity.distro, &identity.resolver());

        let selected: Vec<&String> = if groups.is_empty() {
            available.keys().collect()
        } else {
            groups.iter().collect()
        };

        let mut packages: Vec<String> = Vec::new();
        for group in selected {
            let members = available.get(group).ok_or_else(|| Error::Unsupported {
                name: provider.name.clone(),
                operation: format!("core package group '{group}'"),
            })?;
            for package in members {
                if !packages.contains(package) {
                    packages.push(package.clone());
                }
            }
        }
        Ok(packages)
    }

    /// Install the core packages of `groups`; returns what was installed.
    pub fn install_core(&self, manager: Option<&str>, groups: &[String]) -> Result<Vec<String>> {
        let packages = self.core_packages(manager, groups)?;
        self.install_packages(manager, &packages)?;
        Ok(packages)
    }

    // ------------------------------------------------------------------------
    // Package managers
    // ------------------------------------------------------------------------

    fn is_installed(&self, provider: &Provider) -> bool {
        self.os_info.is_available(&provider.name) || self.detector().check(provider).is_ok()
    }

    /// The manager to install `excluded`'s own package with.
    fn host_manager(&self, excluded: &str) -> Result<PackageManagerInfo> {
        let names: Vec<&str> = self
            .os_info
            .managers
            .keys()
            .map(String::as_str)
            .filter(|name| *name != excluded)
            .collect();
        let name = select_default(&names, &self.os_info.identity).ok_or(Error::NoDefault)?;
        self.manager(Some(&name))
    }

    fn provider_context(&self, provider: &Provider) -> TemplateContext {
        TemplateContext::builder()
            .name(provider.name.as_str())
            .arch(provider.arch_name(&self.os_info.identity.arch))
            .build()
    }

    fn apply_lifecycle<P: ProgressCallback>(
        &self,
        provider: &Provider,
        steps: &[ActionStep],
        kind: CommandKind,
        progress: &mut P,
    ) -> Result<SetupOutcome> {
        if !steps.is_empty() {
            let summary = actions::execute_with_progress(
                steps,
                &self.provider_context(provider),
                &self.exec_context(provider),
                progress,
            )?;
            return Ok(SetupOutcome::Steps(summary));
        }

        let Some(package) = &provider.package else {
            let operation = if kind == CommandKind::Install { "setup" } else { "teardown" };
            return Err(Error::Unsupported {
                name: provider.name.clone(),
                operation: operation.to_string(),
            });
        };
        let info = self.host_manager(&provider.name)?;
        log::info!("{kind} '{package}' with {} for {}", info.name, provider.name);
        self.run(&info, kind, std::slice::from_ref(package), false)?;
        Ok(SetupOutcome::Package {
            manager: info.name,
            package: package.clone(),
        })
    }

    /// Install a package manager.
    ///
    /// Runs its install steps, or installs its package through another
    /// available manager. Does nothing when it is already available.
    pub fn setup<P: ProgressCallback>(&self, name: &str, progress: &mut P) -> Result<SetupOutcome> {
        let provider = self.definition(name)?;
        self.detector()
            .check_compatible(provider)
            .map_err(|reason| Error::NotAvailable {
                name: name.to_string(),
                reason,
            })?;

        if self.is_installed(provider) {
            log::info!("{name} is already available");
            return Ok(SetupOutcome::Unchanged);
        }
        self.apply_lifecycle(provider, &provider.install.steps, CommandKind::Install, progress)
    }

    /// Remove a package manager. Does nothing when it is not installed.
    pub fn teardown<P: ProgressCallback>(
        &self,
        name: &str,
        progress: &mut P,
    ) -> Result<SetupOutcome> {
        let provider = self.definition(name)?;
        if !self.is_installed(provider) {
            log::info!("{name} is not installed");
            return Ok(SetupOutcome::Unchanged);
        }
        self.apply_lifecycle(provider, &provider.remove.steps, CommandKind::Remove, progress)
    }

    /// Set up several package managers independently.
    pub fn setup_each<P: ProgressCallback>(&self, names: &[String], progress: &mut P) -> BatchReport {
        let mut report = BatchReport::default();
        for name in names {
            let result = self.setup(name, progress);
            report.record(name, result);
        }
        report
    }

    // ------------------------------------------------------------------------
    // Repositories
    // ------------------------------------------------------------------------

    /// Template context for a repository operation.
    ///
    /// Path templates are rendered first, then exposed as `{{SourcesPath}}`
    /// and `{{KeyPath}}`.
    fn repository_context(
        &self,
        provider: &Provider,
        repo: &Repository,
        spec: &RepositorySpec,
    ) -> Result<TemplateContext> {
        let identity = &self.os_info.identity;
        let arch = spec
            .arch
            .as_deref()
            .unwrap_or_else(|| provider.arch_name(&identity.arch));
        let temp_key = self.temp_dir.join(format!("outfit-{}.key", spec.name));

        let mut builder = TemplateContext::builder()
            .name(spec.name.as_str())
            .arch(arch)
            .component(spec.component.as_deref().unwrap_or(DEFAULT_COMPONENT))
            .temp_key_path(temp_key.to_string_lossy());
        if let Some(url) = &spec.url {
            builder = builder.url(url.as_str());
        }
        if let Some(key_url) = &spec.key_url {
            builder = builder.key_url(key_url.as_str());
        }
        if let Some(channel) = spec.channel.as_ref().or(identity.codename.as_ref()) {
            builder = builder.channel(channel.as_str());
        }

        let base = builder.clone().build();
        let render = |template: &str| base.render(template).map_err(actions::Error::from);
        if let Some(sources) = &repo.paths.sources {
            builder = builder.sources_path(render(sources)?);
        }
        if let Some(keys) = &repo.paths.keys {
            builder = builder.key_path(render(keys)?);
        }
        Ok(builder.build())
    }

    fn mutate_repository<P: ProgressCallback>(
        &self,
        manager: Option<&str>,
        spec: &RepositorySpec,
        adding: bool,
        progress: &mut P,
    ) -> Result<ExecuteSummary> {
        spec.check()?;
        let info = self.manager(manager)?;
        let provider = self.definition(&info.name)?;
        let verb = if adding { "add" } else { "remove" };
        let unsupported = || Error::Unsupported {
            name: provider.name.clone(),
            operation: format!("{verb} repository"),
        };

        let repo = provider.repository.as_ref().ok_or_else(unsupported)?;
        let steps = if adding { &repo.add.steps } else { &repo.remove.steps };
        if steps.is_empty() {
            return Err(unsupported());
        }

        let template = self.repository_context(provider, repo, spec)?;
        log::info!("{verb} repository '{}' via {}: {template}", spec.name, provider.name);
        let ctx = self.exec_context(provider).elevated(true);
        Ok(actions::execute_with_progress(steps, &template, &ctx, progress)?)
    }

    /// Add a repository through `manager` (or the default).
    ///
    /// Repository steps always run elevated.
    pub fn add_repository<P: ProgressCallback>(
        &self,
        manager: Option<&str>,
        spec: &RepositorySpec,
        progress: &mut P,
    ) -> Result<ExecuteSummary> {
        self.mutate_repository(manager, spec, true, progress)
    }

    /// Remove a repository through `manager` (or the default).
    pub fn remove_repository<P: ProgressCallback>(
        &self,
        manager: Option<&str>,
        spec: &RepositorySpec,
        progress: &mut P,
    ) -> Result<ExecuteSummary> {
        self.mutate_repository(manager, spec, false, progress)
    }
}
