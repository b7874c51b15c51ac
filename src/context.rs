use crate::cli::Cli;
use crate::config::Settings;
use crate::paths;
use actions::HttpFetcher;
use anyhow::{Context, Result};
use cmdrun::Runner;
use providers::{LoadOptions, OsInfo, Provisioner, Registry, SystemIdentity};
use std::path::PathBuf;

/// Everything a command needs, built once per run.
pub struct AppContext {
    pub quiet: bool,
    pub dry_run: bool,
    pub yes: bool,
    pub config_dir: PathBuf,
    pub runner: Runner,
    pub registry: Registry,
    pub os_info: OsInfo,
    pub fetcher: HttpFetcher,
}

impl AppContext {
    /// Load settings and providers, then detect this system.
    pub fn new(cli: &Cli) -> Result<Self> {
        let config_dir = paths::config_dir()?;
        let mut settings = Settings::load(&config_dir)?;
        settings.debug |= cli.debug;
        settings.interactive |= cli.interactive;

        let runner = Runner::new(settings.run_settings()?);

        let mut registry = Registry::new();
        registry
            .initialize(&LoadOptions::standard(
                Some(&config_dir),
                &settings.provider_dirs(),
            ))
            .context("Failed to load provider definitions")?;

        let identity = SystemIdentity::current_with(&runner);
        let os_info = OsInfo::detect(&registry, identity, runner.search_path());

        let fetcher = settings
            .download_timeout()
            .map_or_else(HttpFetcher::new, HttpFetcher::with_timeout);

        Ok(Self {
            quiet: cli.quiet,
            dry_run: cli.dry_run,
            yes: cli.yes,
            config_dir,
            runner,
            registry,
            os_info,
            fetcher,
        })
    }

    /// A provisioner over this run's registry and detection result.
    pub fn provisioner(&self) -> Provisioner<'_> {
        Provisioner::new(
            &self.registry,
            &self.os_info,
            self.runner.search_path(),
            &self.runner,
            &self.fetcher,
        )
        .dry_run(self.dry_run)
    }

    /// Ask before changing the system. `--yes` and `--dry-run` skip the prompt.
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.yes || self.dry_run {
            return Ok(true);
        }
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .context("Failed to read confirmation")
    }
}
