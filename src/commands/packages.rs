use crate::cli::PackagesCommand;
use crate::commands::report_batch;
use crate::context::AppContext;
use crate::ui;
use anyhow::{Context, Result};

pub fn run(ctx: &AppContext, cmd: PackagesCommand) -> Result<()> {
    let provisioner = ctx.provisioner();

    match cmd {
        PackagesCommand::Install {
            packages,
            isolated,
            manager,
        } => {
            let manager = manager.manager.as_deref();
            if isolated {
                let report = provisioner.install_packages_isolated(manager, &packages)?;
                return report_batch(&report, "packages");
            }
            provisioner
                .install_packages(manager, &packages)
                .with_context(|| format!("Failed to install {}", packages.join(" ")))?;
            ui::success(&format!("Installed {}", packages.join(", ")));
        }
        PackagesCommand::Remove { packages, manager } => {
            if !ctx.confirm(&format!("Remove {}?", packages.join(", ")), false)? {
                ui::warn("Cancelled");
                return Ok(());
            }
            provisioner
                .remove_packages(manager.manager.as_deref(), &packages)
                .with_context(|| format!("Failed to remove {}", packages.join(" ")))?;
            ui::success(&format!("Removed {}", packages.join(", ")));
        }
        PackagesCommand::Search { query, manager } => {
            let out = provisioner.search(manager.manager.as_deref(), &query)?;
            print!("{out}");
        }
        PackagesCommand::List { manager } => {
            let out = provisioner.list(manager.manager.as_deref())?;
            print!("{out}");
        }
        PackagesCommand::Update { manager } => {
            provisioner
                .update(manager.manager.as_deref())
                .context("Failed to refresh package metadata")?;
            ui::success("Package metadata refreshed");
        }
        PackagesCommand::Clean { manager } => {
            provisioner
                .clean(manager.manager.as_deref())
                .context("Failed to clean package caches")?;
            ui::success("Package caches cleaned");
        }
        PackagesCommand::Core {
            groups,
            show,
            manager,
        } => {
            let manager = manager.manager.as_deref();
            if show {
                for package in provisioner.core_packages(manager, &groups)? {
                    println!("{package}");
                }
                return Ok(());
            }
            let installed = provisioner
                .install_core(manager, &groups)
                .context("Failed to install core packages")?;
            if installed.is_empty() {
                ui::info("No core packages defined for this system");
            } else {
                ui::success(&format!("Installed {} core packages", installed.len()));
            }
        }
    }
    Ok(())
}
