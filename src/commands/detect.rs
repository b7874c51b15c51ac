use crate::context::AppContext;
use crate::ui;
use anyhow::{Context, Result};
use colored::Colorize;

pub fn run(ctx: &AppContext, json: bool) -> Result<()> {
    let info = &ctx.os_info;

    if json {
        let out = serde_json::to_string_pretty(info).context("Failed to serialize detection result")?;
        println!("{out}");
        return Ok(());
    }

    let id = &info.identity;
    ui::header("System");
    ui::kv("os", &id.os);
    ui::kv("distro", &id.distro);
    ui::kv("family", &id.family);
    if let Some(version) = &id.version {
        ui::kv("version", version);
    }
    if let Some(codename) = &id.codename {
        ui::kv("codename", codename);
    }
    ui::kv("arch", &id.arch);

    ui::section("Package managers");
    if info.managers.is_empty() {
        ui::warn("No package managers detected");
        ui::dim("Run 'outfit providers list' to see what this system supports");
        return Ok(());
    }

    for (name, manager) in &info.managers {
        let marker = if info.default.as_deref() == Some(name.as_str()) {
            "*".green().bold()
        } else {
            " ".normal()
        };
        let elevated = if manager.elevated { " (elevated)" } else { "" };
        println!(
            "  {marker} {:<10} {}{}",
            name.bold(),
            manager.binary.display().to_string().dimmed(),
            elevated.yellow()
        );
    }
    println!();
    ui::dim("* default");
    Ok(())
}
