use crate::context::AppContext;
use crate::ui;
use ::providers::{DetectionMiss, Detector};
use anyhow::{Context, Result};
use colored::Colorize;

pub fn list(ctx: &AppContext, all: bool) -> Result<()> {
    let detector = Detector::new(&ctx.os_info.identity, ctx.runner.search_path());

    ui::header("Providers");
    let mut hidden = 0;
    for provider in ctx.registry.iter() {
        let status = match detector.check(provider) {
            Ok(_) => "available".green(),
            Err(DetectionMiss::Incompatible { .. }) if !all => {
                hidden += 1;
                continue;
            }
            Err(DetectionMiss::Incompatible { .. }) => "other system".dimmed(),
            Err(miss) => format!("missing: {miss}").yellow(),
        };
        let default = if ctx.os_info.default.as_deref() == Some(provider.name.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("  {:<10} {status}{}", provider.name.bold(), default.green());
        if let Some(description) = &provider.description {
            ui::dim(&format!("  {description}"));
        }
    }

    if hidden > 0 {
        println!();
        ui::dim(&format!("{hidden} providers for other systems hidden (use --all)"));
    }
    ui::dim(&format!(
        "Custom definitions: {}",
        ctx.config_dir.join("providers").display()
    ));
    Ok(())
}

pub fn show(ctx: &AppContext, name: &str) -> Result<()> {
    let provider = ctx
        .registry
        .get(name)
        .with_context(|| format!("Unknown provider '{name}'"))?;
    let detector = Detector::new(&ctx.os_info.identity, ctx.runner.search_path());

    ui::header(&provider.name);
    if let Some(description) = &provider.description {
        ui::kv("description", description);
    }
    ui::kv("binary", &provider.detection.binary);
    ui::kv("systems", &ui::list_or(&provider.detection.distributions, "any"));
    ui::kv("elevated", if provider.elevated { "yes" } else { "no" });
    match detector.check(provider) {
        Ok(path) => ui::kv("status", &format!("available at {}", path.display())),
        Err(miss) => ui::kv("status", &miss.to_string()),
    }

    ui::section("Definition");
    let definition = toml::to_string_pretty(provider).context("Failed to render definition")?;
    for line in definition.lines() {
        println!("  {line}");
    }
    Ok(())
}
