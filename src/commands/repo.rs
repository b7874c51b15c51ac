use crate::cli::RepoCommand;
use crate::context::AppContext;
use crate::progress::StepProgress;
use crate::ui;
use ::providers::RepositorySpec;
use anyhow::{Context, Result};

pub fn run(ctx: &AppContext, cmd: RepoCommand) -> Result<()> {
    let provisioner = ctx.provisioner();
    let mut progress = StepProgress::new(ctx.quiet);

    match cmd {
        RepoCommand::Add(args) => {
            let mut spec = RepositorySpec::new(args.name.as_str()).url(args.url.as_str());
            spec.key_url = args.key_url;
            spec.channel = args.channel;
            spec.component = args.component;
            spec.arch = args.arch;

            if !ctx.confirm(&format!("Add repository '{}' ({})?", spec.name, args.url), true)? {
                ui::warn("Cancelled");
                return Ok(());
            }
            provisioner
                .add_repository(args.manager.manager.as_deref(), &spec, &mut progress)
                .with_context(|| format!("Failed to add repository '{}'", spec.name))?;
            ui::success(&format!("Repository '{}' added", spec.name));
        }
        RepoCommand::Remove { name, manager } => {
            if !ctx.confirm(&format!("Remove repository '{name}'?"), false)? {
                ui::warn("Cancelled");
                return Ok(());
            }
            provisioner
                .remove_repository(
                    manager.manager.as_deref(),
                    &RepositorySpec::new(name.as_str()),
                    &mut progress,
                )
                .with_context(|| format!("Failed to remove repository '{name}'"))?;
            ui::success(&format!("Repository '{name}' removed"));
        }
    }
    Ok(())
}
