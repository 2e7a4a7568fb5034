//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{Schema, Variant};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::tree_traits::TreeNodeConvert;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|e| InfraError::io("current directory", e))?,
    };

    match &cli.command {
        Some(Commands::Build {
            recipe,
            output,
            variant,
            outline,
        }) => {
            let container = ServiceContainer::new(Settings::load(Some(&project_dir))?);
            cmd_build(&container, recipe, output.as_deref(), *variant, *outline)
        }
        Some(Commands::Schema { variant }) => {
            let variant = match variant {
                Some(v) => *v,
                None => Settings::load(Some(&project_dir))?.variant,
            };
            cmd_schema(variant)
        }
        Some(Commands::Config { command }) => cmd_config(command, &project_dir),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see `g2tree --help`".to_string(),
        )),
    }
}

#[instrument(level = "debug", skip(container))]
fn cmd_build(
    container: &ServiceContainer,
    recipe: &Path,
    out_path: Option<&Path>,
    variant: Option<Variant>,
    outline: bool,
) -> CliResult<()> {
    let service = container.document_service();
    let report = service.build_file(recipe, variant).inspect_err(|e| {
        if let ApplicationError::Step { index, source } = e {
            debug!("step {} rejected with outcome {}", index, source.outcome());
        }
    })?;

    let rendered = if outline {
        report.builder.tree().to_tree_string().to_string()
    } else {
        container
            .xml_writer()
            .render(report.builder.tree(), report.builder.bindings())?
    };

    match out_path {
        Some(path) => {
            service.write_output(path, &rendered)?;
            output::success(&format!(
                "{} ({} steps) -> {}",
                report.builder.schema().root_name(),
                report.steps,
                path.display()
            ));
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn cmd_schema(variant: Variant) -> CliResult<()> {
    output::info(&Schema::for_variant(variant).to_tree_string());
    Ok(())
}

fn cmd_config(command: &ConfigCommands, project_dir: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(Some(project_dir))?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            let global = global_config_path();
            let local = local_config_path(project_dir);
            output::header("Config files");
            print_config_path("global", global.as_deref());
            print_config_path("local", Some(&local));
        }
        ConfigCommands::Init { global } => {
            let path: PathBuf = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                local_config_path(project_dir)
            };
            if path.exists() {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
            }
            std::fs::write(&path, Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::action("Created", &path.display());
        }
    }
    Ok(())
}

fn print_config_path(label: &str, path: Option<&Path>) {
    match path {
        Some(p) if p.exists() => output::success_detail(&format!("{}: {}", label, p.display())),
        Some(p) => output::failure(&format!("{}: {} (not found)", label, p.display())),
        None => output::failure(&format!("{}: unavailable", label)),
    }
}
