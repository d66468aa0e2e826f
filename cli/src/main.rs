//! uwsgiconf: compile TOML project files into uWSGI INI configuration.
//!
//! Two subcommands:
//! - `uwsgiconf compile`: build the project and print (or write) the INI document
//! - `uwsgiconf groups`: list option groups usable as per-section parameter tables

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uwsgiconf::{available_groups, ProjectConfig};

/// uwsgiconf: compile TOML project files into uWSGI INI configuration.
#[derive(Parser)]
#[command(
    name = "uwsgiconf",
    version,
    about = "Compile TOML project files into uWSGI INI configuration"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project and print the INI document to stdout
    Compile {
        /// Path to uwsgiconf.toml [default: ./uwsgiconf.toml or ~/.config/uwsgiconf/uwsgiconf.toml]
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the INI document to this file instead of stdout
        #[arg(short, long, conflicts_with = "tofile")]
        output: Option<PathBuf>,
        /// Write the INI document to a new temporary file and print its path
        #[arg(long)]
        tofile: bool,
    },
    /// List option groups usable as per-section parameter tables
    Groups,
}

fn main() -> Result<()> {
    // Initialize tracing with env filter (RUST_LOG controls verbosity)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            config,
            output,
            tofile,
        } => {
            let config = resolve_config(config)?;
            run_compile(&config, output.as_deref(), tofile)?;
        }
        Commands::Groups => {
            for id in available_groups() {
                println!("{}", id);
            }
        }
    }

    Ok(())
}

/// Build the project at `config_path` and emit the result.
///
/// Prints to stdout unless `output` or `tofile` asks for a file, in which case
/// the written path is printed instead.
fn run_compile(config_path: &Path, output: Option<&Path>, tofile: bool) -> Result<()> {
    let project = load_config(config_path)?;
    let configuration = project
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build configuration from {:?}: {}", config_path, e))?;

    tracing::debug!(
        config = %config_path.display(),
        sections = configuration.entries().len(),
        "project built"
    );

    if output.is_some() || tofile {
        let written = configuration
            .tofile(output)
            .map_err(|e| anyhow::anyhow!("Failed to write configuration: {}", e))?;
        println!("{}", written.display());
    } else {
        configuration
            .print_ini()
            .map_err(|e| anyhow::anyhow!("Failed to print configuration: {}", e))?;
    }

    Ok(())
}

/// Resolve config file path: explicit flag → ./uwsgiconf.toml → ~/.config/uwsgiconf/uwsgiconf.toml.
fn resolve_config(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let local = Path::new("uwsgiconf.toml");
    if local.exists() {
        return Ok(local.to_path_buf());
    }

    if let Some(config_dir) = dirs::config_dir() {
        let xdg = config_dir.join("uwsgiconf").join("uwsgiconf.toml");
        if xdg.exists() {
            return Ok(xdg);
        }
    }

    Err(anyhow::anyhow!(
        "No uwsgiconf.toml found. Searched ./uwsgiconf.toml and ~/.config/uwsgiconf/uwsgiconf.toml. \
         Use --config to specify a path."
    ))
}

/// Load and parse a uwsgiconf.toml project file.
fn load_config(config_path: &Path) -> Result<ProjectConfig> {
    ProjectConfig::load(config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load config file {:?}: {}", config_path, e))
}
