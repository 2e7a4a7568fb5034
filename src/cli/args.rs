//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::domain::Variant;

/// Schema-ordered builder for NewsML-G2 style item documents
#[derive(Parser, Debug)]
#[command(name = "g2tree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Directory holding the local .g2tree.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a document from a recipe
    Build {
        /// Recipe file (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        recipe: PathBuf,
        /// Write XML here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
        /// Override the recipe's variant
        #[arg(long, value_parser = parse_variant)]
        variant: Option<Variant>,
        /// Print the element outline instead of XML
        #[arg(long)]
        outline: bool,
    },

    /// Show the sequence tables of a variant
    Schema {
        /// Variant name (default: configured variant)
        #[arg(value_parser = parse_variant)]
        variant: Option<Variant>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Show config file locations
    Path,
    /// Write a template config file
    Init {
        /// Write the global config instead of the local one
        #[arg(short, long)]
        global: bool,
    },
}

fn parse_variant(s: &str) -> Result<Variant, String> {
    s.parse().map_err(|e: crate::domain::DomainError| e.to_string())
}
