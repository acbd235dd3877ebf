use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::models::GenerationMode;

#[derive(Parser, Debug)]
#[command(name = "archgen")]
#[command(about = "Generate architecture diagrams from natural-language descriptions")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ./archgen.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding generated diagrams
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask the model for a diagram and render it
    Generate(GenerateArgs),

    /// Render an existing diagrams script
    Render {
        /// Python script using the diagrams library
        script: PathBuf,

        /// Output name (file stem inside the output directory)
        #[arg(long)]
        name: Option<String>,

        /// Replace an existing diagram with the same name
        #[arg(long)]
        overwrite: bool,

        /// Execution limit in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        #[arg(long)]
        json: bool,
    },

    /// List generated diagrams
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show a diagram's metadata and generated code
    Show {
        name: String,

        #[arg(long)]
        json: bool,
    },

    /// Copy a diagram out of the output directory
    Export {
        name: String,

        /// Destination file or directory
        #[arg(default_value = "architecture_diagram.png")]
        dest: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Delete every generated diagram
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        force: bool,

        #[arg(long)]
        json: bool,
    },

    /// Browse the built-in architecture templates
    #[command(subcommand)]
    Templates(TemplateCommands),

    /// Print the effective configuration
    Config {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// What the architecture should contain
    pub description: Option<String>,

    /// Architecture type (cloud, microservices, serverless, data, ml, event-driven, devops, network)
    #[arg(long = "type", value_name = "TYPE")]
    pub architecture_type: Option<String>,

    /// Cloud provider (AWS, GCP, Azure, Generic)
    #[arg(long)]
    pub provider: Option<String>,

    /// Specific components to include
    #[arg(long)]
    pub components: Option<String>,

    /// Start from a built-in template; explicit flags take precedence
    #[arg(long)]
    pub template: Option<String>,

    /// Output name (defaults to diagram-<id>)
    #[arg(long)]
    pub name: Option<String>,

    /// Replace an existing diagram with the same name
    #[arg(long)]
    pub overwrite: bool,

    #[arg(long, value_enum, default_value_t)]
    pub mode: GenerationMode,

    /// Execution limit in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// List template names
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show one template
    Show {
        name: String,

        #[arg(long)]
        json: bool,
    },
}
