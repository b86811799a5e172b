use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "guacform")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative provisioning for Apache Guacamole", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (defaults to ~/.config/guacform/config.toml)
    #[arg(short, long, global = true, env = "GUACFORM_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what a template would change, without changing anything
    Plan(TemplateArgs),

    /// Converge the server onto a template
    Apply(ApplyArgs),

    /// Remove everything a template declares
    Destroy(ApplyArgs),

    /// Show what is currently on the server
    Status {
        /// Only show these top-level groups
        groups: Vec<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TemplateArgs {
    /// Template file (.toml or .json)
    pub template: String,

    /// Discovered addresses per stack (.toml or .json)
    #[arg(short, long)]
    pub addresses: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub template: TemplateArgs,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Pause after every write call, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,
}
