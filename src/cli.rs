use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "class-bytes")]
#[command(about = "Look up compiled class bytes on a classpath by source name")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Classpath list using the platform separator (`:` on Unix, `;` on Windows)
    #[arg(long, visible_alias = "cp", value_name = "LIST")]
    pub classpath: Option<OsString>,

    /// Extra classpath entry appended after `--classpath`
    #[arg(long = "entry", value_name = "PATH")]
    pub entries: Vec<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Look up one class by source name
    Find {
        source_name: String,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Enumerate every class on the classpath
    List {
        #[arg(short = 'f', long, value_enum, default_value_t = ListFormat::Text)]
        format: ListFormat,

        /// Load every class and report its size and hash
        #[arg(long)]
        with_size: bool,
    },
    /// Print the class file paths tried for a source name
    Candidates { source_name: String },
    /// Print the classpath locations and how they were classified
    Locations,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
    Raw,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Json,
    Text,
}
