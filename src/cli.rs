// CLI definitions for toolbox — shared between the binary, build.rs, and the library.
//
// This module contains ONLY clap-derived types with no dependencies on
// the toolbox library internals. This allows build.rs to `include!()` this
// file for build-time man page and shell completion generation.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "toolbox")]
#[command(about = "Schema-driven toolbox - run image, text and URL tools from declarative descriptors")]
#[command(version)]
#[command(propagate_version = true)]
#[command(after_help = "Run '<command> --help' for detailed usage of any subcommand.\n\
    Run 'toolbox man [dir]' to generate man pages.\n\
    Run 'toolbox completions <shell>' to generate shell completions.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(short, long, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Directory of extra tool descriptors (overrides config and TOOLBOX_CONTENT_DIR)
    #[arg(long, global = true)]
    pub content_dir: Option<String>,

    /// Log verbosity: -v info, -vv debug, -vvv trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Form field values shared by `run` and `plugin`
#[derive(Args, Clone, Debug, Default)]
pub struct FormArgs {
    /// Field value as KEY=VALUE (repeatable)
    #[arg(short = 'i', long = "input", value_parser = parse_key_value)]
    pub inputs: Vec<(String, String)>,

    /// File field as KEY=PATH (repeatable)
    #[arg(short = 'f', long = "file", value_parser = parse_key_value)]
    pub files: Vec<(String, String)>,

    /// Write image/file outputs into this directory
    #[arg(long)]
    pub save_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available tools
    Tools,

    /// Show a tool's form: inputs, outputs and reverse mappings
    Describe {
        /// Tool id (e.g. 'url-encoder')
        id: String,
    },

    /// Fill a tool's form, run it and render the result
    Run {
        /// Tool id (e.g. 'text-counter')
        id: String,

        #[command(flatten)]
        form: FormArgs,

        /// Copy this output into its mapped input after the run
        #[arg(long)]
        use_output: Option<String>,

        /// Run again after --use-output
        #[arg(long, requires = "use_output")]
        rerun: bool,

        /// Override a field for the second run as KEY=VALUE (implies --rerun)
        #[arg(long, value_parser = parse_key_value, requires = "use_output")]
        rerun_with: Vec<(String, String)>,
    },

    /// Load an external plugin by source and run it
    Plugin {
        /// Plugin path or http(s) URL
        #[arg(long)]
        src: Option<String>,

        #[command(flatten)]
        form: FormArgs,
    },

    /// Validate descriptor files or directories
    Validate {
        /// Descriptor files or directories of *.json descriptors
        #[arg(required = true)]
        paths: Vec<String>,
    },

    // ==================== Meta ====================

    /// Generate man pages into a directory
    Man {
        /// Output directory for generated man pages
        #[arg(default_value = "man")]
        output_dir: String,
    },

    /// Generate shell completions and print to stdout
    Completions {
        /// Target shell (bash, zsh, fish, elvish, powershell)
        shell: clap_complete::Shell,
    },
}

/// Parse KEY=VALUE; the value may itself contain '='
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}
