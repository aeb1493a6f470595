use anyhow::Result;
use clap::{Parser, Subcommand};
use stackcheck::commands::{
    check_command, describe_command, init_suite_command, ranges_command, RangeSource,
};

/// Call-stack verification CLI.
///
/// This CLI is a thin wrapper around `stackcheck-core` (exposed in code as
/// `stackcheck_core`). Validation logic lives in the library; the commands
/// here load ranges, suites and captures from disk and print results.
#[derive(Parser, Debug)]
#[command(
    name = "stackcheck",
    version,
    about = "Validate instrumentation-captured call stacks against expected call chains",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the caller and target ranges the registry is built from.
    Ranges {
        #[command(flatten)]
        source: RangeSource,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Label each address of a captured stack with the range it falls in.
    Describe {
        #[command(flatten)]
        source: RangeSource,

        /// Captured addresses, most recent first (e.g. `0x401010,0x401200`).
        #[arg(long)]
        addresses: String,

        /// Reported capture length in bytes. Defaults to the full list.
        #[arg(long, allow_hyphen_values = true)]
        len: Option<i64>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Validate per-probe captures against a scenario suite.
    ///
    /// Exits non-zero when any probe fails or has no capture.
    Check {
        #[command(flatten)]
        source: RangeSource,

        /// Captures file (YAML/JSON) with one entry per fired probe.
        #[arg(long)]
        captures: String,

        /// Suite file (YAML/JSON). Defaults to the built-in uretprobe_stack suite.
        #[arg(long)]
        suite: Option<String>,

        /// Print the range table and a labelled dump of every capture.
        #[arg(long, short, default_value_t = false)]
        verbose: bool,

        /// Emit the report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Write the built-in uretprobe_stack suite to a file for editing.
    InitSuite {
        /// Output path; `.json` writes JSON, anything else YAML.
        #[arg(long, default_value = "uretprobe_stack.yaml")]
        out: String,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Ranges { source, json } => ranges_command(&source, json)?,
        Command::Describe { source, addresses, len, json } => {
            describe_command(&source, &addresses, len, json)?
        }
        Command::Check { source, captures, suite, verbose, json } => {
            check_command(&source, suite.as_deref(), &captures, verbose, json)?
        }
        Command::InitSuite { out, force } => init_suite_command(&out, force)?,
    }

    Ok(())
}
