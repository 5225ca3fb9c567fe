//! # dlwrap CLI
//!
//! Generates a C interposition shim from a list of function prototypes.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dlwrap_config::logging::init_logging;
use dlwrap_config::{log_cli_debug, log_cli_error, Config, InitGuard, LogLevel};
use dlwrap_gen::{read_input, write_output, GenError, Generator};

mod config_cmd;

use config_cmd::ConfigCommands;

/// Output path meaning "write to stdout"
const STDOUT_PATH: &str = "-";

/// dlwrap - generate dlsym / DYLD_INTERPOSE wrappers for C functions
#[derive(Parser)]
#[command(name = "dlwrap")]
#[command(version, about, long_about = None)]
#[command(subcommand_negates_reqs = true, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Header-like file with one prototype per line
    #[arg(value_name = "INPUT", required = true)]
    input: Option<PathBuf>,

    /// Generated C file (`-` for stdout)
    #[arg(value_name = "OUTPUT", required = true)]
    output: Option<PathBuf>,

    /// Use this config file instead of ~/.dlwrap and .dlwrap
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Extra allocation primitive to route to __libc_<NAME> (repeatable)
    #[arg(long = "alloc", value_name = "NAME")]
    alloc: Vec<String>,

    /// Initialization guard for the Linux section: flag or once
    #[arg(long, value_name = "GUARD")]
    init_guard: Option<InitGuard>,

    /// Fail if any declaration-like line is skipped
    #[arg(long)]
    deny_skipped: bool,

    /// Print a JSON summary of the run
    #[arg(long)]
    summary: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

impl Cli {
    /// Command-line flags override every config layer
    fn apply_overrides(&self, config: &mut Config) {
        for name in &self.alloc {
            if !config.generator.allocation_primitives.contains(name) {
                config.generator.allocation_primitives.push(name.clone());
            }
        }
        if let Some(guard) = self.init_guard {
            config.generator.init_guard = guard;
        }
        if self.deny_skipped {
            config.diagnostics.deny_skipped = true;
        }
    }
}

fn main() -> Result<()> {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };
    cli.apply_overrides(&mut config);

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        config.diagnostics.log_level
    };
    init_logging(level);

    match cli.command {
        Some(Commands::Config { action }) => config_cmd::run(&config, action),
        None => {
            // clap enforces both positionals when no subcommand is given
            let input = cli.input.as_deref().context("missing INPUT")?;
            let output = cli.output.as_deref().context("missing OUTPUT")?;
            generate(&config, input, output, cli.summary)
        }
    }
}

fn generate(config: &Config, input: &Path, output: &Path, summary: bool) -> Result<()> {
    log_cli_debug!(
        "Generating shim",
        input = tracing::field::display(input.display()),
        output = tracing::field::display(output.display()),
        guard = tracing::field::display(config.generator.init_guard),
    );

    let generator = Generator::from_config(config);
    let source = read_input(input)?;
    let generated = match generator.generate(&source) {
        Ok(generated) => generated,
        Err(err @ GenError::SkippedLines { .. }) => {
            log_cli_error!("Refusing to write a partial shim", input = tracing::field::display(input.display()));
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    let to_stdout = output == Path::new(STDOUT_PATH);
    if to_stdout {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(generated.source().as_bytes())
            .context("Failed to write shim to stdout")?;
        stdout.flush()?;
    } else {
        write_output(output, &generated.source())?;
    }

    if summary {
        let json = serde_json::to_string_pretty(&generated.summary())?;
        if to_stdout {
            eprintln!("{json}");
        } else {
            println!("{json}");
        }
    }
    Ok(())
}
