//! Beryl CLI.
//! Runs compiled `.emc` modules on the machine and disassembles them.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;

use beryl::code::Code;
use beryl::vm::Vm;

#[derive(Parser)]
#[command(
    name = "beryl",
    version,
    about = "The Beryl runtime",
    long_about = "beryl runs compiled bytecode modules (.emc) on the process machine."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory to resolve module names under (defaults to the current
    /// directory).
    #[arg(long, global = true)]
    base: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a compiled module
    Run {
        /// Module name, dotted (a.b resolves to a/b.emc)
        module: String,
        /// Worker thread count (defaults to the hardware thread count)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Disassemble a compiled module
    Dis {
        module: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let base = match cli.base {
        Some(base) => base,
        None => std::env::current_dir().context("cannot determine working directory")?,
    };

    match cli.command {
        Commands::Run { module, workers } => {
            let workers = workers.unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            });
            let (vm, pid) = Vm::run_module(base, &module, workers)
                .with_context(|| format!("cannot run module '{}'", module))?;
            let uncaught = vm.uncaught_exception(pid);
            vm.stop();
            std::io::stdout().flush().ok();
            if let Some(message) = uncaught {
                eprintln!("{} {}", "uncaught exception:".red().bold(), message);
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Dis { module } => {
            let path = Code::path_for_module(&base, &module);
            let code = Code::from_file(&path)
                .with_context(|| format!("cannot load module '{}'", module))?;
            print!("{}", code);
            Ok(ExitCode::SUCCESS)
        }
    }
}
