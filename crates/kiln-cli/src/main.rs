// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Kiln CLI - lower typed programs to IR and run them.

mod commands;
mod logger;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "kiln", version, about = "Lower typed programs to flat IR")]
struct Cli {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lower a program and print the IR
    Lower {
        /// Typed program, as JSON
        input: PathBuf,
        #[command(flatten)]
        opts: LowerOpts,
        /// Only this module (by path)
        #[arg(long)]
        module: Option<String>,
    },
    /// Lower a program and run it on the reference interpreter
    Run {
        input: PathBuf,
        #[command(flatten)]
        opts: LowerOpts,
        /// Module holding the entry routine
        #[arg(long, default_value = "main")]
        module: String,
        /// Routine to call after module initialization
        #[arg(long)]
        entry: Option<String>,
    },
    /// Explain an error code
    Explain {
        /// e.g. E0611
        code: String,
    },
}

#[derive(clap::Args)]
struct LowerOpts {
    /// Lowering settings, as JSON
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    checking: Option<Checking>,
    /// Worker threads
    #[arg(short, long)]
    jobs: Option<usize>,
    /// Omit source location markers
    #[arg(long)]
    no_source_locations: bool,
    #[arg(long, value_enum, default_value_t = Format::Human)]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Checking {
    Off,
    Precise,
    Conservative,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Human,
    Json,
}

fn main() {
    let cli = Cli::parse();
    output::init();
    logger::init(cli.verbose);

    let code = match cli.command {
        Command::Lower { input, opts, module } => commands::lower::cmd_lower(&input, &opts, module.as_deref()),
        Command::Run {
            input,
            opts,
            module,
            entry,
        } => commands::run::cmd_run(&input, &opts, &module, entry.as_deref()),
        Command::Explain { code } => commands::explain::cmd_explain(&code),
    };
    std::process::exit(code);
}
