use std::{fs, path::PathBuf, process};

use clap::{ArgAction, Parser};
use clap_stdin::FileOrStdin;
use log::LevelFilter;

use cxc::{compile, context::CompileOptions};

/// Compiler for the cx language, emitting NASM assembly for x86-64 Linux
#[derive(Parser, Debug)]
#[clap(name = "cxc")]
struct Cli {
    /// Source file, or "-" for stdin
    #[clap(default_value = "-")]
    input: FileOrStdin,

    /// Write the assembly here instead of stdout
    #[clap(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Test counted loop conditions against their immediate directly
    #[clap(long)]
    peephole: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[clap(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logger(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose > 0 || std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        });
    }
    builder.init();
}

fn run(cli: Cli) -> Result<(), String> {
    let source = cli.input.contents().map_err(|e| e.to_string())?;
    let options = CompileOptions {
        peephole: cli.peephole,
    };

    let assembly = compile(&source, options).map_err(|e| e.to_string())?;

    match cli.output {
        Some(path) => fs::write(&path, assembly.to_string())
            .map_err(|e| format!("{}: {}", path.display(), e)),
        None => {
            print!("{}", assembly);
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(message) = run(cli) {
        eprintln!("error: {}", message);
        process::exit(1);
    }
}
