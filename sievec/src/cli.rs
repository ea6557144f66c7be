//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sievec")]
#[command(about = "Compile, inspect and run Sieve scripts; drive a ManageSieve session")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compile a `.sieve` source file to a `.sievec` binary
    Compile {
        /// Sieve source file
        #[arg(value_name = "SCRIPT")]
        input: PathBuf,

        /// Output binary path (defaults to the input path with `.sievec`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile a script and report diagnostics without writing a binary
    Check {
        #[arg(value_name = "SCRIPT")]
        input: PathBuf,
    },

    /// Print a compiled binary's extension table and block layout
    Dump {
        #[arg(value_name = "BINARY")]
        input: PathBuf,
    },

    /// Compile (or load) a script and run it against a message file
    Run {
        /// Sieve source (`.sieve`) or compiled binary (`.sievec`)
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// RFC 5322 message to filter
        #[arg(value_name = "MESSAGE")]
        message: PathBuf,
    },

    /// Drive a ManageSieve session over stdin/stdout (RFC 5804 demo)
    Serve,
}
