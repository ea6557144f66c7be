//! Command-line front end for the `sieve-engine` compiler/VM: compile,
//! check, dump, run against a message file, or drive a ManageSieve session
//! demo over stdin/stdout.

mod cli;
mod host;
mod managesieve_demo;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser as _;
use sieve_engine::registry::{Capabilities, Registry};
use sieve_types::{Limits, Script, ScriptLocation};

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    let result = match cli.command {
        cli::Command::Compile { input, output } => run_compile(&input, output),
        cli::Command::Check { input } => run_check(&input),
        cli::Command::Dump { input } => run_dump(&input),
        cli::Command::Run { script, message } => run_run(&script, &message),
        cli::Command::Serve => managesieve_demo::serve(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("sievec: {message}");
            ExitCode::FAILURE
        }
    }
}

fn registry() -> Registry {
    Registry::new(Capabilities::all_compiled_in())
}

fn read_to_string(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))
}

fn compile_source(input: &Path, name: &str) -> Result<sieve_engine::CompileOutcome, String> {
    let source = read_to_string(input)?;
    let limits = Limits::default();
    if source.len() > limits.max_script_size {
        return Err(format!("{}: script exceeds max_script_size", input.display()));
    }
    let mut script = Script::new(name, ScriptLocation::Personal, source);
    Ok(sieve_engine::compile(&mut script, &registry(), &limits))
}

fn report_diagnostics(outcome: &sieve_engine::CompileOutcome) {
    for diagnostic in &outcome.diagnostics {
        eprintln!("{diagnostic}");
    }
}

fn run_compile(input: &Path, output: Option<PathBuf>) -> Result<(), String> {
    let name = input.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let outcome = compile_source(input, &name)?;
    report_diagnostics(&outcome);
    let binary = outcome.binary.ok_or_else(|| format!("{} error(s)", outcome.error_count))?;
    let out_path = output.unwrap_or_else(|| input.with_extension("sievec"));
    fs::write(&out_path, binary.to_bytes()).map_err(|e| format!("{}: {e}", out_path.display()))?;
    log::info!("wrote {}", out_path.display());
    Ok(())
}

fn run_check(input: &Path) -> Result<(), String> {
    let name = input.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let outcome = compile_source(input, &name)?;
    report_diagnostics(&outcome);
    if outcome.succeeded() {
        println!("{}: OK ({} warning(s))", input.display(), outcome.warning_count);
        Ok(())
    } else {
        Err(format!("{} error(s)", outcome.error_count))
    }
}

fn run_dump(input: &Path) -> Result<(), String> {
    let bytes = fs::read(input).map_err(|e| format!("{}: {e}", input.display()))?;
    let binary = sieve_engine::binary::Binary::from_bytes(&bytes).map_err(|e| e.to_string())?;
    println!("abi_version: {}", binary.abi_version);
    println!("extensions:");
    for (id, name) in &binary.extensions {
        println!("  {:>3}  {name}", id.0);
    }
    println!("blocks:");
    for (idx, block) in binary.blocks.iter().enumerate() {
        println!("  [{idx}] {} bytes", block.len());
    }
    Ok(())
}

fn run_run(script_path: &Path, message_path: &Path) -> Result<(), String> {
    let binary = if script_path.extension().and_then(|e| e.to_str()) == Some("sievec") {
        let bytes = fs::read(script_path).map_err(|e| format!("{}: {e}", script_path.display()))?;
        sieve_engine::binary::Binary::from_bytes(&bytes).map_err(|e| e.to_string())?
    } else {
        let name = script_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let outcome = compile_source(script_path, &name)?;
        report_diagnostics(&outcome);
        outcome.binary.ok_or_else(|| format!("{} error(s)", outcome.error_count))?
    };

    let raw_message = read_to_string(message_path)?;
    let message = host::DemoMessage::parse(&raw_message);
    let demo_host = host::DemoHost::new();
    let limits = Limits::default();

    let interpreter = sieve_engine::Interpreter::new(&binary, &demo_host, &message);
    let result = interpreter.run(&limits).map_err(|e| e.to_string())?;

    for action in &result.entries {
        println!("{:?} {:?}", action.kind, action.params.strings);
    }
    if result.implicit_keep {
        println!("(implicit keep)");
    }
    for conflict in &result.conflicts {
        eprintln!("conflict: {conflict}");
    }
    Ok(())
}
