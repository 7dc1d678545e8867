use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{ensure, Context, Result};
use clap::{ArgAction, Parser};
use rvemu::{parse_u64, AnalysisCounters, CacheStats, EmuOptions, Machine, ProgramImage};
use serde::Serialize;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Run a flat little-endian RV64 program image and print a0 plus execution statistics
#[derive(Parser, Debug)]
#[command(name = "rvemu", version, about, long_about = None)]
struct Cli {
    /// Program image: raw instruction words, little-endian
    program: PathBuf,

    /// Address the image is loaded at and executed from
    #[arg(long, value_name = "ADDR", default_value = "0x1000", value_parser = parse_u64)]
    base: u64,

    /// Values for a0..a3
    #[arg(
        long,
        value_name = "VALUE",
        num_args = 1..=4,
        value_delimiter = ',',
        value_parser = parse_u64
    )]
    args: Vec<u64>,

    #[command(flatten)]
    emu: EmuOptions,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct RunReport {
    result: u64,
    counters: AnalysisCounters,
    cache: CacheStats,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut args = [0u64; 4];
    ensure!(cli.args.len() <= args.len(), "At most {} arguments are supported", args.len());
    args[..cli.args.len()].copy_from_slice(&cli.args);

    let bytes = fs::read(&cli.program)
        .with_context(|| format!("Failed to read program image {}", cli.program.display()))?;
    let image = ProgramImage::from_bytes(cli.base, bytes)
        .with_context(|| format!("Failed to load {}", cli.program.display()))?;

    let mut machine = Machine::new(&image, args, &cli.emu)?;
    let result = machine.run()?;

    let counters = machine.counters();
    let cache = machine.cache_stats();
    if cli.json {
        let report = RunReport { result, counters, cache };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Result = {result} ({result:#x})");
        print!("{}", counters.report());
        println!(
            "Instruction cache: {} hits, {} misses ({:.2}% hit rate)",
            cache.hits,
            cache.misses,
            cache.hit_rate() * 100.0
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
