//! Emulator configuration
//!
//! The same struct serves library callers (through `Default`) and the `rvemu` binary,
//! which flattens it into its command line.

use clap::Args;

pub const DEFAULT_STACK_SIZE: usize = 4096;
pub const DEFAULT_STACK_TOP: u64 = 0x8000_0000;
pub const DEFAULT_CACHE_LINES: usize = 64;

/// Largest accepted stack, 256 MiB
pub const MAX_STACK_SIZE: usize = 256 << 20;

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct EmuOptions {
    /// Stack capacity in bytes, at most 256 MiB
    #[arg(
        long,
        value_name = "BYTES",
        env = "RVEMU_STACK_SIZE",
        default_value_t = DEFAULT_STACK_SIZE,
        value_parser = parse_usize
    )]
    pub stack_size: usize,

    /// Address one past the highest stack byte; the initial stack pointer
    #[arg(
        long,
        value_name = "ADDR",
        env = "RVEMU_STACK_TOP",
        default_value = "0x80000000",
        value_parser = parse_u64
    )]
    pub stack_top: u64,

    /// Number of instruction cache lines (power of two)
    #[arg(
        long,
        value_name = "LINES",
        env = "RVEMU_CACHE_LINES",
        default_value_t = DEFAULT_CACHE_LINES,
        value_parser = parse_usize
    )]
    pub cache_lines: usize,

    /// Stop with an error after this many executed instructions
    #[arg(long, value_name = "STEPS", env = "RVEMU_MAX_STEPS", value_parser = parse_u64)]
    pub max_steps: Option<u64>,
}

impl Default for EmuOptions {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            stack_top: DEFAULT_STACK_TOP,
            cache_lines: DEFAULT_CACHE_LINES,
            max_steps: None,
        }
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal integer
pub fn parse_u64(s: &str) -> Result<u64, String> {
    let s = s.trim().replace('_', "");
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid number '{s}': {e}"))
}

/// [`parse_u64`] for sizes and counts
pub fn parse_usize(s: &str) -> Result<usize, String> {
    let value = parse_u64(s)?;
    usize::try_from(value).map_err(|_| format!("{value} does not fit in a usize"))
}
