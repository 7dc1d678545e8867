//! Emulator for a small RV64 subset
//!
//! Loads a flat program image, runs it from its base address until control returns to
//! [`STOP_ADDR`] and reports the value left in a0 along with execution statistics.
//!
//! ```text
//!   ProgramImage ──► MemoryRegion ◄── InstructionCache ◄── Machine::step
//!                                                            │
//!                                   rvemu_riscv::decode ◄────┤
//!                                                            ▼
//!                                  RegisterFile, AnalysisCounters
//! ```

mod emu_options;
mod error;
mod exec;
mod icache;
mod machine;
mod mem;
mod regs;
mod stats;

pub use emu_options::*;
pub use error::*;
pub use icache::*;
pub use machine::*;
pub use mem::*;
pub use regs::*;
pub use stats::*;
