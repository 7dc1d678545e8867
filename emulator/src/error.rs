use std::fmt;

use rvemu_riscv::DecodeError;

/// Kind of memory access that failed
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Fetch,
    Load,
    Store,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Access::Fetch => "fetch",
            Access::Load => "load",
            Access::Store => "store",
        })
    }
}

/// Memory access errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("{access} of {width} byte(s) at {addr:#x} is outside the mapped segments")]
    OutOfBounds { access: Access, addr: u64, width: u64 },

    #[error("store of {width} byte(s) at {addr:#x} targets the read-only code segment")]
    ReadOnly { addr: u64, width: u64 },

    #[error("instruction fetch at misaligned address {addr:#x}")]
    MisalignedFetch { addr: u64 },
}

/// Errors that end an emulation run
#[derive(Debug, thiserror::Error)]
pub enum EmuError {
    #[error("decode error at pc {pc:#x}: {source}")]
    Decode {
        pc: u64,
        #[source]
        source: DecodeError,
    },

    #[error("memory error at pc {pc:#x}: {source}")]
    Memory {
        pc: u64,
        #[source]
        source: MemoryError,
    },

    #[error("step limit of {limit} instructions exceeded")]
    StepLimitExceeded { limit: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
