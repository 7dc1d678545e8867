//! RV64 subset instruction decoder
//!
//! A RISC-V instruction word is grouped by its *format*, i.e. how its fields are laid
//! out in the 32 bits, and the format is selected by the low 7 bits (the opcode):
//!
//! [0000000 | 00010 | 00001 | 000 | 00011 | 0110011]
//! [funct7  | rs2   | rs1   |funct3| rd   | opcode ]
//!
//! - The opcode `0110011` says this is an R-type instruction: two source registers and
//!   a destination register.
//! - `funct3 = 000` narrows it down to ADD, SUB or MUL.
//! - `funct7 = 0000000` selects ADD (`0100000` would be SUB, `0000001` MUL).
//!
//! Only the opcodes the emulator executes are recognized; see [`Format`].
//!
//! Register fields are always at the same bit positions regardless of the format, but
//! immediates are scattered differently per format and are reassembled by [`DecodedFields`].

pub mod bits;
pub mod decoder;

pub use decoder::{
    classify, decode, BranchCond, DecodeError, DecodedFields, Format, ImmOp, Instruction, RegOp,
    RegOp32, Width,
};
