//! Integer register file
//!
//! Ref: https://riscv-non-isa.github.io/riscv-elf-psabi-doc/#_register_convention
//!
//! | ABI name | X name  | Usage                                |
//! |----------|---------|--------------------------------------|
//! | REG_ZERO | REG_X0  | Read always as zero                  |
//! | REG_RA   | REG_X1  | Return address                       |
//! | REG_SP   | REG_X2  | Stack pointer                        |
//! | REG_A0   | REG_X10 | Function argument 0 / return value   |
//! | REG_A1   | REG_X11 | Function argument 1                  |
//! | REG_A2   | REG_X12 | Function argument 2                  |
//! | REG_A3   | REG_X13 | Function argument 3                  |

pub const REG_ZERO: u8 = 0;
pub const REG_RA: u8 = 1;
pub const REG_SP: u8 = 2;
pub const REG_A0: u8 = 10;
pub const REG_A1: u8 = 11;
pub const REG_A2: u8 = 12;
pub const REG_A3: u8 = 13;

/// Argument registers, in calling-convention order
pub const ARG_REGS: [u8; 4] = [REG_A0, REG_A1, REG_A2, REG_A3];

pub const REGS_COUNT: usize = 32;

/// 32 general-purpose 64-bit registers with x0 hard-wired to zero
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    x: [u64; REGS_COUNT],
}

impl RegisterFile {
    #[inline]
    pub fn read(&self, index: u8) -> u64 {
        self.x[index as usize & (REGS_COUNT - 1)]
    }

    /// Writes to x0 are discarded
    #[inline]
    pub fn write(&mut self, index: u8, value: u64) {
        if index != REG_ZERO {
            self.x[index as usize & (REGS_COUNT - 1)] = value;
        }
    }

    pub fn as_array(&self) -> &[u64; REGS_COUNT] {
        &self.x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_register_discards_writes() {
        let mut regs = RegisterFile::default();
        regs.write(REG_ZERO, 0xDEAD);
        assert_eq!(regs.read(REG_ZERO), 0);

        regs.write(REG_A0, 0xDEAD);
        assert_eq!(regs.read(REG_A0), 0xDEAD);
        assert_eq!(regs.as_array()[10], 0xDEAD);
    }
}
