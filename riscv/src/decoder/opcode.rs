use std::fmt;

/// Instruction formats understood by the emulator
///
/// Each format corresponds to exactly one major opcode. Encoding layouts:
/*
    --------------------------------------------------------------------------
    R-type | funct7 |  rs2 |  rs1 | funct3 |   rd  | opcode |
           | 31-25  |24-20 |19-15 | 14-12  | 11-7  | 6-0    |
    --------------------------------------------------------------------------
    I-type |   imm[11:0]    |  rs1 | funct3 |   rd  | opcode |
           |   31-20        |19-15 | 14-12  | 11-7  | 6-0    |
    --------------------------------------------------------------------------
    S-type | imm[11:5] |  rs2 |  rs1 | funct3 | imm[4:0] | opcode |
           | 31-25     |24-20 |19-15 | 14-12  | 11-7     | 6-0    |
    --------------------------------------------------------------------------
    B-type | imm[12] | imm[10:5] |  rs2 |  rs1 | funct3 | imm[4:1|11] | opcode |
           |   31    | 30-25     |24-20 |19-15 | 14-12  | 11-7        | 6-0    |
    --------------------------------------------------------------------------
    J-type | imm[20] | imm[10:1] | imm[11] | imm[19:12] |   rd  | opcode |
           |   31    | 30-21     |   20    | 19-12      | 11-7  | 6-0    |
    --------------------------------------------------------------------------
*/
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[allow(clippy::unusual_byte_groupings)]
#[repr(u8)]
pub enum Format {
    /// Register-register operations (add, sub, and, sll, srl, mul)
    R = 0b01_100_11,

    /// 32-bit register-register operations (sllw, sraw)
    R64 = 0b01_110_11,

    /// Loads (lb, lw, ld)
    ILoad = 0b00_000_11,

    /// Jump and link register (jalr)
    IJalr = 0b11_001_11,

    /// Immediate arithmetic (addi, srli)
    IArith = 0b00_100_11,

    /// Stores (sb, sw, sd)
    S = 0b01_000_11,

    /// Conditional branches (beq, bne, blt, bge)
    B = 0b11_000_11,

    /// Jump and link (jal)
    J = 0b11_011_11,
}

impl Format {
    #[allow(clippy::unusual_byte_groupings)]
    /// Convert a 7-bit opcode to its format
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            0b01_100_11 => Some(Format::R),
            0b01_110_11 => Some(Format::R64),
            0b00_000_11 => Some(Format::ILoad),
            0b11_001_11 => Some(Format::IJalr),
            0b00_100_11 => Some(Format::IArith),
            0b01_000_11 => Some(Format::S),
            0b11_000_11 => Some(Format::B),
            0b11_011_11 => Some(Format::J),
            _ => None,
        }
    }

    /// The 7-bit major opcode of this format
    pub const fn opcode(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::R => "R-type",
            Format::R64 => "R-type-64",
            Format::ILoad => "I-type-load",
            Format::IJalr => "I-type-jalr",
            Format::IArith => "I-type",
            Format::S => "S-type",
            Format::B => "B-type",
            Format::J => "J-type",
        };
        f.write_str(name)
    }
}
