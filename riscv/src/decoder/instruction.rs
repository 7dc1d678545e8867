use std::fmt;

use super::Format;
use crate::bits::extract_bits;

/// Register-register operations of the R format
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RegOp {
    Add,
    And,
    Sub,
    Sll,
    Srl,
    Mul,
}

/// Register-register operations of the R64 format
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RegOp32 {
    Sllw,
    Sraw,
}

/// Register-immediate operations of the I-arith format
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ImmOp {
    Addi,
    Srli,
}

/// Width of a load or store access
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Width {
    Byte,
    Word,
    Double,
}

/// Comparison performed by a conditional branch
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BranchCond {
    Eq,
    Ne,
    /// Signed less-than
    Lt,
    /// Signed greater-or-equal
    Ge,
}

/// A decoded instruction, one variant per encoding format
///
/// Register fields are 5-bit indices. Immediates and offsets are already
/// reassembled and sign-extended to 64 bits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// R format: `rd = rs1 <op> rs2`
    Op { op: RegOp, rd: u8, rs1: u8, rs2: u8 },
    /// R64 format: word-width shifts
    Op32 { op: RegOp32, rd: u8, rs1: u8, rs2: u8 },
    /// I format load: `rd = mem[rs1 + offset]`
    Load { width: Width, rd: u8, rs1: u8, offset: i64 },
    /// I format indirect jump
    Jalr { rd: u8, rs1: u8, offset: i64 },
    /// I format arithmetic: `rd = rs1 <op> imm`
    OpImm { op: ImmOp, rd: u8, rs1: u8, imm: i64 },
    /// S format: `mem[rs1 + offset] = rs2`
    Store { width: Width, rs1: u8, rs2: u8, offset: i64 },
    /// B format: `if rs1 <cond> rs2 { pc += offset }`
    Branch { cond: BranchCond, rs1: u8, rs2: u8, offset: i64 },
    /// J format: `rd = pc + 4; pc += offset`
    Jal { rd: u8, offset: i64 },
}

impl RegOp {
    pub const fn funct3(self) -> u8 {
        match self {
            RegOp::Add | RegOp::Sub | RegOp::Mul => 0b000,
            RegOp::Sll => 0b001,
            RegOp::Srl => 0b101,
            RegOp::And => 0b111,
        }
    }

    pub const fn funct7(self) -> u8 {
        match self {
            RegOp::Sub => 0b010_0000,
            RegOp::Mul => 0b000_0001,
            _ => 0b000_0000,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            RegOp::Add => "add",
            RegOp::And => "and",
            RegOp::Sub => "sub",
            RegOp::Sll => "sll",
            RegOp::Srl => "srl",
            RegOp::Mul => "mul",
        }
    }
}

impl RegOp32 {
    pub const fn funct3(self) -> u8 {
        match self {
            RegOp32::Sllw => 0b001,
            RegOp32::Sraw => 0b101,
        }
    }

    pub const fn funct7(self) -> u8 {
        match self {
            RegOp32::Sllw => 0b000_0000,
            RegOp32::Sraw => 0b010_0000,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            RegOp32::Sllw => "sllw",
            RegOp32::Sraw => "sraw",
        }
    }
}

impl ImmOp {
    pub const fn funct3(self) -> u8 {
        match self {
            ImmOp::Addi => 0b000,
            ImmOp::Srli => 0b101,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            ImmOp::Addi => "addi",
            ImmOp::Srli => "srli",
        }
    }
}

impl Width {
    /// Access size in bytes
    pub const fn bytes(self) -> u64 {
        match self {
            Width::Byte => 1,
            Width::Word => 4,
            Width::Double => 8,
        }
    }

    /// Shared by loads and stores
    pub const fn funct3(self) -> u8 {
        match self {
            Width::Byte => 0b000,
            Width::Word => 0b010,
            Width::Double => 0b011,
        }
    }
}

impl BranchCond {
    pub const fn funct3(self) -> u8 {
        match self {
            BranchCond::Eq => 0b000,
            BranchCond::Ne => 0b001,
            BranchCond::Lt => 0b100,
            BranchCond::Ge => 0b101,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            BranchCond::Eq => "beq",
            BranchCond::Ne => "bne",
            BranchCond::Lt => "blt",
            BranchCond::Ge => "bge",
        }
    }

    /// Evaluates the condition on two register values
    pub fn holds(self, lhs: u64, rhs: u64) -> bool {
        match self {
            BranchCond::Eq => lhs == rhs,
            BranchCond::Ne => lhs != rhs,
            BranchCond::Lt => (lhs as i64) < (rhs as i64),
            BranchCond::Ge => (lhs as i64) >= (rhs as i64),
        }
    }
}

impl Instruction {
    /// Size of an encoded instruction in bytes
    pub const fn size() -> usize {
        4
    }

    /// The encoding format of this instruction
    pub fn format(&self) -> Format {
        match self {
            Instruction::Op { .. } => Format::R,
            Instruction::Op32 { .. } => Format::R64,
            Instruction::Load { .. } => Format::ILoad,
            Instruction::Jalr { .. } => Format::IJalr,
            Instruction::OpImm { .. } => Format::IArith,
            Instruction::Store { .. } => Format::S,
            Instruction::Branch { .. } => Format::B,
            Instruction::Jal { .. } => Format::J,
        }
    }

    /// Encode this instruction back into its 32-bit machine word
    ///
    /// Immediate bits that do not fit the format's field are dropped, and bit 0
    /// of branch and jump offsets is not encodable.
    pub fn encode(&self) -> u32 {
        let opcode = self.format().opcode() as u32;
        match *self {
            Instruction::Op { op, rd, rs1, rs2 } => {
                encode_r(opcode, rd, op.funct3(), rs1, rs2, op.funct7())
            }
            Instruction::Op32 { op, rd, rs1, rs2 } => {
                encode_r(opcode, rd, op.funct3(), rs1, rs2, op.funct7())
            }
            Instruction::Load { width, rd, rs1, offset } => {
                encode_i(opcode, rd, width.funct3(), rs1, offset)
            }
            Instruction::Jalr { rd, rs1, offset } => encode_i(opcode, rd, 0b000, rs1, offset),
            Instruction::OpImm { op, rd, rs1, imm } => encode_i(opcode, rd, op.funct3(), rs1, imm),
            Instruction::Store { width, rs1, rs2, offset } => {
                let imm = offset as u64;
                (extract_bits(imm, 5, 7) << 25)
                    | (reg(rs2) << 20)
                    | (reg(rs1) << 15)
                    | ((width.funct3() as u32) << 12)
                    | (extract_bits(imm, 0, 5) << 7)
                    | opcode
            }
            Instruction::Branch { cond, rs1, rs2, offset } => {
                let imm = offset as u64;
                (extract_bits(imm, 12, 1) << 31)
                    | (extract_bits(imm, 5, 6) << 25)
                    | (reg(rs2) << 20)
                    | (reg(rs1) << 15)
                    | ((cond.funct3() as u32) << 12)
                    | (extract_bits(imm, 1, 4) << 8)
                    | (extract_bits(imm, 11, 1) << 7)
                    | opcode
            }
            Instruction::Jal { rd, offset } => {
                let imm = offset as u64;
                (extract_bits(imm, 20, 1) << 31)
                    | (extract_bits(imm, 1, 10) << 21)
                    | (extract_bits(imm, 11, 1) << 20)
                    | (extract_bits(imm, 12, 8) << 12)
                    | (reg(rd) << 7)
                    | opcode
            }
        }
    }

    /// Assembly mnemonic, e.g. `add` or `lw`
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Op { op, .. } => op.mnemonic(),
            Instruction::Op32 { op, .. } => op.mnemonic(),
            Instruction::Load { width, .. } => match width {
                Width::Byte => "lb",
                Width::Word => "lw",
                Width::Double => "ld",
            },
            Instruction::Jalr { .. } => "jalr",
            Instruction::OpImm { op, .. } => op.mnemonic(),
            Instruction::Store { width, .. } => match width {
                Width::Byte => "sb",
                Width::Word => "sw",
                Width::Double => "sd",
            },
            Instruction::Branch { cond, .. } => cond.mnemonic(),
            Instruction::Jal { .. } => "jal",
        }
    }
}

fn reg(index: u8) -> u32 {
    (index & 0x1F) as u32
}

fn encode_r(opcode: u32, rd: u8, funct3: u8, rs1: u8, rs2: u8, funct7: u8) -> u32 {
    ((funct7 as u32 & 0x7F) << 25)
        | (reg(rs2) << 20)
        | (reg(rs1) << 15)
        | ((funct3 as u32) << 12)
        | (reg(rd) << 7)
        | opcode
}

fn encode_i(opcode: u32, rd: u8, funct3: u8, rs1: u8, imm: i64) -> u32 {
    (extract_bits(imm as u64, 0, 12) << 20)
        | (reg(rs1) << 15)
        | ((funct3 as u32) << 12)
        | (reg(rd) << 7)
        | opcode
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.mnemonic();
        match *self {
            Instruction::Op { rd, rs1, rs2, .. } | Instruction::Op32 { rd, rs1, rs2, .. } => {
                write!(f, "{mnemonic} x{rd}, x{rs1}, x{rs2}")
            }
            Instruction::Load { rd, rs1, offset, .. } | Instruction::Jalr { rd, rs1, offset } => {
                write!(f, "{mnemonic} x{rd}, {offset}(x{rs1})")
            }
            Instruction::OpImm { rd, rs1, imm, .. } => write!(f, "{mnemonic} x{rd}, x{rs1}, {imm}"),
            Instruction::Store { rs1, rs2, offset, .. } => {
                write!(f, "{mnemonic} x{rs2}, {offset}(x{rs1})")
            }
            Instruction::Branch { rs1, rs2, offset, .. } => {
                write!(f, "{mnemonic} x{rs1}, x{rs2}, {offset}")
            }
            Instruction::Jal { rd, offset } => write!(f, "{mnemonic} x{rd}, {offset}"),
        }
    }
}
