//! RV64 subset decoder
//!
//! The public API of this module is `classify`, `decode` and their types.
mod error;
mod instruction;
mod opcode;

pub use error::DecodeError;
pub use instruction::{BranchCond, ImmOp, Instruction, RegOp, RegOp32, Width};
pub use opcode::Format;

use crate::bits::{extract_bits, sign_extend};

/// Classify a 32-bit instruction word by its opcode field (bits [6:0])
pub fn classify(word: u32) -> Result<Format, DecodeError> {
    let opcode = extract_bits(word as u64, 0, 7) as u8;
    Format::from_opcode(opcode).ok_or(DecodeError::UnknownOpcode { opcode, word })
}

/// Decode a 32-bit instruction word
pub fn decode(word: u32) -> Result<Instruction, DecodeError> {
    let format = classify(word)?;
    let fields = DecodedFields::new(word);

    match format {
        Format::R => decode_op(&fields),
        Format::R64 => decode_op_32(&fields),
        Format::ILoad => decode_load(&fields),
        Format::IJalr => decode_jalr(&fields),
        Format::IArith => decode_op_imm(&fields),
        Format::S => decode_store(&fields),
        Format::B => decode_branch(&fields),
        Format::J => decode_jal(&fields),
    }
}

/// Parsed fields from a 32-bit instruction word
///
/// This is the union of every format's fields; the per-format decoders pick the
/// ones that are meaningful for the opcode. Register fields sit at the same bit
/// positions in every format that has them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFields {
    /// Original 32-bit instruction word
    pub raw: u32,

    /// Destination register (bits [11:7])
    pub rd: u8,

    /// Function code 3 (bits [14:12])
    pub funct3: u8,

    /// Source register 1 (bits [19:15])
    pub rs1: u8,

    /// Source register 2 (bits [24:20])
    pub rs2: u8,

    /// Function code 7 (bits [31:25])
    pub funct7: u8,

    /// I-type immediate (bits [31:20], sign-extended)
    pub i_immediate: i64,

    /// S-type immediate (bits [31:25] and [11:7], sign-extended)
    pub s_immediate: i64,

    /// B-type immediate (branch offset, sign-extended)
    pub b_immediate: i64,

    /// J-type immediate (jump offset, sign-extended)
    pub j_immediate: i64,
}

impl DecodedFields {
    /// Extract all fields from a 32-bit instruction word
    pub fn new(raw: u32) -> Self {
        let word = raw as u64;

        Self {
            raw,
            rd: extract_bits(word, 7, 5) as u8,
            funct3: extract_bits(word, 12, 3) as u8,
            rs1: extract_bits(word, 15, 5) as u8,
            rs2: extract_bits(word, 20, 5) as u8,
            funct7: extract_bits(word, 25, 7) as u8,
            i_immediate: Self::extract_i_immediate(word),
            s_immediate: Self::extract_s_immediate(word),
            b_immediate: Self::extract_b_immediate(word),
            j_immediate: Self::extract_j_immediate(word),
        }
    }

    /// imm[11:0] = bits[31:20]
    fn extract_i_immediate(word: u64) -> i64 {
        sign_extend(extract_bits(word, 20, 12) as u64, 11)
    }

    /// imm[11:5] = bits[31:25], imm[4:0] = bits[11:7]
    fn extract_s_immediate(word: u64) -> i64 {
        let imm11_5 = extract_bits(word, 25, 7) << 5;
        let imm4_0 = extract_bits(word, 7, 5);

        sign_extend((imm11_5 | imm4_0) as u64, 11)
    }

    /// imm[12] = bit 31, imm[10:5] = bits[30:25], imm[4:1] = bits[11:8], imm[11] = bit 7
    fn extract_b_immediate(word: u64) -> i64 {
        let imm12 = extract_bits(word, 31, 1) << 12;
        let imm10_5 = extract_bits(word, 25, 6) << 5;
        let imm4_1 = extract_bits(word, 8, 4) << 1;
        let imm11 = extract_bits(word, 7, 1) << 11;

        sign_extend((imm12 | imm10_5 | imm4_1 | imm11) as u64, 12)
    }

    /// imm[20] = bit 31, imm[19:12] = bits[19:12], imm[11] = bit 20, imm[10:1] = bits[30:21]
    fn extract_j_immediate(word: u64) -> i64 {
        let imm20 = extract_bits(word, 31, 1) << 20;
        let imm19_12 = extract_bits(word, 12, 8) << 12;
        let imm11 = extract_bits(word, 20, 1) << 11;
        let imm10_1 = extract_bits(word, 21, 10) << 1;

        sign_extend((imm20 | imm19_12 | imm11 | imm10_1) as u64, 20)
    }

    fn unsupported(&self, format: Format) -> DecodeError {
        DecodeError::UnsupportedFunction {
            format,
            funct3: self.funct3,
            funct7: self.funct7,
            word: self.raw,
        }
    }
}

/// Decode OP instructions (register-register operations)
fn decode_op(fields: &DecodedFields) -> Result<Instruction, DecodeError> {
    let (rd, rs1, rs2) = (fields.rd, fields.rs1, fields.rs2);

    let op = match (fields.funct3, fields.funct7) {
        (0b000, 0b000_0000) => RegOp::Add,
        (0b111, 0b000_0000) => RegOp::And,
        (0b000, 0b010_0000) => RegOp::Sub,
        (0b001, 0b000_0000) => RegOp::Sll,
        (0b101, 0b000_0000) => RegOp::Srl,
        (0b000, 0b000_0001) => RegOp::Mul,
        _ => return Err(fields.unsupported(Format::R)),
    };
    Ok(Instruction::Op { op, rd, rs1, rs2 })
}

/// Decode OP-32 instructions (word-width register-register operations)
fn decode_op_32(fields: &DecodedFields) -> Result<Instruction, DecodeError> {
    let (rd, rs1, rs2) = (fields.rd, fields.rs1, fields.rs2);

    let op = match (fields.funct3, fields.funct7) {
        (0b001, 0b000_0000) => RegOp32::Sllw,
        (0b101, 0b010_0000) => RegOp32::Sraw,
        _ => return Err(fields.unsupported(Format::R64)),
    };
    Ok(Instruction::Op32 { op, rd, rs1, rs2 })
}

/// Decode LOAD instructions
fn decode_load(fields: &DecodedFields) -> Result<Instruction, DecodeError> {
    let width = match fields.funct3 {
        0b000 => Width::Byte,
        0b010 => Width::Word,
        0b011 => Width::Double,
        _ => return Err(fields.unsupported(Format::ILoad)),
    };
    Ok(Instruction::Load { width, rd: fields.rd, rs1: fields.rs1, offset: fields.i_immediate })
}

/// Decode JALR
///
/// funct3 is not checked: every jalr encoding is accepted.
fn decode_jalr(fields: &DecodedFields) -> Result<Instruction, DecodeError> {
    Ok(Instruction::Jalr { rd: fields.rd, rs1: fields.rs1, offset: fields.i_immediate })
}

/// Decode OP-IMM instructions
///
/// The upper immediate bits of srli are not checked; the shift amount is masked
/// when the instruction executes.
fn decode_op_imm(fields: &DecodedFields) -> Result<Instruction, DecodeError> {
    let op = match fields.funct3 {
        0b000 => ImmOp::Addi,
        0b101 => ImmOp::Srli,
        _ => return Err(fields.unsupported(Format::IArith)),
    };
    Ok(Instruction::OpImm { op, rd: fields.rd, rs1: fields.rs1, imm: fields.i_immediate })
}

/// Decode STORE instructions
fn decode_store(fields: &DecodedFields) -> Result<Instruction, DecodeError> {
    let width = match fields.funct3 {
        0b000 => Width::Byte,
        0b010 => Width::Word,
        0b011 => Width::Double,
        _ => return Err(fields.unsupported(Format::S)),
    };
    Ok(Instruction::Store { width, rs1: fields.rs1, rs2: fields.rs2, offset: fields.s_immediate })
}

/// Decode BRANCH instructions
fn decode_branch(fields: &DecodedFields) -> Result<Instruction, DecodeError> {
    let cond = match fields.funct3 {
        0b000 => BranchCond::Eq,
        0b001 => BranchCond::Ne,
        0b100 => BranchCond::Lt,
        0b101 => BranchCond::Ge,
        _ => return Err(fields.unsupported(Format::B)),
    };
    Ok(Instruction::Branch { cond, rs1: fields.rs1, rs2: fields.rs2, offset: fields.b_immediate })
}

/// Decode JAL
fn decode_jal(fields: &DecodedFields) -> Result<Instruction, DecodeError> {
    Ok(Instruction::Jal { rd: fields.rd, offset: fields.j_immediate })
}
