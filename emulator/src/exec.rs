//! Instruction semantics
//!
//! One handler per instruction format. Every handler leaves the PC pointing at the next
//! instruction to fetch and bumps the counter of its format. All arithmetic wraps.

use rvemu_riscv::{
    bits::{extract_bits, sign_extend},
    BranchCond, ImmOp, Instruction, RegOp, RegOp32, Width,
};

use crate::{Machine, MemoryError};

impl Machine {
    /// Execute one decoded instruction
    pub(crate) fn execute(&mut self, instruction: Instruction) -> Result<(), MemoryError> {
        match instruction {
            Instruction::Op { op, rd, rs1, rs2 } => self.exec_op(op, rd, rs1, rs2),
            Instruction::Op32 { op, rd, rs1, rs2 } => self.exec_op_32(op, rd, rs1, rs2),
            Instruction::Load { width, rd, rs1, offset } => {
                self.exec_load(width, rd, rs1, offset)?
            }
            Instruction::Jalr { rs1, offset, .. } => self.exec_jalr(rs1, offset),
            Instruction::OpImm { op, rd, rs1, imm } => self.exec_op_imm(op, rd, rs1, imm),
            Instruction::Store { width, rs1, rs2, offset } => {
                self.exec_store(width, rs1, rs2, offset)?
            }
            Instruction::Branch { cond, rs1, rs2, offset } => {
                self.exec_branch(cond, rs1, rs2, offset)
            }
            Instruction::Jal { rd, offset } => self.exec_jal(rd, offset),
        }
        Ok(())
    }

    fn exec_op(&mut self, op: RegOp, rd: u8, rs1: u8, rs2: u8) {
        let a = self.regs.read(rs1);
        let b = self.regs.read(rs2);

        // Shift amounts wrap at 64, matching RV64 sll/srl
        let value = match op {
            RegOp::Add => a.wrapping_add(b),
            RegOp::And => a & b,
            RegOp::Sub => a.wrapping_sub(b),
            RegOp::Sll => a.wrapping_shl(b as u32),
            RegOp::Srl => a.wrapping_shr(b as u32),
            RegOp::Mul => a.wrapping_mul(b),
        };

        self.regs.write(rd, value);
        self.advance();
        self.counters.on_format(rvemu_riscv::Format::R);
    }

    /// The result is kept at 64 bits: sllw does not truncate and sign-extend bit 31
    fn exec_op_32(&mut self, op: RegOp32, rd: u8, rs1: u8, rs2: u8) {
        let a = self.regs.read(rs1);
        let shamt = extract_bits(self.regs.read(rs2), 0, 5);

        let value = match op {
            RegOp32::Sllw => a << shamt,
            RegOp32::Sraw => (sign_extend(a, 31) >> shamt) as u64,
        };

        self.regs.write(rd, value);
        self.advance();
        self.counters.on_format(rvemu_riscv::Format::R64);
    }

    fn exec_op_imm(&mut self, op: ImmOp, rd: u8, rs1: u8, imm: i64) {
        let a = self.regs.read(rs1);

        let value = match op {
            ImmOp::Addi => a.wrapping_add(imm as u64),
            ImmOp::Srli => a >> (imm as u64 & 0x1F),
        };

        self.regs.write(rd, value);
        self.advance();
        self.counters.on_format(rvemu_riscv::Format::IArith);
    }

    fn exec_load(&mut self, width: Width, rd: u8, rs1: u8, offset: i64) -> Result<(), MemoryError> {
        let addr = self.regs.read(rs1).wrapping_add(offset as u64);
        let raw = self.memory.load(addr, width)?;

        let value = match width {
            Width::Byte => sign_extend(raw, 7) as u64,
            Width::Word => sign_extend(raw, 31) as u64,
            Width::Double => raw,
        };

        self.regs.write(rd, value);
        self.advance();
        self.counters.on_format(rvemu_riscv::Format::ILoad);
        Ok(())
    }

    fn exec_store(
        &mut self,
        width: Width,
        rs1: u8,
        rs2: u8,
        offset: i64,
    ) -> Result<(), MemoryError> {
        let addr = self.regs.read(rs1).wrapping_add(offset as u64);
        self.memory.store(addr, width, self.regs.read(rs2))?;

        self.advance();
        self.counters.on_format(rvemu_riscv::Format::S);
        Ok(())
    }

    fn exec_branch(&mut self, cond: BranchCond, rs1: u8, rs2: u8, offset: i64) {
        let taken = cond.holds(self.regs.read(rs1), self.regs.read(rs2));

        if taken {
            self.pc = self.pc.wrapping_add(offset as u64);
        } else {
            self.advance();
        }
        self.counters.on_branch(taken);
    }

    fn exec_jal(&mut self, rd: u8, offset: i64) {
        self.regs.write(rd, self.pc.wrapping_add(4));
        self.pc = self.pc.wrapping_add(offset as u64);
        self.counters.on_format(rvemu_riscv::Format::J);
    }

    /// The link value goes to `rs1`, not `rd`. The target is computed first, so
    /// `jalr` through the link register itself still lands on the old value.
    fn exec_jalr(&mut self, rs1: u8, offset: i64) {
        let target = self.regs.read(rs1).wrapping_add(offset as u64) & !1;

        self.regs.write(rs1, self.pc.wrapping_add(4));
        self.pc = target;
        self.counters.on_format(rvemu_riscv::Format::IJalr);
    }

    #[inline]
    fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(Instruction::size() as u64);
    }
}
