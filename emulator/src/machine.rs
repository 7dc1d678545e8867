//! Fetch-decode-execute loop
//!
//! A `Machine` owns every piece of emulated state. Execution starts at the base of the
//! program image with `ra` holding [`STOP_ADDR`], so the program's final `ret` lands on
//! the stop address and ends the run.

use rvemu_riscv::decode;
use tracing::{debug, info, trace, warn};

use crate::{
    AnalysisCounters, CacheStats, EmuError, EmuOptions, InstructionCache, MemoryRegion,
    ProgramImage, RegisterFile, ARG_REGS, REGS_COUNT, REG_A0, REG_RA, REG_SP,
};

/// Reaching this PC ends the run. Never mapped.
pub const STOP_ADDR: u64 = 0;

#[derive(Debug, Clone)]
pub struct Machine {
    pub(crate) regs: RegisterFile,
    pub(crate) pc: u64,
    pub(crate) memory: MemoryRegion,
    pub(crate) icache: InstructionCache,
    pub(crate) counters: AnalysisCounters,
    max_steps: Option<u64>,
}

impl Machine {
    /// Lay out memory for `image` and set up the entry state
    ///
    /// `args` go to a0..a3, `sp` is set to the top of the stack and `ra` to [`STOP_ADDR`].
    pub fn new(
        image: &ProgramImage,
        args: [u64; 4],
        options: &EmuOptions,
    ) -> Result<Self, EmuError> {
        let memory = MemoryRegion::new(image, options)?;
        let mut icache = InstructionCache::new(options.cache_lines)?;
        icache.init();

        let mut regs = RegisterFile::default();
        regs.write(REG_SP, memory.stack_top());
        regs.write(REG_RA, STOP_ADDR);
        for (reg, value) in ARG_REGS.into_iter().zip(args) {
            regs.write(reg, value);
        }

        debug!(
            "Machine ready: entry={:#x} sp={:#x} args={args:?} cache_lines={}",
            memory.code_base(),
            memory.stack_top(),
            icache.line_count()
        );

        Ok(Self {
            regs,
            pc: memory.code_base(),
            memory,
            icache,
            counters: AnalysisCounters::default(),
            max_steps: options.max_steps,
        })
    }

    /// Fetch, decode and execute a single instruction
    ///
    /// Does nothing once the machine has stopped.
    pub fn step(&mut self) -> Result<(), EmuError> {
        if self.is_stopped() {
            return Ok(());
        }
        if let Some(limit) = self.max_steps {
            if self.counters.instructions >= limit {
                return Err(EmuError::StepLimitExceeded { limit });
            }
        }

        let pc = self.pc;
        let word = self
            .icache
            .lookup(pc, &self.memory)
            .map_err(|source| EmuError::Memory { pc, source })?;
        let instruction = decode(word).map_err(|source| EmuError::Decode { pc, source })?;

        trace!("{pc:#010x}: {word:08x}  {instruction}");

        self.execute(instruction).map_err(|source| EmuError::Memory { pc, source })?;
        self.counters.instructions += 1;
        Ok(())
    }

    /// Run until the PC reaches [`STOP_ADDR`] and return a0
    pub fn run(&mut self) -> Result<u64, EmuError> {
        while !self.is_stopped() {
            if let Err(e) = self.step() {
                warn!("Emulation stopped after {} instructions: {e}", self.counters.instructions);
                return Err(e);
            }
        }

        let result = self.regs.read(REG_A0);
        info!(
            "Emulation finished: {} instructions, result={result}",
            self.counters.instructions
        );
        Ok(result)
    }

    pub fn is_stopped(&self) -> bool {
        self.pc == STOP_ADDR
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub fn register(&self, index: u8) -> u64 {
        self.regs.read(index)
    }

    /// Writes to x0 are discarded
    pub fn set_register(&mut self, index: u8, value: u64) {
        self.regs.write(index, value);
    }

    pub fn registers(&self) -> &[u64; REGS_COUNT] {
        self.regs.as_array()
    }

    pub fn memory(&self) -> &MemoryRegion {
        &self.memory
    }

    pub fn counters(&self) -> AnalysisCounters {
        self.counters
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.icache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Access, MemoryError, REG_A1, REG_ZERO};
    use rvemu_riscv::{BranchCond, DecodeError, ImmOp, Instruction, RegOp, RegOp32, Width};

    const BASE: u64 = 0x1000;

    fn machine(program: &[Instruction]) -> Machine {
        machine_with(program, &EmuOptions::default())
    }

    fn machine_with(program: &[Instruction], options: &EmuOptions) -> Machine {
        let words: Vec<u32> = program.iter().map(Instruction::encode).collect();
        Machine::new(&ProgramImage::from_words(BASE, &words), [0; 4], options).unwrap()
    }

    fn addi(rd: u8, rs1: u8, imm: i64) -> Instruction {
        Instruction::OpImm { op: ImmOp::Addi, rd, rs1, imm }
    }

    fn ret() -> Instruction {
        Instruction::Jalr { rd: REG_ZERO, rs1: REG_RA, offset: 0 }
    }

    #[test]
    fn test_entry_state() {
        let image = ProgramImage::from_words(BASE, &[addi(0, 0, 0).encode()]);
        let m = Machine::new(&image, [1, 2, 3, 4], &EmuOptions::default()).unwrap();

        assert_eq!(m.pc(), BASE);
        assert_eq!(m.register(REG_SP), crate::emu_options::DEFAULT_STACK_TOP);
        assert_eq!(m.register(REG_RA), STOP_ADDR);
        assert_eq!(&m.registers()[10..14], &[1, 2, 3, 4]);
        assert_eq!(m.counters(), AnalysisCounters::default());
    }

    #[test]
    fn test_invalid_cache_size_is_rejected() {
        let image = ProgramImage::from_words(BASE, &[addi(0, 0, 0).encode()]);
        let options = EmuOptions { cache_lines: 3, ..EmuOptions::default() };
        assert!(matches!(Machine::new(&image, [0; 4], &options), Err(EmuError::InvalidConfig(_))));
    }

    #[test]
    fn test_add() {
        let mut m = machine(&[Instruction::Op { op: RegOp::Add, rd: 3, rs1: 1, rs2: 2 }]);
        m.set_register(1, 5);
        m.set_register(2, 7);
        m.step().unwrap();

        assert_eq!(m.register(3), 12);
        assert_eq!(m.pc(), BASE + 4);
        assert_eq!(m.counters().arithmetic, 1);
        assert_eq!(m.counters().instructions, 1);
    }

    #[test]
    fn test_writes_to_x0_are_discarded() {
        let mut m = machine(&[
            addi(REG_ZERO, REG_ZERO, 42),
            Instruction::Op { op: RegOp::Sub, rd: REG_ZERO, rs1: REG_SP, rs2: REG_ZERO },
            Instruction::Jal { rd: REG_ZERO, offset: 4 },
        ]);
        for _ in 0..3 {
            m.step().unwrap();
            assert_eq!(m.register(REG_ZERO), 0);
        }
    }

    #[test]
    fn test_arithmetic_wraps() {
        let mut m = machine(&[
            Instruction::Op { op: RegOp::Add, rd: 3, rs1: 1, rs2: 2 },
            Instruction::Op { op: RegOp::Sub, rd: 4, rs1: REG_ZERO, rs2: 2 },
            Instruction::Op { op: RegOp::Mul, rd: 5, rs1: 1, rs2: 1 },
        ]);
        m.set_register(1, u64::MAX);
        m.set_register(2, 1);
        for _ in 0..3 {
            m.step().unwrap();
        }

        assert_eq!(m.register(3), 0);
        assert_eq!(m.register(4), u64::MAX);
        assert_eq!(m.register(5), 1);
    }

    #[test]
    fn test_shifts() {
        let mut m = machine(&[
            Instruction::Op { op: RegOp::Sll, rd: 3, rs1: 1, rs2: 2 },
            Instruction::Op { op: RegOp::Srl, rd: 4, rs1: 1, rs2: 2 },
            Instruction::Op32 { op: RegOp32::Sraw, rd: 5, rs1: 6, rs2: 2 },
            Instruction::Op32 { op: RegOp32::Sllw, rd: 7, rs1: 1, rs2: 8 },
            Instruction::OpImm { op: ImmOp::Srli, rd: 9, rs1: 1, imm: 0x404 },
        ]);
        m.set_register(1, 0xF0);
        // Shift amount 68: wraps to 4 for 64-bit shifts, masked to 4 for word shifts
        m.set_register(2, 68);
        m.set_register(6, 0x8000_0000);
        m.set_register(8, 32 + 1);
        for _ in 0..5 {
            m.step().unwrap();
        }

        assert_eq!(m.register(3), 0xF00);
        assert_eq!(m.register(4), 0xF);
        assert_eq!(m.register(5), 0xFFFF_FFFF_F800_0000);
        assert_eq!(m.register(7), 0x1E0);
        assert_eq!(m.register(9), 0xF);
        assert_eq!(m.counters().arithmetic, 5);
    }

    #[test]
    fn test_branch_taken_backwards() {
        let mut m = machine(&[
            addi(0, 0, 0),
            addi(0, 0, 0),
            Instruction::Branch { cond: BranchCond::Eq, rs1: 1, rs2: 2, offset: -8 },
        ]);
        m.set_register(1, 9);
        m.set_register(2, 9);
        m.step().unwrap();
        m.step().unwrap();
        m.step().unwrap();

        assert_eq!(m.pc(), BASE);
        assert_eq!(m.counters().branches_taken, 1);
        assert_eq!(m.counters().arithmetic, 2);
    }

    #[test]
    fn test_branch_conditions_are_signed() {
        let mut m = machine(&[
            Instruction::Branch { cond: BranchCond::Lt, rs1: 1, rs2: 2, offset: 8 },
            addi(0, 0, 0),
            Instruction::Branch { cond: BranchCond::Ge, rs1: 1, rs2: 2, offset: 8 },
            Instruction::Branch { cond: BranchCond::Ne, rs1: 1, rs2: 1, offset: 8 },
        ]);
        m.set_register(1, -1i64 as u64);
        m.set_register(2, 1);

        m.step().unwrap();
        assert_eq!(m.pc(), BASE + 8);
        m.step().unwrap();
        assert_eq!(m.pc(), BASE + 12);
        m.step().unwrap();
        assert_eq!(m.pc(), BASE + 16);

        assert_eq!(m.counters().branches_taken, 1);
        assert_eq!(m.counters().branches_not_taken, 2);
        assert_eq!(m.counters().branches(), 3);
    }

    #[test]
    fn test_jal_links_next_pc() {
        let mut m = machine(&[Instruction::Jal { rd: REG_RA, offset: 16 }]);
        m.step().unwrap();

        assert_eq!(m.register(REG_RA), BASE + 4);
        assert_eq!(m.pc(), BASE + 16);
        assert_eq!(m.counters().jumps, 1);
    }

    #[test]
    fn test_jalr_links_into_rs1() {
        let mut m = machine(&[Instruction::Jalr { rd: 5, rs1: 6, offset: 5 }]);
        m.set_register(6, 0x1FFF);
        m.step().unwrap();

        // Target has its low bit cleared, the link goes to rs1 and rd is untouched
        assert_eq!(m.pc(), 0x2004);
        assert_eq!(m.register(6), BASE + 4);
        assert_eq!(m.register(5), 0);
        assert_eq!(m.counters().jumps, 1);
    }

    #[test]
    fn test_ret_reaches_stop() {
        let mut m = machine(&[
            addi(REG_A0, REG_ZERO, 42),
            Instruction::Jalr { rd: REG_ZERO, rs1: REG_RA, offset: 0 },
        ]);

        assert_eq!(m.run().unwrap(), 42);
        assert!(m.is_stopped());
        assert_eq!(m.counters().instructions, 2);
        // The return clobbers ra with the link value
        assert_eq!(m.register(REG_RA), BASE + 8);
    }

    #[test]
    fn test_step_after_stop_is_a_no_op() {
        let mut m = machine(&[addi(REG_A0, REG_ZERO, 7), ret()]);
        assert_eq!(m.run().unwrap(), 7);

        let counters = m.counters();
        let stats = m.cache_stats();
        m.step().unwrap();
        m.step().unwrap();

        assert!(m.is_stopped());
        assert_eq!(m.counters(), counters);
        assert_eq!(m.cache_stats(), stats);
        assert_eq!(m.run().unwrap(), 7);
    }

    #[test]
    fn test_stack_loads_and_stores() {
        let mut m = machine(&[
            addi(5, REG_ZERO, -2),
            Instruction::Store { width: Width::Double, rs1: REG_SP, rs2: 5, offset: -8 },
            Instruction::Load { width: Width::Byte, rd: 6, rs1: REG_SP, offset: -8 },
            Instruction::Load { width: Width::Word, rd: 7, rs1: REG_SP, offset: -8 },
            Instruction::Load { width: Width::Double, rd: 8, rs1: REG_SP, offset: -8 },
            Instruction::Store { width: Width::Byte, rs1: REG_SP, rs2: 9, offset: -16 },
            Instruction::Load { width: Width::Byte, rd: 10, rs1: REG_SP, offset: -16 },
            Instruction::Store { width: Width::Word, rs1: REG_SP, rs2: 9, offset: -24 },
            Instruction::Load { width: Width::Word, rd: 11, rs1: REG_SP, offset: -24 },
        ]);
        m.set_register(9, 0x7F);
        for _ in 0..9 {
            m.step().unwrap();
        }

        assert_eq!(m.register(6), -2i64 as u64);
        assert_eq!(m.register(7), -2i64 as u64);
        assert_eq!(m.register(8), -2i64 as u64);
        assert_eq!(m.register(10), 0x7F);
        assert_eq!(m.register(11), 0x7F);
        assert_eq!(m.counters().loads, 5);
        assert_eq!(m.counters().stores, 3);
    }

    #[test]
    fn test_step_limit() {
        let options = EmuOptions { max_steps: Some(10), ..EmuOptions::default() };
        let mut m = machine_with(&[Instruction::Jal { rd: REG_ZERO, offset: 0 }], &options);

        assert!(matches!(m.run(), Err(EmuError::StepLimitExceeded { limit: 10 })));
        assert_eq!(m.counters().instructions, 10);
    }

    #[test]
    fn test_decode_error_carries_pc() {
        let image = ProgramImage::from_words(BASE, &[addi(0, 0, 0).encode(), 0xFFFF_FFFF]);
        let mut m = Machine::new(&image, [0; 4], &EmuOptions::default()).unwrap();

        match m.run() {
            Err(EmuError::Decode { pc, source: DecodeError::UnknownOpcode { word, .. } }) => {
                assert_eq!(pc, BASE + 4);
                assert_eq!(word, 0xFFFF_FFFF);
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(m.counters().instructions, 1);
    }

    #[test]
    fn test_store_into_code_fails() {
        let mut m = machine(&[
            addi(0, 0, 0),
            Instruction::Store { width: Width::Word, rs1: 5, rs2: REG_A1, offset: 4 },
        ]);
        m.set_register(5, BASE);

        let err = m.run().unwrap_err();
        assert!(matches!(
            err,
            EmuError::Memory { pc, source: MemoryError::ReadOnly { addr, width: 4 } }
                if pc == BASE + 4 && addr == BASE + 4
        ));
        // The failing instruction does not retire
        assert_eq!(m.pc(), BASE + 4);
        assert_eq!(m.counters().instructions, 1);
        assert_eq!(m.counters().stores, 0);
    }

    #[test]
    fn test_running_off_the_code_fails() {
        let mut m = machine(&[addi(0, 0, 0)]);

        let err = m.run().unwrap_err();
        assert!(matches!(
            err,
            EmuError::Memory { source: MemoryError::OutOfBounds { access: Access::Fetch, .. }, .. }
        ));
    }

    #[test]
    fn test_loop_hits_the_cache() {
        // Count a1 down to zero
        let mut m = machine(&[
            addi(REG_A1, REG_A1, -1),
            Instruction::Branch { cond: BranchCond::Ne, rs1: REG_A1, rs2: REG_ZERO, offset: -4 },
            Instruction::Jalr { rd: REG_ZERO, rs1: REG_RA, offset: 0 },
        ]);
        m.set_register(REG_A1, 10);
        m.run().unwrap();

        let stats = m.cache_stats();
        assert_eq!(stats.misses, 3);
        assert_eq!(stats.lookups(), m.counters().instructions);
        assert_eq!(m.counters().instructions, 21);
    }
}
