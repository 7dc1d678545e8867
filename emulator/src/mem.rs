//! Emulated memory
//!
//! The address space holds two segments:
//!
//! * the code segment, placed by the loader at the image base address. It holds the
//!   instruction stream and any program data, and is read-only for the emulated program.
//! * the stack segment, `stack_size` bytes ending at `stack_top` (exclusive).
//!
//! Everything else is unmapped. Accesses are little-endian and must fall entirely inside
//! one segment; data accesses need no alignment.

use rvemu_riscv::{Instruction, Width};
use tracing::debug;

use crate::{Access, EmuError, EmuOptions, MemoryError, MAX_STACK_SIZE, STOP_ADDR};

/// A program image as placed by the loader: raw bytes at a base address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    base: u64,
    bytes: Vec<u8>,
}

impl ProgramImage {
    /// Build an image from instruction words
    pub fn from_words(base: u64, words: &[u32]) -> Self {
        let bytes = words.iter().flat_map(|word| word.to_le_bytes()).collect();
        Self { base, bytes }
    }

    /// Build an image from a raw little-endian byte stream
    pub fn from_bytes(base: u64, bytes: Vec<u8>) -> Result<Self, EmuError> {
        if bytes.len() % Instruction::size() != 0 {
            return Err(EmuError::InvalidConfig(format!(
                "program image length {} is not a multiple of {}",
                bytes.len(),
                Instruction::size()
            )));
        }
        Ok(Self { base, bytes })
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Source of instruction words for the instruction cache
pub trait InstructionSource {
    /// Read the 32-bit instruction word at `addr`
    fn fetch_word(&self, addr: u64) -> Result<u32, MemoryError>;
}

/// Bounds-checked emulated memory
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    code_base: u64,
    code: Vec<u8>,
    stack_base: u64,
    stack: Vec<u8>,
}

impl MemoryRegion {
    /// Lay out the code and stack segments
    pub fn new(image: &ProgramImage, options: &EmuOptions) -> Result<Self, EmuError> {
        if image.base % Instruction::size() as u64 != 0 {
            return Err(invalid(format!("code base {:#x} is not 4-byte aligned", image.base)));
        }
        let Some(code_end) = image.base.checked_add(image.len() as u64) else {
            return Err(invalid(format!(
                "code segment at {:#x} overflows the address space",
                image.base
            )));
        };
        if options.stack_size == 0 {
            return Err(invalid("stack size must not be zero".to_string()));
        }
        if options.stack_size > MAX_STACK_SIZE {
            return Err(invalid(format!(
                "stack size {} exceeds the maximum of {MAX_STACK_SIZE} bytes",
                options.stack_size
            )));
        }
        let Some(stack_base) = options.stack_top.checked_sub(options.stack_size as u64) else {
            return Err(invalid(format!(
                "stack of {} bytes does not fit below {:#x}",
                options.stack_size, options.stack_top
            )));
        };
        if image.base < options.stack_top && stack_base < code_end {
            return Err(invalid(format!(
                "code segment [{:#x}, {code_end:#x}) overlaps stack segment \
                 [{stack_base:#x}, {:#x})",
                image.base, options.stack_top
            )));
        }
        if (image.base..code_end).contains(&STOP_ADDR)
            || (stack_base..options.stack_top).contains(&STOP_ADDR)
        {
            return Err(invalid(format!("the stop address {STOP_ADDR:#x} must not be mapped")));
        }

        debug!(
            "Memory layout: code [{:#x}, {code_end:#x}) stack [{stack_base:#x}, {:#x})",
            image.base, options.stack_top
        );

        Ok(Self {
            code_base: image.base,
            code: image.bytes.clone(),
            stack_base,
            stack: vec![0; options.stack_size],
        })
    }

    pub fn code_base(&self) -> u64 {
        self.code_base
    }

    /// Initial stack pointer: one past the highest stack byte
    pub fn stack_top(&self) -> u64 {
        self.stack_base + self.stack.len() as u64
    }

    /// Read `width` bytes at `addr`, zero-extended to 64 bits
    pub fn load(&self, addr: u64, width: Width) -> Result<u64, MemoryError> {
        let bytes = self.read_slice(addr, width.bytes(), Access::Load)?;
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Write the low `width` bytes of `value` at `addr`
    pub fn store(&mut self, addr: u64, width: Width, value: u64) -> Result<(), MemoryError> {
        let len = width.bytes();
        if offset_in(self.code_base, self.code.len(), addr, len).is_some() {
            return Err(MemoryError::ReadOnly { addr, width: len });
        }
        let Some(offset) = offset_in(self.stack_base, self.stack.len(), addr, len) else {
            return Err(MemoryError::OutOfBounds { access: Access::Store, addr, width: len });
        };

        let len = len as usize;
        self.stack[offset..offset + len].copy_from_slice(&value.to_le_bytes()[..len]);
        Ok(())
    }

    fn read_slice(&self, addr: u64, len: u64, access: Access) -> Result<&[u8], MemoryError> {
        let (segment, offset) =
            if let Some(offset) = offset_in(self.code_base, self.code.len(), addr, len) {
                (&self.code, offset)
            } else if let Some(offset) = offset_in(self.stack_base, self.stack.len(), addr, len) {
                (&self.stack, offset)
            } else {
                return Err(MemoryError::OutOfBounds { access, addr, width: len });
            };
        Ok(&segment[offset..offset + len as usize])
    }
}

impl InstructionSource for MemoryRegion {
    /// Instructions are only fetched from the code segment
    fn fetch_word(&self, addr: u64) -> Result<u32, MemoryError> {
        if addr % Instruction::size() as u64 != 0 {
            return Err(MemoryError::MisalignedFetch { addr });
        }
        let len = Instruction::size() as u64;
        let Some(offset) = offset_in(self.code_base, self.code.len(), addr, len) else {
            return Err(MemoryError::OutOfBounds { access: Access::Fetch, addr, width: len });
        };

        let mut word = [0u8; 4];
        word.copy_from_slice(&self.code[offset..offset + 4]);
        Ok(u32::from_le_bytes(word))
    }
}

fn invalid(msg: String) -> EmuError {
    EmuError::InvalidConfig(msg)
}

/// Offset of `[addr, addr + len)` inside the segment `[base, base + size)`, if it fits
fn offset_in(base: u64, size: usize, addr: u64, len: u64) -> Option<usize> {
    let offset = addr.checked_sub(base)?;
    let end = offset.checked_add(len)?;
    (end <= size as u64).then_some(offset as usize)
}
