use super::Format;

/// Decoder errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported opcode {opcode:#09b} in instruction word {word:#010x}")]
    UnknownOpcode { opcode: u8, word: u32 },

    #[error(
        "unsupported {format} funct3={funct3:#05b} funct7={funct7:#09b} \
         in instruction word {word:#010x}"
    )]
    UnsupportedFunction { format: Format, funct3: u8, funct7: u8, word: u32 },
}
