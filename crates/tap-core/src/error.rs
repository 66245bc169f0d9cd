use thiserror::Error;

/// Error classes used for latch-clearing policy decisions.
///
/// At most one error is latched at a time; a latched error is cleared only
/// by a successful outcome of the same class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ErrorClass {
    /// Instruction-register commit path violation.
    Instruction,
    /// Memory-access channel violation.
    Memory,
}

/// Stable error taxonomy surfaced on the per-tick output word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum ErrorCode {
    /// Memory request targeted an address outside the configured window.
    #[error("memory address outside configured window")]
    InvalidAddress = 0x01,
    /// Memory responder did not complete within the timeout bound.
    #[error("memory request timed out")]
    MemoryTimeout = 0x02,
    /// Memory responder explicitly signaled failure.
    #[error("memory responder signaled error")]
    MemoryError = 0x03,
    /// Unrecognized opcode was committed; BYPASS was substituted.
    #[error("invalid instruction opcode committed")]
    InvalidInstruction = 0x04,
    /// Memory responder denied the access at its gating level.
    #[error("memory access denied by responder")]
    AccessDenied = 0x05,
}

impl ErrorCode {
    /// Converts an error code to the stable low-byte value exposed in the
    /// debug-snapshot register.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts the stable low-byte value back into an error code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::InvalidAddress),
            0x02 => Some(Self::MemoryTimeout),
            0x03 => Some(Self::MemoryError),
            0x04 => Some(Self::InvalidInstruction),
            0x05 => Some(Self::AccessDenied),
            _ => None,
        }
    }

    /// Returns the latch-clearing class for this error code.
    #[must_use]
    pub const fn class(self) -> ErrorClass {
        match self {
            Self::InvalidInstruction => ErrorClass::Instruction,
            Self::InvalidAddress
            | Self::MemoryTimeout
            | Self::MemoryError
            | Self::AccessDenied => ErrorClass::Memory,
        }
    }
}

/// Converts an optional latched error to its 8-bit diagnostic encoding.
///
/// `0x00` means no error is latched.
#[must_use]
pub const fn error_code_bits(error: Option<ErrorCode>) -> u8 {
    match error {
        Some(code) => code.as_u8(),
        None => 0x00,
    }
}
