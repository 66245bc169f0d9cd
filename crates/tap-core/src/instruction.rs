//! Instruction register: opcode table, shift path, validated commit.

use crate::shift::ShiftRegister;

/// Instruction register width in bits.
pub const IR_WIDTH: u32 = 4;

/// Fixed diagnostic pattern loaded on every instruction capture.
///
/// The two least-significant bits are the standard-mandated `01`.
pub const IR_CAPTURE_PATTERN: u8 = 0b0101;

/// Number of validated opcodes.
pub const OPCODE_COUNT: usize = 9;

/// Validated 4-bit instruction opcodes.
///
/// Any other shifted-in value fail-safes to `Bypass` on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Instruction {
    /// Drive the boundary output latch onto the pins.
    Extest = 0b0000,
    /// Sample boundary inputs and preload the output latch.
    SampleOrPreload = 0b0001,
    /// Expose the 32-bit device identity register.
    #[default]
    Idcode = 0b0010,
    /// Core-internal test through the boundary register.
    Intest = 0b0011,
    /// Issue a memory read through the access channel.
    MemRead = 0b0100,
    /// Issue a memory write through the access channel.
    MemWrite = 0b0101,
    /// Expose the read-only debug-snapshot register.
    DebugAccess = 0b0110,
    /// Activate the instrument-access network scan path.
    NetworkSelect = 0b1000,
    /// Single-bit pass-through; also the fail-safe commit target.
    Bypass = 0b1111,
}

impl Instruction {
    /// Ordered list of all validated opcodes.
    pub const ALL: [Self; OPCODE_COUNT] = [
        Self::Extest,
        Self::SampleOrPreload,
        Self::Idcode,
        Self::Intest,
        Self::MemRead,
        Self::MemWrite,
        Self::DebugAccess,
        Self::NetworkSelect,
        Self::Bypass,
    ];

    /// Returns the 4-bit opcode value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decodes a 4-bit opcode, rejecting values outside the validated set.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b0000 => Some(Self::Extest),
            0b0001 => Some(Self::SampleOrPreload),
            0b0010 => Some(Self::Idcode),
            0b0011 => Some(Self::Intest),
            0b0100 => Some(Self::MemRead),
            0b0101 => Some(Self::MemWrite),
            0b0110 => Some(Self::DebugAccess),
            0b1000 => Some(Self::NetworkSelect),
            0b1111 => Some(Self::Bypass),
            _ => None,
        }
    }

    /// Returns `true` for instructions that scan the boundary register.
    #[must_use]
    pub const fn is_boundary(self) -> bool {
        matches!(self, Self::Extest | Self::SampleOrPreload | Self::Intest)
    }

    /// Returns `true` for instructions that scan the memory-access register.
    #[must_use]
    pub const fn is_memory(self) -> bool {
        matches!(self, Self::MemRead | Self::MemWrite)
    }

    /// Returns `true` when the instruction's memory request is a write.
    #[must_use]
    pub const fn is_memory_write(self) -> bool {
        matches!(self, Self::MemWrite)
    }
}

/// Outcome of an instruction-update commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitOutcome {
    /// The shifted value decoded to a validated opcode and was committed.
    Committed(Instruction),
    /// The shifted value was unrecognized; `Bypass` was committed instead.
    Rejected {
        /// Raw 4-bit value that failed validation.
        raw_bits: u8,
    },
}

/// Instruction register unit: shadow shift path plus committed opcode.
///
/// `committed` is only ever a validated opcode. The fail-safe policy on
/// update never leaves it in an unvalidated state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstructionUnit {
    shadow: ShiftRegister<4>,
    committed: Instruction,
}

impl InstructionUnit {
    /// Creates a unit with `Idcode` committed, matching test-logic-reset.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            shadow: ShiftRegister::new(),
            committed: Instruction::Idcode,
        }
    }

    /// Returns the committed instruction used for data-register dispatch.
    #[must_use]
    pub const fn committed(&self) -> Instruction {
        self.committed
    }

    /// Returns the in-progress shadow value.
    #[must_use]
    // Width is 4, so the truncation is lossless.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn shadow_bits(&self) -> u8 {
        self.shadow.value() as u8
    }

    /// Capture phase: loads the fixed diagnostic pattern, never the
    /// previous instruction.
    pub const fn capture(&mut self) {
        self.shadow.load(IR_CAPTURE_PATTERN as u64);
    }

    /// Shift phase: one serial step through the shadow register.
    pub const fn shift(&mut self, bit_in: bool) -> bool {
        self.shadow.shift(bit_in)
    }

    /// Update phase: validated commit with fail-safe substitution.
    pub const fn update(&mut self) -> CommitOutcome {
        let raw_bits = self.shadow_bits();
        match Instruction::from_bits(raw_bits) {
            Some(instruction) => {
                self.committed = instruction;
                CommitOutcome::Committed(instruction)
            }
            None => {
                self.committed = Instruction::Bypass;
                CommitOutcome::Rejected { raw_bits }
            }
        }
    }

    /// Test-logic-reset entry: the committed instruction reverts to
    /// `Idcode`.
    pub const fn reset(&mut self) {
        self.committed = Instruction::Idcode;
        self.shadow.load(0);
    }
}
