//! Instruction-selected data-register bank.
//!
//! Dispatch is keyed by the committed instruction and evaluated fresh on
//! every capture/shift/update event; there is no mode latch beyond the
//! instruction register itself. The instrument-network path is a separate
//! component and is routed around this bank by the engine.

use crate::instruction::Instruction;
use crate::memory_channel::MemoryRequest;
use crate::shift::ShiftRegister;

/// Boundary register width in bits.
pub const BOUNDARY_WIDTH: u32 = 8;

/// Memory scan-path width in bits (`{address:32, data:32}`).
pub const MEMORY_PATH_WIDTH: u32 = 64;

/// Packs a memory scan word: address in bits 63:32, data in bits 31:0.
#[must_use]
pub const fn pack_memory_word(address: u32, data: u32) -> u64 {
    ((address as u64) << 32) | data as u64
}

/// Extracts the address field (bits 63:32) of a memory scan word.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn memory_word_address(word: u64) -> u32 {
    (word >> 32) as u32
}

/// Extracts the data field (bits 31:0) of a memory scan word.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn memory_word_data(word: u64) -> u32 {
    word as u32
}

/// Packs the debug snapshot: `{error_code:8, reserved:8, tap_state:4,
/// reserved:12}` from the most-significant bit down.
#[must_use]
pub const fn pack_debug_word(error_bits: u8, tap_state_bits: u8) -> u32 {
    ((error_bits as u32) << 24) | (((tap_state_bits & 0xF) as u32) << 12)
}

/// Extracts the error-code field (bits 31:24) of a debug snapshot.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn debug_word_error_bits(word: u32) -> u8 {
    (word >> 24) as u8
}

/// Extracts the TAP-state field (bits 15:12) of a debug snapshot.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn debug_word_tap_state_bits(word: u32) -> u8 {
    ((word >> 12) & 0xF) as u8
}

/// Capture-time context supplied by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureContext {
    /// External boundary-input sample.
    pub boundary_in: u8,
    /// Last completed memory response word (or the poison value).
    pub memory_response: u32,
    /// Packed debug snapshot for the current tick.
    pub debug_word: u32,
}

/// Side effect committed by a data-register update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrUpdate {
    /// No committable side effect (IDCODE, BYPASS, debug snapshot).
    None,
    /// Shifted value latched for the boundary-scan collaborator.
    BoundaryCommit {
        /// New boundary output latch value.
        value: u8,
    },
    /// Memory request assembled from the shifted address/data fields.
    MemoryRequest(MemoryRequest),
}

/// The data registers selected by the committed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DataRegisterBank {
    idcode: u32,
    bypass: ShiftRegister<1>,
    identity_path: ShiftRegister<32>,
    boundary: ShiftRegister<8>,
    boundary_output: u8,
    memory_path: ShiftRegister<64>,
    debug_path: ShiftRegister<32>,
}

impl DataRegisterBank {
    /// Creates a bank exposing `idcode` as the 32-bit identity value.
    #[must_use]
    pub const fn new(idcode: u32) -> Self {
        Self {
            idcode,
            bypass: ShiftRegister::new(),
            identity_path: ShiftRegister::new(),
            boundary: ShiftRegister::new(),
            boundary_output: 0,
            memory_path: ShiftRegister::new(),
            debug_path: ShiftRegister::new(),
        }
    }

    /// Returns the configured identity value.
    #[must_use]
    pub const fn idcode(&self) -> u32 {
        self.idcode
    }

    /// Returns the committed boundary output latch.
    #[must_use]
    pub const fn boundary_output(&self) -> u8 {
        self.boundary_output
    }

    /// Capture phase for the register selected by `instruction`.
    pub const fn capture(&mut self, instruction: Instruction, ctx: &CaptureContext) {
        match instruction {
            Instruction::Idcode => self.identity_path.load(self.idcode as u64),
            Instruction::Extest | Instruction::SampleOrPreload | Instruction::Intest => {
                self.boundary.load(ctx.boundary_in as u64);
            }
            Instruction::MemRead | Instruction::MemWrite => {
                self.memory_path.load(ctx.memory_response as u64);
            }
            Instruction::DebugAccess => self.debug_path.load(ctx.debug_word as u64),
            // BYPASS captures a fixed zero.
            Instruction::Bypass | Instruction::NetworkSelect => self.bypass.load(0),
        }
    }

    /// Shift phase for the register selected by `instruction`.
    pub const fn shift(&mut self, instruction: Instruction, bit_in: bool) -> bool {
        match instruction {
            Instruction::Idcode => self.identity_path.shift(bit_in),
            Instruction::Extest | Instruction::SampleOrPreload | Instruction::Intest => {
                self.boundary.shift(bit_in)
            }
            Instruction::MemRead | Instruction::MemWrite => self.memory_path.shift(bit_in),
            Instruction::DebugAccess => self.debug_path.shift(bit_in),
            Instruction::Bypass | Instruction::NetworkSelect => self.bypass.shift(bit_in),
        }
    }

    /// Update phase: returns the committed side effect, if any.
    pub const fn update(&mut self, instruction: Instruction) -> DrUpdate {
        match instruction {
            Instruction::Extest | Instruction::SampleOrPreload | Instruction::Intest => {
                // Width is 8, so the truncation is lossless.
                #[allow(clippy::cast_possible_truncation)]
                {
                    self.boundary_output = self.boundary.value() as u8;
                }
                DrUpdate::BoundaryCommit {
                    value: self.boundary_output,
                }
            }
            Instruction::MemRead | Instruction::MemWrite => {
                let word = self.memory_path.value();
                DrUpdate::MemoryRequest(MemoryRequest {
                    address: memory_word_address(word),
                    data: memory_word_data(word),
                    is_write: instruction.is_memory_write(),
                })
            }
            Instruction::Idcode
            | Instruction::DebugAccess
            | Instruction::Bypass
            | Instruction::NetworkSelect => DrUpdate::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        debug_word_error_bits, debug_word_tap_state_bits, memory_word_address, memory_word_data,
        pack_debug_word, pack_memory_word, CaptureContext, DataRegisterBank, DrUpdate,
    };
    use crate::instruction::Instruction;

    const TEST_IDCODE: u32 = 0x1234_5677;

    fn quiet_context() -> CaptureContext {
        CaptureContext {
            boundary_in: 0,
            memory_response: 0,
            debug_word: 0,
        }
    }

    fn shift_in_u64(bank: &mut DataRegisterBank, instruction: Instruction, value: u64, bits: u32) {
        for i in 0..bits {
            bank.shift(instruction, (value >> i) & 1 != 0);
        }
    }

    fn shift_out_u64(bank: &mut DataRegisterBank, instruction: Instruction, bits: u32) -> u64 {
        let mut value = 0_u64;
        for i in 0..bits {
            if bank.shift(instruction, false) {
                value |= 1 << i;
            }
        }
        value
    }

    #[test]
    fn memory_word_packing_roundtrip() {
        let word = pack_memory_word(0x0000_0100, 0xDEAD_BEEF);
        assert_eq!(word, 0x0000_0100_DEAD_BEEF);
        assert_eq!(memory_word_address(word), 0x0000_0100);
        assert_eq!(memory_word_data(word), 0xDEAD_BEEF);
    }

    #[test]
    fn debug_word_field_layout() {
        let word = pack_debug_word(0x03, 0x4);
        assert_eq!(word, 0x0300_4000);
        assert_eq!(debug_word_error_bits(word), 0x03);
        assert_eq!(debug_word_tap_state_bits(word), 0x4);

        // Upper nibble of the state argument is masked off.
        assert_eq!(debug_word_tap_state_bits(pack_debug_word(0, 0xF7)), 0x7);
    }

    #[test]
    fn idcode_scan_reads_out_the_identity_value() {
        let mut bank = DataRegisterBank::new(TEST_IDCODE);
        bank.capture(Instruction::Idcode, &quiet_context());

        let value = shift_out_u64(&mut bank, Instruction::Idcode, 32);
        assert_eq!(value, u64::from(TEST_IDCODE));
    }

    #[test]
    fn bypass_is_a_single_bit_delay_and_captures_zero() {
        let mut bank = DataRegisterBank::new(TEST_IDCODE);
        bank.capture(Instruction::Bypass, &quiet_context());

        assert!(!bank.shift(Instruction::Bypass, true));
        assert!(bank.shift(Instruction::Bypass, false));
    }

    #[test]
    fn boundary_scan_samples_input_and_commits_output() {
        let mut bank = DataRegisterBank::new(TEST_IDCODE);
        let ctx = CaptureContext {
            boundary_in: 0xC3,
            ..quiet_context()
        };

        bank.capture(Instruction::SampleOrPreload, &ctx);
        let sampled = shift_out_u64(&mut bank, Instruction::SampleOrPreload, 8);
        assert_eq!(sampled, 0xC3);

        // The 8 zero bits shifted while reading also replaced the content.
        shift_in_u64(&mut bank, Instruction::SampleOrPreload, 0x5A, 8);
        assert_eq!(
            bank.update(Instruction::SampleOrPreload),
            DrUpdate::BoundaryCommit { value: 0x5A }
        );
        assert_eq!(bank.boundary_output(), 0x5A);
    }

    #[test]
    fn memory_scan_update_assembles_the_request() {
        let mut bank = DataRegisterBank::new(TEST_IDCODE);
        bank.capture(Instruction::MemWrite, &quiet_context());

        let word = pack_memory_word(0x0000_0100, 0xDEAD_BEEF);
        shift_in_u64(&mut bank, Instruction::MemWrite, word, 64);

        match bank.update(Instruction::MemWrite) {
            DrUpdate::MemoryRequest(request) => {
                assert_eq!(request.address, 0x0000_0100);
                assert_eq!(request.data, 0xDEAD_BEEF);
                assert!(request.is_write);
            }
            other => panic!("expected a memory request, got {other:?}"),
        }
    }

    #[test]
    fn memory_capture_loads_response_into_low_word() {
        let mut bank = DataRegisterBank::new(TEST_IDCODE);
        let ctx = CaptureContext {
            memory_response: 0xCAFE_F00D,
            ..quiet_context()
        };

        bank.capture(Instruction::MemRead, &ctx);
        let word = shift_out_u64(&mut bank, Instruction::MemRead, 64);
        assert_eq!(memory_word_data(word), 0xCAFE_F00D);
        assert_eq!(memory_word_address(word), 0);
    }

    #[test]
    fn debug_scan_is_read_only() {
        let mut bank = DataRegisterBank::new(TEST_IDCODE);
        let ctx = CaptureContext {
            debug_word: pack_debug_word(0x04, 0x3),
            ..quiet_context()
        };

        bank.capture(Instruction::DebugAccess, &ctx);
        shift_in_u64(&mut bank, Instruction::DebugAccess, u64::MAX, 32);
        assert_eq!(bank.update(Instruction::DebugAccess), DrUpdate::None);
    }

    #[test]
    fn idcode_update_has_no_side_effect() {
        let mut bank = DataRegisterBank::new(TEST_IDCODE);
        assert_eq!(bank.update(Instruction::Idcode), DrUpdate::None);
        assert_eq!(bank.update(Instruction::Bypass), DrUpdate::None);
    }
}
