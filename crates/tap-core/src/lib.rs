//! Test-access-port protocol engine.
//!
//! Models an IEEE 1149.1 TAP controller extended with an
//! instruction-driven memory-access channel and an IEEE 1687-style
//! instrument-access network. Everything advances synchronously once per
//! protocol tick; collaborators (memory responder, boundary cells,
//! instruments) live behind trait and accessor seams.

/// Error taxonomy types latched on the per-tick output word.
pub mod error;
pub use error::{error_code_bits, ErrorClass, ErrorCode};

/// Serial shift-register primitive shared by every scan path.
pub mod shift;
pub use shift::ShiftRegister;

/// TAP controller FSM and reset arbitration.
pub mod tap;
pub use tap::{
    TapController, TapState, SOFT_RESET_SATURATION, SOFT_RESET_THRESHOLD, TAP_STATE_COUNT,
};

/// Instruction register path with validated commit.
pub mod instruction;
pub use instruction::{
    CommitOutcome, Instruction, InstructionUnit, IR_CAPTURE_PATTERN, IR_WIDTH, OPCODE_COUNT,
};

/// Instruction-selected data-register bank and bit-field helpers.
pub mod registers;
pub use registers::{
    debug_word_error_bits, debug_word_tap_state_bits, memory_word_address, memory_word_data,
    pack_debug_word, pack_memory_word, CaptureContext, DataRegisterBank, DrUpdate, BOUNDARY_WIDTH,
    MEMORY_PATH_WIDTH,
};

/// Bounded request/response memory-access channel.
pub mod memory_channel;
pub use memory_channel::{
    ChannelEvent, CompletionStatus, MemoryAccessChannel, MemoryCompletion, MemoryRequest,
    MemoryResponder, RequestOutcome, DEFAULT_MEMORY_TIMEOUT_TICKS, MEMORY_POISON_WORD,
};

/// IEEE 1687-style instrument-access network.
pub mod network;
pub use network::{
    network_segment_data, network_segment_select, pack_network_capture, InstrumentNetwork,
    InstrumentPort, NETWORK_PATH_WIDTH,
};

/// Top-level protocol engine and host-facing surface.
pub mod engine;
#[cfg(feature = "serde")]
pub use engine::{EngineSnapshot, SnapshotVersion};
pub use engine::{
    EngineConfig, PhaseGating, ProtocolEngine, TickInput, TickOutput, TraceEvent, TraceSink,
    DEFAULT_IDCODE, DEFAULT_MEMORY_BASE, DEFAULT_MEMORY_SIZE,
};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
