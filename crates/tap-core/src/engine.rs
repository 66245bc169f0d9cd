//! Top-level protocol engine: per-tick evaluation order and host surface.
//!
//! One engine instance owns all protocol state exclusively. Daisy-chained
//! devices are independent instances wired `serial_out -> serial_in` by
//! the host; there is no cross-instance state.

use crate::error::{error_code_bits, ErrorClass, ErrorCode};
use crate::instruction::{CommitOutcome, Instruction, InstructionUnit};
use crate::memory_channel::{
    ChannelEvent, MemoryAccessChannel, MemoryRequest, MemoryResponder, RequestOutcome,
};
use crate::network::{InstrumentNetwork, InstrumentPort};
use crate::registers::{pack_debug_word, CaptureContext, DataRegisterBank, DrUpdate};
use crate::tap::{TapController, TapState};

/// Default 32-bit identity value (LSB fixed at 1 per the standard).
pub const DEFAULT_IDCODE: u32 = 0x1234_5677;

/// Default memory window base address.
pub const DEFAULT_MEMORY_BASE: u32 = 0x0000_0100;

/// Default memory window size in bytes.
pub const DEFAULT_MEMORY_SIZE: u32 = 0x0000_1000;

/// Top-level immutable configuration for an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EngineConfig {
    /// Identity value exposed by the IDCODE register.
    pub idcode: u32,
    /// Memory window base address.
    pub memory_base: u32,
    /// Memory window size in bytes.
    pub memory_size: u32,
    /// Timeout bound in ticks for a pending memory request.
    pub memory_timeout_ticks: u32,
    /// Enables deterministic trace callback dispatch.
    pub tracing_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idcode: DEFAULT_IDCODE,
            memory_base: DEFAULT_MEMORY_BASE,
            memory_size: DEFAULT_MEMORY_SIZE,
            memory_timeout_ticks: crate::memory_channel::DEFAULT_MEMORY_TIMEOUT_TICKS,
            tracing_enabled: false,
        }
    }
}

/// Per-tick serial-line input sampled once per protocol tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TickInput {
    /// Mode-select bit steering the FSM.
    pub mode_select: bool,
    /// Serial data-in bit consumed during shift phases.
    pub serial_in: bool,
    /// Explicit external reset; dominates every other input.
    pub external_reset: bool,
}

/// Per-tick output word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TickOutput {
    /// Serial data-out bit; meaningful only during shift phases.
    pub serial_out: bool,
    /// TAP controller state after this tick.
    pub tap_state: TapState,
    /// Instruction used for data-register dispatch.
    pub committed_instruction: Instruction,
    /// Latched error, if any.
    pub error_code: Option<ErrorCode>,
}

/// Phase-gating signals delivered to the external scan collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PhaseGating {
    /// Data-register capture phase is active.
    pub capture: bool,
    /// Data-register shift phase is active.
    pub shift: bool,
    /// Data-register update phase is active.
    pub update: bool,
}

/// Deterministic trace events emitted at tick boundaries when enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    /// FSM left one state for another.
    StateChanged {
        /// State before the tick.
        from: TapState,
        /// State after the tick.
        to: TapState,
    },
    /// A validated opcode was committed on instruction update.
    InstructionCommitted {
        /// The committed opcode.
        instruction: Instruction,
    },
    /// An unrecognized opcode was replaced by the fail-safe BYPASS.
    InstructionRejected {
        /// Raw 4-bit value that failed validation.
        raw_bits: u8,
    },
    /// A memory request passed validation and was issued.
    MemoryRequestIssued {
        /// The issued request.
        request: MemoryRequest,
    },
    /// The pending memory request completed successfully.
    MemoryRequestCompleted {
        /// Data returned by the responder.
        read_data: u32,
    },
    /// The pending memory request failed or timed out.
    MemoryRequestFaulted {
        /// Classified failure cause.
        cause: ErrorCode,
    },
    /// An error code was latched.
    ErrorLatched {
        /// The newly latched error.
        cause: ErrorCode,
    },
}

/// Sink trait for deterministic trace hooks.
pub trait TraceSink {
    /// Records an event in tick order.
    fn on_event(&mut self, event: TraceEvent);
}

struct NopTraceSink;

impl TraceSink for NopTraceSink {
    fn on_event(&mut self, _event: TraceEvent) {}
}

/// Stable snapshot wire-version identifiers.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[repr(u16)]
pub enum SnapshotVersion {
    /// Initial schema revision for tap-core v0.1.x.
    V1 = 1,
}

/// Serializable full-state snapshot; an implementation convenience, not a
/// protocol contract.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct EngineSnapshot {
    /// Snapshot schema version.
    pub version: SnapshotVersion,
    /// Full engine state.
    pub engine: ProtocolEngine,
}

/// The protocol engine: TAP controller, instruction unit, data-register
/// bank, memory channel, and instrument network, advanced synchronously
/// once per tick.
///
/// Evaluation order within a tick is fixed: (1) TAP transition with reset
/// arbitration, (2) capture/shift/update dispatch on the instruction and
/// data registers, (3) memory-channel bookkeeping. A tick is atomic from
/// the caller's perspective and never panics.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ProtocolEngine {
    config: EngineConfig,
    tap: TapController,
    instruction_unit: InstructionUnit,
    bank: DataRegisterBank,
    channel: MemoryAccessChannel,
    network: InstrumentNetwork,
    error: Option<ErrorCode>,
    boundary_input: u8,
    instrument_status_in: u8,
}

impl Default for ProtocolEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ProtocolEngine {
    /// Creates an engine in `TestLogicReset` with `Idcode` committed.
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self {
            config,
            tap: TapController::new(),
            instruction_unit: InstructionUnit::new(),
            bank: DataRegisterBank::new(config.idcode),
            channel: MemoryAccessChannel::new(
                config.memory_base,
                config.memory_size,
                config.memory_timeout_ticks,
            ),
            network: InstrumentNetwork::new(),
            error: None,
            boundary_input: 0,
            instrument_status_in: 0,
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the current TAP state.
    #[must_use]
    pub const fn tap_state(&self) -> TapState {
        self.tap.state()
    }

    /// Derived per-state indicator.
    #[must_use]
    pub const fn state_indicator(&self, state: TapState) -> bool {
        self.tap.indicator(state)
    }

    /// Returns the committed instruction.
    #[must_use]
    pub const fn committed_instruction(&self) -> Instruction {
        self.instruction_unit.committed()
    }

    /// Returns the latched error, if any.
    #[must_use]
    pub const fn error_code(&self) -> Option<ErrorCode> {
        self.error
    }

    /// Returns `true` while a memory request is outstanding.
    #[must_use]
    pub const fn memory_pending(&self) -> bool {
        self.channel.pending()
    }

    /// Latches the external boundary-input lines sampled on capture.
    pub const fn set_boundary_input(&mut self, value: u8) {
        self.boundary_input = value;
    }

    /// Returns the committed boundary output latch for the cell array.
    #[must_use]
    pub const fn boundary_output(&self) -> u8 {
        self.bank.boundary_output()
    }

    /// Latches the status byte supplied by the addressed instrument.
    pub const fn set_instrument_status(&mut self, value: u8) {
        self.instrument_status_in = value;
    }

    /// Derived outputs to the addressed instrument; zeroed while the
    /// network is not selected.
    #[must_use]
    pub const fn instrument_port(&self) -> InstrumentPort {
        self.network.port(self.network_selected())
    }

    /// `true` while the committed instruction selects the instrument
    /// network scan path.
    #[must_use]
    pub const fn network_selected(&self) -> bool {
        matches!(self.instruction_unit.committed(), Instruction::NetworkSelect)
    }

    /// Wrapper-select signal for the IEEE 1500-style core wrapper.
    #[must_use]
    pub const fn wrapper_select(&self) -> bool {
        matches!(self.instruction_unit.committed(), Instruction::Intest)
    }

    /// Phase gating for the boundary-scan cell array and core wrapper.
    #[must_use]
    pub const fn dr_phase_gating(&self) -> PhaseGating {
        PhaseGating {
            capture: self.tap.indicator(TapState::CaptureDr),
            shift: self.tap.indicator(TapState::ShiftDr),
            update: self.tap.indicator(TapState::UpdateDr),
        }
    }

    /// Advances the engine by one protocol tick.
    pub fn tick<R: MemoryResponder>(&mut self, input: TickInput, responder: &mut R) -> TickOutput {
        self.tick_traced(input, responder, &mut NopTraceSink)
    }

    /// Advances the engine by one protocol tick, reporting trace events to
    /// `sink` when tracing is enabled in the configuration.
    pub fn tick_traced<R: MemoryResponder, S: TraceSink>(
        &mut self,
        input: TickInput,
        responder: &mut R,
        sink: &mut S,
    ) -> TickOutput {
        let previous_state = self.tap.state();
        let state = self.tap.tick(input.mode_select, input.external_reset);

        if self.config.tracing_enabled && state != previous_state {
            sink.on_event(TraceEvent::StateChanged {
                from: previous_state,
                to: state,
            });
        }

        if input.external_reset {
            // Cancel the aborted operation's pending and error state.
            self.channel.cancel();
            self.network.reset();
            self.error = None;
        }
        if matches!(state, TapState::TestLogicReset) {
            self.instruction_unit.reset();
        }

        let serial_out = self.dispatch_scan_phase(state, input.serial_in, responder, sink);

        if let Some(event) = self.channel.tick(responder) {
            self.apply_channel_event(event, sink);
        }

        TickOutput {
            serial_out,
            tap_state: state,
            committed_instruction: self.instruction_unit.committed(),
            error_code: self.error,
        }
    }

    fn dispatch_scan_phase<R: MemoryResponder, S: TraceSink>(
        &mut self,
        state: TapState,
        serial_in: bool,
        responder: &mut R,
        sink: &mut S,
    ) -> bool {
        let committed = self.instruction_unit.committed();
        match state {
            TapState::CaptureIr => {
                self.instruction_unit.capture();
                false
            }
            TapState::ShiftIr => self.instruction_unit.shift(serial_in),
            TapState::UpdateIr => {
                let outcome = self.instruction_unit.update();
                self.apply_commit_outcome(outcome, sink);
                false
            }
            TapState::CaptureDr => {
                if self.network_selected() {
                    self.network.capture(self.instrument_status_in);
                } else {
                    let ctx = CaptureContext {
                        boundary_in: self.boundary_input,
                        memory_response: self.channel.last_response_word(),
                        debug_word: pack_debug_word(error_code_bits(self.error), state.bits()),
                    };
                    self.bank.capture(committed, &ctx);
                }
                false
            }
            TapState::ShiftDr => {
                if self.network_selected() {
                    self.network.shift(serial_in)
                } else {
                    self.bank.shift(committed, serial_in)
                }
            }
            TapState::UpdateDr => {
                if self.network_selected() {
                    self.network.update();
                } else {
                    let update = self.bank.update(committed);
                    self.apply_dr_update(update, responder, sink);
                }
                false
            }
            TapState::TestLogicReset
            | TapState::RunTestIdle
            | TapState::SelectDrScan
            | TapState::Exit1Dr
            | TapState::PauseDr
            | TapState::Exit2Dr
            | TapState::SelectIrScan
            | TapState::Exit1Ir
            | TapState::PauseIr
            | TapState::Exit2Ir => false,
        }
    }

    fn apply_commit_outcome<S: TraceSink>(&mut self, outcome: CommitOutcome, sink: &mut S) {
        match outcome {
            CommitOutcome::Committed(instruction) => {
                if self
                    .error
                    .is_some_and(|code| code.class() == ErrorClass::Instruction)
                {
                    self.error = None;
                }
                if self.config.tracing_enabled {
                    sink.on_event(TraceEvent::InstructionCommitted { instruction });
                }
            }
            CommitOutcome::Rejected { raw_bits } => {
                self.latch_error(ErrorCode::InvalidInstruction, sink);
                if self.config.tracing_enabled {
                    sink.on_event(TraceEvent::InstructionRejected { raw_bits });
                }
            }
        }
    }

    fn apply_dr_update<R: MemoryResponder, S: TraceSink>(
        &mut self,
        update: DrUpdate,
        responder: &mut R,
        sink: &mut S,
    ) {
        match update {
            DrUpdate::MemoryRequest(request) => {
                match self.channel.begin(request, responder) {
                    RequestOutcome::Issued => {
                        if self.config.tracing_enabled {
                            sink.on_event(TraceEvent::MemoryRequestIssued { request });
                        }
                    }
                    RequestOutcome::Rejected(code) => self.latch_error(code, sink),
                    RequestOutcome::IgnoredPending => {}
                }
            }
            // The boundary latch is held by the bank and read by the
            // collaborator through `boundary_output`.
            DrUpdate::BoundaryCommit { .. } | DrUpdate::None => {}
        }
    }

    fn apply_channel_event<S: TraceSink>(&mut self, event: ChannelEvent, sink: &mut S) {
        match event {
            ChannelEvent::Completed { read_data } => {
                if self
                    .error
                    .is_some_and(|code| code.class() == ErrorClass::Memory)
                {
                    self.error = None;
                }
                if self.config.tracing_enabled {
                    sink.on_event(TraceEvent::MemoryRequestCompleted { read_data });
                }
            }
            ChannelEvent::Faulted(cause) => {
                self.latch_error(cause, sink);
                if self.config.tracing_enabled {
                    sink.on_event(TraceEvent::MemoryRequestFaulted { cause });
                }
            }
        }
    }

    fn latch_error<S: TraceSink>(&mut self, cause: ErrorCode, sink: &mut S) {
        self.error = Some(cause);
        if self.config.tracing_enabled {
            sink.on_event(TraceEvent::ErrorLatched { cause });
        }
    }

    /// Captures a versioned full-state snapshot.
    #[cfg(feature = "serde")]
    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            version: SnapshotVersion::V1,
            engine: self.clone(),
        }
    }

    /// Restores an engine from a snapshot.
    #[cfg(feature = "serde")]
    #[must_use]
    pub fn restore(snapshot: EngineSnapshot) -> Self {
        snapshot.engine
    }
}
