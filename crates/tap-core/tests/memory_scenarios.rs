//! Memory-access channel end-to-end coverage, including the one-scan
//! read latency: a read scan's capture returns the *previous* completed
//! response, because capture precedes the same scan's update.

use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use std::collections::HashMap;

use tap_core::{
    memory_word_data, pack_memory_word, CompletionStatus, EngineConfig, ErrorCode, Instruction,
    MemoryCompletion, MemoryRequest, MemoryResponder, ProtocolEngine, TickInput, TickOutput,
    MEMORY_POISON_WORD,
};

/// Word-addressed memory model completing each request after a fixed
/// number of polls.
struct SramResponder {
    cells: HashMap<u32, u32>,
    outstanding: Option<MemoryRequest>,
    latency: u32,
    polls_left: u32,
    force_status: CompletionStatus,
}

impl SramResponder {
    fn new(latency: u32) -> Self {
        Self {
            cells: HashMap::new(),
            outstanding: None,
            latency,
            polls_left: 0,
            force_status: CompletionStatus::Ok,
        }
    }
}

impl MemoryResponder for SramResponder {
    fn issue(&mut self, request: MemoryRequest) {
        self.outstanding = Some(request);
        self.polls_left = self.latency;
    }

    fn poll(&mut self) -> Option<MemoryCompletion> {
        self.outstanding.as_ref()?;
        if self.polls_left > 0 {
            self.polls_left -= 1;
            return None;
        }
        let request = self.outstanding.take()?;

        if !matches!(self.force_status, CompletionStatus::Ok) {
            return Some(MemoryCompletion {
                status: self.force_status,
                read_data: 0,
            });
        }

        let read_data = if request.is_write {
            self.cells.insert(request.address, request.data);
            0
        } else {
            self.cells.get(&request.address).copied().unwrap_or(0)
        };
        Some(MemoryCompletion {
            status: CompletionStatus::Ok,
            read_data,
        })
    }
}

/// Responder that never completes; used for timeout coverage.
#[derive(Default)]
struct DeadResponder;

impl MemoryResponder for DeadResponder {
    fn issue(&mut self, _request: MemoryRequest) {}

    fn poll(&mut self) -> Option<MemoryCompletion> {
        None
    }
}

fn step<R: MemoryResponder>(
    engine: &mut ProtocolEngine,
    responder: &mut R,
    mode_select: bool,
    serial_in: bool,
) -> TickOutput {
    engine.tick(
        TickInput {
            mode_select,
            serial_in,
            external_reset: false,
        },
        responder,
    )
}

fn scan_instruction<R: MemoryResponder>(
    engine: &mut ProtocolEngine,
    responder: &mut R,
    opcode: u8,
) {
    step(engine, responder, true, false);
    step(engine, responder, true, false);
    step(engine, responder, false, false);
    for i in 0..4 {
        step(engine, responder, false, (opcode >> i) & 1 != 0);
    }
    step(engine, responder, true, false);
    step(engine, responder, true, false);
    step(engine, responder, false, false);
}

fn scan_data<R: MemoryResponder>(
    engine: &mut ProtocolEngine,
    responder: &mut R,
    value: u64,
    bits: u32,
) -> u64 {
    step(engine, responder, true, false);
    step(engine, responder, false, false);
    let mut out = 0_u64;
    for i in 0..bits {
        let output = step(engine, responder, false, (value >> i) & 1 != 0);
        if output.serial_out {
            out |= 1 << i;
        }
    }
    step(engine, responder, true, false);
    step(engine, responder, true, false);
    step(engine, responder, false, false);
    out
}

fn idle_ticks<R: MemoryResponder>(engine: &mut ProtocolEngine, responder: &mut R, ticks: u32) {
    for _ in 0..ticks {
        step(engine, responder, false, false);
    }
}

fn engine_at_idle<R: MemoryResponder>(responder: &mut R) -> ProtocolEngine {
    let mut engine = ProtocolEngine::default();
    step(&mut engine, responder, false, false);
    engine
}

#[test]
fn write_then_read_round_trip_with_one_scan_latency() {
    let mut responder = SramResponder::new(2);
    let mut engine = engine_at_idle(&mut responder);

    // Write 0xDEADBEEF to 0x100 and let the responder complete.
    scan_instruction(&mut engine, &mut responder, Instruction::MemWrite.bits());
    scan_data(
        &mut engine,
        &mut responder,
        pack_memory_word(0x0000_0100, 0xDEAD_BEEF),
        64,
    );
    assert!(engine.memory_pending());
    idle_ticks(&mut engine, &mut responder, 4);
    assert!(!engine.memory_pending());
    assert_eq!(engine.error_code(), None);

    // First read scan: its capture precedes its own update, so the
    // shifted-out word still holds the write completion, not the cell.
    scan_instruction(&mut engine, &mut responder, Instruction::MemRead.bits());
    let stale = scan_data(
        &mut engine,
        &mut responder,
        pack_memory_word(0x0000_0100, 0),
        64,
    );
    assert_ne!(memory_word_data(stale), 0xDEAD_BEEF);
    idle_ticks(&mut engine, &mut responder, 4);

    // Second read scan captures the first read's response.
    let fresh = scan_data(
        &mut engine,
        &mut responder,
        pack_memory_word(0x0000_0100, 0),
        64,
    );
    assert_eq!(memory_word_data(fresh), 0xDEAD_BEEF);
}

#[test]
fn out_of_window_address_is_rejected_before_issue() {
    let mut responder = SramResponder::new(0);
    let mut engine = engine_at_idle(&mut responder);

    scan_instruction(&mut engine, &mut responder, Instruction::MemWrite.bits());

    // Below the window base.
    scan_data(
        &mut engine,
        &mut responder,
        pack_memory_word(0x0000_0000, 0x1111_1111),
        64,
    );
    assert!(!engine.memory_pending());
    assert_eq!(engine.error_code(), Some(ErrorCode::InvalidAddress));
    assert!(responder.outstanding.is_none());
    assert!(responder.cells.is_empty());

    // Above the window end.
    scan_data(
        &mut engine,
        &mut responder,
        pack_memory_word(0xFFFF_FFFF, 0x2222_2222),
        64,
    );
    assert_eq!(engine.error_code(), Some(ErrorCode::InvalidAddress));
    assert!(responder.cells.is_empty());
}

#[test]
fn timeout_aborts_and_latches_memory_timeout() {
    let config = EngineConfig {
        memory_timeout_ticks: 8,
        ..EngineConfig::default()
    };
    let mut responder = DeadResponder;
    let mut engine = ProtocolEngine::new(config);
    step(&mut engine, &mut responder, false, false);

    scan_instruction(&mut engine, &mut responder, Instruction::MemRead.bits());
    scan_data(
        &mut engine,
        &mut responder,
        pack_memory_word(0x0000_0104, 0),
        64,
    );
    assert!(engine.memory_pending());

    idle_ticks(&mut engine, &mut responder, 8);
    assert!(!engine.memory_pending());
    assert_eq!(engine.error_code(), Some(ErrorCode::MemoryTimeout));
}

#[test]
fn responder_error_poisons_the_next_read_capture() {
    let mut responder = SramResponder::new(0);
    let mut engine = engine_at_idle(&mut responder);

    scan_instruction(&mut engine, &mut responder, Instruction::MemRead.bits());
    responder.force_status = CompletionStatus::Error;
    scan_data(
        &mut engine,
        &mut responder,
        pack_memory_word(0x0000_0104, 0),
        64,
    );
    idle_ticks(&mut engine, &mut responder, 2);
    assert_eq!(engine.error_code(), Some(ErrorCode::MemoryError));

    // No new request: all-zero address is out of window, but the capture
    // already carries the poison word.
    responder.force_status = CompletionStatus::Ok;
    let word = scan_data(&mut engine, &mut responder, 0, 64);
    assert_eq!(memory_word_data(word), MEMORY_POISON_WORD);
}

#[test]
fn denied_completion_surfaces_access_denied() {
    let mut responder = SramResponder::new(0);
    let mut engine = engine_at_idle(&mut responder);

    scan_instruction(&mut engine, &mut responder, Instruction::MemWrite.bits());
    responder.force_status = CompletionStatus::Denied;
    scan_data(
        &mut engine,
        &mut responder,
        pack_memory_word(0x0000_0104, 0x3333_3333),
        64,
    );
    idle_ticks(&mut engine, &mut responder, 2);

    assert_eq!(engine.error_code(), Some(ErrorCode::AccessDenied));
    assert!(!engine.memory_pending());
}

#[test]
fn successful_completion_clears_a_latched_memory_error() {
    let mut responder = SramResponder::new(0);
    let mut engine = engine_at_idle(&mut responder);

    scan_instruction(&mut engine, &mut responder, Instruction::MemRead.bits());
    responder.force_status = CompletionStatus::Error;
    scan_data(
        &mut engine,
        &mut responder,
        pack_memory_word(0x0000_0104, 0),
        64,
    );
    idle_ticks(&mut engine, &mut responder, 2);
    assert_eq!(engine.error_code(), Some(ErrorCode::MemoryError));

    responder.force_status = CompletionStatus::Ok;
    scan_data(
        &mut engine,
        &mut responder,
        pack_memory_word(0x0000_0104, 0),
        64,
    );
    idle_ticks(&mut engine, &mut responder, 2);
    assert_eq!(engine.error_code(), None);
}

#[test]
fn memory_write_flag_follows_the_instruction() {
    let mut responder = SramResponder::new(0);
    let mut engine = engine_at_idle(&mut responder);

    scan_instruction(&mut engine, &mut responder, Instruction::MemWrite.bits());
    scan_data(
        &mut engine,
        &mut responder,
        pack_memory_word(0x0000_0108, 0xAABB_CCDD),
        64,
    );
    idle_ticks(&mut engine, &mut responder, 2);
    assert_eq!(responder.cells.get(&0x0000_0108), Some(&0xAABB_CCDD));
}
