#![no_main]

use libfuzzer_sys::fuzz_target;
use tap_core::{
    CompletionStatus, Instruction, MemoryCompletion, MemoryRequest, MemoryResponder,
    ProtocolEngine, TapState, TickInput,
};

struct ByteDrivenResponder {
    script: Vec<u8>,
    cursor: usize,
    outstanding: bool,
}

impl MemoryResponder for ByteDrivenResponder {
    fn issue(&mut self, _request: MemoryRequest) {
        self.outstanding = true;
    }

    fn poll(&mut self) -> Option<MemoryCompletion> {
        if !self.outstanding {
            return None;
        }
        let byte = *self.script.get(self.cursor)?;
        self.cursor += 1;
        if byte & 0x80 == 0 {
            return None;
        }
        self.outstanding = false;
        Some(MemoryCompletion {
            status: match byte & 0x03 {
                0 => CompletionStatus::Ok,
                1 => CompletionStatus::Error,
                _ => CompletionStatus::Denied,
            },
            read_data: u32::from(byte) * 0x0101_0101,
        })
    }
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let (line_bytes, script) = data.split_at(data.len() / 2);
    let mut responder = ByteDrivenResponder {
        script: script.to_vec(),
        cursor: 0,
        outstanding: false,
    };
    let mut engine = ProtocolEngine::default();

    for byte in line_bytes {
        engine.set_boundary_input(byte.rotate_left(3));
        engine.set_instrument_status(*byte);
        let output = engine.tick(
            TickInput {
                mode_select: byte & 0x01 != 0,
                serial_in: byte & 0x02 != 0,
                external_reset: byte & 0x40 == 0x40,
            },
            &mut responder,
        );

        // Every tick yields a well-defined output word.
        assert!(TapState::from_bits(output.tap_state.bits()).is_some());
        assert!(Instruction::from_bits(output.committed_instruction.bits()).is_some());
    }
});
