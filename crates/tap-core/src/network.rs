//! IEEE 1687-style reconfigurable instrument-access network.
//!
//! A single shared 16-bit scan path carries three fields:
//! segment-select in bits 15:12, segment data in bits 11:4, and
//! instrument status in bits 7:0. The data and status fields overlap in
//! bits 7:4; on capture the status field wins the low byte.

use crate::shift::ShiftRegister;

/// Width of the shared network scan path in bits.
pub const NETWORK_PATH_WIDTH: u32 = 16;

/// Packs the network capture value from select, data, and status fields.
///
/// The low nibble of `segment_data` is not representable alongside the
/// status byte and is dropped, matching the shared-field register layout.
#[must_use]
pub const fn pack_network_capture(segment_select: u8, segment_data: u8, status: u8) -> u16 {
    (((segment_select & 0xF) as u16) << 12)
        | (((segment_data & 0xF0) as u16) << 4)
        | status as u16
}

/// Extracts the segment-select field (bits 15:12).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn network_segment_select(path: u16) -> u8 {
    (path >> 12) as u8
}

/// Extracts the segment-data field (bits 11:4).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn network_segment_data(path: u16) -> u8 {
    (path >> 4) as u8
}

/// Derived outputs to the addressed instrument.
///
/// All three are held at zero/false while the network is not selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstrumentPort {
    /// Segment-select value addressing the target instrument.
    pub addr: u8,
    /// Data delivered to the addressed instrument.
    pub data: u8,
    /// `true` iff the committed segment select is non-zero.
    pub enable: bool,
}

/// Shared scan path and committed segment fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstrumentNetwork {
    path: ShiftRegister<16>,
    segment_select: u8,
    segment_data: u8,
}

impl InstrumentNetwork {
    /// Creates a network with no segment selected.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            path: ShiftRegister::new(),
            segment_select: 0,
            segment_data: 0,
        }
    }

    /// Returns the committed segment-select field.
    #[must_use]
    pub const fn segment_select(&self) -> u8 {
        self.segment_select
    }

    /// Returns the committed segment-data field.
    #[must_use]
    pub const fn segment_data(&self) -> u8 {
        self.segment_data
    }

    /// Capture phase: packs the committed fields and the live instrument
    /// status into the shared path.
    pub const fn capture(&mut self, instrument_status: u8) {
        let value = pack_network_capture(self.segment_select, self.segment_data, instrument_status);
        self.path.load(value as u64);
    }

    /// Shift phase: one serial step through the shared path.
    pub const fn shift(&mut self, bit_in: bool) -> bool {
        self.path.shift(bit_in)
    }

    /// Update phase: commits the select and data fields from the path.
    pub const fn update(&mut self) {
        // Path width is 16, so the truncation is lossless.
        #[allow(clippy::cast_possible_truncation)]
        let path = self.path.value() as u16;
        self.segment_select = network_segment_select(path);
        self.segment_data = network_segment_data(path);
    }

    /// Derived instrument port for the current selection state.
    #[must_use]
    pub const fn port(&self, network_selected: bool) -> InstrumentPort {
        if network_selected {
            InstrumentPort {
                addr: self.segment_select,
                data: self.segment_data,
                enable: self.segment_select != 0,
            }
        } else {
            InstrumentPort {
                addr: 0,
                data: 0,
                enable: false,
            }
        }
    }

    /// Clears the committed fields; used by external reset.
    pub const fn reset(&mut self) {
        self.path.load(0);
        self.segment_select = 0;
        self.segment_data = 0;
    }
}
