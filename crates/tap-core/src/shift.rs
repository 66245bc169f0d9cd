//! Serial shift-register primitive shared by every scan path.

/// Fixed-width serial shift register with parallel capture.
///
/// Serial input enters at the most-significant position; serial output
/// leaves from the least-significant position. `shift` returns the
/// *pre-shift* LSB, so the first bit out after a capture is bit 0 of the
/// captured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ShiftRegister<const WIDTH: u32> {
    bits: u64,
}

impl<const WIDTH: u32> ShiftRegister<WIDTH> {
    /// Mask of the register's active bits.
    pub const MASK: u64 = if WIDTH >= 64 {
        u64::MAX
    } else {
        (1 << WIDTH) - 1
    };

    /// Creates a zeroed register.
    #[must_use]
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Parallel capture: one-shot overwrite of the full register content.
    ///
    /// Bits above the register width are discarded.
    pub const fn load(&mut self, value: u64) {
        self.bits = value & Self::MASK;
    }

    /// Serial step: emits the pre-shift LSB, then inserts `bit_in` at the
    /// most-significant position.
    pub const fn shift(&mut self, bit_in: bool) -> bool {
        let bit_out = self.bits & 1 != 0;
        self.bits >>= 1;
        if bit_in {
            self.bits |= 1 << (WIDTH - 1);
        }
        bit_out
    }

    /// Returns the current parallel value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.bits
    }
}
