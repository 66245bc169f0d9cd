//! Test-access-port controller: the 16-state FSM and reset arbitration.

/// Number of TAP controller states.
pub const TAP_STATE_COUNT: usize = 16;

/// Consecutive `mode_select = 1` ticks that force an internal reset.
pub const SOFT_RESET_THRESHOLD: u8 = 5;

/// Saturation bound for the consecutive-high counter.
pub const SOFT_RESET_SATURATION: u8 = 31;

/// The sixteen IEEE 1149.1 TAP controller states.
///
/// The discriminant doubles as the 4-bit state encoding captured by the
/// debug-snapshot register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TapState {
    #[default]
    TestLogicReset = 0,
    RunTestIdle = 1,
    SelectDrScan = 2,
    CaptureDr = 3,
    ShiftDr = 4,
    Exit1Dr = 5,
    PauseDr = 6,
    Exit2Dr = 7,
    UpdateDr = 8,
    SelectIrScan = 9,
    CaptureIr = 10,
    ShiftIr = 11,
    Exit1Ir = 12,
    PauseIr = 13,
    Exit2Ir = 14,
    UpdateIr = 15,
}

impl TapState {
    /// Ordered list of all TAP controller states.
    pub const ALL: [Self; TAP_STATE_COUNT] = [
        Self::TestLogicReset,
        Self::RunTestIdle,
        Self::SelectDrScan,
        Self::CaptureDr,
        Self::ShiftDr,
        Self::Exit1Dr,
        Self::PauseDr,
        Self::Exit2Dr,
        Self::UpdateDr,
        Self::SelectIrScan,
        Self::CaptureIr,
        Self::ShiftIr,
        Self::Exit1Ir,
        Self::PauseIr,
        Self::Exit2Ir,
        Self::UpdateIr,
    ];

    /// Returns the 4-bit state encoding.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decodes a 4-bit state encoding.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::TestLogicReset),
            1 => Some(Self::RunTestIdle),
            2 => Some(Self::SelectDrScan),
            3 => Some(Self::CaptureDr),
            4 => Some(Self::ShiftDr),
            5 => Some(Self::Exit1Dr),
            6 => Some(Self::PauseDr),
            7 => Some(Self::Exit2Dr),
            8 => Some(Self::UpdateDr),
            9 => Some(Self::SelectIrScan),
            10 => Some(Self::CaptureIr),
            11 => Some(Self::ShiftIr),
            12 => Some(Self::Exit1Ir),
            13 => Some(Self::PauseIr),
            14 => Some(Self::Exit2Ir),
            15 => Some(Self::UpdateIr),
            _ => None,
        }
    }

    /// Total transition function: successor state for a mode-select bit.
    #[must_use]
    pub const fn next(self, mode_select: bool) -> Self {
        match (self, mode_select) {
            (Self::TestLogicReset, false) => Self::RunTestIdle,
            (Self::TestLogicReset, true) => Self::TestLogicReset,
            (Self::RunTestIdle, false) => Self::RunTestIdle,
            (Self::RunTestIdle | Self::UpdateDr | Self::UpdateIr, true) => Self::SelectDrScan,
            (Self::SelectDrScan, false) => Self::CaptureDr,
            (Self::SelectDrScan, true) => Self::SelectIrScan,
            (Self::CaptureDr | Self::ShiftDr | Self::Exit2Dr, false) => Self::ShiftDr,
            (Self::CaptureDr | Self::ShiftDr, true) => Self::Exit1Dr,
            (Self::Exit1Dr, false) => Self::PauseDr,
            (Self::Exit1Dr | Self::Exit2Dr, true) => Self::UpdateDr,
            (Self::PauseDr, false) => Self::PauseDr,
            (Self::PauseDr, true) => Self::Exit2Dr,
            (Self::UpdateDr | Self::UpdateIr, false) => Self::RunTestIdle,
            (Self::SelectIrScan, false) => Self::CaptureIr,
            (Self::SelectIrScan, true) => Self::TestLogicReset,
            (Self::CaptureIr | Self::ShiftIr | Self::Exit2Ir, false) => Self::ShiftIr,
            (Self::CaptureIr | Self::ShiftIr, true) => Self::Exit1Ir,
            (Self::Exit1Ir, false) => Self::PauseIr,
            (Self::Exit1Ir | Self::Exit2Ir, true) => Self::UpdateIr,
            (Self::PauseIr, false) => Self::PauseIr,
            (Self::PauseIr, true) => Self::Exit2Ir,
        }
    }

    /// Returns `true` for the instruction-register column of the state
    /// diagram.
    #[must_use]
    pub const fn is_ir_column(self) -> bool {
        matches!(
            self,
            Self::SelectIrScan
                | Self::CaptureIr
                | Self::ShiftIr
                | Self::Exit1Ir
                | Self::PauseIr
                | Self::Exit2Ir
                | Self::UpdateIr
        )
    }
}

/// TAP controller: current state plus reset arbitration.
///
/// Two reset paths must produce the same effect: an explicit external
/// reset, and an internally generated reset once mode-select has been
/// held high for [`SOFT_RESET_THRESHOLD`] consecutive ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TapController {
    state: TapState,
    select_high_ticks: u8,
}

impl TapController {
    /// Creates a controller in `TestLogicReset`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: TapState::TestLogicReset,
            select_high_ticks: 0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> TapState {
        self.state
    }

    /// Derived per-state indicator: `true` iff `state` is current.
    #[must_use]
    pub const fn indicator(&self, state: TapState) -> bool {
        self.state as u8 == state as u8
    }

    /// Returns the consecutive mode-select-high tick count.
    #[must_use]
    pub const fn select_high_ticks(&self) -> u8 {
        self.select_high_ticks
    }

    /// Advances the FSM by one protocol tick and returns the new state.
    ///
    /// External reset dominates: it forces `TestLogicReset` regardless of
    /// mode-select and clears the soft-reset counter.
    pub const fn tick(&mut self, mode_select: bool, external_reset: bool) -> TapState {
        if external_reset {
            self.state = TapState::TestLogicReset;
            self.select_high_ticks = 0;
            return self.state;
        }

        if mode_select {
            if self.select_high_ticks < SOFT_RESET_SATURATION {
                self.select_high_ticks += 1;
            }
        } else {
            self.select_high_ticks = 0;
        }

        self.state = if self.select_high_ticks >= SOFT_RESET_THRESHOLD {
            TapState::TestLogicReset
        } else {
            self.state.next(mode_select)
        };
        self.state
    }
}
