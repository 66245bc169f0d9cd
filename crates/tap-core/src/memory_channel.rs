//! Bounded request/response memory-access channel.
//!
//! Single-outstanding protocol: a request is issued on a data-register
//! update, then polled once per tick against a countdown timeout. The
//! responder is a host-provided collaborator behind [`MemoryResponder`],
//! never a blocking call.

use crate::error::ErrorCode;

/// Poison value substituted for read data after a failed response.
pub const MEMORY_POISON_WORD: u32 = 0xDEAD_BEEF;

/// Default timeout bound in ticks for a pending request.
pub const DEFAULT_MEMORY_TIMEOUT_TICKS: u32 = 65_535;

/// A validated memory request as issued to the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryRequest {
    /// Target address; must lie inside the configured window.
    pub address: u32,
    /// Write data; ignored by the responder for reads.
    pub data: u32,
    /// `true` for a write request.
    pub is_write: bool,
}

/// Completion status reported by the responder.
///
/// `Denied` is computed by the responder's own access gating; this core
/// only surfaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionStatus {
    /// Request completed successfully.
    Ok,
    /// Responder signaled an internal failure.
    Error,
    /// Responder denied the access at its gating level.
    Denied,
}

/// Completion record supplied by the responder when a request finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryCompletion {
    /// Completion status for the finished request.
    pub status: CompletionStatus,
    /// Read data; meaningful only for successful reads.
    pub read_data: u32,
}

/// Asynchronous request/response boundary to the memory collaborator.
pub trait MemoryResponder {
    /// Accepts a validated request. The responder completes it on a later
    /// tick via [`MemoryResponder::poll`].
    fn issue(&mut self, request: MemoryRequest);

    /// Polls for completion of the outstanding request, if any.
    fn poll(&mut self) -> Option<MemoryCompletion>;
}

/// Outcome of an update-triggered request issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
    /// Request passed validation and was handed to the responder.
    Issued,
    /// Address fell outside the window; no request was issued.
    Rejected(ErrorCode),
    /// A request was already pending; the new one was dropped.
    IgnoredPending,
}

/// Per-tick channel event reported back to the protocol engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelEvent {
    /// Responder completed the request successfully.
    Completed {
        /// Data returned by the responder.
        read_data: u32,
    },
    /// Request finished in a classified failure (error, denial, timeout).
    Faulted(ErrorCode),
}

/// Single-outstanding memory-access channel state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryAccessChannel {
    base: u32,
    size: u32,
    timeout_ticks: u32,
    pending: bool,
    timeout_remaining: u32,
    last_response: u32,
}

impl MemoryAccessChannel {
    /// Creates a channel over the window `base ..= base + size - 1`.
    #[must_use]
    pub const fn new(base: u32, size: u32, timeout_ticks: u32) -> Self {
        Self {
            base,
            size,
            timeout_ticks,
            pending: false,
            timeout_remaining: 0,
            last_response: 0,
        }
    }

    /// Returns `true` while a request is outstanding.
    #[must_use]
    pub const fn pending(&self) -> bool {
        self.pending
    }

    /// Low 32 bits captured into the memory scan path: the last completed
    /// response, or [`MEMORY_POISON_WORD`] after a failed one.
    #[must_use]
    pub const fn last_response_word(&self) -> u32 {
        self.last_response
    }

    /// Validates an address against the configured window.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::InvalidAddress`] when `address` is outside
    /// `base ..= base + size - 1`.
    pub const fn validate(&self, address: u32) -> Result<(), ErrorCode> {
        let end = self.base.wrapping_add(self.size).wrapping_sub(1);
        if self.size != 0 && address >= self.base && address <= end {
            Ok(())
        } else {
            Err(ErrorCode::InvalidAddress)
        }
    }

    /// Issues an update-triggered request after window validation.
    ///
    /// A second issue while one is pending violates the caller contract
    /// enforced by the protocol's own gating; it is dropped defensively.
    pub fn begin<R: MemoryResponder>(
        &mut self,
        request: MemoryRequest,
        responder: &mut R,
    ) -> RequestOutcome {
        if let Err(code) = self.validate(request.address) {
            return RequestOutcome::Rejected(code);
        }
        if self.pending {
            return RequestOutcome::IgnoredPending;
        }

        responder.issue(request);
        self.pending = true;
        self.timeout_remaining = self.timeout_ticks;
        RequestOutcome::Issued
    }

    /// Per-tick bookkeeping: completion polling and timeout countdown.
    pub fn tick<R: MemoryResponder>(&mut self, responder: &mut R) -> Option<ChannelEvent> {
        if !self.pending {
            return None;
        }

        if let Some(completion) = responder.poll() {
            self.pending = false;
            return Some(match completion.status {
                CompletionStatus::Ok => {
                    self.last_response = completion.read_data;
                    ChannelEvent::Completed {
                        read_data: completion.read_data,
                    }
                }
                CompletionStatus::Error => {
                    self.last_response = MEMORY_POISON_WORD;
                    ChannelEvent::Faulted(ErrorCode::MemoryError)
                }
                CompletionStatus::Denied => {
                    self.last_response = MEMORY_POISON_WORD;
                    ChannelEvent::Faulted(ErrorCode::AccessDenied)
                }
            });
        }

        self.timeout_remaining = self.timeout_remaining.saturating_sub(1);
        if self.timeout_remaining == 0 {
            self.pending = false;
            return Some(ChannelEvent::Faulted(ErrorCode::MemoryTimeout));
        }
        None
    }

    /// Cancels any pending request; used by external reset.
    pub const fn cancel(&mut self) {
        self.pending = false;
        self.timeout_remaining = 0;
    }
}
