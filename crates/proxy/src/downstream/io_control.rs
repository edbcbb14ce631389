//! Backpressure on backend reads.
//!
//! Several independent parts of a stream may want backend reads held off at the
//! same time: a full body buffer, an exhausted flow-control window, a blocked
//! client stream. [`IoControl`] keeps one bit per [`IoCtrlReason`] and only lets
//! reading resume once every reason has been cleared.
//!
//! The transport exposes its readable side as a [`ReadInterest`] handle. Pausing
//! never blocks: it only flips the handle, and the event loop driving the
//! transport checks it before issuing the next read.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

use crate::downstream::DrainListener;

/// Shared read-enable switch between a transport and its reader.
#[derive(Debug, Clone)]
pub struct ReadInterest {
    enabled: Arc<AtomicBool>,
}

impl ReadInterest {
    pub fn new() -> Self {
        Self { enabled: Arc::new(AtomicBool::new(true)) }
    }

    #[inline]
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl Default for ReadInterest {
    fn default() -> Self {
        Self::new()
    }
}

/// Why backend reads are being held off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IoCtrlReason {
    /// the response body buffer is above its high-water mark
    NoBuffer = 0b001,
    /// the client side cannot accept another message yet
    MsgBlock = 0b010,
    /// the stream's flow-control window is exhausted
    FlowControl = 0b100,
}

impl IoCtrlReason {
    #[inline]
    fn bit(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Default)]
pub struct IoControl {
    handle: Option<ReadInterest>,
    reasons: u8,
}

impl IoControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds to a transport's read handle, or unbinds with `None`.
    ///
    /// Active pause reasons carry over: a handle bound while paused is disabled
    /// right away.
    pub fn set_handle(&mut self, handle: Option<ReadInterest>) {
        if let Some(handle) = handle.as_ref().filter(|_| self.is_paused()) {
            handle.disable();
        }
        self.handle = handle;
    }

    pub fn handle(&self) -> Option<&ReadInterest> {
        self.handle.as_ref()
    }

    pub fn pause_read(&mut self, reason: IoCtrlReason) {
        trace!(?reason, "pause read");
        self.reasons |= reason.bit();
        if let Some(handle) = &self.handle {
            handle.disable();
        }
    }

    /// Clears `reason` and returns whether reading is resumed, which is the case
    /// only when no other reason is still active.
    pub fn resume_read(&mut self, reason: IoCtrlReason) -> bool {
        self.reasons &= !reason.bit();
        if self.reasons != 0 {
            trace!(?reason, remaining = self.reasons, "read stays paused");
            return false;
        }

        if let Some(handle) = &self.handle {
            handle.enable();
        }
        true
    }

    pub fn force_resume_read(&mut self) {
        self.reasons = 0;
        if let Some(handle) = &self.handle {
            handle.enable();
        }
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.reasons != 0
    }

    #[inline]
    pub fn is_paused_by(&self, reason: IoCtrlReason) -> bool {
        self.reasons & reason.bit() != 0
    }
}

impl DrainListener for IoControl {
    fn on_drained(&mut self) {
        self.resume_read(IoCtrlReason::NoBuffer);
    }
}
