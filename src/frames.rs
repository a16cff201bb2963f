//! Cancellable redraw requests.
//!
//! A view asks for the next frame with `request_frame` and gets a handle
//! back. The host fires the outstanding handle when the frame is due. At
//! most one handle is outstanding: a new request supersedes the previous
//! one, and a cancelled or superseded handle never fires.

use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickHandle(u64);

#[derive(Debug, Default)]
pub struct FrameLoop {
    next_id: Cell<u64>,
    pending: Cell<Option<TickHandle>>,
}

impl FrameLoop {
    pub fn new() -> FrameLoop {
        FrameLoop::default()
    }

    pub fn request_frame(&self) -> TickHandle {
        let handle = TickHandle(self.next_id.get());
        self.next_id.set(handle.0 + 1);
        self.pending.set(Some(handle));
        handle
    }

    /// Cancel a request. Cancelling a handle that is no longer outstanding
    /// does nothing.
    pub fn cancel_frame(&self, handle: TickHandle) {
        if self.pending.get() == Some(handle) {
            self.pending.set(None);
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self, handle: TickHandle) -> bool {
        self.pending.get() == Some(handle)
    }

    #[cfg(test)]
    pub fn has_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    /// Take the outstanding handle so the host can fire it.
    pub fn take_pending(&self) -> Option<TickHandle> {
        self.pending.take()
    }
}
