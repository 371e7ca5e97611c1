use super::Surface;

/// Frame metadata handed to every frame callback.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Time since the previous frame (seconds).
    pub dt_s: f64,
    /// Accumulated time at the start of the frame (seconds).
    pub time_s: f64,
}

/// Identifies one requested frame callback.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// Request/cancel style frame scheduling.
///
/// A renderer requests one callback at a time and requests the next one from
/// inside its callback, which makes each render loop self-rescheduling.
/// Cancelling a handle removes it before dispatch, so a loop stops without
/// affecting any other owner's loop.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    next_id: u64,
    pending: Vec<(FrameHandle, Surface)>,
    index: u64,
    time_s: f64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a callback for `owner` on the next frame.
    pub fn request(&mut self, owner: Surface) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.pending.push((handle, owner));
        handle
    }

    /// Remove a pending callback. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, handle: FrameHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(h, _)| *h != handle);
        self.pending.len() != before
    }

    pub fn pending_for(&self, owner: Surface) -> usize {
        self.pending.iter().filter(|(_, o)| *o == owner).count()
    }

    pub fn is_pending(&self, handle: FrameHandle) -> bool {
        self.pending.iter().any(|(h, _)| *h == handle)
    }

    /// Start a frame: advance the clock and take every callback due now,
    /// in request order. Callbacks requested while dispatching run next frame.
    pub fn begin_frame(&mut self, dt_s: f64) -> (Frame, Vec<(FrameHandle, Surface)>) {
        let frame = Frame {
            index: self.index,
            dt_s,
            time_s: self.time_s,
        };
        self.index += 1;
        self.time_s += dt_s;
        (frame, std::mem::take(&mut self.pending))
    }
}
