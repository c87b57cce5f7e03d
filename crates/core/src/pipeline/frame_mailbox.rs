use std::sync::{Condvar, Mutex, MutexGuard};

use crate::shared::frame::Frame;

/// Result of offering a frame to a [`FrameMailbox`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offer {
    Accepted,
    /// The frame was accepted and displaced the waiting frame `dropped`.
    Replaced { dropped: u64 },
    /// A frame was already waiting; the offered frame `dropped` was discarded.
    Rejected { dropped: u64 },
    /// The mailbox is closed; the offered frame was discarded.
    Closed,
}

#[derive(Default)]
struct State {
    waiting: Option<Frame>,
    closed: bool,
}

/// Single-slot hand-off between the capture thread and the detection
/// worker.
///
/// Holds at most one waiting frame. A frame being processed has already
/// left the mailbox, so together with the worker there are never more than
/// two frames in the pipeline.
pub struct FrameMailbox {
    state: Mutex<State>,
    ready: Condvar,
    keep_waiting: bool,
}

impl FrameMailbox {
    /// New frames replace the waiting frame.
    pub fn replacing() -> Self {
        Self::new(false)
    }

    /// New frames are dropped while a frame is waiting.
    pub fn rejecting() -> Self {
        Self::new(true)
    }

    fn new(keep_waiting: bool) -> Self {
        Self {
            state: Mutex::new(State::default()),
            ready: Condvar::new(),
            keep_waiting,
        }
    }

    pub fn offer(&self, frame: Frame) -> Offer {
        let mut state = self.lock();
        if state.closed {
            return Offer::Closed;
        }
        let outcome = match state.waiting.as_ref() {
            None => Offer::Accepted,
            Some(_) if self.keep_waiting => {
                return Offer::Rejected {
                    dropped: frame.index(),
                }
            }
            Some(waiting) => Offer::Replaced {
                dropped: waiting.index(),
            },
        };
        state.waiting = Some(frame);
        drop(state);
        self.ready.notify_one();
        outcome
    }

    /// Blocks until a frame is waiting and takes it. Returns `None` once
    /// the mailbox is closed.
    pub fn take(&self) -> Option<Frame> {
        let mut state = self.lock();
        loop {
            if let Some(frame) = state.waiting.take() {
                return Some(frame);
            }
            if state.closed {
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Refuses further frames and wakes the worker. A frame still waiting
    /// is discarded; its index is returned.
    pub fn close(&self) -> Option<u64> {
        let discarded = {
            let mut state = self.lock();
            state.closed = true;
            state.waiting.take()
        };
        self.ready.notify_all();
        discarded.map(|frame| frame.index())
    }

    /// Refuses further frames but leaves a waiting frame for the worker,
    /// whose next `take` returns it before `None`.
    pub fn finish(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::pixel_format::PixelFormat;
    use std::sync::Arc;
    use std::time::Duration;

    fn frame(index: u64) -> Frame {
        Frame::new(vec![0u8; 3], 1, 1, PixelFormat::Rgb8, index, Duration::ZERO)
    }

    #[test]
    fn test_offer_then_take() {
        let mailbox = FrameMailbox::replacing();
        assert_eq!(mailbox.offer(frame(1)), Offer::Accepted);
        assert_eq!(mailbox.take().unwrap().index(), 1);
    }

    #[test]
    fn test_replacing_keeps_newest() {
        let mailbox = FrameMailbox::replacing();
        mailbox.offer(frame(1));
        assert_eq!(mailbox.offer(frame(2)), Offer::Replaced { dropped: 1 });
        assert_eq!(mailbox.offer(frame(3)), Offer::Replaced { dropped: 2 });
        assert_eq!(mailbox.take().unwrap().index(), 3);
    }

    #[test]
    fn test_rejecting_keeps_oldest() {
        let mailbox = FrameMailbox::rejecting();
        mailbox.offer(frame(1));
        assert_eq!(mailbox.offer(frame(2)), Offer::Rejected { dropped: 2 });
        assert_eq!(mailbox.offer(frame(3)), Offer::Rejected { dropped: 3 });
        assert_eq!(mailbox.take().unwrap().index(), 1);
    }

    #[test]
    fn test_slot_frees_after_take() {
        let mailbox = FrameMailbox::rejecting();
        mailbox.offer(frame(1));
        mailbox.take();
        assert_eq!(mailbox.offer(frame(2)), Offer::Accepted);
    }

    #[test]
    fn test_close_discards_waiting_frame() {
        let mailbox = FrameMailbox::replacing();
        mailbox.offer(frame(7));

        assert_eq!(mailbox.close(), Some(7));
        assert!(mailbox.take().is_none());
        assert_eq!(mailbox.offer(frame(8)), Offer::Closed);
    }

    #[test]
    fn test_finish_hands_over_waiting_frame() {
        let mailbox = FrameMailbox::replacing();
        mailbox.offer(frame(7));

        mailbox.finish();

        assert_eq!(mailbox.offer(frame(8)), Offer::Closed);
        assert_eq!(mailbox.take().unwrap().index(), 7);
        assert!(mailbox.take().is_none());
        assert_eq!(mailbox.close(), None);
    }

    #[test]
    fn test_close_on_empty_mailbox() {
        let mailbox = FrameMailbox::replacing();
        assert_eq!(mailbox.close(), None);
        assert_eq!(mailbox.close(), None);
    }

    #[test]
    fn test_take_wakes_on_offer() {
        let mailbox = Arc::new(FrameMailbox::replacing());
        let worker_mailbox = mailbox.clone();
        let worker = std::thread::spawn(move || worker_mailbox.take().map(|f| f.index()));

        std::thread::sleep(Duration::from_millis(20));
        mailbox.offer(frame(4));

        assert_eq!(worker.join().unwrap(), Some(4));
    }

    #[test]
    fn test_take_wakes_on_close() {
        let mailbox = Arc::new(FrameMailbox::replacing());
        let worker_mailbox = mailbox.clone();
        let worker = std::thread::spawn(move || worker_mailbox.take().is_none());

        std::thread::sleep(Duration::from_millis(20));
        mailbox.close();

        assert!(worker.join().unwrap());
    }
}
