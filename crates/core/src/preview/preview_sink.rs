use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::annotation::domain::annotated_frame::AnnotatedFrame;

#[derive(Default)]
struct Slot {
    frame: Option<Arc<AnnotatedFrame>>,
    generation: u64,
}

/// Hand-off point between the processing context and the display.
///
/// Holds only the most recent annotated frame. Publishing swaps an `Arc`
/// handle under a lock that is held for the swap alone, so readers see
/// either the previous frame or the new one, never a partial write.
#[derive(Default)]
pub struct PreviewSink {
    slot: Mutex<Slot>,
    subscribers: Mutex<Vec<Sender<u64>>>,
}

impl PreviewSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current frame and returns its generation number.
    ///
    /// Subscribers are notified without blocking: a subscriber that has not
    /// consumed the previous notification simply keeps that one.
    pub fn publish(&self, frame: impl Into<Arc<AnnotatedFrame>>) -> u64 {
        let frame: Arc<AnnotatedFrame> = frame.into();
        let (generation, previous) = {
            let mut slot = self.lock_slot();
            slot.generation += 1;
            (slot.generation, slot.frame.replace(frame))
        };
        // The superseded frame may be large; release it outside the lock.
        drop(previous);

        self.notify(generation);
        generation
    }

    /// Latest published frame, or `None` before the first publish.
    pub fn current(&self) -> Option<Arc<AnnotatedFrame>> {
        self.lock_slot().frame.clone()
    }

    pub fn current_annotated_frame(&self) -> Option<Arc<AnnotatedFrame>> {
        self.current()
    }

    /// Number of frames published so far.
    pub fn generation(&self) -> u64 {
        self.lock_slot().generation
    }

    /// Returns a channel that receives the generation of new frames.
    ///
    /// Notifications coalesce: the channel holds at most one pending
    /// generation, and it is always followed by a call to [`current`]
    /// returning that frame or a newer one.
    ///
    /// [`current`]: PreviewSink::current
    pub fn subscribe(&self) -> Receiver<u64> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.lock_subscribers().push(tx);
        rx
    }

    fn notify(&self, generation: u64) {
        self.lock_subscribers()
            .retain(|tx| match tx.try_send(generation) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<Sender<u64>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}
