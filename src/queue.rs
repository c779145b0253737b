use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::capture::Capture;

/// Sink for validated captures. Implementations must be safe for
/// single-producer/multi-consumer use; the core only ever calls `put`.
pub trait CaptureQueue {
    fn put(&self, capture: Capture);
    fn get(&self) -> Option<Capture>;
    fn empty(&self) -> bool;
}

/// In-memory reference implementation backed by an unbounded MPMC channel.
pub struct InMemoryCaptureQueue {
    sender: Sender<Capture>,
    receiver: Receiver<Capture>,
}

impl InMemoryCaptureQueue {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }
}

impl Default for InMemoryCaptureQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureQueue for InMemoryCaptureQueue {
    fn put(&self, capture: Capture) {
        // An unbounded channel's only failure mode is a dropped receiver,
        // which means nothing is left to consume captures; nothing useful
        // can be done about that here.
        let _ = self.sender.send(capture);
    }

    fn get(&self) -> Option<Capture> {
        match self.receiver.try_recv() {
            Ok(capture) => Some(capture),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_capture(freq: f64) -> Capture {
        Capture {
            center_frequency_hz: 100_000_000.0,
            signal_frequency_hz: freq,
            power_db: -30.0,
            bandwidth_hz: 6000.0,
            timestamp: Utc::now(),
            sample_rate_hz: 48_000,
            iq_data: Vec::new(),
        }
    }

    #[test]
    fn put_then_get_returns_the_same_capture() {
        let queue = InMemoryCaptureQueue::new();
        assert!(queue.empty());
        queue.put(sample_capture(145_500_000.0));
        assert!(!queue.empty());

        let got = queue.get().expect("capture should be present");
        assert_eq!(got.signal_frequency_hz, 145_500_000.0);
        assert!(queue.empty());
    }

    #[test]
    fn get_on_empty_queue_returns_none() {
        let queue = InMemoryCaptureQueue::new();
        assert!(queue.get().is_none());
    }

    #[test]
    fn preserves_fifo_order() {
        let queue = InMemoryCaptureQueue::new();
        queue.put(sample_capture(1.0));
        queue.put(sample_capture(2.0));
        assert_eq!(queue.get().unwrap().signal_frequency_hz, 1.0);
        assert_eq!(queue.get().unwrap().signal_frequency_hz, 2.0);
    }
}
