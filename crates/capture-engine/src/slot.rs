//! Capacity-1, newest-wins hand-off between a producer thread and the UI.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Producer half. Publishing never blocks; a pending item is evicted.
#[derive(Debug)]
pub struct SlotSender<T> {
    tx: Sender<T>,
    evict: Receiver<T>,
}

impl<T> Clone for SlotSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            evict: self.evict.clone(),
        }
    }
}

/// Consumer half. Taking never blocks.
#[derive(Debug)]
pub struct SlotReceiver<T> {
    rx: Receiver<T>,
}

impl<T> Clone for SlotReceiver<T> {
    fn clone(&self) -> Self {
        Self { rx: self.rx.clone() }
    }
}

/// Create a single-slot channel.
pub fn frame_slot<T>() -> (SlotSender<T>, SlotReceiver<T>) {
    let (tx, rx) = bounded(1);
    (
        SlotSender {
            tx,
            evict: rx.clone(),
        },
        SlotReceiver { rx },
    )
}

impl<T> SlotSender<T> {
    /// Insert `item`, discarding whatever was waiting. Returns true if an
    /// older item was dropped.
    pub fn publish(&self, item: T) -> bool {
        let mut item = item;
        let mut evicted = false;
        loop {
            match self.tx.try_send(item) {
                Ok(()) => return evicted,
                Err(TrySendError::Full(back)) => {
                    evicted |= self.evict.try_recv().is_ok();
                    item = back;
                }
                Err(TrySendError::Disconnected(_)) => return evicted,
            }
        }
    }
}

impl<T> SlotReceiver<T> {
    /// The waiting item, if any.
    pub fn take(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_item_wins() {
        let (tx, rx) = frame_slot();
        assert!(!tx.publish(1));
        assert!(tx.publish(2));
        assert!(tx.publish(3));
        assert_eq!(rx.take(), Some(3));
        assert_eq!(rx.take(), None);
    }

    #[test]
    fn publish_never_blocks_without_consumer() {
        let (tx, _rx) = frame_slot();
        for i in 0..1000 {
            tx.publish(i);
        }
    }

    #[test]
    fn concurrent_producer_keeps_at_most_one() {
        let (tx, rx) = frame_slot();
        let producer = std::thread::spawn(move || {
            for i in 0..10_000u32 {
                tx.publish(i);
            }
        });
        let mut last = None;
        while !producer.is_finished() {
            if let Some(v) = rx.take() {
                if let Some(prev) = last {
                    assert!(v > prev);
                }
                last = Some(v);
            }
        }
        producer.join().unwrap();
        if let Some(v) = rx.take() {
            assert!(last.map_or(true, |prev| v > prev));
        }
    }
}
