//! Fan-out of pipeline events to any number of subscribers.

use std::sync::mpsc;

/// Unbounded fan-out over std channels.
///
/// Each subscriber owns a receiver. Publishing clones the event into every
/// live channel and forgets subscribers whose receiver was dropped.
#[derive(Debug)]
pub struct Subscribers<T> {
    senders: Vec<mpsc::Sender<T>>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            senders: Vec::new(),
        }
    }
}

impl<T: Clone> Subscribers<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. It sees every event published afterwards.
    pub fn subscribe(&mut self) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber.
    pub fn publish(&mut self, event: &T) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_subscriber_receives_in_order() {
        let mut bus = Subscribers::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        bus.publish(&1);
        bus.publish(&2);

        assert_eq!(first.try_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(second.try_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let mut bus = Subscribers::new();
        bus.publish(&"early");
        let rx = bus.subscribe();
        bus.publish(&"late");

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["late"]);
    }

    #[test]
    fn test_dropped_subscriber_is_forgotten() {
        let mut bus = Subscribers::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.publish(&'x');

        assert_eq!(bus.len(), 1);
        assert_eq!(kept.recv().unwrap(), 'x');
    }
}
