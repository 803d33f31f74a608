//! Change notification for presentation layers.
//!
//! Two ways to listen: plain callbacks run on the thread that made the
//! change, and a broadcast channel that can be drained wherever the consumer
//! lives (a UI loop, an async task, a test).

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

/// Which part of the planner changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// The upcoming store.
    Events,
    /// The class registry (and possibly events through cascade or rename).
    Classes,
    /// The past-events archive.
    Archive,
}

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Broadcast buffer; slow receivers see `Lagged` rather than blocking writers.
const CHANNEL_CAPACITY: usize = 64;

pub struct ChangeNotifier {
    callbacks: Mutex<Vec<Callback>>,
    sender: broadcast::Sender<Change>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(CHANNEL_CAPACITY);
        ChangeNotifier {
            callbacks: Mutex::new(Vec::new()),
            sender,
        }
    }

    /// Register a callback invoked after every completed change.
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.lock_callbacks().push(Arc::new(callback));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.sender.subscribe()
    }

    pub fn callback_count(&self) -> usize {
        self.lock_callbacks().len()
    }

    /// Run every callback, then publish `change` to subscribers.
    ///
    /// Callbacks run without any internal lock held, so they may register
    /// further callbacks or call back into the planner.
    pub fn notify(&self, change: Change) {
        let callbacks: Vec<Callback> = self.lock_callbacks().clone();
        for callback in callbacks {
            callback();
        }

        // No subscribers is not an error.
        let _ = self.sender.send(change);
        tracing::trace!(?change, "change dispatched");
    }

    fn lock_callbacks(&self) -> MutexGuard<'_, Vec<Callback>> {
        self.callbacks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_callbacks_run_on_every_notify() {
        let notifier = ChangeNotifier::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        notifier.on_change(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        notifier.notify(Change::Events);
        notifier.notify(Change::Classes);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_subscribers_receive_change_kind() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();

        notifier.notify(Change::Archive);

        assert_eq!(rx.try_recv().unwrap(), Change::Archive);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_notify_without_listeners_is_fine() {
        ChangeNotifier::new().notify(Change::Events);
    }

    #[test]
    fn test_callback_may_register_another_callback() {
        let notifier = Arc::new(ChangeNotifier::new());

        let inner = Arc::clone(&notifier);
        notifier.on_change(move || inner.on_change(|| {}));

        notifier.notify(Change::Events);

        assert_eq!(notifier.callback_count(), 2);
    }
}
