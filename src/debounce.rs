//! Trailing-edge debounce: schedule after a quiet period, cancel on reschedule.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Quiet period before search text is used as a query parameter.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Emits only the last value pushed within `delay` of the previous push.
///
/// Pending timers are aborted, never stacked. Emitted values arrive on the
/// receiver returned by [`Debouncer::new`].
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    tx: mpsc::UnboundedSender<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Debouncer {
                delay,
                tx,
                pending: None,
            },
            rx,
        )
    }

    pub fn schedule(&mut self, value: T) {
        self.cancel();
        let tx = self.tx.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(value);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
