//! Trailing-edge debouncing of a stream of values.
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::sync::mpsc;

/// How long the device search waits for typing to pause.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// Forwards only the last of a burst of values.
///
/// A value is forwarded once no newer value has been pushed for the debounce
/// window. Dropping the debouncer flushes any value still waiting.
#[derive(Debug)]
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
    buffered: Arc<AtomicUsize>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the debouncing task, forwarding to `out`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(window: Duration, out: mpsc::UnboundedSender<T>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();
        let buffered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&buffered);
        tokio::spawn(async move {
            while let Some(mut value) = rx.recv().await {
                let mut collapsed = 1;
                let closed = loop {
                    tokio::select! {
                        next = rx.recv() => match next {
                            Some(next) => {
                                value = next;
                                collapsed += 1;
                            }
                            None => break true,
                        },
                        _ = tokio::time::sleep(window) => break false,
                    }
                };
                let sent = out.send(value).is_ok();
                counter.fetch_sub(collapsed, Ordering::SeqCst);
                if closed || !sent {
                    break;
                }
            }
        });
        Self { tx, buffered }
    }

    /// Push a value, replacing any value still waiting.
    pub fn push(&self, value: T) {
        self.buffered.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(value).is_err() {
            self.buffered.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Whether values are waiting to be forwarded.
    pub fn is_pending(&self) -> bool {
        self.buffered.load(Ordering::SeqCst) > 0
    }
}
