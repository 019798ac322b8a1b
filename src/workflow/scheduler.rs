use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{sync::mpsc, task::AbortHandle};

/// Posts a message back to the engine after a delay
pub struct Scheduler<M> {
    tx: mpsc::UnboundedSender<M>,
    live: Arc<AtomicUsize>,
}

impl<M: Send + 'static> Scheduler<M> {
    pub fn new(tx: mpsc::UnboundedSender<M>) -> Self {
        Self {
            tx,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn schedule(&self, delay: Duration, message: M) -> TimerHandle {
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // the engine is gone when this fails, nothing left to notify
            let _ = tx.send(message);
        });

        self.live.fetch_add(1, Ordering::SeqCst);

        TimerHandle {
            task: task.abort_handle(),
            live: Arc::clone(&self.live),
        }
    }

    /// Number of timer handles currently held by anyone
    pub fn live_timers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Cancellable reference to one scheduled message
///
/// Dropping the handle cancels the timer.
#[derive(Debug)]
pub struct TimerHandle {
    task: AbortHandle,
    live: Arc<AtomicUsize>,
}

impl TimerHandle {
    pub fn cancel(self) {
        drop(self)
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
