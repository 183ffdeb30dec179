//! Debounced triggers.
//!
//! A [`Debouncer`] collapses a burst of [`Debouncer::trigger`] calls into a
//! single delivery: each call restarts the quiet window, and once the window
//! elapses with no further call the most recent value is sent on the output
//! channel. Superseded values are dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, trace};

#[derive(Debug)]
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn a debouncer on the current tokio runtime.
    ///
    /// Returns the debouncer and the receiver on which settled values arrive.
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, input) = mpsc::unbounded_channel();
        let (output, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(window, input, output));
        (Self { tx, task }, rx)
    }

    /// Schedule `value`, superseding anything still waiting in the window.
    pub fn trigger(&self, value: T) {
        if self.tx.send(value).is_err() {
            debug!("debouncer already stopped, trigger dropped");
        }
    }

    /// Stop accepting triggers. A value still waiting is delivered right
    /// away, after which the output channel closes.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            debug!("debouncer task ended abnormally: {}", e);
        }
    }
}

async fn run<T>(
    window: Duration,
    mut input: mpsc::UnboundedReceiver<T>,
    output: mpsc::UnboundedSender<T>,
) {
    while let Some(mut latest) = input.recv().await {
        let closed = loop {
            tokio::select! {
                next = input.recv() => match next {
                    Some(value) => {
                        trace!("trigger superseded");
                        latest = value;
                    }
                    None => break true,
                },
                _ = sleep(window) => break false,
            }
        };

        if output.send(latest).is_err() || closed {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_burst_delivers_only_latest() {
        let (debouncer, mut rx) = Debouncer::new(Duration::from_millis(400));

        debouncer.trigger(1);
        tokio::task::yield_now().await;
        advance(Duration::from_millis(100)).await;
        debouncer.trigger(2);
        tokio::task::yield_now().await;
        advance(Duration::from_millis(100)).await;
        debouncer.trigger(3);

        assert_eq!(rx.recv().await, Some(3));
        assert!(timeout(Duration::from_secs(5), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_quiet_window() {
        let (debouncer, mut rx) = Debouncer::new(Duration::from_millis(400));
        let start = Instant::now();

        debouncer.trigger("a");
        assert_eq!(rx.recv().await, Some("a"));
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_each_fire() {
        let (debouncer, mut rx) = Debouncer::new(Duration::from_millis(400));

        debouncer.trigger(1);
        assert_eq!(rx.recv().await, Some(1));
        debouncer.trigger(2);
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_flushes_pending_value() {
        let (debouncer, mut rx) = Debouncer::new(Duration::from_secs(60));
        let start = Instant::now();

        debouncer.trigger("pending");
        debouncer.close().await;

        assert_eq!(rx.recv().await, Some("pending"));
        assert_eq!(rx.recv().await, None);
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_without_pending_value() {
        let (debouncer, mut rx) = Debouncer::<()>::new(Duration::from_millis(400));
        debouncer.close().await;
        assert_eq!(rx.recv().await, None);
    }
}
