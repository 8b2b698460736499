//! Background driver that turns an external listen source into automatic
//! chat turns.
//!
//! The loop polls the session's `on_listening` hook; a non-empty result is
//! fed straight into [`ChatSession::chat`]. The driver adds no error
//! handling of its own: a failed turn has already fired `on_error` inside
//! the session, and the loop simply continues.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, watch};

use crate::chat::session::ChatSession;
use crate::observability;

/// A cooperative background driver over a shared chat session.
///
/// The driver holds a reference to the session, not ownership; foreground
/// callers keep using the same `Arc<Mutex<ChatSession>>`, and the mutex
/// serializes their turns against the loop's.
///
/// Stopping is cooperative: [`stop`](ContinuousChat::stop) is observed
/// within one poll interval but never cancels an in-flight turn.
pub struct ContinuousChat {
    session: Arc<Mutex<ChatSession>>,
    interval: Duration,
    active: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
}

impl ContinuousChat {
    /// Creates a driver over `session`, polling every `interval`.
    pub fn new(session: Arc<Mutex<ChatSession>>, interval: Duration) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            session,
            interval,
            active: Arc::new(AtomicBool::new(false)),
            stop_tx,
        }
    }

    /// Returns the poll interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true while the driver task is running.
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Starts the driver task. No-op if it is already running.
    ///
    /// A driver stopped moments ago may still be winding down its final
    /// cycle; `start` during that window is also a no-op. Must be called
    /// from within a tokio runtime.
    pub fn start(&self) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_tx.send_replace(false);
        let session = self.session.clone();
        let active = self.active.clone();
        let stop_rx = self.stop_tx.subscribe();
        let interval = self.interval;
        tokio::spawn(run_loop(session, interval, stop_rx, active));
    }

    /// Signals the driver to stop.
    ///
    /// The task observes the signal within one poll interval and exits
    /// without interrupting an in-flight chat call. Safe to call from any
    /// thread, repeatedly.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }
}

async fn run_loop(
    session: Arc<Mutex<ChatSession>>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
    active: Arc<AtomicBool>,
) {
    loop {
        if *stop_rx.borrow() {
            break;
        }
        observability::LOOP_POLLS.click();

        let heard = session.lock().await.poll_listen();
        match heard {
            Ok(Some(message)) if !message.trim().is_empty() => {
                observability::LOOP_TURNS.click();
                let mut session = session.lock().await;
                let _ = session.chat(&message).await;
            }
            Ok(_) => {}
            Err(_) => {
                observability::LOOP_LISTEN_ERRORS.click();
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
    active.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::config::SessionConfig;

    fn shared_session() -> Arc<Mutex<ChatSession>> {
        Arc::new(Mutex::new(ChatSession::new(SessionConfig::new()).unwrap()))
    }

    #[tokio::test]
    async fn starts_and_stops() {
        let driver = ContinuousChat::new(shared_session(), Duration::from_millis(10));
        assert!(!driver.is_running());

        driver.start();
        assert!(driver.is_running());

        driver.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!driver.is_running());
    }

    #[tokio::test]
    async fn start_while_running_is_noop() {
        let session = shared_session();
        {
            let mut session = session.lock().await;
            let polls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
            let counter = polls.clone();
            session.callbacks_mut().on_listening(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            });
        }
        let driver = ContinuousChat::new(session, Duration::from_millis(10));
        driver.start();
        driver.start();
        assert!(driver.is_running());
        driver.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!driver.is_running());
    }

    #[tokio::test]
    async fn stop_before_start_leaves_driver_startable() {
        let driver = ContinuousChat::new(shared_session(), Duration::from_millis(10));
        driver.stop();
        driver.start();
        assert!(driver.is_running());
        driver.stop();
    }
}
