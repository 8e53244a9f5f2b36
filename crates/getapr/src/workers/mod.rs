// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Worker lifecycle plumbing.
//!
//! Both long-lived workers are plain OS threads signalled to stop by
//! dropping the sender side of an mpsc channel: the receiver's blocking
//! waits wake with `Disconnected`, and the thread exits at its next
//! cancellation point.

pub mod monitor;
pub mod poll;

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Holds a worker thread handle and the stop channel sender.
///
/// Dropping the sender disconnects the channel, which the worker observes
/// at its next cancellation point. The thread is then joined.
pub(crate) struct StopHandle {
    /// Dropping this signals the thread to exit via channel disconnect.
    stop_tx: Option<Sender<()>>,
    /// Worker thread handle, joined on stop.
    thread: Option<JoinHandle<()>>,
}

impl StopHandle {
    /// Wrap a spawned worker.
    pub(crate) fn new(stop_tx: Sender<()>, thread: JoinHandle<()>) -> Self {
        Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }
    }

    /// Signal the worker to stop and wait for it to finish.
    pub(crate) fn stop(&mut self) {
        // Drop the sender first so the worker's next receive wakes with
        // Disconnected, then join.
        drop(self.stop_tx.take());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StopHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The two workers of a running oracle.
pub(crate) struct WorkerSet {
    /// Poll worker (pair sweeps).
    pub(crate) poll: StopHandle,
    /// Monitor worker (inventory refresh + GC).
    pub(crate) monitor: StopHandle,
}

impl WorkerSet {
    /// Stop both workers, poll first so no sweep commits into a state the
    /// monitor is tearing down.
    pub(crate) fn stop(&mut self) {
        self.poll.stop();
        self.monitor.stop();
    }
}

/// Non-blocking stop check, used between units of work.
pub(crate) fn stop_requested(stop_rx: &Receiver<()>) -> bool {
    matches!(
        stop_rx.try_recv(),
        Ok(()) | Err(TryRecvError::Disconnected)
    )
}

/// Sleep for `period` or until stopped. Returns true when the worker
/// should exit.
pub(crate) fn sleep_or_stop(stop_rx: &Receiver<()>, period: Duration) -> bool {
    matches!(
        stop_rx.recv_timeout(period),
        Ok(()) | Err(RecvTimeoutError::Disconnected)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    #[test]
    fn test_stop_handle_joins_promptly() {
        let (tx, rx) = mpsc::channel::<()>();
        let thread = std::thread::spawn(move || {
            // Worker that would otherwise run for a minute.
            while !sleep_or_stop(&rx, Duration::from_secs(60)) {}
        });

        let mut handle = StopHandle::new(tx, thread);
        let started = Instant::now();
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_stop_handle_stop_is_idempotent() {
        let (tx, rx) = mpsc::channel::<()>();
        let thread = std::thread::spawn(move || while !sleep_or_stop(&rx, Duration::from_secs(60)) {});
        let mut handle = StopHandle::new(tx, thread);
        handle.stop();
        handle.stop();
    }

    #[test]
    fn test_stop_requested_after_disconnect() {
        let (tx, rx) = mpsc::channel::<()>();
        assert!(!stop_requested(&rx));
        drop(tx);
        assert!(stop_requested(&rx));
    }

    #[test]
    fn test_sleep_or_stop_times_out() {
        let (_tx, rx) = mpsc::channel::<()>();
        let started = Instant::now();
        assert!(!sleep_or_stop(&rx, Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
