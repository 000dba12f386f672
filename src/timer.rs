// src/timer.rs

//! Client-side countdown for an in-progress attempt.
//!
//! Ticks once per second and runs the submit callback exactly once when it
//! reaches zero. Cancelling only means the callback never runs; no server
//! state is touched.

use std::future::Future;

use chrono::{DateTime, Utc};
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
    time::{self, Duration, Instant},
};

pub struct Countdown {
    cancel: Option<oneshot::Sender<()>>,
    remaining: watch::Receiver<u64>,
    handle: JoinHandle<bool>,
}

impl Countdown {
    /// Starts counting down `seconds`. Dropping the returned handle cancels it.
    pub fn start<F, Fut>(seconds: u64, on_expire: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let (remaining_tx, remaining_rx) = watch::channel(seconds);

        let handle = tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut ticks = time::interval_at(Instant::now() + period, period);
            let mut left = seconds;

            while left > 0 {
                tokio::select! {
                    biased;
                    _ = &mut cancel_rx => return false,
                    _ = ticks.tick() => {
                        left -= 1;
                        remaining_tx.send_replace(left);
                    }
                }
            }

            tracing::debug!("Countdown reached zero, submitting");
            on_expire().await;
            true
        });

        Self {
            cancel: Some(cancel_tx),
            remaining: remaining_rx,
            handle,
        }
    }

    /// Counts down to an attempt's `expires_at`. Partial seconds round up.
    pub fn until<F, Fut>(expires_at: DateTime<Utc>, now: DateTime<Utc>, on_expire: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let millis = (expires_at - now).num_milliseconds().max(0) as u64;
        Self::start(millis.div_ceil(1000), on_expire)
    }

    /// Whole seconds left.
    pub fn remaining(&self) -> u64 {
        *self.remaining.borrow()
    }

    /// Stops the countdown. Has no effect once the callback has started.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    /// Waits for the countdown to end. `true` if the callback ran.
    pub async fn finished(self) -> bool {
        let Self { cancel, handle, .. } = self;
        let fired = handle.await.unwrap_or(false);
        drop(cancel);
        fired
    }
}
