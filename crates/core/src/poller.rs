//! Listener-driven background refresh loop.
//!
//! The poller never runs on its own schedule: its timer exists
//! exactly while at least one subscriber is interested in live state
//! (now-playing or supported-commands). Transitions are
//! edge-triggered; 0→1 starts the single timer, 1→0 stops it.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Fixed period of the refresh loop.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5000);

type RefreshFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct PollState {
    interest: usize,
    timer: Option<JoinHandle<()>>,
}

/// Interest-counted singleton timer.
///
/// The refresh action is injected so the poller can be exercised
/// without a session; the action itself is responsible for swallowing
/// its failures - nothing a tick does may stop the loop.
pub struct SubscriptionPoller {
    state: Mutex<PollState>,
    refresh: Mutex<Option<RefreshFn>>,
}

impl SubscriptionPoller {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PollState {
                interest: 0,
                timer: None,
            }),
            refresh: Mutex::new(None),
        }
    }

    /// Installs the per-tick refresh action.
    pub fn set_refresh(&self, refresh: RefreshFn) {
        *self.refresh.lock() = Some(refresh);
    }

    /// Records one more interested subscriber, starting the timer on
    /// the 0→1 transition.
    pub fn retain(&self) {
        let mut state = self.state.lock();
        state.interest += 1;
        if state.interest == 1 && state.timer.is_none() {
            let Some(refresh) = self.refresh.lock().clone() else {
                return;
            };
            debug!(target: "mrp.poll", "starting background refresh loop");
            // First tick a full period after the subscription edge;
            // anchored here so the spawned task's scheduling delay
            // cannot shift the schedule.
            let start = tokio::time::Instant::now() + POLL_INTERVAL;
            state.timer = Some(tokio::spawn(run_loop(start, refresh)));
        }
    }

    /// Records one subscriber gone, stopping the timer on the 1→0
    /// transition.
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.interest = state.interest.saturating_sub(1);
        if state.interest == 0 {
            if let Some(timer) = state.timer.take() {
                debug!(target: "mrp.poll", "stopping background refresh loop");
                timer.abort();
            }
        }
    }

    /// Whether the timer currently exists.
    pub fn is_polling(&self) -> bool {
        self.state.lock().timer.is_some()
    }

    /// Current interest count.
    pub fn interest(&self) -> usize {
        self.state.lock().interest
    }
}

impl Default for SubscriptionPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SubscriptionPoller {
    fn drop(&mut self) {
        if let Some(timer) = self.state.lock().timer.take() {
            timer.abort();
        }
    }
}

async fn run_loop(start: tokio::time::Instant, refresh: RefreshFn) {
    let mut interval = tokio::time::interval_at(start, POLL_INTERVAL);
    loop {
        interval.tick().await;
        refresh().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_poller() -> (Arc<SubscriptionPoller>, Arc<AtomicUsize>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let poller = Arc::new(SubscriptionPoller::new());
        let tick_counter = Arc::clone(&ticks);
        poller.set_refresh(Arc::new(move || {
            let tick_counter = Arc::clone(&tick_counter);
            Box::pin(async move {
                tick_counter.fetch_add(1, Ordering::SeqCst);
            })
        }));
        (poller, ticks)
    }

    #[tokio::test(start_paused = true)]
    async fn first_subscriber_starts_exactly_one_timer() {
        let (poller, ticks) = counting_poller();
        assert!(!poller.is_polling());

        poller.retain();
        assert!(poller.is_polling());

        poller.retain();
        assert_eq!(poller.interest(), 2);
        assert!(poller.is_polling());

        tokio::time::advance(POLL_INTERVAL).await;
        tokio::task::yield_now().await;
        // Two subscribers, one timer: one tick per period.
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        poller.release();
        poller.release();
    }

    #[tokio::test(start_paused = true)]
    async fn releasing_one_of_two_keeps_polling() {
        let (poller, _ticks) = counting_poller();
        poller.retain();
        poller.retain();

        poller.release();
        assert!(poller.is_polling());
        assert_eq!(poller.interest(), 1);

        poller.release();
        assert!(!poller.is_polling());
        assert_eq!(poller.interest(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_repeat_until_interest_drops() {
        let (poller, ticks) = counting_poller();
        poller.retain();

        for _ in 0..3 {
            tokio::time::advance(POLL_INTERVAL).await;
            tokio::task::yield_now().await;
        }
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        poller.release();
        tokio::time::advance(POLL_INTERVAL).await;
        tokio::task::yield_now().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop_arms_a_fresh_timer() {
        let (poller, ticks) = counting_poller();
        poller.retain();
        poller.release();
        assert!(!poller.is_polling());

        poller.retain();
        assert!(poller.is_polling());
        tokio::time::advance(POLL_INTERVAL).await;
        tokio::task::yield_now().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        poller.release();
    }

    #[tokio::test(start_paused = true)]
    async fn failing_tick_does_not_stop_the_loop() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let poller = Arc::new(SubscriptionPoller::new());
        let tick_counter = Arc::clone(&ticks);
        // Refresh actions swallow their own failures; model one that
        // hits an error path every time but still returns.
        poller.set_refresh(Arc::new(move || {
            let tick_counter = Arc::clone(&tick_counter);
            Box::pin(async move {
                tick_counter.fetch_add(1, Ordering::SeqCst);
                let failed: Result<(), &str> = Err("refresh failed");
                if failed.is_err() {
                    // swallowed
                }
            })
        }));

        poller.retain();
        tokio::time::advance(POLL_INTERVAL).await;
        tokio::task::yield_now().await;
        tokio::time::advance(POLL_INTERVAL).await;
        tokio::task::yield_now().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        poller.release();
    }
}
