// src/flows/status.rs
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

pub const COMPOSE_MESSAGES: &[&str] = &[
    "Warming up the AI stylist...",
    "Analyzing the fit and fabric...",
    "Draping the clothing onto your photo...",
    "Adding realistic lighting and shadows...",
    "Putting the final touches on your look...",
];
pub const COMPOSE_INTERVAL: Duration = Duration::from_millis(2500);

pub const EDIT_MESSAGES: &[&str] = &[
    "Reading your instructions...",
    "Making the magic happen...",
    "Perfecting the details...",
];
pub const EDIT_INTERVAL: Duration = Duration::from_millis(1800);

/// Index into a fixed list of progress messages, wrapping at the end.
#[derive(Debug, Clone)]
pub struct StatusCycle {
    messages: &'static [&'static str],
    index: usize,
}

impl StatusCycle {
    pub fn new(messages: &'static [&'static str]) -> Self {
        Self { messages, index: 0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &'static str {
        self.messages.get(self.index).copied().unwrap_or_default()
    }

    pub fn advance(&mut self) {
        if !self.messages.is_empty() {
            self.index = (self.index + 1) % self.messages.len();
        }
    }
}

/// Owns the one periodic task that advances a status cycle. Starting a new
/// cycle aborts the previous task; dropping the ticker aborts it as well.
#[derive(Debug, Default)]
pub struct StatusTicker {
    handle: Option<JoinHandle<()>>,
}

impl StatusTicker {
    pub fn start<S, F>(&mut self, target: Weak<Mutex<S>>, period: Duration, mut on_tick: F)
    where
        S: Send + 'static,
        F: FnMut(&mut S) + Send + 'static,
    {
        self.stop();
        self.handle = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                let Some(state) = target.upgrade() else {
                    break;
                };
                on_tick(&mut *state.lock().await);
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for StatusTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn cycle_wraps_at_list_length() {
        let mut cycle = StatusCycle::new(COMPOSE_MESSAGES);
        let mut seen = Vec::new();
        for _ in 0..7 {
            seen.push(cycle.index());
            cycle.advance();
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 0, 1]);
    }

    #[test]
    fn cycle_reports_current_message() {
        let mut cycle = StatusCycle::new(EDIT_MESSAGES);
        assert_eq!(cycle.current(), "Reading your instructions...");
        cycle.advance();
        cycle.advance();
        cycle.advance();
        assert_eq!(cycle.current(), "Reading your instructions...");
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_advances_once_per_period() {
        let counter = Arc::new(Mutex::new(0usize));
        let mut ticker = StatusTicker::default();
        ticker.start(Arc::downgrade(&counter), COMPOSE_INTERVAL, |n: &mut usize| *n += 1);

        tokio::time::sleep(Duration::from_millis(2400)).await;
        assert_eq!(*counter.lock().await, 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*counter.lock().await, 1);
        tokio::time::sleep(COMPOSE_INTERVAL * 2).await;
        assert_eq!(*counter.lock().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_replaces_previous_task() {
        let counter = Arc::new(Mutex::new(0usize));
        let mut ticker = StatusTicker::default();
        ticker.start(Arc::downgrade(&counter), EDIT_INTERVAL, |n: &mut usize| *n += 1);
        ticker.start(Arc::downgrade(&counter), EDIT_INTERVAL, |n: &mut usize| *n += 10);

        tokio::time::sleep(EDIT_INTERVAL + Duration::from_millis(100)).await;
        assert_eq!(*counter.lock().await, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_ticker_no_longer_fires() {
        let counter = Arc::new(Mutex::new(0usize));
        let mut ticker = StatusTicker::default();
        ticker.start(Arc::downgrade(&counter), EDIT_INTERVAL, |n: &mut usize| *n += 1);
        assert!(ticker.is_running());

        ticker.stop();
        assert!(!ticker.is_running());
        tokio::time::sleep(EDIT_INTERVAL * 3).await;
        assert_eq!(*counter.lock().await, 0);
    }
}
