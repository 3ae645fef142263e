//! Fixed-rate compression metronome.
//!
//! Purely visual: the beat flag flips once per period and carries no dependency on pose
//! detection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Interval between beat toggles at `bpm` beats per minute.
pub fn beat_period(bpm: u32) -> Duration {
    Duration::from_micros(60_000_000 / u64::from(bpm.max(1)))
}

pub struct Metronome {
    period: Duration,
    beat: Arc<watch::Sender<bool>>,
    toggles: Arc<AtomicU64>,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Metronome {
    pub fn new(bpm: u32) -> Self {
        let (beat, _) = watch::channel(false);
        Self {
            period: beat_period(bpm),
            beat: Arc::new(beat),
            toggles: Arc::new(AtomicU64::new(0)),
            running: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start toggling. The metronome also stops on its own when `parent` is cancelled.
    ///
    /// Calling `start` while running is a no-op.
    pub fn start(&mut self, parent: &CancellationToken) {
        if self.is_running() {
            return;
        }
        let cancel = parent.child_token();
        let period = self.period;
        let beat = self.beat.clone();
        let toggles = self.toggles.clone();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let toggled = beat.send_if_modified(|on| {
                    if task_cancel.is_cancelled() {
                        return false;
                    }
                    *on = !*on;
                    true
                });
                if toggled {
                    toggles.fetch_add(1, Ordering::Relaxed);
                }
            }
            beat.send_replace(false);
        });

        tracing::debug!("metronome started ({:?} per beat)", period);
        self.running = Some((cancel, handle));
    }

    pub fn stop(&mut self) {
        if let Some((cancel, handle)) = self.running.take() {
            cancel.cancel();
            handle.abort();
            tracing::debug!("metronome stopped");
        }
        self.beat.send_replace(false);
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|(cancel, _)| !cancel.is_cancelled())
    }

    /// `true` during the "compress now" half of the beat.
    pub fn beat(&self) -> bool {
        *self.beat.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.beat.subscribe()
    }

    /// Toggles since construction.
    pub fn toggles(&self) -> u64 {
        self.toggles.load(Ordering::Relaxed)
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        if let Some((cancel, handle)) = self.running.take() {
            cancel.cancel();
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_at_110_bpm() {
        assert_eq!(beat_period(110).as_millis(), 545);
        assert_eq!(beat_period(60), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn toggles_once_per_period_and_stops() {
        let mut metronome = Metronome::new(110);
        let session = CancellationToken::new();
        metronome.start(&session);

        tokio::time::sleep(Duration::from_millis(540)).await;
        assert_eq!(metronome.toggles(), 0);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(metronome.toggles(), 1);
        assert!(metronome.beat());

        tokio::time::sleep(beat_period(110) * 9).await;
        assert_eq!(metronome.toggles(), 10);

        metronome.stop();
        assert!(!metronome.beat());
        tokio::time::sleep(beat_period(110) * 5).await;
        assert_eq!(metronome.toggles(), 10);
        assert!(!metronome.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_stops_metronome() {
        let mut metronome = Metronome::new(110);
        let session = CancellationToken::new();
        metronome.start(&session);
        tokio::time::sleep(Duration::from_millis(600)).await;

        session.cancel();
        let before = metronome.toggles();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(metronome.toggles(), before);
        assert!(!metronome.is_running());
        assert!(!metronome.beat());
    }
}
