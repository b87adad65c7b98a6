//! Generation Progress
//!
//! Cosmetic progress lines shown while a generation is in flight. The ticker
//! is tied to one request: it starts when the request is sent and is aborted
//! the moment the response arrives, however many lines have been shown.
//! It never decides when the workflow moves on.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default progress schedule
pub const DEFAULT_PROGRESS_MESSAGES: [&str; 4] = [
    "Preparing the magic...",
    "Analyzing your pet's photo...",
    "Fitting the outfit just right...",
    "Creating the final image...",
];

/// Default time between progress lines
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(2000);

/// One progress line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// 1-based position in the schedule
    pub step: usize,
    /// Number of lines in the schedule
    pub total: usize,
    /// Text to show
    pub message: String,
}

/// Emits the progress schedule on a fixed cadence until dropped
///
/// The first line is emitted immediately; each later one follows after
/// `interval`. Dropping the ticker aborts the schedule.
#[derive(Debug)]
pub struct ProgressTicker {
    rx: mpsc::Receiver<ProgressUpdate>,
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Start the schedule on the current runtime
    #[must_use]
    pub fn start(messages: Vec<String>, interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel(messages.len().max(1));

        let handle = tokio::spawn(async move {
            let total = messages.len();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for (index, message) in messages.into_iter().enumerate() {
                ticker.tick().await;
                let update = ProgressUpdate {
                    step: index + 1,
                    total,
                    message,
                };
                if tx.send(update).await.is_err() {
                    break;
                }
            }
        });

        Self { rx, handle }
    }

    /// Take an already-emitted line without waiting
    pub fn try_next(&mut self) -> Option<ProgressUpdate> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next line; `None` once the schedule is exhausted
    pub async fn next(&mut self) -> Option<ProgressUpdate> {
        self.rx.recv().await
    }

    /// Stop emitting
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schedule() -> Vec<String> {
        DEFAULT_PROGRESS_MESSAGES.iter().map(|m| (*m).to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_line_is_immediate() {
        let mut ticker = ProgressTicker::start(schedule(), Duration::from_secs(2));
        let start = tokio::time::Instant::now();

        let first = ticker.next().await.unwrap();
        assert_eq!(first.step, 1);
        assert_eq!(first.total, 4);
        assert_eq!(first.message, "Preparing the magic...");
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lines_follow_the_cadence() {
        let mut ticker = ProgressTicker::start(schedule(), Duration::from_secs(2));
        let start = tokio::time::Instant::now();

        let mut steps = Vec::new();
        while let Some(update) = ticker.next().await {
            steps.push((update.step, start.elapsed().as_secs()));
        }
        assert_eq!(steps, vec![(1, 0), (2, 2), (3, 4), (4, 6)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_the_schedule() {
        let mut ticker = ProgressTicker::start(schedule(), Duration::from_secs(2));
        assert_eq!(ticker.next().await.unwrap().step, 1);

        ticker.cancel();
        assert_eq!(ticker.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_schedule_ends_immediately() {
        let mut ticker = ProgressTicker::start(Vec::new(), Duration::from_secs(2));
        assert_eq!(ticker.next().await, None);
    }
}
