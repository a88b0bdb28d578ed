use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use super::lock;

/// Ceiling held until the pipeline resolves.
pub const PROGRESS_CEILING: f32 = 95.0;
pub const PROGRESS_COMPLETE: f32 = 100.0;

/// Shared progress value. `None` means no progress is shown.
pub type ProgressCell = Arc<Mutex<Option<f32>>>;

/// One tick of the simulated curve: fast below 60, slower to 80, crawl to 95.
pub fn advance(value: f32) -> f32 {
    let next = if value < 60.0 {
        value + 2.0
    } else if value < 80.0 {
        value + 1.0
    } else if value < PROGRESS_CEILING {
        value + 0.5
    } else {
        value
    };
    next.min(PROGRESS_CEILING)
}

/// Periodic task driving a [`ProgressCell`]. Owned by the lane; dropping it
/// aborts the task, so every exit path releases it.
#[derive(Debug)]
pub struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    pub fn start(cell: ProgressCell, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                ticks.tick().await;
                let mut value = lock(&cell);
                if let Some(current) = value.as_mut() {
                    *current = advance(*current);
                }
            }
        });
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
