use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::domain::{AdId, ModerationEvent, ModerationRecord, ModerationStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModerationError {
    #[error("moderation status cannot move from {} to {}", .from.label(), .to.label())]
    IllegalTransition {
        from: ModerationStatus,
        to: ModerationStatus,
    },
}

impl ModerationRecord {
    /// Apply a decision from the moderation authority. Only
    /// pending -> approved and pending|approved -> rejected are allowed.
    pub fn transition(&mut self, to: ModerationStatus) -> Result<(), ModerationError> {
        use ModerationStatus::*;

        match (self.status, to) {
            (Pending, Approved) | (Pending, Rejected) | (Approved, Rejected) => {
                self.status = to;
                Ok(())
            }
            (from, to) => Err(ModerationError::IllegalTransition { from, to }),
        }
    }
}

/// User-facing outcome derived from a status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum ModerationSignal {
    Approved { id: AdId },
    /// Terminal; the listing is not resubmitted automatically.
    Rejected { id: AdId },
}

/// Edge-triggered diff of one status-change event.
pub fn signal_for(event: &ModerationEvent) -> Option<ModerationSignal> {
    match (event.old_status, event.new_status) {
        (ModerationStatus::Pending, ModerationStatus::Approved) => Some(ModerationSignal::Approved {
            id: event.id.clone(),
        }),
        (old, ModerationStatus::Rejected) if old != ModerationStatus::Rejected => {
            Some(ModerationSignal::Rejected {
                id: event.id.clone(),
            })
        }
        _ => None,
    }
}

/// Source of per-user moderation events.
pub trait ModerationFeed: Send + Sync {
    fn subscribe(&self, user_id: &str) -> mpsc::Receiver<ModerationEvent>;
}

/// Forwards signals for one user's submissions until the feed closes or the
/// handle is dropped.
#[derive(Debug)]
pub struct ModerationWatcher {
    handle: JoinHandle<usize>,
}

impl ModerationWatcher {
    pub fn spawn<F>(feed: &F, user_id: &str, signals: mpsc::Sender<ModerationSignal>) -> Self
    where
        F: ModerationFeed + ?Sized,
    {
        let events = feed.subscribe(user_id);
        let user_id = user_id.to_string();
        let handle = tokio::spawn(async move {
            let forwarded = watch(events, signals).await;
            debug!(%user_id, forwarded, "moderation feed closed");
            forwarded
        });
        Self { handle }
    }

    /// Wait for the feed to close; returns the number of signals forwarded.
    pub async fn finished(mut self) -> usize {
        (&mut self.handle).await.unwrap_or(0)
    }
}

impl Drop for ModerationWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Drain `events`, forwarding a signal for each qualifying transition.
pub async fn watch(
    mut events: mpsc::Receiver<ModerationEvent>,
    signals: mpsc::Sender<ModerationSignal>,
) -> usize {
    let mut forwarded = 0;
    while let Some(event) = events.recv().await {
        let Some(signal) = signal_for(&event) else {
            debug!(
                ad_id = %event.id.0,
                old = event.old_status.label(),
                new = event.new_status.label(),
                "moderation update without signal"
            );
            continue;
        };
        info!(ad_id = %event.id.0, new = event.new_status.label(), "moderation decision");
        if signals.send(signal).await.is_err() {
            break;
        }
        forwarded += 1;
    }
    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::ad_submission::domain::ModerationStatus::*;
    use chrono::Utc;

    fn event(old: ModerationStatus, new: ModerationStatus) -> ModerationEvent {
        ModerationEvent {
            id: AdId("ad-1".to_string()),
            old_status: old,
            new_status: new,
        }
    }

    #[test]
    fn approval_fires_only_from_pending() {
        assert!(matches!(
            signal_for(&event(Pending, Approved)),
            Some(ModerationSignal::Approved { .. })
        ));
        assert_eq!(signal_for(&event(Approved, Approved)), None);
        assert_eq!(signal_for(&event(Rejected, Approved)), None);
    }

    #[test]
    fn rejection_fires_from_any_other_status() {
        for old in [Pending, Approved] {
            assert!(matches!(
                signal_for(&event(old, Rejected)),
                Some(ModerationSignal::Rejected { .. })
            ));
        }
        assert_eq!(signal_for(&event(Rejected, Rejected)), None);
    }

    #[test]
    fn entering_pending_is_silent() {
        assert_eq!(signal_for(&event(Pending, Pending)), None);
        assert_eq!(signal_for(&event(Approved, Pending)), None);
    }

    #[test]
    fn record_never_reverses() {
        let mut record = ModerationRecord::pending(AdId("ad-9".to_string()), Utc::now());
        record.transition(Approved).expect("pending -> approved");
        assert_eq!(
            record.transition(Pending),
            Err(ModerationError::IllegalTransition {
                from: Approved,
                to: Pending
            })
        );
        record.transition(Rejected).expect("approved -> rejected");
        assert!(record.transition(Approved).is_err());
        assert_eq!(record.status, Rejected);
    }

    #[tokio::test]
    async fn watch_forwards_only_edges() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (signal_tx, mut signal_rx) = mpsc::channel(8);

        event_tx.send(event(Pending, Pending)).await.expect("send");
        event_tx.send(event(Pending, Approved)).await.expect("send");
        event_tx.send(event(Approved, Rejected)).await.expect("send");
        drop(event_tx);

        assert_eq!(watch(event_rx, signal_tx).await, 2);
        assert!(matches!(
            signal_rx.recv().await,
            Some(ModerationSignal::Approved { .. })
        ));
        assert!(matches!(
            signal_rx.recv().await,
            Some(ModerationSignal::Rejected { .. })
        ));
        assert_eq!(signal_rx.recv().await, None);
    }
}
