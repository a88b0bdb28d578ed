use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    BasicInfo,
    Preferences,
    Media,
    Review,
}

impl WizardStep {
    pub const fn ordered() -> [Self; 4] {
        [Self::BasicInfo, Self::Preferences, Self::Media, Self::Review]
    }

    pub const fn index(self) -> usize {
        match self {
            Self::BasicInfo => 0,
            Self::Preferences => 1,
            Self::Media => 2,
            Self::Review => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ordered().get(index).copied()
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::BasicInfo => "Basic Info",
            Self::Preferences => "Preferences",
            Self::Media => "Media",
            Self::Review => "Review",
        }
    }

    pub const fn is_last(self) -> bool {
        matches!(self, Self::Review)
    }
}

/// Navigation lock. Any request made outside `Idle` is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPhase {
    Idle,
    TransitioningForward,
    TransitioningBackward,
}

impl TransitionPhase {
    pub const fn direction(self) -> i8 {
        match self {
            Self::Idle => 0,
            Self::TransitioningForward => 1,
            Self::TransitioningBackward => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    Transitioning,
    AtFirstStep,
    AtLastStep,
    SameStep,
    OutOfRange,
    /// The workflow is not in its editing screen.
    WorkflowLocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    Started { from: WizardStep, to: WizardStep },
    Ignored(IgnoredReason),
}

impl NavigationOutcome {
    pub fn started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingTransition {
    target: WizardStep,
    settle_at: Instant,
}

/// Step state machine: Basic Info -> Preferences -> Media -> Review.
///
/// A request locks the navigator and records the target. Once the settle delay
/// has elapsed the accessors report the target step and the next request
/// commits it; [`settle`](Self::settle) waits for the deadline explicitly.
#[derive(Debug, Clone)]
pub struct StepNavigator {
    current: WizardStep,
    phase: TransitionPhase,
    pending: Option<PendingTransition>,
    settle_delay: Duration,
}

impl StepNavigator {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            current: WizardStep::BasicInfo,
            phase: TransitionPhase::Idle,
            pending: None,
            settle_delay,
        }
    }

    /// Target of a transition whose settle deadline has already passed but
    /// has not been committed yet.
    fn elapsed_target(&self) -> Option<WizardStep> {
        self.pending
            .filter(|pending| Instant::now() >= pending.settle_at)
            .map(|pending| pending.target)
    }

    pub fn current(&self) -> WizardStep {
        self.elapsed_target().unwrap_or(self.current)
    }

    pub fn phase(&self) -> TransitionPhase {
        if self.elapsed_target().is_some() {
            TransitionPhase::Idle
        } else {
            self.phase
        }
    }

    pub fn direction(&self) -> i8 {
        self.phase().direction()
    }

    pub fn is_transitioning(&self) -> bool {
        self.phase() != TransitionPhase::Idle
    }

    pub fn pending_target(&self) -> Option<WizardStep> {
        if self.elapsed_target().is_some() {
            return None;
        }
        self.pending.map(|pending| pending.target)
    }

    pub fn next(&mut self) -> NavigationOutcome {
        self.settle_due(Instant::now());
        if self.is_transitioning() {
            return NavigationOutcome::Ignored(IgnoredReason::Transitioning);
        }
        match WizardStep::from_index(self.current.index() + 1) {
            Some(target) => self.begin(target),
            None => NavigationOutcome::Ignored(IgnoredReason::AtLastStep),
        }
    }

    pub fn prev(&mut self) -> NavigationOutcome {
        self.settle_due(Instant::now());
        if self.is_transitioning() {
            return NavigationOutcome::Ignored(IgnoredReason::Transitioning);
        }
        match self.current.index().checked_sub(1) {
            Some(index) => self.begin(WizardStep::ordered()[index]),
            None => NavigationOutcome::Ignored(IgnoredReason::AtFirstStep),
        }
    }

    pub fn jump_to(&mut self, index: usize) -> NavigationOutcome {
        self.settle_due(Instant::now());
        if self.is_transitioning() {
            return NavigationOutcome::Ignored(IgnoredReason::Transitioning);
        }
        let Some(target) = WizardStep::from_index(index) else {
            return NavigationOutcome::Ignored(IgnoredReason::OutOfRange);
        };
        if target == self.current {
            return NavigationOutcome::Ignored(IgnoredReason::SameStep);
        }
        self.begin(target)
    }

    fn begin(&mut self, target: WizardStep) -> NavigationOutcome {
        self.phase = if target.index() > self.current.index() {
            TransitionPhase::TransitioningForward
        } else {
            TransitionPhase::TransitioningBackward
        };
        self.pending = Some(PendingTransition {
            target,
            settle_at: Instant::now() + self.settle_delay,
        });
        debug!(from = self.current.label(), to = target.label(), "step transition started");
        NavigationOutcome::Started {
            from: self.current,
            to: target,
        }
    }

    /// Commit the pending transition if its settle deadline has passed.
    pub fn settle_due(&mut self, now: Instant) -> Option<WizardStep> {
        let pending = self.pending?;
        if now < pending.settle_at {
            return None;
        }
        self.pending = None;
        self.current = pending.target;
        self.phase = TransitionPhase::Idle;
        debug!(step = self.current.label(), "step transition settled");
        Some(self.current)
    }

    /// Wait out the settle delay and commit the pending transition.
    pub async fn settle(&mut self) -> Option<WizardStep> {
        let settle_at = self.pending?.settle_at;
        tokio::time::sleep_until(settle_at).await;
        self.settle_due(Instant::now())
    }
}
