// Bounded-time move selection
//
// The agent runs on tokio's blocking pool while the caller polls a
// single-slot handoff, yielding to its `on_poll` hook between polls. When
// the deadline passes the slot is closed and the decision's cancellation
// token fires; a result that reached the slot first still wins, anything
// delivered after closing is dropped.

use log::{debug, warn};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agents::{Agent, AgentError, CancelToken, SearchContext};
use crate::board::BoardState;
use crate::types::Action;

/// Outcome of a successful decision
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    /// Time spent inside `choose_action`
    pub elapsed: Duration,
    /// Nodes expanded by the search
    pub nodes: u64,
}

/// Why a decision could not be obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionError {
    /// The state is terminal; no agent is consulted
    GameOver,
    /// The agent did not finish within its budget
    Timeout { budget: Duration },
    /// The agent returned an error
    Agent(AgentError),
    /// The agent's worker failed without producing a result (e.g. panicked)
    Unexpected(String),
}

impl fmt::Display for DecisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionError::GameOver => write!(f, "no decision requested: state is terminal"),
            DecisionError::Timeout { budget } => write!(
                f,
                "agent action took more than {:.2} seconds",
                budget.as_secs_f64()
            ),
            DecisionError::Agent(e) => write!(f, "agent failed: {}", e),
            DecisionError::Unexpected(message) => write!(f, "agent worker failed: {}", message),
        }
    }
}

impl std::error::Error for DecisionError {}

enum SlotState<T> {
    Empty,
    Filled(T),
    Closed,
}

/// One-shot handoff between a worker and the poller.
/// Accepts at most one value; once closed, deliveries are discarded.
pub struct ResultSlot<T> {
    state: Mutex<SlotState<T>>,
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResultSlot<T> {
    pub fn new() -> Self {
        ResultSlot {
            state: Mutex::new(SlotState::Empty),
        }
    }

    /// Stores `value` if the slot is still empty. Returns whether it was accepted.
    pub fn deliver(&self, value: T) -> bool {
        let mut state = self.state.lock();
        match *state {
            SlotState::Empty => {
                *state = SlotState::Filled(value);
                true
            }
            _ => false,
        }
    }

    /// Takes a delivered value, closing the slot. Leaves an empty slot open.
    pub fn take(&self) -> Option<T> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, SlotState::Closed) {
            SlotState::Filled(value) => Some(value),
            SlotState::Empty => {
                *state = SlotState::Empty;
                None
            }
            SlotState::Closed => None,
        }
    }

    /// Closes the slot for good, returning a value that was delivered before closing
    pub fn close(&self) -> Option<T> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, SlotState::Closed) {
            SlotState::Filled(value) => Some(value),
            _ => None,
        }
    }

    #[cfg(test)]
    fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Closed)
    }
}

/// What the worker hands back
struct WorkerOutcome {
    result: Result<Action, AgentError>,
    elapsed: Duration,
    nodes: u64,
}

/// Runs one agent decision at a time under an optional wall-clock budget
#[derive(Debug, Clone)]
pub struct BoundedExecutor {
    budget: Option<Duration>,
    polling_interval: Duration,
}

impl BoundedExecutor {
    /// # Arguments
    /// * `budget` - Deadline per decision; `None` or zero means unbounded
    /// * `polling_interval` - Sleep between completion checks
    pub fn new(budget: Option<Duration>, polling_interval: Duration) -> Self {
        BoundedExecutor {
            budget: budget.filter(|b| !b.is_zero()),
            polling_interval,
        }
    }

    /// Builds an executor from a budget in seconds, where `0` means unbounded.
    /// Budgets too large for a `Duration` are unbounded as well.
    pub fn from_secs(budget_secs: f64, polling_interval: Duration) -> Self {
        let budget = Duration::try_from_secs_f64(budget_secs).ok();
        Self::new(budget, polling_interval)
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Asks `agent` for an action in `state`, enforcing the deadline.
    ///
    /// `on_poll` receives the time elapsed since the request and runs between
    /// polls; it is the place for UI and input handling.
    ///
    /// # Returns
    /// * `Ok(Decision)` - The action and how long the agent thought
    /// * `Err(DecisionError::Timeout)` - Budget exhausted; the computation was cancelled
    pub async fn run_with_deadline<F>(
        &self,
        agent: Arc<dyn Agent>,
        state: Arc<BoardState>,
        max_depth: u32,
        mut on_poll: F,
    ) -> Result<Decision, DecisionError>
    where
        F: FnMut(Duration),
    {
        if state.is_goal_state() {
            return Err(DecisionError::GameOver);
        }

        let start_time = Instant::now();
        let token = CancelToken::new();
        let slot: Arc<ResultSlot<WorkerOutcome>> = Arc::new(ResultSlot::new());

        let worker_slot = Arc::clone(&slot);
        let worker_token = token.clone();
        let mut handle = tokio::task::spawn_blocking(move || {
            let ctx = SearchContext::new(worker_token);
            let started = Instant::now();
            let result = agent.choose_action(&state, max_depth, &ctx);
            let outcome = WorkerOutcome {
                result,
                elapsed: started.elapsed(),
                nodes: ctx.nodes(),
            };
            if !worker_slot.deliver(outcome) {
                debug!("Discarding decision of {} delivered after cancellation", agent.id());
            }
        });

        loop {
            if let Some(outcome) = slot.take() {
                return Self::finish(outcome);
            }

            if handle.is_finished() {
                // The worker delivers before returning, so an empty slot here means it died
                if let Some(outcome) = slot.close() {
                    return Self::finish(outcome);
                }
                return Err(match (&mut handle).await {
                    Err(e) if e.is_panic() => {
                        DecisionError::Unexpected(format!("agent panicked: {}", e))
                    }
                    Err(e) => DecisionError::Unexpected(e.to_string()),
                    Ok(()) => DecisionError::Unexpected("agent produced no result".to_string()),
                });
            }

            let elapsed = start_time.elapsed();
            if let Some(budget) = self.budget {
                if elapsed >= budget {
                    if let Some(outcome) = slot.close() {
                        return Self::finish(outcome);
                    }
                    token.cancel();
                    warn!(
                        "Decision timed out after {}ms (budget {}ms)",
                        elapsed.as_millis(),
                        budget.as_millis()
                    );
                    return Err(DecisionError::Timeout { budget });
                }
            }

            on_poll(elapsed);
            tokio::time::sleep(self.polling_interval).await;
        }
    }

    fn finish(outcome: WorkerOutcome) -> Result<Decision, DecisionError> {
        match outcome.result {
            Ok(action) => Ok(Decision {
                action,
                elapsed: outcome.elapsed,
                nodes: outcome.nodes,
            }),
            Err(e) => Err(DecisionError::Agent(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_accepts_single_delivery() {
        let slot = ResultSlot::new();
        assert!(slot.deliver(1));
        assert!(!slot.deliver(2));
        assert_eq!(slot.take(), Some(1));
        assert!(slot.is_closed());
        assert!(!slot.deliver(3));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn test_take_on_empty_slot_keeps_it_open() {
        let slot: ResultSlot<u8> = ResultSlot::new();
        assert_eq!(slot.take(), None);
        assert!(!slot.is_closed());
        assert!(slot.deliver(7));
        assert_eq!(slot.take(), Some(7));
    }

    #[test]
    fn test_close_drops_late_delivery() {
        let slot = ResultSlot::new();
        assert_eq!(slot.close(), None);
        assert!(!slot.deliver("late"));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn test_close_returns_result_that_arrived_first() {
        let slot = ResultSlot::new();
        assert!(slot.deliver("first"));
        assert_eq!(slot.close(), Some("first"));
    }

    #[test]
    fn test_zero_budget_is_unbounded() {
        let polling = Duration::from_millis(1);
        assert_eq!(BoundedExecutor::from_secs(0.0, polling).budget(), None);
        assert_eq!(
            BoundedExecutor::new(Some(Duration::ZERO), polling).budget(),
            None
        );
        assert_eq!(
            BoundedExecutor::from_secs(1.5, polling).budget(),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_oversized_or_invalid_budget_is_unbounded() {
        let polling = Duration::from_millis(1);
        assert_eq!(BoundedExecutor::from_secs(1e20, polling).budget(), None);
        assert_eq!(BoundedExecutor::from_secs(f64::INFINITY, polling).budget(), None);
        assert_eq!(BoundedExecutor::from_secs(f64::NAN, polling).budget(), None);
        assert_eq!(BoundedExecutor::from_secs(-2.0, polling).budget(), None);
    }
}
