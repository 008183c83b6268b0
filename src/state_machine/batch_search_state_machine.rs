use super::{
    errors::{StateMachineError, StateMachineResult},
    events::BatchSearchEvent,
    states::BatchSearchState,
};
use crate::models::SearchFailure;

/// Batch search lifecycle: current state plus the failure payload when failed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSearchStateMachine {
    state: BatchSearchState,
    failure: Option<SearchFailure>,
}

impl BatchSearchStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_state(&self) -> BatchSearchState {
        self.state
    }

    pub fn failure(&self) -> Option<&SearchFailure> {
        self.failure.as_ref()
    }

    /// Apply an event, returning the new state. The machine is left untouched
    /// when the transition is not allowed.
    pub fn transition(&mut self, event: BatchSearchEvent) -> StateMachineResult<BatchSearchState> {
        let target = Self::determine_target_state(self.state, &event)?;
        self.failure = match event {
            BatchSearchEvent::Fail(failure) => Some(failure),
            _ => None,
        };
        self.state = target;
        Ok(target)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: BatchSearchState,
        event: &BatchSearchEvent,
    ) -> StateMachineResult<BatchSearchState> {
        let target = match (current_state, event) {
            (BatchSearchState::Queued, BatchSearchEvent::Start) => BatchSearchState::Running,

            (BatchSearchState::Running, BatchSearchEvent::Succeed) => BatchSearchState::Success,

            (BatchSearchState::Running, BatchSearchEvent::Fail(_)) => BatchSearchState::Failure,
            (BatchSearchState::Queued, BatchSearchEvent::Fail(_)) => BatchSearchState::Failure,

            (state, BatchSearchEvent::Reset) if state.is_resettable() => BatchSearchState::Queued,

            (BatchSearchState::Queued, BatchSearchEvent::Cancel) => BatchSearchState::Cancelled,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut machine = BatchSearchStateMachine::new();
        assert_eq!(machine.current_state(), BatchSearchState::Queued);
        assert_eq!(
            machine.transition(BatchSearchEvent::Start).unwrap(),
            BatchSearchState::Running
        );
        assert_eq!(
            machine.transition(BatchSearchEvent::Succeed).unwrap(),
            BatchSearchState::Success
        );
    }

    #[test]
    fn test_failure_keeps_payload_until_reset() {
        let mut machine = BatchSearchStateMachine::new();
        machine.transition(BatchSearchEvent::Start).unwrap();
        let failure = SearchFailure::new(Some("q".to_string()), "boom");
        machine
            .transition(BatchSearchEvent::Fail(failure.clone()))
            .unwrap();
        assert_eq!(machine.current_state(), BatchSearchState::Failure);
        assert_eq!(machine.failure(), Some(&failure));

        machine.transition(BatchSearchEvent::Reset).unwrap();
        assert_eq!(machine.current_state(), BatchSearchState::Queued);
        assert!(machine.failure().is_none());
    }

    #[test]
    fn test_running_batch_search_can_be_reset() {
        let mut machine = BatchSearchStateMachine::new();
        machine.transition(BatchSearchEvent::Start).unwrap();
        assert_eq!(
            machine.transition(BatchSearchEvent::Reset).unwrap(),
            BatchSearchState::Queued
        );
        assert_eq!(
            machine.transition(BatchSearchEvent::Start).unwrap(),
            BatchSearchState::Running
        );
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let mut machine = BatchSearchStateMachine::new();
        assert!(machine.transition(BatchSearchEvent::Succeed).is_err());
        assert!(machine.transition(BatchSearchEvent::Reset).is_err());

        machine.transition(BatchSearchEvent::Start).unwrap();
        machine.transition(BatchSearchEvent::Succeed).unwrap();
        let error = machine.transition(BatchSearchEvent::Start).unwrap_err();
        assert_eq!(
            error,
            StateMachineError::InvalidTransition {
                from: "SUCCESS".to_string(),
                event: "start".to_string(),
            }
        );
        assert_eq!(machine.current_state(), BatchSearchState::Success);
    }

    #[test]
    fn test_only_queued_batch_search_can_be_cancelled() {
        let mut machine = BatchSearchStateMachine::new();
        machine.transition(BatchSearchEvent::Start).unwrap();
        assert!(machine.transition(BatchSearchEvent::Cancel).is_err());

        let mut queued = BatchSearchStateMachine::new();
        assert_eq!(
            queued.transition(BatchSearchEvent::Cancel).unwrap(),
            BatchSearchState::Cancelled
        );
    }
}
