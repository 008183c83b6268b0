// State machines for batch searches and user tasks
//
// Batch search transitions are validated here and persisted by the result
// store; task states are driven by the task manager.

pub mod batch_search_state_machine;
pub mod errors;
pub mod events;
pub mod states;

pub use batch_search_state_machine::BatchSearchStateMachine;
pub use errors::{StateMachineError, StateMachineResult};
pub use events::BatchSearchEvent;
pub use states::{BatchSearchState, TaskState};
