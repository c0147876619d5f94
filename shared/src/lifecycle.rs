//! Record Lifecycle
//!
//! Tracks one fetched record from the moment it is handed to the dispatcher
//! until it reaches a terminal state.
//!
//! ```text
//! Fetched -> SkippedOffline | SkippedDuplicate | SkippedNotPending
//! Fetched -> Dispatched -> Deleted | DeleteFailed
//! Fetched -> Undeliverable -> Deleted | DeleteFailed
//! ```

/// States a record moves through on the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordState {
    /// Parsed from a poll cycle, not yet examined
    Fetched,
    /// Target user not connected; stays pending remotely
    SkippedOffline,
    /// Id already in the ledger
    SkippedDuplicate,
    /// Status is present and not `pending`
    SkippedNotPending,
    /// Record carries no target user and cannot be executed
    Undeliverable,
    /// Command handed to the host (successfully or not)
    Dispatched,
    /// Removed from the remote store
    Deleted,
    /// Removal failed; the record will be fetched again
    DeleteFailed,
}

impl RecordState {
    /// Whether no further events are expected
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            RecordState::Fetched | RecordState::Dispatched | RecordState::Undeliverable
        )
    }
}

/// Events that move a record between states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEvent {
    UserOffline,
    DuplicateId,
    NotPending,
    MissingUser,
    /// Command execution finished; `success` is informational only
    Executed { success: bool },
    DeleteSucceeded,
    DeleteFailed,
}

/// Result of a transition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    Success(RecordState),
    Invalid { from: RecordState, event: RecordEvent },
}

/// Lifecycle of a single record
#[derive(Debug, Clone)]
pub struct RecordLifecycle {
    record_id: String,
    current_state: RecordState,
}

impl RecordLifecycle {
    /// Start tracking a freshly fetched record
    pub fn new(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            current_state: RecordState::Fetched,
        }
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn state(&self) -> RecordState {
        self.current_state
    }

    /// Apply an event, leaving the state untouched on an invalid transition
    pub fn process_event(&mut self, event: RecordEvent) -> TransitionResult {
        match self.next_state(&event) {
            Some(state) => {
                self.current_state = state;
                TransitionResult::Success(state)
            }
            None => TransitionResult::Invalid {
                from: self.current_state,
                event,
            },
        }
    }

    fn next_state(&self, event: &RecordEvent) -> Option<RecordState> {
        use RecordEvent as E;
        use RecordState::*;

        match (self.current_state, event) {
            (Fetched, E::UserOffline) => Some(SkippedOffline),
            (Fetched, E::DuplicateId) => Some(SkippedDuplicate),
            (Fetched, E::NotPending) => Some(SkippedNotPending),
            (Fetched, E::MissingUser) => Some(Undeliverable),
            (Fetched, E::Executed { .. }) => Some(Dispatched),

            (Dispatched | Undeliverable, E::DeleteSucceeded) => Some(Deleted),
            (Dispatched | Undeliverable, E::DeleteFailed) => Some(DeleteFailed),

            _ => None,
        }
    }
}
