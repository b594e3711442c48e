use std::collections::HashMap;
use std::sync::LazyLock;
use strum_macros::{Display, EnumIter};

/// States of the maneuver execution state machine.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Display, EnumIter, serde::Serialize)]
pub enum ExecutorState {
    Idle,
    Warping,
    Orienting,
    WaitingForWindow,
    Burning,
    Trimming,
    Complete,
    Aborted,
}

impl ExecutorState {
    /// `Complete` and `Aborted` are terminal, nothing leaves them.
    pub fn is_terminal(self) -> bool { matches!(self, ExecutorState::Complete | ExecutorState::Aborted) }

    /// Checks the transition table of the executor.
    pub fn can_transition_to(self, next: ExecutorState) -> bool {
        TRANSITION_LOOKUP.get(&self).is_some_and(|targets| targets.contains(&next))
    }
}

/// Phases of a full flight, used to report where a failure happened.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Display, EnumIter, serde::Serialize)]
pub enum FlightPhase {
    Launch,
    Ascent,
    Circularization,
    Staging,
    Departure,
    MidCourse,
}

static TRANSITION_LOOKUP: LazyLock<HashMap<ExecutorState, Vec<ExecutorState>>> =
    LazyLock::new(|| {
        let mut lookup = HashMap::new();
        let transitions = vec![
            (ExecutorState::Idle, vec![ExecutorState::Warping, ExecutorState::Aborted]),
            (ExecutorState::Warping, vec![ExecutorState::Orienting, ExecutorState::Aborted]),
            (
                ExecutorState::Orienting,
                vec![ExecutorState::WaitingForWindow, ExecutorState::Aborted],
            ),
            (
                ExecutorState::WaitingForWindow,
                vec![ExecutorState::Burning, ExecutorState::Aborted],
            ),
            (ExecutorState::Burning, vec![ExecutorState::Trimming, ExecutorState::Aborted]),
            (ExecutorState::Trimming, vec![ExecutorState::Complete, ExecutorState::Aborted]),
            (ExecutorState::Complete, vec![]),
            (ExecutorState::Aborted, vec![]),
        ];

        for (from, to) in transitions {
            lookup.insert(from, to);
        }
        lookup
    });
