use serde::{Deserialize, Serialize};

/// Lifecycle of one run.
///
/// `Idle -> Rendering -> Mixing -> Playing -> Idle` on success,
/// `Playing -> Canceled -> Idle` on user stop, and
/// `Rendering | Mixing | Playing -> Failed -> Idle` on error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Rendering,
    Mixing,
    Playing,
    Canceled,
    Failed,
}

impl RunState {
    pub fn is_idle(self) -> bool {
        self == RunState::Idle
    }

    /// Whether the machine may step from `self` to `next`.
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Rendering)
                | (Rendering, Mixing)
                | (Mixing, Playing)
                | (Playing, Idle)
                | (Rendering | Mixing | Playing, Canceled)
                | (Rendering | Mixing | Playing, Failed)
                | (Canceled, Idle)
                | (Failed, Idle)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_path_is_allowed() {
        let path = [
            RunState::Idle,
            RunState::Rendering,
            RunState::Mixing,
            RunState::Playing,
            RunState::Idle,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn skipping_stages_is_rejected() {
        assert!(!RunState::Idle.can_transition_to(RunState::Playing));
        assert!(!RunState::Rendering.can_transition_to(RunState::Idle));
        assert!(!RunState::Canceled.can_transition_to(RunState::Rendering));
        assert!(!RunState::Idle.can_transition_to(RunState::Canceled));
    }
}
