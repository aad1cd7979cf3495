use std::collections::BTreeSet;

use super::catalog::Action;
use super::state::PatientState;

pub const STANDARD_NORMALIZING: [&str; 5] = [
    "avoid_sugar",
    "walk_30_minutes",
    "eat_healthy_meal",
    "walk",
    "check_glucose",
];

/// Effect of applying an action to a state. Must be deterministic and must
/// never change the risk category.
pub trait TransitionModel {
    fn apply(&self, state: &PatientState, action: &Action) -> (PatientState, u32);
}

/// Normalizing actions reset glucose to normal; anything else is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizingTransition {
    normalizing: BTreeSet<String>,
}

impl NormalizingTransition {
    pub fn standard() -> Self {
        Self::with_actions(STANDARD_NORMALIZING)
    }

    pub fn with_actions<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            normalizing: actions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_normalizing(&self, name: &str) -> bool {
        self.normalizing.contains(name)
    }

    pub fn normalizing(&self) -> impl Iterator<Item = &str> {
        self.normalizing.iter().map(String::as_str)
    }
}

impl Default for NormalizingTransition {
    fn default() -> Self {
        Self::standard()
    }
}

impl TransitionModel for NormalizingTransition {
    fn apply(&self, state: &PatientState, action: &Action) -> (PatientState, u32) {
        if self.is_normalizing(&action.name) {
            (state.normalized(), action.cost)
        } else {
            (*state, action.cost)
        }
    }
}
