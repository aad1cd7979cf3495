use super::state::{Glucose, PatientState};

/// Lower bound on the remaining cost to reach a normal-glucose state.
pub trait Heuristic {
    fn estimate(&self, state: &PatientState) -> u32;
}

/// Charges one unit while glucose is high. Admissible as long as every
/// catalog action costs at least one.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlucoseHeuristic;

impl Heuristic for GlucoseHeuristic {
    fn estimate(&self, state: &PatientState) -> u32 {
        match state.glucose {
            Glucose::High => 1,
            Glucose::Low | Glucose::Normal => 0,
        }
    }
}

/// Always zero; turns the search into uniform-cost search.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroHeuristic;

impl Heuristic for ZeroHeuristic {
    fn estimate(&self, _state: &PatientState) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::state::Risk;

    #[test]
    fn only_high_glucose_has_a_positive_estimate() {
        let h = GlucoseHeuristic;
        for risk in Risk::ALL {
            assert_eq!(h.estimate(&PatientState::new(Glucose::High, risk)), 1);
            assert_eq!(h.estimate(&PatientState::new(Glucose::Low, risk)), 0);
            assert_eq!(h.estimate(&PatientState::new(Glucose::Normal, risk)), 0);
        }
    }
}
