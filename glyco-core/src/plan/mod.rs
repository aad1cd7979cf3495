pub mod catalog;
pub mod error;
pub mod evaluation;
pub mod heuristic;
pub mod planner;
pub mod state;
pub mod transition;

pub use catalog::{Action, ActionCatalog, ActionSource, Condition, MergePolicy, Rule, RuleSet};
pub use error::{PlanError, PlanResult};
pub use evaluation::{
    evaluate, CaseResult, EvaluationReport, GroundTruth, GroundTruthCase, LabelScore, NO_ACTION,
};
pub use heuristic::{GlucoseHeuristic, Heuristic, ZeroHeuristic};
pub use planner::{Plan, PlanOutcome, Planner, PlannerConfig, SearchReport, SearchStats};
pub use state::{Glucose, PatientState, Risk};
pub use transition::{NormalizingTransition, TransitionModel, STANDARD_NORMALIZING};
