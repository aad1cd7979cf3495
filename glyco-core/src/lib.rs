pub mod config;
pub mod error;
pub mod plan;

pub use config::{load_planner_settings, PlannerSection, PlannerSettings};
pub use error::{ConfigError, Result};
pub use plan::{
    evaluate, Action, ActionCatalog, ActionSource, Condition, EvaluationReport, Glucose,
    GlucoseHeuristic, GroundTruth, Heuristic, MergePolicy, NormalizingTransition, PatientState,
    Plan, PlanError, PlanOutcome, PlanResult, Planner, PlannerConfig, Risk, Rule, RuleSet,
    SearchReport, SearchStats, TransitionModel,
};
