use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("unknown glucose category: {value}")]
    InvalidGlucose { value: String },
    #[error("unknown risk category: {value}")]
    InvalidRisk { value: String },
    #[error("action {action} in rule set {rule_set} has zero cost")]
    ZeroCostAction { rule_set: String, action: String },
    #[error("rule set {rule_set} declares an action with an empty name")]
    EmptyActionName { rule_set: String },
    #[error("rule set {rule_set} declared more than once")]
    DuplicateRuleSet { rule_set: String },
}

pub type PlanResult<T> = std::result::Result<T, PlanError>;
