use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::state::{Glucose, PatientState, Risk};
use super::{PlanError, PlanResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(deny_unknown_fields)]
pub struct Action {
    pub name: String,
    pub cost: u32,
}

impl Action {
    pub fn new(name: impl Into<String>, cost: u32) -> Self {
        Self {
            name: name.into(),
            cost,
        }
    }
}

/// Predicate over a state. Absent fields match anything, so an empty
/// condition applies to every state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glucose: Option<Glucose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<Risk>,
}

impl Condition {
    pub fn glucose(glucose: Glucose) -> Self {
        Self {
            glucose: Some(glucose),
            risk: None,
        }
    }

    pub fn risk(risk: Risk) -> Self {
        Self {
            glucose: None,
            risk: Some(risk),
        }
    }

    pub fn matches(&self, state: &PatientState) -> bool {
        self.glucose.map_or(true, |glucose| glucose == state.glucose)
            && self.risk.map_or(true, |risk| risk == state.risk)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    #[serde(default)]
    pub when: Condition,
    pub actions: Vec<Action>,
}

impl Rule {
    pub fn new(when: Condition, actions: Vec<Action>) -> Self {
        Self { when, actions }
    }
}

/// Named, ordered list of rules. Rules are consulted in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    /// Table keyed on the glucose category.
    pub fn glucose() -> Self {
        Self::new(
            "glucose",
            vec![
                Rule::new(
                    Condition::glucose(Glucose::High),
                    vec![
                        Action::new("avoid_sugar", 1),
                        Action::new("walk_30_minutes", 2),
                    ],
                ),
                Rule::new(
                    Condition::glucose(Glucose::Low),
                    vec![Action::new("eat_healthy_meal", 1)],
                ),
            ],
        )
    }

    /// Table keyed on the risk category.
    pub fn risk() -> Self {
        Self::new(
            "risk",
            vec![
                Rule::new(
                    Condition::risk(Risk::High),
                    vec![
                        Action::new("walk", 2),
                        Action::new("avoid_sugar", 1),
                        Action::new("check_glucose", 1),
                    ],
                ),
                Rule::new(
                    Condition::risk(Risk::Low),
                    vec![Action::new("light_exercise", 1)],
                ),
            ],
        )
    }

    fn matching<'a>(&'a self, state: &'a PatientState) -> impl Iterator<Item = &'a Action> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.when.matches(state))
            .flat_map(|rule| rule.actions.iter())
    }
}

/// How actions from several rule sets applicable to the same state combine.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Concatenate in rule-set order; a name offered earlier shadows later
    /// declarations of the same name.
    #[default]
    Union,
    /// The first rule set offering anything supplies the whole list.
    FirstMatch,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergePolicy::Union => "union",
            MergePolicy::FirstMatch => "first_match",
        }
    }
}

/// Source of candidate actions for a state. Implementations must be pure:
/// the same state yields the same list in the same order.
pub trait ActionSource {
    fn actions(&self, state: &PatientState) -> Vec<Action>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCatalog {
    rule_sets: Vec<RuleSet>,
    policy: MergePolicy,
}

impl ActionCatalog {
    /// Builds a catalog, rejecting tables the planner cannot search safely.
    pub fn new(rule_sets: Vec<RuleSet>, policy: MergePolicy) -> PlanResult<Self> {
        let catalog = Self { rule_sets, policy };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Glucose table followed by risk table, merged by union.
    pub fn standard() -> Self {
        Self {
            rule_sets: vec![RuleSet::glucose(), RuleSet::risk()],
            policy: MergePolicy::Union,
        }
    }

    pub fn rule_sets(&self) -> &[RuleSet] {
        &self.rule_sets
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub fn validate(&self) -> PlanResult<()> {
        let mut names = HashSet::new();
        for set in &self.rule_sets {
            if !names.insert(set.name.as_str()) {
                return Err(PlanError::DuplicateRuleSet {
                    rule_set: set.name.clone(),
                });
            }
            for action in set.rules.iter().flat_map(|rule| rule.actions.iter()) {
                if action.name.trim().is_empty() {
                    return Err(PlanError::EmptyActionName {
                        rule_set: set.name.clone(),
                    });
                }
                // A zero-cost step would let the heuristic overestimate.
                if action.cost == 0 {
                    return Err(PlanError::ZeroCostAction {
                        rule_set: set.name.clone(),
                        action: action.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Every distinct action the catalog can ever offer, first declaration wins.
    pub fn declared_actions(&self) -> Vec<Action> {
        let mut seen = HashSet::new();
        self.rule_sets
            .iter()
            .flat_map(|set| set.rules.iter())
            .flat_map(|rule| rule.actions.iter())
            .filter(|action| seen.insert(action.name.as_str()))
            .cloned()
            .collect()
    }
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ActionSource for ActionCatalog {
    fn actions(&self, state: &PatientState) -> Vec<Action> {
        let mut offered: Vec<Action> = Vec::new();
        let mut seen = HashSet::new();
        for set in &self.rule_sets {
            let before = offered.len();
            for action in set.matching(state) {
                if seen.insert(action.name.as_str()) {
                    offered.push(action.clone());
                }
            }
            if self.policy == MergePolicy::FirstMatch && offered.len() > before {
                trace!(target: "planner.catalog", rule_set = %set.name, %state, "first match");
                break;
            }
        }
        offered
    }
}
