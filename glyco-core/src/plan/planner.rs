use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::catalog::{Action, ActionCatalog, ActionSource};
use super::heuristic::{GlucoseHeuristic, Heuristic};
use super::state::PatientState;
use super::transition::{NormalizingTransition, TransitionModel};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Upper bound on expanded states. `None` searches until the frontier
    /// empties, which always terminates for a finite catalog.
    pub max_expansions: Option<usize>,
}

/// Ordered sequence of actions leading from the start state to a goal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Plan {
    pub steps: Vec<Action>,
    pub total_cost: u32,
}

impl Plan {
    pub fn action_names(&self) -> Vec<String> {
        self.steps.iter().map(|step| step.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlanOutcome {
    AlreadyAtGoal,
    Found(Plan),
    Unreachable,
}

impl PlanOutcome {
    /// Flattens the outcome into the bare action list handed to renderers.
    pub fn into_actions(self) -> Vec<String> {
        match self {
            PlanOutcome::Found(plan) => plan.action_names(),
            PlanOutcome::AlreadyAtGoal | PlanOutcome::Unreachable => Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlanOutcome::AlreadyAtGoal => "already_at_goal",
            PlanOutcome::Found(_) => "found",
            PlanOutcome::Unreachable => "unreachable",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchStats {
    pub expanded: usize,
    pub generated: usize,
    pub budget_exhausted: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchReport {
    pub start: PatientState,
    #[serde(flatten)]
    pub outcome: PlanOutcome,
    pub stats: SearchStats,
}

/// A* search over the state graph induced by an action source and a
/// transition model.
#[derive(Debug, Clone)]
pub struct Planner<C = ActionCatalog, T = NormalizingTransition, H = GlucoseHeuristic> {
    catalog: C,
    transition: T,
    heuristic: H,
    config: PlannerConfig,
}

impl Planner {
    pub fn standard() -> Self {
        Self::new(
            ActionCatalog::standard(),
            NormalizingTransition::standard(),
            GlucoseHeuristic,
        )
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::standard()
    }
}

impl<C, T, H> Planner<C, T, H>
where
    C: ActionSource,
    T: TransitionModel,
    H: Heuristic,
{
    pub fn new(catalog: C, transition: T, heuristic: H) -> Self {
        Self {
            catalog,
            transition,
            heuristic,
            config: PlannerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_heuristic<H2: Heuristic>(self, heuristic: H2) -> Planner<C, T, H2> {
        Planner {
            catalog: self.catalog,
            transition: self.transition,
            heuristic,
            config: self.config,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn transition(&self) -> &T {
        &self.transition
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Action names of the cheapest plan, or an empty list when the start is
    /// already a goal or no goal is reachable.
    pub fn plan(&self, start: PatientState) -> Vec<String> {
        self.search(start).outcome.into_actions()
    }

    pub fn search(&self, start: PatientState) -> SearchReport {
        let mut stats = SearchStats::default();
        let mut frontier = BinaryHeap::new();
        let mut explored = HashSet::new();
        let mut sequence = 0u64;

        frontier.push(Node {
            priority: self.heuristic.estimate(&start),
            sequence,
            cost: 0,
            state: start,
            path: Vec::new(),
        });

        while let Some(node) = frontier.pop() {
            if node.state.is_goal() {
                let outcome = if node.path.is_empty() {
                    PlanOutcome::AlreadyAtGoal
                } else {
                    PlanOutcome::Found(Plan {
                        steps: node.path,
                        total_cost: node.cost,
                    })
                };
                info!(
                    target: "planner",
                    %start,
                    outcome = outcome.label(),
                    cost = node.cost,
                    expanded = stats.expanded,
                    generated = stats.generated,
                    "search finished"
                );
                return SearchReport {
                    start,
                    outcome,
                    stats,
                };
            }

            if explored.contains(&node.state) {
                continue;
            }
            if let Some(limit) = self.config.max_expansions {
                if stats.expanded >= limit {
                    warn!(target: "planner", %start, limit, "expansion budget exhausted");
                    stats.budget_exhausted = true;
                    break;
                }
            }
            explored.insert(node.state);
            stats.expanded += 1;
            debug!(
                target: "planner",
                state = %node.state,
                cost = node.cost,
                priority = node.priority,
                "expanding"
            );

            for action in self.catalog.actions(&node.state) {
                let (next, step_cost) = self.transition.apply(&node.state, &action);
                if explored.contains(&next) {
                    continue;
                }
                let cost = node.cost.saturating_add(step_cost);
                let mut path = node.path.clone();
                path.push(action);
                sequence += 1;
                stats.generated += 1;
                frontier.push(Node {
                    priority: cost.saturating_add(self.heuristic.estimate(&next)),
                    sequence,
                    cost,
                    state: next,
                    path,
                });
            }
        }

        info!(
            target: "planner",
            %start,
            outcome = "unreachable",
            expanded = stats.expanded,
            generated = stats.generated,
            "search finished"
        );
        SearchReport {
            start,
            outcome: PlanOutcome::Unreachable,
            stats,
        }
    }
}

/// Frontier entry. Ordered by priority, then by insertion so equal
/// priorities pop first-in first-out; the state itself is never compared.
#[derive(Debug)]
struct Node {
    priority: u32,
    sequence: u64,
    cost: u32,
    state: PatientState,
    path: Vec<Action>,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::state::{Glucose, Risk};

    fn node(priority: u32, sequence: u64) -> Node {
        Node {
            priority,
            sequence,
            cost: 0,
            state: PatientState::new(Glucose::High, Risk::Low),
            path: Vec::new(),
        }
    }

    #[test]
    fn frontier_pops_lowest_priority_then_oldest() {
        let mut heap = BinaryHeap::new();
        heap.push(node(2, 0));
        heap.push(node(1, 3));
        heap.push(node(1, 1));
        heap.push(node(1, 2));
        let order: Vec<(u32, u64)> = std::iter::from_fn(|| heap.pop())
            .map(|n| (n.priority, n.sequence))
            .collect();
        assert_eq!(order, vec![(1, 1), (1, 2), (1, 3), (2, 0)]);
    }

    #[test]
    fn goal_start_expands_nothing() {
        let report = Planner::standard().search(PatientState::new(Glucose::Normal, Risk::High));
        assert_eq!(report.outcome, PlanOutcome::AlreadyAtGoal);
        assert_eq!(report.stats.expanded, 0);
        assert_eq!(report.stats.generated, 0);
    }

    #[test]
    fn zero_budget_reports_unreachable() {
        let planner = Planner::standard().with_config(PlannerConfig {
            max_expansions: Some(0),
        });
        let report = planner.search(PatientState::new(Glucose::High, Risk::Low));
        assert_eq!(report.outcome, PlanOutcome::Unreachable);
        assert!(report.stats.budget_exhausted);
    }

    #[test]
    fn report_serializes_with_flat_outcome_tag() {
        let report = Planner::standard().search(PatientState::new(Glucose::Low, Risk::Medium));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "found");
        assert_eq!(json["total_cost"], 1);
        assert_eq!(json["steps"][0]["name"], "eat_healthy_meal");
        assert_eq!(json["stats"]["expanded"], 1);
    }
}
